use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

/// One sampled point of a rarefaction run: sizes after the first
/// `genomes_sampled` genomes of iteration `iteration`'s permutation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveRecord {
    pub iteration: u32,
    pub genomes_sampled: u32,
    pub pan_size: u64,
    pub core_size: u64,
}

/// A flat pan/core rarefaction table, one row per (iteration, N) pair.
///
/// Within a single iteration `pan_size` is non-decreasing and
/// `core_size` non-increasing in `genomes_sampled`; the estimator
/// produces records in (iteration, N) order and the table is never
/// mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct PanCoreCurve {
    records: Vec<CurveRecord>,
}

impl PanCoreCurve {
    pub fn new(records: Vec<CurveRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[CurveRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of iterations represented in the table.
    pub fn num_iterations(&self) -> u32 {
        self.records
            .iter()
            .map(|r| r.iteration)
            .max()
            .map_or(0, |m| m + 1)
    }

    /// Records belonging to one iteration, in sampling order.
    pub fn iteration_records(&self, iteration: u32) -> impl Iterator<Item = &CurveRecord> {
        self.records.iter().filter(move |r| r.iteration == iteration)
    }

    /// Mean pangenome size at each sampled-genome count, averaged across
    /// iterations.
    pub fn mean_pan_sizes(&self) -> Vec<(u32, f64)> {
        let mut sums: BTreeMap<u32, (f64, u64)> = BTreeMap::new();
        for record in &self.records {
            let entry = sums.entry(record.genomes_sampled).or_insert((0.0, 0));
            entry.0 += record.pan_size as f64;
            entry.1 += 1;
        }
        sums.into_iter()
            .map(|(n, (sum, count))| (n, sum / count as f64))
            .collect()
    }

    /// Write the table as CSV with a header row, gzip-compressed when the
    /// path ends in `.gz`.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer: Box<dyn Write> = if path.extension().is_some_and(|e| e == "gz") {
            Box::new(BufWriter::new(GzEncoder::new(file, Compression::default())))
        } else {
            Box::new(BufWriter::new(file))
        };

        writeln!(writer, "iteration,genomes_sampled,pan_size,core_size")?;
        for r in &self.records {
            writeln!(
                writer,
                "{},{},{},{}",
                r.iteration, r.genomes_sampled, r.pan_size, r.core_size
            )?;
        }
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn record(iteration: u32, n: u32, pan: u64, core: u64) -> CurveRecord {
        CurveRecord {
            iteration,
            genomes_sampled: n,
            pan_size: pan,
            core_size: core,
        }
    }

    #[test]
    fn mean_pan_sizes_averages_across_iterations() {
        let curve = PanCoreCurve::new(vec![
            record(0, 1, 10, 10),
            record(0, 2, 14, 8),
            record(1, 1, 12, 12),
            record(1, 2, 16, 6),
        ]);
        assert_eq!(curve.num_iterations(), 2);
        assert_eq!(curve.mean_pan_sizes(), vec![(1, 11.0), (2, 15.0)]);
    }

    #[test]
    fn csv_export_includes_header_and_all_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curve.csv");
        let curve = PanCoreCurve::new(vec![record(0, 1, 5, 5), record(0, 2, 7, 3)]);
        curve.write_csv(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "iteration,genomes_sampled,pan_size,core_size",
                "0,1,5,5",
                "0,2,7,3",
            ]
        );
    }
}
