//! Gzipped Matrix Market persistence for presence matrices.
//!
//! A persisted matrix is three files sharing a prefix:
//! - `{prefix}_matrix.mtx.gz`: sparse triplets (row, col, value)
//! - `{prefix}_genes.tsv.gz`: row labels, one per line, row order
//! - `{prefix}_genomes.tsv.gz`: column labels, one per line, column order
//!
//! Triplets are 1-indexed and sorted by (row, col) for Matrix Market
//! compliance, so scipy and other sparse readers load them efficiently.
//! The dense matrix is never materialized on either path.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use sprs::TriMat;

use crate::errors::PresenceMatrixError;
use crate::models::PresenceMatrix;

pub const MATRIX_SUFFIX: &str = "_matrix.mtx.gz";
pub const GENES_SUFFIX: &str = "_genes.tsv.gz";
pub const GENOMES_SUFFIX: &str = "_genomes.tsv.gz";

const MTX_HEADER: &str = "%%MatrixMarket matrix coordinate integer general";

/// Write a presence matrix to `{prefix}_matrix.mtx.gz` plus the two
/// label files. The source matrix is not modified.
pub fn write_matrix_market(
    matrix: &PresenceMatrix,
    output_prefix: &str,
) -> Result<(), PresenceMatrixError> {
    let mtx_path = format!("{output_prefix}{MATRIX_SUFFIX}");
    let mtx_file = File::create(&mtx_path)?;
    let mut mtx_writer = BufWriter::new(GzEncoder::new(mtx_file, Compression::default()));

    writeln!(mtx_writer, "{MTX_HEADER}")?;
    writeln!(
        mtx_writer,
        "{} {} {}",
        matrix.num_genes(),
        matrix.num_genomes(),
        matrix.matrix().nnz()
    )?;

    // CSR iteration is already (row, col) ordered; 1-indexed per the
    // Matrix Market standard.
    for (&value, (row, col)) in matrix.matrix().iter() {
        writeln!(mtx_writer, "{} {} {}", row + 1, col + 1, value)?;
    }
    mtx_writer.flush()?;

    write_labels(
        &format!("{output_prefix}{GENES_SUFFIX}"),
        matrix.gene_names(),
    )?;
    write_labels(
        &format!("{output_prefix}{GENOMES_SUFFIX}"),
        matrix.genome_names(),
    )?;

    Ok(())
}

/// Load a presence matrix persisted by [`write_matrix_market`].
///
/// Fails with [`PresenceMatrixError::LabelCountMismatch`] if a label
/// file's line count disagrees with the matrix dimensions, with
/// [`PresenceMatrixError::Format`] on a malformed header or triplet, and
/// passes through `NotFound` io errors for absent files.
pub fn read_matrix_market(input_prefix: &str) -> Result<PresenceMatrix, PresenceMatrixError> {
    let gene_names = read_labels(format!("{input_prefix}{GENES_SUFFIX}"))?;
    let genome_names = read_labels(format!("{input_prefix}{GENOMES_SUFFIX}"))?;

    let mtx_path = format!("{input_prefix}{MATRIX_SUFFIX}");
    let mtx_file = File::open(&mtx_path)?;
    let reader = BufReader::new(MultiGzDecoder::new(mtx_file));

    let mut lines = reader.lines();
    let dims_line = loop {
        match lines.next() {
            Some(line) => {
                let line = line?;
                if !line.starts_with('%') && !line.trim().is_empty() {
                    break line;
                }
            }
            None => {
                return Err(PresenceMatrixError::Format(
                    "missing dimensions line".to_string(),
                ));
            }
        }
    };

    let dims: Vec<usize> = dims_line
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|_| {
            PresenceMatrixError::Format(format!("bad dimensions line: {dims_line:?}"))
        })?;
    let &[rows, cols, nnz] = dims.as_slice() else {
        return Err(PresenceMatrixError::Format(format!(
            "expected 'rows cols nnz', got: {dims_line:?}"
        )));
    };

    if rows != gene_names.len() {
        return Err(PresenceMatrixError::LabelCountMismatch {
            axis: "gene",
            expected: rows,
            found: gene_names.len(),
        });
    }
    if cols != genome_names.len() {
        return Err(PresenceMatrixError::LabelCountMismatch {
            axis: "genome",
            expected: cols,
            found: genome_names.len(),
        });
    }

    let mut triplets = TriMat::new((rows, cols));
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (row, col, value) = parse_triplet(&line)?;
        if row == 0 || row > rows || col == 0 || col > cols {
            return Err(PresenceMatrixError::Format(format!(
                "triplet ({row}, {col}) outside {rows} x {cols} matrix"
            )));
        }
        triplets.add_triplet(row - 1, col - 1, value);
    }

    if triplets.nnz() != nnz {
        return Err(PresenceMatrixError::Format(format!(
            "header declares {nnz} entries, found {}",
            triplets.nnz()
        )));
    }

    PresenceMatrix::new(triplets.to_csr(), gene_names, genome_names)
}

fn parse_triplet(line: &str) -> Result<(usize, usize, u8), PresenceMatrixError> {
    let bad = || PresenceMatrixError::Format(format!("bad triplet line: {line:?}"));

    let mut fields = line.split_whitespace();
    let row: usize = fields.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let col: usize = fields.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let value: u64 = fields.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    if fields.next().is_some() {
        return Err(bad());
    }

    let value = u8::try_from(value).map_err(|_| {
        PresenceMatrixError::Format(format!("count {value} exceeds {}", u8::MAX))
    })?;
    Ok((row, col, value))
}

fn write_labels(path: &str, labels: &[String]) -> Result<(), PresenceMatrixError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(GzEncoder::new(file, Compression::default()));
    for label in labels {
        writeln!(writer, "{label}")?;
    }
    writer.flush()?;
    Ok(())
}

fn read_labels<P: AsRef<Path>>(path: P) -> Result<Vec<String>, PresenceMatrixError> {
    let file = File::open(path)?;
    let reader = BufReader::new(MultiGzDecoder::new(file));
    let mut labels = Vec::new();
    for line in reader.lines() {
        labels.push(line?);
    }
    Ok(labels)
}
