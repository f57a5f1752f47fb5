use fxhash::FxHashMap;
use ndarray::Array2;
use sprs::{CsMat, TriMat};

use crate::errors::PresenceMatrixError;

/// A labeled, sparse gene-by-genome presence matrix.
///
/// Rows are gene clusters, columns are genomes. Cell values are small
/// allele counts; any nonzero value reads as "present". Storage is CSR,
/// so absence is never materialized and per-gene iteration is cheap.
///
/// The matrix is immutable after construction. Label-to-index lookup is
/// O(1) through maps built once here; index-to-label is O(1) by `Vec`
/// index.
#[derive(Debug, Clone)]
pub struct PresenceMatrix {
    matrix: CsMat<u8>,
    gene_names: Vec<String>,
    genome_names: Vec<String>,
    gene_lookup: FxHashMap<String, usize>,
    genome_lookup: FxHashMap<String, usize>,
}

impl PresenceMatrix {
    /// Wrap a sparse matrix with its axis labels.
    ///
    /// Fails if a label count does not match the corresponding matrix
    /// dimension, or if any label repeats within its axis.
    pub fn new(
        matrix: CsMat<u8>,
        gene_names: Vec<String>,
        genome_names: Vec<String>,
    ) -> Result<Self, PresenceMatrixError> {
        if matrix.rows() != gene_names.len() {
            return Err(PresenceMatrixError::LabelCountMismatch {
                axis: "gene",
                expected: matrix.rows(),
                found: gene_names.len(),
            });
        }
        if matrix.cols() != genome_names.len() {
            return Err(PresenceMatrixError::LabelCountMismatch {
                axis: "genome",
                expected: matrix.cols(),
                found: genome_names.len(),
            });
        }

        let mut gene_lookup = FxHashMap::default();
        for (i, name) in gene_names.iter().enumerate() {
            if gene_lookup.insert(name.clone(), i).is_some() {
                return Err(PresenceMatrixError::DuplicateGeneLabel(name.clone()));
            }
        }

        let mut genome_lookup = FxHashMap::default();
        for (j, name) in genome_names.iter().enumerate() {
            if genome_lookup.insert(name.clone(), j).is_some() {
                return Err(PresenceMatrixError::DuplicateGenomeLabel(name.clone()));
            }
        }

        Ok(Self {
            matrix,
            gene_names,
            genome_names,
            gene_lookup,
            genome_lookup,
        })
    }

    /// Build a matrix from `(gene, genome, count)` triplets.
    ///
    /// The shape is taken from the label vectors; entries outside that
    /// shape are rejected rather than silently dropped.
    pub fn from_triplets(
        gene_names: Vec<String>,
        genome_names: Vec<String>,
        entries: &[(usize, usize, u8)],
    ) -> Result<Self, PresenceMatrixError> {
        let shape = (gene_names.len(), genome_names.len());
        let mut triplets = TriMat::new(shape);
        for &(row, col, value) in entries {
            if row >= shape.0 || col >= shape.1 {
                return Err(PresenceMatrixError::EntryOutOfBounds { row, col });
            }
            triplets.add_triplet(row, col, value);
        }
        Self::new(triplets.to_csr(), gene_names, genome_names)
    }

    pub fn num_genes(&self) -> usize {
        self.matrix.rows()
    }

    pub fn num_genomes(&self) -> usize {
        self.matrix.cols()
    }

    pub fn gene_names(&self) -> &[String] {
        &self.gene_names
    }

    pub fn genome_names(&self) -> &[String] {
        &self.genome_names
    }

    /// Index of a gene label, if present.
    pub fn gene_index(&self, name: &str) -> Option<usize> {
        self.gene_lookup.get(name).copied()
    }

    /// Index of a genome label, if present.
    pub fn genome_index(&self, name: &str) -> Option<usize> {
        self.genome_lookup.get(name).copied()
    }

    /// The underlying CSR matrix.
    pub fn matrix(&self) -> &CsMat<u8> {
        &self.matrix
    }

    /// Whether a gene is present (in >= 1 copy) in a genome.
    pub fn is_present(&self, gene: usize, genome: usize) -> bool {
        self.matrix.get(gene, genome).is_some_and(|&v| v > 0)
    }

    /// Number of genomes each gene is present in, row by row.
    pub fn gene_presence_counts(&self) -> Vec<u64> {
        self.matrix
            .outer_iterator()
            .map(|row| row.iter().filter(|&(_, &v)| v > 0).count() as u64)
            .collect()
    }

    /// Observed presence frequency of each gene: genomes containing the
    /// gene divided by total genomes. All zeros when the matrix has no
    /// genomes.
    pub fn gene_frequencies(&self) -> Vec<f64> {
        let n_genomes = self.num_genomes();
        if n_genomes == 0 {
            return vec![0.0; self.num_genes()];
        }
        self.gene_presence_counts()
            .into_iter()
            .map(|c| c as f64 / n_genomes as f64)
            .collect()
    }

    /// Per-genome gene-presence bitsets, packed into 64-bit words.
    ///
    /// Word array `w` for genome `g` has bit `i` set iff gene `i` is
    /// present in `g`. Built in one pass over the nonzero cells; the
    /// rarefaction estimator unions and intersects these incrementally.
    pub fn genome_presence_words(&self) -> Vec<Vec<u64>> {
        let n_words = self.num_genes().div_ceil(64);
        let mut words = vec![vec![0u64; n_words]; self.num_genomes()];
        for (&value, (gene, genome)) in self.matrix.iter() {
            if value > 0 {
                words[genome][gene / 64] |= 1u64 << (gene % 64);
            }
        }
        words
    }

    /// Materialize a dense array view.
    ///
    /// This is an explicit, opt-in step: the sparse matrix may be far too
    /// large to densify, so allocation failure is reported as
    /// [`PresenceMatrixError::DenseAllocation`] instead of aborting the
    /// process. Callers own the returned array.
    pub fn to_dense(&self) -> Result<Array2<u8>, PresenceMatrixError> {
        let (rows, cols) = (self.matrix.rows(), self.matrix.cols());
        let oom = || PresenceMatrixError::DenseAllocation { rows, cols };

        let len = rows.checked_mul(cols).ok_or_else(oom)?;
        let mut data: Vec<u8> = Vec::new();
        data.try_reserve_exact(len).map_err(|_| oom())?;
        data.resize(len, 0);

        for (&value, (row, col)) in self.matrix.iter() {
            data[row * cols + col] = value;
        }

        Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| PresenceMatrixError::Format(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn labels(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[fixture]
    fn small_matrix() -> PresenceMatrix {
        // gene0 in both genomes, gene1 in genome0 only, gene2 in genome1 only
        PresenceMatrix::from_triplets(
            labels("gene", 3),
            labels("genome", 2),
            &[(0, 0, 1), (0, 1, 2), (1, 0, 1), (2, 1, 1)],
        )
        .unwrap()
    }

    #[rstest]
    fn presence_and_lookup(small_matrix: PresenceMatrix) {
        assert_eq!(small_matrix.num_genes(), 3);
        assert_eq!(small_matrix.num_genomes(), 2);
        assert!(small_matrix.is_present(0, 1));
        assert!(!small_matrix.is_present(1, 1));
        assert_eq!(small_matrix.gene_index("gene2"), Some(2));
        assert_eq!(small_matrix.genome_index("genome1"), Some(1));
        assert_eq!(small_matrix.gene_index("geneX"), None);
    }

    #[rstest]
    fn frequencies(small_matrix: PresenceMatrix) {
        assert_eq!(small_matrix.gene_presence_counts(), vec![2, 1, 1]);
        assert_eq!(small_matrix.gene_frequencies(), vec![1.0, 0.5, 0.5]);
    }

    #[rstest]
    fn dense_view_matches_sparse(small_matrix: PresenceMatrix) {
        let dense = small_matrix.to_dense().unwrap();
        for gene in 0..small_matrix.num_genes() {
            for genome in 0..small_matrix.num_genomes() {
                assert_eq!(dense[[gene, genome]] > 0, small_matrix.is_present(gene, genome));
            }
        }
    }

    #[rstest]
    fn genome_words(small_matrix: PresenceMatrix) {
        let words = small_matrix.genome_presence_words();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0][0], 0b011); // gene0 + gene1
        assert_eq!(words[1][0], 0b101); // gene0 + gene2
    }

    #[test]
    fn duplicate_gene_label_rejected() {
        let result = PresenceMatrix::from_triplets(
            vec!["geneA".into(), "geneA".into()],
            labels("genome", 1),
            &[],
        );
        assert!(matches!(
            result,
            Err(PresenceMatrixError::DuplicateGeneLabel(name)) if name == "geneA"
        ));
    }

    #[test]
    fn label_count_mismatch_rejected() {
        let matrix: CsMat<u8> = CsMat::zero((3, 2));
        let result = PresenceMatrix::new(matrix, labels("gene", 2), labels("genome", 2));
        assert!(matches!(
            result,
            Err(PresenceMatrixError::LabelCountMismatch { axis: "gene", expected: 3, found: 2 })
        ));
    }

    #[test]
    fn out_of_bounds_entry_rejected() {
        let result =
            PresenceMatrix::from_triplets(labels("gene", 2), labels("genome", 2), &[(2, 0, 1)]);
        assert!(matches!(
            result,
            Err(PresenceMatrixError::EntryOutOfBounds { row: 2, col: 0 })
        ));
    }

    #[test]
    fn empty_matrix_is_valid() {
        let matrix = PresenceMatrix::from_triplets(vec![], vec![], &[]).unwrap();
        assert_eq!(matrix.num_genes(), 0);
        assert_eq!(matrix.num_genomes(), 0);
        assert!(matrix.gene_frequencies().is_empty());
        assert_eq!(matrix.to_dense().unwrap().shape(), &[0, 0]);
    }
}
