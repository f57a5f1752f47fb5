use thiserror::Error;

use pangrs_core::PresenceMatrix;

/// Number of evenly spaced capture probabilities a grid search tries by
/// default.
pub const DEFAULT_GRID_STEPS: usize = 100;

/// Explicit grid-search configuration. Nothing here is ambient: every
/// run states its bounds, seed threshold, and grid resolution.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BernoulliGridParams {
    /// Closed interval (low, high) of candidate capture probabilities,
    /// 0 < low < high <= 1.
    pub prob_bounds: (f64, f64),
    /// Seeds the search; returned unchanged when no grid candidate
    /// strictly improves on it.
    pub init_capture_prob: f64,
    /// Number of grid intervals spanning `prob_bounds`.
    pub grid_steps: usize,
}

impl Default for BernoulliGridParams {
    fn default() -> Self {
        Self {
            prob_bounds: (0.5, 1.0),
            init_capture_prob: 0.9,
            grid_steps: DEFAULT_GRID_STEPS,
        }
    }
}

/// One evaluated grid candidate.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub threshold: f64,
    pub objective: f64,
}

/// The outcome of a grid search: the selected capture-probability
/// threshold, the genes called core at it, and the full trace of every
/// candidate tried, for auditability.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CoreSelection {
    pub threshold: f64,
    pub objective: f64,
    pub core_genes: Vec<String>,
    pub trace: Vec<GridPoint>,
}

#[derive(Error, Debug, PartialEq)]
pub enum CoreGenomeError {
    #[error("invalid probability bounds ({low}, {high}): require 0 < low < high <= 1")]
    InvalidBounds { low: f64, high: f64 },

    #[error("initial capture probability {0} lies outside the search bounds")]
    InitOutsideBounds(f64),

    #[error("grid must have at least 1 step")]
    InvalidGridSteps,

    #[error("matrix has no genomes")]
    NoGenomes,

    #[error("gene frequency vector has length {found}, expected {expected}")]
    FrequencyLengthMismatch { expected: usize, found: usize },

    #[error("gene frequency {0} is outside [0, 1]")]
    FrequencyOutOfRange(f64),
}

// tolerance for comparing observed frequencies against thresholds, both
// of which come out of inexact division
const FREQ_EPS: f64 = 1e-9;

/// Search capture-probability thresholds for a core-genome gene set
/// robust to false-negative gene calls.
///
/// Each truly-core gene is modeled as detected in a genome with
/// probability p, so its observed presence count over N genomes is
/// Binomial(N, p). For each candidate p the objective is the squared
/// error between the observed presence-count histogram of the genes at
/// or above p and that binomial expectation; the candidate with the
/// smallest objective wins, ties breaking toward the smallest threshold.
/// If no candidate strictly improves on the initial guess, the initial
/// guess is returned unchanged together with the trace showing this.
///
/// `init_gene_freqs` lets a caller reuse precomputed per-gene observed
/// frequencies across repeated calls; when omitted, frequencies are
/// computed from the matrix.
pub fn compute_bernoulli_grid_core_genome(
    matrix: &PresenceMatrix,
    params: &BernoulliGridParams,
    init_gene_freqs: Option<&[f64]>,
) -> Result<CoreSelection, CoreGenomeError> {
    let (low, high) = params.prob_bounds;
    if !(low > 0.0 && low < high && high <= 1.0) {
        return Err(CoreGenomeError::InvalidBounds { low, high });
    }
    if params.init_capture_prob < low || params.init_capture_prob > high {
        return Err(CoreGenomeError::InitOutsideBounds(params.init_capture_prob));
    }
    if params.grid_steps < 1 {
        return Err(CoreGenomeError::InvalidGridSteps);
    }

    let n_genomes = matrix.num_genomes();
    if n_genomes == 0 {
        return Err(CoreGenomeError::NoGenomes);
    }

    let freqs: Vec<f64> = match init_gene_freqs {
        Some(supplied) => {
            if supplied.len() != matrix.num_genes() {
                return Err(CoreGenomeError::FrequencyLengthMismatch {
                    expected: matrix.num_genes(),
                    found: supplied.len(),
                });
            }
            if let Some(&bad) = supplied.iter().find(|f| !(0.0..=1.0).contains(*f)) {
                return Err(CoreGenomeError::FrequencyOutOfRange(bad));
            }
            supplied.to_vec()
        }
        None => matrix.gene_frequencies(),
    };

    // observed presence counts per gene, on the 0..=N integer scale the
    // binomial model lives on
    let counts: Vec<usize> = freqs
        .iter()
        .map(|f| ((f * n_genomes as f64).round() as usize).min(n_genomes))
        .collect();
    let ln_factorials = ln_factorial_table(n_genomes);

    let objective_at = |p: f64| -> f64 {
        let mut observed = vec![0u64; n_genomes + 1];
        let mut candidates = 0u64;
        for (freq, &count) in freqs.iter().zip(&counts) {
            if freq + FREQ_EPS >= p {
                observed[count] += 1;
                candidates += 1;
            }
        }
        if candidates == 0 {
            // an empty core set explains nothing
            return f64::INFINITY;
        }
        (0..=n_genomes)
            .map(|j| {
                let expected = candidates as f64 * binomial_pmf(n_genomes, j, p, &ln_factorials);
                let diff = observed[j] as f64 - expected;
                diff * diff
            })
            .sum()
    };

    let mut trace = Vec::with_capacity(params.grid_steps + 2);
    let mut best = GridPoint {
        threshold: params.init_capture_prob,
        objective: objective_at(params.init_capture_prob),
    };
    trace.push(best);

    // ascending walk + strict improvement = smallest threshold wins ties
    for i in 0..=params.grid_steps {
        let p = if i == params.grid_steps {
            high
        } else {
            low + (high - low) * i as f64 / params.grid_steps as f64
        };
        let candidate = GridPoint {
            threshold: p,
            objective: objective_at(p),
        };
        trace.push(candidate);
        if candidate.objective < best.objective {
            best = candidate;
        }
    }

    let core_genes = matrix
        .gene_names()
        .iter()
        .zip(&freqs)
        .filter(|&(_, freq)| freq + FREQ_EPS >= best.threshold)
        .map(|(name, _)| name.clone())
        .collect();

    Ok(CoreSelection {
        threshold: best.threshold,
        objective: best.objective,
        core_genes,
        trace,
    })
}

/// Genes whose observed frequency meets or exceeds a threshold, in row
/// order. Loosening the threshold can only add genes.
pub fn core_genes_at_threshold(matrix: &PresenceMatrix, threshold: f64) -> Vec<String> {
    matrix
        .gene_names()
        .iter()
        .zip(matrix.gene_frequencies())
        .filter(|&(_, freq)| freq + FREQ_EPS >= threshold)
        .map(|(name, _)| name.clone())
        .collect()
}

fn ln_factorial_table(n: usize) -> Vec<f64> {
    let mut table = vec![0.0; n + 1];
    for i in 1..=n {
        table[i] = table[i - 1] + (i as f64).ln();
    }
    table
}

fn binomial_pmf(n: usize, j: usize, p: f64, ln_factorials: &[f64]) -> f64 {
    if p >= 1.0 {
        return if j == n { 1.0 } else { 0.0 };
    }
    let ln_choose = ln_factorials[n] - ln_factorials[j] - ln_factorials[n - j];
    (ln_choose + j as f64 * p.ln() + (n - j) as f64 * (1.0 - p).ln()).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn labels(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    /// 20 genes over 4 genomes: genes 0-9 present everywhere
    /// (frequency 1.0), genes 10-19 in at most half the genomes.
    #[fixture]
    fn split_matrix() -> PresenceMatrix {
        let mut entries = Vec::new();
        for gene in 0..10 {
            for genome in 0..4 {
                entries.push((gene, genome, 1));
            }
        }
        for gene in 10..15 {
            entries.push((gene, 0, 1));
            entries.push((gene, 1, 1));
        }
        for gene in 15..20 {
            entries.push((gene, 2, 1));
        }
        PresenceMatrix::from_triplets(labels("gene", 20), labels("genome", 4), &entries).unwrap()
    }

    #[rstest]
    #[case(0.8)]
    #[case(0.9)]
    #[case(1.0)]
    fn selects_full_frequency_genes_regardless_of_init(
        split_matrix: PresenceMatrix,
        #[case] init: f64,
    ) {
        let params = BernoulliGridParams {
            prob_bounds: (0.8, 1.0),
            init_capture_prob: init,
            grid_steps: 40,
        };
        let selection = compute_bernoulli_grid_core_genome(&split_matrix, &params, None).unwrap();

        assert_eq!(selection.core_genes, labels("gene", 10));
        assert!(selection.threshold >= 0.8 && selection.threshold <= 1.0);
        assert!(selection.objective < 1e-9);
        // every candidate tried is on the trace: init + grid
        assert_eq!(selection.trace.len(), 42);
    }

    #[rstest]
    fn supplied_frequencies_are_used_verbatim(split_matrix: PresenceMatrix) {
        let freqs = split_matrix.gene_frequencies();
        let params = BernoulliGridParams::default();
        let from_matrix =
            compute_bernoulli_grid_core_genome(&split_matrix, &params, None).unwrap();
        let from_freqs =
            compute_bernoulli_grid_core_genome(&split_matrix, &params, Some(&freqs)).unwrap();
        assert_eq!(from_matrix, from_freqs);
    }

    #[rstest]
    fn wrong_length_frequencies_rejected(split_matrix: PresenceMatrix) {
        let freqs = vec![1.0; 7];
        let err = compute_bernoulli_grid_core_genome(
            &split_matrix,
            &BernoulliGridParams::default(),
            Some(&freqs),
        )
        .unwrap_err();
        assert_eq!(
            err,
            CoreGenomeError::FrequencyLengthMismatch {
                expected: 20,
                found: 7
            }
        );
    }

    #[rstest]
    #[case((0.0, 1.0))]
    #[case((0.9, 0.9))]
    #[case((0.9, 0.5))]
    #[case((0.5, 1.1))]
    fn invalid_bounds_rejected(split_matrix: PresenceMatrix, #[case] bounds: (f64, f64)) {
        let params = BernoulliGridParams {
            prob_bounds: bounds,
            init_capture_prob: bounds.0.clamp(0.1, 1.0),
            grid_steps: 10,
        };
        let err = compute_bernoulli_grid_core_genome(&split_matrix, &params, None).unwrap_err();
        assert!(matches!(err, CoreGenomeError::InvalidBounds { .. }));
    }

    #[test]
    fn zero_genomes_rejected() {
        let matrix = PresenceMatrix::from_triplets(labels("gene", 3), vec![], &[]).unwrap();
        let err = compute_bernoulli_grid_core_genome(
            &matrix,
            &BernoulliGridParams::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err, CoreGenomeError::NoGenomes);
    }

    #[rstest]
    fn selection_is_monotone_in_threshold(split_matrix: PresenceMatrix) {
        let loose = core_genes_at_threshold(&split_matrix, 0.4);
        let tight = core_genes_at_threshold(&split_matrix, 0.9);
        assert!(tight.len() <= loose.len());
        for gene in &tight {
            assert!(loose.contains(gene), "{gene} lost by loosening the threshold");
        }
    }

    #[test]
    fn unbeaten_initial_guess_is_returned_unchanged() {
        // every gene sits at frequency 3/4, so p = 1.0 has an empty
        // candidate set and the coarse grid {0.6, 1.0} never strictly
        // beats the initial guess of 0.75
        let mut entries = Vec::new();
        for gene in 0..6 {
            for genome in 0..3 {
                entries.push((gene, genome, 1));
            }
        }
        let matrix =
            PresenceMatrix::from_triplets(labels("gene", 6), labels("genome", 4), &entries)
                .unwrap();
        let params = BernoulliGridParams {
            prob_bounds: (0.6, 1.0),
            init_capture_prob: 0.75,
            grid_steps: 1,
        };
        let selection = compute_bernoulli_grid_core_genome(&matrix, &params, None).unwrap();
        assert_eq!(selection.threshold, 0.75);
        assert_eq!(selection.core_genes.len(), 6);
        assert_eq!(selection.trace.len(), 3);
        assert!(selection.trace[2].objective.is_infinite());
    }

    #[test]
    fn binomial_pmf_sums_to_one() {
        let table = ln_factorial_table(12);
        for &p in &[0.3, 0.8, 0.99] {
            let total: f64 = (0..=12).map(|j| binomial_pmf(12, j, p, &table)).sum();
            assert!((total - 1.0).abs() < 1e-12, "p = {p}: total = {total}");
        }
    }
}
