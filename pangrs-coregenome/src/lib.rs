//! Core-genome estimation that tolerates imperfect gene calls.
//!
//! A gene missing from one genome's annotation is not necessarily absent
//! from that genome: assemblies are incomplete and gene callers miss
//! things. Rather than demanding 100% observed frequency, this crate
//! models detection of a truly-core gene as a Bernoulli trial per genome
//! with some capture probability, then grid-searches capture-probability
//! thresholds for the one whose binomial expectation best explains the
//! observed frequency histogram. Genes at or above the selected
//! threshold are called core.
//!
//! ```rust
//! use pangrs_core::models::PresenceMatrix;
//! use pangrs_coregenome::{BernoulliGridParams, compute_bernoulli_grid_core_genome};
//!
//! # let matrix = PresenceMatrix::from_triplets(
//! #     vec!["a".into(), "b".into()],
//! #     vec!["g1".into(), "g2".into()],
//! #     &[(0, 0, 1), (0, 1, 1), (1, 0, 1)],
//! # ).unwrap();
//! let params = BernoulliGridParams {
//!     prob_bounds: (0.8, 1.0),
//!     init_capture_prob: 0.9,
//!     grid_steps: 100,
//! };
//! let selection = compute_bernoulli_grid_core_genome(&matrix, &params, None).unwrap();
//! println!("core threshold {}", selection.threshold);
//! ```

pub mod bernoulli;

// re-exports
pub use bernoulli::{
    BernoulliGridParams, CoreGenomeError, CoreSelection, GridPoint,
    compute_bernoulli_grid_core_genome, core_genes_at_threshold,
};
