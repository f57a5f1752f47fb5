//! Pangenome rarefaction: how does the gene repertoire grow as genomes
//! are sampled?
//!
//! Given a [`pangrs_core::PresenceMatrix`], the estimator repeatedly
//! permutes the genome order and records, after each genome is added, the
//! cumulative pangenome size (genes seen in at least one sampled genome)
//! and core-genome size (genes seen in every sampled genome). The fitter
//! then recovers Heaps'-law growth parameters P(N) ≈ κ·N^α from the
//! resulting curves.
//!
//! ```rust
//! use pangrs_core::models::PresenceMatrix;
//! use pangrs_rarefaction::{estimate_pan_core_size, fit_heaps_by_iteration};
//!
//! let matrix = PresenceMatrix::from_triplets(
//!     vec!["a".into(), "b".into(), "c".into()],
//!     vec!["g1".into(), "g2".into(), "g3".into()],
//!     &[(0, 0, 1), (0, 1, 1), (0, 2, 1), (1, 0, 1), (2, 2, 1)],
//! )
//! .unwrap();
//!
//! // seeded for reproducibility; pass None for OS entropy
//! let curve = estimate_pan_core_size(&matrix, 25, Some(42)).unwrap();
//! let fits = fit_heaps_by_iteration(&curve);
//! assert_eq!(fits.len(), 25);
//! ```
//!
//! Iterations are independent and run on the rayon pool when the
//! default-on `parallel` feature is enabled; each iteration only reads
//! the shared matrix and writes its own output rows.

pub mod consts;
pub mod curve;
pub mod estimator;
pub mod heaps;

// re-exports
pub use curve::{CurveRecord, PanCoreCurve};
pub use estimator::{RarefactionError, estimate_pan_core_size};
pub use heaps::{FitError, HeapsFit, IterationFit, fit_heaps_by_iteration, fit_heaps_mean};
