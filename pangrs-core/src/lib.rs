//! Core infrastructure for pangenome presence/absence analysis in Rust.
//!
//! This crate provides the shared data model for the pangrs project: a
//! compact, labeled, sparse gene-by-genome presence matrix plus its
//! persistence format. Downstream crates (rarefaction curves, core-genome
//! estimation) only ever read the matrix; it is immutable after
//! construction and safe to share across threads.
//!
//! ## Quick start
//!
//! ```rust
//! use pangrs_core::models::PresenceMatrix;
//!
//! // three genes across two genomes
//! let matrix = PresenceMatrix::from_triplets(
//!     vec!["geneA".into(), "geneB".into(), "geneC".into()],
//!     vec!["genome1".into(), "genome2".into()],
//!     &[(0, 0, 1), (0, 1, 1), (1, 0, 1), (2, 1, 2)],
//! )
//! .unwrap();
//!
//! assert_eq!(matrix.num_genes(), 3);
//! assert!(matrix.is_present(0, 1));
//! assert!(!matrix.is_present(1, 1));
//! ```
//!
//! The persisted form is a gzipped Matrix Market triplet file plus two
//! parallel label-list files (one label per line); see [`matrix_market`].

pub mod errors;
pub mod matrix_market;
pub mod models;

// re-exports
pub use errors::PresenceMatrixError;
pub use matrix_market::{read_matrix_market, write_matrix_market};
pub use models::PresenceMatrix;
