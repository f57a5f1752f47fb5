use thiserror::Error;

#[derive(Error, Debug)]
pub enum PresenceMatrixError {
    #[error("duplicate gene label: {0}")]
    DuplicateGeneLabel(String),

    #[error("duplicate genome label: {0}")]
    DuplicateGenomeLabel(String),

    #[error("{axis} label count {found} does not match matrix dimension {expected}")]
    LabelCountMismatch {
        axis: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("entry ({row}, {col}) is outside the matrix shape")]
    EntryOutOfBounds { row: usize, col: usize },

    #[error("malformed matrix file: {0}")]
    Format(String),

    #[error("matrix too large to densify: {rows} x {cols}")]
    DenseAllocation { rows: usize, cols: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
