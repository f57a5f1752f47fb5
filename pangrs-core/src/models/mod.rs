pub mod presence_matrix;

pub use presence_matrix::PresenceMatrix;
