//! Diversity scoring: taxonomy normalization, sub-scores, and constraints

pub mod diversity;
pub mod taxonomy;

pub use diversity::DiversityScorer;
