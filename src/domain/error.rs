//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violated geometric or structural preconditions.
///
/// Sections are identified by their pre-order position in the morphology,
/// which is stable between an input tree and its unravelled copy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("section {section} has no points")]
    EmptySection { section: usize },

    #[error("section {section}: point {point} has a non-finite coordinate")]
    NonFiniteCoordinate { section: usize, point: usize },

    #[error("section {section}: expected {expected} points, got {actual}")]
    PointCountMismatch {
        section: usize,
        expected: usize,
        actual: usize,
    },

    #[error("section has {points} points but {radii} radii")]
    RadiusCountMismatch { points: usize, radii: usize },

    #[error("section not found in morphology")]
    SectionNotFound,
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
