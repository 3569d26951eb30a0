//! Domain layer: morphology model and the unravelling algorithm
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading, no logging).

pub mod error;
pub mod morphology;
pub mod principal;
pub mod unravel;

pub use error::{DomainError, DomainResult};
pub use morphology::{Morphology, Point, PreOrderIter, Section, SectionType, Soma};
pub use principal::principal_direction;
pub use unravel::{
    unravel, unravel_section, window_bounds, SectionFailure, UnravelOptions,
    DEFAULT_WINDOW_HALF_LENGTH,
};
