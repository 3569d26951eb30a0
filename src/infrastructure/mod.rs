//! Infrastructure layer: filesystem access and the SWC morphology format

pub mod swc;
pub mod traits;

pub use swc::SwcError;
pub use traits::{FileSystem, RealFileSystem};
