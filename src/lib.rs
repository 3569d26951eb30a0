//! Unravelling of shrunk neuronal morphologies.
//!
//! Layers, innermost first:
//! - [`domain`]: section tree, principal direction estimation, unravelling
//! - [`infrastructure`]: SWC format and filesystem access
//! - [`application`]: file and directory services
//! - [`cli`]: command line front end

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
