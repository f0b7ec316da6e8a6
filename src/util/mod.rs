//! Utility types shared by the reader and the scene model.
//!
//! - [`Error`] / [`Result`] - Error handling

mod error;

pub use error::*;
