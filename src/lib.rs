//! # usdc
//!
//! Rust reader for Pixar USD "Crate" (.usdc) binary scene description files.
//!
//! Crate is the binary container of the USD file format family. This crate
//! decodes its table of contents and structural sections (tokens, fields,
//! field sets, paths, specs) and composes them into a [`sdf::Layer`]: a
//! directory of specs addressable by path, rooted at a pseudo-root prim.
//!
//! ## Modules
//!
//! - [`util`] - Error handling
//! - [`crate_file`] - Low-level Crate container: TOC, compression, sections
//! - [`sdf`] - Scene description model (tokens, paths, specs, layers)
//!
//! ## Example
//!
//! ```ignore
//! use usdc::sdf::{Layer, SpecType};
//!
//! let layer = Layer::open("scene.usdc")?;
//! assert_eq!(layer.spec_type("/World"), SpecType::Prim);
//!
//! for child in layer.name_children(layer.pseudo_root()) {
//!     println!("{}", child.name());
//! }
//! ```

pub mod util;
pub mod crate_file;
pub mod sdf;

/// UTC time this crate was built, RFC 3339.
pub const BUILD_STAMP: &str = env!("USDC_BUILD_STAMP");

// Re-export commonly used types
pub use util::{Error, Result};
pub use crate_file::{CrateFile, ReadOptions};
pub use sdf::{Layer, Path, PrimSpec, SpecType, Token, TokenRegistry};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::crate_file::{CrateFile, ReadOptions, Version};
    pub use crate::sdf::{
        CompositionPolicy, Layer, Path, PrimSpec, Spec, SpecObject, SpecType, Specifier, Token,
        TokenRegistry,
    };
}
