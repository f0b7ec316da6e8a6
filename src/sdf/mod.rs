//! Scene description model populated by the Crate reader.
//!
//! - [`Token`] / [`TokenRegistry`] - interned strings
//! - [`Path`] - hierarchical scene paths
//! - [`Spec`], [`SpecType`], [`Specifier`] - addressable objects
//! - [`PrimSpec`] - named containers forming the hierarchy
//! - [`Layer`] - the spec directory of one file

mod token;
mod path;
mod spec;
mod prim_spec;
mod layer;

pub use token::{Token, TokenRegistry};
pub use path::{
    is_valid_identifier, is_valid_namespaced_identifier, Path, PathElement, CHILD_DELIMITER,
    NAMESPACE_DELIMITER, PROPERTY_DELIMITER,
};
pub use spec::{FieldEntry, Spec, SpecType, Specifier};
pub use prim_spec::{PrimSpec, PSEUDO_ROOT_NAME};
pub use layer::{CompositionPolicy, Layer, SpecId, SpecObject};
