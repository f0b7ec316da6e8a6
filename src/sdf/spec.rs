//! Spec types and the common spec record.

use std::fmt;

use super::path::Path;
use super::token::Token;
use crate::crate_file::ValueRep;
use crate::util::{Error, Result};

/// Kind of an addressable scene object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum SpecType {
    #[default]
    Unknown = 0,
    Attribute = 1,
    Connection = 2,
    Expression = 3,
    Mapper = 4,
    MapperArg = 5,
    Prim = 6,
    PseudoRoot = 7,
    Relationship = 8,
    RelationshipTarget = 9,
    Variant = 10,
    VariantSet = 11,
}

impl SpecType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Attribute => "Attribute",
            Self::Connection => "Connection",
            Self::Expression => "Expression",
            Self::Mapper => "Mapper",
            Self::MapperArg => "MapperArg",
            Self::Prim => "Prim",
            Self::PseudoRoot => "PseudoRoot",
            Self::Relationship => "Relationship",
            Self::RelationshipTarget => "RelationshipTarget",
            Self::Variant => "Variant",
            Self::VariantSet => "VariantSet",
        }
    }

    /// Prims and the pseudo-root are composed into the name hierarchy.
    pub fn is_prim_like(&self) -> bool {
        matches!(self, Self::Prim | Self::PseudoRoot)
    }
}

impl TryFrom<u32> for SpecType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Ok(match value {
            0 => Self::Unknown,
            1 => Self::Attribute,
            2 => Self::Connection,
            3 => Self::Expression,
            4 => Self::Mapper,
            5 => Self::MapperArg,
            6 => Self::Prim,
            7 => Self::PseudoRoot,
            8 => Self::Relationship,
            9 => Self::RelationshipTarget,
            10 => Self::Variant,
            11 => Self::VariantSet,
            other => return Err(Error::invalid(format!("unknown spec type {}", other))),
        })
    }
}

impl fmt::Display for SpecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a prim spec contributes to the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Specifier {
    /// Defines a concrete prim.
    #[default]
    Def,
    /// Overrides an existing prim.
    Over,
    /// Defines an abstract prim.
    Class,
}

impl Specifier {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Def => "def",
            Self::Over => "over",
            Self::Class => "class",
        }
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A named field of a spec with its raw value representation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldEntry {
    pub name: Token,
    pub value: ValueRep,
}

/// Any addressable object in a layer: a path, a type and its fields.
#[derive(Clone, Debug)]
pub struct Spec {
    path: Path,
    spec_type: SpecType,
    fields: Vec<FieldEntry>,
}

impl Spec {
    pub fn new(path: Path, spec_type: SpecType) -> Self {
        Self {
            path,
            spec_type,
            fields: Vec::new(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldEntry>) -> Self {
        self.fields = fields;
        self
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn spec_type(&self) -> SpecType {
        self.spec_type
    }

    pub fn fields(&self) -> &[FieldEntry] {
        &self.fields
    }

    /// Field names in file order.
    pub fn list_fields(&self) -> impl Iterator<Item = &Token> {
        self.fields.iter().map(|f| &f.name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field(&self, name: &str) -> Option<ValueRep> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value)
    }

    pub(crate) fn set_fields(&mut self, fields: Vec<FieldEntry>) {
        self.fields = fields;
    }
}
