//! Field tables: packed value representations, fields and field sets.

use std::fmt;

use super::format::FIELD_SET_TERMINATOR;
use crate::util::{Error, Result};

const IS_ARRAY_BIT: u64 = 1 << 63;
const IS_INLINED_BIT: u64 = 1 << 62;
const IS_COMPRESSED_BIT: u64 = 1 << 61;
const TYPE_SHIFT: u32 = 48;
const PAYLOAD_MASK: u64 = (1 << 48) - 1;

/// Packed 64-bit description of a field value and where it lives.
///
/// Only the bit layout is exposed; the value itself is never decoded here.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ValueRep(pub u64);

impl ValueRep {
    #[inline]
    pub fn bits(&self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.0 & IS_ARRAY_BIT != 0
    }

    /// Value stored in the payload itself rather than at an offset.
    #[inline]
    pub fn is_inlined(&self) -> bool {
        self.0 & IS_INLINED_BIT != 0
    }

    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.0 & IS_COMPRESSED_BIT != 0
    }

    /// On-disk value type id.
    #[inline]
    pub fn type_id(&self) -> u8 {
        (self.0 >> TYPE_SHIFT) as u8
    }

    /// Low 48 bits: inline value or file offset.
    #[inline]
    pub fn payload(&self) -> u64 {
        self.0 & PAYLOAD_MASK
    }
}

impl fmt::Debug for ValueRep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueRep")
            .field("type", &self.type_id())
            .field("array", &self.is_array())
            .field("inlined", &self.is_inlined())
            .field("compressed", &self.is_compressed())
            .field("payload", &format_args!("{:#x}", self.payload()))
            .finish()
    }
}

/// One entry of the FIELDS section: a name (token index) and its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    pub token_index: u32,
    pub value_rep: ValueRep,
}

/// Flat FIELDSETS table.
///
/// Each spec's field list is a run of field indices terminated by
/// [`FIELD_SET_TERMINATOR`]; a spec refers to its list by start offset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldSets {
    indices: Vec<u32>,
}

impl FieldSets {
    pub fn new(indices: Vec<u32>) -> Self {
        Self { indices }
    }

    /// Raw table, terminators included.
    pub fn as_slice(&self) -> &[u32] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Field indices of the set starting at `start`, terminator excluded.
    pub fn fields_at(&self, start: u32) -> Result<&[u32]> {
        let tail = self
            .indices
            .get(start as usize..)
            .filter(|tail| !tail.is_empty())
            .ok_or_else(|| Error::out_of_bounds("field set", start, self.indices.len()))?;
        let len = tail
            .iter()
            .position(|&i| i == FIELD_SET_TERMINATOR)
            .ok_or_else(|| Error::invalid(format!("field set at {} is not terminated", start)))?;
        Ok(&tail[..len])
    }

    /// Start offsets of every set in the table.
    pub fn starts(&self) -> impl Iterator<Item = u32> + '_ {
        std::iter::once(0)
            .chain(
                self.indices
                    .iter()
                    .enumerate()
                    .filter(|&(_, &i)| i == FIELD_SET_TERMINATOR)
                    .map(|(pos, _)| pos as u32 + 1),
            )
            .filter(move |&start| (start as usize) < self.indices.len())
    }
}
