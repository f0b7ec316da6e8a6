//! Low-level Crate (.usdc) binary container.
//!
//! ## File Structure
//!
//! ```text
//! +---------------------+
//! | Magic: "PXR-USDC"   |  8 bytes
//! +---------------------+
//! | Version             |  3 bytes (major, minor, patch)
//! +---------------------+
//! | Padding             |  5 bytes
//! +---------------------+
//! | TOC offset          |  8 bytes (u64 LE)
//! +---------------------+
//! | ... Sections ...    |
//! +---------------------+
//! | TOC                 |  u64 count, then per section:
//! |                     |  16-byte name, u64 start, u64 end
//! +---------------------+
//! ```
//!
//! Structural sections (`TOKENS`, `STRINGS`, `FIELDS`, `FIELDSETS`,
//! `PATHS`, `SPECS`) are decoded into a [`CrateFile`]; anything else in the
//! TOC is skipped.

mod format;
mod streams;
mod compression;
mod integer_coding;
mod tokens;
mod paths;
mod value_rep;
mod reader;

pub use format::*;
pub use streams::{ByteCursor, CrateSource};
pub use compression::{decompress_block, max_compressed_size, read_compressed_block, SINGLE_CHUNK};
pub use integer_coding::{
    decode_integers, encoded_buffer_size, read_compressed_integers, Accumulator, CodedInt,
};
pub use tokens::{decode_token_buffer, read_tokens};
pub use paths::{build_paths, read_paths, Jump};
pub use value_rep::{Field, FieldSets, ValueRep};
pub use reader::{read_toc, CrateFile, ReadOptions, SpecRecord};
