//! Delta/run-length integer compression used by the structural sections.
//!
//! A decoded (post-LZ4) buffer holding `n` integers is laid out as:
//!
//! ```text
//! +---------------------------+
//! | common value              |  accumulator-sized, little-endian
//! +---------------------------+
//! | codes                     |  ceil(n / 4) bytes, 2 bits per integer,
//! |                           |  low bits = earliest integer
//! +---------------------------+
//! | deltas                    |  variable length, one per non-zero code
//! +---------------------------+
//! ```
//!
//! Integers are cumulative: each code adds either the common value or the
//! next delta to a running accumulator, and the accumulator is emitted.
//! Delta widths depend on the target width:
//!
//! | code | 4-byte target | 8-byte target |
//! |------|---------------|---------------|
//! | 0    | common value  | common value  |
//! | 1    | 1 byte        | 2 bytes       |
//! | 2    | 2 bytes       | 4 bytes       |
//! | 3    | 4 bytes       | 8 bytes       |

use std::fmt::Debug;

use super::compression::{max_compressed_size, read_compressed_block};
use super::streams::ByteCursor;
use crate::util::{Error, Result};

/// Signed type the running sum is kept in.
pub trait Accumulator: Copy + Debug {
    /// Size of the common value on disk.
    const SIZE: usize;

    fn zero() -> Self;

    fn read_le(cursor: &mut ByteCursor<'_>) -> Result<Self>;

    /// Convert a delta read from disk, saturating if it does not fit.
    fn from_delta(delta: i64) -> Self;

    /// Two's-complement addition.
    fn accumulate(self, rhs: Self) -> Self;

    fn to_i64(self) -> i64;
}

impl Accumulator for i32 {
    const SIZE: usize = 4;

    fn zero() -> Self {
        0
    }

    fn read_le(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        cursor.read_i32()
    }

    fn from_delta(delta: i64) -> Self {
        delta.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    fn accumulate(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }

    fn to_i64(self) -> i64 {
        self as i64
    }
}

impl Accumulator for i64 {
    const SIZE: usize = 8;

    fn zero() -> Self {
        0
    }

    fn read_le(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        cursor.read_i64()
    }

    fn from_delta(delta: i64) -> Self {
        delta
    }

    fn accumulate(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }

    fn to_i64(self) -> i64 {
        self
    }
}

/// On-disk element type of a compressed integer array.
pub trait CodedInt: Copy + Default + Debug {
    /// Element width in bytes.
    const SIZE: usize;

    /// Narrow an accumulator value, keeping the low bits.
    fn from_bits(value: i64) -> Self;
}

macro_rules! impl_coded_int {
    ($($ty:ty),*) => {
        $(
            impl CodedInt for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn from_bits(value: i64) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

impl_coded_int!(u32, i32, u64, i64);

/// Byte widths of the deltas for codes 1, 2 and 3.
#[inline]
const fn delta_widths(target_size: usize) -> [usize; 3] {
    if target_size <= 4 {
        [1, 2, 4]
    } else {
        [2, 4, 8]
    }
}

/// Worst-case size of the decoded buffer for `num_ints` integers.
pub fn encoded_buffer_size<T: CodedInt, S: Accumulator>(num_ints: usize) -> usize {
    if num_ints == 0 {
        return 0;
    }
    let common = T::SIZE.max(S::SIZE);
    common
        .saturating_add(num_ints.saturating_mul(2).saturating_add(7) / 8)
        .saturating_add(num_ints.saturating_mul(T::SIZE))
}

fn read_delta(values: &mut ByteCursor<'_>, width: usize) -> Result<i64> {
    Ok(match width {
        1 => values.read_i8()? as i64,
        2 => values.read_i16()? as i64,
        4 => values.read_i32()? as i64,
        _ => values.read_i64()?,
    })
}

/// Decode `num_ints` integers from an already decompressed buffer.
pub fn decode_integers<T: CodedInt, S: Accumulator>(data: &[u8], num_ints: usize) -> Result<Vec<T>> {
    if num_ints == 0 {
        return Ok(Vec::new());
    }

    let mut cursor = ByteCursor::new(data);
    let common = S::read_le(&mut cursor)?;
    let codes = cursor.read_bytes(num_ints.div_ceil(4)).map_err(|_| {
        Error::invalid(format!(
            "integer buffer of {} bytes too short for {} codes",
            data.len(),
            num_ints
        ))
    })?;
    // Deltas start right after the codes.
    let mut values = cursor;
    let widths = delta_widths(T::SIZE);

    let mut output = Vec::with_capacity(num_ints);
    let mut prev = S::zero();

    for (batch, &code_byte) in codes.iter().enumerate() {
        let in_batch = (num_ints - batch * 4).min(4);
        for slot in 0..in_batch {
            let code = (code_byte >> (2 * slot)) & 0b11;
            let step = match code {
                0 => common,
                _ => S::from_delta(read_delta(&mut values, widths[code as usize - 1])?),
            };
            prev = prev.accumulate(step);
            output.push(T::from_bits(prev.to_i64()));
        }
    }

    Ok(output)
}

/// Read one compressed integer array at the cursor.
///
/// Layout: u64 compressed size, then a block-codec frame of that size.
/// The declared size is clamped to the largest frame `num_ints` integers
/// can produce, so a corrupt size field cannot consume the rest of the file.
pub fn read_compressed_integers<T: CodedInt, S: Accumulator>(
    cursor: &mut ByteCursor<'_>,
    num_ints: usize,
) -> Result<Vec<T>> {
    let at = cursor.position();
    let declared = cursor.read_u64()?;
    let working_size = encoded_buffer_size::<T, S>(num_ints);
    let max_frame = max_compressed_size(working_size) as u64;
    let compressed_size = declared.min(max_frame);
    if compressed_size < declared {
        tracing::warn!(
            offset = at,
            declared,
            clamped = compressed_size,
            "compressed integer size exceeds worst case"
        );
    }

    if num_ints == 0 {
        cursor.skip(compressed_size as usize)?;
        return Ok(Vec::new());
    }

    let decoded = read_compressed_block(cursor, compressed_size, working_size)?;
    let ints = decode_integers::<T, S>(&decoded, num_ints)?;
    tracing::trace!(
        offset = at,
        count = num_ints,
        compressed = compressed_size,
        decoded = decoded.len(),
        "decoded integer array"
    );
    Ok(ints)
}
