//! Block codec for Crate compressed payloads.
//!
//! Every compressed payload is framed as one leading chunk-count byte
//! followed by a raw (unframed) LZ4 block. Only single-chunk payloads
//! (chunk count 0) are supported; multi-chunk streams are reported as
//! [`Error::Unsupported`].

use super::streams::ByteCursor;
use crate::util::{Error, Result};

/// Chunk-count byte of a single-chunk frame.
pub const SINGLE_CHUNK: u8 = 0;

/// Upper bound on LZ4 output per input byte (one match-length extension
/// byte adds at most 255 bytes of output).
const MAX_LZ4_RATIO: usize = 255;

/// Largest frame (chunk byte included) a payload of `uncompressed` bytes
/// can compress to.
pub fn max_compressed_size(uncompressed: usize) -> usize {
    1 + lz4_flex::block::get_maximum_output_size(uncompressed)
}

/// Decode one frame into a buffer pre-sized to `uncompressed_size`.
///
/// Returns only the bytes the decoder actually wrote. Producing more than
/// `uncompressed_size` bytes is an error.
pub fn decompress_block(frame: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    let (&num_chunks, block) = frame
        .split_first()
        .ok_or_else(|| Error::invalid("empty compressed frame"))?;

    if num_chunks != SINGLE_CHUNK {
        return Err(Error::unsupported(format!(
            "compressed payload with {} chunks",
            num_chunks
        )));
    }

    // A corrupt size field must not turn into a huge allocation.
    let capacity = uncompressed_size.min(block.len().saturating_mul(MAX_LZ4_RATIO) + 16);
    let mut output = vec![0u8; capacity];
    let written = lz4_flex::block::decompress_into(block, &mut output)
        .map_err(|e| Error::Decompression(e.to_string()))?;
    output.truncate(written);

    if written != uncompressed_size {
        tracing::trace!(written, declared = uncompressed_size, "short block");
    }
    Ok(output)
}

/// Read a `compressed_size`-byte frame at the cursor and decode it.
pub fn read_compressed_block(
    cursor: &mut ByteCursor<'_>,
    compressed_size: u64,
    uncompressed_size: usize,
) -> Result<Vec<u8>> {
    let at = cursor.position();
    let len = usize::try_from(compressed_size)
        .map_err(|_| Error::UnexpectedEof(at.saturating_add(compressed_size)))?;
    let frame = cursor.read_bytes(len)?;
    decompress_block(frame, uncompressed_size)
}

#[cfg(test)]
pub(crate) fn compress_block(data: &[u8]) -> Vec<u8> {
    let mut frame = vec![SINGLE_CHUNK];
    frame.extend_from_slice(&lz4_flex::block::compress(data));
    frame
}
