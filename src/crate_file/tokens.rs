//! TOKENS section: the file's interned string table.
//!
//! ```text
//! u64 token count
//! u64 uncompressed size
//! u64 compressed size
//! [compressed size] block-codec frame -> NUL-terminated UTF-8 strings
//! ```

use super::compression::read_compressed_block;
use super::streams::ByteCursor;
use crate::sdf::{Token, TokenRegistry};
use crate::util::{Error, Result};

/// Read the TOKENS section at the cursor, interning every string.
///
/// The returned vector is indexed by on-disk token index.
pub fn read_tokens(cursor: &mut ByteCursor<'_>, registry: &TokenRegistry) -> Result<Vec<Token>> {
    let num_tokens = cursor.read_u64()?;
    let uncompressed_size = cursor.read_u64()?;
    let compressed_size = cursor.read_u64()?;

    let uncompressed_size = usize::try_from(uncompressed_size)
        .map_err(|_| Error::invalid(format!("token buffer size {} too large", uncompressed_size)))?;
    let chars = read_compressed_block(cursor, compressed_size, uncompressed_size)?;
    let tokens = decode_token_buffer(&chars, num_tokens, registry)?;

    tracing::debug!(
        count = tokens.len(),
        bytes = chars.len(),
        "read token table"
    );
    Ok(tokens)
}

/// Split a decompressed token buffer into `num_tokens` interned tokens.
pub fn decode_token_buffer(
    chars: &[u8],
    num_tokens: u64,
    registry: &TokenRegistry,
) -> Result<Vec<Token>> {
    if chars.last() != Some(&0) {
        return Err(Error::invalid("token buffer is not NUL-terminated"));
    }
    // Every token takes at least its terminator.
    if num_tokens > chars.len() as u64 {
        return Err(Error::invalid(format!(
            "{} tokens cannot fit in {} bytes",
            num_tokens,
            chars.len()
        )));
    }

    let mut tokens = Vec::with_capacity(num_tokens as usize);
    // Drop the final NUL so only terminated strings are yielded.
    let mut strings = chars[..chars.len() - 1].split(|&b| b == 0);
    for index in 0..num_tokens {
        let raw = strings.next().ok_or_else(|| {
            Error::invalid(format!("token buffer ends before token {}", index))
        })?;
        tokens.push(registry.intern(std::str::from_utf8(raw)?));
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crate_file::compression::compress_block;

    #[test]
    fn test_decode_buffer() {
        let registry = TokenRegistry::new();
        let tokens = decode_token_buffer(b"a\0bb\0ccc\0", 3, &registry).unwrap();
        let text: Vec<&str> = tokens.iter().map(Token::as_str).collect();
        assert_eq!(text, vec!["a", "bb", "ccc"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_missing_final_nul() {
        let registry = TokenRegistry::new();
        let err = decode_token_buffer(b"a\0bb\0ccc", 3, &registry).unwrap_err();
        assert!(matches!(err, Error::InvalidStructure(_)));
        assert!(decode_token_buffer(b"", 0, &registry).is_err());
    }

    #[test]
    fn test_count_exceeds_strings() {
        let registry = TokenRegistry::new();
        assert!(decode_token_buffer(b"a\0b\0", 3, &registry).is_err());
        assert!(decode_token_buffer(b"a\0", 1000, &registry).is_err());
    }

    #[test]
    fn test_trailing_terminator_is_not_a_token() {
        let registry = TokenRegistry::new();
        let err = decode_token_buffer(b"a\0", 2, &registry).unwrap_err();
        assert!(matches!(err, Error::InvalidStructure(_)));

        let tokens = decode_token_buffer(b"\0", 1, &registry).unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_empty());
    }

    #[test]
    fn test_duplicates_share_ids() {
        let registry = TokenRegistry::new();
        let tokens = decode_token_buffer(b"x\0y\0x\0", 3, &registry).unwrap();
        assert_eq!(tokens[0], tokens[2]);
        assert_eq!(tokens[0].id(), tokens[2].id());
        assert_ne!(tokens[0], tokens[1]);
    }

    #[test]
    fn test_empty_token_allowed() {
        let registry = TokenRegistry::new();
        let tokens = decode_token_buffer(b"\0Root\0", 2, &registry).unwrap();
        assert!(tokens[0].is_empty());
        assert_eq!(tokens[1], "Root");
    }

    #[test]
    fn test_read_section() {
        let chars = b"Root\0Mesh\0";
        let frame = compress_block(chars);
        let mut data = Vec::new();
        data.extend_from_slice(&2u64.to_le_bytes());
        data.extend_from_slice(&(chars.len() as u64).to_le_bytes());
        data.extend_from_slice(&(frame.len() as u64).to_le_bytes());
        data.extend_from_slice(&frame);

        let registry = TokenRegistry::new();
        let tokens = read_tokens(&mut ByteCursor::new(&data), &registry).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], "Root");
        assert_eq!(tokens[1], "Mesh");
    }
}
