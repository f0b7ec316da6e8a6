//! Byte sources and bounded cursors for Crate data.
//!
//! A [`CrateSource`] owns the immutable bytes of one file, either memory
//! mapped or read into memory. Section decoders never share a cursor: each
//! one gets its own [`ByteCursor`] over the same slice.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;

use super::format::HEADER_SIZE;
use crate::util::{Error, Result};

/// Immutable backing bytes of a Crate file.
pub struct CrateSource {
    inner: SourceInner,
}

enum SourceInner {
    /// Memory-mapped file (preferred for large files)
    Mmap(Mmap),
    /// Owned buffer (file read into memory, or caller-supplied bytes)
    Owned(Vec<u8>),
}

impl CrateSource {
    /// Open a file, memory mapping it when the `mmap` feature is on.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, cfg!(feature = "mmap"))
    }

    /// Open a file with optional memory mapping.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let size = file.metadata()?.len();
        if size < HEADER_SIZE as u64 {
            return Err(Error::UnexpectedEof(size));
        }

        let inner = if use_mmap {
            // Safety: the map is read-only and never outlives the source.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            SourceInner::Mmap(mmap)
        } else {
            let mut buf = Vec::with_capacity(size as usize);
            file.read_to_end(&mut buf)?;
            SourceInner::Owned(buf)
        };

        tracing::debug!(path = %path.display(), size, mmap = use_mmap, "opened crate source");
        Ok(Self { inner })
    }

    /// Wrap bytes that are already in memory.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            inner: SourceInner::Owned(bytes),
        }
    }

    /// True when backed by a memory map.
    pub fn is_mapped(&self) -> bool {
        matches!(self.inner, SourceInner::Mmap(_))
    }

    /// The whole file.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.inner {
            SourceInner::Mmap(mmap) => mmap,
            SourceInner::Owned(buf) => buf,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Little-endian read cursor over a borrowed byte slice.
///
/// Every read is bounds-checked and fails with [`Error::UnexpectedEof`]
/// carrying the offset that could not be satisfied.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Cursor positioned at `pos`.
    pub fn at(data: &'a [u8], pos: u64) -> Result<Self> {
        let mut cursor = Self::new(data);
        cursor.seek(pos)?;
        Ok(cursor)
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Move to an absolute offset. Seeking to the very end is allowed.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.data.len() as u64 {
            return Err(Error::UnexpectedEof(pos));
        }
        self.pos = pos as usize;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Borrow the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(Error::UnexpectedEof((self.pos as u64).saturating_add(n as u64)))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.read_bytes(8)?))
    }

    /// Read a u64 count and check it against the bytes left.
    ///
    /// `min_element_size` is the smallest number of bytes each element can
    /// occupy on disk; it keeps a corrupt count from driving a huge
    /// allocation.
    pub fn read_count(&mut self, min_element_size: usize) -> Result<usize> {
        let at = self.position();
        let count = self.read_u64()?;
        let needed = count.saturating_mul(min_element_size as u64);
        if needed > self.remaining() as u64 {
            return Err(Error::invalid(format!(
                "count {} at offset {:#x} exceeds remaining {} bytes",
                count,
                at,
                self.remaining()
            )));
        }
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_reads_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0xFF, 0xFE, 0x80];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u32().unwrap(), 0x0403_0201);
        assert_eq!(cursor.read_i16().unwrap(), -257);
        assert_eq!(cursor.read_i8().unwrap(), -128);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_cursor_eof_reports_offset() {
        let data = [0u8; 6];
        let mut cursor = ByteCursor::at(&data, 2).unwrap();
        match cursor.read_u64() {
            Err(Error::UnexpectedEof(pos)) => assert_eq!(pos, 10),
            other => panic!("expected eof, got {:?}", other),
        }
        // failed read leaves the cursor where it was
        assert_eq!(cursor.position(), 2);
        assert!(ByteCursor::at(&data, 7).is_err());
        assert!(ByteCursor::at(&data, 6).is_ok());
    }

    #[test]
    fn test_read_count_guards_allocation() {
        let mut data = Vec::new();
        data.extend_from_slice(&1_000_000u64.to_le_bytes());
        data.extend_from_slice(&[0u8; 16]);
        assert!(ByteCursor::new(&data).read_count(4).is_err());

        let mut data = Vec::new();
        data.extend_from_slice(&4u64.to_le_bytes());
        data.extend_from_slice(&[0u8; 16]);
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_count(4).unwrap(), 4);
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn test_source_from_vec() {
        let source = CrateSource::from_vec(vec![1, 2, 3]);
        assert_eq!(source.as_bytes(), &[1, 2, 3]);
        assert!(!source.is_mapped());
        assert_eq!(source.len(), 3);
    }
}
