//! Big-endian input transports.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[cfg(feature = "persist")]
use memmap2::Mmap;

use super::io_utils::classify_io_error;
use crate::error::DbError;

/// Source of serialized tables.
///
/// Every read checks the remaining length first, so a short stream fails
/// with `Truncated` instead of reading past its end.
pub trait SerializeInput {
    /// Fills `buf` completely.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), DbError>;

    /// Bytes left in the stream.
    fn remaining(&self) -> usize;

    fn read_u8(&mut self) -> Result<u8, DbError> {
        let mut b = [0u8; 1];
        self.read_into(&mut b)?;
        Ok(b[0])
    }

    fn read_i8(&mut self) -> Result<i8, DbError> {
        let mut b = [0u8; 1];
        self.read_into(&mut b)?;
        Ok(i8::from_be_bytes(b))
    }

    fn read_i16(&mut self) -> Result<i16, DbError> {
        let mut b = [0u8; 2];
        self.read_into(&mut b)?;
        Ok(i16::from_be_bytes(b))
    }

    fn read_i32(&mut self) -> Result<i32, DbError> {
        let mut b = [0u8; 4];
        self.read_into(&mut b)?;
        Ok(i32::from_be_bytes(b))
    }

    fn read_i64(&mut self) -> Result<i64, DbError> {
        let mut b = [0u8; 8];
        self.read_into(&mut b)?;
        Ok(i64::from_be_bytes(b))
    }

    fn read_f64(&mut self) -> Result<f64, DbError> {
        let mut b = [0u8; 8];
        self.read_into(&mut b)?;
        Ok(f64::from_be_bytes(b))
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, DbError> {
        if len > self.remaining() {
            return Err(DbError::Truncated {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let mut bytes = vec![0u8; len];
        self.read_into(&mut bytes)?;
        Ok(bytes)
    }
}

/// Cursor over a borrowed byte slice.
#[derive(Debug, Clone, Copy)]
pub struct BufferInput<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BufferInput<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl SerializeInput for BufferInput<'_> {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), DbError> {
        if buf.len() > self.remaining() {
            return Err(DbError::Truncated {
                needed: buf.len(),
                remaining: self.remaining(),
            });
        }
        let end = self.position + buf.len();
        buf.copy_from_slice(&self.data[self.position..end]);
        self.position = end;
        Ok(())
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.position
    }
}

/// Buffered streaming reader over a file.
#[derive(Debug)]
pub struct FileInput {
    reader: BufReader<File>,
    remaining: usize,
}

impl FileInput {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| classify_io_error(e, &format!("Failed to open {}", path.display())))?;
        let len = file
            .metadata()
            .map_err(|e| classify_io_error(e, "Failed to stat table file"))?
            .len();
        Ok(Self {
            reader: BufReader::new(file),
            remaining: readable_length(len)?,
        })
    }
}

/// A file longer than the address space cannot be read into rows.
fn readable_length(len: u64) -> Result<usize, DbError> {
    usize::try_from(len).map_err(|_| DbError::CapacityOverflow {
        operation: "table file length",
    })
}

impl SerializeInput for FileInput {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), DbError> {
        if buf.len() > self.remaining {
            return Err(DbError::Truncated {
                needed: buf.len(),
                remaining: self.remaining,
            });
        }
        self.reader
            .read_exact(buf)
            .map_err(|e| classify_io_error(e, "Failed to read table file"))?;
        self.remaining -= buf.len();
        Ok(())
    }

    fn remaining(&self) -> usize {
        self.remaining
    }
}

/// Read-only memory map of a table file.
#[cfg(feature = "persist")]
#[derive(Debug)]
pub struct MappedFile {
    mmap: Mmap,
}

#[cfg(feature = "persist")]
impl MappedFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| classify_io_error(e, &format!("Failed to open {}", path.display())))?;
        // SAFETY: the map is read-only and table files are not modified while mapped.
        let mmap = unsafe {
            Mmap::map(&file).map_err(|e| classify_io_error(e, "Failed to memory map file"))?
        };
        Ok(Self { mmap })
    }

    pub fn input(&self) -> BufferInput<'_> {
        BufferInput::new(&self.mmap)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}
