//! Big-endian output transports.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::io_utils::classify_io_error;
use crate::error::DbError;

/// Sink for serialized tables.
///
/// All integers are written big-endian. `write_i32_at` patches a value
/// already written, which is how the leading length prefix gets filled in.
pub trait SerializeOutput {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), DbError>;

    /// Bytes written so far.
    fn position(&self) -> usize;

    /// Overwrites four bytes at `position`.
    fn write_i32_at(&mut self, position: usize, value: i32) -> Result<(), DbError>;

    fn write_u8(&mut self, value: u8) -> Result<(), DbError> {
        self.write_bytes(&[value])
    }

    fn write_i8(&mut self, value: i8) -> Result<(), DbError> {
        self.write_bytes(&value.to_be_bytes())
    }

    fn write_i16(&mut self, value: i16) -> Result<(), DbError> {
        self.write_bytes(&value.to_be_bytes())
    }

    fn write_i32(&mut self, value: i32) -> Result<(), DbError> {
        self.write_bytes(&value.to_be_bytes())
    }

    fn write_i64(&mut self, value: i64) -> Result<(), DbError> {
        self.write_bytes(&value.to_be_bytes())
    }

    fn write_f64(&mut self, value: f64) -> Result<(), DbError> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Writes a zero placeholder and returns its position.
    fn reserve_i32(&mut self) -> Result<usize, DbError> {
        let at = self.position();
        self.write_i32(0)?;
        Ok(at)
    }
}

/// Growable in-memory output.
#[derive(Debug, Default, Clone)]
pub struct BufferOutput {
    buf: Vec<u8>,
}

impl BufferOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Takes the written bytes, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

impl SerializeOutput for BufferOutput {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), DbError> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn position(&self) -> usize {
        self.buf.len()
    }

    fn write_i32_at(&mut self, position: usize, value: i32) -> Result<(), DbError> {
        let end = position
            .checked_add(4)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                DbError::IoError(format!(
                    "patch at {} is past the end of a {} byte buffer",
                    position,
                    self.buf.len()
                ))
            })?;
        self.buf[position..end].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}

/// Buffered file output. Call [`FileOutput::finish`] to flush and sync.
#[derive(Debug)]
pub struct FileOutput {
    writer: BufWriter<File>,
    position: usize,
    path: PathBuf,
}

impl FileOutput {
    /// Creates or truncates `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, DbError> {
        Self::with_buffer_size(path, 64 * 1024)
    }

    pub fn with_buffer_size(path: impl AsRef<Path>, buffer_size: usize) -> Result<Self, DbError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .map_err(|e| classify_io_error(e, &format!("Failed to create {}", path.display())))?;
        Ok(Self {
            writer: BufWriter::with_capacity(buffer_size, file),
            position: 0,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes buffered bytes and syncs the file to disk.
    ///
    /// # Returns
    /// `Result<usize, DbError>` with the file length.
    pub fn finish(mut self) -> Result<usize, DbError> {
        self.writer
            .flush()
            .map_err(|e| classify_io_error(e, "Failed to flush table file"))?;
        self.writer
            .get_ref()
            .sync_all()
            .map_err(|e| classify_io_error(e, "Failed to sync table file"))?;
        Ok(self.position)
    }
}

impl SerializeOutput for FileOutput {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), DbError> {
        self.writer
            .write_all(bytes)
            .map_err(|e| classify_io_error(e, "Failed to write table file"))?;
        self.position += bytes.len();
        Ok(())
    }

    fn position(&self) -> usize {
        self.position
    }

    fn write_i32_at(&mut self, position: usize, value: i32) -> Result<(), DbError> {
        if position + 4 > self.position {
            return Err(DbError::IoError(format!(
                "patch at {} is past the end of {}",
                position,
                self.path.display()
            )));
        }
        // BufWriter flushes before seeking.
        self.writer
            .seek(SeekFrom::Start(position as u64))
            .and_then(|_| self.writer.write_all(&value.to_be_bytes()))
            .and_then(|_| self.writer.seek(SeekFrom::Start(self.position as u64)))
            .map_err(|e| classify_io_error(e, "Failed to patch table file"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_is_big_endian() {
        let mut out = BufferOutput::new();
        out.write_i16(0x0102).unwrap();
        out.write_i32(-1).unwrap();
        out.write_i64(1).unwrap();
        assert_eq!(
            out.data(),
            &[1, 2, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0, 0, 0, 0, 1]
        );
    }

    #[test]
    fn test_buffer_patch() {
        let mut out = BufferOutput::new();
        let at = out.reserve_i32().unwrap();
        out.write_u8(9).unwrap();
        out.write_i32_at(at, 1).unwrap();
        assert_eq!(out.data(), &[0, 0, 0, 1, 9]);
        assert!(out.write_i32_at(3, 0).is_err());
    }

    #[test]
    fn test_file_patch_matches_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut file = FileOutput::with_buffer_size(&path, 8).unwrap();
        let mut buf = BufferOutput::new();
        for out in [&mut file as &mut dyn SerializeOutput, &mut buf] {
            let at = out.reserve_i32().unwrap();
            out.write_bytes(b"0123456789abcdef").unwrap();
            out.write_f64(1.5).unwrap();
            let len = (out.position() - at - 4) as i32;
            out.write_i32_at(at, len).unwrap();
        }
        assert_eq!(file.finish().unwrap(), buf.size());
        assert_eq!(std::fs::read(&path).unwrap(), buf.data());
    }
}
