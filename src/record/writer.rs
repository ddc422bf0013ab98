//! Record Writers
//!
//! Append-only writers for framed record files and raw id/value output.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{NumberError, Result};

use super::{MAGIC, VERSION};

/// Destination for reduce output
pub trait RecordSink: Send {
    /// Append one key/value pair
    fn append(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Flush, sync and close; returns the number of pairs written
    fn finish(self: Box<Self>) -> Result<u64>;
}

fn create_truncated(path: &Path) -> Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    Ok(BufWriter::new(file))
}

fn sync_and_close(writer: BufWriter<File>, path: &Path) -> Result<()> {
    let file = writer.into_inner().map_err(|e| {
        let err = e.into_error();
        NumberError::Io(std::io::Error::new(
            err.kind(),
            format!("Failed to flush {}: {}", path.display(), err),
        ))
    })?;
    file.sync_all()?;
    Ok(())
}

// =============================================================================
// Framed Record Writer
// =============================================================================

/// Writes a framed record file
pub struct RecordWriter {
    /// Output file path
    path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Number of entries written
    entry_count: u64,
    /// Running CRC hasher for data section
    data_hasher: crc32fast::Hasher,
}

impl RecordWriter {
    /// Create (or truncate) a record file and write its header
    pub fn create(path: &Path) -> Result<Self> {
        let mut writer = create_truncated(path)?;

        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_be_bytes())?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            entry_count: 0,
            data_hasher: crc32fast::Hasher::new(),
        })
    }

    /// Append a key/value pair
    pub fn append(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let key_len = u32::try_from(key.len())
            .map_err(|_| NumberError::Argument(format!("key too large: {} bytes", key.len())))?;
        let val_len = u32::try_from(value.len()).map_err(|_| {
            NumberError::Argument(format!("value too large: {} bytes", value.len()))
        })?;

        let key_len_bytes = key_len.to_be_bytes();
        let val_len_bytes = val_len.to_be_bytes();

        self.writer.write_all(&key_len_bytes)?;
        self.writer.write_all(&val_len_bytes)?;
        self.writer.write_all(key)?;
        self.writer.write_all(value)?;

        self.data_hasher.update(&key_len_bytes);
        self.data_hasher.update(&val_len_bytes);
        self.data_hasher.update(key);
        self.data_hasher.update(value);

        self.entry_count += 1;
        Ok(())
    }

    /// Number of entries appended so far
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Write the footer, flush and fsync
    pub fn finish(mut self) -> Result<u64> {
        let data_crc = self.data_hasher.finalize();

        self.writer.write_all(&self.entry_count.to_be_bytes())?;
        self.writer.write_all(&data_crc.to_be_bytes())?;

        sync_and_close(self.writer, &self.path)?;
        Ok(self.entry_count)
    }
}

impl RecordSink for RecordWriter {
    fn append(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        RecordWriter::append(self, key, value)
    }

    fn finish(self: Box<Self>) -> Result<u64> {
        RecordWriter::finish(*self)
    }
}

// =============================================================================
// Raw Writer
// =============================================================================

/// Writes key bytes immediately followed by value bytes, no framing
///
/// Consumers must know the key width out of band.
pub struct RawWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    entry_count: u64,
}

impl RawWriter {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            writer: create_truncated(path)?,
            entry_count: 0,
        })
    }
}

impl RecordSink for RawWriter {
    fn append(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.writer.write_all(key)?;
        self.writer.write_all(value)?;
        self.entry_count += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<u64> {
        let this = *self;
        sync_and_close(this.writer, &this.path)?;
        Ok(this.entry_count)
    }
}
