//! Record Reader
//!
//! Streams entries out of a framed record file and validates the footer.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{NumberError, Result};

use super::{Record, ENTRY_HEADER_SIZE, FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// Sequential reader over one record file
///
/// Iterates entries in file order. After the last entry the entry count and
/// CRC from the footer are checked; a mismatch is reported as the final item.
pub struct RecordReader {
    path: PathBuf,
    file: BufReader<File>,
    /// Stop reading when we reach this offset (start of footer)
    end_offset: u64,
    /// Current position in file
    current_offset: u64,
    /// Footer values
    expected_count: u64,
    expected_crc: u32,
    /// Running state
    entries_read: u64,
    data_hasher: crc32fast::Hasher,
    done: bool,
}

impl RecordReader {
    /// Open a record file, validating header and reading the footer
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(NumberError::Corruption(format!(
                "{}: file too short for a record file ({} bytes)",
                path.display(),
                file_size
            )));
        }

        // Read and validate header
        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(NumberError::Corruption(format!(
                "{}: invalid magic: expected DNID, got {:?}",
                path.display(),
                &header[0..4]
            )));
        }

        let version = u16::from_be_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(NumberError::Corruption(format!(
                "{}: unsupported record file version: {}",
                path.display(),
                version
            )));
        }

        // Read footer
        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&footer[0..8]);
        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&footer[8..12]);

        // Back to the data block
        file.seek(SeekFrom::Start(HEADER_SIZE))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: BufReader::new(file),
            end_offset: file_size - FOOTER_SIZE,
            current_offset: HEADER_SIZE,
            expected_count: u64::from_be_bytes(count_bytes),
            expected_crc: u32::from_be_bytes(crc_bytes),
            entries_read: 0,
            data_hasher: crc32fast::Hasher::new(),
            done: false,
        })
    }

    /// Whether `path` starts with the record file magic
    ///
    /// Raw output and empty files do not.
    pub fn has_header(path: &Path) -> Result<bool> {
        let mut magic = [0u8; 4];
        let mut file = File::open(path)?;
        match file.read_exact(&mut magic) {
            Ok(()) => Ok(&magic == MAGIC),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Entry count recorded in the footer
    pub fn entry_count(&self) -> u64 {
        self.expected_count
    }

    /// Path this reader was opened on
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the next entry, or `None` once the data block is exhausted
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if self.done {
            return Ok(None);
        }

        if self.current_offset >= self.end_offset {
            self.done = true;
            self.check_footer()?;
            return Ok(None);
        }

        let remaining = self.end_offset - self.current_offset;
        if remaining < ENTRY_HEADER_SIZE {
            self.done = true;
            return Err(self.corruption("truncated entry header"));
        }

        let mut header = [0u8; ENTRY_HEADER_SIZE as usize];
        self.file.read_exact(&mut header)?;
        let key_len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
        let val_len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as u64;

        if ENTRY_HEADER_SIZE + key_len + val_len > remaining {
            self.done = true;
            return Err(self.corruption(&format!(
                "entry at offset {} overruns data block (key {} + value {} bytes)",
                self.current_offset, key_len, val_len
            )));
        }

        let mut key = vec![0u8; key_len as usize];
        self.file.read_exact(&mut key)?;
        let mut value = vec![0u8; val_len as usize];
        self.file.read_exact(&mut value)?;

        self.data_hasher.update(&header);
        self.data_hasher.update(&key);
        self.data_hasher.update(&value);

        self.current_offset += ENTRY_HEADER_SIZE + key_len + val_len;
        self.entries_read += 1;

        Ok(Some(Record {
            key: Bytes::from(key),
            value: Bytes::from(value),
        }))
    }

    fn check_footer(&self) -> Result<()> {
        if self.entries_read != self.expected_count {
            return Err(self.corruption(&format!(
                "footer declares {} entries, read {}",
                self.expected_count, self.entries_read
            )));
        }
        let crc = self.data_hasher.clone().finalize();
        if crc != self.expected_crc {
            return Err(self.corruption(&format!(
                "CRC mismatch: footer {:#010x}, computed {:#010x}",
                self.expected_crc, crc
            )));
        }
        Ok(())
    }

    fn corruption(&self, detail: &str) -> NumberError {
        NumberError::Corruption(format!("{}: {}", self.path.display(), detail))
    }
}

impl Iterator for RecordReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
