//! Append-only vector log.
//!
//! The log is the single source of truth: a 64-byte file header followed by
//! variable-length records, each a 32-byte header plus the vector payload.
//! Records are never rewritten except for the one tombstone byte. Every
//! mutation flushes before returning.
//!
//! All multi-byte fields are little-endian on disk, independent of host
//! order.

use crate::error::{Error, Result};
use crate::similarity::DistanceMetric;
use crate::storage::vector_bytes::{bytes_to_vector, vector_to_bytes};
use crate::util::{fs as fs_util, unix_timestamp};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::error;

/// Magic prefix of a log file ("CVEC").
pub const FILE_MAGIC: u32 = 0x4356_4543;

/// Current log file version.
pub const FILE_VERSION: u32 = 1;

/// Size of the file header in bytes.
pub const FILE_HEADER_LEN: u64 = 64;

/// Size of a record header in bytes.
pub const RECORD_HEADER_LEN: u64 = 32;

/// Offset of the tombstone byte within a record header.
const TOMBSTONE_BYTE_OFFSET: u64 = 20;

/// Decoded file header.
#[derive(Debug, Clone, Copy)]
pub struct FileHeader {
    /// Declared vector dimension.
    pub dimension: u32,
    /// Declared default metric.
    pub metric: DistanceMetric,
    /// Live vector count at last header write.
    pub live_count: u64,
    /// Next id at last header write.
    pub next_id: u64,
    /// Creation time, unix seconds.
    pub created: u64,
    /// Last modification time, unix seconds.
    pub modified: u64,
}

impl FileHeader {
    fn encode(&self) -> [u8; FILE_HEADER_LEN as usize] {
        let mut buf = [0u8; FILE_HEADER_LEN as usize];
        buf[0..4].copy_from_slice(&FILE_MAGIC.to_le_bytes());
        buf[4..8].copy_from_slice(&FILE_VERSION.to_le_bytes());
        buf[8..12].copy_from_slice(&self.dimension.to_le_bytes());
        buf[12..16].copy_from_slice(&self.metric.as_u32().to_le_bytes());
        buf[16..24].copy_from_slice(&self.live_count.to_le_bytes());
        buf[24..32].copy_from_slice(&self.next_id.to_le_bytes());
        buf[32..40].copy_from_slice(&self.created.to_le_bytes());
        buf[40..48].copy_from_slice(&self.modified.to_le_bytes());
        // buf[48..64] reserved, zero
        buf
    }

    fn decode(buf: &[u8; FILE_HEADER_LEN as usize]) -> Result<Self> {
        let magic = u32::from_le_bytes(buf[0..4].try_into().expect("slice of 4"));
        if magic != FILE_MAGIC {
            return Err(Error::Corrupt("bad log file magic".to_string()));
        }
        let version = u32::from_le_bytes(buf[4..8].try_into().expect("slice of 4"));
        if version != FILE_VERSION {
            return Err(Error::Corrupt(format!(
                "unsupported log file version {version}"
            )));
        }
        let dimension = u32::from_le_bytes(buf[8..12].try_into().expect("slice of 4"));
        let metric_code = u32::from_le_bytes(buf[12..16].try_into().expect("slice of 4"));
        let metric = DistanceMetric::from_u32(metric_code)
            .ok_or_else(|| Error::Corrupt(format!("unknown metric code {metric_code}")))?;

        Ok(Self {
            dimension,
            metric,
            live_count: u64::from_le_bytes(buf[16..24].try_into().expect("slice of 8")),
            next_id: u64::from_le_bytes(buf[24..32].try_into().expect("slice of 8")),
            created: u64::from_le_bytes(buf[32..40].try_into().expect("slice of 8")),
            modified: u64::from_le_bytes(buf[40..48].try_into().expect("slice of 8")),
        })
    }
}

/// Decoded record header.
#[derive(Debug, Clone, Copy)]
pub struct RecordHeader {
    /// Vector id.
    pub id: u64,
    /// Vector dimension.
    pub dimension: u32,
    /// Write time, unix seconds.
    pub timestamp: u64,
    /// True once the record is logically deleted.
    pub tombstoned: bool,
}

impl RecordHeader {
    fn encode(&self) -> [u8; RECORD_HEADER_LEN as usize] {
        let mut buf = [0u8; RECORD_HEADER_LEN as usize];
        buf[0..8].copy_from_slice(&self.id.to_le_bytes());
        buf[8..12].copy_from_slice(&self.dimension.to_le_bytes());
        buf[12..20].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[20] = u8::from(self.tombstoned);
        // buf[21..32] reserved, zero
        buf
    }

    fn decode(buf: &[u8; RECORD_HEADER_LEN as usize]) -> Self {
        Self {
            id: u64::from_le_bytes(buf[0..8].try_into().expect("slice of 8")),
            dimension: u32::from_le_bytes(buf[8..12].try_into().expect("slice of 4")),
            timestamp: u64::from_le_bytes(buf[12..20].try_into().expect("slice of 8")),
            tombstoned: buf[20] != 0,
        }
    }
}

/// The on-disk vector log.
///
/// The file handle lives behind a mutex so concurrent shared-mode readers
/// never interleave seeks.
#[derive(Debug)]
pub struct VectorLog {
    path: PathBuf,
    file: Mutex<File>,
    dimension: u32,
    metric: DistanceMetric,
    created: u64,
}

impl VectorLog {
    /// Creates a fresh log file and writes its header.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if a file is present at `path`; I/O errors
    /// pass through.
    pub fn create<P: AsRef<Path>>(
        path: P,
        dimension: u32,
        metric: DistanceMetric,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if fs_util::file_exists(&path) {
            return Err(Error::AlreadyExists(path.display().to_string()));
        }
        fs_util::ensure_parent_dir(&path)?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        let now = unix_timestamp();
        let header = FileHeader {
            dimension,
            metric,
            live_count: 0,
            next_id: 1,
            created: now,
            modified: now,
        };
        file.write_all(&header.encode())?;
        file.sync_data()?;

        Ok(Self {
            path,
            file: Mutex::new(file),
            dimension,
            metric,
            created: now,
        })
    }

    /// Opens an existing log, validating its header.
    ///
    /// # Errors
    ///
    /// Returns `StoreNotFound` if the file is absent and `Corrupt` on a bad
    /// magic, version, or truncated header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<(Self, FileHeader)> {
        let path = path.as_ref().to_path_buf();
        if !fs_util::file_exists(&path) {
            return Err(Error::StoreNotFound(path.display().to_string()));
        }

        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let mut buf = [0u8; FILE_HEADER_LEN as usize];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut buf)
            .map_err(|_| Error::Corrupt("log file shorter than its header".to_string()))?;
        let header = FileHeader::decode(&buf)?;

        Ok((
            Self {
                path,
                file: Mutex::new(file),
                dimension: header.dimension,
                metric: header.metric,
                created: header.created,
            },
            header,
        ))
    }

    /// Declared vector dimension.
    #[must_use]
    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    /// Declared default metric.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a live record and flushes. Returns the record's offset.
    ///
    /// # Errors
    ///
    /// I/O errors pass through; nothing is retried.
    pub fn append(&self, id: u64, timestamp: u64, data: &[f32]) -> Result<u64> {
        let header = RecordHeader {
            id,
            dimension: self.dimension,
            timestamp,
            tombstoned: false,
        };

        let mut buf = Vec::with_capacity(RECORD_HEADER_LEN as usize + data.len() * 4);
        buf.extend_from_slice(&header.encode());
        buf.extend_from_slice(&vector_to_bytes(data));

        let mut file = self.file.lock();
        let offset = file.seek(SeekFrom::End(0))?;
        file.write_all(&buf)?;
        file.sync_data()?;
        Ok(offset)
    }

    /// Reads the record at `offset`: its header and payload.
    ///
    /// # Errors
    ///
    /// I/O errors (including short reads) pass through.
    pub fn read_record(&self, offset: u64) -> Result<(RecordHeader, Vec<f32>)> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut header_buf = [0u8; RECORD_HEADER_LEN as usize];
        file.read_exact(&mut header_buf)?;
        let header = RecordHeader::decode(&header_buf);

        let mut data_buf = vec![0u8; header.dimension as usize * 4];
        file.read_exact(&mut data_buf)?;

        Ok((header, bytes_to_vector(&data_buf)))
    }

    /// Flips the tombstone byte of the record at `offset` and flushes.
    ///
    /// # Errors
    ///
    /// I/O errors pass through.
    pub fn set_tombstone(&self, offset: u64) -> Result<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset + TOMBSTONE_BYTE_OFFSET))?;
        file.write_all(&[1u8])?;
        file.sync_data()?;
        Ok(())
    }

    /// Rewrites the file header with current counters and flushes.
    ///
    /// # Errors
    ///
    /// I/O errors pass through.
    pub fn rewrite_header(&self, live_count: u64, next_id: u64) -> Result<()> {
        let header = FileHeader {
            dimension: self.dimension,
            metric: self.metric,
            live_count,
            next_id,
            created: self.created,
            modified: unix_timestamp(),
        };

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header.encode())?;
        file.sync_data()?;
        Ok(())
    }

    /// Current file size in bytes.
    ///
    /// # Errors
    ///
    /// I/O errors pass through.
    pub fn size(&self) -> Result<u64> {
        let mut file = self.file.lock();
        Ok(file.seek(SeekFrom::End(0))?)
    }

    /// Walks every record from the front of the log.
    ///
    /// Live records are delivered with their payload; tombstoned records
    /// with `None`. A trailing partial record stops the scan silently, as it
    /// is treated as absent.
    ///
    /// # Errors
    ///
    /// Non-EOF I/O errors pass through.
    pub fn scan<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(u64, &RecordHeader, Option<Vec<f32>>),
    {
        let file = self.file.lock();
        let mut reader = BufReader::new(&*file);
        reader.seek(SeekFrom::Start(FILE_HEADER_LEN))?;

        let mut offset = FILE_HEADER_LEN;
        loop {
            let mut header_buf = [0u8; RECORD_HEADER_LEN as usize];
            match reader.read_exact(&mut header_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let header = RecordHeader::decode(&header_buf);
            let payload_len = u64::from(header.dimension) * 4;

            if header.tombstoned {
                reader.seek(SeekFrom::Start(offset + RECORD_HEADER_LEN + payload_len))?;
                visit(offset, &header, None);
            } else {
                let mut data_buf = vec![0u8; payload_len as usize];
                match reader.read_exact(&mut data_buf) {
                    Ok(()) => visit(offset, &header, Some(bytes_to_vector(&data_buf))),
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                    Err(e) => return Err(e.into()),
                }
            }

            offset += RECORD_HEADER_LEN + payload_len;
        }

        Ok(())
    }
}

impl Drop for VectorLog {
    fn drop(&mut self) {
        // Best-effort flush; the per-write syncs make this a formality.
        if let Some(file) = self.file.try_lock() {
            if let Err(e) = file.sync_all() {
                error!(?e, path = %self.path.display(), "failed to sync vector log on drop");
            }
        }
    }
}
