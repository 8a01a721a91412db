//! # Delta Log
//!
//! Append-only file of committed deltas.
//!
//! ```text
//! [i32 LE record count]
//! [i32 LE length][payload]   (repeated `count` times)
//!
//! payload = [magic "GDLT"][version: 1 byte][postcard-encoded Delta]
//! ```
//!
//! The count is rewritten after each record lands, so a crash mid-append
//! leaves a torn tail past the last counted record. Readers stop at the last
//! complete record and the next append overwrites the tail.
//!
//! ## Limits
//!
//! Record lengths are checked against `MAX_DELTA_PAYLOAD_SIZE` before any
//! buffer is allocated or decoded.

use crate::delta::Delta;
use crate::primitives::{
    DELTA_FORMAT_VERSION, DELTA_HEADER_SIZE, DELTA_MAGIC, LOG_WORD_SIZE, MAX_DELTA_PAYLOAD_SIZE,
};
use crate::types::GridError;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

// =============================================================================
// PAYLOAD HEADER
// =============================================================================

/// The header that precedes every encoded delta.
#[derive(Debug, Clone, Copy)]
pub struct DeltaHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl DeltaHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *DELTA_MAGIC,
            version: DELTA_FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), GridError> {
        if &self.magic != DELTA_MAGIC {
            return Err(GridError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != DELTA_FORMAT_VERSION {
            return Err(GridError::DeserializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version, DELTA_FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; DELTA_HEADER_SIZE] {
        let mut bytes = [0u8; DELTA_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GridError> {
        if bytes.len() < DELTA_HEADER_SIZE {
            return Err(GridError::DeserializationError(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for DeltaHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// PAYLOAD CODEC
// =============================================================================

/// Encode a delta as one log payload (header + postcard body).
pub fn delta_to_bytes(delta: &Delta) -> Result<Vec<u8>, GridError> {
    let body =
        postcard::to_stdvec(delta).map_err(|e| GridError::SerializationError(e.to_string()))?;

    let mut bytes = Vec::with_capacity(DELTA_HEADER_SIZE + body.len());
    bytes.extend_from_slice(&DeltaHeader::new().to_bytes());
    bytes.extend_from_slice(&body);

    if bytes.len() > MAX_DELTA_PAYLOAD_SIZE {
        return Err(GridError::SerializationError(format!(
            "Delta payload of {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_DELTA_PAYLOAD_SIZE
        )));
    }
    Ok(bytes)
}

/// Decode one log payload. Size and header are validated first.
pub fn delta_from_bytes(bytes: &[u8]) -> Result<Delta, GridError> {
    if bytes.len() > MAX_DELTA_PAYLOAD_SIZE {
        return Err(GridError::DeserializationError(format!(
            "Payload size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_DELTA_PAYLOAD_SIZE
        )));
    }

    let header = DeltaHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[DELTA_HEADER_SIZE..]).map_err(|e| {
        GridError::DeserializationError(format!("Failed to decode delta: {}", e))
    })
}

// =============================================================================
// RECORD LAYOUT
// =============================================================================

/// Parsed view of a log file.
#[derive(Debug, Default)]
struct LogScan<'a> {
    records: Vec<&'a [u8]>,
    /// Byte offset just past the last complete record.
    end: usize,
    /// Count stored in the file header.
    declared: u32,
}

fn read_word(bytes: &[u8], offset: usize) -> Option<i32> {
    let word = bytes.get(offset..offset + LOG_WORD_SIZE)?;
    let mut buf = [0u8; LOG_WORD_SIZE];
    buf.copy_from_slice(word);
    Some(i32::from_le_bytes(buf))
}

fn scan(bytes: &[u8]) -> Result<LogScan<'_>, GridError> {
    let Some(declared) = read_word(bytes, 0) else {
        if !bytes.is_empty() {
            tracing::warn!(len = bytes.len(), "Delta log header is torn, treating log as empty");
        }
        return Ok(LogScan::default());
    };
    let declared = u32::try_from(declared)
        .map_err(|_| GridError::CorruptLog(format!("negative record count {}", declared)))?;

    let mut scan = LogScan {
        records: Vec::new(),
        end: LOG_WORD_SIZE,
        declared,
    };
    for index in 0..declared {
        let Some(len) = read_word(bytes, scan.end) else {
            tracing::warn!(index, declared, "Delta log ends before a counted record");
            break;
        };
        let len = usize::try_from(len)
            .map_err(|_| GridError::CorruptLog(format!("record {} has negative length", index)))?;
        if len > MAX_DELTA_PAYLOAD_SIZE {
            return Err(GridError::CorruptLog(format!(
                "record {} length {} exceeds maximum allowed {} bytes",
                index, len, MAX_DELTA_PAYLOAD_SIZE
            )));
        }
        let start = scan.end + LOG_WORD_SIZE;
        let Some(payload) = bytes.get(start..start + len) else {
            tracing::warn!(index, declared, "Delta log record is torn");
            break;
        };
        scan.records.push(payload);
        scan.end = start + len;
    }
    Ok(scan)
}

// =============================================================================
// DELTA LOG
// =============================================================================

/// Length-prefixed, count-headed delta log on disk.
///
/// The file is created on the first append; a missing file reads as empty.
#[derive(Debug)]
pub struct DeltaLog {
    path: PathBuf,
    sync_on_commit: bool,
    /// Complete records and the offset past the last one, once known.
    state: Option<(u32, u64)>,
}

impl DeltaLog {
    #[must_use]
    pub fn new(path: impl AsRef<Path>, sync_on_commit: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sync_on_commit,
            state: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<Vec<u8>, GridError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(GridError::IoError(e.to_string())),
        }
    }

    /// Every complete record payload, oldest first.
    pub fn read_records(&mut self) -> Result<Vec<Vec<u8>>, GridError> {
        let bytes = self.read_file()?;
        let scan = scan(&bytes)?;
        let complete = scan.records.len() as u32;
        if complete < scan.declared {
            tracing::warn!(
                declared = scan.declared,
                complete,
                "Delta log count exceeds records present"
            );
        }
        self.state = Some((complete, scan.end as u64));
        Ok(scan.records.into_iter().map(<[u8]>::to_vec).collect())
    }

    /// Number of complete records.
    pub fn record_count(&mut self) -> Result<u32, GridError> {
        Ok(self.ensure_state()?.0)
    }

    fn ensure_state(&mut self) -> Result<(u32, u64), GridError> {
        if let Some(state) = self.state {
            return Ok(state);
        }
        let bytes = self.read_file()?;
        let scan = scan(&bytes)?;
        let state = (scan.records.len() as u32, scan.end as u64);
        self.state = Some(state);
        Ok(state)
    }

    /// Append one payload and return the new record count.
    pub fn append(&mut self, payload: &[u8]) -> Result<u32, GridError> {
        if payload.len() > MAX_DELTA_PAYLOAD_SIZE {
            return Err(GridError::SerializationError(format!(
                "Record of {} bytes exceeds maximum allowed {} bytes",
                payload.len(),
                MAX_DELTA_PAYLOAD_SIZE
            )));
        }
        let len = i32::try_from(payload.len())
            .map_err(|e| GridError::SerializationError(e.to_string()))?;
        let (count, end) = self.ensure_state()?;
        let new_count = count.saturating_add(1);
        let header = i32::try_from(new_count)
            .map_err(|e| GridError::SerializationError(e.to_string()))?;

        let mut file = self.open_for_append()?;
        let io = |e: std::io::Error| GridError::IoError(e.to_string());
        let end = end.max(LOG_WORD_SIZE as u64);

        file.seek(SeekFrom::Start(end)).map_err(io)?;
        file.write_all(&len.to_le_bytes()).map_err(io)?;
        file.write_all(payload).map_err(io)?;
        let new_end = end + (LOG_WORD_SIZE + payload.len()) as u64;
        file.set_len(new_end).map_err(io)?;

        file.seek(SeekFrom::Start(0)).map_err(io)?;
        file.write_all(&header.to_le_bytes()).map_err(io)?;
        file.flush().map_err(io)?;
        if self.sync_on_commit {
            file.sync_data().map_err(io)?;
        }

        self.state = Some((new_count, new_end));
        Ok(new_count)
    }

    fn open_for_append(&self) -> Result<File, GridError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| GridError::IoError(format!("{}: {}", self.path.display(), e)))?;

        let mut head = Vec::with_capacity(LOG_WORD_SIZE);
        (&mut file)
            .take(LOG_WORD_SIZE as u64)
            .read_to_end(&mut head)
            .map_err(|e| GridError::IoError(e.to_string()))?;
        if head.len() < LOG_WORD_SIZE {
            file.seek(SeekFrom::Start(0))
                .map_err(|e| GridError::IoError(e.to_string()))?;
            file.write_all(&0_i32.to_le_bytes())
                .map_err(|e| GridError::IoError(e.to_string()))?;
        }
        Ok(file)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::ResourceDescription;
    use crate::property::Property;
    use crate::types::{DmsType, Gid, ModelCode};
    use tempfile::tempdir;

    fn sample_delta() -> Delta {
        let mut delta = Delta::new();
        let mut rd = ResourceDescription::new(Gid::of(DmsType::Switch, -1));
        rd.add_property(Property::with_value(ModelCode::IDOBJ_NAME, "Q1").expect("name"));
        rd.add_property(Property::with_value(ModelCode::SWITCH_RATEDCURRENT, 400.0_f32).expect("f"));
        delta.add_insert(rd);
        delta
    }

    #[test]
    fn header_roundtrip() {
        let bytes = DeltaHeader::new().to_bytes();
        let restored = DeltaHeader::from_bytes(&bytes).expect("parse header");
        assert_eq!(restored.magic, *DELTA_MAGIC);
        assert_eq!(restored.version, DELTA_FORMAT_VERSION);
    }

    #[test]
    fn payload_roundtrip_bit_exact() {
        let delta = sample_delta();
        let bytes = delta_to_bytes(&delta).expect("encode");
        let restored = delta_from_bytes(&bytes).expect("decode");
        assert_eq!(restored, delta);
        assert_eq!(delta_to_bytes(&restored).expect("encode"), bytes);
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = delta_to_bytes(&sample_delta()).expect("encode");
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(matches!(
            delta_from_bytes(&bytes),
            Err(GridError::DeserializationError(_))
        ));
        assert!(delta_from_bytes(&[1, 2]).is_err());
    }

    #[test]
    fn append_then_read() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("deltas.log");
        let mut log = DeltaLog::new(&path, true);
        assert!(log.read_records().expect("empty").is_empty());

        assert_eq!(log.append(b"first").expect("append"), 1);
        assert_eq!(log.append(b"second").expect("append"), 2);

        let mut reopened = DeltaLog::new(&path, false);
        let records = reopened.read_records().expect("read");
        assert_eq!(records, vec![b"first".to_vec(), b"second".to_vec()]);
        assert_eq!(reopened.record_count().expect("count"), 2);

        let raw = std::fs::read(&path).expect("raw");
        assert_eq!(&raw[0..4], &2_i32.to_le_bytes());
        assert_eq!(&raw[4..8], &5_i32.to_le_bytes());
    }

    #[test]
    fn torn_tail_ignored_and_overwritten() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("deltas.log");
        let mut log = DeltaLog::new(&path, false);
        log.append(b"kept").expect("append");

        // Simulate a crash after the record body but before the count update.
        let mut raw = std::fs::read(&path).expect("raw");
        raw.extend_from_slice(&100_i32.to_le_bytes());
        raw.extend_from_slice(b"partial");
        std::fs::write(&path, &raw).expect("write");

        let mut reopened = DeltaLog::new(&path, false);
        assert_eq!(reopened.read_records().expect("read"), vec![b"kept".to_vec()]);
        reopened.append(b"next").expect("append");

        let mut again = DeltaLog::new(&path, false);
        assert_eq!(
            again.read_records().expect("read"),
            vec![b"kept".to_vec(), b"next".to_vec()]
        );
    }

    #[test]
    fn count_larger_than_records_stops_early() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("deltas.log");
        let mut raw = Vec::new();
        raw.extend_from_slice(&3_i32.to_le_bytes());
        raw.extend_from_slice(&2_i32.to_le_bytes());
        raw.extend_from_slice(b"ok");
        std::fs::write(&path, &raw).expect("write");

        let mut log = DeltaLog::new(&path, false);
        assert_eq!(log.read_records().expect("read"), vec![b"ok".to_vec()]);
        assert_eq!(log.record_count().expect("count"), 1);
    }

    #[test]
    fn oversized_length_is_corrupt() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("deltas.log");
        let mut raw = Vec::new();
        raw.extend_from_slice(&1_i32.to_le_bytes());
        raw.extend_from_slice(&i32::MAX.to_le_bytes());
        std::fs::write(&path, &raw).expect("write");

        let mut log = DeltaLog::new(&path, false);
        assert!(matches!(log.read_records(), Err(GridError::CorruptLog(_))));
    }
}
