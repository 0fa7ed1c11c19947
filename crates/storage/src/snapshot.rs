//! Snapshot file format and atomic writing
//!
//! One snapshot file holds the entire durable state:
//!
//! ```text
//! magic            8 bytes   "LAMSNAP1"
//! format version   2 bytes   little-endian u16
//! generation       8 bytes   commit counter at write time
//! timestamp        8 bytes   microseconds since epoch
//! schema length    8 bytes   + schema descriptor as TOML text
//! section count    4 bytes
//! per section:     kind length (8) + kind bytes,
//!                  data length (8) + bincode-encoded record table
//! CRC32            4 bytes   checksum of all preceding bytes
//! ```
//!
//! Writes go to a temp file which is synced and renamed over the final path,
//! so a crash mid-write leaves the previous snapshot intact. The read path
//! verifies magic, version, and checksum before decoding any section.

use lamina_core::{EntityKind, Error, Record, RecordId, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Record tables keyed by entity kind
pub type TableMap = BTreeMap<EntityKind, BTreeMap<RecordId, Record>>;

/// Well-known snapshot file name inside the data directory
pub const SNAPSHOT_FILE_NAME: &str = "lamina.snap";

const MAGIC: &[u8; 8] = b"LAMSNAP1";
const FORMAT_VERSION: u16 = 1;

/// Decoded contents of a snapshot file
#[derive(Debug)]
pub struct SnapshotData {
    /// Commit counter at write time
    pub generation: u64,
    /// Write time, microseconds since epoch
    pub timestamp_micros: i64,
    /// Schema descriptor as TOML text
    pub schema_toml: String,
    /// Record tables keyed by entity kind
    pub tables: TableMap,
}

/// Result of a successful snapshot write
#[derive(Debug)]
pub struct SnapshotInfo {
    /// Final snapshot path
    pub path: PathBuf,
    /// File size in bytes
    pub size_bytes: u64,
    /// Generation stamped into the header
    pub generation: u64,
}

/// Write a snapshot atomically: temp file + sync + rename.
pub fn write_atomic(
    path: &Path,
    schema_toml: &str,
    tables: &TableMap,
    generation: u64,
) -> Result<SnapshotInfo> {
    let temp_path = path.with_extension("snap.tmp");

    // Stale temp file from a previous failed attempt
    if temp_path.exists() {
        warn!(temp_path = %temp_path.display(), "removing stale snapshot temp file");
        std::fs::remove_file(&temp_path)?;
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let result = write_to(&temp_path, schema_toml, tables, generation);
    match result {
        Ok(size_bytes) => {
            std::fs::rename(&temp_path, path)?;
            debug!(
                path = %path.display(),
                generation,
                size_bytes,
                sections = tables.len(),
                "snapshot written"
            );
            Ok(SnapshotInfo {
                path: path.to_path_buf(),
                size_bytes,
                generation,
            })
        }
        Err(e) => {
            let _ = std::fs::remove_file(&temp_path);
            Err(e)
        }
    }
}

fn write_to(path: &Path, schema_toml: &str, tables: &TableMap, generation: u64) -> Result<u64> {
    let mut file = File::create(path)?;
    let mut hasher = crc32fast::Hasher::new();

    let emit = |file: &mut File, hasher: &mut crc32fast::Hasher, bytes: &[u8]| -> Result<()> {
        file.write_all(bytes)?;
        hasher.update(bytes);
        Ok(())
    };

    emit(&mut file, &mut hasher, MAGIC)?;
    emit(&mut file, &mut hasher, &FORMAT_VERSION.to_le_bytes())?;
    emit(&mut file, &mut hasher, &generation.to_le_bytes())?;
    let timestamp = chrono::Utc::now().timestamp_micros();
    emit(&mut file, &mut hasher, &timestamp.to_le_bytes())?;

    let schema_bytes = schema_toml.as_bytes();
    emit(&mut file, &mut hasher, &(schema_bytes.len() as u64).to_le_bytes())?;
    emit(&mut file, &mut hasher, schema_bytes)?;

    emit(&mut file, &mut hasher, &(tables.len() as u32).to_le_bytes())?;
    for (kind, table) in tables {
        let kind_bytes = kind.as_str().as_bytes();
        emit(&mut file, &mut hasher, &(kind_bytes.len() as u64).to_le_bytes())?;
        emit(&mut file, &mut hasher, kind_bytes)?;

        let data = bincode::serialize(table)?;
        emit(&mut file, &mut hasher, &(data.len() as u64).to_le_bytes())?;
        emit(&mut file, &mut hasher, &data)?;
    }

    let checksum = hasher.finalize();
    file.write_all(&checksum.to_le_bytes())?;
    file.sync_all()?;

    Ok(std::fs::metadata(path)?.len())
}

/// Read and verify a snapshot file.
pub fn read(path: &Path) -> Result<SnapshotData> {
    let bytes = std::fs::read(path)?;
    if bytes.len() < MAGIC.len() + 2 + 8 + 8 + 8 + 4 + 4 {
        return Err(Error::Corruption(format!(
            "snapshot file too short: {} bytes",
            bytes.len()
        )));
    }

    let (body, trailer) = bytes.split_at(bytes.len() - 4);
    let stored_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let actual_crc = crc32fast::hash(body);
    if stored_crc != actual_crc {
        return Err(Error::Corruption(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            stored_crc, actual_crc
        )));
    }

    let mut cursor = Cursor::new(body);
    let magic = cursor.take(MAGIC.len())?;
    if magic != MAGIC {
        return Err(Error::Corruption("bad snapshot magic".to_string()));
    }
    let version = cursor.u16()?;
    if version != FORMAT_VERSION {
        return Err(Error::Corruption(format!(
            "unsupported snapshot format version {}",
            version
        )));
    }

    let generation = cursor.u64()?;
    let timestamp_micros = cursor.i64()?;

    let schema_len = cursor.u64()? as usize;
    let schema_toml = String::from_utf8(cursor.take(schema_len)?.to_vec())
        .map_err(|_| Error::Corruption("schema section is not UTF-8".to_string()))?;

    let section_count = cursor.u32()?;
    let mut tables = TableMap::new();
    for _ in 0..section_count {
        let kind_len = cursor.u64()? as usize;
        let kind = String::from_utf8(cursor.take(kind_len)?.to_vec())
            .map_err(|_| Error::Corruption("entity kind is not UTF-8".to_string()))?;
        let data_len = cursor.u64()? as usize;
        let data = cursor.take(data_len)?;
        let table: BTreeMap<RecordId, Record> = bincode::deserialize(data)?;
        tables.insert(EntityKind::new(kind), table);
    }

    if !cursor.at_end() {
        return Err(Error::Corruption("trailing bytes after last section".to_string()));
    }

    info!(
        path = %path.display(),
        generation,
        sections = tables.len(),
        "snapshot loaded"
    );

    Ok(SnapshotData {
        generation,
        timestamp_micros,
        schema_toml,
        tables,
    })
}

/// Bounds-checked reader over the verified snapshot body
struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| Error::Corruption("truncated snapshot section".to_string()))?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    fn i64(&mut self) -> Result<i64> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    fn at_end(&self) -> bool {
        self.offset == self.bytes.len()
    }
}
