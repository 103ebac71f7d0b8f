//! Snapshot persistence for the content index store.
//!
//! A snapshot is the whole row table in one blob: a fixed header, a bincode
//! payload, and a CRC32 footer over the payload. Loading verifies the magic,
//! the format version, and the checksum before touching the payload, so a
//! truncated or corrupted blob fails loudly instead of resurrecting half a
//! store.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TesseraError};
use crate::index::{ContentIndexStore, StoredRow};
use crate::storage::Storage;

const MAGIC: &[u8; 4] = b"TSRA";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotPayload {
    dimension: usize,
    next_row_id: u64,
    rows: Vec<(u64, StoredRow)>,
}

/// Encode the store into a snapshot blob.
pub fn encode(store: &ContentIndexStore) -> Result<Vec<u8>> {
    let payload = {
        let inner = store.read();
        let mut rows: Vec<(u64, StoredRow)> = inner
            .rows
            .iter()
            .map(|(&row_id, row)| (row_id, row.clone()))
            .collect();
        rows.sort_by_key(|(row_id, _)| *row_id);
        SnapshotPayload {
            dimension: store.dimension(),
            next_row_id: inner.next_row_id,
            rows,
        }
    };

    let body = bincode::serialize(&payload)
        .map_err(|e| TesseraError::serialization(format!("snapshot encode: {e}")))?;

    let mut out = Vec::with_capacity(body.len() + 16);
    out.extend_from_slice(MAGIC);
    out.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    out.write_u64::<LittleEndian>(body.len() as u64)?;
    out.extend_from_slice(&body);
    out.write_u32::<LittleEndian>(crc32fast::hash(&body))?;
    Ok(out)
}

/// Decode a snapshot blob into a fresh store.
pub fn decode(bytes: &[u8]) -> Result<ContentIndexStore> {
    let mut cursor = Cursor::new(bytes);

    let mut magic = [0u8; 4];
    std::io::Read::read_exact(&mut cursor, &mut magic)?;
    if &magic != MAGIC {
        return Err(TesseraError::serialization("snapshot: bad magic"));
    }
    let version = cursor.read_u32::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(TesseraError::serialization(format!(
            "snapshot: unsupported format version {version}"
        )));
    }
    let body_len = cursor.read_u64::<LittleEndian>()? as usize;
    let body_start = cursor.position() as usize;
    let body_end = body_start
        .checked_add(body_len)
        .filter(|end| end.checked_add(4).is_some_and(|e| e <= bytes.len()))
        .ok_or_else(|| TesseraError::serialization("snapshot: truncated body"))?;

    let body = &bytes[body_start..body_end];
    let mut footer = Cursor::new(&bytes[body_end..]);
    let stored_crc = footer.read_u32::<LittleEndian>()?;
    if crc32fast::hash(body) != stored_crc {
        return Err(TesseraError::serialization("snapshot: checksum mismatch"));
    }

    let payload: SnapshotPayload = bincode::deserialize(body)
        .map_err(|e| TesseraError::serialization(format!("snapshot decode: {e}")))?;

    Ok(ContentIndexStore::from_snapshot_parts(
        payload.dimension,
        payload.next_row_id,
        payload.rows,
    ))
}

/// Write a snapshot of the store under `name`.
pub fn save(store: &ContentIndexStore, storage: &dyn Storage, name: &str) -> Result<()> {
    let blob = encode(store)?;
    storage.write(name, &blob)
}

/// Load a store from the snapshot stored under `name`.
pub fn load(storage: &dyn Storage, name: &str) -> Result<ContentIndexStore> {
    let blob = storage.read(name)?;
    decode(&blob)
}
