//! Binary format of WAL records
//!
//! Every WAL record is a fixed header followed by a payload:
//! RecordHeader (32 bytes) + key_len(u16) + value_len(u32) + operation(u8) + padding(u8) + key_bytes + value_bytes

use std::path::Path;

use crate::error::{StoreError, StoreResult};

/// Magic bytes opening every record: "MSGB"
pub const MAGIC_ARRAY: [u8; 4] = *b"MSGB";

/// Hard upper bound on key size in bytes
pub const MAX_KEY_SIZE: usize = 128;

/// Hard upper bound on value size in bytes (32MB)
pub const MAX_VALUE_SIZE: usize = 32 * 1024 * 1024;

/// Header size in bytes
pub const HEADER_SIZE: usize = 32;

/// Fixed payload prefix: key_len(2) + value_len(4) + operation(1) + padding(1)
const PAYLOAD_PREFIX: usize = 8;

/// WAL operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Operation {
    /// Insert or overwrite a key
    Put = 1,
    /// Remove a key
    Delete = 2,
}

impl Operation {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Operation::Put),
            2 => Some(Operation::Delete),
            _ => None,
        }
    }
}

/// Fixed-size header for each WAL record
///
/// Layout:
///   [0..4]   magic:      [u8;4] - "MSGB"
///   [4..8]   length:     u32    - payload length in bytes
///   [8..12]  checksum:   u32    - CRC32C of payload bytes
///   [12]     entry_type: u8     - operation type
///   [13..32] reserved, zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Magic bytes for record identification and resync after corruption
    pub magic: [u8; 4],
    /// Length of the payload (excluding this header)
    pub length: u32,
    /// CRC32C checksum of the payload bytes
    pub checksum: u32,
    /// Operation type (Put=1 or Delete=2)
    pub entry_type: u8,
}

/// A decoded WAL record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub operation: Operation,
}

impl RecordHeader {
    pub fn new(length: u32, checksum: u32, entry_type: Operation) -> Self {
        Self {
            magic: MAGIC_ARRAY,
            length,
            checksum,
            entry_type: entry_type as u8,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.length.to_le_bytes());
        buf[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        buf[12] = self.entry_type;
        buf
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);

        Self {
            magic,
            length: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            checksum: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            entry_type: bytes[12],
        }
    }
}

/// Check key and value sizes against a pair of limits.
pub fn check_sizes(key: &[u8], value: &[u8], max_key: usize, max_value: usize) -> StoreResult<()> {
    if key.len() > max_key {
        return Err(StoreError::OversizedEntry {
            entry_size: key.len() as u64,
            max_size: max_key as u64,
            component: "key",
        });
    }
    if value.len() > max_value {
        return Err(StoreError::OversizedEntry {
            entry_size: value.len() as u64,
            max_size: max_value as u64,
            component: "value",
        });
    }
    Ok(())
}

/// Serialize a key-value pair into a complete WAL record
pub fn serialize_entry(key: &[u8], value: &[u8], op: Operation) -> StoreResult<Vec<u8>> {
    // Reject before allocating
    check_sizes(key, value, MAX_KEY_SIZE, MAX_VALUE_SIZE)?;

    let payload_size = PAYLOAD_PREFIX + key.len() + value.len();

    let mut payload = Vec::with_capacity(payload_size);
    payload.extend_from_slice(&(key.len() as u16).to_le_bytes());
    payload.extend_from_slice(&(value.len() as u32).to_le_bytes());
    payload.push(op as u8);
    payload.push(0);
    payload.extend_from_slice(key);
    payload.extend_from_slice(value);

    let checksum = crc32c::crc32c(&payload);
    let header = RecordHeader::new(payload.len() as u32, checksum, op);

    let mut buffer = Vec::with_capacity(HEADER_SIZE + payload_size);
    buffer.extend_from_slice(&header.to_bytes());
    buffer.extend_from_slice(&payload);

    Ok(buffer)
}

/// Deserialize one WAL record from the start of `data`.
///
/// `path` and `base_offset` only feed error context.
pub fn deserialize_entry(data: &[u8], path: &Path, base_offset: u64) -> StoreResult<WalEntry> {
    if data.len() < HEADER_SIZE {
        return Err(StoreError::TornWrite {
            path: path.to_path_buf(),
            expected_size: HEADER_SIZE as u32,
            available_bytes: data.len() as u64,
            offset: base_offset,
        });
    }

    let mut header_bytes = [0u8; HEADER_SIZE];
    header_bytes.copy_from_slice(&data[..HEADER_SIZE]);
    let header = RecordHeader::from_bytes(&header_bytes);

    if header.magic != MAGIC_ARRAY {
        return Err(StoreError::NoMagicFound {
            path: path.to_path_buf(),
            offset: base_offset,
            found_bytes: header.magic,
        });
    }

    let payload_end = HEADER_SIZE + header.length as usize;
    if data.len() < payload_end {
        return Err(StoreError::TornWrite {
            path: path.to_path_buf(),
            expected_size: header.length,
            available_bytes: (data.len() - HEADER_SIZE) as u64,
            offset: base_offset + HEADER_SIZE as u64,
        });
    }

    let payload = &data[HEADER_SIZE..payload_end];

    let computed = crc32c::crc32c(payload);
    if computed != header.checksum {
        return Err(StoreError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: header.checksum,
            actual: computed,
            offset: base_offset + HEADER_SIZE as u64,
        });
    }

    if payload.len() < PAYLOAD_PREFIX {
        return Err(StoreError::WalCorrupted {
            path: path.to_path_buf(),
            offset: base_offset + HEADER_SIZE as u64,
            reason: "Payload too short for length fields".to_string(),
        });
    }

    let key_len = u16::from_le_bytes([payload[0], payload[1]]) as usize;
    let value_len = u32::from_le_bytes([payload[2], payload[3], payload[4], payload[5]]) as usize;
    let operation = Operation::from_byte(payload[6]).ok_or_else(|| StoreError::WalCorrupted {
        path: path.to_path_buf(),
        offset: base_offset + HEADER_SIZE as u64 + 6,
        reason: format!("Invalid operation type: {}", payload[6]),
    })?;

    let key_end = PAYLOAD_PREFIX + key_len;
    let value_end = key_end + value_len;
    if payload.len() != value_end {
        return Err(StoreError::WalCorrupted {
            path: path.to_path_buf(),
            offset: base_offset + HEADER_SIZE as u64,
            reason: format!("Payload is {} bytes but key({}) + value({}) need {}",
                            payload.len(), key_len, value_len, value_end),
        });
    }

    Ok(WalEntry {
        key: payload[PAYLOAD_PREFIX..key_end].to_vec(),
        value: payload[key_end..value_end].to_vec(),
        operation,
    })
}
