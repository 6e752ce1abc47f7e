//! Error types for the record store engine
//!
//! Every failure the engine can report is a `StoreError`. Absence of a key is
//! never an error; lookups return `Option` instead.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Engine failure, carrying the file and offset involved where there is one.
#[derive(Debug, Clone)]
pub enum StoreError {
    /// Filesystem call failed. `path` is `None` when converted from a bare
    /// `io::Error`.
    Io {
        path: Option<PathBuf>,
        kind: io::ErrorKind,
        message: String,
    },

    /// A WAL record could not be interpreted
    WalCorrupted {
        path: PathBuf,
        offset: u64,
        reason: String,
    },

    /// Snapshots are renamed into place only after a full sync, so damage
    /// in one is reported rather than skipped.
    SnapshotCorrupted {
        path: PathBuf,
        offset: u64,
        reason: String,
    },

    /// Stored CRC32C does not match the record bytes
    ChecksumMismatch {
        path: PathBuf,
        expected: u32,
        actual: u32,
        offset: u64,
    },

    /// Record runs past the end of the file
    TornWrite {
        path: PathBuf,
        expected_size: u32,
        available_bytes: u64,
        offset: u64,
    },

    /// Key or value larger than the configured limit
    OversizedEntry {
        /// `"key"` or `"value"`
        component: &'static str,
        entry_size: u64,
        max_size: u64,
    },

    /// Record header does not start with the format magic
    NoMagicFound {
        path: PathBuf,
        offset: u64,
        found_bytes: [u8; 4],
    },

    /// Rejected by `Config::validate`
    InvalidConfig { reason: String },
}

impl StoreError {
    /// `Io` error tagged with the path and the step that failed.
    pub(crate) fn io_at(path: impl Into<PathBuf>, err: &io::Error, what: &str) -> Self {
        StoreError::Io {
            path: Some(path.into()),
            kind: err.kind(),
            message: format!("{}: {}", what, err),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io { path: Some(path), kind, message } => {
                write!(f, "{} [{}] ({:?})", message, path.display(), kind)
            }
            StoreError::Io { path: None, kind, message } => {
                write!(f, "io failure: {} ({:?})", message, kind)
            }
            StoreError::WalCorrupted { path, offset, reason } => {
                write!(f, "corrupt WAL record at {}+{}: {}", path.display(), offset, reason)
            }
            StoreError::SnapshotCorrupted { path, offset, reason } => {
                write!(f, "corrupt snapshot at {}+{}: {}", path.display(), offset, reason)
            }
            StoreError::ChecksumMismatch { path, expected, actual, offset } => write!(
                f,
                "checksum mismatch at {}+{}: stored {:#010x}, computed {:#010x}",
                path.display(),
                offset,
                expected,
                actual
            ),
            StoreError::TornWrite { path, expected_size, available_bytes, offset } => write!(
                f,
                "torn record at {}+{}: needs {} bytes, file has {}",
                path.display(),
                offset,
                expected_size,
                available_bytes
            ),
            StoreError::OversizedEntry { component, entry_size, max_size } => {
                write!(f, "{} of {} bytes exceeds the {} byte limit", component, entry_size, max_size)
            }
            StoreError::NoMagicFound { path, offset, found_bytes } => write!(
                f,
                "no record magic at {}+{} (found {:02x?})",
                path.display(),
                offset,
                found_bytes
            ),
            StoreError::InvalidConfig { reason } => write!(f, "invalid store config: {}", reason),
        }
    }
}

impl Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io { path: None, kind: err.kind(), message: err.to_string() }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_display_shows_both_values() {
        let err = StoreError::ChecksumMismatch {
            path: PathBuf::from("/tmp/wal-0000000000000000.log"),
            expected: 0x12345678,
            actual: 0x87654321,
            offset: 1024,
        };

        let display = err.to_string();
        assert!(display.starts_with("checksum mismatch"));
        assert!(display.contains("0x12345678"));
        assert!(display.contains("0x87654321"));
        assert!(display.contains("+1024"));
    }

    #[test]
    fn test_bare_io_error_has_no_path() {
        let err: StoreError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(
            err,
            StoreError::Io { kind: io::ErrorKind::NotFound, path: None, .. }
        ));
    }

    #[test]
    fn test_io_at_keeps_path() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = StoreError::io_at("/data/wal", &io_err, "create WAL directory");
        let display = err.to_string();
        assert!(display.contains("/data/wal"));
        assert!(display.contains("create WAL directory"));
    }

    #[test]
    fn test_oversized_names_component() {
        let err = StoreError::OversizedEntry { component: "key", entry_size: 200, max_size: 128 };
        assert_eq!(err.to_string(), "key of 200 bytes exceeds the 128 byte limit");
    }
}
