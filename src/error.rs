//! Error handling for Seisloader
//!
//! Fatal conditions (decode failures, store unavailability) carry the
//! offending file or resource so the run aborts with a clear message.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Seisloader operations
pub type Result<T> = std::result::Result<T, SeismicError>;

/// Main error type for Seisloader operations
#[derive(Error, Debug)]
pub enum SeismicError {
    // Input Errors
    #[error("Input directory not found: {path}")]
    InputDirNotFound { path: PathBuf },

    #[error("Failed to read waveform file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Unsupported data encoding {encoding} in {path}")]
    UnsupportedEncoding { path: PathBuf, encoding: u8 },

    // Trace Errors
    #[error("Invalid trace {id}: {reason}")]
    InvalidTrace { id: String, reason: String },

    // Storage Errors
    #[error("Cannot open sample store at {path}: {source}")]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Sample store write failed for {trace_id}: {source}")]
    StoreWrite {
        trace_id: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Sample store error: {0}")]
    Store(#[from] rusqlite::Error),

    // Station Lookup Errors
    #[error("Station lookup failed for {station}: {reason}")]
    StationLookup { station: String, reason: String },

    #[error("Station lookup service unavailable: {reason}")]
    LookupUnavailable { reason: String },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Output Errors
    #[error("Failed to write output {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SeismicError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SeismicError::InputDirNotFound { .. } => "INPUT_DIR_NOT_FOUND",
            SeismicError::FileRead { .. } => "FILE_READ",
            SeismicError::Decode { .. } => "DECODE_FAILED",
            SeismicError::UnsupportedEncoding { .. } => "UNSUPPORTED_ENCODING",
            SeismicError::InvalidTrace { .. } => "INVALID_TRACE",
            SeismicError::StoreOpen { .. } => "STORE_OPEN",
            SeismicError::StoreWrite { .. } => "STORE_WRITE",
            SeismicError::Store(_) => "STORE_ERROR",
            SeismicError::StationLookup { .. } => "STATION_LOOKUP",
            SeismicError::LookupUnavailable { .. } => "LOOKUP_UNAVAILABLE",
            SeismicError::InvalidConfig { .. } => "INVALID_CONFIG",
            SeismicError::OutputWrite { .. } => "OUTPUT_WRITE",
            SeismicError::Io(_) => "IO_ERROR",
            SeismicError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable without aborting the run
    ///
    /// Only station lookups recover locally; the affected station is
    /// dropped from the map.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SeismicError::StationLookup { .. } | SeismicError::LookupUnavailable { .. }
        )
    }

    /// Whether this error came from decoding a single input file
    ///
    /// These are the errors the `skip` decode policy is allowed to swallow.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            SeismicError::FileRead { .. }
                | SeismicError::Decode { .. }
                | SeismicError::UnsupportedEncoding { .. }
                | SeismicError::InvalidTrace { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            SeismicError::InputDirNotFound { .. } => vec![
                "Check the --input-dir path",
                "The directory must exist even if it holds no recordings",
            ],
            SeismicError::Decode { .. } | SeismicError::UnsupportedEncoding { .. } => vec![
                "The file may be truncated or not miniSEED - try re-downloading it",
                "Run with --on-decode-error skip to ingest the remaining files",
            ],
            SeismicError::StoreOpen { .. } | SeismicError::StoreWrite { .. } => vec![
                "Check that the database directory exists and is writable",
                "Free up disk space",
                "The store is derived data - delete it and re-run if it is corrupt",
            ],
            SeismicError::LookupUnavailable { .. } => vec![
                "Check network connectivity to the FDSN service",
                "Set SEISLOADER_FDSN_URL to a reachable data center",
            ],
            _ => vec![],
        }
    }
}
