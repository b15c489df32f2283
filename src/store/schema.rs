//! `seismic_data` schema
//!
//! Timestamps are epoch seconds stored as REAL so they sort numerically.

/// Table holding one row per sample
pub const TABLE_NAME: &str = "seismic_data";

pub(crate) const CREATE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS seismic_data (
    id INTEGER PRIMARY KEY,
    network TEXT NOT NULL,
    station TEXT NOT NULL,
    location TEXT NOT NULL,
    channel TEXT NOT NULL,
    timestamp REAL NOT NULL,
    amplitude REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_seismic_data_station_channel_time
    ON seismic_data (station, channel, timestamp);
";

/// Opt-in uniqueness; makes re-ingesting the same data a no-op
pub(crate) const CREATE_UNIQUE_INDEX: &str = r"
CREATE UNIQUE INDEX IF NOT EXISTS idx_seismic_data_unique_sample
    ON seismic_data (network, station, location, channel, timestamp);
";

/// Relaxed durability: the store is derived data and can be rebuilt
pub(crate) const BULK_LOAD_PRAGMAS: &str = "
PRAGMA journal_mode = MEMORY;
PRAGMA synchronous = OFF;
PRAGMA temp_store = MEMORY;
";

pub(crate) const INSERT_SAMPLE: &str = "INSERT INTO seismic_data \
     (network, station, location, channel, timestamp, amplitude) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

pub(crate) const INSERT_SAMPLE_OR_IGNORE: &str = "INSERT OR IGNORE INTO seismic_data \
     (network, station, location, channel, timestamp, amplitude) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

pub(crate) const SELECT_COLUMNS: &str =
    "SELECT id, network, station, location, channel, timestamp, amplitude FROM seismic_data";
