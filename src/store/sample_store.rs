//! SQLite sample store
//!
//! Bulk load commits one transaction per trace: an interrupted run leaves
//! whole traces behind, never part of one. Streams load in file-name order.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::Serialize;

use crate::error::{Result, SeismicError};
use crate::observe::PipelineObserver;
use crate::store::query::{RangeQuery, SampleRow, StationIndex};
use crate::store::schema::{
    BULK_LOAD_PRAGMAS, CREATE_TABLE, CREATE_UNIQUE_INDEX, INSERT_SAMPLE, INSERT_SAMPLE_OR_IGNORE,
    SELECT_COLUMNS, TABLE_NAME,
};
use crate::waveform::{StreamSet, Trace};

/// Store behavior switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Reject repeated (network, station, location, channel, timestamp)
    /// rows. Off by default: re-running ingestion appends duplicates.
    pub unique_samples: bool,
}

/// Totals from one bulk load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub streams: usize,
    pub traces: usize,
    /// Rows actually inserted (less than samples offered when uniqueness
    /// drops repeats)
    pub rows: usize,
}

/// Time-indexed sample store backed by SQLite
pub struct SampleStore {
    conn: Connection,
    path: PathBuf,
    options: StoreOptions,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<SampleRow> {
    Ok(SampleRow {
        id: row.get(0)?,
        network: row.get(1)?,
        station: row.get(2)?,
        location: row.get(3)?,
        channel: row.get(4)?,
        timestamp: row.get(5)?,
        amplitude: row.get(6)?,
    })
}

impl SampleStore {
    /// Open or create the store at `path` with bulk-load pragmas
    pub fn open(path: &Path, options: StoreOptions) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| SeismicError::StoreOpen {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::configure(conn, path.to_path_buf(), options)
    }

    /// Open a private in-memory store
    pub fn open_in_memory(options: StoreOptions) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| SeismicError::StoreOpen {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        Self::configure(conn, PathBuf::from(":memory:"), options)
    }

    fn configure(conn: Connection, path: PathBuf, options: StoreOptions) -> Result<Self> {
        conn.execute_batch(BULK_LOAD_PRAGMAS)
            .map_err(|e| SeismicError::StoreOpen {
                path: path.clone(),
                source: e,
            })?;
        Ok(Self {
            conn,
            path,
            options,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Create the table and indexes if missing. Safe to call repeatedly.
    pub fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(CREATE_TABLE)?;
        if self.options.unique_samples {
            self.conn.execute_batch(CREATE_UNIQUE_INDEX)?;
        }
        Ok(())
    }

    /// Insert every sample of one trace in a single transaction
    ///
    /// Returns the number of rows inserted.
    pub fn load_trace(&mut self, trace: &Trace) -> Result<usize> {
        let trace_id = trace.id();
        let write_err = |source| SeismicError::StoreWrite {
            trace_id: trace_id.clone(),
            source,
        };
        let sql = if self.options.unique_samples {
            INSERT_SAMPLE_OR_IGNORE
        } else {
            INSERT_SAMPLE
        };

        let tx = self.conn.transaction().map_err(write_err)?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare_cached(sql).map_err(write_err)?;
            let stats = &trace.stats;
            for (timestamp, amplitude) in trace.times().zip(trace.data()) {
                inserted += stmt
                    .execute(params![
                        stats.network,
                        stats.station,
                        stats.location,
                        stats.channel,
                        timestamp,
                        amplitude
                    ])
                    .map_err(write_err)?;
            }
        }
        tx.commit().map_err(write_err)?;
        Ok(inserted)
    }

    /// Load every trace of every stream, streams in file-name order
    pub fn bulk_load(
        &mut self,
        streams: &StreamSet,
        observer: &dyn PipelineObserver,
    ) -> Result<LoadSummary> {
        let mut summary = LoadSummary::default();
        for stream in streams.iter() {
            observer.stream_stored(&stream.name);
            for trace in stream.iter() {
                let rows = self.load_trace(trace)?;
                observer.trace_stored(&trace.id(), rows);
                summary.traces += 1;
                summary.rows += rows;
            }
            summary.streams += 1;
        }
        Ok(summary)
    }

    /// Total rows in the store
    pub fn count_rows(&self) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {TABLE_NAME}");
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// First `limit` rows in insertion order
    pub fn preview(&self, limit: usize) -> Result<Vec<SampleRow>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY id LIMIT ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![limit as i64], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Rows matching `query`, ordered by station, channel, timestamp
    pub fn range_query(&self, query: &RangeQuery) -> Result<Vec<SampleRow>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(stations) = &query.stations {
            if stations.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; stations.len()].join(", ");
            clauses.push(format!("station IN ({placeholders})"));
            values.extend(stations.iter().map(|s| Value::Text(s.clone())));
        }

        if let Some(range) = &query.time_range {
            clauses.push("timestamp >= ? AND timestamp <= ?".to_string());
            values.push(Value::Real(range.start));
            values.push(Value::Real(range.end));
        }

        let mut sql = SELECT_COLUMNS.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY station, channel, timestamp, id");
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(limit as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl StationIndex for SampleStore {
    fn list_distinct_stations(&self) -> Result<BTreeSet<String>> {
        let sql = format!("SELECT DISTINCT station FROM {TABLE_NAME} ORDER BY station");
        let mut stmt = self.conn.prepare(&sql)?;
        let stations = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(stations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::{NullObserver, RecordingObserver};
    use crate::store::query::TimeRange;
    use crate::waveform::{Stream, TraceStats};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn trace(station: &str, channel: &str, start_secs: i64, n: usize) -> Trace {
        let start = Utc.timestamp_opt(start_secs, 0).unwrap();
        let data = (0..n).map(|i| i as f64).collect();
        Trace::new(TraceStats::new("XX", station, "", channel, start, 1.0), data).unwrap()
    }

    fn store() -> SampleStore {
        let store = SampleStore::open_in_memory(StoreOptions::default()).unwrap();
        store.initialize_schema().unwrap();
        store
    }

    #[test]
    fn test_schema_is_idempotent() {
        let store = store();
        store.initialize_schema().unwrap();
        assert_eq!(store.count_rows().unwrap(), 0);
    }

    #[test]
    fn test_bulk_load_counts_rows() {
        let mut store = store();
        let streams: StreamSet = vec![Stream::new(
            "a.mseed",
            vec![trace("ABC", "Z", 0, 10), trace("ABC", "N", 0, 15)],
        )]
        .into_iter()
        .collect();

        let summary = store.bulk_load(&streams, &NullObserver).unwrap();
        assert_eq!(
            summary,
            LoadSummary {
                streams: 1,
                traces: 2,
                rows: 25
            }
        );
        assert_eq!(store.count_rows().unwrap(), 25);

        // Appends, never replaces
        store.bulk_load(&streams, &NullObserver).unwrap();
        assert_eq!(store.count_rows().unwrap(), 50);
    }

    #[test]
    fn test_unique_samples_drop_repeats() {
        let mut store = SampleStore::open_in_memory(StoreOptions {
            unique_samples: true,
        })
        .unwrap();
        store.initialize_schema().unwrap();

        let t = trace("ABC", "Z", 0, 10);
        assert_eq!(store.load_trace(&t).unwrap(), 10);
        assert_eq!(store.load_trace(&t).unwrap(), 0);
        assert_eq!(store.count_rows().unwrap(), 10);
    }

    #[test]
    fn test_streams_load_in_name_order() {
        let mut store = store();
        let observer = RecordingObserver::new();
        let streams: StreamSet = vec![
            Stream::new("b.mseed", vec![trace("BBB", "Z", 0, 2)]),
            Stream::new("a.mseed", vec![trace("AAA", "Z", 0, 2)]),
        ]
        .into_iter()
        .collect();

        store.bulk_load(&streams, &observer).unwrap();
        assert_eq!(
            observer.events_with_prefix("stream_stored"),
            vec!["stream_stored a.mseed", "stream_stored b.mseed"]
        );
        let first = store.preview(1).unwrap();
        assert_eq!(first[0].station, "AAA");
    }

    #[test]
    fn test_range_query_orders_and_filters() {
        let mut store = store();
        store.load_trace(&trace("DEF", "Z", 100, 5)).unwrap();
        store.load_trace(&trace("ABC", "Z", 50, 5)).unwrap();
        store.load_trace(&trace("ABC", "E", 0, 5)).unwrap();
        store.load_trace(&trace("ABC", "Z", 0, 5)).unwrap();

        let rows = store.range_query(&RangeQuery::all().stations(["ABC"])).unwrap();
        assert_eq!(rows.len(), 15);
        let keys: Vec<(&str, f64)> = rows.iter().map(|r| (r.channel.as_str(), r.timestamp)).collect();
        assert_eq!(keys[0], ("E", 0.0));
        assert_eq!(keys[5], ("Z", 0.0));
        assert_eq!(keys[14], ("Z", 54.0));

        let windowed = store
            .range_query(&RangeQuery::all().time_range(TimeRange::new(52.0, 101.0)))
            .unwrap();
        let stamps: Vec<(String, f64)> = windowed
            .iter()
            .map(|r| (r.station.clone(), r.timestamp))
            .collect();
        assert_eq!(
            stamps,
            vec![
                ("ABC".to_string(), 52.0),
                ("ABC".to_string(), 53.0),
                ("ABC".to_string(), 54.0),
                ("DEF".to_string(), 100.0),
                ("DEF".to_string(), 101.0),
            ]
        );
    }

    #[test]
    fn test_empty_station_filter_matches_nothing() {
        let mut store = store();
        store.load_trace(&trace("ABC", "Z", 0, 5)).unwrap();
        let query = RangeQuery {
            stations: Some(BTreeSet::new()),
            ..RangeQuery::default()
        };
        assert!(store.range_query(&query).unwrap().is_empty());
    }

    #[test]
    fn test_distinct_stations_from_store() {
        let mut store = store();
        store.load_trace(&trace("DEF", "Z", 0, 3)).unwrap();
        store.load_trace(&trace("ABC", "Z", 0, 3)).unwrap();
        store.load_trace(&trace("ABC", "N", 0, 3)).unwrap();

        let stations: Vec<String> = store.list_distinct_stations().unwrap().into_iter().collect();
        assert_eq!(stations, vec!["ABC", "DEF"]);
    }

    #[test]
    fn test_failed_trace_leaves_no_rows() {
        let dir = tempdir().unwrap();
        let mut store =
            SampleStore::open(&dir.path().join("samples.db"), StoreOptions::default()).unwrap();
        store.initialize_schema().unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_seven BEFORE INSERT ON seismic_data
                 WHEN NEW.amplitude = 7.0
                 BEGIN SELECT RAISE(ABORT, 'amplitude rejected'); END;",
            )
            .unwrap();

        // Amplitudes are 0..n, so only the second trace reaches 7.0
        let streams: StreamSet = vec![
            Stream::new("a.mseed", vec![trace("ABC", "Z", 0, 5)]),
            Stream::new("b.mseed", vec![trace("DEF", "Z", 0, 10)]),
        ]
        .into_iter()
        .collect();

        let err = store.bulk_load(&streams, &NullObserver).unwrap_err();
        assert_eq!(err.error_code(), "STORE_WRITE");
        assert!(err.to_string().contains("XX.DEF..Z"));
        assert_eq!(store.count_rows().unwrap(), 5);

        let stations: Vec<String> = store.list_distinct_stations().unwrap().into_iter().collect();
        assert_eq!(stations, vec!["ABC"]);
    }

    #[test]
    fn test_file_store_persists_between_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("samples.db");
        {
            let mut store = SampleStore::open(&path, StoreOptions::default()).unwrap();
            store.initialize_schema().unwrap();
            store.load_trace(&trace("ABC", "Z", 0, 7)).unwrap();
        }
        let store = SampleStore::open(&path, StoreOptions::default()).unwrap();
        assert_eq!(store.count_rows().unwrap(), 7);
    }

    #[test]
    fn test_unwritable_location_fails_to_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("samples.db");
        let err = SampleStore::open(&path, StoreOptions::default())
            .err()
            .unwrap();
        assert_eq!(err.error_code(), "STORE_OPEN");
    }
}
