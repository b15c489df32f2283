//! End-to-end ingestion tests
//!
//! Each test writes miniSEED fixtures into a temp directory, runs the
//! pipeline against a static station table and inspects the database and
//! chart documents it leaves behind.

use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};

use seisloader::config::{DecodeFailurePolicy, PipelineConfig};
use seisloader::observe::{NullObserver, RecordingObserver};
use seisloader::pipeline::Pipeline;
use seisloader::render::{HelicorderChart, MarkerKind, StationMap};
use seisloader::stations::{StaticResolver, StationLocation, StationResolver};
use seisloader::store::{RangeQuery, SampleStore, StationIndex, StoreOptions};
use seisloader::waveform::{epoch_seconds, MiniSeedWriter, Trace, TraceStats};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
}

fn ramp_trace(station: &str, channel: &str, rate: f64, n: usize) -> Trace {
    let data = (0..n).map(|i| 500.0 + 3.0 * i as f64 + (i as f64).sin() * 50.0).collect();
    Trace::new(TraceStats::new("XX", station, "", channel, t0(), rate), data).unwrap()
}

fn write_fixture(dir: &Path, file: &str, traces: &[Trace]) {
    MiniSeedWriter::new().write_file(&dir.join(file), traces).unwrap();
}

fn workspace() -> (TempDir, PipelineConfig) {
    let dir = tempdir().unwrap();
    let input_dir = dir.path().join("SEP");
    fs::create_dir(&input_dir).unwrap();
    let config = PipelineConfig {
        input_dir,
        db_file: dir.path().join("seismic_data.db"),
        helicorder_file: dir.path().join("helicorder.json"),
        map_file: dir.path().join("map.json"),
        ..PipelineConfig::default()
    };
    (dir, config)
}

fn resolver() -> Box<dyn StationResolver> {
    Box::new(
        StaticResolver::new()
            .with_location(StationLocation::new("XX", "ABC", 35.0, 139.0))
            .with_location(StationLocation::new("XX", "DEF", 35.5, 139.5))
            .with_location(StationLocation::new("JP", "HOA", 34.6, 138.2))
            .with_location(StationLocation::new("JP", "SUG", 36.1, 140.3)),
    )
}

fn open_store(config: &PipelineConfig) -> SampleStore {
    SampleStore::open(&config.db_file, StoreOptions::default()).unwrap()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> T {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_one_trace_one_row_per_sample() {
    let (_dir, config) = workspace();
    write_fixture(&config.input_dir, "ABC.mseed", &[ramp_trace("ABC", "Z", 1.0, 100)]);

    let report = Pipeline::new(config.clone(), &NullObserver)
        .with_resolver(resolver())
        .ingest()
        .unwrap();
    assert_eq!(report.rows, 100);

    let rows = open_store(&config).range_query(&RangeQuery::all()).unwrap();
    assert_eq!(rows.len(), 100);

    let start = epoch_seconds(&t0());
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.station, "ABC");
        assert_eq!(row.channel, "Z");
        assert_eq!(row.timestamp, start + i as f64);
    }
    // Hann taper pins both edges to zero
    assert_eq!(rows[0].amplitude, 0.0);
    assert_eq!(rows[99].amplitude, 0.0);
    assert!(rows[50].amplitude.abs() > 0.0);
}

#[test]
fn test_reingest_appends_duplicates() {
    let (_dir, config) = workspace();
    write_fixture(
        &config.input_dir,
        "ABC.mseed",
        &[ramp_trace("ABC", "BHZ", 20.0, 300), ramp_trace("ABC", "BHN", 20.0, 200)],
    );

    let pipeline = Pipeline::new(config.clone(), &NullObserver).with_resolver(resolver());
    assert_eq!(pipeline.ingest().unwrap().rows, 500);
    assert_eq!(open_store(&config).count_rows().unwrap(), 500);

    pipeline.ingest().unwrap();
    assert_eq!(open_store(&config).count_rows().unwrap(), 1000);
}

#[test]
fn test_unique_samples_make_reingest_idempotent() {
    let (_dir, mut config) = workspace();
    config.unique_samples = true;
    write_fixture(&config.input_dir, "ABC.mseed", &[ramp_trace("ABC", "BHZ", 20.0, 300)]);

    let pipeline = Pipeline::new(config.clone(), &NullObserver).with_resolver(resolver());
    assert_eq!(pipeline.ingest().unwrap().rows, 300);
    assert_eq!(pipeline.ingest().unwrap().rows, 0);
    assert_eq!(open_store(&config).count_rows().unwrap(), 300);
}

#[test]
fn test_streams_stored_in_file_name_order() {
    let (_dir, config) = workspace();
    write_fixture(&config.input_dir, "B.mseed", &[ramp_trace("BBB", "BHZ", 10.0, 50)]);
    write_fixture(&config.input_dir, "A.mseed", &[ramp_trace("AAA", "BHZ", 10.0, 50)]);

    let observer = RecordingObserver::new();
    Pipeline::new(config.clone(), &observer)
        .with_resolver(resolver())
        .ingest()
        .unwrap();

    assert_eq!(
        observer.events_with_prefix("stream_stored"),
        vec!["stream_stored A.mseed", "stream_stored B.mseed"]
    );

    // Row ids follow insertion order: every AAA row precedes every BBB row
    let rows = open_store(&config).preview(100).unwrap();
    let first_b = rows.iter().position(|r| r.station == "BBB").unwrap();
    assert_eq!(first_b, 50);
    assert!(rows[..50].iter().all(|r| r.station == "AAA"));
}

#[test]
fn test_empty_directory_produces_empty_outputs() {
    let (_dir, config) = workspace();
    fs::write(config.input_dir.join("README.txt"), "not a recording").unwrap();

    let report = Pipeline::new(config.clone(), &NullObserver)
        .with_resolver(Box::new(StaticResolver::new()))
        .run()
        .unwrap();

    assert_eq!(report.rows, 0);
    assert!(report.files.is_empty());
    assert_eq!(open_store(&config).count_rows().unwrap(), 0);

    let chart: HelicorderChart = read_json(&config.helicorder_file);
    assert!(chart.panels.is_empty());
    assert_eq!(chart.panel_height, None);

    let map: StationMap = read_json(&config.map_file);
    assert!(map.markers.is_empty());
    assert!(map.extent.is_none());
}

#[test]
fn test_unknown_station_left_off_map() {
    let (_dir, config) = workspace();
    write_fixture(&config.input_dir, "ABC.mseed", &[ramp_trace("ABC", "BHZ", 10.0, 80)]);
    write_fixture(&config.input_dir, "ZZZ.mseed", &[ramp_trace("ZZZ", "BHZ", 10.0, 80)]);

    let observer = RecordingObserver::new();
    let report = Pipeline::new(config.clone(), &observer)
        .with_resolver(resolver())
        .run()
        .unwrap();

    // ZZZ is still stored, just not mapped
    assert_eq!(report.rows, 160);
    assert_eq!(report.mapped_stations, vec!["ABC", "HOA", "SUG"]);
    assert_eq!(
        observer.events_with_prefix("station_not_found"),
        vec!["station_not_found ZZZ"]
    );

    let map: StationMap = read_json(&config.map_file);
    let kinds: Vec<(String, MarkerKind)> = map
        .markers
        .iter()
        .map(|m| (m.station.clone(), m.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("ABC".to_string(), MarkerKind::InData),
            ("HOA".to_string(), MarkerKind::Reference),
            ("SUG".to_string(), MarkerKind::Reference),
        ]
    );

    let chart: HelicorderChart = read_json(&config.helicorder_file);
    assert_eq!(chart.panels.len(), 2);
    assert_eq!(chart.panels[1].stream, "ZZZ.mseed");
}

#[test]
fn test_corrupt_file_aborts_by_default() {
    let (_dir, config) = workspace();
    write_fixture(&config.input_dir, "ABC.mseed", &[ramp_trace("ABC", "BHZ", 10.0, 80)]);
    fs::write(config.input_dir.join("BAD.mseed"), vec![0xFFu8; 600]).unwrap();

    let err = Pipeline::new(config.clone(), &NullObserver)
        .with_resolver(resolver())
        .run()
        .unwrap_err();
    assert_eq!(err.error_code(), "DECODE_FAILED");
    assert!(err.to_string().contains("BAD.mseed"));
    // Nothing was stored: decoding finishes before the store is opened
    assert!(!config.db_file.exists());
}

#[test]
fn test_corrupt_file_skipped_when_asked() {
    let (_dir, mut config) = workspace();
    config.decode_policy = DecodeFailurePolicy::Skip;
    write_fixture(&config.input_dir, "ABC.mseed", &[ramp_trace("ABC", "BHZ", 10.0, 80)]);
    fs::write(config.input_dir.join("BAD.mseed"), vec![0xFFu8; 600]).unwrap();

    let observer = RecordingObserver::new();
    let report = Pipeline::new(config.clone(), &observer)
        .with_resolver(resolver())
        .ingest()
        .unwrap();

    assert_eq!(report.rows, 80);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].name, "BAD.mseed");
    assert_eq!(
        observer.events_with_prefix("file_skipped"),
        vec!["file_skipped BAD.mseed DECODE_FAILED"]
    );
}

#[test]
fn test_distinct_stations_match_in_memory_streams() {
    let (_dir, config) = workspace();
    write_fixture(&config.input_dir, "A.mseed", &[ramp_trace("DEF", "BHZ", 10.0, 30)]);
    write_fixture(
        &config.input_dir,
        "B.mseed",
        &[ramp_trace("ABC", "BHZ", 10.0, 30), ramp_trace("ABC", "BHE", 10.0, 30)],
    );

    let pipeline = Pipeline::new(config.clone(), &NullObserver).with_resolver(resolver());
    let outcome = pipeline.read().unwrap();
    pipeline.ingest().unwrap();

    let from_store = open_store(&config).list_distinct_stations().unwrap();
    let from_streams = outcome.streams.list_distinct_stations().unwrap();
    assert_eq!(from_store, from_streams);
    assert_eq!(from_store.into_iter().collect::<Vec<_>>(), vec!["ABC", "DEF"]);
}

#[test]
fn test_report_carries_checksums() {
    let (_dir, config) = workspace();
    write_fixture(&config.input_dir, "ABC.mseed", &[ramp_trace("ABC", "BHZ", 10.0, 30)]);

    let first = Pipeline::new(config.clone(), &NullObserver)
        .with_resolver(resolver())
        .ingest()
        .unwrap();
    let second = Pipeline::new(config, &NullObserver)
        .with_resolver(resolver())
        .ingest()
        .unwrap();

    assert_eq!(first.files[0].checksum.len(), 64);
    assert_eq!(first.files[0].checksum, second.files[0].checksum);
    assert_ne!(first.run_id, second.run_id);
}
