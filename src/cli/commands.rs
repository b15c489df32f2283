//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SubsecRound, Utc};
use log::info;

use crate::config::PipelineConfig;
use crate::error::{Result, SeismicError};
use crate::observe::LogObserver;
use crate::pipeline::{IngestReport, Pipeline};
use crate::store::{RangeQuery, SampleStore, StationIndex, StoreOptions, TimeRange};
use crate::waveform::{generate_test_trace, MiniSeedWriter};

/// Network code given to synthesized traces
const SYNTHETIC_NETWORK: &str = "XX";
const SYNTHETIC_CHANNEL: &str = "BHZ";

fn print_report(report: &IngestReport) {
    println!("Run {}", report.run_id);
    println!(
        "Files: {} ingested, {} skipped",
        report.files.len(),
        report.skipped.len()
    );
    for file in &report.files {
        println!(
            "  {}  {} traces, {} samples  sha256:{}",
            file.name, file.traces, file.samples, file.checksum
        );
    }
    for skipped in &report.skipped {
        println!("  {}  skipped [{}]", skipped.name, skipped.error_code);
    }
    println!(
        "Stored {} rows from {} traces into {}",
        report.rows,
        report.traces,
        report.db_file.display()
    );
    if !report.mapped_stations.is_empty() {
        println!("Mapped stations: {}", report.mapped_stations.join(", "));
    }
}

/// Full pipeline run
pub fn run(config: PipelineConfig) -> Result<()> {
    info!("Running pipeline on {}", config.input_dir.display());

    let observer = LogObserver;
    let report = Pipeline::new(config, &observer).run()?;
    print_report(&report);
    if let (Some(helicorder), Some(map)) = (&report.helicorder_file, &report.map_file) {
        println!("Helicorder: {}", helicorder.display());
        println!("Map: {}", map.display());
    }

    Ok(())
}

/// Ingest and store only
pub fn ingest(config: PipelineConfig) -> Result<()> {
    info!("Ingesting {}", config.input_dir.display());

    let observer = LogObserver;
    let report = Pipeline::new(config, &observer).ingest()?;
    print_report(&report);

    Ok(())
}

fn open_existing(config: &PipelineConfig) -> Result<SampleStore> {
    if !config.db_file.is_file() {
        return Err(SeismicError::InvalidConfig {
            reason: format!("database {} does not exist", config.db_file.display()),
        });
    }
    let store = SampleStore::open(
        &config.db_file,
        StoreOptions {
            unique_samples: config.unique_samples,
        },
    )?;
    store.initialize_schema()?;
    Ok(store)
}

/// Print stored samples matching the filters
pub fn query(
    config: &PipelineConfig,
    stations: &[String],
    start: Option<f64>,
    end: Option<f64>,
    limit: usize,
) -> Result<()> {
    let store = open_existing(config)?;

    let mut query = RangeQuery::all().limit(limit);
    if !stations.is_empty() {
        query = query.stations(stations.iter().cloned());
    }
    if start.is_some() || end.is_some() {
        query = query.time_range(TimeRange::new(
            start.unwrap_or(f64::MIN),
            end.unwrap_or(f64::MAX),
        ));
    }

    let rows = store.range_query(&query)?;
    info!("Query matched {} rows (limit {})", rows.len(), limit);

    println!("id\tnetwork\tstation\tlocation\tchannel\ttimestamp\tamplitude");
    for row in &rows {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{:.6}\t{}",
            row.id, row.network, row.station, row.location, row.channel, row.timestamp,
            row.amplitude
        );
    }

    Ok(())
}

/// List distinct stations in the store
pub fn stations(config: &PipelineConfig) -> Result<()> {
    let store = open_existing(config)?;
    let stations = store.list_distinct_stations()?;

    println!("{} stations, {} rows", stations.len(), store.count_rows()?);
    for station in stations {
        println!("  {}", station);
    }

    Ok(())
}

/// Write one synthetic miniSEED file per station
///
/// Returns the written paths.
pub fn synthesize(
    dir: &Path,
    stations: &[String],
    samples: usize,
    rate: f64,
) -> Result<Vec<PathBuf>> {
    info!("Synthesizing {} stations into {}", stations.len(), dir.display());
    fs::create_dir_all(dir)?;

    let start = Utc::now().trunc_subsecs(0);
    let writer = MiniSeedWriter::new();
    let mut written = Vec::with_capacity(stations.len());

    for station in stations {
        let trace = generate_test_trace(
            SYNTHETIC_NETWORK,
            station,
            SYNTHETIC_CHANNEL,
            start,
            rate,
            samples,
        )?;
        let path = dir.join(format!("{}.mseed", station));
        writer.write_file(&path, std::slice::from_ref(&trace))?;
        println!("Wrote {} ({})", path.display(), trace);
        written.push(path);
    }

    Ok(written)
}
