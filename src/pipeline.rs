//! End-to-end ingestion pipeline
//!
//! read -> normalize -> store -> preview -> helicorder -> station map.
//! Decode and storage failures abort the run; station lookups fail per
//! station and only thin out the map.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::dsp::Normalizer;
use crate::error::Result;
use crate::observe::PipelineObserver;
use crate::render::{build_helicorder, build_station_map, write_json};
use crate::stations::{locate_stations, CachingResolver, FdsnStationClient, StationResolver};
use crate::store::{SampleStore, StoreOptions};
use crate::waveform::{
    MiniSeedDecoder, ReadOutcome, SkippedFile, SourceFile, SourceReader, StreamSet,
    WaveformDecoder,
};

/// Rows echoed to the log after loading
pub const PREVIEW_ROWS: usize = 10;

/// What one run did
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_dir: PathBuf,
    pub db_file: PathBuf,
    pub files: Vec<SourceFile>,
    pub skipped: Vec<SkippedFile>,
    pub streams: usize,
    pub traces: usize,
    pub rows: usize,
    /// Stations placed on the map, in code order
    pub mapped_stations: Vec<String>,
    pub helicorder_file: Option<PathBuf>,
    pub map_file: Option<PathBuf>,
}

impl IngestReport {
    fn started(config: &PipelineConfig) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            input_dir: config.input_dir.clone(),
            db_file: config.db_file.clone(),
            files: Vec::new(),
            skipped: Vec::new(),
            streams: 0,
            traces: 0,
            rows: 0,
            mapped_stations: Vec::new(),
            helicorder_file: None,
            map_file: None,
        }
    }
}

/// Wires decoder, normalizer, store and renderers together
pub struct Pipeline<'a> {
    config: PipelineConfig,
    decoder: Box<dyn WaveformDecoder>,
    normalizer: Normalizer,
    resolver: Box<dyn StationResolver>,
    observer: &'a dyn PipelineObserver,
}

impl<'a> Pipeline<'a> {
    /// Pipeline with the miniSEED decoder and a cached FDSN resolver
    pub fn new(config: PipelineConfig, observer: &'a dyn PipelineObserver) -> Self {
        let decoder = MiniSeedDecoder::with_extensions(config.extensions.iter().cloned());
        let resolver = CachingResolver::new(FdsnStationClient::from_config(&config.fdsn));
        let normalizer = Normalizer::standard(config.taper_fraction);
        Self {
            config,
            decoder: Box::new(decoder),
            normalizer,
            resolver: Box::new(resolver),
            observer,
        }
    }

    pub fn with_decoder(mut self, decoder: Box<dyn WaveformDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_resolver(mut self, resolver: Box<dyn StationResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Decode and normalize the input directory
    pub fn read(&self) -> Result<ReadOutcome> {
        self.observer.message(&format!(
            "Reading {} with {} decoder",
            self.config.input_dir.display(),
            self.decoder.name()
        ));
        SourceReader::new(self.decoder.as_ref(), &self.normalizer)
            .with_policy(self.config.decode_policy)
            .read_dir(&self.config.input_dir, self.observer)
    }

    /// Open the configured store with its schema in place
    pub fn open_store(&self) -> Result<SampleStore> {
        let store = SampleStore::open(
            &self.config.db_file,
            StoreOptions {
                unique_samples: self.config.unique_samples,
            },
        )?;
        store.initialize_schema()?;
        Ok(store)
    }

    fn store(&self, streams: &StreamSet, report: &mut IngestReport) -> Result<()> {
        self.observer.message(&format!(
            "Insert data into database: {}",
            self.config.db_file.display()
        ));
        let mut store = self.open_store()?;
        let summary = store.bulk_load(streams, self.observer)?;
        report.streams = summary.streams;
        report.traces = summary.traces;
        report.rows = summary.rows;

        for row in store.preview(PREVIEW_ROWS)? {
            self.observer.message(&format!(
                "{} {}.{}.{}.{} {:.6} {}",
                row.id, row.network, row.station, row.location, row.channel, row.timestamp,
                row.amplitude
            ));
        }
        Ok(())
    }

    fn ingest_streams(&self) -> Result<(IngestReport, StreamSet)> {
        let mut report = IngestReport::started(&self.config);
        let outcome = self.read()?;
        report.files = outcome.files;
        report.skipped = outcome.skipped;

        self.store(&outcome.streams, &mut report)?;
        Ok((report, outcome.streams))
    }

    /// Read and store, without rendering
    pub fn ingest(&self) -> Result<IngestReport> {
        let (mut report, _) = self.ingest_streams()?;
        report.finished_at = Utc::now();
        Ok(report)
    }

    /// Write the helicorder and station map for `streams`
    ///
    /// Returns the codes of the stations that made it onto the map.
    pub fn render(&self, streams: &StreamSet) -> Result<Vec<String>> {
        let helicorder = build_helicorder(streams);
        write_json(&self.config.helicorder_file, &helicorder)?;
        self.observer.message(&format!(
            "Save helicorder plot: {}",
            self.config.helicorder_file.display()
        ));

        let in_data = streams.distinct_stations();
        let codes: BTreeSet<&str> = in_data
            .iter()
            .map(String::as_str)
            .chain(self.config.reference_stations.iter().map(String::as_str))
            .collect();
        let located = locate_stations(self.resolver.as_ref(), codes, self.observer);

        let map = build_station_map(&in_data, &located);
        write_json(&self.config.map_file, &map)?;
        self.observer
            .message(&format!("Save map: {}", self.config.map_file.display()));

        Ok(located.into_keys().collect())
    }

    /// Full run: ingest, then render
    pub fn run(&self) -> Result<IngestReport> {
        let (mut report, streams) = self.ingest_streams()?;
        report.mapped_stations = self.render(&streams)?;
        report.helicorder_file = Some(self.config.helicorder_file.clone());
        report.map_file = Some(self.config.map_file.clone());
        report.finished_at = Utc::now();
        Ok(report)
    }
}
