//! CLI Module
//!
//! Command-line interface for the seisloader ingestion pipeline.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crate::config::{DecodeFailurePolicy, PipelineConfig};
use crate::error::Result;

/// Seisloader - miniSEED ingestion into a time-indexed SQLite store
#[derive(Parser, Debug)]
#[command(name = "seisloader")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file; flags override its values
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory of miniSEED recordings [default: ./SEP]
    #[arg(long, global = true)]
    pub input_dir: Option<PathBuf>,

    /// SQLite database file [default: seismic_data.db]
    #[arg(long, global = true)]
    pub db_file: Option<PathBuf>,

    /// Helicorder chart output [default: helicorder.json]
    #[arg(long, global = true)]
    pub helicorder_file: Option<PathBuf>,

    /// Station map output [default: map.json]
    #[arg(long, global = true)]
    pub map_file: Option<PathBuf>,

    /// What to do with a file that fails to decode [default: abort]
    #[arg(long, value_enum, global = true)]
    pub on_decode_error: Option<DecodeFailurePolicy>,

    /// Drop repeated samples instead of appending duplicates on re-ingest.
    /// A database that already holds duplicates cannot take the unique index.
    #[arg(long, global = true)]
    pub unique_samples: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Ingest, store and render (the default)
    #[command(name = "run")]
    Run,

    /// Ingest and store without rendering
    #[command(name = "ingest")]
    Ingest,

    /// Print stored samples
    #[command(name = "query")]
    Query {
        /// Station code; repeat for several
        #[arg(short, long)]
        station: Vec<String>,

        /// Start of the window, epoch seconds (inclusive)
        #[arg(long)]
        start: Option<f64>,

        /// End of the window, epoch seconds (inclusive)
        #[arg(long)]
        end: Option<f64>,

        /// Maximum rows to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// List distinct stations in the database
    #[command(name = "stations")]
    Stations,

    /// Write synthetic miniSEED files for a demo run
    #[command(name = "synthesize")]
    Synthesize {
        /// Output directory [default: the input directory]
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Station codes, one file each
        #[arg(short, long, default_values_t = vec!["ABC".to_string(), "DEF".to_string()])]
        station: Vec<String>,

        /// Samples per trace
        #[arg(short = 'n', long, default_value_t = 6000)]
        samples: usize,

        /// Sampling rate in Hz
        #[arg(short, long, default_value_t = 20.0)]
        rate: f64,
    },
}

impl Cli {
    /// Resolve the effective configuration: file, environment, then flags
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::load(self.config.as_deref())?;

        if let Some(dir) = &self.input_dir {
            config.input_dir = dir.clone();
        }
        if let Some(db) = &self.db_file {
            config.db_file = db.clone();
        }
        if let Some(path) = &self.helicorder_file {
            config.helicorder_file = path.clone();
        }
        if let Some(path) = &self.map_file {
            config.map_file = path.clone();
        }
        if let Some(policy) = self.on_decode_error {
            config.decode_policy = policy;
        }
        if self.unique_samples {
            config.unique_samples = true;
        }

        config.validate()?;
        Ok(config)
    }
}
