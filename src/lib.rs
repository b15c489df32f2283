//! Seisloader - seismic waveform ingestion
//!
//! Reads a directory of miniSEED recordings, normalizes every trace
//! (linear detrend, then a Hann taper) and bulk-loads the samples into a
//! time-indexed SQLite table. Optional outputs are a helicorder chart and
//! a station map whose locations come from an FDSN station service.
//!
//! # Architecture
//!
//! - `waveform`: trace model, miniSEED decoding, directory reading
//! - `dsp`: the normalization chain
//! - `store`: the SQLite sample store and range queries
//! - `stations`: station code to coordinate resolution
//! - `render`: helicorder and map chart documents
//! - `pipeline`: the end-to-end run, reporting through an injected observer

pub mod cli;
pub mod config;
pub mod dsp;
pub mod error;
pub mod observe;
pub mod pipeline;
pub mod render;
pub mod stations;
pub mod store;
pub mod waveform;

pub use error::{Result, SeismicError};
