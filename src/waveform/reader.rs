//! Waveform source reader
//!
//! Enumerates recording files in one directory (no recursion), decodes and
//! normalizes each into a `Stream`. Files are processed in file-name order
//! and the result is a name-ordered `StreamSet`; filesystem iteration order
//! never reaches the output.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::config::DecodeFailurePolicy;
use crate::dsp::Normalizer;
use crate::error::{Result, SeismicError};
use crate::observe::PipelineObserver;
use crate::waveform::decoder::WaveformDecoder;
use crate::waveform::{Stream, StreamSet};

/// Integrity record of one ingested file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFile {
    pub name: String,
    /// SHA-256 of the raw file bytes
    pub checksum: String,
    pub size_bytes: u64,
    pub traces: usize,
    pub samples: usize,
}

/// A file left out under the `skip` policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub name: String,
    pub error_code: String,
    pub reason: String,
}

/// Everything one directory read produced
#[derive(Debug, Clone, Default)]
pub struct ReadOutcome {
    pub streams: StreamSet,
    pub files: Vec<SourceFile>,
    pub skipped: Vec<SkippedFile>,
}

/// Reads and normalizes a directory of recordings
pub struct SourceReader<'a> {
    decoder: &'a dyn WaveformDecoder,
    normalizer: &'a Normalizer,
    policy: DecodeFailurePolicy,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl<'a> SourceReader<'a> {
    pub fn new(decoder: &'a dyn WaveformDecoder, normalizer: &'a Normalizer) -> Self {
        Self {
            decoder,
            normalizer,
            policy: DecodeFailurePolicy::Abort,
        }
    }

    pub fn with_policy(mut self, policy: DecodeFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Regular files in `dir` the decoder recognizes, sorted by file name
    pub fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(SeismicError::InputDirNotFound {
                path: dir.to_path_buf(),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.decoder.handles(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
                // A broken recording is left for read_file to fail on, so the
                // decode policy decides. Anything else is not our file.
                Err(err) => {
                    let recognized = err
                        .path()
                        .map(|path| (self.decoder.handles(path), path.to_path_buf()));
                    match recognized {
                        Some((true, path)) => files.push(path),
                        Some((false, _)) => {}
                        None => return Err(SeismicError::Io(err.into())),
                    }
                }
            }
        }
        files.sort_by_key(|path| file_name(path));
        Ok(files)
    }

    /// Decode and normalize one file
    pub fn read_file(&self, path: &Path, observer: &dyn PipelineObserver) -> Result<(Stream, SourceFile)> {
        let bytes = fs::read(path).map_err(|e| SeismicError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let checksum = format!("{:x}", Sha256::digest(&bytes));

        let name = file_name(path);
        let traces = self.decoder.decode(path, &bytes)?;
        let mut stream = Stream::new(name.clone(), traces);
        self.normalizer.normalize_stream(&mut stream, observer);

        let source = SourceFile {
            name,
            checksum,
            size_bytes: bytes.len() as u64,
            traces: stream.len(),
            samples: stream.total_samples(),
        };
        Ok((stream, source))
    }

    /// Read every recognized file in `dir`
    ///
    /// Under `Abort` the first decode failure ends the read. Under `Skip`
    /// it is reported to the observer and recorded in the outcome.
    pub fn read_dir(&self, dir: &Path, observer: &dyn PipelineObserver) -> Result<ReadOutcome> {
        let mut outcome = ReadOutcome::default();

        for path in self.list_files(dir)? {
            match self.read_file(&path, observer) {
                Ok((stream, source)) => {
                    observer.file_read(&source.name, source.traces);
                    outcome.files.push(source);
                    outcome.streams.insert(stream);
                }
                Err(err) if self.policy == DecodeFailurePolicy::Skip && err.is_decode_failure() => {
                    let name = file_name(&path);
                    observer.file_skipped(&name, &err);
                    outcome.skipped.push(SkippedFile {
                        name,
                        error_code: err.error_code().to_string(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(outcome)
    }
}
