//! Normalization chain
//!
//! Stages run in chain order (index 0 first). The standard chain is
//! detrend then taper; tapering second keeps the removed trend from
//! leaking back in at the edges.

use crate::dsp::{Detrend, HannTaper, TraceProcessor};
use crate::observe::PipelineObserver;
use crate::waveform::{Stream, StreamSet, Trace};

/// Ordered processing stages applied to every trace
#[derive(Clone)]
pub struct Normalizer {
    stages: Vec<Box<dyn TraceProcessor>>,
}

impl Normalizer {
    /// Create a chain with no stages (identity)
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Detrend, then Hann taper over `taper_fraction` of each trace
    pub fn standard(taper_fraction: f64) -> Self {
        let mut chain = Self::new();
        chain.push(Box::new(Detrend::new()));
        chain.push(Box::new(HannTaper::new(taper_fraction)));
        chain
    }

    /// Append a stage at the end of the chain
    pub fn push(&mut self, stage: Box<dyn TraceProcessor>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage type identifiers in chain order
    pub fn stage_types(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.processor_type()).collect()
    }

    /// Run every stage over one trace's amplitudes
    pub fn normalize_trace(&self, trace: &mut Trace) {
        for stage in &self.stages {
            stage.process(trace.data_mut());
        }
    }

    /// Normalize every trace of a stream
    pub fn normalize_stream(&self, stream: &mut Stream, observer: &dyn PipelineObserver) {
        for trace in stream.iter_mut() {
            self.normalize_trace(trace);
            observer.trace_normalized(&trace.id(), trace.len());
        }
    }

    /// Normalize every stream of a set
    pub fn normalize_all(&self, streams: &mut StreamSet, observer: &dyn PipelineObserver) {
        for stream in streams.iter_mut() {
            self.normalize_stream(stream, observer);
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::standard(crate::dsp::DEFAULT_TAPER_FRACTION)
    }
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("stages", &self.stage_types())
            .finish()
    }
}
