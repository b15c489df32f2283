//! Trace processor trait
//!
//! Base trait for amplitude-only processing stages.

/// An in-place amplitude transform
///
/// Processors receive the sample slice of a trace, never the trace itself,
/// so they cannot alter its length or timing.
pub trait TraceProcessor: Send + Sync {
    /// Process samples in place
    fn process(&self, samples: &mut [f64]);

    /// Get the processor type identifier
    fn processor_type(&self) -> &'static str;

    /// Clone the processor into a boxed trait object
    fn box_clone(&self) -> Box<dyn TraceProcessor>;
}

impl Clone for Box<dyn TraceProcessor> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}
