//! Helicorder chart
//!
//! One stacked panel per stream, in file-name order, each plotting every
//! trace of that stream against epoch-second time.

use serde::{Deserialize, Serialize};

use crate::waveform::{Stream, StreamSet, Trace};

/// Overall figure height shared between panels
const FIGURE_HEIGHT: f64 = 8.0;
const FIGURE_WIDTH: f64 = 15.0;
/// strftime pattern for the time axis
const TIME_FORMAT: &str = "%H:%M:%S%.6f";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelicorderChart {
    pub width: f64,
    pub height: f64,
    /// Height of each panel; absent when there is nothing to stack
    pub panel_height: Option<f64>,
    pub time_format: String,
    pub panels: Vec<HelicorderPanel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelicorderPanel {
    pub stream: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

/// One trace's line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub trace_id: String,
    pub color: String,
    pub line_width: f64,
    /// Epoch seconds
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Series {
    fn from_trace(trace: &Trace) -> Self {
        Self {
            trace_id: trace.id(),
            color: "blue".to_string(),
            line_width: 0.5,
            x: trace.times().collect(),
            y: trace.data().to_vec(),
        }
    }
}

fn panel_for(stream: &Stream) -> HelicorderPanel {
    // Titled after the last trace drawn, falling back to the file name
    let subject = stream
        .traces
        .last()
        .map(ToString::to_string)
        .unwrap_or_else(|| stream.name.clone());

    HelicorderPanel {
        stream: stream.name.clone(),
        title: format!("Helicorder Plot ({})", subject),
        x_label: "Time".to_string(),
        y_label: "Amplitude".to_string(),
        series: stream.iter().map(Series::from_trace).collect(),
    }
}

/// Build the helicorder document for every stream
pub fn build_helicorder(streams: &StreamSet) -> HelicorderChart {
    let panels: Vec<HelicorderPanel> = streams.iter().map(panel_for).collect();
    let panel_height = if panels.is_empty() {
        None
    } else {
        Some(FIGURE_HEIGHT / panels.len() as f64)
    };

    HelicorderChart {
        width: FIGURE_WIDTH,
        height: FIGURE_HEIGHT,
        panel_height,
        time_format: TIME_FORMAT.to_string(),
        panels,
    }
}
