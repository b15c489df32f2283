//! Render Module
//!
//! Chart documents for the helicorder and station map. Each is a plain
//! serde model written as JSON; any plotting front end can draw it.

pub mod helicorder;
pub mod station_map;

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, SeismicError};

pub use helicorder::{build_helicorder, HelicorderChart, HelicorderPanel, Series};
pub use station_map::{
    build_station_map, Extent, LegendEntry, MapLabel, Marker, MarkerKind, MarkerSymbol, StationMap,
};

/// Write a chart document as pretty-printed JSON
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).map_err(|e| SeismicError::OutputWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::StreamSet;
    use tempfile::tempdir;

    #[test]
    fn test_write_json_roundtrips_chart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("helicorder.json");
        write_json(&path, &build_helicorder(&StreamSet::new())).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["panels"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn test_write_json_reports_output_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("map.json");
        let err = write_json(&path, &serde_json::json!({})).unwrap_err();
        assert_eq!(err.error_code(), "OUTPUT_WRITE");
        assert!(err.to_string().contains("map.json"));
    }
}
