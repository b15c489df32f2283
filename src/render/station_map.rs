//! Station map
//!
//! Stations found in the data are drawn as blue triangles, reference
//! stations as black circles. The view is fitted to the markers with a
//! half-degree margin.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::stations::StationLocation;

const EXTENT_MARGIN_DEG: f64 = 0.5;
const LABEL_OFFSET_DEG: f64 = 0.02;
const MARKER_SIZE: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    InData,
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerSymbol {
    Triangle,
    Circle,
}

impl MarkerKind {
    pub fn symbol(self) -> MarkerSymbol {
        match self {
            MarkerKind::InData => MarkerSymbol::Triangle,
            MarkerKind::Reference => MarkerSymbol::Circle,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            MarkerKind::InData => "blue",
            MarkerKind::Reference => "black",
        }
    }

    pub fn legend_label(self) -> &'static str {
        match self {
            MarkerKind::InData => "Stations found in data",
            MarkerKind::Reference => "Other stations",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLabel {
    pub text: String,
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub station: String,
    pub network: String,
    pub longitude: f64,
    pub latitude: f64,
    pub kind: MarkerKind,
    pub symbol: MarkerSymbol,
    pub color: String,
    pub size: f64,
    pub label: MapLabel,
}

/// Plate carrée bounds in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub min_latitude: f64,
    pub max_latitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub label: String,
    pub symbol: MarkerSymbol,
    pub color: String,
}

impl From<MarkerKind> for LegendEntry {
    fn from(kind: MarkerKind) -> Self {
        Self {
            label: kind.legend_label().to_string(),
            symbol: kind.symbol(),
            color: kind.color().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMap {
    pub title: String,
    pub projection: String,
    pub markers: Vec<Marker>,
    /// Absent when no station could be located
    pub extent: Option<Extent>,
    pub legend: Vec<LegendEntry>,
}

fn marker_for(location: &StationLocation, kind: MarkerKind) -> Marker {
    Marker {
        station: location.station.clone(),
        network: location.network.clone(),
        longitude: location.longitude,
        latitude: location.latitude,
        kind,
        symbol: kind.symbol(),
        color: kind.color().to_string(),
        size: MARKER_SIZE,
        label: MapLabel {
            text: location.station.clone(),
            longitude: location.longitude + LABEL_OFFSET_DEG,
            latitude: location.latitude + LABEL_OFFSET_DEG,
        },
    }
}

fn fit_extent(markers: &[Marker]) -> Option<Extent> {
    let first = markers.first()?;
    let mut extent = Extent {
        min_longitude: first.longitude,
        max_longitude: first.longitude,
        min_latitude: first.latitude,
        max_latitude: first.latitude,
    };
    for marker in &markers[1..] {
        extent.min_longitude = extent.min_longitude.min(marker.longitude);
        extent.max_longitude = extent.max_longitude.max(marker.longitude);
        extent.min_latitude = extent.min_latitude.min(marker.latitude);
        extent.max_latitude = extent.max_latitude.max(marker.latitude);
    }
    extent.min_longitude -= EXTENT_MARGIN_DEG;
    extent.max_longitude += EXTENT_MARGIN_DEG;
    extent.min_latitude -= EXTENT_MARGIN_DEG;
    extent.max_latitude += EXTENT_MARGIN_DEG;
    Some(extent)
}

/// Build the map document
///
/// `located` holds every station that resolved; those whose code is in
/// `in_data` are drawn as data stations, the rest as reference stations.
pub fn build_station_map(
    in_data: &BTreeSet<String>,
    located: &BTreeMap<String, StationLocation>,
) -> StationMap {
    let markers: Vec<Marker> = located
        .iter()
        .map(|(code, location)| {
            let kind = if in_data.contains(code) {
                MarkerKind::InData
            } else {
                MarkerKind::Reference
            };
            marker_for(location, kind)
        })
        .collect();

    StationMap {
        title: "Station Locations".to_string(),
        projection: "PlateCarree".to_string(),
        extent: fit_extent(&markers),
        markers,
        legend: vec![MarkerKind::InData.into(), MarkerKind::Reference.into()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    fn located(entries: &[(&str, f64, f64)]) -> BTreeMap<String, StationLocation> {
        entries
            .iter()
            .map(|(code, lat, lon)| (code.to_string(), StationLocation::new("XX", *code, *lat, *lon)))
            .collect()
    }

    #[test]
    fn test_markers_tagged_by_origin() {
        let in_data: BTreeSet<String> = ["ABC".to_string()].into_iter().collect();
        let map = build_station_map(
            &in_data,
            &located(&[("ABC", 35.0, 139.0), ("HOA", 34.5, 138.0)]),
        );

        let kinds: Vec<(&str, MarkerKind)> = map
            .markers
            .iter()
            .map(|m| (m.station.as_str(), m.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![("ABC", MarkerKind::InData), ("HOA", MarkerKind::Reference)]
        );
        assert_eq!(map.markers[0].symbol, MarkerSymbol::Triangle);
        assert_eq!(map.markers[1].color, "black");
        assert_relative_eq!(map.markers[0].label.longitude, 139.02);
        assert_eq!(map.legend.len(), 2);
    }

    #[test]
    fn test_extent_has_half_degree_margin() {
        let map = build_station_map(
            &BTreeSet::new(),
            &located(&[("ABC", 35.0, 139.0), ("HOA", 34.0, 138.0)]),
        );
        let extent = map.extent.unwrap();
        assert_relative_eq!(extent.min_longitude, 137.5);
        assert_relative_eq!(extent.max_longitude, 139.5);
        assert_relative_eq!(extent.min_latitude, 33.5);
        assert_relative_eq!(extent.max_latitude, 35.5);
    }

    #[test]
    fn test_nothing_located_no_extent() {
        let in_data: BTreeSet<String> = ["ZZZ".to_string()].into_iter().collect();
        let map = build_station_map(&in_data, &BTreeMap::new());
        assert!(map.markers.is_empty());
        assert!(map.extent.is_none());
    }
}
