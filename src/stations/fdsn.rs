//! FDSN station web service client
//!
//! Queries `fdsnws/station/1` at station level in the pipe-delimited text
//! format:
//!
//! ```text
//! #Network | Station | Latitude | Longitude | Elevation | SiteName | StartTime | EndTime
//! IU|ANMO|34.9459|-106.4572|1820.0|Albuquerque, New Mexico, USA|2002-11-19T21:07:00|
//! ```

use crate::config::FdsnConfig;
use crate::error::{Result, SeismicError};
use crate::stations::{StationLocation, StationResolver};

const STATION_QUERY_PATH: &str = "fdsnws/station/1/query";

/// Blocking FDSN station client
#[derive(Debug, Clone)]
pub struct FdsnStationClient {
    base_url: String,
    timeout_ms: u64,
}

impl FdsnStationClient {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms,
        }
    }

    pub fn from_config(config: &FdsnConfig) -> Self {
        Self::new(config.base_url.clone(), config.timeout_ms)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full station query endpoint
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            STATION_QUERY_PATH
        )
    }

    #[cfg(feature = "fdsn")]
    fn fetch(&self, station: &str) -> Result<Option<String>> {
        use reqwest::StatusCode;

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .build()
            .map_err(|e| SeismicError::LookupUnavailable {
                reason: e.to_string(),
            })?;

        let response = client
            .get(self.endpoint())
            .query(&[("station", station), ("level", "station"), ("format", "text")])
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    SeismicError::StationLookup {
                        station: station.to_string(),
                        reason: format!("timed out after {} ms", self.timeout_ms),
                    }
                } else if e.is_connect() {
                    SeismicError::LookupUnavailable {
                        reason: format!("Cannot connect to {}: {}", self.base_url, e),
                    }
                } else {
                    SeismicError::StationLookup {
                        station: station.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => {
                return Err(SeismicError::StationLookup {
                    station: station.to_string(),
                    reason: format!("service returned {}", status),
                })
            }
            _ => {}
        }

        response
            .text()
            .map(Some)
            .map_err(|e| SeismicError::StationLookup {
                station: station.to_string(),
                reason: format!("unreadable response: {}", e),
            })
    }

    #[cfg(not(feature = "fdsn"))]
    fn fetch(&self, _station: &str) -> Result<Option<String>> {
        Err(SeismicError::LookupUnavailable {
            reason: "FDSN support not compiled. Build with --features fdsn".to_string(),
        })
    }
}

impl StationResolver for FdsnStationClient {
    fn resolve(&self, station: &str) -> Result<Option<StationLocation>> {
        match self.fetch(station)? {
            Some(body) => parse_text_response(station, &body),
            None => Ok(None),
        }
    }
}

/// Pick `station` out of a station-level text response
///
/// When several epochs or networks list the station, the last line wins.
pub fn parse_text_response(station: &str, body: &str) -> Result<Option<StationLocation>> {
    let malformed = |line: &str, what: &str| SeismicError::StationLookup {
        station: station.to_string(),
        reason: format!("{} in line '{}'", what, line),
    };

    let mut found = None;
    for line in body.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        if fields.len() < 4 {
            return Err(malformed(line, "too few fields"));
        }
        if fields[1] != station {
            continue;
        }

        let latitude: f64 = fields[2]
            .parse()
            .map_err(|_| malformed(line, "bad latitude"))?;
        let longitude: f64 = fields[3]
            .parse()
            .map_err(|_| malformed(line, "bad longitude"))?;

        let mut location = StationLocation::new(fields[0], fields[1], latitude, longitude);
        location.elevation_m = fields.get(4).and_then(|s| s.parse().ok());
        location.site_name = fields
            .get(5)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
        found = Some(location);
    }
    Ok(found)
}
