//! Station Module
//!
//! Resolves station codes to coordinates for the map pass. Lookups sit
//! behind `StationResolver` so the live FDSN client can be swapped for a
//! static table or wrapped in a cache.

pub mod fdsn;

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeismicError};
use crate::observe::PipelineObserver;

pub use fdsn::{parse_text_response, FdsnStationClient};

/// Where a station sits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationLocation {
    pub network: String,
    pub station: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

impl StationLocation {
    pub fn new(
        network: impl Into<String>,
        station: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            network: network.into(),
            station: station.into(),
            latitude,
            longitude,
            elevation_m: None,
            site_name: None,
        }
    }
}

/// Station code to location lookup
///
/// `Ok(None)` means the directory has no such station; `Err` means the
/// lookup itself failed.
pub trait StationResolver {
    fn resolve(&self, station: &str) -> Result<Option<StationLocation>>;
}

impl<R: StationResolver + ?Sized> StationResolver for Box<R> {
    fn resolve(&self, station: &str) -> Result<Option<StationLocation>> {
        (**self).resolve(station)
    }
}

/// In-memory resolver for offline runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    locations: HashMap<String, StationLocation>,
    failing: BTreeSet<String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, location: StationLocation) -> Self {
        self.locations.insert(location.station.clone(), location);
        self
    }

    /// Make lookups of `station` fail as if the service errored
    pub fn with_failure(mut self, station: impl Into<String>) -> Self {
        self.failing.insert(station.into());
        self
    }
}

impl StationResolver for StaticResolver {
    fn resolve(&self, station: &str) -> Result<Option<StationLocation>> {
        if self.failing.contains(station) {
            return Err(SeismicError::StationLookup {
                station: station.to_string(),
                reason: "lookup failed".to_string(),
            });
        }
        Ok(self.locations.get(station).cloned())
    }
}

/// Memoizes answers of an inner resolver per station code
///
/// Failures are not cached; the next call asks again.
pub struct CachingResolver<R> {
    inner: R,
    cache: RefCell<HashMap<String, Option<StationLocation>>>,
}

impl<R: StationResolver> CachingResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: StationResolver> StationResolver for CachingResolver<R> {
    fn resolve(&self, station: &str) -> Result<Option<StationLocation>> {
        if let Some(hit) = self.cache.borrow().get(station) {
            return Ok(hit.clone());
        }
        let answer = self.inner.resolve(station)?;
        self.cache
            .borrow_mut()
            .insert(station.to_string(), answer.clone());
        Ok(answer)
    }
}

/// Resolve each code once, dropping stations that fail or are unknown
pub fn locate_stations<'a, I>(
    resolver: &dyn StationResolver,
    codes: I,
    observer: &dyn PipelineObserver,
) -> BTreeMap<String, StationLocation>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut located = BTreeMap::new();
    for code in codes {
        if located.contains_key(code) {
            continue;
        }
        match resolver.resolve(code) {
            Ok(Some(location)) => {
                located.insert(code.to_string(), location);
            }
            Ok(None) => observer.station_not_found(code),
            Err(e) => observer.station_lookup_failed(code, &e),
        }
    }
    located
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::RecordingObserver;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn table() -> StaticResolver {
        StaticResolver::new()
            .with_location(StationLocation::new("IU", "ABC", 10.0, 20.0))
            .with_location(StationLocation::new("IU", "HOA", 11.0, 21.0))
    }

    #[test]
    fn test_unknown_station_is_dropped() {
        let observer = RecordingObserver::new();
        let located = locate_stations(&table(), ["ABC", "ZZZ"], &observer);

        assert_eq!(located.keys().collect::<Vec<_>>(), vec!["ABC"]);
        assert_eq!(observer.events(), vec!["station_not_found ZZZ"]);
    }

    #[test]
    fn test_failed_lookup_is_isolated() {
        let observer = RecordingObserver::new();
        let resolver = table().with_failure("ABC");
        let located = locate_stations(&resolver, ["ABC", "HOA"], &observer);

        assert!(located.contains_key("HOA"));
        assert!(!located.contains_key("ABC"));
        assert_eq!(
            observer.events(),
            vec!["station_lookup_failed ABC STATION_LOOKUP"]
        );
    }

    #[test]
    fn test_each_code_resolved_once() {
        struct Counting<'a>(&'a Cell<usize>);
        impl StationResolver for Counting<'_> {
            fn resolve(&self, station: &str) -> Result<Option<StationLocation>> {
                self.0.set(self.0.get() + 1);
                Ok(Some(StationLocation::new("XX", station, 0.0, 0.0)))
            }
        }

        let calls = Cell::new(0);
        let located = locate_stations(
            &Counting(&calls),
            ["ABC", "ABC", "HOA"],
            &RecordingObserver::new(),
        );
        assert_eq!(located.len(), 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_caching_resolver_memoizes_misses() {
        let cached = CachingResolver::new(table());
        assert!(cached.resolve("ZZZ").unwrap().is_none());
        assert!(cached.resolve("ABC").unwrap().is_some());
        assert!(cached.resolve("ABC").unwrap().is_some());
        assert_eq!(cached.cached_len(), 2);
    }

    #[test]
    fn test_caching_resolver_skips_errors() {
        let cached = CachingResolver::new(table().with_failure("HOA"));
        assert!(cached.resolve("HOA").is_err());
        assert_eq!(cached.cached_len(), 0);
    }
}
