// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::distance::Coordinate;
use log::debug;
use serde::Deserialize;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
/// Lower bound on the spacing between two geocoder requests.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    #[error("geocoding service unavailable: {0}")]
    Unavailable(String),
    #[error("no match for '{0}'")]
    NoMatch(String),
    #[error("malformed geocoder response: {0}")]
    Malformed(String),
}

impl GeocodeError {
    /// Only transport-level failures are worth asking again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GeocodeError::Unavailable(_))
    }
}

/// Resolves a free-form place name to a coordinate.
pub trait Geocoder {
    fn resolve(&mut self, name: &str) -> Result<Coordinate, GeocodeError>;
}

impl<G: Geocoder + ?Sized> Geocoder for &mut G {
    fn resolve(&mut self, name: &str) -> Result<Coordinate, GeocodeError> {
        (**self).resolve(name)
    }
}

impl<G: Geocoder + ?Sized> Geocoder for Box<G> {
    fn resolve(&mut self, name: &str) -> Result<Coordinate, GeocodeError> {
        (**self).resolve(name)
    }
}

/// Spaces consecutive calls to the wrapped geocoder by at least `min_delay`.
pub struct Throttled<G> {
    inner: G,
    min_delay: Duration,
    last_call: Option<Instant>,
}

impl<G: Geocoder> Throttled<G> {
    pub fn new(inner: G, min_delay: Duration) -> Self {
        Self {
            inner,
            min_delay,
            last_call: None,
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn into_inner(self) -> G {
        self.inner
    }
}

impl<G: Geocoder> Geocoder for Throttled<G> {
    fn resolve(&mut self, name: &str) -> Result<Coordinate, GeocodeError> {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                thread::sleep(self.min_delay - elapsed);
            }
        }
        self.last_call = Some(Instant::now());
        self.inner.resolve(name)
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Blocking client for the Nominatim `/search` endpoint.
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    search_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("film-map/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            search_url: format!("{}/search", base_url.trim_end_matches('/')),
        })
    }
}

impl Geocoder for NominatimGeocoder {
    fn resolve(&mut self, name: &str) -> Result<Coordinate, GeocodeError> {
        let body = self
            .client
            .get(&self.search_url)
            .query(&[("q", name), ("format", "json"), ("limit", "1")])
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(|e| GeocodeError::Unavailable(e.to_string()))?;

        debug!("Nominatim response — query={:?} bytes={}", name, body.len());
        parse_search_response(name, &body)
    }
}

/// Interprets a Nominatim `format=json` search body.
pub fn parse_search_response(name: &str, body: &str) -> Result<Coordinate, GeocodeError> {
    let places: Vec<NominatimPlace> =
        serde_json::from_str(body).map_err(|e| GeocodeError::Malformed(e.to_string()))?;
    let place = places
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::NoMatch(name.to_string()))?;

    let lat = place
        .lat
        .trim()
        .parse::<f64>()
        .map_err(|_| GeocodeError::Malformed(format!("lat '{}'", place.lat)))?;
    let lon = place
        .lon
        .trim()
        .parse::<f64>()
        .map_err(|_| GeocodeError::Malformed(format!("lon '{}'", place.lon)))?;

    let coord = Coordinate::new(lat, lon);
    if !coord.is_valid() {
        return Err(GeocodeError::Malformed(format!("out of range {},{}", lat, lon)));
    }
    Ok(coord)
}
