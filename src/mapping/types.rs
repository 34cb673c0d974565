//! Country mapping types and error definitions.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Path that means "no special landing page" for a country.
pub const ROOT_PATH: &str = "/";

/// Immutable country code → landing path table.
///
/// Built once per successful fetch and shared behind an `Arc`; never mutated
/// after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CountryMapping {
    paths: HashMap<String, String>,
}

impl CountryMapping {
    pub fn new(paths: HashMap<String, String>) -> Self {
        Self { paths }
    }

    /// Landing path for a country, if mapped.
    pub fn get(&self, country: &str) -> Option<&str> {
        self.paths.get(country).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.paths.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CountryMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Errors raised while obtaining a country mapping.
///
/// `Clone` so that every caller joined on one in-flight fetch receives the
/// same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// Transport failure talking to the mapping endpoint.
    #[error("Mapping fetch failed: {0}")]
    Fetch(String),

    /// Endpoint answered with a non-success status.
    #[error("Mapping endpoint returned HTTP {0}")]
    Status(u16),

    /// Fetch did not complete within the configured bound.
    #[error("Mapping fetch timed out after {0:?}")]
    Timeout(Duration),

    /// Payload missing, empty or malformed.
    #[error("Malformed mapping payload: {0}")]
    Parse(String),

    /// Source settings that cannot be turned into a working client.
    #[error("Invalid mapping source configuration: {0}")]
    Config(String),

    /// No mapping was ever cached and the fetch just failed.
    #[error("No country mapping available: {0}")]
    Unavailable(String),
}

impl MappingError {
    /// True for transport, status and timeout failures.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Status(_) | Self::Timeout(_))
    }
}

/// Result type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;
