//! Mapping payload format.
//!
//! The mapping is authored as `DK=%2Fdk-home&SE=%2F`: pairs joined by `&`,
//! key and value split on the first `=`, values percent-encoded. A single bad
//! pair rejects the whole payload; a partial mapping is never produced.

use std::collections::{BTreeMap, HashMap};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::mapping::types::{CountryMapping, MappingError, MappingResult};

/// Characters left alone by JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Parse a serialized mapping.
pub fn parse_mapping(payload: &str) -> MappingResult<CountryMapping> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(MappingError::Parse("payload is empty".to_string()));
    }

    let mut paths = HashMap::new();
    for pair in payload.split('&') {
        let (country, encoded) = pair
            .split_once('=')
            .ok_or_else(|| MappingError::Parse(format!("pair '{pair}' has no '='")))?;

        if country.is_empty() || encoded.is_empty() {
            return Err(MappingError::Parse(format!(
                "pair '{pair}' is missing a country or a path"
            )));
        }
        if !country.is_ascii() {
            return Err(MappingError::Parse(format!(
                "country '{country}' is not ASCII"
            )));
        }

        let path = percent_decode_str(encoded)
            .decode_utf8()
            .map_err(|_| MappingError::Parse(format!("path for '{country}' is not UTF-8")))?;
        if !path.starts_with('/') {
            return Err(MappingError::Parse(format!(
                "path '{path}' for '{country}' must start with '/'"
            )));
        }

        // Later duplicates win, as with any map literal.
        paths.insert(country.to_string(), path.into_owned());
    }

    Ok(CountryMapping::new(paths))
}

/// Serialize a mapping back to its payload format.
///
/// Pairs are emitted in key order so the output is deterministic.
pub fn encode_mapping(mapping: &CountryMapping) -> String {
    let sorted: BTreeMap<&str, &str> = mapping.iter().collect();
    sorted
        .into_iter()
        .map(|(country, path)| format!("{country}={}", utf8_percent_encode(path, COMPONENT)))
        .collect::<Vec<_>>()
        .join("&")
}
