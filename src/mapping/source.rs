//! Remote mapping retrieval.
//!
//! # Responsibilities
//! - Issue one GraphQL query against the content delivery endpoint
//! - Authenticate with the static token header
//! - Unwrap the JSON envelope and parse the serialized mapping
//!
//! # Design Decisions
//! - No caching and no retries; `MappingCache` owns both concerns
//! - Sources are a trait so the cache can run against any backend

use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

use crate::config::MappingSourceConfig;
use crate::mapping::codec::parse_mapping;
use crate::mapping::types::{CountryMapping, MappingError, MappingResult};

/// Anything able to produce a fresh country mapping.
pub trait MappingSource: Send + Sync {
    /// Fetch and parse the current mapping. One attempt, no caching.
    fn fetch_mapping(&self) -> BoxFuture<'_, MappingResult<CountryMapping>>;
}

/// Mapping source backed by the content delivery GraphQL endpoint.
#[derive(Clone)]
pub struct RemoteMappingSource {
    client: reqwest::Client,
    endpoint: String,
    query: String,
}

impl RemoteMappingSource {
    /// Build a source from configuration.
    pub fn new(config: &MappingSourceConfig) -> MappingResult<Self> {
        let mut headers = HeaderMap::new();
        let name = HeaderName::try_from(config.auth_header.as_str())
            .map_err(|e| MappingError::Config(format!("invalid auth header name: {e}")))?;
        let mut value = HeaderValue::from_str(&config.auth_token)
            .map_err(|e| MappingError::Config(format!("invalid auth token: {e}")))?;
        value.set_sensitive(true);
        headers.insert(name, value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .connect_timeout(config.timeout().min(Duration::from_secs(5)))
            .build()
            .map_err(|e| MappingError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            query: build_query(&config.item_path, &config.language, &config.field_name),
        })
    }

    /// The GraphQL document sent on every fetch.
    pub fn query(&self) -> &str {
        &self.query
    }

    async fn fetch(&self) -> MappingResult<CountryMapping> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "query": self.query }))
            .send()
            .await
            .map_err(|e| MappingError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MappingError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MappingError::Fetch(e.to_string()))?;
        let payload = extract_payload(&body)?;
        let mapping = parse_mapping(&payload)?;

        tracing::debug!(
            endpoint = %self.endpoint,
            countries = mapping.len(),
            "Fetched country mapping"
        );
        Ok(mapping)
    }
}

impl MappingSource for RemoteMappingSource {
    fn fetch_mapping(&self) -> BoxFuture<'_, MappingResult<CountryMapping>> {
        self.fetch().boxed()
    }
}

impl std::fmt::Debug for RemoteMappingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteMappingSource")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

fn build_query(item_path: &str, language: &str, field_name: &str) -> String {
    format!(
        "{{ item(language: {language:?}, path: {item_path:?}) {{ field(name: {field_name:?}) {{ jsonValue }} }} }}"
    )
}

#[derive(Deserialize)]
struct Envelope {
    data: Option<EnvelopeData>,
}

#[derive(Deserialize)]
struct EnvelopeData {
    item: Option<ItemNode>,
}

#[derive(Deserialize)]
struct ItemNode {
    field: Option<FieldNode>,
}

#[derive(Deserialize)]
struct FieldNode {
    #[serde(rename = "jsonValue")]
    json_value: Option<JsonValue>,
}

#[derive(Deserialize)]
struct JsonValue {
    value: Option<String>,
}

/// Pull the serialized mapping out of `data.item.field.jsonValue.value`.
pub fn extract_payload(body: &str) -> MappingResult<String> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| MappingError::Parse(format!("response is not a JSON envelope: {e}")))?;

    envelope
        .data
        .and_then(|d| d.item)
        .and_then(|i| i.field)
        .and_then(|f| f.json_value)
        .and_then(|v| v.value)
        .ok_or_else(|| MappingError::Parse("mapping field missing from response".to_string()))
}
