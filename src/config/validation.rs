//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0)
//! - Check paths, header names and URLs are well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GeoRewriteConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::uri::Authority;
use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::GeoRewriteConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("rewrite.entry_paths must not be empty")]
    NoEntryPaths,

    #[error("entry path '{0}' must start with '/'")]
    RelativeEntryPath(String),

    #[error("rewrite.landing_prefix '{0}' must start with '/' and not end with '/'")]
    LandingPrefix(String),

    #[error("rewrite.fallback_country must not be empty")]
    EmptyFallbackCountry,

    #[error("rewrite.original_path_param must not be empty")]
    EmptyOriginalPathParam,

    #[error("'{0}' is not a valid header name")]
    HeaderName(String),

    #[error("mapping_source.endpoint '{0}' is not a valid URL")]
    Endpoint(String),

    #[error("upstream.address '{0}' is not a host:port authority")]
    Upstream(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("loop_guard.cookie_name '{0}' is not a valid cookie name")]
    CookieName(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GeoRewriteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let rewrite = &config.rewrite;

    if rewrite.entry_paths.is_empty() {
        errors.push(ValidationError::NoEntryPaths);
    }
    for path in &rewrite.entry_paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::RelativeEntryPath(path.clone()));
        }
    }

    // An empty prefix is allowed: resolved paths are then used as-is.
    let prefix = &rewrite.landing_prefix;
    if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
        errors.push(ValidationError::LandingPrefix(prefix.clone()));
    }

    if rewrite.fallback_country.trim().is_empty() {
        errors.push(ValidationError::EmptyFallbackCountry);
    }
    if rewrite.original_path_param.is_empty() {
        errors.push(ValidationError::EmptyOriginalPathParam);
    }

    for name in [&rewrite.country_header, &config.mapping_source.auth_header] {
        if HeaderName::try_from(name.as_str()).is_err() {
            errors.push(ValidationError::HeaderName(name.clone()));
        }
    }

    if url::Url::parse(&config.mapping_source.endpoint).is_err() {
        errors.push(ValidationError::Endpoint(config.mapping_source.endpoint.clone()));
    }

    if config.upstream.address.parse::<Authority>().is_err() {
        errors.push(ValidationError::Upstream(config.upstream.address.clone()));
    }

    if config.mapping_source.timeout_ms == 0 {
        errors.push(ValidationError::Zero("mapping_source.timeout_ms"));
    }
    if config.loop_guard.ttl_secs == 0 {
        errors.push(ValidationError::Zero("loop_guard.ttl_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    let cookie = &config.loop_guard.cookie_name;
    if cookie.is_empty()
        || !cookie
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        errors.push(ValidationError::CookieName(cookie.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GeoRewriteConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GeoRewriteConfig::default();
        config.rewrite.entry_paths = vec!["home".to_string()];
        config.rewrite.landing_prefix = "/countryhome/".to_string();
        config.mapping_source.timeout_ms = 0;
        config.loop_guard.cookie_name = "bad cookie".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::RelativeEntryPath("home".to_string())));
        assert!(errors.contains(&ValidationError::Zero("mapping_source.timeout_ms")));
    }

    #[test]
    fn test_rejects_bad_endpoint_and_header() {
        let mut config = GeoRewriteConfig::default();
        config.mapping_source.endpoint = "not a url".to_string();
        config.rewrite.country_header = "bad header".to_string();
        config.upstream.address = "http://[::1".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::Endpoint("not a url".to_string())));
        assert!(errors.contains(&ValidationError::HeaderName("bad header".to_string())));
        assert!(errors.contains(&ValidationError::Upstream("http://[::1".to_string())));
    }

    #[test]
    fn test_empty_entry_paths() {
        let mut config = GeoRewriteConfig::default();
        config.rewrite.entry_paths.clear();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::NoEntryPaths])
        );
    }
}
