//! Per-request rewrite decision.
//!
//! ```text
//! Start → GuardChecked ─┬─ marker present / not an entry path ─→ PassThrough
//!                       └─ CountryResolved → MappingLookedUp ─┬─ unmapped / error → PassThrough
//!                                                             └─ mapped → Rewrite
//! ```

use std::collections::HashSet;

use axum::http::uri::PathAndQuery;
use axum::http::{HeaderName, Request};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::form_urlencoded;

use crate::config::{GeoRewriteConfig, RewriteConfig};
use crate::mapping::{MappingCache, ROOT_PATH};
use crate::observability::metrics;
use crate::rewrite::guard::LoopGuard;

/// Bytes that cannot appear raw in a URI path.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const DEFAULT_COUNTRY_HEADER: &str = "x-geo-country";

/// What the engine needs to know about one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Request path as received.
    pub path: String,
    /// Raw query string, without `?`.
    pub query: Option<String>,
    /// Country detected upstream of us, if any.
    pub country: Option<String>,
    /// Request carries the loop guard marker.
    pub has_marker: bool,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, country: Option<String>) -> Self {
        Self {
            path: path.into(),
            query: None,
            country,
            has_marker: false,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_marker(mut self) -> Self {
        self.has_marker = true;
        self
    }
}

/// Where a rewritten request goes.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteTarget {
    /// Decoded target path.
    pub target_path: String,
    /// Path the visitor asked for.
    pub original_path: String,
    /// Final request target, original path carried in the query.
    pub path_and_query: PathAndQuery,
}

/// Routing decision handed back to the serving layer.
#[derive(Debug, Clone, PartialEq)]
pub enum RewriteDecision {
    PassThrough,
    Rewrite(RewriteTarget),
}

impl RewriteDecision {
    pub fn is_rewrite(&self) -> bool {
        matches!(self, Self::Rewrite(_))
    }
}

/// Decides, per request, whether to send the visitor to a country landing page.
#[derive(Debug, Clone)]
pub struct RewriteDecisionEngine {
    cache: MappingCache,
    guard: LoopGuard,
    entry_paths: HashSet<String>,
    landing_prefix: String,
    fallback_country: String,
    country_header: HeaderName,
    original_path_param: String,
}

impl RewriteDecisionEngine {
    pub fn new(cache: MappingCache, guard: LoopGuard, config: &RewriteConfig) -> Self {
        let country_header = HeaderName::try_from(config.country_header.as_str()).unwrap_or_else(|_| {
            tracing::warn!(
                header = %config.country_header,
                "Invalid country header name, using {}",
                DEFAULT_COUNTRY_HEADER
            );
            HeaderName::from_static(DEFAULT_COUNTRY_HEADER)
        });

        Self {
            cache,
            guard,
            entry_paths: config.entry_paths.iter().cloned().collect(),
            landing_prefix: config.landing_prefix.trim_end_matches('/').to_string(),
            fallback_country: config.fallback_country.trim().to_string(),
            country_header,
            original_path_param: config.original_path_param.clone(),
        }
    }

    pub fn from_config(cache: MappingCache, config: &GeoRewriteConfig) -> Self {
        Self::new(cache, LoopGuard::from_config(&config.loop_guard), &config.rewrite)
    }

    pub fn guard(&self) -> &LoopGuard {
        &self.guard
    }

    pub fn cache(&self) -> &MappingCache {
        &self.cache
    }

    /// Extract the decision inputs from an HTTP request.
    pub fn context_for<B>(&self, request: &Request<B>) -> RequestContext {
        let headers = request.headers();
        let country = headers
            .get(&self.country_header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned);

        RequestContext {
            path: request.uri().path().to_string(),
            query: request.uri().query().map(str::to_owned),
            country,
            has_marker: self.guard.has_marker(headers),
        }
    }

    /// Decide how to route one request. Never fails: every problem becomes
    /// `PassThrough`.
    pub async fn decide(&self, ctx: &RequestContext) -> RewriteDecision {
        if !self.guard.should_rewrite(ctx) {
            tracing::debug!(path = %ctx.path, "Loop guard marker present, not rewriting");
            metrics::record_decision("guarded");
            return RewriteDecision::PassThrough;
        }
        if !self.entry_paths.contains(&ctx.path) {
            return RewriteDecision::PassThrough;
        }

        let country = ctx
            .country
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(self.fallback_country.as_str());

        let resolved = match self.cache.resolve(country).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                tracing::debug!(country, "Country not mapped");
                metrics::record_decision("pass_through");
                return RewriteDecision::PassThrough;
            }
            Err(e) => {
                tracing::warn!(country, error = %e, "Country mapping unavailable, passing through");
                metrics::record_decision("pass_through");
                return RewriteDecision::PassThrough;
            }
        };

        match self.build_target(ctx, &resolved) {
            Ok(target) => {
                tracing::debug!(
                    country,
                    from = %ctx.path,
                    to = %target.path_and_query,
                    "Rewriting to country landing page"
                );
                metrics::record_decision("rewrite");
                RewriteDecision::Rewrite(target)
            }
            Err(e) => {
                tracing::warn!(country, resolved = %resolved, error = %e, "Unusable rewrite target");
                metrics::record_decision("pass_through");
                RewriteDecision::PassThrough
            }
        }
    }

    fn build_target(
        &self,
        ctx: &RequestContext,
        resolved: &str,
    ) -> Result<RewriteTarget, axum::http::uri::InvalidUri> {
        // The root sentinel keeps the visitor on the entry path itself.
        let (target_path, encoded_path) = if resolved == ROOT_PATH {
            (ctx.path.clone(), ctx.path.clone())
        } else {
            (
                format!("{}{}", self.landing_prefix, resolved),
                format!(
                    "{}{}",
                    self.landing_prefix,
                    utf8_percent_encode(resolved, PATH)
                ),
            )
        };

        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(existing) = &ctx.query {
            for (key, value) in form_urlencoded::parse(existing.as_bytes()) {
                if key != self.original_path_param.as_str() {
                    query.append_pair(&key, &value);
                }
            }
        }
        query.append_pair(&self.original_path_param, &ctx.path);

        let path_and_query = PathAndQuery::try_from(format!("{encoded_path}?{}", query.finish()))?;
        Ok(RewriteTarget {
            target_path,
            original_path: ctx.path.clone(),
            path_and_query,
        })
    }
}
