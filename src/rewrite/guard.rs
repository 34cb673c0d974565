//! Rewrite loop guard.
//!
//! A rewritten response carries a short-lived `HttpOnly`, `SameSite=Strict`
//! cookie. A request presenting it is never rewritten, and the response to
//! that request expires the cookie again.

use std::time::Duration;

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};

use crate::config::LoopGuardConfig;
use crate::rewrite::engine::RequestContext;

#[derive(Debug, Clone)]
pub struct LoopGuard {
    cookie_name: String,
    ttl: Duration,
    secure: bool,
}

impl LoopGuard {
    pub fn new(cookie_name: impl Into<String>, ttl: Duration, secure: bool) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            ttl,
            secure,
        }
    }

    pub fn from_config(config: &LoopGuardConfig) -> Self {
        Self::new(
            config.cookie_name.clone(),
            Duration::from_secs(config.ttl_secs),
            config.secure,
        )
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Whether any `Cookie` header on the request carries the marker.
    pub fn has_marker(&self, headers: &HeaderMap) -> bool {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(name, _)| name.trim() == self.cookie_name)
    }

    /// False once the request has already been through a rewrite.
    ///
    /// The marker is consumed by calling [`LoopGuard::clear_marker`] on the
    /// response to such a request.
    pub fn should_rewrite(&self, ctx: &RequestContext) -> bool {
        !ctx.has_marker
    }

    /// Attach the marker to a rewritten response.
    pub fn mark_rewritten(&self, headers: &mut HeaderMap) {
        self.append(headers, self.marker_cookie());
    }

    /// Expire the marker on the client.
    pub fn clear_marker(&self, headers: &mut HeaderMap) {
        self.append(headers, self.clear_cookie());
    }

    fn append(&self, headers: &mut HeaderMap, cookie: String) {
        match HeaderValue::try_from(cookie) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "Loop guard cookie is not a valid header value"),
        }
    }

    fn marker_cookie(&self) -> String {
        format!(
            "{}=true; Path=/; HttpOnly; SameSite=Strict; Max-Age={}{}",
            self.cookie_name,
            self.ttl.as_secs(),
            self.secure_attr()
        )
    }

    fn clear_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0{}",
            self.cookie_name,
            self.secure_attr()
        )
    }

    fn secure_attr(&self) -> &'static str {
        if self.secure {
            "; Secure"
        } else {
            ""
        }
    }
}

impl Default for LoopGuard {
    fn default() -> Self {
        Self::from_config(&LoopGuardConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_detects_marker_among_cookies() {
        let guard = LoopGuard::default();
        assert!(guard.has_marker(&headers_with_cookie("a=1; middleware-rewrite=true; b=2")));
        assert!(guard.has_marker(&headers_with_cookie("middleware-rewrite=")));
        assert!(!guard.has_marker(&headers_with_cookie("a=1; middleware-rewrite-x=true")));
        assert!(!guard.has_marker(&HeaderMap::new()));
    }

    #[test]
    fn test_detects_marker_in_second_cookie_header() {
        let guard = LoopGuard::default();
        let mut headers = headers_with_cookie("a=1");
        headers.append(COOKIE, HeaderValue::from_static("middleware-rewrite=true"));
        assert!(guard.has_marker(&headers));
    }

    #[test]
    fn test_marker_cookie_attributes() {
        let guard = LoopGuard::new("middleware-rewrite", Duration::from_secs(300), false);
        let mut headers = HeaderMap::new();
        guard.mark_rewritten(&mut headers);

        let cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert_eq!(
            cookie,
            "middleware-rewrite=true; Path=/; HttpOnly; SameSite=Strict; Max-Age=300"
        );
    }

    #[test]
    fn test_clear_cookie_is_secure_when_configured() {
        let guard = LoopGuard::new("geo", Duration::from_secs(60), true);
        let mut headers = HeaderMap::new();
        guard.clear_marker(&mut headers);

        let cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert_eq!(cookie, "geo=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0; Secure");
    }

    #[test]
    fn test_should_rewrite_follows_marker() {
        let guard = LoopGuard::default();
        let mut ctx = RequestContext::new("/", Some("DK".to_string()));
        assert!(guard.should_rewrite(&ctx));
        ctx.has_marker = true;
        assert!(!guard.should_rewrite(&ctx));
    }
}
