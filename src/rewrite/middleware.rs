//! Axum middleware applying rewrite decisions.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, Uri},
    middleware::Next,
    response::Response,
};

use crate::rewrite::engine::{RewriteDecision, RewriteDecisionEngine};

/// Rewrite eligible requests to their country landing page.
///
/// The request URI is replaced in place before the rest of the stack sees
/// it. Loop guard cookies are written on the way back out.
pub async fn geo_rewrite_middleware(
    State(engine): State<Arc<RewriteDecisionEngine>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let ctx = engine.context_for(&request);
    let decision = engine.decide(&ctx).await;

    let mut rewritten = false;
    if let RewriteDecision::Rewrite(target) = decision {
        let mut parts = request.uri().clone().into_parts();
        parts.path_and_query = Some(target.path_and_query);
        match Uri::from_parts(parts) {
            Ok(uri) => {
                *request.uri_mut() = uri;
                rewritten = true;
            }
            Err(e) => {
                tracing::warn!(path = %ctx.path, error = %e, "Failed to apply rewrite, passing through");
            }
        }
    }

    let mut response = next.run(request).await;

    let guard = engine.guard();
    if ctx.has_marker {
        guard.clear_marker(response.headers_mut());
    }
    if rewritten {
        guard.mark_rewritten(response.headers_mut());
    }
    response
}
