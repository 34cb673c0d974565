//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the upstream forwarding fallback
//! - Wire up middleware (geo rewrite, request ID, tracing, timeout)
//! - Mount admin routes when enabled
//! - Forward every request, rewritten or not, to the upstream application

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::{AdminConfig, GeoRewriteConfig};
use crate::mapping::{MappingCache, MappingResult, MappingSource, RemoteMappingSource};
use crate::observability::metrics;
use crate::rewrite::{geo_rewrite_middleware, RewriteDecisionEngine};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: String,
    pub cache: MappingCache,
    pub admin: AdminConfig,
}

/// Front proxy applying country rewrites before forwarding upstream.
pub struct HttpServer {
    router: Router,
    config: GeoRewriteConfig,
    cache: MappingCache,
}

impl HttpServer {
    /// Create a server fetching its mapping from the configured endpoint.
    pub fn new(config: GeoRewriteConfig) -> MappingResult<Self> {
        let source = RemoteMappingSource::new(&config.mapping_source)?;
        Ok(Self::with_source(config, Arc::new(source)))
    }

    /// Create a server with an explicit mapping source.
    pub fn with_source(config: GeoRewriteConfig, source: Arc<dyn MappingSource>) -> Self {
        let cache = MappingCache::from_config(source, &config);
        let engine = Arc::new(RewriteDecisionEngine::from_config(cache.clone(), &config));

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            client,
            upstream: config.upstream.address.clone(),
            cache: cache.clone(),
            admin: config.admin.clone(),
        };

        let router = Self::build_router(&config, state, engine);
        Self {
            router,
            config,
            cache,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &GeoRewriteConfig,
        state: AppState,
        engine: Arc<RewriteDecisionEngine>,
    ) -> Router {
        let mut router = Router::new();
        if config.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }

        router
            .fallback(forward_handler)
            .with_state(state)
            .layer(middleware::from_fn_with_state(engine, geo_rewrite_middleware))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            entry_paths = ?self.config.rewrite.entry_paths,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GeoRewriteConfig {
        &self.config
    }

    /// Mapping cache shared by the rewrite engine and admin routes.
    pub fn cache(&self) -> &MappingCache {
        &self.cache
    }
}

/// Forward the request to the upstream application.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let (mut parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));

    let uri = match Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(state.upstream.as_str())
        .path_and_query(path_and_query)
        .build()
    {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, upstream = %state.upstream, error = %e, "Invalid upstream address");
            metrics::record_upstream(502);
            return (StatusCode::BAD_GATEWAY, "Invalid upstream address").into_response();
        }
    };

    tracing::debug!(request_id = %request_id, method = %parts.method, uri = %uri, "Forwarding request");
    parts.uri = uri;

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            metrics::record_upstream(response.status().as_u16());
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_upstream(502);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
