use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::http::server::AppState;
use crate::mapping::{encode_mapping, CacheStatus, CountryMapping};

#[derive(Serialize)]
pub struct MappingView {
    pub version: &'static str,
    pub cache: CacheStatus,
    pub mapping: Option<Arc<CountryMapping>>,
    pub payload: Option<String>,
}

#[derive(Serialize)]
pub struct RefreshFailure {
    pub error: String,
}

/// Current cached mapping. Never triggers a fetch.
pub async fn get_mapping(State(state): State<AppState>) -> Json<MappingView> {
    let mapping = state.cache.current();
    let payload = mapping.as_deref().map(encode_mapping);

    Json(MappingView {
        version: env!("CARGO_PKG_VERSION"),
        cache: state.cache.status(),
        mapping,
        payload,
    })
}

/// Force a refetch of the mapping.
pub async fn refresh_mapping(State(state): State<AppState>) -> Response {
    match state.cache.refresh().await {
        Ok(_) => {
            tracing::info!("Country mapping refreshed via admin endpoint");
            get_mapping(State(state)).await.into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Admin-triggered mapping refresh failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(RefreshFailure {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
