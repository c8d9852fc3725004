// src/api.rs
//! Thin HTTP adapter over the acquisition service and the structurer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::acquire::{ContentAcquisitionService, NormalizedPost};
use crate::error::AcquireError;
use crate::fallback::AcquisitionResult;
use crate::structure::{DecodedText, DocumentStructurer, StructuredDocument};

#[derive(Clone)]
pub struct AppState {
    acquisition: Arc<ContentAcquisitionService>,
    structurer: Arc<DocumentStructurer>,
}

pub fn router(acquisition: Arc<ContentAcquisitionService>) -> Router {
    let state = AppState {
        acquisition,
        structurer: Arc::new(DocumentStructurer::default()),
    };

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/post", post(fetch_post))
        .route("/translate", post(fetch_translation))
        .route("/structure", post(structure))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Boundary errors as JSON: 400 for bad input, 502 when every provider failed.
pub struct ApiError(AcquireError);

impl From<AcquireError> for ApiError {
    fn from(e: AcquireError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AcquireError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            AcquireError::AllProvidersExhausted { .. } => StatusCode::BAD_GATEWAY,
        };
        let body = json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
            "errors": self.0.failures(),
        });
        (status, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
struct PostReq {
    url: String,
}

async fn fetch_post(
    State(state): State<AppState>,
    Json(body): Json<PostReq>,
) -> Result<Json<AcquisitionResult<NormalizedPost>>, ApiError> {
    let res = state.acquisition.fetch_post(&body.url).await?;
    Ok(Json(res))
}

#[derive(Deserialize)]
struct TranslateReq {
    text: String,
    #[serde(default)]
    source: Option<String>,
    target: String,
}

async fn fetch_translation(
    State(state): State<AppState>,
    Json(body): Json<TranslateReq>,
) -> Result<Json<AcquisitionResult<String>>, ApiError> {
    let source = body.source.as_deref().unwrap_or("auto");
    let res = state
        .acquisition
        .fetch_translation(&body.text, source, &body.target)
        .await?;
    Ok(Json(res))
}

#[derive(Serialize)]
struct StructureResp {
    #[serde(flatten)]
    document: StructuredDocument,
    html: String,
}

async fn structure(
    State(state): State<AppState>,
    Json(body): Json<DecodedText>,
) -> Json<StructureResp> {
    let document = state.structurer.structure_decoded(body);
    let html = document.to_html();
    Json(StructureResp { document, html })
}
