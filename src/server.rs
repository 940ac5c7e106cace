//! HTTP surface: the generation endpoint plus material table editing.

use crate::error::{RenderError, Result};
use crate::gateway::{GenerationGateway, GenerationRequest};
use crate::image::SourceImage;
use crate::materials::{MaterialMapping, MaterialRecord, MaterialRegistry};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<MaterialRegistry>,
    gateway: GenerationGateway,
}

impl AppState {
    /// Creates handler state from a registry and a gateway.
    pub fn new(registry: Arc<MaterialRegistry>, gateway: GenerationGateway) -> Self {
        Self { registry, gateway }
    }
}

/// Body of `POST /api/generate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    materials: Option<MaterialMapping>,
    image: String,
    #[serde(default)]
    user_api_key: Option<String>,
}

/// Response of `POST /api/generate`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// Whether a render was produced.
    pub success: bool,
    /// Result URL on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateResponse {
    fn ok(result_url: String) -> Self {
        Self {
            success: true,
            result_url: Some(result_url),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result_url: None,
            error: Some(error.into()),
        }
    }
}

/// A [`RenderError`] rendered as `{ success: false, error }`.
struct ApiError {
    status: StatusCode,
    error: RenderError,
}

impl ApiError {
    /// Failure on the generation endpoint: 401 for a missing credential,
    /// 500 for everything else, malformed input included.
    fn generation(error: RenderError) -> Self {
        let status = if matches!(error, RenderError::MissingCredential(_)) {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self { status, error }
    }
}

impl From<RenderError> for ApiError {
    fn from(error: RenderError) -> Self {
        let status =
            StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self { status, error }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(GenerateResponse::failed(self.error.to_string()))).into_response()
    }
}

fn bad_json(rejection: JsonRejection) -> RenderError {
    RenderError::InvalidRequest(rejection.body_text())
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/generate", post(generate_handler))
        .route(
            "/api/materials",
            get(list_materials)
                .put(replace_materials)
                .delete(reset_materials),
        )
        .route("/api/materials/:key", put(update_material))
        .with_state(state)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "render server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

/// POST /api/generate: compose the instruction and run one generation.
///
/// The credential is resolved before the image is looked at, so a caller
/// without a key always gets 401.
async fn generate_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<GenerateBody>, JsonRejection>,
) -> std::result::Result<Json<GenerateResponse>, ApiError> {
    match generate(&state, body).await {
        Ok(url) => Ok(Json(GenerateResponse::ok(url))),
        Err(e) => {
            tracing::error!("generation failed: {e}");
            Err(ApiError::generation(e))
        }
    }
}

async fn generate(
    state: &AppState,
    body: std::result::Result<Json<GenerateBody>, JsonRejection>,
) -> Result<String> {
    let Json(body) = body.map_err(bad_json)?;
    let token = state.gateway.resolve_token(body.user_api_key.as_deref())?;

    let source_image = SourceImage::from_data_uri(body.image)?;
    let materials = match body.materials {
        Some(materials) => materials,
        None => state.registry.load(),
    };

    let request =
        GenerationRequest::new(body.prompt, materials, source_image).with_credential(token);
    state.gateway.generate(&request).await
}

async fn list_materials(State(state): State<AppState>) -> Json<MaterialMapping> {
    Json(state.registry.load())
}

async fn replace_materials(
    State(state): State<AppState>,
    body: std::result::Result<Json<MaterialMapping>, JsonRejection>,
) -> std::result::Result<Json<MaterialMapping>, ApiError> {
    let Json(mapping) = body.map_err(bad_json)?;
    state.registry.save(&mapping)?;
    tracing::info!(records = mapping.len(), "material mapping replaced");
    Ok(Json(mapping))
}

async fn update_material(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: std::result::Result<Json<MaterialRecord>, JsonRejection>,
) -> std::result::Result<Json<MaterialMapping>, ApiError> {
    let Json(record) = body.map_err(bad_json)?;
    let mapping = state.registry.update(&key, record)?;
    tracing::info!(key = %key, "material updated");
    Ok(Json(mapping))
}

async fn reset_materials(
    State(state): State<AppState>,
) -> std::result::Result<Json<MaterialMapping>, ApiError> {
    state.registry.reset()?;
    tracing::info!("material mapping reset to defaults");
    Ok(Json(state.registry.load()))
}
