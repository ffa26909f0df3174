//! Document analysis endpoints.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use database::models::DocumentExtraction;

use crate::auth::authenticate_for_client;
use crate::error::{GatewayError, Result};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub client_id: String,
    pub storage_path: String,
    pub mime_type: String,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub extraction_id: String,
    pub result: Value,
}

/// Fetch a stored document, run the structured extraction, and append the
/// result to the tenant's extraction history.
pub async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>> {
    let caller = authenticate_for_client(&state, &headers, &req.client_id).await?;

    let bytes = state.blobs.fetch(&req.storage_path).await?;
    let result = state.analyzer.analyze(&bytes, &req.mime_type).await?;

    let extraction = DocumentExtraction {
        id: Uuid::new_v4().to_string(),
        client_id: req.client_id.clone(),
        storage_path: req.storage_path.clone(),
        result: result.to_string(),
        created_by: caller.principal.id.clone(),
        created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    database::document::insert_extraction(state.db.pool(), &extraction).await?;

    info!(
        client_id = %req.client_id,
        extraction_id = %extraction.id,
        path = %req.storage_path,
        "document analyzed"
    );

    Ok(Json(AnalyzeResponse {
        extraction_id: extraction.id,
        result,
    }))
}

#[derive(Deserialize)]
pub struct LatestQuery {
    pub client_id: String,
    pub storage_path: String,
}

/// The most recent extraction for a path.
pub async fn latest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LatestQuery>,
) -> Result<Json<DocumentExtraction>> {
    authenticate_for_client(&state, &headers, &query.client_id).await?;

    let extraction =
        database::document::latest_for_path(state.db.pool(), &query.client_id, &query.storage_path)
            .await?
            .ok_or_else(|| {
                GatewayError::NotFound(format!("no extraction for {}", query.storage_path))
            })?;

    Ok(Json(extraction))
}

#[derive(Deserialize)]
pub struct SignRequest {
    pub client_id: String,
    pub storage_path: String,
    /// Signed-URL lifetime; defaults to one hour.
    pub expires_secs: Option<u64>,
}

#[derive(Serialize)]
pub struct SignResponse {
    pub url: String,
}

/// Issue a time-limited read URL for a stored document. The URL expires;
/// callers re-request rather than cache it.
pub async fn sign(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SignRequest>,
) -> Result<Json<SignResponse>> {
    authenticate_for_client(&state, &headers, &req.client_id).await?;

    let url = state
        .blobs
        .signed_url(&req.storage_path, req.expires_secs.unwrap_or(3600))
        .await?;

    Ok(Json(SignResponse { url }))
}
