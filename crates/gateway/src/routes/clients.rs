//! Tenant administration.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use database::models::Client;

use crate::auth::authenticate;
use crate::error::Result;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct InviteRequest {
    pub client_name: String,
    /// When the invitee already has a profile, they get a client-user
    /// grant immediately.
    pub email: Option<String>,
}

#[derive(Serialize)]
pub struct InviteResponse {
    pub client_id: String,
}

/// Create a tenant and optionally grant its first client-user login.
pub async fn invite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<InviteRequest>,
) -> Result<Json<InviteResponse>> {
    let pool = state.db.pool();
    let caller = authenticate(&state, &headers).await?;
    access::require_internal(caller.role)?;

    let client = Client {
        id: Uuid::new_v4().to_string(),
        name: req.client_name.clone(),
        created_by: caller.principal.id.clone(),
        created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    database::client::create_client(pool, &client).await?;

    if let Some(email) = &req.email {
        if let Some(profile) = database::profile::get_profile_by_email(pool, email).await? {
            database::client::grant_client_user(pool, &profile.id, &client.id).await?;
        }
    }

    database::audit::write(
        pool,
        &client.id,
        &caller.principal.id,
        "client_invited",
        Some(&req.client_name),
    )
    .await?;

    info!(client_id = %client.id, "tenant created");
    Ok(Json(InviteResponse { client_id: client.id }))
}
