//! Request authentication helpers for action endpoints.

use axum::http::HeaderMap;

use access::{Principal, Role};

use crate::error::Result;
use crate::state::AppState;

/// A fully resolved caller: principal plus role.
#[derive(Debug, Clone)]
pub struct Caller {
    pub principal: Principal,
    pub role: Role,
}

/// Resolve the caller behind a request's `Authorization` header.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Caller> {
    let authorization = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let principal = access::resolve_principal(state.verifier.as_ref(), authorization).await?;
    let role = access::role_for(state.db.pool(), &principal.id).await?;

    Ok(Caller { principal, role })
}

/// Authenticate and require tenant access in one step.
pub async fn authenticate_for_client(
    state: &AppState,
    headers: &HeaderMap,
    client_id: &str,
) -> Result<Caller> {
    let caller = authenticate(state, headers).await?;
    access::authorize_client_access(state.db.pool(), &caller.principal.id, caller.role, client_id)
        .await?;
    Ok(caller)
}
