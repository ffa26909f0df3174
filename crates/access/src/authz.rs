//! Role lookup and tenant authorization.

use sqlx::SqlitePool;

use crate::error::{AccessError, Result};
use crate::role::Role;
use crate::verifier::{bearer_token, Principal, TokenVerifier};

/// Resolve the principal behind an `Authorization` header.
pub async fn resolve_principal(
    verifier: &dyn TokenVerifier,
    authorization: Option<&str>,
) -> Result<Principal> {
    let token = bearer_token(authorization)?;
    verifier.verify(token).await
}

/// Look up the principal's role.
///
/// A missing profile row is the documented fallback to the non-privileged
/// [`Role::Unknown`], not a failure.
pub async fn role_for(pool: &SqlitePool, principal_id: &str) -> Result<Role> {
    let profile = database::profile::get_profile(pool, principal_id).await?;
    Ok(profile
        .map(|p| Role::parse(&p.role))
        .unwrap_or(Role::Unknown))
}

/// Require an internal role for action endpoints.
pub fn require_internal(role: Role) -> Result<()> {
    if role.is_internal() {
        Ok(())
    } else {
        Err(AccessError::Forbidden("internal role required".into()))
    }
}

/// Authorize the principal to act on a tenant.
///
/// `Admin` passes unconditionally. Otherwise the two membership tables are
/// checked concurrently; a grant in either suffices. An infrastructure
/// failure in either lookup propagates as a database error rather than
/// being read as "no access".
pub async fn authorize_client_access(
    pool: &SqlitePool,
    principal_id: &str,
    role: Role,
    client_id: &str,
) -> Result<()> {
    if role == Role::Admin {
        return Ok(());
    }

    let (is_user, is_staff) = tokio::try_join!(
        database::client::is_client_user(pool, principal_id, client_id),
        database::client::is_client_staff(pool, principal_id, client_id),
    )?;

    if is_user || is_staff {
        Ok(())
    } else {
        tracing::warn!(principal_id, client_id, "tenant access denied");
        Err(AccessError::Forbidden(format!(
            "no access to client {client_id}"
        )))
    }
}
