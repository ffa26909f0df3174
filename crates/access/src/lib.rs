//! Identity resolution, tenant authorization, and entitlement evaluation.
//!
//! This crate is purely advisory: it reads the profile and membership
//! tables and consults the auth provider, but mutates nothing. Handlers
//! call [`authz::resolve_principal`] then gate every tenant-scoped write
//! behind [`authz::authorize_client_access`].

pub mod authz;
pub mod entitlement;
pub mod error;
pub mod role;
pub mod verifier;

pub use authz::{authorize_client_access, require_internal, resolve_principal, role_for};
pub use entitlement::has_access;
pub use error::{AccessError, Result};
pub use role::Role;
pub use verifier::{bearer_token, HttpTokenVerifier, Principal, TokenVerifier};
