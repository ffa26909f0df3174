//! Webhook ingestion and authorized-action API.
//!
//! Every inbound webhook follows the same spine: verify the provider
//! signature, consult the idempotency ledger, resolve the owning tenant,
//! mutate, acknowledge. Authenticated actions resolve the caller's
//! principal and role, then gate every tenant-scoped write behind a
//! membership check.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod webhook;

pub use config::{Config, ConfigError};
pub use error::{GatewayError, Result};
pub use state::AppState;
