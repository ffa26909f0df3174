//! SQLite persistence layer for the funding-ops backend.
//!
//! Every table is tenant-scoped by `client_id`; writes that mirror external
//! provider objects (calls, messages, subscriptions, payments) are upserts
//! keyed by the provider's own id so repeated or out-of-order webhook
//! deliveries converge, and the [`ledger`] module is the single gate that
//! decides whether a delivery's side effects run at all.
//!
//! # Example
//!
//! ```no_run
//! use database::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:fundops.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let fresh = database::ledger::record_if_new(
//!         db.pool(), "twilio", "sms_inbound", "SM123", "{}",
//!     ).await?;
//!     assert!(fresh);
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod billing;
pub mod client;
pub mod consent;
pub mod contact;
pub mod document;
pub mod error;
pub mod ledger;
pub mod models;
pub mod profile;
pub mod sms;
pub mod telephony;

pub use error::{DatabaseError, Result};
pub use models::{
    BillingCustomer, Call, Client, ConsentRecord, Contact, DocumentExtraction, Payment, Profile,
    SmsMessage, SmsThread, Subscription, TelephonyIdentity, TelephonySettings,
};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size; webhook bursts fan out across connections.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// Use `?mode=rwc` in the URL to create the file if it doesn't exist,
    /// or `sqlite::memory:` for tests.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!("Connected to database: {} (pool size: {})", url, pool_size);

        Ok(Self { pool })
    }

    /// Run database migrations. Call once after connecting.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
