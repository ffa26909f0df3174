//! Payment provider integration.
//!
//! [`signature`] verifies the raw-body webhook signature, [`events`] types
//! the event payloads, [`client`] drives checkout/portal/customer creation.

pub mod client;
pub mod error;
pub mod events;
pub mod signature;

pub use client::{CheckoutMode, Customer, Session, StripeClient};
pub use error::{PaymentsError, Result};
pub use events::{Event, EventKind};
