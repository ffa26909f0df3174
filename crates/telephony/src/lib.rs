//! Telephony provider integration.
//!
//! Four concerns: proving an inbound webhook authentic
//! ([`signature`]), answering it with call-control markup ([`twiml`]),
//! sending SMS through the REST API ([`client`]), and minting softphone
//! access tokens ([`token`]).

pub mod client;
pub mod error;
pub mod signature;
pub mod token;
pub mod twiml;

pub use client::{SendFrom, SentMessage, SmsSender, TwilioClient};
pub use error::{Result, TelephonyError};
pub use token::TokenSigner;
pub use twiml::VoiceResponse;
