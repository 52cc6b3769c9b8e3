//!
//! LedgerFlow Client - HTTP client for the SDK proxy
//!
//! The proxy builds, signs and submits transactions on behalf of a
//! session; this crate wraps its JSON API and implements the engine's
//! session gate and receipt fetcher on top of it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Request/response types and the `LedgerApi` trait
pub mod api;

/// Error types
pub mod error;

/// The reqwest-backed proxy client
pub mod proxy;

pub use api::{
    AddCreditsRequest, CreateDataAccountRequest, CreateIdentityRequest, CreateTokenAccountRequest,
    FaucetRequest, GenerateKeysRequest, GeneratedKeys, HealthStatus, LedgerApi, QueryResult,
    SendTokensRequest, TokenRecipient, TxResponse, WriteDataRequest,
};
pub use error::ClientError;
pub use proxy::ProxyClient;
