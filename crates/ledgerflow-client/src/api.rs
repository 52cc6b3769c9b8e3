//! Request and response types for the SDK proxy API, plus the [`LedgerApi`]
//! trait the step library programs against.

use crate::ClientError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of a submitted transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxResponse {
    /// Whether the proxy accepted and submitted the transaction
    pub success: bool,

    /// Transaction hash, when one was produced
    #[serde(default)]
    pub tx_hash: Option<String>,

    /// Simplified hash form used by some explorers
    #[serde(default)]
    pub simple_hash: Option<String>,

    /// Submission status reported by the proxy
    #[serde(default)]
    pub status: Option<String>,

    /// Error message when `success` is false
    #[serde(default)]
    pub error: Option<String>,

    /// Computed recipient URL, for lite data writes
    #[serde(default)]
    pub recipient: Option<String>,
}

impl TxResponse {
    /// Turn a proxy-reported failure into a [`ClientError::Api`]
    pub fn into_result(self) -> Result<TxResponse, ClientError> {
        if self.success {
            Ok(self)
        } else {
            Err(ClientError::Api(
                self.error.unwrap_or_else(|| "unknown proxy error".to_string()),
            ))
        }
    }
}

/// A freshly generated keypair and its derived lite accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedKeys {
    /// Signature algorithm of the keypair
    pub algorithm: String,

    /// Hex-encoded public key
    pub public_key: String,

    /// Derived lite identity URL
    pub lite_identity: String,

    /// Derived lite token account URL
    pub lite_token_account: String,

    /// Hash of the public key
    pub public_key_hash: String,
}

/// Result of an account or transaction query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Whether the query succeeded
    pub success: bool,

    /// Flattened account or transaction record
    #[serde(default)]
    pub data: Option<serde_json::Value>,

    /// Error message when `success` is false
    #[serde(default)]
    pub error: Option<String>,
}

/// Network health as reported by the proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Proxy status string
    pub status: String,

    /// Network the proxy is pointed at
    #[serde(default)]
    pub network: Option<String>,

    /// Whether the proxy can reach the network
    #[serde(default)]
    pub connected: bool,
}

/// Key generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateKeysRequest {
    /// Signature algorithm: ed25519, rcd1, btc or eth
    pub algorithm: String,

    /// Whether the proxy should keep the keypair as the session signer
    pub store_as_signer: bool,
}

impl Default for GenerateKeysRequest {
    fn default() -> Self {
        Self {
            algorithm: "ed25519".to_string(),
            store_as_signer: true,
        }
    }
}

/// Faucet parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetRequest {
    /// Account URL to fund
    pub account: String,

    /// How many times to hit the faucet
    pub times: u32,
}

/// Credit purchase parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCreditsRequest {
    /// Account URL receiving the credits
    pub recipient: String,

    /// Credit amount
    pub amount: u64,

    /// Oracle price override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle: Option<f64>,
}

/// Identity creation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIdentityRequest {
    /// URL of the identity to create
    pub url: String,

    /// Key book URL, derived by the proxy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_book_url: Option<String>,

    /// Key page URL, derived by the proxy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_page_url: Option<String>,

    /// Principal override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,

    /// Signer URL override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_url: Option<String>,
}

/// Token account creation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTokenAccountRequest {
    /// URL of the token account to create
    pub url: String,

    /// Token issuer URL
    pub token_url: String,

    /// Principal override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,

    /// Signer URL override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_url: Option<String>,
}

/// One token transfer recipient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecipient {
    /// Recipient account URL
    pub url: String,

    /// Amount in the token's smallest unit, as a decimal string
    pub amount: String,
}

/// Token send parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendTokensRequest {
    /// Account the tokens are sent from
    pub principal: String,

    /// Transfer recipients
    pub recipients: Vec<TokenRecipient>,

    /// Signer URL override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_url: Option<String>,
}

/// Data account creation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDataAccountRequest {
    /// URL of the data account to create
    pub url: String,

    /// Principal override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,

    /// Signer URL override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_url: Option<String>,
}

/// Data write parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteDataRequest {
    /// Data account URL written to
    pub account: String,

    /// Data entries as UTF-8 strings
    pub entries: Vec<String>,

    /// Principal override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,

    /// Signer URL override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_url: Option<String>,
}

/// The SDK proxy surface the step library programs against.
///
/// [`crate::ProxyClient`] is the HTTP implementation; tests substitute
/// their own.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Generate a keypair and derive its lite accounts
    async fn generate_keys(&self, req: GenerateKeysRequest) -> Result<GeneratedKeys, ClientError>;

    /// Request faucet funding for an account
    async fn faucet(&self, req: FaucetRequest) -> Result<TxResponse, ClientError>;

    /// Convert tokens into credits on an account
    async fn add_credits(&self, req: AddCreditsRequest) -> Result<TxResponse, ClientError>;

    /// Create an identity with its key book and page
    async fn create_identity(&self, req: CreateIdentityRequest)
        -> Result<TxResponse, ClientError>;

    /// Create a token account
    async fn create_token_account(
        &self,
        req: CreateTokenAccountRequest,
    ) -> Result<TxResponse, ClientError>;

    /// Send tokens to one or more recipients
    async fn send_tokens(&self, req: SendTokensRequest) -> Result<TxResponse, ClientError>;

    /// Create a data account
    async fn create_data_account(
        &self,
        req: CreateDataAccountRequest,
    ) -> Result<TxResponse, ClientError>;

    /// Write entries to a data account
    async fn write_data(&self, req: WriteDataRequest) -> Result<TxResponse, ClientError>;

    /// Query an account record by URL
    async fn query(&self, url: &str) -> Result<QueryResult, ClientError>;

    /// Query a transaction record by hash
    async fn query_tx(&self, tx_hash: &str) -> Result<QueryResult, ClientError>;

    /// Probe the proxy's network connectivity
    async fn health(&self) -> Result<HealthStatus, ClientError>;
}
