//! The reqwest-backed SDK proxy client.

use crate::api::{
    AddCreditsRequest, CreateDataAccountRequest, CreateIdentityRequest, CreateTokenAccountRequest,
    FaucetRequest, GenerateKeysRequest, GeneratedKeys, HealthStatus, LedgerApi, QueryResult,
    SendTokensRequest, TxResponse, WriteDataRequest,
};
use crate::ClientError;
use async_trait::async_trait;
use ledgerflow_core::{EngineError, ReceiptFetcher, SessionProvider};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// HTTP client for the SDK proxy.
///
/// Carries a per-client session ID so the proxy can keep signing keys
/// across calls; the session ID is injected into every session-scoped
/// request body. The connected flag is maintained by
/// [`ProxyClient::connect`] and backs the engine's session gate.
pub struct ProxyClient {
    http: Client,
    base_url: String,
    session_id: String,
    connected: AtomicBool,
}

impl ProxyClient {
    /// Create a client for a proxy at the given base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_id: Uuid::new_v4().to_string(),
            connected: AtomicBool::new(false),
        })
    }

    /// The session ID sent with session-scoped requests
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Probe the proxy and record whether a network session is live.
    ///
    /// The engine refuses to start a run until this has succeeded with a
    /// connected proxy.
    pub async fn connect(&self) -> Result<HealthStatus, ClientError> {
        let health = self.health().await?;
        self.connected.store(health.connected, Ordering::SeqCst);

        tracing::info!(
            network = health.network.as_deref().unwrap_or("unknown"),
            connected = health.connected,
            "Proxy health probed"
        );

        Ok(health)
    }

    /// POST a session-scoped request body and decode the response
    async fn post_session<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let mut value = serde_json::to_value(body)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("session_id".to_string(), json!(self.session_id));
        }

        self.post(path, &value).await
    }

    /// POST a request body and decode the response
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Proxy request");

        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl LedgerApi for ProxyClient {
    async fn generate_keys(&self, req: GenerateKeysRequest) -> Result<GeneratedKeys, ClientError> {
        self.post_session("/api/generate-keys", &req).await
    }

    async fn faucet(&self, req: FaucetRequest) -> Result<TxResponse, ClientError> {
        let resp: TxResponse = self.post_session("/api/faucet", &req).await?;
        resp.into_result()
    }

    async fn add_credits(&self, req: AddCreditsRequest) -> Result<TxResponse, ClientError> {
        let resp: TxResponse = self.post_session("/api/add-credits", &req).await?;
        resp.into_result()
    }

    async fn create_identity(
        &self,
        req: CreateIdentityRequest,
    ) -> Result<TxResponse, ClientError> {
        let resp: TxResponse = self.post_session("/api/create-identity", &req).await?;
        resp.into_result()
    }

    async fn create_token_account(
        &self,
        req: CreateTokenAccountRequest,
    ) -> Result<TxResponse, ClientError> {
        let resp: TxResponse = self.post_session("/api/create-token-account", &req).await?;
        resp.into_result()
    }

    async fn send_tokens(&self, req: SendTokensRequest) -> Result<TxResponse, ClientError> {
        let resp: TxResponse = self.post_session("/api/send-tokens", &req).await?;
        resp.into_result()
    }

    async fn create_data_account(
        &self,
        req: CreateDataAccountRequest,
    ) -> Result<TxResponse, ClientError> {
        let resp: TxResponse = self.post_session("/api/create-data-account", &req).await?;
        resp.into_result()
    }

    async fn write_data(&self, req: WriteDataRequest) -> Result<TxResponse, ClientError> {
        let resp: TxResponse = self.post_session("/api/write-data", &req).await?;
        resp.into_result()
    }

    async fn query(&self, url: &str) -> Result<QueryResult, ClientError> {
        self.post("/api/query", &json!({ "url": url })).await
    }

    async fn query_tx(&self, tx_hash: &str) -> Result<QueryResult, ClientError> {
        self.post("/api/query-tx", &json!({ "tx_hash": tx_hash }))
            .await
    }

    async fn health(&self) -> Result<HealthStatus, ClientError> {
        let url = format!("{}/api/health", self.base_url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

impl SessionProvider for ProxyClient {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReceiptFetcher for ProxyClient {
    async fn fetch_receipt(&self, tx_hash: &str) -> Result<serde_json::Value, EngineError> {
        let result = self.query_tx(tx_hash).await.map_err(EngineError::from)?;

        if result.success {
            Ok(result.data.unwrap_or(serde_json::Value::Null))
        } else {
            Err(EngineError::Other(
                result
                    .error
                    .unwrap_or_else(|| "transaction not found".to_string()),
            ))
        }
    }
}
