//! The standard step executor: maps step kinds onto SDK proxy calls.

use crate::kinds;
use async_trait::async_trait;
use ledgerflow_client::{
    AddCreditsRequest, CreateDataAccountRequest, CreateIdentityRequest, CreateTokenAccountRequest,
    FaucetRequest, GenerateKeysRequest, LedgerApi, SendTokensRequest, TokenRecipient, TxResponse,
    WriteDataRequest,
};
use ledgerflow_core::{
    EngineError, OutputMap, RunContext, Step, StepExecutor, COMMENT_KIND, TX_HASH_KEY,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Step executor backed by the SDK proxy.
///
/// Pure glue: resolves each step's parameters from its configuration and
/// gathered inputs, calls the proxy, and maps the response into an output
/// record. Scheduling, gating, and propagation stay in the engine.
pub struct LedgerStepExecutor {
    api: Arc<dyn LedgerApi>,
    faucet_pacing: Duration,
}

impl LedgerStepExecutor {
    /// Create an executor over the given proxy API
    pub fn new(api: Arc<dyn LedgerApi>) -> Self {
        Self {
            api,
            faucet_pacing: Duration::from_secs(1),
        }
    }

    /// Override the delay between repeated faucet submissions
    pub fn with_faucet_pacing(mut self, pacing: Duration) -> Self {
        self.faucet_pacing = pacing;
        self
    }

    async fn generate_keys(&self, step: &Step) -> Result<OutputMap, EngineError> {
        let req = GenerateKeysRequest {
            algorithm: config_str(step, "algorithm")
                .unwrap_or_else(|| "ed25519".to_string()),
            store_as_signer: config_bool(step, "store_as_signer").unwrap_or(true),
        };

        let keys = self.api.generate_keys(req).await?;

        let mut outputs = OutputMap::new();
        outputs.insert("algorithm".to_string(), json!(keys.algorithm));
        outputs.insert("public_key".to_string(), json!(keys.public_key));
        outputs.insert("lite_identity".to_string(), json!(keys.lite_identity));
        outputs.insert(
            "lite_token_account".to_string(),
            json!(keys.lite_token_account),
        );
        outputs.insert("public_key_hash".to_string(), json!(keys.public_key_hash));
        Ok(outputs)
    }

    async fn faucet(
        &self,
        step: &Step,
        inputs: &OutputMap,
        ctx: &RunContext,
    ) -> Result<OutputMap, EngineError> {
        let account = resolve_str(step, inputs, "account")
            .or_else(|| input_str(inputs, "lite_token_account"))
            .ok_or_else(|| missing(step, "account"))?;
        let times = config_u64(step, "times").unwrap_or(1).max(1);
        let request = FaucetRequest {
            account,
            times: 1,
        };

        // Repeated submissions honor stop() between rounds.
        if ctx.cancellation().is_cancelled() {
            return Err(EngineError::RunAborted);
        }
        let mut resp = self.api.faucet(request.clone()).await?;

        for _ in 1..times {
            tokio::time::sleep(self.faucet_pacing).await;
            if ctx.cancellation().is_cancelled() {
                return Err(EngineError::RunAborted);
            }
            resp = self.api.faucet(request.clone()).await?;
        }

        Ok(tx_outputs(resp))
    }

    async fn add_credits(
        &self,
        step: &Step,
        inputs: &OutputMap,
    ) -> Result<OutputMap, EngineError> {
        let req = AddCreditsRequest {
            recipient: resolve_str(step, inputs, "recipient")
                .or_else(|| input_str(inputs, "lite_token_account"))
                .ok_or_else(|| missing(step, "recipient"))?,
            amount: config_u64(step, "amount").ok_or_else(|| missing(step, "amount"))?,
            oracle: step.config.get("oracle").and_then(Value::as_f64),
        };

        let resp = self.api.add_credits(req).await?;
        Ok(tx_outputs(resp))
    }

    async fn create_identity(
        &self,
        step: &Step,
        inputs: &OutputMap,
    ) -> Result<OutputMap, EngineError> {
        let url = resolve_str(step, inputs, "url").ok_or_else(|| missing(step, "url"))?;
        let req = CreateIdentityRequest {
            key_book_url: config_str(step, "key_book_url"),
            key_page_url: config_str(step, "key_page_url"),
            principal: config_str(step, "principal"),
            signer_url: config_str(step, "signer_url"),
            url: url.clone(),
        };

        let resp = self.api.create_identity(req).await?;
        let mut outputs = tx_outputs(resp);
        outputs.insert("identity_url".to_string(), json!(url));
        Ok(outputs)
    }

    async fn create_token_account(
        &self,
        step: &Step,
        inputs: &OutputMap,
    ) -> Result<OutputMap, EngineError> {
        let url = resolve_str(step, inputs, "url").ok_or_else(|| missing(step, "url"))?;
        let req = CreateTokenAccountRequest {
            token_url: config_str(step, "token_url").unwrap_or_else(|| "acc://ACME".to_string()),
            principal: config_str(step, "principal"),
            signer_url: config_str(step, "signer_url"),
            url: url.clone(),
        };

        let resp = self.api.create_token_account(req).await?;
        let mut outputs = tx_outputs(resp);
        outputs.insert("account_url".to_string(), json!(url));
        Ok(outputs)
    }

    async fn send_tokens(
        &self,
        step: &Step,
        inputs: &OutputMap,
    ) -> Result<OutputMap, EngineError> {
        let recipients: Vec<TokenRecipient> = match step.config.get("recipients") {
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                EngineError::StepExecution(format!(
                    "Step {} has malformed recipients: {}",
                    step.id, e
                ))
            })?,
            None => Vec::new(),
        };
        if recipients.is_empty() {
            return Err(missing(step, "recipients"));
        }

        let req = SendTokensRequest {
            principal: resolve_str(step, inputs, "principal")
                .or_else(|| input_str(inputs, "lite_token_account"))
                .ok_or_else(|| missing(step, "principal"))?,
            signer_url: config_str(step, "signer_url"),
            recipients,
        };

        let resp = self.api.send_tokens(req).await?;
        Ok(tx_outputs(resp))
    }

    async fn create_data_account(
        &self,
        step: &Step,
        inputs: &OutputMap,
    ) -> Result<OutputMap, EngineError> {
        let url = resolve_str(step, inputs, "url").ok_or_else(|| missing(step, "url"))?;
        let req = CreateDataAccountRequest {
            principal: config_str(step, "principal"),
            signer_url: config_str(step, "signer_url"),
            url: url.clone(),
        };

        let resp = self.api.create_data_account(req).await?;
        let mut outputs = tx_outputs(resp);
        outputs.insert("account_url".to_string(), json!(url));
        Ok(outputs)
    }

    async fn write_data(
        &self,
        step: &Step,
        inputs: &OutputMap,
    ) -> Result<OutputMap, EngineError> {
        let entries: Vec<String> = match step.config.get("entries") {
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                EngineError::StepExecution(format!(
                    "Step {} has malformed entries: {}",
                    step.id, e
                ))
            })?,
            None => Vec::new(),
        };
        if entries.is_empty() {
            return Err(missing(step, "entries"));
        }

        let req = WriteDataRequest {
            account: resolve_str(step, inputs, "account")
                .or_else(|| input_str(inputs, "account_url"))
                .ok_or_else(|| missing(step, "account"))?,
            principal: config_str(step, "principal"),
            signer_url: config_str(step, "signer_url"),
            entries,
        };

        let resp = self.api.write_data(req).await?;
        Ok(tx_outputs(resp))
    }

    async fn query(&self, step: &Step, inputs: &OutputMap) -> Result<OutputMap, EngineError> {
        let url = resolve_str(step, inputs, "url")
            .or_else(|| input_str(inputs, "lite_token_account"))
            .ok_or_else(|| missing(step, "url"))?;

        let result = self.api.query(&url).await?;
        if !result.success {
            return Err(EngineError::StepExecution(
                result
                    .error
                    .unwrap_or_else(|| "query failed".to_string()),
            ));
        }

        let mut outputs = OutputMap::new();
        outputs.insert("success".to_string(), json!(true));
        outputs.insert("url".to_string(), json!(url));

        // Flattened record fields become addressable outputs.
        let data = result.data.unwrap_or(Value::Null);
        if let Some(fields) = data.as_object() {
            for (key, value) in fields {
                outputs
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }
        outputs.insert("result".to_string(), data);
        Ok(outputs)
    }
}

#[async_trait]
impl StepExecutor for LedgerStepExecutor {
    async fn execute(
        &self,
        step: &Step,
        inputs: OutputMap,
        ctx: &RunContext,
    ) -> Result<OutputMap, EngineError> {
        tracing::debug!(step_id = %step.id, kind = %step.kind, "Dispatching step");

        match step.kind.as_str() {
            kinds::GENERATE_KEYS => self.generate_keys(step).await,
            kinds::FAUCET => self.faucet(step, &inputs, ctx).await,
            kinds::ADD_CREDITS => self.add_credits(step, &inputs).await,
            kinds::CREATE_IDENTITY => self.create_identity(step, &inputs).await,
            kinds::CREATE_TOKEN_ACCOUNT => self.create_token_account(step, &inputs).await,
            kinds::SEND_TOKENS => self.send_tokens(step, &inputs).await,
            kinds::CREATE_DATA_ACCOUNT => self.create_data_account(step, &inputs).await,
            kinds::WRITE_DATA => self.write_data(step, &inputs).await,
            kinds::QUERY => self.query(step, &inputs).await,
            // The engine filters comments out before dispatch.
            COMMENT_KIND => Err(EngineError::StepExecution(format!(
                "Comment step dispatched to executor: {}",
                step.id
            ))),
            other => Err(EngineError::StepExecution(format!(
                "Unknown step kind: {}",
                other
            ))),
        }
    }
}

/// Map a transaction response into an output record.
///
/// Absent optional fields are left out entirely so edge spreads never
/// propagate nulls.
fn tx_outputs(resp: TxResponse) -> OutputMap {
    let mut outputs = OutputMap::new();
    outputs.insert("success".to_string(), json!(resp.success));
    if let Some(tx_hash) = resp.tx_hash {
        outputs.insert(TX_HASH_KEY.to_string(), json!(tx_hash));
    }
    if let Some(simple_hash) = resp.simple_hash {
        outputs.insert("simple_hash".to_string(), json!(simple_hash));
    }
    if let Some(status) = resp.status {
        outputs.insert("status".to_string(), json!(status));
    }
    if let Some(recipient) = resp.recipient {
        outputs.insert("recipient".to_string(), json!(recipient));
    }
    outputs
}

fn config_str(step: &Step, key: &str) -> Option<String> {
    step.config
        .get(key)
        .and_then(Value::as_str)
        .map(String::from)
}

fn config_bool(step: &Step, key: &str) -> Option<bool> {
    step.config.get(key).and_then(Value::as_bool)
}

fn config_u64(step: &Step, key: &str) -> Option<u64> {
    step.config.get(key).and_then(Value::as_u64)
}

fn input_str(inputs: &OutputMap, key: &str) -> Option<String> {
    inputs.get(key).and_then(Value::as_str).map(String::from)
}

/// Configuration takes precedence over gathered inputs for the same key
fn resolve_str(step: &Step, inputs: &OutputMap, key: &str) -> Option<String> {
    config_str(step, key).or_else(|| input_str(inputs, key))
}

fn missing(step: &Step, key: &str) -> EngineError {
    EngineError::StepExecution(format!("Step {} requires '{}'", step.id, key))
}
