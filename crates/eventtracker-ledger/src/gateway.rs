//! HTTP ledger gateway client.
//!
//! Opening a session validates the configuration, loads the connection
//! profile, bootstraps the admin identity into the wallet and probes the
//! gateway's channel endpoint. Transactions are then posted as JSON:
//!
//! - `POST {gateway}/channels/{channel}/chaincodes/{chaincode}/transactions` (submit)
//! - `POST {gateway}/channels/{channel}/chaincodes/{chaincode}/evaluate` (evaluate)
//!
//! with body `{function, args, identity: {label, mspId, certificate}}` and
//! response `{txId, result}`. The private key never leaves the wallet.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use eventtracker_core::error::DomainError;
use eventtracker_core::ledger::{LedgerConnector, LedgerSession, TransactionResult};

use crate::config::{ADMIN_LABEL, LedgerConfig};
use crate::connection_profile::ConnectionProfile;
use crate::wallet::{FileSystemWallet, bootstrap_identity};

/// Identity fields sent with every request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GatewayIdentity {
    label: String,
    msp_id: String,
    certificate: String,
}

#[derive(Debug, Serialize)]
struct TransactionRequest<'a> {
    function: &'a str,
    args: &'a [String],
    identity: &'a GatewayIdentity,
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    #[serde(rename = "txId", default)]
    tx_id: Option<String>,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    error: String,
}

/// Connector for a ledger reached through an HTTP gateway.
#[derive(Debug, Clone)]
pub struct RestGateway {
    config: LedgerConfig,
    client: reqwest::Client,
}

impl RestGateway {
    /// Creates a connector. No network traffic happens until `connect`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Config` if the configuration is incomplete or
    /// has no gateway URL.
    pub fn new(config: LedgerConfig) -> Result<Self, DomainError> {
        config.validate()?;
        if config.gateway_url.as_deref().is_none_or(str::is_empty) {
            return Err(DomainError::Config("LEDGER_GATEWAY_URL is not defined".into()));
        }
        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }

    fn gateway_url(&self) -> &str {
        self.config
            .gateway_url
            .as_deref()
            .unwrap_or_default()
            .trim_end_matches('/')
    }
}

/// Loads the profile and the admin identity. Blocking file I/O.
fn load_identity(config: &LedgerConfig) -> Result<GatewayIdentity, DomainError> {
    let profile = ConnectionProfile::load(&config.connection_profile_path)
        .map_err(|e| DomainError::Connection(e.to_string()))?;
    profile
        .require_channel(&config.channel_name)
        .map_err(|e| DomainError::Connection(e.to_string()))?;
    debug!(
        network = profile.name.as_deref().unwrap_or("unnamed"),
        peers = ?profile.peer_urls(),
        "connection profile loaded"
    );

    let wallet = FileSystemWallet::open(&config.wallet_path)
        .map_err(|e| DomainError::Connection(e.to_string()))?;
    let identity = bootstrap_identity(
        &wallet,
        ADMIN_LABEL,
        &config.admin_credential_path,
        &config.msp_id,
    )
    .map_err(|e| DomainError::Connection(format!("failed to load identity: {e}")))?;

    Ok(GatewayIdentity {
        label: ADMIN_LABEL.to_owned(),
        msp_id: identity.msp_id,
        certificate: identity.credentials.certificate,
    })
}

#[async_trait]
impl LedgerConnector for RestGateway {
    async fn connect(&self) -> Result<Box<dyn LedgerSession>, DomainError> {
        let config = self.config.clone();
        let identity = tokio::task::spawn_blocking(move || load_identity(&config))
            .await
            .map_err(|e| DomainError::Connection(format!("identity loading aborted: {e}")))??;

        let channel_url = format!("{}/channels/{}", self.gateway_url(), self.config.channel_name);
        let probe = self
            .client
            .get(&channel_url)
            .send()
            .await
            .map_err(|e| DomainError::Connection(format!("Failed to connect to gateway: {e}")))?;
        if !probe.status().is_success() {
            return Err(DomainError::Connection(format!(
                "Unable to access channel {}: gateway returned {}",
                self.config.channel_name,
                probe.status()
            )));
        }

        info!(
            channel = %self.config.channel_name,
            chaincode = %self.config.chaincode_name,
            "gateway session opened"
        );

        Ok(Box::new(RestSession {
            client: self.client.clone(),
            contract_url: format!("{channel_url}/chaincodes/{}", self.config.chaincode_name),
            identity,
            closed: AtomicBool::new(false),
        }))
    }
}

/// A session bound to one contract through the gateway.
#[derive(Debug)]
pub struct RestSession {
    client: reqwest::Client,
    contract_url: String,
    identity: GatewayIdentity,
    closed: AtomicBool,
}

impl RestSession {
    async fn post(
        &self,
        endpoint: &str,
        function: &str,
        args: &[String],
    ) -> Result<TransactionResponse, DomainError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DomainError::Connection("session is closed".into()));
        }

        let response = self
            .client
            .post(format!("{}/{endpoint}", self.contract_url))
            .json(&TransactionRequest {
                function,
                args,
                identity: &self.identity,
            })
            .send()
            .await
            .map_err(|e| DomainError::Connection(format!("gateway request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            let message = serde_json::from_str::<GatewayErrorBody>(&text)
                .map_or(text, |body| body.error);
            return Err(if status == StatusCode::NOT_FOUND {
                DomainError::NotFound(message)
            } else {
                DomainError::Ledger(format!("{function} failed with {status}: {message}"))
            });
        }

        response
            .json()
            .await
            .map_err(|e| DomainError::Ledger(format!("invalid gateway response: {e}")))
    }
}

/// Contract results arrive as JSON; plain-text results are passed through as
/// their raw text.
fn result_bytes(result: &serde_json::Value) -> Result<Vec<u8>, DomainError> {
    match result {
        serde_json::Value::String(text) => Ok(text.clone().into_bytes()),
        other => serde_json::to_vec(other)
            .map_err(|e| DomainError::Ledger(format!("cannot encode result: {e}"))),
    }
}

#[async_trait]
impl LedgerSession for RestSession {
    async fn submit(
        &self,
        tx_name: &str,
        args: &[String],
    ) -> Result<TransactionResult, DomainError> {
        let response = self.post("transactions", tx_name, args).await?;
        debug!(tx_name, tx_id = ?response.tx_id, "transaction committed");
        Ok(TransactionResult {
            tx_id: response.tx_id,
            payload: result_bytes(&response.result)?,
        })
    }

    async fn evaluate(&self, tx_name: &str, args: &[String]) -> Result<Vec<u8>, DomainError> {
        let response = self.post("evaluate", tx_name, args).await?;
        result_bytes(&response.result)
    }

    fn close(&mut self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            warn!("gateway session closed twice");
        }
    }
}
