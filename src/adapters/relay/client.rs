//! Relay Client
//!
//! Sends one signed transaction through the configured provider and builds
//! the provider fee transfer that has to ride along with it.

use std::str::FromStr;
use std::sync::Arc;

use reqwest::Client;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, system_instruction};

use crate::adapters::auth::AuthSession;
use crate::domain::curve::sol_to_lamports;

use super::config::{fee_accounts, RelayConfig, SendMode};
use super::error::RelayError;
use super::types::{
    AxiomBatchRequest, BlockRazorRequest, JsonRpcResponse, SendOptions, SendTransactionRequest,
};

/// Submission router for signed, base64-encoded transactions
#[derive(Debug, Clone)]
pub struct RelayClient {
    config: RelayConfig,
    http: Client,
    auth: Option<Arc<AuthSession>>,
}

impl RelayClient {
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RelayError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http,
            auth: None,
        })
    }

    /// Attach the session used by the Axiom relay
    pub fn with_auth(mut self, auth: Arc<AuthSession>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn mode(&self) -> SendMode {
        self.config.mode
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Transfer of `fee_sol` to a random account in the mode's fee pool.
    /// `None` in direct mode or when the fee is zero.
    pub fn fee_instruction(
        &self,
        payer: &Pubkey,
        fee_sol: f64,
    ) -> Result<Option<Instruction>, RelayError> {
        let lamports = sol_to_lamports(fee_sol);
        if lamports == 0 {
            return Ok(None);
        }

        let Some(account) = fee_accounts::random_fee_account(self.config.mode) else {
            return Ok(None);
        };
        let recipient = Pubkey::from_str(account)
            .map_err(|e| RelayError::InvalidFeeAccount(format!("{}: {}", account, e)))?;

        Ok(Some(system_instruction::transfer(payer, &recipient, lamports)))
    }

    /// Hand the transaction to the provider. Success means accepted for
    /// forwarding, not landed.
    pub async fn submit(&self, tx_base64: &str) -> Result<(), RelayError> {
        tracing::debug!("Submitting transaction via {}", self.config.mode);

        match self.config.mode {
            SendMode::Direct => {
                let request = SendTransactionRequest::new(
                    tx_base64.to_string(),
                    SendOptions::base64().skip_preflight(),
                );
                self.post_json_rpc(&self.config.rpc_url, &request).await
            }
            SendMode::BlockRazor => self.submit_block_razor(tx_base64).await,
            SendMode::ZeroSlot => {
                let url = self.config.zero_slot_submit_url().ok_or_else(|| {
                    RelayError::MissingCredential("ZEROSLOT_RPC_URL".to_string())
                })?;
                let request = SendTransactionRequest::new(
                    tx_base64.to_string(),
                    SendOptions::base64().skip_preflight(),
                );
                self.post_json_rpc(&url, &request).await
            }
            SendMode::Axiom => self.submit_axiom(tx_base64).await,
            SendMode::Jito => {
                let url = format!("{}/api/v1/transactions", self.config.jito_url);
                let request =
                    SendTransactionRequest::new(tx_base64.to_string(), SendOptions::base64());
                self.post_json_rpc(&url, &request).await
            }
        }
    }

    async fn submit_block_razor(&self, tx_base64: &str) -> Result<(), RelayError> {
        let api_key = self
            .config
            .block_razor_api_key
            .as_deref()
            .ok_or_else(|| RelayError::MissingCredential("BLOCK_RAZOR_AUTHTOKEN".to_string()))?;

        let url = format!("{}/sendTransaction", self.config.block_razor_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", api_key)
            .json(&BlockRazorRequest::fast(tx_base64.to_string()))
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn submit_axiom(&self, tx_base64: &str) -> Result<(), RelayError> {
        let auth = self
            .auth
            .as_ref()
            .ok_or_else(|| RelayError::MissingCredential("AXIOM_REFRESH_TOKEN".to_string()))?;

        let response = self
            .http
            .post(&self.config.axiom_url)
            .header(reqwest::header::COOKIE, auth.cookie_header())
            .json(&AxiomBatchRequest::single(tx_base64.to_string()))
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn post_json_rpc(
        &self,
        url: &str,
        request: &SendTransactionRequest,
    ) -> Result<(), RelayError> {
        let response = self.http.post(url).json(request).send().await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(RelayError::RateLimited);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(RelayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let rpc_response: JsonRpcResponse<String> = serde_json::from_str(&body)?;
        if let Some(error) = rpc_response.error {
            return Err(RelayError::ApiError {
                code: error.code,
                message: error.message,
            });
        }

        Ok(())
    }

    async fn check_status(response: reqwest::Response) -> Result<(), RelayError> {
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(RelayError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Touch the ZeroSlot endpoint so the TLS session stays warm
    pub async fn warm(&self) -> Result<(), RelayError> {
        if self.config.mode != SendMode::ZeroSlot {
            return Ok(());
        }
        let Some(url) = self.config.zero_slot_submit_url() else {
            return Ok(());
        };
        self.http.get(&url).send().await?;
        Ok(())
    }
}
