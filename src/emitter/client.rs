//! Realtime Client
//!
//! HTTP delivery of ledger events to the realtime service, with per-attempt
//! timeout and bounded exponential backoff between attempts.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::event::{BALANCE_PATH, BalancePayload, LedgerEvent, TRANSACTION_PATH, TransactionPayload};
use super::retry::{Disposition, RetryPolicy};
use crate::config::RealtimeConfig;
use crate::ledger::Entry;

pub const INTERNAL_KEY_HEADER: &str = "x-internal-key";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(&'static str),

    /// 4xx other than 429; never retried
    #[error("Rejected by realtime service ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// 429 or 5xx on the final attempt
    #[error("Realtime service unavailable ({status}) after {attempts} attempts: {body}")]
    Unavailable {
        status: u16,
        body: String,
        attempts: u32,
    },

    /// Connection failure or timeout on the final attempt
    #[error("Transport error after {attempts} attempts: {message}")]
    Transport { message: String, attempts: u32 },

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Successful delivery summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub status: u16,
    pub attempts: u32,
}

/// Anything that can carry a ledger event downstream
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn deliver(&self, event: &LedgerEvent) -> Result<Delivery, EmitError>;
}

/// reqwest-based client for the realtime service
pub struct RealtimeClient {
    http: reqwest::Client,
    base_url: String,
    internal_key: String,
    policy: RetryPolicy,
}

impl RealtimeClient {
    pub fn new(config: &RealtimeConfig) -> Result<Self, EmitError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EmitError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            internal_key: config.internal_key.clone(),
            policy: config.retry_policy(),
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Announce a new entry to its user
    pub async fn emit_transaction(
        &self,
        user_id: &str,
        transaction: &Entry,
    ) -> Result<Delivery, EmitError> {
        if user_id.is_empty() {
            return Err(EmitError::InvalidPayload("userId and transaction required"));
        }
        let body = TransactionPayload {
            user_id,
            transaction,
        };
        self.post_with_retries(TRANSACTION_PATH, &body).await
    }

    /// Announce an account's new balance
    pub async fn emit_balance(
        &self,
        account_id: &str,
        balance: Decimal,
    ) -> Result<Delivery, EmitError> {
        if account_id.is_empty() {
            return Err(EmitError::InvalidPayload("accountId and balance required"));
        }
        let body = BalancePayload {
            account_id,
            balance,
        };
        self.post_with_retries(BALANCE_PATH, &body).await
    }

    async fn post_with_retries<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Delivery, EmitError> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0u32;

        loop {
            let attempts = attempt + 1;
            let result = self
                .http
                .post(&url)
                .header(INTERNAL_KEY_HEADER, &self.internal_key)
                .json(body)
                .send()
                .await;

            let failure = match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    match RetryPolicy::classify(status) {
                        Disposition::Delivered => {
                            debug!(path, status, attempts, "Realtime event delivered");
                            return Ok(Delivery { status, attempts });
                        }
                        Disposition::Terminal => {
                            let body = resp.text().await.unwrap_or_default();
                            return Err(EmitError::Rejected { status, body });
                        }
                        Disposition::Retry => EmitError::Unavailable {
                            status,
                            body: resp.text().await.unwrap_or_default(),
                            attempts,
                        },
                    }
                }
                Err(e) => EmitError::Transport {
                    message: e.to_string(),
                    attempts,
                },
            };

            if !self.policy.has_next(attempt) {
                return Err(failure);
            }

            let wait = self.policy.backoff(attempt);
            warn!(
                path,
                attempt = attempts,
                backoff_ms = wait.as_millis() as u64,
                error = %failure,
                "Realtime delivery failed, retrying"
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl EventTransport for RealtimeClient {
    async fn deliver(&self, event: &LedgerEvent) -> Result<Delivery, EmitError> {
        match event {
            LedgerEvent::Transaction {
                user_id,
                transaction,
            } => self.emit_transaction(user_id, transaction).await,
            LedgerEvent::Balance {
                account_id,
                balance,
            } => self.emit_balance(account_id, *balance).await,
        }
    }
}
