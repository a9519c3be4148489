//! Error types for the signal and trade pipeline.
//!
//! Classification and market-data lookups degrade locally (`Option`), so the
//! variants here cover only the operations that abort a unit of work: wallet
//! custody, safety gates, and the swap pipeline itself.

use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised by custody, gating, and trade execution.
///
/// Each swap-pipeline stage maps to exactly one variant so a failed trade can
/// be reported with the stage that failed.
#[derive(Debug, Error, Clone)]
pub enum TradeError {
    #[error("Not a recognizable contract address: {0}")]
    InvalidAddress(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No wallet found for user {owner}")]
    WalletNotFound { owner: u64 },

    #[error("Insufficient balance: required {required} lamports, available {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("Cannot delete wallet: {0}")]
    WalletDeleteRefused(String),

    #[error("Slippage {bps} bps outside allowed range {min}..={max}")]
    SlippageOutOfRange { bps: u16, min: u16, max: u16 },

    #[error("Quote request failed: {0}")]
    QuoteFailed(String),

    #[error("Swap transaction build failed: {0}")]
    SwapBuildFailed(String),

    #[error("Transaction rejected by RPC: {0}")]
    TransactionRejected(String),

    /// Non-fatal relative to the trade: the position stands regardless.
    #[error("Fee collection failed: {0}")]
    FeeCollectionFailed(String),

    #[error("Daily trade limit reached ({limit} trades)")]
    DailyLimitExceeded { limit: u32 },

    #[error("Market cap ${observed:.0} exceeds policy ceiling ${cap:.0}")]
    MarketCapExceeded { cap: f64, observed: f64 },

    #[error("Configuration session expired, run /autobuy again")]
    ConfigSessionExpired,

    #[error("Network timeout: {0}")]
    NetworkTimeout(String),

    #[error("Rate limited by upstream service")]
    RateLimited,

    #[error("Policy not found for trader {trader}")]
    PolicyNotFound { trader: String },

    #[error("Autobuy is disabled for trader {trader}")]
    PolicyDisabled { trader: String },

    #[error("Buy amount {amount_sol} SOL exceeds per-trade maximum {max_sol} SOL")]
    AmountExceedsMax { amount_sol: f64, max_sol: f64 },

    #[error("Persistence error: {0}")]
    Store(String),

    #[error("Keystore error: {0}")]
    Keystore(String),

    #[error("Owner worker unavailable: {0}")]
    WorkerUnavailable(String),
}

impl TradeError {
    /// Only transient transport conditions are worth retrying, and only for
    /// idempotent reads. A submit is never retried with the same payload.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TradeError::NetworkTimeout(_) | TradeError::RateLimited
        )
    }

    /// Failures that abort a single (owner, address) unit of work but carry a
    /// message the owner should see.
    pub fn owner_facing(&self) -> bool {
        !matches!(self, TradeError::Store(_) | TradeError::WorkerUnavailable(_))
    }
}

impl<T> From<mpsc::error::SendError<T>> for TradeError {
    fn from(e: mpsc::error::SendError<T>) -> Self {
        TradeError::WorkerUnavailable(e.to_string())
    }
}

/// Errors from the JSON document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed document {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<StoreError> for TradeError {
    fn from(e: StoreError) -> Self {
        TradeError::Store(e.to_string())
    }
}

/// Errors from sealing/unsealing wallet secrets.
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("Wallet encryption key is not configured; set MINTWATCH_WALLET_KEY")]
    KeyMissing,

    #[error("Wallet encryption key is malformed: {0}")]
    KeyMalformed(String),

    #[error("Ciphertext too short to contain a nonce")]
    CiphertextTruncated,

    #[error("Encryption failed")]
    SealFailed,

    #[error("Decryption failed; the sealed secret does not match this key")]
    DecryptFailed,

    #[error("Sealed secret is not valid hex: {0}")]
    Encoding(String),
}

impl From<KeystoreError> for TradeError {
    fn from(e: KeystoreError) -> Self {
        TradeError::Keystore(e.to_string())
    }
}
