//! Gateway traits for everything that crosses the network boundary.
//!
//! The swap engine, fee collector, and pipeline depend on these traits
//! rather than concrete HTTP clients, which keeps the trade path mockable:
//! every testable property about gating and counters is exercised against
//! in-memory implementations.

use crate::domain::chain::Chain;
use crate::domain::errors::TradeError;
use async_trait::async_trait;
use solana_sdk::signature::Keypair;
use solana_sdk::transaction::VersionedTransaction;

/// An aggregator's proposed exchange for a prospective swap. `raw` is the
/// aggregator's own quote object, passed back verbatim when building the
/// swap transaction.
#[derive(Debug, Clone)]
pub struct SwapQuote {
    pub in_amount: u64,
    pub out_amount: u64,
    pub raw: serde_json::Value,
}

/// Swap aggregator: quote then build an unsigned transaction.
#[async_trait]
pub trait SwapAggregator: Send + Sync {
    async fn quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount_lamports: u64,
        slippage_bps: u16,
    ) -> Result<SwapQuote, TradeError>;

    /// Returns the serialized unsigned transaction bytes for the quote,
    /// built for `user_pubkey` with native-asset wrap/unwrap requested.
    async fn build_swap(&self, quote: &SwapQuote, user_pubkey: &str)
        -> Result<Vec<u8>, TradeError>;
}

/// Blockchain RPC surface the engine needs.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn get_balance(&self, address: &str) -> Result<u64, TradeError>;

    /// Submit a signed transaction; preflight enabled, confirmed commitment.
    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<String, TradeError>;

    /// Build, sign, and submit a plain system transfer. Used by the fee
    /// collector; the implementation fetches the blockhash itself.
    async fn transfer(
        &self,
        from: &Keypair,
        to_address: &str,
        lamports: u64,
    ) -> Result<String, TradeError>;
}

/// Market data for one token, from the first listed trading pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSnapshot {
    pub name: String,
    pub symbol: String,
    /// Raw number used for gating decisions; `None` when the pair carries
    /// neither a market cap nor an FDV.
    pub market_cap_usd: Option<f64>,
    /// Human-readable scale, e.g. "$1.50M".
    pub market_cap_display: String,
    pub price_usd: f64,
    pub logo_url: Option<String>,
    pub chart_url: String,
}

/// Market data lookup. Soft-failing by design: `None` means "no data" and
/// the pipeline keeps delivering the bare address.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn token_snapshot(&self, chain: Chain, address: &str) -> Option<TokenSnapshot>;
}

/// Outbound notification sink. May rate-limit; callers go through the
/// retrying wrapper in the infrastructure layer.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, user_id: u64, text: &str) -> Result<(), TradeError>;
    async fn send_photo(
        &self,
        user_id: u64,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), TradeError>;
}
