//! Swap aggregator HTTP client (Jupiter-style quote/swap API).

use crate::domain::errors::TradeError;
use crate::domain::repositories::gateways::{SwapAggregator, SwapQuote};
use crate::infrastructure::retry::{with_backoff, RetryPolicy};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://quote-api.jup.ag/v6";

pub struct JupiterClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl JupiterClient {
    pub fn new(base_url: Option<String>, retry: RetryPolicy) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            retry,
        }
    }

    async fn fetch_quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount_lamports: u64,
        slippage_bps: u16,
    ) -> Result<SwapQuote, TradeError> {
        let url = format!(
            "{}/quote?inputMint={}&outputMint={}&amount={}&slippageBps={}",
            self.base_url, input_mint, output_mint, amount_lamports, slippage_bps
        );
        let response = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                TradeError::NetworkTimeout(url.clone())
            } else {
                TradeError::QuoteFailed(e.to_string())
            }
        })?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TradeError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(TradeError::QuoteFailed(format!(
                "quote HTTP {}",
                response.status()
            )));
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TradeError::QuoteFailed(e.to_string()))?;
        parse_quote(raw)
    }
}

fn amount_field(raw: &serde_json::Value, field: &str) -> Option<u64> {
    match &raw[field] {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn parse_quote(raw: serde_json::Value) -> Result<SwapQuote, TradeError> {
    let in_amount = amount_field(&raw, "inAmount")
        .ok_or_else(|| TradeError::QuoteFailed("quote missing inAmount".to_string()))?;
    let out_amount = amount_field(&raw, "outAmount")
        .ok_or_else(|| TradeError::QuoteFailed("quote missing outAmount".to_string()))?;
    Ok(SwapQuote {
        in_amount,
        out_amount,
        raw,
    })
}

#[async_trait]
impl SwapAggregator for JupiterClient {
    async fn quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount_lamports: u64,
        slippage_bps: u16,
    ) -> Result<SwapQuote, TradeError> {
        // Quotes are read-only, safe to retry on transient failures.
        with_backoff(&self.retry, "aggregator_quote", || {
            self.fetch_quote(input_mint, output_mint, amount_lamports, slippage_bps)
        })
        .await
    }

    async fn build_swap(
        &self,
        quote: &SwapQuote,
        user_pubkey: &str,
    ) -> Result<Vec<u8>, TradeError> {
        let url = format!("{}/swap", self.base_url);
        let body = json!({
            "quoteResponse": quote.raw,
            "userPublicKey": user_pubkey,
            "wrapAndUnwrapSol": true,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TradeError::SwapBuildFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TradeError::SwapBuildFailed(format!(
                "swap build HTTP {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TradeError::SwapBuildFailed(e.to_string()))?;
        let encoded = payload["swapTransaction"]
            .as_str()
            .ok_or_else(|| TradeError::SwapBuildFailed("missing swapTransaction".to_string()))?;

        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| TradeError::SwapBuildFailed(format!("bad transaction encoding: {e}")))?;
        debug!(tx_bytes = bytes.len(), "swap transaction built");
        Ok(bytes)
    }
}
