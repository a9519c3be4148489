//! Market data resolution against a DexScreener-style token API.
//!
//! `GET {base}/tokens/{address}` returns the trading pairs for a token. The
//! resolver takes the first listed pair, an approximation of "most liquid",
//! and degrades to `None` on any failure so the pipeline still delivers the
//! bare address.

use crate::domain::chain::Chain;
use crate::domain::errors::TradeError;
use crate::domain::repositories::gateways::{MarketDataSource, TokenSnapshot};
use crate::infrastructure::retry::{with_backoff, RetryPolicy};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.dexscreener.com/latest/dex";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DexScreenerClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    pairs: Option<Vec<PairInfo>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairInfo {
    pair_address: String,
    base_token: BaseToken,
    #[serde(default)]
    price_usd: Option<String>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    fdv: Option<f64>,
    #[serde(default)]
    info: Option<PairExtra>,
}

#[derive(Debug, Deserialize)]
struct BaseToken {
    name: String,
    symbol: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairExtra {
    #[serde(default)]
    image_url: Option<String>,
}

impl DexScreenerClient {
    pub fn new(base_url: Option<String>, retry: RetryPolicy) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            retry,
        }
    }

    async fn fetch_pairs(&self, address: &str) -> Result<Vec<PairInfo>, TradeError> {
        let url = format!("{}/tokens/{}", self.base_url, address);
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
                "market data HTTP {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| TradeError::QuoteFailed(e.to_string()))?;
        Ok(body.pairs.unwrap_or_default())
    }
}

#[async_trait]
impl MarketDataSource for DexScreenerClient {
    async fn token_snapshot(&self, chain: Chain, address: &str) -> Option<TokenSnapshot> {
        let pairs = match with_backoff(&self.retry, "market_data", || self.fetch_pairs(address))
            .await
        {
            Ok(pairs) => pairs,
            Err(e) => {
                warn!(address, error = %e, "market data lookup failed, continuing without");
                return None;
            }
        };

        // First listed pair, not necessarily the most liquid one.
        let pair = pairs.into_iter().next()?;
        debug!(address, "market data resolved");
        Some(build_snapshot(chain, pair))
    }
}

/// Assemble a snapshot from one pair. A missing market cap (and FDV) does
/// not discard the rest of the enrichment; it only disables cap gating.
fn build_snapshot(chain: Chain, pair: PairInfo) -> TokenSnapshot {
    let market_cap = pair.market_cap.or(pair.fdv);
    let price_usd = pair
        .price_usd
        .as_deref()
        .and_then(|p| p.parse::<f64>().ok())
        .unwrap_or(0.0);

    TokenSnapshot {
        name: pair.base_token.name,
        symbol: pair.base_token.symbol,
        market_cap_usd: market_cap,
        market_cap_display: market_cap
            .map(format_market_cap)
            .unwrap_or_else(|| "Unknown".to_string()),
        price_usd,
        logo_url: pair.info.and_then(|i| i.image_url),
        chart_url: chart_url(chain, &pair.pair_address),
    }
}

pub fn chart_url(chain: Chain, pair_address: &str) -> String {
    format!("https://dexscreener.com/{}/{}", chain.tag(), pair_address)
}

/// Human-readable market cap: millions and thousands get a suffix, anything
/// smaller stays a raw two-decimal dollar amount.
pub fn format_market_cap(cap: f64) -> String {
    if cap >= 1_000_000.0 {
        format!("${:.2}M", cap / 1_000_000.0)
    } else if cap >= 1_000.0 {
        format!("${:.2}K", cap / 1_000.0)
    } else {
        format!("${:.2}", cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_cap_scales() {
        assert_eq!(format_market_cap(2_500_000.0), "$2.50M");
        assert_eq!(format_market_cap(1_000_000.0), "$1.00M");
        assert_eq!(format_market_cap(150_000.0), "$150.00K");
        assert_eq!(format_market_cap(1_000.0), "$1.00K");
        assert_eq!(format_market_cap(999.99), "$999.99");
        assert_eq!(format_market_cap(0.0), "$0.00");
    }

    #[test]
    fn chart_url_uses_chain_tag_and_pair() {
        assert_eq!(
            chart_url(Chain::Solana, "PAIRADDR"),
            "https://dexscreener.com/solana/PAIRADDR"
        );
        assert_eq!(
            chart_url(Chain::Evm, "0xabc"),
            "https://dexscreener.com/ethereum/0xabc"
        );
    }

    #[test]
    fn pair_parsing_tolerates_missing_fields() {
        let body: TokenResponse = serde_json::from_str(
            r#"{"pairs":[{"pairAddress":"p1","baseToken":{"name":"Token","symbol":"TKN"},"priceUsd":"0.001","marketCap":150000.0}]}"#,
        )
        .unwrap();
        let pair = &body.pairs.unwrap()[0];
        assert_eq!(pair.base_token.symbol, "TKN");
        assert_eq!(pair.market_cap, Some(150000.0));
        assert!(pair.info.is_none());

        let empty: TokenResponse = serde_json::from_str(r#"{"pairs":null}"#).unwrap();
        assert!(empty.pairs.is_none());
    }

    #[test]
    fn pair_without_cap_still_yields_snapshot() {
        let body: TokenResponse = serde_json::from_str(
            r#"{"pairs":[{"pairAddress":"p1","baseToken":{"name":"Token","symbol":"TKN"},"priceUsd":"0.001"}]}"#,
        )
        .unwrap();
        let pair = body.pairs.unwrap().into_iter().next().unwrap();
        let snapshot = build_snapshot(Chain::Solana, pair);
        assert_eq!(snapshot.symbol, "TKN");
        assert_eq!(snapshot.market_cap_usd, None);
        assert_eq!(snapshot.market_cap_display, "Unknown");
        assert_eq!(snapshot.price_usd, 0.001);
    }

    #[test]
    fn fdv_backs_up_missing_market_cap() {
        let body: TokenResponse = serde_json::from_str(
            r#"{"pairs":[{"pairAddress":"p1","baseToken":{"name":"Token","symbol":"TKN"},"fdv":2500000.0}]}"#,
        )
        .unwrap();
        let pair = body.pairs.unwrap().into_iter().next().unwrap();
        let snapshot = build_snapshot(Chain::Solana, pair);
        assert_eq!(snapshot.market_cap_usd, Some(2_500_000.0));
        assert_eq!(snapshot.market_cap_display, "$2.50M");
    }
}
