//! Autobuy policy and the configuration session that produces it.

use crate::domain::entities::subscription::normalize_identity;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Per (owner, trader) autobuy configuration.
///
/// `daily_trade_count` and `window_start` belong to the engine: the count is
/// bumped only after a swap returned a signature, and the window boundary is
/// interpreted by the configured reset policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutobuyPolicy {
    pub owner_user_id: u64,
    pub trader_identity: String,
    pub buy_amount_sol: f64,
    pub max_market_cap_usd: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub slippage_bps: u16,
    pub enabled: bool,
    #[serde(default)]
    pub daily_trade_count: u32,
    #[serde(default = "Utc::now")]
    pub window_start: DateTime<Utc>,
}

/// Which setting the next free-text input should populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AwaitingField {
    BuyAmount,
    MaxMarketCap,
    StopLossPct,
    TakeProfitPct,
    SlippageBps,
}

/// Ephemeral configuration wizard state. One per owner; a second /autobuy
/// silently replaces the first.
#[derive(Debug, Clone)]
pub struct ConfigSession {
    pub owner_user_id: u64,
    pub draft: AutobuyPolicy,
    pub awaiting: Option<AwaitingField>,
    pub created_at: DateTime<Utc>,
}

impl ConfigSession {
    pub fn new(owner_user_id: u64, trader: &str, defaults: &AutobuyPolicy) -> Self {
        let mut draft = defaults.clone();
        draft.owner_user_id = owner_user_id;
        // Same normalization as the subscription book: the pipeline looks
        // policies up by normalized sender identity, so a policy keyed by
        // the raw "@Trader1" form would never fire.
        draft.trader_identity = normalize_identity(trader);
        Self {
            owner_user_id,
            draft,
            awaiting: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at > ttl
    }
}

impl AutobuyPolicy {
    /// Template for new config sessions; the session overwrites owner/trader.
    pub fn defaults() -> Self {
        Self {
            owner_user_id: 0,
            trader_identity: String::new(),
            buy_amount_sol: 0.1,
            max_market_cap_usd: 100_000.0,
            stop_loss_pct: 50.0,
            take_profit_pct: 100.0,
            slippage_bps: 300,
            enabled: true,
            daily_trade_count: 0,
            window_start: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_expiry_boundary() {
        let s = ConfigSession::new(1, "caller", &AutobuyPolicy::defaults());
        let ttl = Duration::minutes(10);
        assert!(!s.is_expired(ttl, s.created_at + Duration::minutes(9)));
        assert!(s.is_expired(ttl, s.created_at + Duration::minutes(11)));
    }

    #[test]
    fn session_draft_takes_owner_and_trader() {
        let s = ConfigSession::new(42, "@Alpha", &AutobuyPolicy::defaults());
        assert_eq!(s.draft.owner_user_id, 42);
        assert_eq!(s.draft.trader_identity, "@Alpha");
        assert!(s.draft.enabled);
        assert_eq!(s.draft.daily_trade_count, 0);
    }
}
