//! Autobuy configuration sessions.
//!
//! The wizard is an explicit finite-state machine: a session holds the draft
//! policy plus which field the next free-text reply populates, and carries a
//! TTL. One session per owner; starting a new one replaces the old silently.

use crate::domain::entities::policy::{AutobuyPolicy, AwaitingField, ConfigSession};
use crate::domain::errors::TradeError;
use crate::domain::services::limits::TradeLimits;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

pub struct SessionStore {
    sessions: Mutex<HashMap<u64, ConfigSession>>,
    ttl: Duration,
    limits: TradeLimits,
}

impl SessionStore {
    pub fn new(ttl: Duration, limits: TradeLimits) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            limits,
        }
    }

    /// Start (or silently replace) the owner's session.
    pub async fn begin(&self, owner: u64, trader: &str) -> ConfigSession {
        let session = ConfigSession::new(owner, trader, &AutobuyPolicy::defaults());
        let mut sessions = self.sessions.lock().await;
        if sessions.insert(owner, session.clone()).is_some() {
            debug!(owner, trader, "existing config session replaced");
        }
        session
    }

    /// Mark which field the next free-text reply should populate.
    pub async fn await_field(&self, owner: u64, field: AwaitingField) -> Result<(), TradeError> {
        self.with_live_session(owner, Utc::now(), |s| {
            s.awaiting = Some(field);
            Ok(())
        })
        .await
    }

    /// Apply a quick-pick value to a named field.
    pub async fn set_field(
        &self,
        owner: u64,
        field: AwaitingField,
        value: f64,
    ) -> Result<(), TradeError> {
        let limits = self.limits.clone();
        self.with_live_session(owner, Utc::now(), move |s| {
            apply_field(&limits, &mut s.draft, field, value)?;
            s.awaiting = None;
            Ok(())
        })
        .await
    }

    /// Interpret a free-text reply against the awaited field. Replies while
    /// nothing is awaited are ignored (`Ok(None)`).
    pub async fn handle_free_text(
        &self,
        owner: u64,
        text: &str,
    ) -> Result<Option<AwaitingField>, TradeError> {
        let limits = self.limits.clone();
        let text = text.trim().to_string();
        self.with_live_session(owner, Utc::now(), move |s| {
            let Some(field) = s.awaiting else {
                return Ok(None);
            };
            let value: f64 = text
                .parse()
                .map_err(|_| TradeError::InvalidInput(format!("not a number: {text}")))?;
            apply_field(&limits, &mut s.draft, field, value)?;
            s.awaiting = None;
            Ok(Some(field))
        })
        .await
    }

    /// Validate the draft and hand it over for storage; the session is gone
    /// afterwards either way the caller persists it.
    pub async fn confirm(&self, owner: u64) -> Result<AutobuyPolicy, TradeError> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .remove(&owner)
            .ok_or(TradeError::ConfigSessionExpired)?;
        if session.is_expired(self.ttl, now) {
            return Err(TradeError::ConfigSessionExpired);
        }
        // An invalid draft keeps the session alive for correction.
        if let Err(e) = self.limits.check_policy(&session.draft) {
            sessions.insert(owner, session);
            return Err(e);
        }
        let mut policy = session.draft;
        policy.enabled = true;
        policy.daily_trade_count = 0;
        policy.window_start = now;
        Ok(policy)
    }

    /// Discard without writing. Returns whether a session existed.
    pub async fn cancel(&self, owner: u64) -> bool {
        self.sessions.lock().await.remove(&owner).is_some()
    }

    async fn with_live_session<T>(
        &self,
        owner: u64,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut ConfigSession) -> Result<T, TradeError>,
    ) -> Result<T, TradeError> {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(&owner) else {
            return Err(TradeError::ConfigSessionExpired);
        };
        if session.is_expired(self.ttl, now) {
            sessions.remove(&owner);
            return Err(TradeError::ConfigSessionExpired);
        }
        f(session)
    }
}

fn apply_field(
    limits: &TradeLimits,
    draft: &mut AutobuyPolicy,
    field: AwaitingField,
    value: f64,
) -> Result<(), TradeError> {
    match field {
        AwaitingField::BuyAmount => {
            limits.check_buy_amount(value)?;
            draft.buy_amount_sol = value;
        }
        AwaitingField::MaxMarketCap => {
            if !value.is_finite() || value <= 0.0 {
                return Err(TradeError::InvalidInput(format!(
                    "market cap must be positive, got {value}"
                )));
            }
            draft.max_market_cap_usd = value;
        }
        AwaitingField::StopLossPct => draft.stop_loss_pct = value,
        AwaitingField::TakeProfitPct => draft.take_profit_pct = value,
        AwaitingField::SlippageBps => {
            let bps = value as u16;
            limits.check_slippage(bps)?;
            draft.slippage_bps = bps;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Duration::minutes(10), TradeLimits::default())
    }

    #[tokio::test]
    async fn quick_pick_then_confirm_stores_enabled_policy() {
        let s = store();
        s.begin(1, "trader1").await;
        s.set_field(1, AwaitingField::BuyAmount, 0.5).await.unwrap();
        // Default 100000 cap accepted as-is.
        let policy = s.confirm(1).await.unwrap();
        assert_eq!(policy.trader_identity, "trader1");
        assert_eq!(policy.buy_amount_sol, 0.5);
        assert_eq!(policy.max_market_cap_usd, 100_000.0);
        assert!(policy.enabled);
        assert_eq!(policy.daily_trade_count, 0);

        // Session is gone after confirm.
        assert!(matches!(
            s.confirm(1).await,
            Err(TradeError::ConfigSessionExpired)
        ));
    }

    #[tokio::test]
    async fn begin_normalizes_trader_identity() {
        // Users type the raw "@" form; the confirmed policy must carry the
        // same normalized identity the pipeline looks up by.
        let s = store();
        s.begin(1, "@Trader1").await;
        let policy = s.confirm(1).await.unwrap();
        assert_eq!(policy.trader_identity, "trader1");
    }

    #[tokio::test]
    async fn free_text_populates_awaited_field() {
        let s = store();
        s.begin(1, "trader1").await;
        s.await_field(1, AwaitingField::MaxMarketCap).await.unwrap();
        let filled = s.handle_free_text(1, " 250000 ").await.unwrap();
        assert_eq!(filled, Some(AwaitingField::MaxMarketCap));
        let policy = s.confirm(1).await.unwrap();
        assert_eq!(policy.max_market_cap_usd, 250_000.0);
    }

    #[tokio::test]
    async fn free_text_without_awaited_field_is_ignored() {
        let s = store();
        s.begin(1, "trader1").await;
        assert_eq!(s.handle_free_text(1, "0.7").await.unwrap(), None);
    }

    #[tokio::test]
    async fn second_begin_replaces_first_silently() {
        let s = store();
        s.begin(1, "trader1").await;
        s.set_field(1, AwaitingField::BuyAmount, 2.0).await.unwrap();
        s.begin(1, "trader2").await;
        let policy = s.confirm(1).await.unwrap();
        assert_eq!(policy.trader_identity, "trader2");
        // Draft reset to defaults with the replacement.
        assert_eq!(policy.buy_amount_sol, AutobuyPolicy::defaults().buy_amount_sol);
    }

    #[tokio::test]
    async fn cancel_discards_without_writing() {
        let s = store();
        s.begin(1, "trader1").await;
        assert!(s.cancel(1).await);
        assert!(!s.cancel(1).await);
        assert!(matches!(
            s.confirm(1).await,
            Err(TradeError::ConfigSessionExpired)
        ));
    }

    #[tokio::test]
    async fn out_of_bounds_values_rejected() {
        let s = store();
        s.begin(1, "trader1").await;
        assert!(s
            .set_field(1, AwaitingField::BuyAmount, 50.0)
            .await
            .is_err());
        assert!(s
            .set_field(1, AwaitingField::SlippageBps, 9.0)
            .await
            .is_err());
        // Draft still confirms with defaults intact.
        assert!(s.confirm(1).await.is_ok());
    }

    #[tokio::test]
    async fn missing_session_reports_expired() {
        let s = store();
        assert!(matches!(
            s.handle_free_text(5, "1").await,
            Err(TradeError::ConfigSessionExpired)
        ));
    }
}
