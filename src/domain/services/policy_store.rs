//! Persistent autobuy policy storage.

use crate::domain::entities::policy::AutobuyPolicy;
use crate::domain::entities::subscription::normalize_identity;
use crate::domain::errors::TradeError;
use crate::persistence::models::PoliciesDoc;
use crate::persistence::JsonStore;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::info;

pub struct PolicyStore {
    doc: Mutex<PoliciesDoc>,
    store: JsonStore<PoliciesDoc>,
}

impl PolicyStore {
    pub async fn load(store: JsonStore<PoliciesDoc>) -> Result<Self, TradeError> {
        let doc = store.load().await?;
        Ok(Self {
            doc: Mutex::new(doc),
            store,
        })
    }

    pub async fn get(&self, owner: u64, trader: &str) -> Option<AutobuyPolicy> {
        self.doc.lock().await.get(owner, trader).cloned()
    }

    pub async fn upsert(&self, policy: AutobuyPolicy) -> Result<(), TradeError> {
        let mut doc = self.doc.lock().await;
        info!(
            owner = policy.owner_user_id,
            trader = %policy.trader_identity,
            "autobuy policy stored"
        );
        doc.upsert(policy);
        self.store.save(&doc).await?;
        Ok(())
    }

    pub async fn set_enabled(
        &self,
        owner: u64,
        trader: &str,
        enabled: bool,
    ) -> Result<(), TradeError> {
        let mut doc = self.doc.lock().await;
        let policy = doc.get_mut(owner, trader).ok_or(TradeError::PolicyNotFound {
            trader: trader.to_string(),
        })?;
        policy.enabled = enabled;
        self.store.save(&doc).await?;
        Ok(())
    }

    /// Bump the daily counter after a swap returned a signature.
    pub async fn record_trade(&self, owner: u64, trader: &str) -> Result<(), TradeError> {
        let mut doc = self.doc.lock().await;
        let policy = doc.get_mut(owner, trader).ok_or(TradeError::PolicyNotFound {
            trader: trader.to_string(),
        })?;
        policy.daily_trade_count += 1;
        self.store.save(&doc).await?;
        Ok(())
    }

    /// Re-open the counting window when the reset boundary has passed.
    pub async fn reset_window(
        &self,
        owner: u64,
        trader: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TradeError> {
        let mut doc = self.doc.lock().await;
        let policy = doc.get_mut(owner, trader).ok_or(TradeError::PolicyNotFound {
            trader: trader.to_string(),
        })?;
        policy.daily_trade_count = 0;
        policy.window_start = now;
        self.store.save(&doc).await?;
        Ok(())
    }

    /// Owners holding a policy on this trader, with their policies.
    pub async fn policies_for_trader(&self, trader: &str) -> Vec<AutobuyPolicy> {
        let trader = normalize_identity(trader);
        let doc = self.doc.lock().await;
        doc.policies
            .values()
            .filter_map(|by_trader| by_trader.get(&trader))
            .cloned()
            .collect()
    }
}
