//! Persistent subscription tracking.

use crate::domain::entities::subscription::normalize_identity;
use crate::domain::errors::TradeError;
use crate::persistence::models::SubscriptionsDoc;
use crate::persistence::JsonStore;
use std::collections::BTreeSet;
use tokio::sync::Mutex;
use tracing::info;

pub struct SubscriptionTracker {
    doc: Mutex<SubscriptionsDoc>,
    store: JsonStore<SubscriptionsDoc>,
}

impl SubscriptionTracker {
    pub async fn load(store: JsonStore<SubscriptionsDoc>) -> Result<Self, TradeError> {
        let doc = store.load().await?;
        Ok(Self {
            doc: Mutex::new(doc),
            store,
        })
    }

    pub async fn track(
        &self,
        group_id: i64,
        identity: &str,
        watcher: u64,
    ) -> Result<(), TradeError> {
        let mut doc = self.doc.lock().await;
        doc.track(group_id, identity, watcher);
        self.store.save(&doc).await?;
        info!(group_id, identity = %normalize_identity(identity), watcher, "tracking");
        Ok(())
    }

    /// Returns whether the watcher was actually subscribed.
    pub async fn untrack(
        &self,
        group_id: i64,
        identity: &str,
        watcher: u64,
    ) -> Result<bool, TradeError> {
        let mut doc = self.doc.lock().await;
        let removed = doc.untrack(group_id, identity, watcher);
        if removed {
            self.store.save(&doc).await?;
        }
        Ok(removed)
    }

    pub async fn watchers_of(&self, group_id: i64, identity: &str) -> BTreeSet<u64> {
        let doc = self.doc.lock().await;
        doc.watchers_of(group_id, identity)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn tracked_in_group(&self, group_id: i64) -> Vec<String> {
        let doc = self.doc.lock().await;
        doc.tracked_in_group(group_id)
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}
