//! The signal pipeline: inbound message to notifications and autobuys.
//!
//! Classification and market data degrade locally; a failure for one
//! (owner, address) pair never affects the others.

use crate::domain::chain::{extract_addresses, DetectedAddress};
use crate::domain::entities::subscription::normalize_identity;
use crate::domain::repositories::gateways::{MarketDataSource, Notifier, TokenSnapshot};
use crate::domain::services::policy_store::PolicyStore;
use crate::domain::services::tracker::SubscriptionTracker;
use crate::application::owner_worker::OwnerWorkers;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One message from the inbound source. Everything upstream of this struct
/// (transport, command parsing) is the chat collaborator's problem.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub group_id: i64,
    pub sender_identity: String,
    pub text: String,
}

pub struct SignalPipeline {
    tracker: Arc<SubscriptionTracker>,
    market_data: Arc<dyn MarketDataSource>,
    notifier: Arc<dyn Notifier>,
    policies: Arc<PolicyStore>,
    workers: Arc<OwnerWorkers>,
}

impl SignalPipeline {
    pub fn new(
        tracker: Arc<SubscriptionTracker>,
        market_data: Arc<dyn MarketDataSource>,
        notifier: Arc<dyn Notifier>,
        policies: Arc<PolicyStore>,
        workers: Arc<OwnerWorkers>,
    ) -> Self {
        Self {
            tracker,
            market_data,
            notifier,
            policies,
            workers,
        }
    }

    pub async fn handle_event(&self, event: InboundEvent) {
        let sender = normalize_identity(&event.sender_identity);
        let watchers = self.tracker.watchers_of(event.group_id, &sender).await;
        if watchers.is_empty() {
            return;
        }

        let hits = extract_addresses(&event.text);
        if hits.is_empty() {
            return;
        }
        info!(
            group_id = event.group_id,
            sender = %sender,
            addresses = hits.len(),
            "signal detected"
        );

        // Market data resolves concurrently; each failure degrades to the
        // bare address.
        let snapshots = join_all(
            hits.iter()
                .map(|hit| self.market_data.token_snapshot(hit.chain, &hit.address)),
        )
        .await;

        for (hit, snapshot) in hits.iter().zip(snapshots) {
            self.deliver(&sender, hit, snapshot.as_ref(), &watchers).await;
            if hit.chain.is_executable() {
                self.dispatch_autobuys(&sender, hit, snapshot.as_ref(), &watchers)
                    .await;
            }
        }
    }

    async fn deliver(
        &self,
        sender: &str,
        hit: &DetectedAddress,
        snapshot: Option<&TokenSnapshot>,
        watchers: &std::collections::BTreeSet<u64>,
    ) {
        let caption = format_signal(sender, hit, snapshot);
        let sends = watchers.iter().map(|&watcher| {
            let caption = caption.clone();
            async move {
                let result = match snapshot.and_then(|s| s.logo_url.as_deref()) {
                    Some(logo) => self.notifier.send_photo(watcher, logo, &caption).await,
                    None => self.notifier.send_text(watcher, &caption).await,
                };
                if let Err(e) = result {
                    warn!(watcher, error = %e, "signal delivery failed");
                }
            }
        });
        join_all(sends).await;
    }

    async fn dispatch_autobuys(
        &self,
        sender: &str,
        hit: &DetectedAddress,
        snapshot: Option<&TokenSnapshot>,
        watchers: &std::collections::BTreeSet<u64>,
    ) {
        let market_cap = snapshot.and_then(|s| s.market_cap_usd);
        let jobs = watchers.iter().map(|&owner| {
            let trader = sender.to_string();
            let mint = hit.address.clone();
            async move {
                if self.policies.get(owner, &trader).await.is_none() {
                    debug!(owner, trader = %trader, "no autobuy policy, skipping");
                    return;
                }
                match self.workers.autobuy(owner, &trader, &mint, market_cap).await {
                    Ok(outcome) => {
                        let text = format!(
                            "Autobuy filled for {}\nTx: {}\nEntry: {:.6} per lamport",
                            mint, outcome.tx_signature, outcome.entry_price
                        );
                        let _ = self.notifier.send_text(owner, &text).await;
                    }
                    Err(e) if e.owner_facing() => {
                        let _ = self
                            .notifier
                            .send_text(owner, &format!("Autobuy skipped: {e}"))
                            .await;
                    }
                    Err(e) => warn!(owner, error = %e, "autobuy dispatch failed"),
                }
            }
        });
        join_all(jobs).await;
    }
}

/// Render one detected address for delivery.
fn format_signal(sender: &str, hit: &DetectedAddress, snapshot: Option<&TokenSnapshot>) -> String {
    match snapshot {
        Some(s) => format!(
            "New {} CA from @{}\n\n{} ({})\nMarket cap: {}\n\n{}\n\nChart: {}",
            hit.chain.label(),
            sender,
            s.name,
            s.symbol,
            s.market_cap_display,
            hit.address,
            s.chart_url,
        ),
        None => format!(
            "New {} CA from @{}\n\n{}",
            hit.chain.label(),
            sender,
            hit.address,
        ),
    }
}
