//! Per-owner trade serialization.
//!
//! Wallet balances and daily counters are shared mutable state keyed by
//! owner id. Two concurrent trades for the same owner must not both pass
//! the balance or daily-limit gate on a stale snapshot, so every mutating
//! sequence ("check gates → execute swap → update counters/balance") goes
//! through a single worker task per owner. Workers are spawned on demand
//! and owned by the registry.

use crate::domain::errors::TradeError;
use crate::domain::services::autobuy::AutobuyEngine;
use crate::domain::services::swap_engine::SwapOutcome;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

#[derive(Debug)]
pub enum OwnerCommand {
    Autobuy {
        trader: String,
        token_mint: String,
        market_cap: Option<f64>,
        reply: mpsc::Sender<Result<SwapOutcome, TradeError>>,
    },
    Shutdown,
}

pub struct OwnerWorkers {
    engine: Arc<AutobuyEngine>,
    senders: Mutex<HashMap<u64, mpsc::Sender<OwnerCommand>>>,
}

impl OwnerWorkers {
    pub fn new(engine: Arc<AutobuyEngine>) -> Self {
        Self {
            engine,
            senders: Mutex::new(HashMap::new()),
        }
    }

    /// Evaluate and (when the gates pass) execute one autobuy through the
    /// owner's worker, serialized with every other trade for that owner.
    pub async fn autobuy(
        &self,
        owner: u64,
        trader: &str,
        token_mint: &str,
        market_cap: Option<f64>,
    ) -> Result<SwapOutcome, TradeError> {
        let sender = self.sender_for(owner).await;
        let (reply_tx, mut reply_rx) = mpsc::channel(1);
        sender
            .send(OwnerCommand::Autobuy {
                trader: trader.to_string(),
                token_mint: token_mint.to_string(),
                market_cap,
                reply: reply_tx,
            })
            .await?;
        reply_rx
            .recv()
            .await
            .unwrap_or_else(|| Err(TradeError::WorkerUnavailable("no response".to_string())))
    }

    pub async fn shutdown(&self) {
        let mut senders = self.senders.lock().await;
        for (owner, sender) in senders.drain() {
            debug!(owner, "shutting down owner worker");
            let _ = sender.send(OwnerCommand::Shutdown).await;
        }
    }

    async fn sender_for(&self, owner: u64) -> mpsc::Sender<OwnerCommand> {
        let mut senders = self.senders.lock().await;
        if let Some(sender) = senders.get(&owner) {
            if !sender.is_closed() {
                return sender.clone();
            }
        }
        let (tx, rx) = mpsc::channel(32);
        let engine = self.engine.clone();
        tokio::spawn(async move {
            run_worker(owner, engine, rx).await;
        });
        senders.insert(owner, tx.clone());
        tx
    }
}

async fn run_worker(owner: u64, engine: Arc<AutobuyEngine>, mut rx: mpsc::Receiver<OwnerCommand>) {
    info!(owner, "owner worker started");
    while let Some(command) = rx.recv().await {
        match command {
            OwnerCommand::Autobuy {
                trader,
                token_mint,
                market_cap,
                reply,
            } => {
                let result = engine
                    .evaluate_and_trade(owner, &trader, &token_mint, market_cap)
                    .await;
                let _ = reply.send(result).await;
            }
            OwnerCommand::Shutdown => break,
        }
    }
    info!(owner, "owner worker stopped");
}
