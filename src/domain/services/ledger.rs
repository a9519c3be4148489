//! Shared access to the positions document (positions + fee ledger).

use crate::domain::entities::position::{FeeLedger, Position};
use crate::domain::errors::TradeError;
use crate::persistence::models::PositionsDoc;
use crate::persistence::JsonStore;
use chrono::Utc;
use tokio::sync::Mutex;

pub struct PositionLedger {
    doc: Mutex<PositionsDoc>,
    store: JsonStore<PositionsDoc>,
}

impl PositionLedger {
    pub async fn load(store: JsonStore<PositionsDoc>) -> Result<Self, TradeError> {
        let doc = store.load().await?;
        Ok(Self {
            doc: Mutex::new(doc),
            store,
        })
    }

    /// Append a position; signature-keyed, so retrying the bookkeeping step
    /// after a crash cannot double-record a trade. Returns whether the
    /// position was new.
    pub async fn append_position(&self, position: Position) -> Result<bool, TradeError> {
        let mut doc = self.doc.lock().await;
        let added = doc.append(position);
        if added {
            self.store.save(&doc).await?;
        }
        Ok(added)
    }

    pub async fn record_fee(&self, lamports: u64) -> Result<(), TradeError> {
        let mut doc = self.doc.lock().await;
        doc.record_fee(lamports, Utc::now());
        self.store.save(&doc).await?;
        Ok(())
    }

    pub async fn positions_for(&self, owner: u64) -> Vec<Position> {
        let doc = self.doc.lock().await;
        doc.positions
            .iter()
            .filter(|p| p.owner_user_id == owner)
            .cloned()
            .collect()
    }

    pub async fn fee_ledger(&self) -> FeeLedger {
        self.doc.lock().await.fee_ledger.clone()
    }
}
