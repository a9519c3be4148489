//! Recorded positions and the service fee ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only record of an executed buy. Created only after the swap
/// submission returned a signature; never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub owner_user_id: u64,
    pub token_address: String,
    /// Token base units received per lamport spent, from the quote.
    pub entry_price: f64,
    pub amount_in_lamports: u64,
    pub timestamp: DateTime<Utc>,
    pub tx_signature: String,
}

/// Singleton fee totals, bumped only on a successful fee transfer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeeLedger {
    pub total_collected_lamports: u64,
    pub total_trades: u64,
    pub last_collection_time: Option<DateTime<Utc>>,
}

/// The positions document: all positions plus the fee ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionBook {
    pub positions: Vec<Position>,
    #[serde(default)]
    pub fee_ledger: FeeLedger,
}

impl PositionBook {
    /// Append keyed by tx signature. Re-appending the same signature is a
    /// no-op so the post-submit bookkeeping step can be retried safely.
    /// Returns true when the position was actually added.
    pub fn append(&mut self, position: Position) -> bool {
        if self
            .positions
            .iter()
            .any(|p| p.tx_signature == position.tx_signature)
        {
            return false;
        }
        self.positions.push(position);
        true
    }

    pub fn record_fee(&mut self, lamports: u64, at: DateTime<Utc>) {
        self.fee_ledger.total_collected_lamports += lamports;
        self.fee_ledger.total_trades += 1;
        self.fee_ledger.last_collection_time = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(sig: &str) -> Position {
        Position {
            owner_user_id: 1,
            token_address: "mint".into(),
            entry_price: 2.5,
            amount_in_lamports: 100,
            timestamp: Utc::now(),
            tx_signature: sig.into(),
        }
    }

    #[test]
    fn append_is_idempotent_per_signature() {
        let mut book = PositionBook::default();
        assert!(book.append(position("sig1")));
        assert!(!book.append(position("sig1")));
        assert!(book.append(position("sig2")));
        assert_eq!(book.positions.len(), 2);
    }

    #[test]
    fn fee_ledger_accumulates() {
        let mut book = PositionBook::default();
        let now = Utc::now();
        book.record_fee(500, now);
        book.record_fee(300, now);
        assert_eq!(book.fee_ledger.total_collected_lamports, 800);
        assert_eq!(book.fee_ledger.total_trades, 2);
        assert_eq!(book.fee_ledger.last_collection_time, Some(now));
    }
}
