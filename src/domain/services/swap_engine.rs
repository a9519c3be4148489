//! Swap execution: quote, build, sign, submit, record.
//!
//! Each step aborts the whole operation with the stage that failed; the
//! Position is appended only after submission returned a signature. The
//! sequence is not transactional end to end: a successful submission
//! followed by a failed local write leaves an on-chain trade with no record,
//! which is why the append is idempotent against the signature.

use crate::domain::entities::position::Position;
use crate::domain::errors::TradeError;
use crate::domain::repositories::gateways::{ChainRpc, SwapAggregator};
use crate::domain::services::custody::WalletCustodyManager;
use crate::domain::services::ledger::PositionLedger;
use chrono::Utc;
use solana_sdk::transaction::VersionedTransaction;
use std::sync::Arc;
use tracing::{info, warn};

/// Native SOL mint, the input side of every buy.
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

#[derive(Debug, Clone)]
pub struct SwapOutcome {
    pub tx_signature: String,
    pub out_amount: u64,
    pub entry_price: f64,
}

pub struct SwapExecutor {
    custody: Arc<WalletCustodyManager>,
    aggregator: Arc<dyn SwapAggregator>,
    rpc: Arc<dyn ChainRpc>,
    ledger: Arc<PositionLedger>,
}

impl SwapExecutor {
    pub fn new(
        custody: Arc<WalletCustodyManager>,
        aggregator: Arc<dyn SwapAggregator>,
        rpc: Arc<dyn ChainRpc>,
        ledger: Arc<PositionLedger>,
    ) -> Self {
        Self {
            custody,
            aggregator,
            rpc,
            ledger,
        }
    }

    pub async fn execute_swap(
        &self,
        owner: u64,
        token_mint: &str,
        amount_lamports: u64,
        slippage_bps: u16,
    ) -> Result<SwapOutcome, TradeError> {
        // 1. Active wallet.
        let wallet = self
            .custody
            .active_wallet(owner)
            .await
            .ok_or(TradeError::WalletNotFound { owner })?;

        // 2. Quote.
        let quote = self
            .aggregator
            .quote(SOL_MINT, token_mint, amount_lamports, slippage_bps)
            .await?;

        // 3. Unsigned transaction from the aggregator.
        let tx_bytes = self
            .aggregator
            .build_swap(&quote, &wallet.public_address)
            .await?;

        // 4. Deserialize, sign, submit. A submit is never re-sent with the
        // same signed payload.
        let unsigned: VersionedTransaction = bincode::deserialize(&tx_bytes)
            .map_err(|e| TradeError::SwapBuildFailed(format!("undecodable transaction: {e}")))?;
        let keypair = self.custody.unseal_keypair(&wallet)?;
        let signed = VersionedTransaction::try_new(unsigned.message, &[&keypair])
            .map_err(|e| TradeError::TransactionRejected(format!("signing failed: {e}")))?;
        let signature = self.rpc.send_transaction(&signed).await?;

        // 5. Record. Idempotent per signature; a failure here does not undo
        // the on-chain trade, it only means the record is missing until the
        // append is retried.
        let entry_price = quote.out_amount as f64 / amount_lamports as f64;
        let position = Position {
            owner_user_id: owner,
            token_address: token_mint.to_string(),
            entry_price,
            amount_in_lamports: amount_lamports,
            timestamp: Utc::now(),
            tx_signature: signature.clone(),
        };
        if let Err(e) = self.ledger.append_position(position).await {
            warn!(owner, %signature, error = %e, "trade landed but position write failed");
        }

        info!(
            owner,
            token_mint,
            amount_lamports,
            %signature,
            "swap executed"
        );
        Ok(SwapOutcome {
            tx_signature: signature,
            out_amount: quote.out_amount,
            entry_price,
        })
    }
}
