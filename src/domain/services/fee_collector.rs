//! Post-trade service fee skim.
//!
//! Runs only after a successful swap. Whatever happens here, the recorded
//! position stands: fee failures are surfaced as `FeeCollectionFailed` and
//! logged by the caller, never used to roll anything back.

use crate::domain::errors::TradeError;
use crate::domain::repositories::gateways::ChainRpc;
use crate::domain::services::custody::WalletCustodyManager;
use crate::domain::services::ledger::PositionLedger;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct FeeConfig {
    /// Fraction of the trade amount skimmed as the service fee.
    pub fee_pct: f64,
    /// Fees below this are skipped rather than paid.
    pub min_fee_lamports: u64,
    /// Lamports kept aside for transaction fees.
    pub gas_buffer_lamports: u64,
    /// Fixed collection address; `None` disables collection entirely.
    pub collection_address: Option<String>,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            fee_pct: 0.01,
            min_fee_lamports: 100_000,
            gas_buffer_lamports: 5_000_000,
            collection_address: None,
        }
    }
}

impl FeeConfig {
    pub fn fee_for(&self, trade_lamports: u64) -> u64 {
        (trade_lamports as f64 * self.fee_pct).round() as u64
    }
}

pub struct FeeCollector {
    custody: Arc<WalletCustodyManager>,
    rpc: Arc<dyn ChainRpc>,
    ledger: Arc<PositionLedger>,
    config: FeeConfig,
}

impl FeeCollector {
    pub fn new(
        custody: Arc<WalletCustodyManager>,
        rpc: Arc<dyn ChainRpc>,
        ledger: Arc<PositionLedger>,
        config: FeeConfig,
    ) -> Self {
        Self {
            custody,
            rpc,
            ledger,
            config,
        }
    }

    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    /// Collect the fee for a completed trade. `Ok(None)` means the fee was
    /// skipped (dust, or no collection address configured).
    pub async fn collect_fee(
        &self,
        owner: u64,
        trade_lamports: u64,
    ) -> Result<Option<String>, TradeError> {
        let Some(collection_address) = self.config.collection_address.as_deref() else {
            debug!(owner, "fee collection unconfigured, skipping");
            return Ok(None);
        };

        let fee = self.config.fee_for(trade_lamports);
        if fee < self.config.min_fee_lamports {
            debug!(owner, fee, "fee below dust threshold, skipping");
            return Ok(None);
        }

        let wallet = self
            .custody
            .active_wallet(owner)
            .await
            .ok_or(TradeError::WalletNotFound { owner })?;

        let required = fee + self.config.gas_buffer_lamports;
        if wallet.cached_lamports < required {
            return Err(TradeError::FeeCollectionFailed(format!(
                "balance {} below fee + gas buffer {}",
                wallet.cached_lamports, required
            )));
        }

        let keypair = self.custody.unseal_keypair(&wallet)?;
        let signature = self
            .rpc
            .transfer(&keypair, collection_address, fee)
            .await
            .map_err(|e| TradeError::FeeCollectionFailed(e.to_string()))?;

        self.ledger.record_fee(fee).await?;
        info!(owner, fee, %signature, "service fee collected");
        Ok(Some(signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::gateways::ChainRpc;
    use crate::infrastructure::keystore::Keystore;
    use crate::persistence::JsonStore;
    use async_trait::async_trait;
    use solana_sdk::signature::Keypair;
    use solana_sdk::transaction::VersionedTransaction;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct TransferRpc {
        transfers: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl ChainRpc for TransferRpc {
        async fn get_balance(&self, _address: &str) -> Result<u64, TradeError> {
            Ok(0)
        }
        async fn send_transaction(
            &self,
            _tx: &VersionedTransaction,
        ) -> Result<String, TradeError> {
            unreachable!()
        }
        async fn transfer(
            &self,
            _from: &Keypair,
            _to: &str,
            _lamports: u64,
        ) -> Result<String, TradeError> {
            if self.fail {
                return Err(TradeError::TransactionRejected("blockhash".into()));
            }
            self.transfers.fetch_add(1, Ordering::SeqCst);
            Ok("feesig".to_string())
        }
    }

    async fn fixture(
        dir: &tempfile::TempDir,
        config: FeeConfig,
        cached_lamports: u64,
        fail_transfer: bool,
    ) -> (FeeCollector, Arc<PositionLedger>, Arc<TransferRpc>) {
        let keystore = Arc::new(Keystore::from_key_material("fee collector test key").unwrap());
        let rpc = Arc::new(TransferRpc {
            transfers: AtomicU32::new(0),
            fail: fail_transfer,
        });
        let custody = Arc::new(
            WalletCustodyManager::load(
                JsonStore::new(dir.path().join("wallets.json")),
                keystore,
                rpc.clone(),
            )
            .await
            .unwrap(),
        );
        let w = custody.create_wallet(7, None).await.unwrap();
        custody
            .set_cached_balance(7, w.wallet_id, cached_lamports)
            .await
            .unwrap();
        let ledger = Arc::new(
            PositionLedger::load(JsonStore::new(dir.path().join("positions.json")))
                .await
                .unwrap(),
        );
        let collector = FeeCollector::new(custody, rpc.clone(), ledger.clone(), config);
        (collector, ledger, rpc)
    }

    fn configured() -> FeeConfig {
        FeeConfig {
            collection_address: Some("FeeAddr".to_string()),
            ..FeeConfig::default()
        }
    }

    #[tokio::test]
    async fn fee_collected_and_ledger_bumped() {
        let dir = tempfile::tempdir().unwrap();
        let (collector, ledger, rpc) =
            fixture(&dir, configured(), 1_000_000_000, false).await;

        // 1% of 0.5 SOL = 5_000_000 lamports.
        let sig = collector.collect_fee(7, 500_000_000).await.unwrap();
        assert_eq!(sig.as_deref(), Some("feesig"));
        assert_eq!(rpc.transfers.load(Ordering::SeqCst), 1);

        let fees = ledger.fee_ledger().await;
        assert_eq!(fees.total_collected_lamports, 5_000_000);
        assert_eq!(fees.total_trades, 1);
        assert!(fees.last_collection_time.is_some());
    }

    #[tokio::test]
    async fn dust_fee_skipped_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let (collector, ledger, rpc) = fixture(&dir, configured(), 1_000_000_000, false).await;

        // 1% of 1000 lamports is far below the dust threshold.
        assert_eq!(collector.collect_fee(7, 1_000).await.unwrap(), None);
        assert_eq!(rpc.transfers.load(Ordering::SeqCst), 0);
        assert_eq!(ledger.fee_ledger().await.total_trades, 0);
    }

    #[tokio::test]
    async fn unconfigured_collection_address_skips() {
        let dir = tempfile::tempdir().unwrap();
        let (collector, _, rpc) =
            fixture(&dir, FeeConfig::default(), 1_000_000_000, false).await;
        assert_eq!(collector.collect_fee(7, 500_000_000).await.unwrap(), None);
        assert_eq!(rpc.transfers.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn insufficient_balance_fails_without_transfer() {
        let dir = tempfile::tempdir().unwrap();
        // Balance below fee + gas buffer.
        let (collector, ledger, rpc) = fixture(&dir, configured(), 6_000_000, false).await;
        let err = collector.collect_fee(7, 500_000_000).await.unwrap_err();
        assert!(matches!(err, TradeError::FeeCollectionFailed(_)));
        assert_eq!(rpc.transfers.load(Ordering::SeqCst), 0);
        assert_eq!(ledger.fee_ledger().await.total_trades, 0);
    }

    #[tokio::test]
    async fn transfer_failure_is_fee_collection_failed_and_ledger_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (collector, ledger, _) = fixture(&dir, configured(), 1_000_000_000, true).await;
        let err = collector.collect_fee(7, 500_000_000).await.unwrap_err();
        assert!(matches!(err, TradeError::FeeCollectionFailed(_)));
        assert_eq!(ledger.fee_ledger().await.total_trades, 0);
    }
}
