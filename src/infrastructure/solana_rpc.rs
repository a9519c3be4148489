//! Solana RPC gateway.

use crate::domain::errors::TradeError;
use crate::domain::repositories::gateways::ChainRpc;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::system_instruction;
use solana_sdk::transaction::{Transaction, VersionedTransaction};
use std::str::FromStr;
use tracing::{debug, info};

pub struct SolanaRpcClient {
    client: RpcClient,
}

impl SolanaRpcClient {
    pub fn new(url: String) -> Self {
        Self {
            client: RpcClient::new_with_commitment(url, CommitmentConfig::confirmed()),
        }
    }

    fn send_config() -> RpcSendTransactionConfig {
        // Preflight stays on; a simulation failure is cheaper than a failed
        // on-chain trade.
        RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(CommitmentLevel::Confirmed),
            ..RpcSendTransactionConfig::default()
        }
    }

    fn parse_pubkey(address: &str) -> Result<Pubkey, TradeError> {
        Pubkey::from_str(address).map_err(|_| TradeError::InvalidAddress(address.to_string()))
    }
}

#[async_trait]
impl ChainRpc for SolanaRpcClient {
    async fn get_balance(&self, address: &str) -> Result<u64, TradeError> {
        let pubkey = Self::parse_pubkey(address)?;
        let lamports = self
            .client
            .get_balance(&pubkey)
            .await
            .map_err(|e| TradeError::NetworkTimeout(e.to_string()))?;
        debug!(address, lamports, "balance fetched");
        Ok(lamports)
    }

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<String, TradeError> {
        let signature = self
            .client
            .send_transaction_with_config(tx, Self::send_config())
            .await
            .map_err(|e| TradeError::TransactionRejected(e.to_string()))?;
        info!(%signature, "transaction submitted");
        Ok(signature.to_string())
    }

    async fn transfer(
        &self,
        from: &Keypair,
        to_address: &str,
        lamports: u64,
    ) -> Result<String, TradeError> {
        let to = Self::parse_pubkey(to_address)?;
        let blockhash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(|e| TradeError::NetworkTimeout(e.to_string()))?;

        let instruction = system_instruction::transfer(&from.pubkey(), &to, lamports);
        let tx = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&from.pubkey()),
            &[from],
            blockhash,
        );

        let signature = self
            .client
            .send_transaction_with_config(&tx, Self::send_config())
            .await
            .map_err(|e| TradeError::TransactionRejected(e.to_string()))?;
        info!(%signature, to_address, lamports, "transfer submitted");
        Ok(signature.to_string())
    }
}
