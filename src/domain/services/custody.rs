//! Wallet custody: generation, sealed storage, selection, export, deletion.
//!
//! All operations are keyed by the owning user id. The wallets document is
//! held in memory behind one lock and rewritten wholesale after each
//! mutation; balance refreshes release the lock around the RPC call so they
//! never block other wallet operations.

use crate::domain::entities::wallet::{Wallet, WalletCollection};
use crate::domain::errors::TradeError;
use crate::domain::repositories::gateways::ChainRpc;
use crate::infrastructure::keystore::Keystore;
use crate::persistence::models::WalletsDoc;
use crate::persistence::JsonStore;
use solana_sdk::signature::{Keypair, Signer};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use zeroize::Zeroizing;

pub struct WalletCustodyManager {
    doc: Mutex<WalletsDoc>,
    store: JsonStore<WalletsDoc>,
    keystore: Arc<Keystore>,
    rpc: Arc<dyn ChainRpc>,
}

impl WalletCustodyManager {
    pub async fn load(
        store: JsonStore<WalletsDoc>,
        keystore: Arc<Keystore>,
        rpc: Arc<dyn ChainRpc>,
    ) -> Result<Self, TradeError> {
        // Legacy single-wallet records upgrade inside deserialization.
        let doc = store.load().await?;
        Ok(Self {
            doc: Mutex::new(doc),
            store,
            keystore,
            rpc,
        })
    }

    /// Generate a keypair, seal its secret, and append it to the owner's
    /// collection. The first wallet becomes active.
    pub async fn create_wallet(
        &self,
        owner: u64,
        name: Option<&str>,
    ) -> Result<Wallet, TradeError> {
        let keypair = Keypair::new();
        let secret_b58 = Zeroizing::new(keypair.to_base58_string());
        let sealed = self.keystore.seal(secret_b58.as_bytes())?;

        let mut doc = self.doc.lock().await;
        let collection = &mut doc.users.entry(owner).or_default().0;
        let wallet_id = collection.next_id();
        let wallet = Wallet {
            wallet_id,
            display_name: name
                .map(str::to_string)
                .unwrap_or_else(|| format!("Wallet {}", wallet_id + 1)),
            sealed_secret: sealed,
            public_address: keypair.pubkey().to_string(),
            cached_lamports: 0,
        };
        collection.wallets.push(wallet.clone());
        if collection.wallets.len() == 1 {
            collection.active_wallet_id = 0;
        }
        self.store.save(&doc).await?;

        info!(owner, wallet_id, address = %wallet.public_address, "wallet created");
        Ok(wallet)
    }

    pub async fn list_wallets(&self, owner: u64) -> Vec<Wallet> {
        let doc = self.doc.lock().await;
        doc.users
            .get(&owner)
            .map(|u| u.0.wallets.clone())
            .unwrap_or_default()
    }

    pub async fn active_wallet(&self, owner: u64) -> Option<Wallet> {
        let doc = self.doc.lock().await;
        doc.users.get(&owner).and_then(|u| u.0.active().cloned())
    }

    /// Switch the active wallet. Fails without mutation when the id is out
    /// of range.
    pub async fn switch_active(&self, owner: u64, wallet_id: u32) -> Result<(), TradeError> {
        let mut doc = self.doc.lock().await;
        let collection = self.collection_mut(&mut doc, owner)?;
        if collection.get(wallet_id).is_none() {
            return Err(TradeError::WalletNotFound { owner });
        }
        collection.active_wallet_id = wallet_id;
        self.store.save(&doc).await?;
        Ok(())
    }

    /// Delete a wallet. Refused for the last remaining wallet and for the
    /// currently active one; on success ids are reindexed contiguously.
    pub async fn delete_wallet(&self, owner: u64, wallet_id: u32) -> Result<(), TradeError> {
        let mut doc = self.doc.lock().await;
        let collection = self.collection_mut(&mut doc, owner)?;
        if collection.get(wallet_id).is_none() {
            return Err(TradeError::WalletNotFound { owner });
        }
        if collection.wallets.len() == 1 {
            return Err(TradeError::WalletDeleteRefused(
                "it is your only wallet".to_string(),
            ));
        }
        if collection.active_wallet_id == wallet_id {
            return Err(TradeError::WalletDeleteRefused(
                "it is the active wallet, switch first".to_string(),
            ));
        }
        collection.remove_and_reindex(wallet_id);
        self.store.save(&doc).await?;
        info!(owner, wallet_id, "wallet deleted");
        Ok(())
    }

    /// Decrypt a wallet secret on demand. The caller must treat the returned
    /// base58 string as highly sensitive and advise the requester to delete
    /// it from any transcript.
    pub async fn export_secret(
        &self,
        owner: u64,
        wallet_id: u32,
    ) -> Result<Zeroizing<String>, TradeError> {
        let sealed = {
            let doc = self.doc.lock().await;
            doc.users
                .get(&owner)
                .and_then(|u| u.0.get(wallet_id))
                .map(|w| w.sealed_secret.clone())
                .ok_or(TradeError::WalletNotFound { owner })?
        };
        let plaintext = self.keystore.unseal(&sealed)?;
        let secret = String::from_utf8(plaintext.to_vec())
            .map_err(|_| TradeError::Keystore("sealed secret is not UTF-8".to_string()))?;
        Ok(Zeroizing::new(secret))
    }

    /// Unseal the signing keypair for a wallet.
    pub fn unseal_keypair(&self, wallet: &Wallet) -> Result<Keypair, TradeError> {
        let plaintext = self.keystore.unseal(&wallet.sealed_secret)?;
        let secret = std::str::from_utf8(&plaintext)
            .map_err(|_| TradeError::Keystore("sealed secret is not UTF-8".to_string()))?;
        let bytes = Zeroizing::new(
            bs58::decode(secret)
                .into_vec()
                .map_err(|_| TradeError::Keystore("sealed secret is not base58".to_string()))?,
        );
        Keypair::from_bytes(&bytes)
            .map_err(|_| TradeError::Keystore("sealed secret is not a keypair".to_string()))
    }

    /// Query the chain for the wallet's balance and update the cache. The
    /// document lock is not held across the RPC call.
    pub async fn refresh_balance(&self, owner: u64, wallet_id: u32) -> Result<u64, TradeError> {
        let address = {
            let doc = self.doc.lock().await;
            doc.users
                .get(&owner)
                .and_then(|u| u.0.get(wallet_id))
                .map(|w| w.public_address.clone())
                .ok_or(TradeError::WalletNotFound { owner })?
        };

        let lamports = self.rpc.get_balance(&address).await?;

        let mut doc = self.doc.lock().await;
        if let Some(wallet) = doc
            .users
            .get_mut(&owner)
            .and_then(|u| u.0.wallets.get_mut(wallet_id as usize))
        {
            wallet.cached_lamports = lamports;
        }
        self.store.save(&doc).await?;
        Ok(lamports)
    }

    /// Overwrite the cached balance, used after a trade consumed lamports.
    pub async fn set_cached_balance(
        &self,
        owner: u64,
        wallet_id: u32,
        lamports: u64,
    ) -> Result<(), TradeError> {
        let mut doc = self.doc.lock().await;
        if let Some(wallet) = doc
            .users
            .get_mut(&owner)
            .and_then(|u| u.0.wallets.get_mut(wallet_id as usize))
        {
            wallet.cached_lamports = lamports;
            self.store.save(&doc).await?;
        }
        Ok(())
    }

    fn collection_mut<'a>(
        &self,
        doc: &'a mut WalletsDoc,
        owner: u64,
    ) -> Result<&'a mut WalletCollection, TradeError> {
        doc.users
            .get_mut(&owner)
            .map(|u| &mut u.0)
            .ok_or(TradeError::WalletNotFound { owner })
    }
}
