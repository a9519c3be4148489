//! Custodial wallet records.
//!
//! Secrets are stored sealed (AES-256-GCM, hex-encoded) and only unsealed at
//! the moment a signature is needed. The balance field is a cache refreshed
//! on demand, never authoritative.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wallet {
    pub wallet_id: u32,
    pub display_name: String,
    /// Hex-encoded nonce-prefixed AES-256-GCM ciphertext of the base58 keypair.
    pub sealed_secret: String,
    pub public_address: String,
    /// Cached lamports, refreshed on demand.
    #[serde(default)]
    pub cached_lamports: u64,
}

/// One owner's ordered wallet collection plus the active pointer.
///
/// Invariant: a collection with at least one wallet always has exactly one
/// active wallet, and wallet ids are contiguous from 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletCollection {
    pub wallets: Vec<Wallet>,
    pub active_wallet_id: u32,
}

impl WalletCollection {
    pub fn active(&self) -> Option<&Wallet> {
        self.wallets.get(self.active_wallet_id as usize)
    }

    pub fn active_mut(&mut self) -> Option<&mut Wallet> {
        self.wallets.get_mut(self.active_wallet_id as usize)
    }

    pub fn get(&self, wallet_id: u32) -> Option<&Wallet> {
        self.wallets.get(wallet_id as usize)
    }

    pub fn next_id(&self) -> u32 {
        self.wallets.len() as u32
    }

    /// Remove a wallet and restore the contiguous-id invariant. The caller
    /// has already refused deletion of the active or last wallet.
    pub fn remove_and_reindex(&mut self, wallet_id: u32) {
        self.wallets.remove(wallet_id as usize);
        for (i, w) in self.wallets.iter_mut().enumerate() {
            w.wallet_id = i as u32;
        }
        if self.active_wallet_id as usize >= self.wallets.len() {
            self.active_wallet_id = self.wallets.len().saturating_sub(1) as u32;
        } else if self.active_wallet_id > wallet_id {
            // Active pointer shifts down with the reindex.
            self.active_wallet_id -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(n: u32) -> WalletCollection {
        WalletCollection {
            wallets: (0..n)
                .map(|i| Wallet {
                    wallet_id: i,
                    display_name: format!("Wallet {}", i + 1),
                    sealed_secret: String::new(),
                    public_address: format!("addr{i}"),
                    cached_lamports: 0,
                })
                .collect(),
            active_wallet_id: 0,
        }
    }

    #[test]
    fn remove_reindexes_contiguously() {
        let mut c = collection(3);
        c.active_wallet_id = 2;
        c.remove_and_reindex(1);
        let ids: Vec<u32> = c.wallets.iter().map(|w| w.wallet_id).collect();
        assert_eq!(ids, vec![0, 1]);
        // Active pointed at the old id 2, now id 1.
        assert_eq!(c.active_wallet_id, 1);
        assert_eq!(c.active().unwrap().public_address, "addr2");
    }

    #[test]
    fn remove_clamps_dangling_active_pointer() {
        let mut c = collection(3);
        c.active_wallet_id = 1;
        c.remove_and_reindex(2);
        assert_eq!(c.active_wallet_id, 1);
        assert!(c.active().is_some());
    }
}
