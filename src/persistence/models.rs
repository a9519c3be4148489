//! Document shapes for the four persisted JSON files.
//!
//! The wallets document predates multi-wallet support: early records held a
//! single sealed secret and address at the top level. Those upgrade
//! transparently to a one-element collection (id 0, "Wallet 1", active) when
//! deserialized.

use crate::domain::entities::policy::AutobuyPolicy;
use crate::domain::entities::position::PositionBook;
use crate::domain::entities::subscription::{normalize_identity, SubscriptionBook};
use crate::domain::entities::wallet::{Wallet, WalletCollection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// subscriptions.json
pub type SubscriptionsDoc = SubscriptionBook;

/// positions.json (positions plus the fee ledger singleton)
pub type PositionsDoc = PositionBook;

/// autobuy.json: policies keyed by owner then trader identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoliciesDoc {
    pub policies: BTreeMap<u64, BTreeMap<String, AutobuyPolicy>>,
}

impl PoliciesDoc {
    /// Lookups and keys always go through the same identity normalization
    /// as the subscription book, so "@Trader1" and "trader1" are one policy.
    pub fn get(&self, owner: u64, trader: &str) -> Option<&AutobuyPolicy> {
        let trader = normalize_identity(trader);
        self.policies.get(&owner).and_then(|m| m.get(&trader))
    }

    pub fn get_mut(&mut self, owner: u64, trader: &str) -> Option<&mut AutobuyPolicy> {
        let trader = normalize_identity(trader);
        self.policies
            .get_mut(&owner)
            .and_then(|m| m.get_mut(&trader))
    }

    pub fn upsert(&mut self, mut policy: AutobuyPolicy) {
        policy.trader_identity = normalize_identity(&policy.trader_identity);
        self.policies
            .entry(policy.owner_user_id)
            .or_default()
            .insert(policy.trader_identity.clone(), policy);
    }
}

/// wallets.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletsDoc {
    pub users: BTreeMap<u64, UserWallets>,
}

/// Per-user wallet record, accepting both the current multi-wallet shape and
/// the legacy single-wallet shape on input. Always serialized in the
/// multi-wallet shape.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(into = "WalletCollection")]
pub struct UserWallets(pub WalletCollection);

impl From<UserWallets> for WalletCollection {
    fn from(u: UserWallets) -> Self {
        u.0
    }
}

impl From<WalletCollection> for UserWallets {
    fn from(c: WalletCollection) -> Self {
        UserWallets(c)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserWalletsShape {
    Multi(WalletCollection),
    Legacy {
        sealed_secret: String,
        public_address: String,
        #[serde(default)]
        cached_lamports: u64,
    },
}

impl<'de> Deserialize<'de> for UserWallets {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let shape = UserWalletsShape::deserialize(deserializer)?;
        let collection = match shape {
            UserWalletsShape::Multi(c) => c,
            UserWalletsShape::Legacy {
                sealed_secret,
                public_address,
                cached_lamports,
            } => WalletCollection {
                wallets: vec![Wallet {
                    wallet_id: 0,
                    display_name: "Wallet 1".to_string(),
                    sealed_secret,
                    public_address,
                    cached_lamports,
                }],
                active_wallet_id: 0,
            },
        };
        Ok(UserWallets(collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_single_wallet_upgrades() {
        let json = r#"{
            "users": {
                "42": {
                    "sealed_secret": "abcd",
                    "public_address": "SomePubkey",
                    "cached_lamports": 5
                }
            }
        }"#;
        let doc: WalletsDoc = serde_json::from_str(json).unwrap();
        let c = &doc.users[&42].0;
        assert_eq!(c.wallets.len(), 1);
        assert_eq!(c.wallets[0].wallet_id, 0);
        assert_eq!(c.wallets[0].display_name, "Wallet 1");
        assert_eq!(c.wallets[0].public_address, "SomePubkey");
        assert_eq!(c.active_wallet_id, 0);
    }

    #[test]
    fn multi_wallet_shape_roundtrips() {
        let doc: WalletsDoc = serde_json::from_str(
            r#"{
            "users": {
                "7": {
                    "wallets": [
                        {"wallet_id":0,"display_name":"Wallet 1","sealed_secret":"s","public_address":"p","cached_lamports":1},
                        {"wallet_id":1,"display_name":"Burner","sealed_secret":"s2","public_address":"p2","cached_lamports":2}
                    ],
                    "active_wallet_id": 1
                }
            }
        }"#,
        )
        .unwrap();
        let serialized = serde_json::to_string(&doc).unwrap();
        let reparsed: WalletsDoc = serde_json::from_str(&serialized).unwrap();
        assert_eq!(reparsed.users[&7].0.active_wallet_id, 1);
        assert_eq!(reparsed.users[&7].0.wallets[1].display_name, "Burner");
    }

    #[test]
    fn policies_doc_upsert_and_lookup() {
        let mut doc = PoliciesDoc::default();
        let mut p = AutobuyPolicy::defaults();
        p.owner_user_id = 9;
        p.trader_identity = "caller".into();
        doc.upsert(p.clone());
        assert_eq!(doc.get(9, "caller").unwrap().buy_amount_sol, p.buy_amount_sol);
        assert!(doc.get(9, "other").is_none());
    }

    #[test]
    fn policy_keys_normalize_like_subscriptions() {
        // A policy written under the raw "@Trader1" form must be found by
        // the pipeline's normalized sender lookup.
        let mut doc = PoliciesDoc::default();
        let mut p = AutobuyPolicy::defaults();
        p.owner_user_id = 9;
        p.trader_identity = "@Trader1".into();
        doc.upsert(p);

        let stored = doc.get(9, "trader1").unwrap();
        assert_eq!(stored.trader_identity, "trader1");
        assert!(doc.get(9, "@TRADER1").is_some());
        assert!(doc.get_mut(9, "Trader1").is_some());
    }
}
