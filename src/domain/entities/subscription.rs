//! Track subscriptions: who watches which trader in which group.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One tracked identity inside one group, with the set of watchers who want
/// its contract addresses forwarded. Deleted when the watcher set empties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    pub group_id: i64,
    /// Normalized (lowercased, no leading '@') sender identity.
    pub tracked_identity: String,
    pub watchers: BTreeSet<u64>,
}

/// All subscriptions, keyed by group then identity. One subscription per
/// (group, identity) pair; no cross-group sharing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionBook {
    pub groups: BTreeMap<i64, BTreeMap<String, Subscription>>,
}

impl SubscriptionBook {
    /// Add a watcher, creating the subscription on first track.
    pub fn track(&mut self, group_id: i64, identity: &str, watcher: u64) {
        let identity = normalize_identity(identity);
        self.groups
            .entry(group_id)
            .or_default()
            .entry(identity.clone())
            .or_insert_with(|| Subscription {
                group_id,
                tracked_identity: identity,
                watchers: BTreeSet::new(),
            })
            .watchers
            .insert(watcher);
    }

    /// Remove a watcher; drops the subscription (and empty group entries)
    /// when the watcher set becomes empty. Returns false when nothing was
    /// being tracked.
    pub fn untrack(&mut self, group_id: i64, identity: &str, watcher: u64) -> bool {
        let identity = normalize_identity(identity);
        let Some(group) = self.groups.get_mut(&group_id) else {
            return false;
        };
        let Some(sub) = group.get_mut(&identity) else {
            return false;
        };
        let removed = sub.watchers.remove(&watcher);
        if sub.watchers.is_empty() {
            group.remove(&identity);
        }
        if group.is_empty() {
            self.groups.remove(&group_id);
        }
        removed
    }

    /// Watchers of a given sender identity in a group, if tracked.
    pub fn watchers_of(&self, group_id: i64, identity: &str) -> Option<&BTreeSet<u64>> {
        let identity = normalize_identity(identity);
        self.groups
            .get(&group_id)
            .and_then(|g| g.get(&identity))
            .map(|s| &s.watchers)
    }

    /// Identities tracked in a group, for /list style output.
    pub fn tracked_in_group(&self, group_id: i64) -> Vec<&str> {
        self.groups
            .get(&group_id)
            .map(|g| g.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

pub fn normalize_identity(identity: &str) -> String {
    identity.trim_start_matches('@').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_normalizes_identity() {
        let mut book = SubscriptionBook::default();
        book.track(-100, "@Alpha_Caller", 7);
        assert!(book.watchers_of(-100, "alpha_caller").unwrap().contains(&7));
        assert!(book.watchers_of(-100, "@ALPHA_CALLER").unwrap().contains(&7));
    }

    #[test]
    fn subscription_removed_when_last_watcher_leaves() {
        let mut book = SubscriptionBook::default();
        book.track(1, "caller", 7);
        book.track(1, "caller", 8);
        assert!(book.untrack(1, "caller", 7));
        assert!(book.watchers_of(1, "caller").is_some());
        assert!(book.untrack(1, "caller", 8));
        assert!(book.watchers_of(1, "caller").is_none());
        assert!(book.groups.is_empty());
    }

    #[test]
    fn untrack_unknown_is_false() {
        let mut book = SubscriptionBook::default();
        assert!(!book.untrack(1, "ghost", 7));
    }

    #[test]
    fn no_cross_group_sharing() {
        let mut book = SubscriptionBook::default();
        book.track(1, "caller", 7);
        assert!(book.watchers_of(2, "caller").is_none());
    }
}
