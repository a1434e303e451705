//! In-memory delivery ledger: which subscribers were already notified about
//! an encounter, and when that encounter expires.

use std::collections::{HashMap, HashSet};

use metrics::gauge;
use parking_lot::Mutex;

use crate::model::SubscriberId;

#[derive(Debug, Clone)]
struct LedgerEntry {
    expires_at: i64,
    recipients: HashSet<SubscriberId>,
}

#[derive(Debug, Default)]
pub struct DeliveryLedger {
    entries: Mutex<HashMap<String, LedgerEntry>>,
}

impl DeliveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `subscriber` as notified for `encounter_id`.
    ///
    /// Returns `false` if the pair was already present. The check and the
    /// insert happen under one lock, so of two concurrent claims exactly one
    /// wins.
    pub fn claim(&self, encounter_id: &str, subscriber: SubscriberId, expires_at: i64) -> bool {
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(encounter_id.to_string())
            .or_insert_with(|| LedgerEntry {
                expires_at,
                recipients: HashSet::new(),
            });
        let claimed = entry.recipients.insert(subscriber);
        let len = entries.len();
        drop(entries);

        gauge!("alerts.ledger.entries").set(len as f64);
        claimed
    }

    pub fn contains(&self, encounter_id: &str, subscriber: SubscriberId) -> bool {
        self.entries
            .lock()
            .get(encounter_id)
            .is_some_and(|entry| entry.recipients.contains(&subscriber))
    }

    pub fn contains_encounter(&self, encounter_id: &str) -> bool {
        self.entries.lock().contains_key(encounter_id)
    }

    /// Encounter ids whose expiry is strictly before `now`.
    pub fn expired(&self, now: i64) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, entry)| entry.expires_at < now)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Drop the whole entry for `encounter_id`.
    pub fn remove(&self, encounter_id: &str) -> bool {
        let mut entries = self.entries.lock();
        let removed = entries.remove(encounter_id).is_some();
        let len = entries.len();
        drop(entries);

        gauge!("alerts.ledger.entries").set(len as f64);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn second_claim_for_same_pair_loses() {
        let ledger = DeliveryLedger::new();
        assert!(ledger.claim("enc-1", 7, 1_000));
        assert!(!ledger.claim("enc-1", 7, 1_000));
        assert!(ledger.claim("enc-1", 8, 1_000));
        assert!(ledger.contains("enc-1", 7));
        assert!(!ledger.contains("enc-2", 7));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn first_claim_fixes_expiry() {
        let ledger = DeliveryLedger::new();
        ledger.claim("enc-1", 1, 100);
        ledger.claim("enc-1", 2, 500);
        assert_eq!(ledger.expired(101), vec!["enc-1".to_string()]);
    }

    #[test]
    fn expired_is_strict() {
        let ledger = DeliveryLedger::new();
        ledger.claim("old", 1, 99);
        ledger.claim("edge", 1, 100);
        ledger.claim("new", 1, 200);

        assert_eq!(ledger.expired(100), vec!["old".to_string()]);
        assert!(ledger.remove("old"));
        assert!(!ledger.remove("old"));
        assert!(ledger.contains_encounter("edge"));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn concurrent_claims_have_one_winner() {
        let ledger = Arc::new(DeliveryLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || ledger.claim("enc", 42, 10))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
