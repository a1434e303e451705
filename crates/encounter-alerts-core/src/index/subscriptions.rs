use std::collections::{HashMap, HashSet};

use super::SubscriberIndex;
use crate::model::{EntityId, Subscription};

/// Entity-type id to the overrides of subscribers currently accepting
/// notifications.
#[derive(Debug, Default, Clone)]
pub struct SubscriptionIndex {
    by_entity: HashMap<EntityId, Vec<Subscription>>,
    total: usize,
    active: usize,
}

impl SubscriptionIndex {
    /// Build against `subscribers`; rows for unknown or muted subscribers are
    /// counted in `total` but not indexed.
    pub fn build(subscriptions: Vec<Subscription>, subscribers: &SubscriberIndex) -> Self {
        let total = subscriptions.len();
        let mut seen = HashSet::with_capacity(total);
        let mut by_entity: HashMap<EntityId, Vec<Subscription>> = HashMap::new();

        for subscription in subscriptions {
            if !subscribers.accepts_notifications(subscription.subscriber_id) {
                continue;
            }
            if !seen.insert(subscription.key()) {
                continue;
            }
            by_entity
                .entry(subscription.entity_id)
                .or_default()
                .push(subscription);
        }

        for list in by_entity.values_mut() {
            list.sort_unstable_by_key(|s| s.subscriber_id);
        }

        Self {
            by_entity,
            total,
            active: seen.len(),
        }
    }

    pub fn for_entity(&self, entity_id: EntityId) -> &[Subscription] {
        self.by_entity
            .get(&entity_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Rows loaded from the store.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Rows indexed for matching.
    pub fn active(&self) -> usize {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Subscriber;
    use crate::threshold::Threshold;

    fn subscribers() -> SubscriberIndex {
        let mut muted = Subscriber::new(2);
        muted.notify = false;
        SubscriberIndex::build(vec![Subscriber::new(1), muted, Subscriber::new(3)])
    }

    #[test]
    fn keeps_only_subscribers_accepting_notifications() {
        let index = SubscriptionIndex::build(
            vec![
                Subscription::new(1, 16),
                Subscription::new(2, 16),
                Subscription::new(3, 16),
                Subscription::new(99, 16),
            ],
            &subscribers(),
        );

        let owners: Vec<_> = index.for_entity(16).iter().map(|s| s.subscriber_id).collect();
        assert_eq!(owners, vec![1, 3]);
        assert_eq!(index.total(), 4);
        assert_eq!(index.active(), 2);
    }

    #[test]
    fn first_row_wins_for_duplicate_pairs() {
        let mut first = Subscription::new(1, 16);
        first.min_quality = Threshold::new(90);
        let mut second = Subscription::new(1, 16);
        second.min_quality = Threshold::new(10);

        let index = SubscriptionIndex::build(vec![first, second], &subscribers());
        assert_eq!(index.for_entity(16), &[first]);
    }

    #[test]
    fn unknown_entity_is_empty() {
        let index = SubscriptionIndex::build(vec![Subscription::new(1, 16)], &subscribers());
        assert!(index.for_entity(17).is_empty());
    }
}
