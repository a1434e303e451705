use std::collections::HashMap;

use crate::model::{Subscriber, SubscriberId};

/// Projection of every subscriber row, partitioned by broadcast opt-in.
///
/// The opt-in lists only hold subscribers with notifications enabled.
#[derive(Debug, Default, Clone)]
pub struct SubscriberIndex {
    all: HashMap<SubscriberId, Subscriber>,
    top_quality: Vec<SubscriberId>,
    worst_quality: Vec<SubscriberId>,
    channels: Vec<SubscriberId>,
}

impl SubscriberIndex {
    pub fn build(subscribers: Vec<Subscriber>) -> Self {
        let mut index = Self::default();

        for subscriber in subscribers {
            // First row wins, as in the subscription index.
            index.all.entry(subscriber.id).or_insert(subscriber);
        }

        for subscriber in index.all.values() {
            if !subscriber.notify {
                continue;
            }
            if subscriber.top_quality {
                index.top_quality.push(subscriber.id);
            }
            if subscriber.worst_quality {
                index.worst_quality.push(subscriber.id);
            }
            if subscriber.is_channel() {
                index.channels.push(subscriber.id);
            }
        }

        index.top_quality.sort_unstable();
        index.worst_quality.sort_unstable();
        index.channels.sort_unstable();
        index
    }

    pub fn get(&self, id: SubscriberId) -> Option<&Subscriber> {
        self.all.get(&id)
    }

    /// Whether `id` exists and currently accepts notifications.
    pub fn accepts_notifications(&self, id: SubscriberId) -> bool {
        self.all.get(&id).is_some_and(|s| s.notify)
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn top_quality(&self) -> impl Iterator<Item = &Subscriber> {
        self.resolve(&self.top_quality)
    }

    pub fn worst_quality(&self) -> impl Iterator<Item = &Subscriber> {
        self.resolve(&self.worst_quality)
    }

    pub fn channels(&self) -> impl Iterator<Item = &Subscriber> {
        self.resolve(&self.channels)
    }

    fn resolve<'a>(&'a self, ids: &'a [SubscriberId]) -> impl Iterator<Item = &'a Subscriber> {
        ids.iter().filter_map(|id| self.all.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscriber(id: SubscriberId, notify: bool, top: bool, worst: bool) -> Subscriber {
        let mut s = Subscriber::new(id);
        s.notify = notify;
        s.top_quality = top;
        s.worst_quality = worst;
        s
    }

    fn ids<'a>(iter: impl Iterator<Item = &'a Subscriber>) -> Vec<SubscriberId> {
        iter.map(|s| s.id).collect()
    }

    #[test]
    fn partitions_by_opt_in() {
        let index = SubscriberIndex::build(vec![
            subscriber(3, true, true, false),
            subscriber(1, true, true, true),
            subscriber(2, true, false, true),
            subscriber(-1001, true, false, false),
        ]);

        assert_eq!(index.len(), 4);
        assert_eq!(ids(index.top_quality()), vec![1, 3]);
        assert_eq!(ids(index.worst_quality()), vec![1, 2]);
        assert_eq!(ids(index.channels()), vec![-1001]);
    }

    #[test]
    fn muted_subscribers_stay_out_of_broadcast_lists() {
        let index = SubscriberIndex::build(vec![
            subscriber(1, false, true, true),
            subscriber(-1002, false, false, false),
        ]);

        assert!(index.get(1).is_some());
        assert!(!index.accepts_notifications(1));
        assert_eq!(index.top_quality().count(), 0);
        assert_eq!(index.worst_quality().count(), 0);
        assert_eq!(index.channels().count(), 0);
    }

    #[test]
    fn duplicate_ids_collapse() {
        let index = SubscriberIndex::build(vec![
            subscriber(1, true, true, false),
            subscriber(1, true, true, false),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(ids(index.top_quality()), vec![1]);
    }

    #[test]
    fn first_row_wins_for_duplicate_ids() {
        let index = SubscriberIndex::build(vec![
            subscriber(1, true, true, false),
            subscriber(1, false, false, true),
        ]);
        assert!(index.accepts_notifications(1));
        assert_eq!(ids(index.top_quality()), vec![1]);
        assert_eq!(index.worst_quality().count(), 0);
    }
}
