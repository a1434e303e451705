//! Classification of an encounter against the broadcast lists and the
//! per-entity subscriptions.
//!
//! Everything here is pure: given an index snapshot and an encounter it
//! decides who should be notified. Dedup against the ledger happens at
//! dispatch time.

use std::collections::HashSet;
use std::fmt;

use crate::geo::haversine;
use crate::index::IndexSnapshot;
use crate::model::{Encounter, Subscriber, SubscriberId, Subscription};
use crate::threshold::{effective, Threshold};

/// Path that selected a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchReason {
    TopQuality,
    WorstQuality,
    Channel,
    Subscription,
}

impl MatchReason {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchReason::TopQuality => "top_quality",
            MatchReason::WorstQuality => "worst_quality",
            MatchReason::Channel => "channel",
            MatchReason::Subscription => "subscription",
        }
    }
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Match<'a> {
    pub subscriber: &'a Subscriber,
    pub reason: MatchReason,
}

/// Whether `encounter` is within `max_distance` of the subscriber's home.
///
/// Subscribers without coordinates, or without a distance limit, are never
/// filtered out.
pub fn within_distance(
    subscriber: &Subscriber,
    max_distance: Threshold,
    encounter: &Encounter,
) -> bool {
    let (Some(home), Some(max)) = (subscriber.location(), max_distance.get()) else {
        return true;
    };
    haversine(home, encounter.location()) <= f64::from(max)
}

/// Channel rule: only a level default set matches on level alone, only a
/// quality default matches on quality alone, both set require both.
/// Channels with neither default are skipped.
pub fn channel_accepts(channel: &Subscriber, encounter: &Encounter) -> bool {
    let level = encounter_level(encounter);
    match (channel.min_quality.get(), channel.min_level.get()) {
        (None, None) => false,
        (Some(quality), None) => encounter.quality >= f64::from(quality),
        (None, Some(min_level)) => level >= min_level,
        (Some(quality), Some(min_level)) => {
            encounter.quality >= f64::from(quality) && level >= min_level
        }
    }
}

/// Apply a subscription's thresholds, falling back to the subscriber's
/// defaults for every dimension the subscription leaves unset.
pub fn subscription_accepts(
    subscriber: &Subscriber,
    subscription: &Subscription,
    encounter: &Encounter,
) -> bool {
    if let Some(min) = effective(subscription.min_quality, subscriber.min_quality).get() {
        if f64::from(min) > encounter.quality {
            return false;
        }
    }
    if let Some(min) = effective(subscription.min_level, subscriber.min_level).get() {
        if min > encounter_level(encounter) {
            return false;
        }
    }
    within_distance(
        subscriber,
        effective(subscription.max_distance, subscriber.max_distance),
        encounter,
    )
}

/// Subscribers that should be notified about `encounter`, in evaluation
/// order: top-quality list, worst-quality list, channels, subscriptions.
/// A subscriber selected by several paths appears once, with the first
/// reason that selected it.
pub fn plan<'a>(snapshot: &'a IndexSnapshot, encounter: &Encounter) -> Vec<Match<'a>> {
    let mut planned = Vec::new();
    let mut seen: HashSet<SubscriberId> = HashSet::new();
    let mut push = |subscriber: &'a Subscriber, reason: MatchReason| {
        if seen.insert(subscriber.id) {
            planned.push(Match { subscriber, reason });
        }
    };

    let subscribers = &snapshot.subscribers;

    if encounter.is_top_quality() {
        for subscriber in subscribers.top_quality() {
            if within_distance(subscriber, subscriber.max_distance, encounter) {
                push(subscriber, MatchReason::TopQuality);
            }
        }
    }

    if encounter.is_worst_quality() {
        for subscriber in subscribers.worst_quality() {
            if within_distance(subscriber, subscriber.max_distance, encounter) {
                push(subscriber, MatchReason::WorstQuality);
            }
        }
    }

    for channel in subscribers.channels() {
        if channel_accepts(channel, encounter) {
            push(channel, MatchReason::Channel);
        }
    }

    for subscription in snapshot.subscriptions.for_entity(encounter.entity_id) {
        let Some(subscriber) = subscribers.get(subscription.subscriber_id) else {
            continue;
        };
        if subscription_accepts(subscriber, subscription, encounter) {
            push(subscriber, MatchReason::Subscription);
        }
    }

    planned
}

fn encounter_level(encounter: &Encounter) -> u32 {
    encounter.level.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::index::{SubscriberIndex, SubscriptionIndex};

    fn encounter(entity_id: u32, quality: f64, level: u32) -> Encounter {
        Encounter {
            id: "enc".to_string(),
            entity_id,
            form: None,
            latitude: 52.52,
            longitude: 13.405,
            quality,
            level: Some(level),
            cp: None,
            attack: None,
            defense: None,
            stamina: None,
            gender: None,
            size: None,
            weather: None,
            move_1: None,
            move_2: None,
            expires_at: 2_000,
            updated_at: 1_000,
            pvp: None,
        }
    }

    fn snapshot(subscribers: Vec<Subscriber>, subscriptions: Vec<Subscription>) -> IndexSnapshot {
        let subscribers = SubscriberIndex::build(subscribers);
        let subscriptions = SubscriptionIndex::build(subscriptions, &subscribers);
        IndexSnapshot {
            subscribers: Arc::new(subscribers),
            subscriptions: Arc::new(subscriptions),
        }
    }

    fn channel(min_quality: u32, min_level: u32) -> Subscriber {
        let mut s = Subscriber::new(-1009);
        s.min_quality = Threshold::new(min_quality);
        s.min_level = Threshold::new(min_level);
        s
    }

    #[test]
    fn distance_gate_ignored_without_coordinates() {
        let subscriber = Subscriber::new(1);
        let mut far = encounter(1, 50.0, 10);
        far.latitude = -33.9;
        far.longitude = 151.2;
        assert!(within_distance(&subscriber, Threshold::new(1), &far));
    }

    #[test]
    fn distance_gate_applies_with_coordinates() {
        let mut subscriber = Subscriber::new(1);
        subscriber.latitude = 52.52;
        subscriber.longitude = 13.305;

        let nearby = encounter(1, 50.0, 10);
        // roughly 6.8km apart
        assert!(within_distance(&subscriber, Threshold::new(10_000), &nearby));
        assert!(!within_distance(&subscriber, Threshold::new(5_000), &nearby));
        assert!(within_distance(&subscriber, Threshold::UNSET, &nearby));
    }

    #[test]
    fn channel_rule_precedence() {
        let e = encounter(1, 80.0, 20);

        assert!(!channel_accepts(&channel(0, 0), &e));
        assert!(channel_accepts(&channel(80, 0), &e));
        assert!(!channel_accepts(&channel(81, 0), &e));
        assert!(channel_accepts(&channel(0, 20), &e));
        assert!(!channel_accepts(&channel(0, 21), &e));
        assert!(channel_accepts(&channel(80, 20), &e));
        assert!(!channel_accepts(&channel(80, 21), &e));
        assert!(!channel_accepts(&channel(81, 20), &e));
    }

    #[test]
    fn subscription_override_beats_default() {
        let mut subscriber = Subscriber::new(1);
        subscriber.min_quality = Threshold::new(50);

        let mut subscription = Subscription::new(1, 16);
        assert!(!subscription_accepts(&subscriber, &subscription, &encounter(16, 40.0, 5)));

        subscription.min_quality = Threshold::new(30);
        assert!(subscription_accepts(&subscriber, &subscription, &encounter(16, 40.0, 5)));
    }

    #[test]
    fn subscription_level_gate() {
        let subscriber = Subscriber::new(1);
        let mut subscription = Subscription::new(1, 16);
        subscription.min_level = Threshold::new(30);

        assert!(!subscription_accepts(&subscriber, &subscription, &encounter(16, 100.0, 29)));
        assert!(subscription_accepts(&subscriber, &subscription, &encounter(16, 100.0, 30)));
    }

    #[test]
    fn plan_walks_every_path_once_per_subscriber() {
        let mut top = Subscriber::new(1);
        top.top_quality = true;
        let mut worst = Subscriber::new(2);
        worst.worst_quality = true;
        let subscribed = Subscriber::new(3);

        let snap = snapshot(
            vec![top.clone(), worst, subscribed, channel(90, 0)],
            vec![Subscription::new(1, 16), Subscription::new(3, 16)],
        );

        let reasons: Vec<_> = plan(&snap, &encounter(16, 100.0, 35))
            .into_iter()
            .map(|m| (m.subscriber.id, m.reason))
            .collect();
        assert_eq!(
            reasons,
            vec![
                (1, MatchReason::TopQuality),
                (-1009, MatchReason::Channel),
                (3, MatchReason::Subscription),
            ]
        );

        let worst_only: Vec<_> = plan(&snap, &encounter(99, 0.0, 1))
            .into_iter()
            .map(|m| (m.subscriber.id, m.reason))
            .collect();
        assert_eq!(worst_only, vec![(2, MatchReason::WorstQuality)]);
    }

    #[test]
    fn broadcast_respects_subscriber_distance() {
        let mut top = Subscriber::new(1);
        top.top_quality = true;
        top.latitude = 48.137;
        top.longitude = 11.575;
        top.max_distance = Threshold::new(1_000);

        let snap = snapshot(vec![top], vec![]);
        assert!(plan(&snap, &encounter(16, 100.0, 35)).is_empty());
    }
}
