//! Seat bookkeeping (§3 "Presence").

use std::collections::HashMap;

use crate::ids::UserId;

/// Either a connected human or a bot lease, carrying the capability set
/// both share (§9 "Polymorphic presence"): no inheritance, a sum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Participant {
    /// A human player with a network session.
    Human {
        /// Network session id, used by the host to address broadcasts.
        session_id: String,
    },
    /// A synthetic player leased from the host's bot pool.
    Bot,
}

impl Participant {
    /// Whether this participant is a bot.
    #[must_use]
    pub const fn is_bot(&self) -> bool {
        matches!(self, Self::Bot)
    }
}

/// A seated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    /// Seat identity.
    pub user_id: UserId,
    /// Display name.
    pub user_name: String,
    /// VIP level, indexes the settlement fee table (§4.7, [`crate::wallet`]).
    pub vip_level: u8,
    /// Human or bot.
    pub participant: Participant,
}

impl Presence {
    /// A new human presence.
    #[must_use]
    pub fn human(user_id: UserId, user_name: String, vip_level: u8, session_id: String) -> Self {
        Self {
            user_id,
            user_name,
            vip_level,
            participant: Participant::Human { session_id },
        }
    }

    /// A new bot presence.
    #[must_use]
    pub fn bot(user_id: UserId, user_name: String) -> Self {
        Self {
            user_id,
            user_name,
            vip_level: 0,
            participant: Participant::Bot,
        }
    }

    /// Whether this seat is a bot.
    #[must_use]
    pub const fn is_bot(&self) -> bool {
        self.participant.is_bot()
    }
}

/// An insertion-ordered map keyed by user id, matching the teacher crate's
/// "`Vec` for order, `HashMap` for lookup" pattern generalized across the
/// several presence sets §3 names (`Presences`, `PlayingPresences`, …).
#[derive(Debug, Clone, Default)]
pub struct PresenceSet {
    order: Vec<UserId>,
    by_id: HashMap<UserId, Presence>,
}

impl PresenceSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a presence, appending to the order only if the
    /// id was not already present.
    pub fn insert(&mut self, presence: Presence) {
        if !self.by_id.contains_key(&presence.user_id) {
            self.order.push(presence.user_id.clone());
        }
        self.by_id.insert(presence.user_id.clone(), presence);
    }

    /// Removes a presence by id, returning it if present.
    pub fn remove(&mut self, user_id: &UserId) -> Option<Presence> {
        if let Some(pos) = self.order.iter().position(|id| id == user_id) {
            self.order.remove(pos);
        }
        self.by_id.remove(user_id)
    }

    /// Looks up a presence by id.
    #[must_use]
    pub fn get(&self, user_id: &UserId) -> Option<&Presence> {
        self.by_id.get(user_id)
    }

    /// Whether `user_id` is present.
    #[must_use]
    pub fn contains(&self, user_id: &UserId) -> bool {
        self.by_id.contains_key(user_id)
    }

    /// Number of seats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates presences in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Presence> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    /// Number of non-bot seats, used by §8 scenario 5 ("matches never run
    /// bot-only").
    #[must_use]
    pub fn human_count(&self) -> usize {
        self.iter().filter(|p| !p.is_bot()).count()
    }

    /// Clears every entry.
    pub fn clear(&mut self) {
        self.order.clear();
        self.by_id.clear();
    }
}

/// Per-user consecutive-no-interaction counters driving the idle kick
/// (§4.7 "Idle kick").
#[derive(Debug, Clone, Default)]
pub struct NoInteractCounters(HashMap<UserId, u32>);

impl NoInteractCounters {
    /// A fresh, empty counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets a user's counter to zero, e.g. on any bet placement.
    pub fn reset(&mut self, user_id: &UserId) {
        self.0.insert(user_id.clone(), 0);
    }

    /// Increments a user's counter by one, creating it at one if absent.
    pub fn increment(&mut self, user_id: &UserId) {
        *self.0.entry(user_id.clone()).or_insert(0) += 1;
    }

    /// Current counter value.
    #[must_use]
    pub fn get(&self, user_id: &UserId) -> u32 {
        self.0.get(user_id).copied().unwrap_or(0)
    }

    /// Removes a user's counter entirely, e.g. once they have left.
    pub fn remove(&mut self, user_id: &UserId) {
        self.0.remove(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order_across_reinsert() {
        let mut set = PresenceSet::new();
        set.insert(Presence::bot(UserId::from("a"), "A".into()));
        set.insert(Presence::bot(UserId::from("b"), "B".into()));
        set.insert(Presence::bot(UserId::from("a"), "A2".into()));
        let ids: Vec<&str> = set.iter().map(|p| p.user_id.0.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(set.get(&UserId::from("a")).unwrap().user_name, "A2");
    }

    #[test]
    fn human_count_excludes_bots() {
        let mut set = PresenceSet::new();
        set.insert(Presence::bot(UserId::from("bot1"), "Bot".into()));
        set.insert(Presence::human(
            UserId::from("u1"),
            "Human".into(),
            0,
            "sess".into(),
        ));
        assert_eq!(set.human_count(), 1);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn idle_kick_threshold_reached_after_repeated_increments() {
        let mut counters = NoInteractCounters::new();
        let user = UserId::from("u1");
        counters.increment(&user);
        counters.increment(&user);
        assert_eq!(counters.get(&user), 2);
        counters.reset(&user);
        assert_eq!(counters.get(&user), 0);
    }
}
