//! Per-actor shopping sessions.
//!
//! A session remembers the last confirmed shop balance of an actor between a
//! shop-open signal and the close signals that follow it. Spending is detected
//! by comparing two point-in-time reads; a concurrent external change to the
//! shop ledger between the reads is indistinguishable from a purchase.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Actor, balance::BalanceReader, balance::read_balance};

#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub actor_name: String,
    /// Most recently confirmed shop balance. It can go up as well as down.
    pub observed_balance: i64,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SessionTracker {
    placeholder: String,
    sessions: HashMap<Uuid, Session>,
}

impl SessionTracker {
    /// `placeholder` resolves to the shop balance of an actor.
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            sessions: HashMap::new(),
        }
    }

    pub fn set_placeholder(&mut self, placeholder: impl Into<String>) {
        self.placeholder = placeholder.into();
    }

    pub fn get(&self, actor_id: &Uuid) -> Option<&Session> {
        self.sessions.get(actor_id)
    }

    pub fn contains(&self, actor_id: &Uuid) -> bool {
        self.sessions.contains_key(actor_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Snapshots the actor's current shop balance, replacing any earlier
    /// session. Returns the recorded balance.
    ///
    /// An unavailable read records nothing and leaves an existing session as
    /// it was.
    pub fn open<R>(&mut self, actor: &Actor, reader: &R) -> Option<i64>
    where
        R: BalanceReader + ?Sized,
    {
        let balance = read_balance(reader, actor, &self.placeholder).ok()? as i64;
        self.sessions.insert(
            actor.id,
            Session {
                actor_name: actor.name.clone(),
                observed_balance: balance,
                opened_at: Utc::now(),
            },
        );
        tracing::debug!("shop opened by {actor}, recorded balance: {balance}");
        Some(balance)
    }

    /// Re-reads the shop balance and returns how much it dropped since the
    /// last confirmed reading.
    ///
    /// On a drop the snapshot moves to the new balance and the session stays
    /// open, so later purchases in the same window are caught too. Otherwise
    /// the session ends. A missing session or an unavailable read changes
    /// nothing.
    pub fn close<R>(&mut self, actor: &Actor, reader: &R) -> Option<u64>
    where
        R: BalanceReader + ?Sized,
    {
        let previous = self.sessions.get(&actor.id)?.observed_balance;
        let current = read_balance(reader, actor, &self.placeholder).ok()? as i64;
        let spent = previous.saturating_sub(current);

        tracing::debug!(
            "shop closed by {actor} - previous: {previous}, current: {current}, spent: {spent}"
        );

        if spent > 0 {
            if let Some(session) = self.sessions.get_mut(&actor.id) {
                session.observed_balance = current;
            }
            Some(spent.unsigned_abs())
        } else {
            self.sessions.remove(&actor.id);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{ResultEngine, SyncError};

    /// Shop balance that tests can move between reads.
    struct Shop(Cell<Option<i64>>);

    impl Shop {
        fn new(balance: i64) -> Self {
            Self(Cell::new(Some(balance)))
        }

        fn set(&self, balance: Option<i64>) {
            self.0.set(balance);
        }
    }

    impl BalanceReader for Shop {
        fn lookup(&self, _actor: &Actor, placeholder: &str) -> ResultEngine<String> {
            match self.0.get() {
                Some(balance) => Ok(balance.to_string()),
                None => Ok(placeholder.to_string()),
            }
        }
    }

    struct Offline;

    impl BalanceReader for Offline {
        fn lookup(&self, _actor: &Actor, _placeholder: &str) -> ResultEngine<String> {
            Err(SyncError::Unavailable("offline".to_string()))
        }
    }

    fn tracker() -> SessionTracker {
        SessionTracker::new("%lpcpro_balance%")
    }

    #[test]
    fn unchanged_balance_ends_session() {
        let alice = Actor::new("Alice");
        let shop = Shop::new(100);
        let mut sessions = tracker();

        assert_eq!(sessions.open(&alice, &shop), Some(100));
        assert_eq!(sessions.close(&alice, &shop), None);
        assert!(!sessions.contains(&alice.id));
    }

    #[test]
    fn drop_is_reported_and_snapshot_moves() {
        let alice = Actor::new("Alice");
        let shop = Shop::new(100);
        let mut sessions = tracker();
        sessions.open(&alice, &shop);

        shop.set(Some(60));
        assert_eq!(sessions.close(&alice, &shop), Some(40));
        assert_eq!(sessions.get(&alice.id).unwrap().observed_balance, 60);

        assert_eq!(sessions.close(&alice, &shop), None);
        assert!(sessions.is_empty());
    }

    #[test]
    fn sequential_purchases_are_each_reported() {
        let alice = Actor::new("Alice");
        let shop = Shop::new(500);
        let mut sessions = tracker();
        sessions.open(&alice, &shop);

        shop.set(Some(450));
        assert_eq!(sessions.close(&alice, &shop), Some(50));
        shop.set(Some(300));
        assert_eq!(sessions.close(&alice, &shop), Some(150));
    }

    #[test]
    fn increase_ends_session_without_delta() {
        let alice = Actor::new("Alice");
        let shop = Shop::new(10);
        let mut sessions = tracker();
        sessions.open(&alice, &shop);

        shop.set(Some(25));
        assert_eq!(sessions.close(&alice, &shop), None);
        assert!(sessions.is_empty());
    }

    #[test]
    fn unavailable_close_keeps_session() {
        let alice = Actor::new("Alice");
        let shop = Shop::new(80);
        let mut sessions = tracker();
        sessions.open(&alice, &shop);

        shop.set(None);
        assert_eq!(sessions.close(&alice, &shop), None);
        assert_eq!(sessions.get(&alice.id).unwrap().observed_balance, 80);

        shop.set(Some(70));
        assert_eq!(sessions.close(&alice, &shop), Some(10));
    }

    #[test]
    fn close_without_session_is_a_no_op() {
        let bob = Actor::new("Bob");
        assert_eq!(tracker().close(&bob, &Shop::new(5)), None);
    }

    #[test]
    fn reopen_replaces_snapshot() {
        let alice = Actor::new("Alice");
        let shop = Shop::new(100);
        let mut sessions = tracker();
        sessions.open(&alice, &shop);

        shop.set(Some(200));
        assert_eq!(sessions.open(&alice, &shop), Some(200));
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions.get(&alice.id).unwrap().observed_balance, 200);
    }

    #[test]
    fn unavailable_open_records_nothing() {
        let alice = Actor::new("Alice");
        let mut sessions = tracker();
        assert_eq!(sessions.open(&alice, &Offline), None);
        assert!(sessions.is_empty());
    }

    #[test]
    fn unavailable_reopen_keeps_prior_snapshot() {
        let alice = Actor::new("Alice");
        let shop = Shop::new(100);
        let mut sessions = tracker();
        sessions.open(&alice, &shop);

        shop.set(None);
        assert_eq!(sessions.open(&alice, &shop), None);
        assert_eq!(sessions.get(&alice.id).unwrap().observed_balance, 100);
    }
}
