//! Tick-based deferred task queue.
//!
//! Every delayed step of the engine (settle delays, capability revocation) is
//! a [`Task`] value queued here and executed by [`Engine::tick`]. There are no
//! sleeps and no threads: the queue is owned by the engine and drained on the
//! single scheduling context that drives it.
//!
//! [`Engine::tick`]: crate::Engine::tick

use std::collections::BTreeMap;

use crate::{Actor, LedgerCommand, config::Ticks, dispatcher::GrantId};

/// Work the engine defers to a later tick.
#[derive(Clone, Debug, PartialEq)]
pub enum Task {
    /// Snapshot the actor's shop balance.
    OpenSession(Actor),
    /// Compare against the snapshot and settle any spend.
    CloseSession(Actor),
    /// Copy the primary balance onto the secondary ledger.
    SeedBalance(Actor),
    /// Run a ledger command.
    Execute(LedgerCommand),
    /// Withdraw a temporary capability.
    Revoke { actor: Actor, grant: GrantId },
}

#[derive(Debug)]
pub struct Scheduler<T = Task> {
    now: Ticks,
    seq: u64,
    queue: BTreeMap<(Ticks, u64), T>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now: 0,
            seq: 0,
            queue: BTreeMap::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tick.
    pub fn now(&self) -> Ticks {
        self.now
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queues `task` to run `delay` ticks from now and returns its due tick.
    ///
    /// A delay of zero still waits for the next tick. Tasks due on the same
    /// tick run in the order they were scheduled.
    pub fn schedule(&mut self, delay: Ticks, task: T) -> Ticks {
        let due = self.now.saturating_add(delay.max(1));
        self.seq += 1;
        self.queue.insert((due, self.seq), task);
        due
    }

    /// Moves to the next tick and hands back every task now due.
    pub fn advance(&mut self) -> Vec<T> {
        self.now += 1;
        let later = self.queue.split_off(&(self.now + 1, 0));
        let due = std::mem::replace(&mut self.queue, later);
        due.into_values().collect()
    }
}
