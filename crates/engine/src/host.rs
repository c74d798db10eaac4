//! The boundary to the server hosting both ledgers.
//!
//! Ledger mutations are fire-and-forget: nothing is ever read back from a
//! command. The only way to observe a ledger is the
//! [`BalanceReader`](crate::BalanceReader) supertrait.

use crate::{Actor, BalanceReader, dispatcher::GrantId};

pub trait Host: BalanceReader {
    /// The online actor with exactly this display name, if any.
    fn find_online(&self, name: &str) -> Option<Actor>;

    fn has_capability(&self, actor: &Actor, capability: &str) -> bool;

    /// Attaches `capability` to `actor` until revoked.
    fn grant_capability(&mut self, actor: &Actor, capability: &str) -> GrantId;

    /// Must tolerate an actor that went offline in the meantime.
    fn revoke_capability(&mut self, actor: &Actor, grant: GrantId);

    /// Runs `command` (no leading `/`) with the actor's own authority.
    fn perform_as(&mut self, actor: &Actor, command: &str);

    /// Runs `command` (no leading `/`) with console authority. The command
    /// must not be fed back into the engine's inbound stream.
    fn dispatch_console(&mut self, command: &str);
}
