//! Runtime configuration consumed by the engine.
//!
//! The engine never loads configuration itself: the host deserializes a
//! [`SyncConfig`] (every field has a default) and hands it to
//! [`EngineBuilder::config`](crate::EngineBuilder::config) or
//! [`Engine::reload`](crate::Engine::reload).

use serde::Deserialize;

use crate::{ResultEngine, SyncError};

/// Delays are counted in scheduler ticks (20 ticks per second on the host).
pub type Ticks = u64;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Name of the tracked currency on the primary ledger.
    pub currency: String,
    /// Lifts engine diagnostics to debug verbosity.
    pub debug: bool,
    /// Seed the secondary ledger from the primary one when an actor joins.
    pub sync_on_join: bool,
    pub vocabulary: Vocabulary,
    pub session: SessionTriggers,
    pub shop: ShopLedger,
    pub economy: EconomyLedger,
    pub delays: Delays,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            currency: "Gems".to_string(),
            debug: false,
            sync_on_join: true,
            vocabulary: Vocabulary::default(),
            session: SessionTriggers::default(),
            shop: ShopLedger::default(),
            economy: EconomyLedger::default(),
            delays: Delays::default(),
        }
    }
}

impl SyncConfig {
    /// Rejects configurations the engine cannot build commands from.
    pub fn validate(&self) -> ResultEngine<()> {
        if self.currency.trim().is_empty() {
            return Err(SyncError::InvalidConfig("currency must not be empty".to_string()));
        }
        if self.currency.split_whitespace().count() != 1 {
            return Err(SyncError::InvalidConfig(format!(
                "currency must be a single token, got '{}'",
                self.currency
            )));
        }
        if self.shop.command.trim().is_empty() {
            return Err(SyncError::InvalidConfig("shop.command must not be empty".to_string()));
        }
        if self.economy.command.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "economy.command must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Command vocabulary of the primary ledger.
///
/// Tokens are compared case-insensitively. Base commands and shorthands carry
/// their leading `/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub base_commands: Vec<String>,
    pub give_aliases: Vec<String>,
    pub take_aliases: Vec<String>,
    pub set_aliases: Vec<String>,
    pub give_shorthands: Vec<String>,
    pub take_shorthands: Vec<String>,
    pub set_shorthands: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            base_commands: strings(&["/money", "/eco", "/econ", "/economy"]),
            give_aliases: strings(&["give", "+", "add"]),
            take_aliases: strings(&["take", "-", "remove"]),
            set_aliases: strings(&["set", "="]),
            give_shorthands: strings(&[
                "/givemoney",
                "/givebal",
                "/ecogive",
                "/ecogivemoney",
                "/moneygive",
                "/addmoney",
                "/addbal",
            ]),
            take_shorthands: strings(&[
                "/takemoney",
                "/takebal",
                "/ecotake",
                "/ecotakemoney",
                "/moneytake",
                "/removemoney",
                "/removebal",
            ]),
            set_shorthands: strings(&["/setmoney", "/setbal", "/ecoset", "/ecosetmoney", "/moneyset"]),
        }
    }
}

/// Player commands that open a shopping session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionTriggers {
    /// Matched against the whole (trimmed, lowercased) command.
    pub open_commands: Vec<String>,
    /// Matched against the start of the command.
    pub open_prefixes: Vec<String>,
}

impl Default for SessionTriggers {
    fn default() -> Self {
        Self {
            open_commands: strings(&["/chatshop", "/cshop", "/perkshop", "/chatstore"]),
            open_prefixes: strings(&[
                "/chatshop colors",
                "/chatshop names",
                "/chatshop tags",
                "/chatshop perks",
            ]),
        }
    }
}

/// The secondary ledger: commands run as the target actor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShopLedger {
    /// Command root, without the leading `/`.
    pub command: String,
    /// Capability the actor needs to run `command`.
    pub capability: String,
    /// Display-string lookup resolving to the actor's shop balance.
    pub balance_placeholder: String,
}

impl Default for ShopLedger {
    fn default() -> Self {
        Self {
            command: "chatshop".to_string(),
            capability: "lpcpro.shop.admin".to_string(),
            balance_placeholder: "%lpcpro_balance%".to_string(),
        }
    }
}

/// The primary ledger: commands run with console authority.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EconomyLedger {
    /// Command root, without the leading `/`.
    pub command: String,
    /// Display-string lookup; `{currency}` is replaced by the tracked currency.
    pub balance_placeholder: String,
}

impl Default for EconomyLedger {
    fn default() -> Self {
        Self {
            command: "money".to_string(),
            balance_placeholder: "%tne_balance_currency_{currency}%".to_string(),
        }
    }
}

impl EconomyLedger {
    #[must_use]
    pub fn placeholder_for(&self, currency: &str) -> String {
        self.balance_placeholder.replace("{currency}", currency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Delays {
    /// Trigger to execution of a secondary-ledger command.
    pub dispatch: Ticks,
    /// Trigger to execution of a primary-ledger command.
    pub primary_dispatch: Ticks,
    /// Execution to revocation of a temporary capability.
    pub revoke: Ticks,
    /// Session-open signal to the snapshot read.
    pub open_read: Ticks,
    /// Session-close signal to the comparison read.
    pub close_read: Ticks,
    /// Join to the seeding read, so the primary ledger can load the actor.
    pub join_seed: Ticks,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            dispatch: 5,
            primary_dispatch: 1,
            revoke: 5,
            open_read: 5,
            close_read: 10,
            join_seed: 60,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}
