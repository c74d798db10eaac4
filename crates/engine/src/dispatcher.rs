//! Turns sync actions into ledger command lines and runs them.

use std::fmt;

use crate::{
    Actor, Host, Intent, ResultEngine, SyncConfig, SyncError,
    config::Ticks,
    scheduler::{Scheduler, Task},
};

/// A correction to apply to one ledger. Amounts are whole units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncAction {
    Give(u64),
    Take(u64),
    Set(u64),
}

impl SyncAction {
    /// Truncates `amount` towards zero. Amounts that truncate to nothing give
    /// no action at all, whatever the intent.
    #[must_use]
    pub fn from_amount(intent: Intent, amount: f64) -> Option<Self> {
        let whole = amount.trunc();
        if !whole.is_finite() || whole < 1.0 {
            return None;
        }
        // Saturates above u64::MAX.
        let units = whole as u64;
        Some(match intent {
            Intent::Give => SyncAction::Give(units),
            Intent::Take => SyncAction::Take(units),
            Intent::Set => SyncAction::Set(units),
        })
    }

    #[must_use]
    pub const fn intent(self) -> Intent {
        match self {
            SyncAction::Give(_) => Intent::Give,
            SyncAction::Take(_) => Intent::Take,
            SyncAction::Set(_) => Intent::Set,
        }
    }

    #[must_use]
    pub const fn amount(self) -> u64 {
        match self {
            SyncAction::Give(amount) | SyncAction::Take(amount) | SyncAction::Set(amount) => {
                amount
            }
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.intent().verb().to_uppercase(), self.amount())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ledger {
    /// Authoritative economy, mutated with console authority.
    Primary,
    /// Shop balance, mutated as the target actor.
    Secondary,
}

/// Handle of a temporary capability attached by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GrantId(pub u64);

/// A fully built command, waiting in the scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerCommand {
    pub ledger: Ledger,
    pub target: String,
    pub action: SyncAction,
    /// The command line without a leading `/`.
    pub line: String,
}

#[derive(Clone, Debug)]
pub struct ActionDispatcher {
    shop_command: String,
    capability: String,
    economy_command: String,
    currency: String,
    dispatch_delay: Ticks,
    primary_delay: Ticks,
    revoke_delay: Ticks,
}

impl ActionDispatcher {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            shop_command: config.shop.command.trim().trim_start_matches('/').to_string(),
            capability: config.shop.capability.clone(),
            economy_command: config.economy.command.trim().trim_start_matches('/').to_string(),
            currency: config.currency.trim().to_string(),
            dispatch_delay: config.delays.dispatch,
            primary_delay: config.delays.primary_dispatch,
            revoke_delay: config.delays.revoke,
        }
    }

    pub fn command_line(&self, target: &str, action: SyncAction, ledger: Ledger) -> String {
        let verb = action.intent().verb();
        let amount = action.amount();
        match ledger {
            Ledger::Secondary => format!("{} {verb} {target} {amount}", self.shop_command),
            Ledger::Primary => format!(
                "{} {verb} {target} {amount} {}",
                self.economy_command, self.currency
            ),
        }
    }

    /// Builds the command for `action` and queues it. Nothing runs before the
    /// next tick.
    pub fn dispatch(
        &self,
        scheduler: &mut Scheduler<Task>,
        target: &str,
        action: SyncAction,
        ledger: Ledger,
    ) -> LedgerCommand {
        let command = LedgerCommand {
            ledger,
            target: target.to_string(),
            action,
            line: self.command_line(target, action, ledger),
        };
        let delay = match ledger {
            Ledger::Primary => self.primary_delay,
            Ledger::Secondary => self.dispatch_delay,
        };
        tracing::debug!("dispatching sync command: /{}", command.line);
        scheduler.schedule(delay, Task::Execute(command.clone()));
        command
    }

    /// Runs a due command against the host.
    ///
    /// Shop commands run as the target actor, who gets the shop capability
    /// for the duration when missing it. An offline target abandons the
    /// command; the next join seeds the shop balance instead.
    pub fn execute<H>(
        &self,
        host: &mut H,
        scheduler: &mut Scheduler<Task>,
        command: &LedgerCommand,
    ) -> ResultEngine<()>
    where
        H: Host + ?Sized,
    {
        match command.ledger {
            Ledger::Primary => {
                host.dispatch_console(&command.line);
                tracing::debug!("primary ledger command executed: /{}", command.line);
                Ok(())
            }
            Ledger::Secondary => {
                let Some(actor) = host.find_online(&command.target) else {
                    return Err(SyncError::Unreachable(command.target.clone()));
                };
                let grant = self.elevate(host, &actor);
                host.perform_as(&actor, &command.line);
                tracing::debug!("executed as {actor}: /{}", command.line);
                if let Some(grant) = grant {
                    scheduler.schedule(self.revoke_delay, Task::Revoke { actor, grant });
                }
                Ok(())
            }
        }
    }

    fn elevate<H>(&self, host: &mut H, actor: &Actor) -> Option<GrantId>
    where
        H: Host + ?Sized,
    {
        if host.has_capability(actor, &self.capability) {
            return None;
        }
        let grant = host.grant_capability(actor, &self.capability);
        tracing::debug!("granted temporary {} to {actor}", self.capability);
        Some(grant)
    }

    pub fn revoke<H>(&self, host: &mut H, actor: &Actor, grant: GrantId)
    where
        H: Host + ?Sized,
    {
        host.revoke_capability(actor, grant);
        tracing::debug!("removed temporary {} from {actor}", self.capability);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BalanceReader;

    /// A host where nobody is online.
    struct Empty;

    impl BalanceReader for Empty {
        fn lookup(&self, _actor: &Actor, placeholder: &str) -> ResultEngine<String> {
            Ok(placeholder.to_string())
        }
    }

    impl Host for Empty {
        fn find_online(&self, _name: &str) -> Option<Actor> {
            None
        }

        fn has_capability(&self, _actor: &Actor, _capability: &str) -> bool {
            false
        }

        fn grant_capability(&mut self, _actor: &Actor, _capability: &str) -> GrantId {
            panic!("no grant expected")
        }

        fn revoke_capability(&mut self, _actor: &Actor, _grant: GrantId) {}

        fn perform_as(&mut self, _actor: &Actor, command: &str) {
            panic!("unexpected command: {command}")
        }

        fn dispatch_console(&mut self, _command: &str) {}
    }

    fn dispatcher() -> ActionDispatcher {
        ActionDispatcher::from_config(&SyncConfig::default())
    }

    #[test]
    fn truncates_towards_zero() {
        assert_eq!(SyncAction::from_amount(Intent::Give, 50.9), Some(SyncAction::Give(50)));
        assert_eq!(SyncAction::from_amount(Intent::Set, 1.0), Some(SyncAction::Set(1)));
    }

    #[test]
    fn fractions_below_one_give_no_action() {
        assert_eq!(SyncAction::from_amount(Intent::Give, 0.5), None);
        assert_eq!(SyncAction::from_amount(Intent::Set, 0.99), None);
        assert_eq!(SyncAction::from_amount(Intent::Take, -3.0), None);
        assert_eq!(SyncAction::from_amount(Intent::Take, f64::NAN), None);
    }

    #[test]
    fn shop_command_line() {
        assert_eq!(
            dispatcher().command_line("Alice", SyncAction::Give(50), Ledger::Secondary),
            "chatshop give Alice 50"
        );
    }

    #[test]
    fn economy_command_line_names_currency() {
        assert_eq!(
            dispatcher().command_line("Alice", SyncAction::Take(234), Ledger::Primary),
            "money take Alice 234 Gems"
        );
    }

    #[test]
    fn dispatch_is_deferred() {
        let mut scheduler = Scheduler::new();
        let command = dispatcher().dispatch(
            &mut scheduler,
            "Bob",
            SyncAction::Set(7),
            Ledger::Secondary,
        );
        assert_eq!(command.line, "chatshop set Bob 7");
        assert_eq!(scheduler.pending(), 1);
        for _ in 0..4 {
            assert!(scheduler.advance().is_empty());
        }
        assert_eq!(scheduler.advance(), vec![Task::Execute(command)]);
    }

    #[test]
    fn offline_target_is_unreachable() {
        let mut scheduler = Scheduler::new();
        let dispatcher = dispatcher();
        let command =
            dispatcher.dispatch(&mut scheduler, "Alice", SyncAction::Give(5), Ledger::Secondary);
        scheduler.advance();

        let err = dispatcher
            .execute(&mut Empty, &mut scheduler, &command)
            .unwrap_err();
        assert_eq!(err, SyncError::Unreachable("Alice".to_string()));
    }
}
