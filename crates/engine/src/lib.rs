//! Keeps a shop ledger and an economy ledger in step when neither can be
//! queried or subscribed to.
//!
//! The [`Engine`] reacts to three kinds of input:
//!
//! - command lines typed by players or the console, scanned for economy
//!   give/take/set commands that are mirrored onto the shop ledger;
//! - shop-open and inventory-close signals, used to detect spending in the
//!   shop and deduct it from the economy;
//! - joins, which seed the shop balance from the economy once.
//!
//! Every side effect is deferred through the engine's own [`Scheduler`] and
//! happens when the host calls [`Engine::tick`].

use std::fmt;

pub use actor::Actor;
pub use balance::{BalanceReader, parse_balance, read_balance};
pub use classifier::{CommandClassifier, CommandMatch, Intent};
pub use config::{SyncConfig, Ticks};
pub use dispatcher::{ActionDispatcher, GrantId, Ledger, LedgerCommand, SyncAction};
pub use error::{Disqualification, Rejection, SyncError};
pub use host::Host;
pub use scheduler::{Scheduler, Task};
pub use session::{Session, SessionTracker};

mod actor;
mod balance;
mod classifier;
pub mod config;
mod dispatcher;
mod error;
mod host;
mod scheduler;
mod session;

type ResultEngine<T> = Result<T, SyncError>;

/// Where an inbound command line came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandSource {
    Player(Actor),
    Console,
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandSource::Player(actor) => write!(f, "player:{}", actor.name),
            CommandSource::Console => f.write_str("console"),
        }
    }
}

#[derive(Debug)]
pub struct Engine<H: Host> {
    config: SyncConfig,
    classifier: CommandClassifier,
    dispatcher: ActionDispatcher,
    sessions: SessionTracker,
    scheduler: Scheduler<Task>,
    seeding: bool,
    host: H,
}

impl<H: Host> Engine<H> {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder<H> {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    pub fn scheduler(&self) -> &Scheduler<Task> {
        &self.scheduler
    }

    /// Whether joins currently seed the shop ledger.
    pub fn seeding_enabled(&self) -> bool {
        self.seeding
    }

    /// Swaps the configuration. Open sessions and queued tasks are kept.
    pub fn reload(&mut self, config: SyncConfig) -> ResultEngine<()> {
        config.validate()?;
        self.classifier = CommandClassifier::from_config(&config);
        self.dispatcher = ActionDispatcher::from_config(&config);
        self.sessions.set_placeholder(config.shop.balance_placeholder.clone());
        self.seeding = seeding_enabled(&config, &self.host);
        self.config = config;
        tracing::info!(
            "configuration reloaded, tracking currency '{}'",
            self.config.currency
        );
        Ok(())
    }

    /// Feeds one inbound command line to the engine.
    ///
    /// Console lines may come without their leading `/`. A player line that
    /// opens the shop starts a session. A give/take/set of the tracked
    /// currency is mirrored onto the shop ledger and the queued command is
    /// returned. Identical lines are never deduplicated.
    pub fn handle_command(&mut self, source: &CommandSource, raw: &str) -> Option<LedgerCommand> {
        let trimmed = raw.trim();
        let line = match source {
            CommandSource::Console if !trimmed.starts_with('/') => format!("/{trimmed}"),
            _ => trimmed.to_string(),
        };
        tracing::debug!("{source} command detected: {line}");

        if let CommandSource::Player(actor) = source
            && self.opens_session(&line)
        {
            self.scheduler
                .schedule(self.config.delays.open_read, Task::OpenSession(actor.clone()));
        }

        let matched = match self.classifier.try_classify(&line) {
            Ok(matched) => matched,
            Err(Rejection::NoMatch) => return None,
            Err(Rejection::Disqualified(reason)) => {
                tracing::debug!("ignoring {line}: {reason}");
                return None;
            }
        };

        let Some(action) = SyncAction::from_amount(matched.intent, matched.amount) else {
            tracing::debug!("ignoring {line}: amount {} truncates to zero", matched.amount);
            return None;
        };

        tracing::info!(
            "Syncing {action} {} for {} to the shop (source: {source})",
            self.config.currency,
            matched.target
        );
        Some(self.dispatcher.dispatch(
            &mut self.scheduler,
            &matched.target,
            action,
            Ledger::Secondary,
        ))
    }

    /// An inventory-like surface was closed by `actor`. Only matters while a
    /// shopping session is open; returns whether a check was queued.
    pub fn handle_surface_closed(&mut self, actor: &Actor) -> bool {
        if !self.sessions.contains(&actor.id) {
            return false;
        }
        self.scheduler
            .schedule(self.config.delays.close_read, Task::CloseSession(actor.clone()));
        true
    }

    /// `actor` (re)joined. Queues a one-shot seeding of the shop balance;
    /// returns whether one was queued.
    pub fn handle_join(&mut self, actor: &Actor) -> bool {
        if !self.seeding {
            return false;
        }
        self.scheduler
            .schedule(self.config.delays.join_seed, Task::SeedBalance(actor.clone()));
        true
    }

    /// Whether `line` is one of the configured shop-open commands.
    pub fn opens_session(&self, line: &str) -> bool {
        let line = line.trim().to_lowercase();
        let triggers = &self.config.session;
        triggers
            .open_commands
            .iter()
            .any(|command| line == command.trim().to_lowercase())
            || triggers
                .open_prefixes
                .iter()
                .any(|prefix| line.starts_with(&prefix.trim().to_lowercase()))
    }

    /// Advances the scheduler by one tick and runs every task that fell due.
    /// Returns how many tasks ran.
    pub fn tick(&mut self) -> usize {
        let due = self.scheduler.advance();
        let count = due.len();
        for task in due {
            self.run(task);
        }
        count
    }

    /// Runs `ticks` ticks.
    pub fn advance(&mut self, ticks: Ticks) -> usize {
        (0..ticks).map(|_| self.tick()).sum()
    }

    /// Ticks until nothing is queued, at most `limit` ticks. Returns the ticks
    /// spent.
    pub fn settle(&mut self, limit: Ticks) -> Ticks {
        let mut spent = 0;
        while !self.scheduler.is_idle() && spent < limit {
            self.tick();
            spent += 1;
        }
        spent
    }

    fn run(&mut self, task: Task) {
        match task {
            Task::OpenSession(actor) => {
                self.sessions.open(&actor, &self.host);
            }
            Task::CloseSession(actor) => self.settle_spending(&actor),
            Task::SeedBalance(actor) => self.seed(&actor),
            Task::Execute(command) => {
                if let Err(err) = self
                    .dispatcher
                    .execute(&mut self.host, &mut self.scheduler, &command)
                {
                    tracing::info!("{err}. Balance will sync on next join.");
                }
            }
            Task::Revoke { actor, grant } => self.dispatcher.revoke(&mut self.host, &actor, grant),
        }
    }

    fn settle_spending(&mut self, actor: &Actor) {
        let Some(spent) = self.sessions.close(actor, &self.host) else {
            return;
        };
        tracing::info!(
            "{actor} spent {spent} {} in the shop. Deducting from the economy.",
            self.config.currency
        );
        self.dispatcher.dispatch(
            &mut self.scheduler,
            &actor.name,
            SyncAction::Take(spent),
            Ledger::Primary,
        );
    }

    fn seed(&mut self, actor: &Actor) {
        let placeholder = self.config.economy.placeholder_for(&self.config.currency);
        let balance = match read_balance(&self.host, actor, &placeholder) {
            Ok(balance) => balance,
            Err(err) => {
                tracing::debug!("join sync for {actor} skipped: {err}");
                return;
            }
        };
        if balance < 0.0 {
            return;
        }
        tracing::debug!(
            "parsed {} balance for {actor}: {balance}",
            self.config.currency
        );
        // A zero balance is a real value here, unlike in forwarded commands.
        let action = SyncAction::Set(balance.trunc() as u64);
        self.dispatcher
            .dispatch(&mut self.scheduler, &actor.name, action, Ledger::Secondary);
    }
}

fn seeding_enabled<H: Host>(config: &SyncConfig, host: &H) -> bool {
    if !config.sync_on_join {
        return false;
    }
    if !host.is_available() {
        tracing::warn!("balance lookup provider not found - join sync is disabled.");
        return false;
    }
    true
}

/// The builder for `Engine`
pub struct EngineBuilder<H: Host> {
    config: SyncConfig,
    host: Option<H>,
}

impl<H: Host> Default for EngineBuilder<H> {
    fn default() -> Self {
        Self {
            config: SyncConfig::default(),
            host: None,
        }
    }
}

impl<H: Host> EngineBuilder<H> {
    pub fn config(mut self, config: SyncConfig) -> EngineBuilder<H> {
        self.config = config;
        self
    }

    /// Pass the required host
    pub fn host(mut self, host: H) -> EngineBuilder<H> {
        self.host = Some(host);
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> ResultEngine<Engine<H>> {
        self.config.validate()?;
        let host = self
            .host
            .ok_or_else(|| SyncError::InvalidConfig("missing host".to_string()))?;

        let seeding = seeding_enabled(&self.config, &host);
        tracing::info!(
            "engine ready, syncing currency '{}' with the shop",
            self.config.currency
        );

        Ok(Engine {
            classifier: CommandClassifier::from_config(&self.config),
            dispatcher: ActionDispatcher::from_config(&self.config),
            sessions: SessionTracker::new(self.config.shop.balance_placeholder.clone()),
            scheduler: Scheduler::new(),
            seeding,
            host,
            config: self.config,
        })
    }
}
