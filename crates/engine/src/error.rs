//! The module contains the errors the reconciliation engine can produce.
//!
//! None of them is fatal: every failure resolves to "do nothing this time".
//!
//! - [`Rejection`] the classifier produced no match, either because the input
//!   is not a ledger command or because it failed validation.
//! - [`Unavailable`] an external balance read failed or could not be parsed.
//! - [`Unreachable`] the target actor was offline when a command was due.
//!
//!  [`Unavailable`]: SyncError::Unavailable
//!  [`Unreachable`]: SyncError::Unreachable
use thiserror::Error;

/// Why a recognized ledger command was not acted upon.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Disqualification {
    #[error("expected <actor> <amount>, got {0} argument(s)")]
    TooFewArguments(usize),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("currency '{0}' not found in command arguments")]
    CurrencyNotFound(String),
    #[error("amount is zero or negative: {0}")]
    NonPositiveAmount(String),
}

/// Classifier outcome when no [`CommandMatch`](crate::CommandMatch) is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("not a ledger command")]
    NoMatch,
    #[error(transparent)]
    Disqualified(#[from] Disqualification),
}

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("balance unavailable: {0}")]
    Unavailable(String),
    #[error("\"{0}\" is not reachable")]
    Unreachable(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
