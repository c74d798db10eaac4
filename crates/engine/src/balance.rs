//! Reading balances out of formatted display strings.
//!
//! Neither ledger can be queried directly. A balance is obtained by resolving
//! a placeholder (e.g. `%lpcpro_balance%`) into whatever text the ledger would
//! show a player, then scraping the number back out of it. Readings may be
//! stale; callers treat them as eventually consistent.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Actor, ResultEngine, SyncError};

static COLOR_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"§[0-9a-fk-orxA-FK-ORX]").expect("valid color code regex"));
static MARKUP_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid markup tag regex"));
static UNRESOLVED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%[^%\s]+%").expect("valid placeholder regex"));

/// Display-string lookup into a ledger.
pub trait BalanceReader {
    /// `false` when the lookup provider is missing altogether, in which case
    /// every read is unavailable.
    fn is_available(&self) -> bool {
        true
    }

    /// Resolves `placeholder` for `actor`. Providers commonly hand the
    /// placeholder back untouched when they cannot resolve it.
    fn lookup(&self, actor: &Actor, placeholder: &str) -> ResultEngine<String>;
}

/// Extracts a balance from a display string.
///
/// Cleanup runs in a fixed order: legacy `§` color codes, markup tags,
/// thousands separators, then anything that is not a digit or a dot.
pub fn parse_balance(raw: &str) -> ResultEngine<f64> {
    if raw.trim().is_empty() {
        return Err(SyncError::Unavailable("empty balance string".to_string()));
    }
    if UNRESOLVED_RE.is_match(raw) {
        return Err(SyncError::Unavailable(format!("unresolved placeholder: {raw}")));
    }

    let cleaned = COLOR_CODE_RE.replace_all(raw, "");
    let cleaned = MARKUP_TAG_RE.replace_all(&cleaned, "");
    let cleaned: String = cleaned
        .chars()
        .filter(|c| *c != ',')
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return Err(SyncError::Unavailable(format!("no numeric value in: {raw}")));
    }

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|balance| balance.is_finite())
        .ok_or_else(|| SyncError::Unavailable(format!("unparsable balance: {raw}")))
}

/// Looks `placeholder` up for `actor` and parses the result.
pub fn read_balance<R>(reader: &R, actor: &Actor, placeholder: &str) -> ResultEngine<f64>
where
    R: BalanceReader + ?Sized,
{
    if !reader.is_available() {
        return Err(SyncError::Unavailable("balance lookup provider missing".to_string()));
    }
    let raw = reader.lookup(actor, placeholder)?;
    let balance = parse_balance(&raw);
    if let Err(err) = &balance {
        tracing::debug!("balance read for {actor} via {placeholder} failed: {err}");
    }
    balance
}
