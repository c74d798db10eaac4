//! Recognizes balance-mutating primary-ledger commands in free text.
//!
//! Two shapes are understood, tried in this order:
//! - `<base> <sub> <actor> <amount> [extra...]`, e.g. `/money give Alice 50 Gems`
//! - `<shorthand> <actor> <amount> [extra...]`, e.g. `/givemoney Alice 50 Gems`
//!
//! A match is only accepted when the tracked currency appears among the extra
//! arguments, which scopes the engine to one currency of a multi-currency
//! ledger.

use std::fmt;

use crate::{Disqualification, Rejection, SyncConfig, config::Vocabulary};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Intent {
    Give,
    Take,
    Set,
}

impl Intent {
    /// Verb used when rebuilding a ledger command line.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Intent::Give => "give",
            Intent::Take => "take",
            Intent::Set => "set",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// A classified command. The amount keeps full precision; truncation happens
/// when the command is turned into a [`SyncAction`](crate::SyncAction).
#[derive(Clone, Debug, PartialEq)]
pub struct CommandMatch {
    pub intent: Intent,
    pub target: String,
    pub amount: f64,
    pub currency: String,
}

/// Token sets checked in a fixed priority order: give, take, set.
#[derive(Clone, Debug, Default)]
struct AliasTable {
    entries: Vec<(Intent, Vec<String>)>,
}

impl AliasTable {
    fn new(give: &[String], take: &[String], set: &[String]) -> Self {
        let lower = |tokens: &[String]| tokens.iter().map(|t| t.trim().to_lowercase()).collect();
        Self {
            entries: vec![
                (Intent::Give, lower(give)),
                (Intent::Take, lower(take)),
                (Intent::Set, lower(set)),
            ],
        }
    }

    fn resolve(&self, token: &str) -> Option<Intent> {
        let token = token.to_lowercase();
        self.entries
            .iter()
            .find(|(_, tokens)| tokens.iter().any(|t| *t == token))
            .map(|(intent, _)| *intent)
    }
}

#[derive(Clone, Debug)]
pub struct CommandClassifier {
    base_commands: Vec<String>,
    sub_commands: AliasTable,
    shorthands: AliasTable,
    currency: String,
}

impl CommandClassifier {
    pub fn new(vocabulary: &Vocabulary, currency: &str) -> Self {
        Self {
            base_commands: vocabulary
                .base_commands
                .iter()
                .map(|b| b.trim().to_lowercase())
                .collect(),
            sub_commands: AliasTable::new(
                &vocabulary.give_aliases,
                &vocabulary.take_aliases,
                &vocabulary.set_aliases,
            ),
            shorthands: AliasTable::new(
                &vocabulary.give_shorthands,
                &vocabulary.take_shorthands,
                &vocabulary.set_shorthands,
            ),
            currency: currency.trim().to_lowercase(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(&config.vocabulary, &config.currency)
    }

    /// Returns the structured command, or `None` when the text is not a
    /// ledger command for the tracked currency.
    pub fn classify(&self, raw: &str) -> Option<CommandMatch> {
        self.try_classify(raw).ok()
    }

    /// Like [`classify`](Self::classify) but tells an unrecognized command
    /// apart from a recognized one that failed validation.
    pub fn try_classify(&self, raw: &str) -> Result<CommandMatch, Rejection> {
        let (intent, args) = self.recognize(raw.trim()).ok_or(Rejection::NoMatch)?;
        tracing::debug!("detected {intent} with {} argument(s): {args:?}", args.len());
        self.validate(intent, &args)
    }

    fn recognize<'a>(&self, text: &'a str) -> Option<(Intent, Vec<&'a str>)> {
        let mut tokens = text.split_whitespace();
        let first = tokens.next()?.to_lowercase();

        if self.base_commands.contains(&first) {
            let mut rest = tokens.clone();
            if let Some(sub) = rest.next()
                && let Some(intent) = self.sub_commands.resolve(sub)
            {
                return Some((intent, rest.collect()));
            }
        }

        let intent = self.shorthands.resolve(&first)?;
        Some((intent, tokens.collect()))
    }

    fn validate(&self, intent: Intent, args: &[&str]) -> Result<CommandMatch, Rejection> {
        let [target, amount_text, extra @ ..] = args else {
            return Err(Disqualification::TooFewArguments(args.len()).into());
        };

        let amount = amount_text
            .parse::<f64>()
            .ok()
            .filter(|amount| amount.is_finite())
            .ok_or_else(|| Disqualification::InvalidAmount((*amount_text).to_string()))?;

        let currency = extra
            .iter()
            .find(|token| token.to_lowercase() == self.currency)
            .ok_or_else(|| Disqualification::CurrencyNotFound(self.currency.clone()))?;

        if amount <= 0.0 {
            return Err(Disqualification::NonPositiveAmount((*amount_text).to_string()).into());
        }

        Ok(CommandMatch {
            intent,
            target: (*target).to_string(),
            amount,
            currency: (*currency).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> CommandClassifier {
        CommandClassifier::from_config(&SyncConfig::default())
    }

    #[test]
    fn base_form_give() {
        let m = classifier().classify("/money give Alice 50 Gems").unwrap();
        assert_eq!(m.intent, Intent::Give);
        assert_eq!(m.target, "Alice");
        assert_eq!(m.amount, 50.0);
        assert_eq!(m.currency, "Gems");
    }

    #[test]
    fn base_and_sub_tokens_ignore_case() {
        let m = classifier().classify("/ECO Remove Bob 12.5 world gems").unwrap();
        assert_eq!(m.intent, Intent::Take);
        assert_eq!(m.target, "Bob");
        assert_eq!(m.amount, 12.5);
    }

    #[test]
    fn symbolic_aliases() {
        let c = classifier();
        assert_eq!(c.classify("/money + A 1 Gems").unwrap().intent, Intent::Give);
        assert_eq!(c.classify("/money - A 1 Gems").unwrap().intent, Intent::Take);
        assert_eq!(c.classify("/money = A 1 Gems").unwrap().intent, Intent::Set);
    }

    #[test]
    fn shorthand_matches_base_form() {
        let c = classifier();
        let short = c.classify("/givemoney Bob 30 Gems").unwrap();
        let long = c.classify("/money give Bob 30 Gems").unwrap();
        assert_eq!(short, long);

        assert_eq!(c.classify("/takebal Bob 3 Gems").unwrap().intent, Intent::Take);
        assert_eq!(c.classify("/EcoSet Bob 3 Gems").unwrap().intent, Intent::Set);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let m = classifier().classify("   /money   give\tAlice  7   Gems  ").unwrap();
        assert_eq!(m.target, "Alice");
        assert_eq!(m.amount, 7.0);
    }

    #[test]
    fn unknown_commands_do_not_match() {
        let c = classifier();
        assert_eq!(c.try_classify("/spawn"), Err(Rejection::NoMatch));
        assert_eq!(c.try_classify("/money"), Err(Rejection::NoMatch));
        assert_eq!(c.try_classify("/money pay Alice 5 Gems"), Err(Rejection::NoMatch));
        assert_eq!(c.try_classify("/moneygiveX Alice 5 Gems"), Err(Rejection::NoMatch));
        assert_eq!(c.try_classify(""), Err(Rejection::NoMatch));
    }

    #[test]
    fn base_prefix_needs_a_token_boundary() {
        assert_eq!(
            classifier().try_classify("/moneys give Alice 5 Gems"),
            Err(Rejection::NoMatch)
        );
    }

    #[test]
    fn too_few_arguments_disqualifies() {
        let c = classifier();
        assert_eq!(
            c.try_classify("/money give Alice"),
            Err(Rejection::from(Disqualification::TooFewArguments(1)))
        );
        assert_eq!(
            c.try_classify("/givemoney"),
            Err(Rejection::from(Disqualification::TooFewArguments(0)))
        );
    }

    #[test]
    fn non_numeric_amount_disqualifies() {
        let c = classifier();
        assert_eq!(
            c.try_classify("/money give Alice lots Gems"),
            Err(Rejection::from(Disqualification::InvalidAmount("lots".to_string())))
        );
        assert!(matches!(
            c.try_classify("/money give Alice NaN Gems"),
            Err(Rejection::Disqualified(Disqualification::InvalidAmount(_)))
        ));
    }

    #[test]
    fn currency_must_follow_amount() {
        let c = classifier();
        assert!(matches!(
            c.try_classify("/money give Alice 5"),
            Err(Rejection::Disqualified(Disqualification::CurrencyNotFound(_)))
        ));
        assert!(matches!(
            c.try_classify("/money give Alice 5 Coins"),
            Err(Rejection::Disqualified(Disqualification::CurrencyNotFound(_)))
        ));
        // An actor literally named like the currency does not count.
        assert!(c.classify("/money give Gems 5").is_none());
    }

    #[test]
    fn non_positive_amount_disqualifies() {
        let c = classifier();
        assert_eq!(
            c.try_classify("/money set Alice 0 Gems"),
            Err(Rejection::from(Disqualification::NonPositiveAmount("0".to_string())))
        );
        assert!(c.classify("/money take Alice -4 Gems").is_none());
    }

    #[test]
    fn precision_is_kept() {
        let m = classifier().classify("/addmoney Alice 9.99 Gems").unwrap();
        assert_eq!(m.amount, 9.99);
    }
}
