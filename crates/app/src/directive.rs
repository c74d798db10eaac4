//! The sandbox's line protocol on stdin.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    Join(String),
    Quit(String),
    /// A player types a command.
    Say { player: String, command: String },
    /// The console runs a command.
    Console(String),
    Buy { player: String, price: i64 },
    /// The player closes an inventory.
    Close(String),
    Allow { player: String, capability: String },
    Balance(String),
    Wait(u64),
    Reload,
    Help,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown directive '{0}', try 'help'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("empty line")]
    Empty,
}

pub const HELP: &str = "\
join <player>                 player connects (seeds the shop)
quit <player>                 player disconnects
say <player> <command...>     player runs a command, e.g. say Alice /chatshop
console <command...>          console runs a command, e.g. console money give Alice 5 Gems
buy <player> <price>          player buys something in the open shop
close <player>                player closes an inventory
allow <player> <capability>   grant a permanent capability
balance <player>              show both ledgers
wait <ticks>                  run the scheduler immediately
reload                        reload configuration
help                          this text";

impl std::str::FromStr for Directive {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (trimmed, ""),
        };
        if head.is_empty() {
            return Err(ParseError::Empty);
        }

        let single = |usage: &'static str| {
            if rest.is_empty() || rest.contains(char::is_whitespace) {
                Err(ParseError::Usage(usage))
            } else {
                Ok(rest.to_string())
            }
        };
        let pair = |usage: &'static str| {
            rest.split_once(char::is_whitespace)
                .map(|(a, b)| (a.to_string(), b.trim().to_string()))
                .filter(|(_, b)| !b.is_empty())
                .ok_or(ParseError::Usage(usage))
        };

        match head.to_lowercase().as_str() {
            "join" => single("join <player>").map(Directive::Join),
            "quit" => single("quit <player>").map(Directive::Quit),
            "close" => single("close <player>").map(Directive::Close),
            "balance" => single("balance <player>").map(Directive::Balance),
            "say" => pair("say <player> <command...>")
                .map(|(player, command)| Directive::Say { player, command }),
            "console" if !rest.is_empty() => Ok(Directive::Console(rest.to_string())),
            "console" => Err(ParseError::Usage("console <command...>")),
            "buy" => {
                let (player, price) = pair("buy <player> <price>")?;
                let price = price
                    .parse()
                    .map_err(|_| ParseError::Usage("buy <player> <price>"))?;
                Ok(Directive::Buy { player, price })
            }
            "allow" => pair("allow <player> <capability>")
                .map(|(player, capability)| Directive::Allow { player, capability }),
            "wait" => single("wait <ticks>")?
                .parse()
                .map(Directive::Wait)
                .map_err(|_| ParseError::Usage("wait <ticks>")),
            "reload" => Ok(Directive::Reload),
            "help" | "?" => Ok(Directive::Help),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_command_keeps_its_text() {
        let parsed: Directive = "say Alice  /chatshop colors".parse().unwrap();
        assert_eq!(
            parsed,
            Directive::Say {
                player: "Alice".to_string(),
                command: "/chatshop colors".to_string()
            }
        );
    }

    #[test]
    fn console_takes_the_rest_of_the_line() {
        let parsed: Directive = "console money give Alice 5 Gems".parse().unwrap();
        assert_eq!(parsed, Directive::Console("money give Alice 5 Gems".to_string()));
    }

    #[test]
    fn buy_needs_a_number() {
        assert_eq!(
            "buy Alice 30".parse::<Directive>().unwrap(),
            Directive::Buy {
                player: "Alice".to_string(),
                price: 30
            }
        );
        assert!(matches!(
            "buy Alice lots".parse::<Directive>(),
            Err(ParseError::Usage(_))
        ));
    }

    #[test]
    fn rejects_unknown_and_empty() {
        assert_eq!("".parse::<Directive>(), Err(ParseError::Empty));
        assert!(matches!(
            "fly Alice".parse::<Directive>(),
            Err(ParseError::Unknown(_))
        ));
        assert!(matches!(
            "join".parse::<Directive>(),
            Err(ParseError::Usage(_))
        ));
    }
}
