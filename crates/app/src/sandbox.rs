//! An in-memory stand-in for the game server.
//!
//! It owns both ledgers and renders their balances the way the real
//! placeholders do (color codes, markup, thousands separators), so the engine
//! only ever sees the same opaque text it would see in production.

use std::collections::{HashMap, HashSet};

use engine::{
    Actor, BalanceReader, CommandClassifier, CommandMatch, GrantId, Host, Intent, SyncConfig,
    SyncError,
};

#[derive(Debug)]
struct Player {
    actor: Actor,
    online: bool,
    capabilities: HashSet<String>,
}

#[derive(Debug)]
pub struct SandboxHost {
    players: HashMap<String, Player>,
    economy: HashMap<String, f64>,
    shop: HashMap<String, i64>,
    grants: HashMap<GrantId, (String, String)>,
    next_grant: u64,
    economy_vocabulary: CommandClassifier,
    shop_command: String,
    shop_capability: String,
    shop_placeholder: String,
    economy_placeholder: String,
}

impl SandboxHost {
    pub fn new(config: &SyncConfig) -> Self {
        let mut host = Self {
            players: HashMap::new(),
            economy: HashMap::new(),
            shop: HashMap::new(),
            grants: HashMap::new(),
            next_grant: 0,
            economy_vocabulary: CommandClassifier::from_config(config),
            shop_command: String::new(),
            shop_capability: String::new(),
            shop_placeholder: String::new(),
            economy_placeholder: String::new(),
        };
        host.reconfigure(config);
        host
    }

    pub fn reconfigure(&mut self, config: &SyncConfig) {
        self.economy_vocabulary = CommandClassifier::from_config(config);
        self.shop_command = config.shop.command.trim_start_matches('/').to_lowercase();
        self.shop_capability = config.shop.capability.clone();
        self.shop_placeholder = config.shop.balance_placeholder.clone();
        self.economy_placeholder = config.economy.placeholder_for(&config.currency);
    }

    /// Brings `name` online, creating the player on first contact.
    pub fn join(&mut self, name: &str) -> Actor {
        let key = name.to_lowercase();
        let player = self.players.entry(key.clone()).or_insert_with(|| Player {
            actor: Actor::new(name),
            online: false,
            capabilities: HashSet::new(),
        });
        player.online = true;
        self.economy.entry(key.clone()).or_insert(0.0);
        self.shop.entry(key).or_insert(0);
        player.actor.clone()
    }

    pub fn quit(&mut self, name: &str) -> Option<Actor> {
        let player = self.players.get_mut(&name.to_lowercase())?;
        player.online = false;
        Some(player.actor.clone())
    }

    pub fn online(&self, name: &str) -> Option<Actor> {
        self.players
            .get(&name.to_lowercase())
            .filter(|p| p.online)
            .map(|p| p.actor.clone())
    }

    /// Gives `name` a permanent capability.
    pub fn allow(&mut self, name: &str, capability: &str) -> bool {
        match self.players.get_mut(&name.to_lowercase()) {
            Some(player) => player.capabilities.insert(capability.to_string()),
            None => false,
        }
    }

    pub fn economy_balance(&self, name: &str) -> Option<f64> {
        self.economy.get(&name.to_lowercase()).copied()
    }

    pub fn shop_balance(&self, name: &str) -> Option<i64> {
        self.shop.get(&name.to_lowercase()).copied()
    }

    /// Simulates a purchase in the shop. Fails when the balance is too low.
    pub fn buy(&mut self, name: &str, price: i64) -> Result<i64, String> {
        let balance = self
            .shop
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| format!("unknown player {name}"))?;
        if price <= 0 || *balance < price {
            return Err(format!("{name} cannot afford {price}"));
        }
        *balance -= price;
        Ok(*balance)
    }

    /// Lets the economy react to a command line, as the economy plugin would
    /// before the engine observes it.
    pub fn apply_economy(&mut self, line: &str) -> Option<CommandMatch> {
        let line = line.trim();
        let line = if line.starts_with('/') {
            line.to_string()
        } else {
            format!("/{line}")
        };
        let matched = self.economy_vocabulary.classify(&line)?;
        let balance = self.economy.get_mut(&matched.target.to_lowercase())?;
        *balance = match matched.intent {
            Intent::Give => *balance + matched.amount,
            Intent::Take => (*balance - matched.amount).max(0.0),
            Intent::Set => matched.amount,
        };
        tracing::info!("[economy] {} -> {:.2}", line, *balance);
        Some(matched)
    }

    fn apply_shop(&mut self, actor: &Actor, line: &str) -> Result<i64, String> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [root, verb, target, amount] = parts.as_slice() else {
            return Err(format!("usage: {} <give|take|set> <player> <amount>", self.shop_command));
        };
        if !root.eq_ignore_ascii_case(&self.shop_command) {
            return Err(format!("unknown command: {root}"));
        }
        if !self.permitted(actor) {
            return Err(format!("{actor} lacks permission for /{line}"));
        }
        let amount: i64 = amount.parse().map_err(|_| format!("bad amount: {amount}"))?;
        let balance = self
            .shop
            .get_mut(&target.to_lowercase())
            .ok_or_else(|| format!("unknown player {target}"))?;
        *balance = match verb.to_lowercase().as_str() {
            "give" => balance.saturating_add(amount),
            "take" => balance.saturating_sub(amount).max(0),
            "set" => amount,
            other => return Err(format!("unknown action: {other}")),
        };
        Ok(*balance)
    }

    fn permitted(&self, actor: &Actor) -> bool {
        self.has_capability(actor, &self.shop_capability)
    }
}

impl BalanceReader for SandboxHost {
    fn lookup(&self, actor: &Actor, placeholder: &str) -> Result<String, SyncError> {
        let key = actor.name.to_lowercase();
        if placeholder == self.shop_placeholder
            && let Some(balance) = self.shop.get(&key)
        {
            return Ok(format!("<gold>{}</gold>", group_thousands(*balance)));
        }
        if placeholder == self.economy_placeholder
            && let Some(balance) = self.economy.get(&key)
        {
            let whole = balance.trunc() as i64;
            let cents = ((balance.fract() * 100.0).round() as i64).clamp(0, 99);
            return Ok(format!("§a{}.{cents:02}", group_thousands(whole)));
        }
        // Unresolved placeholders come back verbatim.
        Ok(placeholder.to_string())
    }
}

impl Host for SandboxHost {
    fn find_online(&self, name: &str) -> Option<Actor> {
        self.online(name)
    }

    fn has_capability(&self, actor: &Actor, capability: &str) -> bool {
        let key = actor.name.to_lowercase();
        let permanent = self
            .players
            .get(&key)
            .is_some_and(|p| p.capabilities.contains(capability));
        permanent
            || self
                .grants
                .values()
                .any(|(name, granted)| *name == key && granted == capability)
    }

    fn grant_capability(&mut self, actor: &Actor, capability: &str) -> GrantId {
        self.next_grant += 1;
        let grant = GrantId(self.next_grant);
        self.grants
            .insert(grant, (actor.name.to_lowercase(), capability.to_string()));
        grant
    }

    fn revoke_capability(&mut self, _actor: &Actor, grant: GrantId) {
        self.grants.remove(&grant);
    }

    fn perform_as(&mut self, actor: &Actor, command: &str) {
        match self.apply_shop(actor, command) {
            Ok(balance) => tracing::info!("[shop] {actor}: /{command} -> {balance}"),
            Err(err) => tracing::warn!("[shop] {err}"),
        }
    }

    fn dispatch_console(&mut self, command: &str) {
        if self.apply_economy(command).is_none() {
            tracing::warn!("[console] command had no effect: /{command}");
        }
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

#[cfg(test)]
mod tests {
    use engine::{CommandSource, Engine};

    use super::*;

    fn engine() -> Engine<SandboxHost> {
        let config = SyncConfig::default();
        Engine::builder()
            .host(SandboxHost::new(&config))
            .config(config)
            .build()
            .unwrap()
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1234), "1,234");
        assert_eq!(group_thousands(-1234567), "-1,234,567");
    }

    #[test]
    fn balances_render_as_display_text() {
        let mut host = SandboxHost::new(&SyncConfig::default());
        let alice = host.join("Alice");
        host.apply_economy("money give Alice 1234.5 Gems");

        assert_eq!(
            host.lookup(&alice, "%tne_balance_currency_Gems%").unwrap(),
            "§a1,234.50"
        );
        assert_eq!(host.lookup(&alice, "%lpcpro_balance%").unwrap(), "<gold>0</gold>");
        assert_eq!(host.lookup(&alice, "%other%").unwrap(), "%other%");
    }

    #[test]
    fn join_then_give_keeps_ledgers_equal() {
        let mut engine = engine();
        let alice = engine.host_mut().join("Alice");
        engine.host_mut().apply_economy("money set Alice 100 Gems");
        engine.handle_join(&alice);
        engine.settle(500);
        assert_eq!(engine.host().shop_balance("Alice"), Some(100));

        let line = "money give Alice 25 Gems";
        engine.host_mut().apply_economy(line);
        engine.handle_command(&CommandSource::Console, line);
        engine.settle(500);
        assert_eq!(engine.host().shop_balance("Alice"), Some(125));
        assert_eq!(engine.host().economy_balance("Alice"), Some(125.0));
    }

    #[test]
    fn purchase_flows_back_to_economy() {
        let mut engine = engine();
        let alice = engine.host_mut().join("Alice");
        engine.host_mut().apply_economy("money set Alice 300 Gems");
        engine.handle_join(&alice);
        engine.settle(500);

        engine.handle_command(&CommandSource::Player(alice.clone()), "/chatshop");
        engine.settle(500);
        engine.host_mut().buy("Alice", 120).unwrap();
        engine.handle_surface_closed(&alice);
        engine.settle(500);

        assert_eq!(engine.host().economy_balance("Alice"), Some(180.0));
        assert_eq!(engine.host().shop_balance("Alice"), Some(180));
    }

    #[test]
    fn temporary_grant_is_withdrawn() {
        let mut engine = engine();
        let alice = engine.host_mut().join("Alice");
        engine.handle_command(&CommandSource::Console, "money give Alice 5 Gems");
        engine.settle(500);

        assert!(!engine.host().has_capability(&alice, "lpcpro.shop.admin"));
        assert_eq!(engine.host().shop_balance("Alice"), Some(5));
    }
}
