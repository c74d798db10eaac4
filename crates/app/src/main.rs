use std::time::Duration;

use clap::Parser;
use engine::{CommandSource, Engine};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

use directive::{Directive, HELP};
use sandbox::SandboxHost;
use settings::{Args, Settings};

mod directive;
mod sandbox;
mod settings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type LogHandle = reload::Handle<EnvFilter, Registry>;

/// Upper bound on ticks run after stdin closes.
const SETTLE_LIMIT: u64 = 10_000;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    let settings = Settings::load(&args)?;

    let (filter, log_handle) = reload::Layer::new(EnvFilter::try_new(settings.log_filter())?);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let mut engine = Engine::builder()
        .host(SandboxHost::new(&settings.sync))
        .config(settings.sync.clone())
        .build()?;

    let mut ticker = tokio::time::interval(Duration::from_millis(settings.app.tick_millis.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    tracing::info!("Sandbox ready, type 'help' for the list of directives.");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                engine.tick();
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<Directive>() {
                        Ok(directive) => apply(&mut engine, directive, &args, &log_handle),
                        Err(err) => println!("{err}"),
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::error!("failed to read stdin: {err}");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let spent = engine.settle(SETTLE_LIMIT);
    tracing::info!("Stopped after settling {spent} tick(s).");
    Ok(())
}

fn apply(engine: &mut Engine<SandboxHost>, directive: Directive, args: &Args, log: &LogHandle) {
    match directive {
        Directive::Join(name) => {
            let actor = engine.host_mut().join(&name);
            engine.handle_join(&actor);
            println!("{actor} joined");
        }
        Directive::Quit(name) => match engine.host_mut().quit(&name) {
            Some(actor) => println!("{actor} left"),
            None => println!("unknown player {name}"),
        },
        Directive::Say { player, command } => {
            let Some(actor) = engine.host().online(&player) else {
                println!("{player} is not online");
                return;
            };
            engine.host_mut().apply_economy(&command);
            engine.handle_command(&CommandSource::Player(actor), &command);
        }
        Directive::Console(command) => {
            engine.host_mut().apply_economy(&command);
            engine.handle_command(&CommandSource::Console, &command);
        }
        Directive::Buy { player, price } => match engine.host_mut().buy(&player, price) {
            Ok(balance) => println!("{player} spent {price}, shop balance is now {balance}"),
            Err(err) => println!("{err}"),
        },
        Directive::Close(player) => {
            let Some(actor) = engine.host().online(&player) else {
                println!("{player} is not online");
                return;
            };
            if !engine.handle_surface_closed(&actor) {
                tracing::debug!("{actor} closed an inventory outside the shop");
            }
        }
        Directive::Allow { player, capability } => {
            if engine.host_mut().allow(&player, &capability) {
                println!("{player} now has {capability}");
            } else {
                println!("nothing to grant to {player}");
            }
        }
        Directive::Balance(player) => {
            let host = engine.host();
            match (host.economy_balance(&player), host.shop_balance(&player)) {
                (Some(economy), Some(shop)) => println!(
                    "{player}: economy {economy:.2} {}, shop {shop}",
                    engine.config().currency
                ),
                _ => println!("unknown player {player}"),
            }
        }
        Directive::Wait(ticks) => {
            let ran = engine.advance(ticks);
            println!("ran {ran} task(s) in {ticks} tick(s)");
        }
        Directive::Reload => match reload(engine, args, log) {
            Ok(()) => println!("configuration reloaded"),
            Err(err) => println!("reload failed: {err}"),
        },
        Directive::Help => println!("{HELP}"),
    }
}

fn reload(engine: &mut Engine<SandboxHost>, args: &Args, log: &LogHandle) -> Result<(), BoxError> {
    let settings = Settings::load(args)?;
    log.reload(EnvFilter::try_new(settings.log_filter())?)?;
    engine.host_mut().reconfigure(&settings.sync);
    engine.reload(settings.sync)?;
    Ok(())
}
