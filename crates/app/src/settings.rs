//! Handles settings for the application. Configuration is written in
//! `config/gemsync.toml` and can be overridden through `GEMSYNC__*`
//! environment variables and command line flags.
//!
//! See `config/gemsync.toml` for the configuration.
use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use engine::SyncConfig;
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/gemsync";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
    /// Wall-clock length of one scheduler tick.
    pub tick_millis: u64,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            tick_millis: 50,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "gemsync", about = "Keeps a shop balance in step with an economy ledger")]
pub struct Args {
    /// Optional config file path (TOML, extension may be omitted).
    #[arg(long, env = "GEMSYNC_CONFIG")]
    pub config: Option<String>,
    /// Override the tracked currency.
    #[arg(long)]
    pub currency: Option<String>,
    /// Override the log level.
    #[arg(long)]
    pub level: Option<String>,
}

impl Settings {
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let mut settings: Settings = Config::builder()
            .add_source(File::with_name(path).required(args.config.is_some()))
            .add_source(Environment::with_prefix("GEMSYNC").separator("__"))
            .build()?
            .try_deserialize()?;

        if let Some(currency) = &args.currency {
            settings.sync.currency = currency.clone();
        }
        if let Some(level) = &args.level {
            settings.app.level = level.clone();
        }

        settings
            .sync
            .validate()
            .map_err(|err| ConfigError::Message(err.to_string()))?;
        Ok(settings)
    }

    /// Filter directive for the log subscriber. The `debug` toggle only
    /// affects the engine.
    pub fn log_filter(&self) -> String {
        let level = &self.app.level;
        let engine = if self.sync.debug { "debug" } else { level.as_str() };
        format!("gemsync={level},engine={engine}")
    }
}
