use anyhow::{anyhow, Result};
use clap::Parser;
use phxmux_client::{ClientConfig, DEFAULT_JOIN_ACK_EVENT};
use serde_derive::Deserialize;
use std::path::Path;
use std::time::Duration;

pub(crate) const DEFAULT_CONFIG_FILE: &str = "phxmux.toml";

/// Manual client of multiplexed channels, commands are read from stdin
#[derive(Parser, Debug)]
#[command(name = "phxmux")]
#[command(version, about, long_about = None)]
pub(crate) struct Cli {
    /// Path to the config file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub(crate) config_file_path: Option<String>,

    /// WebSocket endpoint, overrides the config file
    #[arg(long = "url")]
    pub(crate) url: Option<String>,

    /// Authentication token, overrides the config file
    #[arg(long = "token")]
    pub(crate) token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) connection: Connection,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Connection {
    #[serde(default = "default_url")]
    pub(crate) url: String,
    pub(crate) token: Option<String>,
    /// Zero disables the heartbeats.
    #[serde(default = "default_heartbeat_secs")]
    pub(crate) heartbeat_secs: u64,
    #[serde(default = "default_join_ack_event")]
    pub(crate) join_ack_event: String,
}

impl Default for Connection {
    fn default() -> Self {
        Connection {
            url: default_url(),
            token: None,
            heartbeat_secs: default_heartbeat_secs(),
            join_ack_event: default_join_ack_event(),
        }
    }
}

fn default_url() -> String {
    "ws://localhost:4000/socket/websocket".to_string()
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_join_ack_event() -> String {
    DEFAULT_JOIN_ACK_EVENT.to_string()
}

impl Connection {
    pub(crate) fn client_config(&self, token: &str) -> ClientConfig {
        let heartbeat = match self.heartbeat_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        ClientConfig::new(&self.url)
            .token(token)
            .heartbeat(heartbeat)
            .join_ack_event(&self.join_ack_event)
    }
}

pub(crate) fn parse_config(path: &str) -> Result<Config> {
    let cfg = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&cfg)?)
}

pub(crate) fn cli() -> Cli {
    Cli::parse()
}

/// Reads the config file and applies the command line overrides. The default
/// config file may be missing if the URL is given on the command line.
pub(crate) fn load(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config_file_path {
        Some(path) => parse_config(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => parse_config(DEFAULT_CONFIG_FILE)?,
        None if cli.url.is_some() => Config::default(),
        None => return Err(anyhow!("{} not found, give a config file or --url", DEFAULT_CONFIG_FILE)),
    };

    if let Some(url) = &cli.url {
        config.connection.url = url.clone();
    }

    if let Some(token) = &cli.token {
        config.connection.token = Some(token.clone());
    }

    Ok(config)
}
