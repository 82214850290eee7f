use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

const PLACEHOLDER_WEBHOOK_URL: &str = "YOUR_DISCORD_WEBHOOK_URL";
const PLACEHOLDER_API_KEY: &str = "YOUR_STEAM_WEB_API_KEY";

/// 1 つの埋め込みに載せられるフィールド数の上限 (Discord の制限)
pub const MAX_SERVERS: usize = 25;

pub const DEFAULT_STEAM_ENDPOINT: &str =
    "https://api.steampowered.com/IGameServersService/GetServerList/v1/";

/// 環境変数で上書きできる設定値
pub const ENV_WEBHOOK_URL: &str = "DISCORD_WEBHOOK_URL";
pub const ENV_STEAM_API_KEY: &str = "STEAM_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub discord: DiscordConfig,
    pub steam: SteamConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub labels: Labels,
    pub servers: Vec<ServerConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: PLACEHOLDER_WEBHOOK_URL.to_string(),
            username: Some("CS2 Server Status Bot".to_string()),
            avatar_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SteamConfig {
    pub api_key: String,
    #[serde(default = "default_steam_endpoint")]
    pub endpoint: String,
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            api_key: PLACEHOLDER_API_KEY.to_string(),
            endpoint: default_steam_endpoint(),
        }
    }
}

fn default_steam_endpoint() -> String {
    DEFAULT_STEAM_ENDPOINT.to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StatusConfig {
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    pub probe_timeout: Duration,
    #[serde(default = "default_message_id_file")]
    pub message_id_file: PathBuf,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            probe_timeout: default_probe_timeout(),
            message_id_file: default_message_id_file(),
        }
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_message_id_file() -> PathBuf {
    PathBuf::from("last_message_id.txt")
}

/// 監視対象のゲームサーバー
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Steam API の `addr\` フィルタに渡すアドレス。省略時は `host:port`。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam_address: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "example-server".to_string(),
            host: "192.168.1.100".to_string(),
            port: 27015,
            steam_address: None,
        }
    }
}

impl ServerConfig {
    /// 直接接続に使う `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Steam API での検索キー
    pub fn steam_address(&self) -> String {
        self.steam_address.clone().unwrap_or_else(|| self.address())
    }
}

/// 通知メッセージに表示する文言。未指定のキーは英語の既定値になる。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Labels {
    pub title: String,
    pub description: String,
    pub footer: String,
    pub online: String,
    pub offline: String,
    pub details_unavailable: String,
    pub players: String,
    pub map: String,
    pub name: String,
    pub not_available: String,
    pub total_players: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            title: "CS2 Servers Status".to_string(),
            description: "Current status of all monitored servers".to_string(),
            footer: "CS2 Server Status Bot".to_string(),
            online: "Online".to_string(),
            offline: "Offline".to_string(),
            details_unavailable: "Detailed info unavailable".to_string(),
            players: "Players".to_string(),
            map: "Map".to_string(),
            name: "Name".to_string(),
            not_available: "N/A".to_string(),
            total_players: "Total players".to_string(),
        }
    }
}

impl Config {
    /// 環境変数の値で秘匿情報を上書きする。
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_WEBHOOK_URL).filter(|v| !v.trim().is_empty()) {
            self.discord.webhook_url = url;
        }
        if let Some(key) = lookup(ENV_STEAM_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.steam.api_key = key;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.discord.webhook_url.trim();
        if url.is_empty() || url == PLACEHOLDER_WEBHOOK_URL {
            bail!("discord.webhook_url is not set (or set {ENV_WEBHOOK_URL})");
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            bail!("discord.webhook_url must be an http(s) URL");
        }

        let key = self.steam.api_key.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            bail!("steam.api_key is not set (or set {ENV_STEAM_API_KEY})");
        }

        if self.servers.is_empty() {
            bail!("At least one [[servers]] entry is required");
        }
        if self.servers.len() > MAX_SERVERS {
            bail!(
                "Too many [[servers]] entries ({}), at most {MAX_SERVERS} fit in one message",
                self.servers.len()
            );
        }
        for server in &self.servers {
            if server.name.trim().is_empty() {
                bail!("Server name must not be empty");
            }
            if server.host.trim().is_empty() {
                bail!("Server '{}' has an empty host", server.name);
            }
            if server.port == 0 {
                bail!("Server '{}' has an invalid port 0", server.name);
            }
        }

        if self.status.interval.is_zero() {
            bail!("status.interval must be greater than zero");
        }
        if self.status.probe_timeout.is_zero() {
            bail!("status.probe_timeout must be greater than zero");
        }

        Ok(())
    }
}

/// 設定ファイルを読み込み、環境変数での上書きと検証を行う。
pub fn open_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
    let mut config: Config =
        toml::from_str(&content).context("Failed to parse configuration file")?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

pub fn write_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let config = Config {
        servers: vec![ServerConfig::default()],
        ..Default::default()
    };
    let content = toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
    fs::write(path.as_ref(), content).context("Failed to write configuration file")?;
    Ok(())
}
