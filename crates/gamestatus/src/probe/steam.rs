//! Steam Web API (`IGameServersService/GetServerList`) によるサーバー情報の取得。

use std::time::Duration;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use tracing::{debug, warn};

use super::{RichProbe, ServerDetails};

#[derive(Debug, Default, Deserialize)]
struct ServerListResponse {
    #[serde(default)]
    response: ServerList,
}

#[derive(Debug, Default, Deserialize)]
struct ServerList {
    #[serde(default)]
    servers: Vec<ServerEntry>,
}

/// 数値フィールドはソースによって数値と文字列の両方があり得る。
#[serde_as]
#[derive(Debug, Deserialize)]
struct ServerEntry {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    players: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    max_players: u32,
    #[serde(default)]
    map: String,
    #[serde(default)]
    name: String,
}

impl From<ServerEntry> for ServerDetails {
    fn from(entry: ServerEntry) -> Self {
        Self {
            players: entry.players,
            max_players: entry.max_players,
            map: entry.map,
            name: Some(entry.name).filter(|n| !n.trim().is_empty()),
        }
    }
}

/// Steam Web API を叩いてサーバー情報を取得するプローブ。
pub struct SteamProbe {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl SteamProbe {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gamestatus/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client for Steam API")?;

        Ok(Self::with_client(http_client, endpoint, api_key))
    }

    /// 構築済みの HTTP クライアントを使う。タイムアウトはクライアント側で設定しておくこと。
    pub fn with_client(
        http_client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    async fn query_inner(&self, address: &str) -> Result<Option<ServerDetails>> {
        let filter = format!("addr\\{address}");
        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("filter", filter.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await
            .context("HTTP request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP status: {}", response.status());
        }

        let body = response
            .text()
            .await
            .context("Failed to read response body")?;
        debug!(address, body = %body, "Steam API response");

        parse_server_list(&body)
    }
}

#[async_trait]
impl RichProbe for SteamProbe {
    async fn query(&self, address: &str) -> Option<ServerDetails> {
        match self.query_inner(address).await {
            Ok(Some(details)) => Some(details),
            Ok(None) => {
                debug!(address, "No server info found via Steam API");
                None
            }
            Err(e) => {
                warn!(address, error = %format!("{e:#}"), "Steam API request failed");
                None
            }
        }
    }
}

/// レスポンス JSON から先頭のサーバー情報を取り出す。
fn parse_server_list(body: &str) -> Result<Option<ServerDetails>> {
    let list: ServerListResponse =
        serde_json::from_str(body).context("Failed to parse Steam API response")?;
    Ok(list.response.servers.into_iter().next().map(Into::into))
}
