//! ゲームサーバーの死活・接続状況を調べるプローブ。
//!
//! Steam Web API による詳細取得 ([`SteamProbe`]) と、
//! TCP 接続のみを確認する直接プローブ ([`TcpProbe`]) の 2 種類がある。

mod direct;
mod steam;

pub use direct::TcpProbe;
pub use steam::SteamProbe;

use async_trait::async_trait;

/// Steam API から得られるサーバーの詳細情報。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDetails {
    pub players: u32,
    pub max_players: u32,
    pub map: String,
    pub name: Option<String>,
}

/// 詳細情報を取得するプローブ。
///
/// 取得できなかった場合は理由を問わず `None` を返す。
/// `None` は「オフライン」ではなく「判定不能」を意味する。
#[async_trait]
pub trait RichProbe: Send + Sync {
    async fn query(&self, address: &str) -> Option<ServerDetails>;
}

/// 接続可否だけを確認するプローブ。
#[async_trait]
pub trait DirectProbe: Send + Sync {
    async fn is_reachable(&self, host: &str, port: u16) -> bool;
}
