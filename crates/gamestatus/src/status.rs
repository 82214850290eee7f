use futures::future::join_all;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::probe::{DirectProbe, RichProbe, ServerDetails};

/// 1 回のプローブで得られたサーバーの状態。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// Steam API から詳細が取れた
    Detailed(ServerDetails),
    /// 直接接続のみ成功した
    Online,
    Offline,
}

impl ProbeResult {
    pub fn is_online(&self) -> bool {
        !matches!(self, Self::Offline)
    }
}

/// サーバーとそのサイクルでの判定結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub name: String,
    pub address: String,
    pub result: ProbeResult,
}

/// 1 台のサーバーの状態を判定する。
///
/// Steam API で情報が取れなければ TCP 接続にフォールバックする。
/// サーバーが本当に落ちている場合と、API に載っていないだけの場合は区別しない。
pub async fn check_server(
    server: &ServerConfig,
    rich: &dyn RichProbe,
    direct: &dyn DirectProbe,
) -> ServerStatus {
    let result = match rich.query(&server.steam_address()).await {
        Some(details) => ProbeResult::Detailed(details),
        None => {
            debug!(server = %server.name, "Falling back to direct connection check");
            if direct.is_reachable(&server.host, server.port).await {
                ProbeResult::Online
            } else {
                ProbeResult::Offline
            }
        }
    };

    info!(server = %server.name, online = result.is_online(), ?result, "Server status checked");

    ServerStatus {
        name: server.name.clone(),
        address: server.address(),
        result,
    }
}

/// 全サーバーを並列にチェックする。結果は設定の順序で返す。
pub async fn check_servers(
    servers: &[ServerConfig],
    rich: &dyn RichProbe,
    direct: &dyn DirectProbe,
) -> Vec<ServerStatus> {
    info!(servers = servers.len(), "Checking server status");

    join_all(
        servers
            .iter()
            .map(|server| check_server(server, rich, direct)),
    )
    .await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// アドレスごとに決められた応答を返すプローブ。呼び出しを記録する。
    #[derive(Default)]
    pub struct FakeProbe {
        pub details: HashMap<String, ServerDetails>,
        pub reachable: Vec<String>,
        pub delays: HashMap<String, Duration>,
        pub rich_calls: Mutex<Vec<String>>,
        pub direct_calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RichProbe for FakeProbe {
        async fn query(&self, address: &str) -> Option<ServerDetails> {
            self.rich_calls.lock().unwrap().push(address.to_string());
            if let Some(delay) = self.delays.get(address) {
                tokio::time::sleep(*delay).await;
            }
            self.details.get(address).cloned()
        }
    }

    #[async_trait]
    impl DirectProbe for FakeProbe {
        async fn is_reachable(&self, host: &str, port: u16) -> bool {
            let address = format!("{host}:{port}");
            self.direct_calls.lock().unwrap().push(address.clone());
            self.reachable.contains(&address)
        }
    }

    pub fn server(name: &str, host: &str, port: u16) -> ServerConfig {
        ServerConfig {
            name: name.to_string(),
            host: host.to_string(),
            port,
            steam_address: None,
        }
    }

    pub fn alpha_details() -> ServerDetails {
        ServerDetails {
            players: 5,
            max_players: 10,
            map: "de_dust2".to_string(),
            name: Some("Alpha".to_string()),
        }
    }

    #[tokio::test]
    async fn rich_details_skip_direct_probe() {
        let probe = FakeProbe {
            details: HashMap::from([("10.0.0.1:27015".to_string(), alpha_details())]),
            ..Default::default()
        };

        let status = check_server(&server("A", "10.0.0.1", 27015), &probe, &probe).await;

        assert_eq!(status.result, ProbeResult::Detailed(alpha_details()));
        assert!(probe.direct_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_direct_probe() {
        let probe = FakeProbe {
            reachable: vec!["10.0.0.2:27015".to_string()],
            ..Default::default()
        };

        let status = check_server(&server("B", "10.0.0.2", 27015), &probe, &probe).await;

        assert_eq!(status.result, ProbeResult::Online);
        assert_eq!(status.name, "B");
        assert_eq!(status.address, "10.0.0.2:27015");
        assert_eq!(*probe.direct_calls.lock().unwrap(), vec!["10.0.0.2:27015"]);
    }

    #[tokio::test]
    async fn both_probes_failing_is_offline() {
        let probe = FakeProbe::default();

        let status = check_server(&server("C", "10.0.0.3", 27015), &probe, &probe).await;

        assert_eq!(status.result, ProbeResult::Offline);
        assert!(!status.result.is_online());
    }

    #[tokio::test]
    async fn steam_address_override_is_used_for_rich_probe() {
        let probe = FakeProbe {
            details: HashMap::from([("203.0.113.5:27015".to_string(), alpha_details())]),
            ..Default::default()
        };
        let config = ServerConfig {
            steam_address: Some("203.0.113.5:27015".to_string()),
            ..server("A", "10.0.0.1", 27015)
        };

        let status = check_server(&config, &probe, &probe).await;

        assert_eq!(status.result, ProbeResult::Detailed(alpha_details()));
        assert_eq!(status.address, "10.0.0.1:27015");
        assert_eq!(*probe.rich_calls.lock().unwrap(), vec!["203.0.113.5:27015"]);
    }

    #[tokio::test]
    async fn results_follow_configuration_order() {
        // 先頭のサーバーの応答を遅らせても順序は変わらない
        let probe = FakeProbe {
            details: HashMap::from([
                ("10.0.0.1:27015".to_string(), alpha_details()),
                ("10.0.0.3:27015".to_string(), alpha_details()),
            ]),
            reachable: vec!["10.0.0.2:27015".to_string()],
            delays: HashMap::from([("10.0.0.1:27015".to_string(), Duration::from_millis(50))]),
            ..Default::default()
        };
        let servers = vec![
            server("A", "10.0.0.1", 27015),
            server("B", "10.0.0.2", 27015),
            server("C", "10.0.0.3", 27015),
            server("D", "10.0.0.4", 27015),
        ];

        let statuses = check_servers(&servers, &probe, &probe).await;

        let names: Vec<_> = statuses.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
        assert_eq!(statuses[1].result, ProbeResult::Online);
        assert_eq!(statuses[3].result, ProbeResult::Offline);
    }

    #[tokio::test]
    async fn no_servers_yields_no_statuses() {
        let probe = FakeProbe::default();
        assert!(check_servers(&[], &probe, &probe).await.is_empty());
    }
}
