use std::{io, time::Duration};

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

use super::DirectProbe;

/// TCP 接続が確立できるかどうかでサーバーの死活を判定する。
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl DirectProbe for TcpProbe {
    async fn is_reachable(&self, host: &str, port: u16) -> bool {
        connect_within(self.timeout, host, port, TcpStream::connect((host, port))).await
    }
}

/// 接続処理を `timeout` 以内に終えられたかどうかを返す。
async fn connect_within<S>(
    timeout: Duration,
    host: &str,
    port: u16,
    connect: impl Future<Output = io::Result<S>>,
) -> bool {
    match tokio::time::timeout(timeout, connect).await {
        // 接続できたらデータは送らずにそのまま閉じる
        Ok(Ok(stream)) => {
            drop(stream);
            true
        }
        Ok(Err(e)) => {
            debug!(host, port, error = %e, "Direct connection failed");
            false
        }
        Err(_) => {
            debug!(host, port, timeout = ?timeout, "Direct connection timed out");
            false
        }
    }
}
