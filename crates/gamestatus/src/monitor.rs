use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::config::{Labels, ServerConfig};
use crate::probe::{DirectProbe, RichProbe};
use crate::publisher::{PublishOutcome, Publisher};
use crate::report::render;
use crate::status::check_servers;

/// 監視サイクルに必要なものを束ねたコンテキスト。
pub struct Monitor {
    servers: Vec<ServerConfig>,
    labels: Labels,
    rich: Arc<dyn RichProbe>,
    direct: Arc<dyn DirectProbe>,
    publisher: Publisher,
}

impl Monitor {
    pub fn new(
        servers: Vec<ServerConfig>,
        labels: Labels,
        rich: Arc<dyn RichProbe>,
        direct: Arc<dyn DirectProbe>,
        publisher: Publisher,
    ) -> Self {
        Self {
            servers,
            labels,
            rich,
            direct,
            publisher,
        }
    }

    /// チェック、メッセージ生成、送信を 1 回行う。
    pub async fn run_cycle(&self) -> Result<PublishOutcome> {
        let statuses =
            check_servers(&self.servers, self.rich.as_ref(), self.direct.as_ref()).await;
        let report = render(&statuses, &self.labels);
        self.publisher.publish(&report).await
    }

    /// 起動直後に 1 回、その後は `interval` ごとにサイクルを実行する。
    ///
    /// サイクル内のエラーやパニックはログに残して次のサイクルへ進む。
    /// サイクルが重なることはなく、長引いた場合は次の実行が後ろにずれる。
    /// `shutdown` が完了するとサイクルの合間でループを抜ける。
    pub async fn run<F>(self: Arc<Self>, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            servers = self.servers.len(),
            interval = %humantime::format_duration(interval),
            "Starting status monitor"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            let monitor = Arc::clone(&self);
            let cycle = tokio::spawn(async move { monitor.run_cycle().await });

            match cycle.await {
                Ok(Ok(outcome)) => debug!(?outcome, "Status cycle finished"),
                Ok(Err(e)) => {
                    error!(error = %format!("{e:#}"), "Failed to update server status");
                }
                Err(e) => error!(error = %e, "Status cycle aborted"),
            }
        }

        info!("Status monitor stopped");
    }
}
