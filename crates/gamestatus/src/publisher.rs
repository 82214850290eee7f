//! ステータスメッセージを 1 通だけ維持する送信処理。
//!
//! 送信済みメッセージの ID をファイルに保存しておき、次回以降は同じメッセージを編集する。
//! メッセージが削除されていた場合は作り直す。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::report::StatusReport;

#[derive(Error, Debug)]
pub enum PublishError {
    /// 編集対象のメッセージが存在しない
    #[error("Unknown message: {0}")]
    UnknownMessage(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 通知先への送信手段。
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// 新しいメッセージを送り、その ID を返す。
    async fn send(&self, report: &StatusReport) -> Result<String, PublishError>;

    async fn edit(&self, message_id: &str, report: &StatusReport) -> Result<(), PublishError>;
}

/// 最後に送信したメッセージ ID を保存するファイル。
pub struct MessageIdStore {
    path: PathBuf,
}

impl MessageIdStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// 保存済みの ID を読む。ファイルが無い、または空なら `None`。
    pub async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let id = content.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read message id file")),
        }
    }

    pub async fn save(&self, message_id: &str) -> Result<()> {
        tokio::fs::write(&self.path, message_id)
            .await
            .context("Failed to write message id file")
    }

    pub async fn clear(&self) -> Result<()> {
        self.save("").await
    }
}

/// 1 サイクルの送信結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Edited(String),
    Created(String),
}

pub struct Publisher {
    sink: Box<dyn MessageSink>,
    store: MessageIdStore,
}

impl Publisher {
    pub fn new(sink: Box<dyn MessageSink>, store: MessageIdStore) -> Self {
        Self { sink, store }
    }

    /// 既存メッセージを編集し、無ければ新規作成する。
    ///
    /// 保存済み ID が無効だった場合の作り直しは 1 回まで。
    pub async fn publish(&self, report: &StatusReport) -> Result<PublishOutcome> {
        if let Some(message_id) = self.store.load().await? {
            match self.sink.edit(&message_id, report).await {
                Ok(()) => {
                    info!(message_id = %message_id, "Status message updated");
                    return Ok(PublishOutcome::Edited(message_id));
                }
                Err(PublishError::UnknownMessage(reason)) => {
                    warn!(
                        message_id = %message_id,
                        reason = %reason,
                        "Status message not found, recreating"
                    );
                    self.store.clear().await?;
                }
                Err(PublishError::Other(e)) => {
                    return Err(e.context("Failed to update status message"));
                }
            }
        }

        let message_id = self
            .sink
            .send(report)
            .await
            .map_err(anyhow::Error::from)
            .context("Failed to send status message")?;
        self.store.save(&message_id).await?;
        info!(message_id = %message_id, "New status message sent");

        Ok(PublishOutcome::Created(message_id))
    }
}
