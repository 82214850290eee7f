use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serenity::all::{
    CreateEmbed, CreateEmbedFooter, EditWebhookMessage, ExecuteWebhook, Http, HttpError,
    MessageId, Timestamp, Webhook,
};
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::DiscordConfig;
use crate::publisher::{MessageSink, PublishError};
use crate::report::StatusReport;

/// Discord の "Unknown Message" エラーコード
const UNKNOWN_MESSAGE: isize = 10008;

/// Discord Webhook 経由でステータスメッセージを送信・編集する。
pub struct WebhookSink {
    http: Http,
    url: String,
    username: Option<String>,
    avatar_url: Option<String>,
    /// 初回利用時に Webhook 情報を取得する
    webhook: OnceCell<Webhook>,
}

impl WebhookSink {
    pub fn new(config: &DiscordConfig) -> Self {
        Self {
            // Webhook の実行にはボットトークンは不要
            http: Http::new(""),
            url: config.webhook_url.clone(),
            username: config.username.clone(),
            avatar_url: config.avatar_url.clone(),
            webhook: OnceCell::new(),
        }
    }

    async fn webhook(&self) -> anyhow::Result<&Webhook> {
        self.webhook
            .get_or_try_init(|| async {
                let webhook = Webhook::from_url(&self.http, &self.url)
                    .await
                    .context("Failed to fetch webhook")?;
                info!(webhook_id = webhook.id.get(), "Webhook resolved");
                Ok::<_, anyhow::Error>(webhook)
            })
            .await
    }
}

#[async_trait]
impl MessageSink for WebhookSink {
    async fn send(&self, report: &StatusReport) -> Result<String, PublishError> {
        let webhook = self.webhook().await?;

        let mut builder = ExecuteWebhook::new().embed(build_embed(report));
        if let Some(username) = &self.username {
            builder = builder.username(username);
        }
        if let Some(avatar_url) = &self.avatar_url {
            builder = builder.avatar_url(avatar_url);
        }

        let message = webhook
            .execute(&self.http, true, builder)
            .await
            .context("Failed to execute webhook")?
            .ok_or_else(|| anyhow!("Webhook did not return the created message"))?;

        Ok(message.id.get().to_string())
    }

    async fn edit(&self, message_id: &str, report: &StatusReport) -> Result<(), PublishError> {
        let message_id = parse_message_id(message_id)?;
        let webhook = self.webhook().await?;

        let builder = EditWebhookMessage::new().embeds(vec![build_embed(report)]);
        webhook
            .edit_message(&self.http, message_id, builder)
            .await
            .map_err(|e| {
                if is_unknown_message(&e) {
                    PublishError::UnknownMessage(e.to_string())
                } else {
                    PublishError::Other(anyhow::Error::new(e).context("Failed to edit message"))
                }
            })?;

        Ok(())
    }
}

/// 保存済み ID を Discord のメッセージ ID に変換する。不正な値は存在しないメッセージとして扱う。
fn parse_message_id(message_id: &str) -> Result<MessageId, PublishError> {
    message_id
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(MessageId::new)
        .ok_or_else(|| PublishError::UnknownMessage(format!("Invalid message id: {message_id}")))
}

fn is_unknown_message(error: &serenity::Error) -> bool {
    matches!(
        error,
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response))
            if response.error.code == UNKNOWN_MESSAGE
    )
}

fn build_embed(report: &StatusReport) -> CreateEmbed {
    let embed = CreateEmbed::new()
        .title(&report.title)
        .description(&report.description)
        .color(report.color)
        .footer(CreateEmbedFooter::new(&report.footer))
        .timestamp(Timestamp::now());

    report.fields.iter().fold(embed, |embed, field| {
        embed.field(&field.name, &field.value, field.inline)
    })
}
