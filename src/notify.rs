use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::settings::SlackSettings;

const SLACK_API: &str = "https://slack.com/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers a finished message. Failures are reported, never raised.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> bool;
}

/// Dry-run delivery: log the message and report success.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> bool {
        info!(text = message, "Dry run, not posting");
        true
    }
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    /// A string for chat.postMessage, an object for conversations.open.
    #[serde(default)]
    channel: Option<serde_json::Value>,
}

/// Posts through the Slack Bot API, to a channel or to a DM with the user.
pub struct SlackNotifier {
    client: reqwest::Client,
    bot_token: String,
    user_id: Option<String>,
    channel: Option<String>,
    dm_channel: OnceCell<String>,
}

impl SlackNotifier {
    pub fn new(settings: SlackSettings) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            bot_token: settings.bot_token,
            user_id: settings.user_id,
            channel: settings.channel,
            dm_channel: OnceCell::new(),
        })
    }

    /// In channel mode the configured user is pinged.
    fn compose(&self, message: &str) -> String {
        match (&self.channel, &self.user_id) {
            (Some(_), Some(user)) => format!("<@{}> {}", user, message),
            _ => message.to_string(),
        }
    }

    async fn target_channel(&self) -> Option<String> {
        if let Some(channel) = &self.channel {
            return Some(channel.clone());
        }
        let Some(user) = &self.user_id else {
            error!("A user id is required for direct messages");
            return None;
        };
        match self.dm_channel.get_or_try_init(|| self.open_dm(user)).await {
            Ok(id) => Some(id.clone()),
            Err(e) => {
                error!("Slack conversations.open failed: {:#}", e);
                None
            }
        }
    }

    async fn open_dm(&self, user: &str) -> Result<String> {
        let resp = self.call("conversations.open", json!({ "users": [user] })).await?;
        if !resp.ok {
            bail!("{}", resp.error.as_deref().unwrap_or("unknown"));
        }
        dm_channel_id(&resp).ok_or_else(|| anyhow!("response carried no channel id"))
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> Result<SlackResponse> {
        let resp = self
            .client
            .post(format!("{}/{}", SLACK_API, method))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await?
            .json::<SlackResponse>()
            .await?;
        Ok(resp)
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, message: &str) -> bool {
        let text = self.compose(message);
        let Some(channel) = self.target_channel().await else {
            return false;
        };

        match self
            .call("chat.postMessage", json!({ "channel": channel, "text": text }))
            .await
        {
            Ok(resp) if resp.ok => true,
            Ok(resp) => {
                error!(
                    "Slack chat.postMessage failed: {}",
                    resp.error.as_deref().unwrap_or("unknown")
                );
                false
            }
            Err(e) => {
                error!("Slack post failed: {:#}", e);
                false
            }
        }
    }
}

fn dm_channel_id(resp: &SlackResponse) -> Option<String> {
    resp.channel
        .as_ref()
        .and_then(|c| c.get("id"))
        .and_then(|id| id.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier(user_id: Option<&str>, channel: Option<&str>) -> SlackNotifier {
        SlackNotifier::new(SlackSettings {
            bot_token: "xoxb-test".to_string(),
            user_id: user_id.map(str::to_string),
            channel: channel.map(str::to_string),
        })
        .unwrap()
    }

    #[test]
    fn channel_mode_pings_user() {
        let n = notifier(Some("U0123"), Some("#enrollment"));
        assert_eq!(n.compose("*[AERO - 84 SEATS OPEN]*"), "<@U0123> *[AERO - 84 SEATS OPEN]*");
    }

    #[test]
    fn dm_mode_has_no_ping() {
        let n = notifier(Some("U0123"), None);
        assert_eq!(n.compose("hello"), "hello");
        let n = notifier(None, Some("#enrollment"));
        assert_eq!(n.compose("hello"), "hello");
    }

    #[tokio::test]
    async fn channel_used_directly() {
        let n = notifier(None, Some("#enrollment"));
        assert_eq!(n.target_channel().await.as_deref(), Some("#enrollment"));
    }

    #[tokio::test]
    async fn no_target_fails_without_request() {
        let n = notifier(None, None);
        assert!(n.target_channel().await.is_none());
        assert!(!n.send("hello").await);
    }

    #[test]
    fn responses_parse() {
        let open: SlackResponse =
            serde_json::from_str(r#"{"ok":true,"channel":{"id":"D024BE91L"}}"#).unwrap();
        assert_eq!(dm_channel_id(&open).as_deref(), Some("D024BE91L"));

        let posted: SlackResponse =
            serde_json::from_str(r#"{"ok":true,"channel":"C123","ts":"1503435956.000247"}"#).unwrap();
        assert!(posted.ok);
        assert!(dm_channel_id(&posted).is_none());

        let failed: SlackResponse =
            serde_json::from_str(r#"{"ok":false,"error":"channel_not_found"}"#).unwrap();
        assert!(!failed.ok);
        assert_eq!(failed.error.as_deref(), Some("channel_not_found"));
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        assert!(LogNotifier.send("*[AERO - 84 SEATS OPEN]*").await);
    }
}
