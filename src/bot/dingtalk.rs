use std::time::Duration;

use anyhow::{anyhow, Context};
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use crate::{
    bot::{DeliveryReceipt, Notifier, RenderedMessage},
    config::{DingTalkConfig, Mentions},
};

/// Client for a DingTalk custom robot.
pub struct DingTalkBot {
    client: Client,
    config: DingTalkConfig,
}

#[derive(Serialize)]
#[serde(tag = "msgtype", rename_all = "lowercase")]
enum OutgoingMessage<'a> {
    Text {
        text: TextContent<'a>,
    },
    Markdown {
        markdown: MarkdownContent<'a>,
        at: At<'a>,
    },
    Link {
        link: LinkContent<'a>,
    },
}

#[derive(Serialize)]
struct TextContent<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct MarkdownContent<'a> {
    title: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkContent<'a> {
    title: &'a str,
    text: &'a str,
    message_url: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct At<'a> {
    at_mobiles: &'a [String],
    at_user_ids: &'a [String],
    is_at_all: bool,
}

impl DingTalkBot {
    pub fn new(config: DingTalkConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("couldn't build HTTP client")?;

        Ok(Self { client, config })
    }

    /// Robots with the "sign" security setting expect a timestamp and a signature of
    /// `"{timestamp}\n{secret}"` in the query string.
    fn signed_url(&self, timestamp_ms: i64) -> anyhow::Result<Url> {
        let mut url = self.config.webhook_url.clone();

        let secret = match &self.config.secret {
            Some(secret) if !secret.is_empty() => secret,
            _ => return Ok(url),
        };

        use hmac::{Hmac, Mac, NewMac};
        use sha2::Sha256;

        type HmacSha256 = Hmac<Sha256>;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| anyhow!("invalid DingTalk secret: {}", e))?;
        mac.update(format!("{}\n{}", timestamp_ms, secret).as_bytes());
        let sign = STANDARD.encode(mac.finalize().into_bytes());

        url.query_pairs_mut()
            .append_pair("timestamp", &timestamp_ms.to_string())
            .append_pair("sign", &sign);

        Ok(url)
    }

    async fn send(&self, message: &OutgoingMessage<'_>) -> anyhow::Result<DeliveryReceipt> {
        let url = self.signed_url(chrono::Utc::now().timestamp_millis())?;
        trace!("posting message to DingTalk robot");

        let receipt: DeliveryReceipt = self
            .client
            .post(url)
            .json(message)
            .send()
            .await
            .context("request to DingTalk failed")?
            .error_for_status()
            .context("DingTalk answered with an HTTP error")?
            .json()
            .await
            .context("couldn't decode DingTalk response")?;

        debug!(
            "DingTalk answered errcode={} errmsg={}",
            receipt.errcode, receipt.errmsg
        );
        Ok(receipt)
    }
}

#[rocket::async_trait]
impl Notifier for DingTalkBot {
    async fn send_text(&self, text: &str) -> anyhow::Result<DeliveryReceipt> {
        self.send(&OutgoingMessage::Text {
            text: TextContent { content: text },
        })
        .await
    }

    async fn send_markdown(
        &self,
        message: &RenderedMessage,
        mentions: &Mentions,
    ) -> anyhow::Result<DeliveryReceipt> {
        self.send(&OutgoingMessage::Markdown {
            markdown: MarkdownContent {
                title: &message.title,
                text: &message.body,
            },
            at: At {
                at_mobiles: &mentions.at_mobiles,
                at_user_ids: &mentions.at_user_ids,
                is_at_all: mentions.is_at_all,
            },
        })
        .await
    }

    async fn send_link(
        &self,
        title: &str,
        text: &str,
        message_url: &str,
    ) -> anyhow::Result<DeliveryReceipt> {
        self.send(&OutgoingMessage::Link {
            link: LinkContent {
                title,
                text,
                message_url,
            },
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn bot(secret: Option<&str>) -> DingTalkBot {
        DingTalkBot::new(DingTalkConfig {
            webhook_url: Url::parse("https://oapi.dingtalk.com/robot/send?access_token=abc")
                .unwrap(),
            secret: secret.map(str::to_owned),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn unsigned_url_is_untouched() {
        let url = bot(None).signed_url(1_700_000_000_000).unwrap();
        assert_eq!(
            url.as_str(),
            "https://oapi.dingtalk.com/robot/send?access_token=abc"
        );

        let url = bot(Some("")).signed_url(1_700_000_000_000).unwrap();
        assert_eq!(url.query_pairs().count(), 1);
    }

    #[test]
    fn signed_url() {
        let url = bot(Some("SECtest")).signed_url(1_700_000_000_000).unwrap();

        assert_eq!(
            url.as_str(),
            "https://oapi.dingtalk.com/robot/send?access_token=abc\
             &timestamp=1700000000000\
             &sign=aZLLrriXgn05YbwaGR7knYsLeJADjr9NwLaNNKpxh4g%3D"
        );
    }

    #[test]
    fn markdown_message_json() {
        let mentions = Mentions {
            is_at_all: false,
            at_mobiles: vec!["13800000000".to_owned()],
            at_user_ids: vec![],
        };
        let message = OutgoingMessage::Markdown {
            markdown: MarkdownContent {
                title: "demo Gogs notification",
                text: "## hi",
            },
            at: At {
                at_mobiles: &mentions.at_mobiles,
                at_user_ids: &mentions.at_user_ids,
                is_at_all: mentions.is_at_all,
            },
        };

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "msgtype": "markdown",
                "markdown": { "title": "demo Gogs notification", "text": "## hi" },
                "at": { "atMobiles": ["13800000000"], "atUserIds": [], "isAtAll": false }
            })
        );
    }

    #[test]
    fn text_message_json() {
        let message = OutgoingMessage::Text {
            text: TextContent { content: "ping" },
        };

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({ "msgtype": "text", "text": { "content": "ping" } })
        );
    }

    #[test]
    fn link_message_json() {
        let message = OutgoingMessage::Link {
            link: LinkContent {
                title: "pushbell",
                text: "hello",
                message_url: "https://github.com",
            },
        };

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "msgtype": "link",
                "link": { "title": "pushbell", "text": "hello", "messageUrl": "https://github.com" }
            })
        );
    }
}
