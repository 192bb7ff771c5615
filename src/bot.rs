use serde::{Deserialize, Serialize};

use crate::config::Mentions;

pub mod diagnostic;

pub mod dingtalk;
pub use dingtalk::DingTalkBot;

mod message_builder;

pub mod render;
pub use render::{render, RenderedMessage};

pub(crate) mod utils;

#[cfg(test)]
pub(crate) mod testing;

/// What the chat bot answered. An `errcode` of 0 means the message was delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

impl DeliveryReceipt {
    pub fn is_success(&self) -> bool {
        self.errcode == 0
    }
}

/// A chat endpoint messages can be delivered to.
///
/// Implementations return `Err` only when the request itself failed; a bot refusing the message
/// is reported through [`DeliveryReceipt::errcode`].
#[rocket::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, text: &str) -> anyhow::Result<DeliveryReceipt>;

    async fn send_markdown(
        &self,
        message: &RenderedMessage,
        mentions: &Mentions,
    ) -> anyhow::Result<DeliveryReceipt>;

    /// A card with a title and a short text, opening `message_url` when clicked.
    async fn send_link(
        &self,
        title: &str,
        text: &str,
        message_url: &str,
    ) -> anyhow::Result<DeliveryReceipt>;
}
