use std::sync::Mutex;

use anyhow::anyhow;

use crate::{
    bot::{DeliveryReceipt, Notifier, RenderedMessage},
    config::Mentions,
};

/// Notifier keeping every message in memory, answering with a fixed error code.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub(crate) errcode: i64,
    pub(crate) unreachable: bool,
    pub(crate) markdown: Mutex<Vec<RenderedMessage>>,
    pub(crate) text: Mutex<Vec<String>>,
    pub(crate) links: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub(crate) fn answering(errcode: i64) -> Self {
        Self {
            errcode,
            ..Default::default()
        }
    }

    pub(crate) fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    fn receipt(&self) -> anyhow::Result<DeliveryReceipt> {
        if self.unreachable {
            return Err(anyhow!("connection refused"));
        }
        Ok(DeliveryReceipt {
            errcode: self.errcode,
            errmsg: if self.errcode == 0 { "ok" } else { "rejected" }.to_owned(),
        })
    }
}

#[rocket::async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, text: &str) -> anyhow::Result<DeliveryReceipt> {
        self.text.lock().unwrap().push(text.to_owned());
        self.receipt()
    }

    async fn send_markdown(
        &self,
        message: &RenderedMessage,
        _mentions: &Mentions,
    ) -> anyhow::Result<DeliveryReceipt> {
        self.markdown.lock().unwrap().push(message.clone());
        self.receipt()
    }

    async fn send_link(
        &self,
        title: &str,
        _text: &str,
        _message_url: &str,
    ) -> anyhow::Result<DeliveryReceipt> {
        self.links.lock().unwrap().push(title.to_owned());
        self.receipt()
    }
}
