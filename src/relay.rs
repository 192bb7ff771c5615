use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::{
    bot::{render, utils::shorten_content, DeliveryReceipt, Notifier, RenderedMessage},
    config::{FilterRules, Mentions, MessageTemplate},
    event::Event,
    filter::decide,
    webhooks::{normalize, Source},
};

const PAYLOAD_PREVIEW_LENGTH: usize = 200;
const FORMAT_TEST_LINK: &str = "https://github.com";

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("chat bot returned error ({code}): {message}")]
    Rejected { code: i64, message: String },
    #[error("couldn't reach chat bot: {0:#}")]
    Transport(#[source] anyhow::Error),
}

impl DeliveryError {
    pub fn receipt(&self) -> Option<DeliveryReceipt> {
        match self {
            Self::Rejected { code, message } => Some(DeliveryReceipt {
                errcode: *code,
                errmsg: message.clone(),
            }),
            Self::Transport(_) => None,
        }
    }

    /// Human readable description, with the whole cause chain when `verbose` is set.
    pub fn report(&self, verbose: bool) -> String {
        match self {
            Self::Transport(e) if verbose => format!("couldn't reach chat bot: {:?}", e),
            _ => self.to_string(),
        }
    }
}

/// Short description of a relayed event, echoed back to the webhook sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub event_type: String,
    pub repository: String,
    pub branch: String,
    pub commits: usize,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        Self {
            event_type: event.kind.to_string(),
            repository: event.repository.name.clone(),
            branch: event.branch.clone(),
            commits: event.commits.len(),
        }
    }
}

/// Result of sending one sample message of a given kind.
#[derive(Debug, Serialize)]
pub struct FormatCheck {
    pub format: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<DeliveryReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FormatCheck {
    fn new(format: &'static str, result: Result<DeliveryReceipt, DeliveryError>) -> Self {
        match result {
            Ok(receipt) => Self {
                format,
                success: true,
                receipt: Some(receipt),
                error: None,
            },
            Err(error) => Self {
                format,
                success: false,
                receipt: error.receipt(),
                error: Some(error.to_string()),
            },
        }
    }
}

#[derive(Debug)]
pub enum RelayOutcome {
    /// No known payload shape matched.
    Unrecognized {
        received_keys: Vec<String>,
        payload_preview: String,
    },
    Filtered {
        reason: String,
    },
    Delivered {
        summary: EventSummary,
        receipt: DeliveryReceipt,
    },
    Failed {
        summary: EventSummary,
        error: DeliveryError,
    },
}

/// Everything needed to turn webhooks into chat messages. Read-only once built.
pub struct Relay {
    pub rules: FilterRules,
    pub template: MessageTemplate,
    pub notifier: Arc<dyn Notifier>,
    /// Include full error chains in responses
    pub verbose: bool,
}

impl Relay {
    pub async fn process(&self, payload: &Value, source: Source<'_>) -> RelayOutcome {
        trace!("raw payload: {}", payload);

        match normalize(payload, source) {
            Some(event) => self.relay(event).await,
            None => {
                let outcome = unrecognized(payload);
                if let RelayOutcome::Unrecognized { received_keys, .. } = &outcome {
                    info!(
                        "couldn't parse {:?} payload, received keys: {:?}",
                        source, received_keys
                    );
                }
                outcome
            }
        }
    }

    pub async fn relay(&self, event: Event) -> RelayOutcome {
        let summary = EventSummary::from(&event);
        debug!("normalized event: {:?}", summary);

        let decision = decide(&event, &self.rules);
        if !decision.accept {
            info!("webhook filtered: {}", decision.reason);
            return RelayOutcome::Filtered {
                reason: decision.reason,
            };
        }
        trace!("filters passed: {}", decision.reason);

        let message = render(&event, &self.template);
        trace!(
            "rendered message `{}` ({} bytes)",
            message.title,
            message.body.len()
        );

        match self.deliver(&message).await {
            Ok(receipt) => {
                info!(
                    "relayed {} event of {} ({})",
                    summary.event_type, summary.repository, summary.branch
                );
                RelayOutcome::Delivered { summary, receipt }
            }
            Err(error) => {
                warn!("couldn't deliver message: {}", error);
                RelayOutcome::Failed { summary, error }
            }
        }
    }

    async fn deliver(&self, message: &RenderedMessage) -> Result<DeliveryReceipt, DeliveryError> {
        let receipt = self
            .notifier
            .send_markdown(message, &self.template.mentions)
            .await
            .map_err(DeliveryError::Transport)?;

        check_receipt(receipt)
    }

    /// Sends a plain text test message through the notifier.
    pub async fn send_test_message(&self, text: &str) -> Result<DeliveryReceipt, DeliveryError> {
        let receipt = self
            .notifier
            .send_text(text)
            .await
            .map_err(DeliveryError::Transport)?;

        check_receipt(receipt)
    }

    /// Sends one text, one markdown and one link message, and reports how each one went.
    pub async fn check_formats(&self, time: &str) -> Vec<FormatCheck> {
        let text = format!("📝 Text message test\nTime: {}", time);
        let markdown = RenderedMessage {
            title: format!("{} format test", env!("CARGO_PKG_NAME")),
            body: format!(
                "## 🗨 Markdown test\n\n**Time**: {}\n\n- first item\n- second item\n\n> test message",
                time
            ),
        };
        let link_text = format!("Link message test\nTime: {}", time);

        let text_result = self.send_test_message(&text).await;
        let markdown_result = self
            .notifier
            .send_markdown(&markdown, &Mentions::default())
            .await
            .map_err(DeliveryError::Transport)
            .and_then(check_receipt);
        let link_result = self
            .notifier
            .send_link(&markdown.title, &link_text, FORMAT_TEST_LINK)
            .await
            .map_err(DeliveryError::Transport)
            .and_then(check_receipt);

        vec![
            FormatCheck::new("text", text_result),
            FormatCheck::new("markdown", markdown_result),
            FormatCheck::new("link", link_result),
        ]
    }
}

fn check_receipt(receipt: DeliveryReceipt) -> Result<DeliveryReceipt, DeliveryError> {
    if receipt.is_success() {
        Ok(receipt)
    } else {
        Err(DeliveryError::Rejected {
            code: receipt.errcode,
            message: receipt.errmsg,
        })
    }
}

fn unrecognized(payload: &Value) -> RelayOutcome {
    let received_keys = payload
        .as_object()
        .map(|object| object.keys().cloned().collect())
        .unwrap_or_default();
    let serialized = payload.to_string();
    let payload_preview = shorten_content(&serialized, PAYLOAD_PREVIEW_LENGTH);

    RelayOutcome::Unrecognized {
        received_keys,
        payload_preview,
    }
}
