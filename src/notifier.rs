//! Delivery of restart events.
//!
//! Every message is written to the log. When a webhook is configured the
//! message is also posted there as `{"<key>": "<message>"}`.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::config::AutohealConfig;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Unable to serialize webhook payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Webhook request failed: {0}")]
    Webhook(#[from] reqwest::Error),
}

#[async_trait]
pub trait Notify: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
struct Webhook {
    url: String,
    key: String,
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook: Option<Webhook>,
}

impl WebhookNotifier {
    pub fn new(config: &AutohealConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let webhook = config.webhook_url.as_ref().map(|url| Webhook {
            url: url.clone(),
            key: config.webhook_key.clone(),
        });

        Ok(Self { client, webhook })
    }
}

/// JSON body posted to the webhook.
pub fn webhook_payload(key: &str, message: &str) -> serde_json::Value {
    let mut payload = serde_json::Map::new();
    payload.insert(key.to_string(), serde_json::Value::from(message));
    serde_json::Value::Object(payload)
}

#[async_trait]
impl Notify for WebhookNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        log::info!("{message}");

        let Some(webhook) = &self.webhook else {
            return Ok(());
        };

        let body = serde_json::to_vec(&webhook_payload(&webhook.key, message))?;
        let response = self
            .client
            .post(&webhook.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        // The webhook status is informational only
        log::debug!("Webhook answered {}", response.status());
        Ok(())
    }
}
