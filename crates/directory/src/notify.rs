//! Welcome notifications for newly created accounts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use onboard_core::config::NotificationConfig;
use onboard_core::error::{OnboardError, Result};

/// What a new user (or their manager) is told about the account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeNotice {
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub principal_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_directory: Option<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_welcome(&self, notice: &WelcomeNotice) -> Result<()>;
}

/// Posts each notice as JSON to a configured webhook.
pub struct WebhookNotifier {
    client: Client,
    url: String,
    include_password: bool,
}

impl WebhookNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("onboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OnboardError::Notification(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    /// Use a caller-supplied client (for testing).
    pub fn with_client(client: Client, config: &NotificationConfig) -> Self {
        Self {
            client,
            url: config.webhook_url.clone(),
            include_password: config.include_password,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_welcome(&self, notice: &WelcomeNotice) -> Result<()> {
        let payload = if self.include_password {
            notice.clone()
        } else {
            WelcomeNotice {
                initial_password: None,
                ..notice.clone()
            }
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| OnboardError::Notification(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OnboardError::Notification(format!(
                "webhook returned {status}: {body}"
            )));
        }

        debug!(username = %notice.username, "welcome notice delivered");
        Ok(())
    }
}
