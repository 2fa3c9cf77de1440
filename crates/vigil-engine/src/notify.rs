use async_trait::async_trait;
use vigil_core::VigilError;

/// Best-effort notification capability used by the `notify` escalation
/// action and the optional tick-failure alert.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a message to the given recipients.
    async fn send(&self, recipients: &[String], message: &str) -> Result<(), VigilError>;
}

/// Disabled sink; every send succeeds without doing anything.
///
/// This is the default: notifications are opt-in.
#[derive(Debug, Default)]
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn send(&self, _recipients: &[String], _message: &str) -> Result<(), VigilError> {
        Ok(())
    }
}

/// Webhook-backed sink posting a JSON payload per notification.
pub struct WebhookSink {
    url: String,
    http: reqwest::Client,
}

impl WebhookSink {
    /// Create a sink posting to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn send(&self, recipients: &[String], message: &str) -> Result<(), VigilError> {
        let payload = serde_json::json!({
            "recipients": recipients,
            "message": message,
        });
        let response = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| VigilError::Notify(format!("webhook send failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VigilError::Notify(format!(
                "webhook returned {status} for {}",
                self.url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_sink_always_succeeds() {
        let sink = NullSink;
        let result = sink.send(&["oncall".into()], "blocking comment").await;
        assert!(result.is_ok());
    }
}
