use crate::config::EmailConfig;

/// Email delivery client for a Google Apps Script webhook.
///
/// Best-effort by design: `send` never returns an error, it only logs.
/// A failed or skipped delivery must never be visible to the caller on the
/// phone — by the time the notifier runs, their call has already ended
/// normally.
pub struct Notifier {
    client: reqwest::Client,
    email: EmailConfig,
}

impl Notifier {
    pub fn new(email: &EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            email: email.clone(),
        }
    }

    /// Attempt one delivery. Exactly one attempt, no retries.
    pub async fn send(&self, subject: &str, body: &str) {
        tracing::info!(
            has_url = !self.email.webhook_url.is_empty(),
            has_token = !self.email.webhook_token.is_empty(),
            to = %if self.email.to.is_empty() { "(empty)" } else { &self.email.to },
            subject,
            "Email delivery attempt"
        );

        match self.try_send(subject, body).await {
            Ok(()) => tracing::info!(subject, "Email delivered"),
            Err(NotifyError::NotConfigured) => {
                tracing::info!("Email config incomplete, skipping delivery");
            }
            Err(e) => tracing::warn!(subject, "Email delivery failed: {e}"),
        }
    }

    async fn try_send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        if !self.email.is_configured() {
            return Err(NotifyError::NotConfigured);
        }

        let payload = serde_json::json!({
            "token": self.email.webhook_token,
            "to": self.email.to,
            "subject": subject,
            "body": body,
        });

        let resp = self
            .client
            .post(&self.email.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Webhook(format!("{status}: {text}")));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
enum NotifyError {
    #[error("email webhook not configured")]
    NotConfigured,
    #[error("HTTP request failed: {0}")]
    Request(String),
    #[error("webhook rejected delivery: {0}")]
    Webhook(String),
}

/// Subject line for a finished call, e.g. "New Call Summary - Work - Alex".
pub fn call_subject(category_label: Option<&str>, name: &str) -> String {
    let mut subject = format!("New Call Summary - {}", category_label.unwrap_or("Unknown"));
    if !name.is_empty() {
        subject.push_str(" - ");
        subject.push_str(name);
    }
    subject
}

/// Subject line for a forwarded SMS.
pub fn sms_subject(sender: &str) -> String {
    format!("New SMS to your Twilio number - from {sender}")
}
