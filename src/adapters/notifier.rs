use crate::domain::ports::Notifier;
use crate::utils::error::{Result, SerialError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Sends answers as text messages through an HTTP SMS gateway.
///
/// The gateway receives a form POST with `receptor`, `message` and, when
/// configured, `sender`.
#[derive(Debug, Clone)]
pub struct SmsNotifier {
    client: Client,
    endpoint: String,
    sender: Option<String>,
}

impl SmsNotifier {
    pub fn new(endpoint: String, sender: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            sender,
        })
    }
}

#[async_trait]
impl Notifier for SmsNotifier {
    async fn send(&self, receptor: &str, message: &str) -> Result<()> {
        let mut form = vec![("receptor", receptor), ("message", message)];
        if let Some(sender) = &self.sender {
            form.push(("sender", sender.as_str()));
        }

        tracing::debug!("Sending SMS to {}", receptor);
        let response = self.client.post(&self.endpoint).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SerialError::ProcessingError {
                message: format!("SMS gateway returned {}: {}", status, body),
            });
        }

        tracing::debug!("SMS gateway accepted message for {}", receptor);
        Ok(())
    }
}

/// Notifier that only writes the message to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, receptor: &str, message: &str) -> Result<()> {
        tracing::info!("📨 Answer for {}: {}", receptor, message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_posts_form_to_gateway() {
        let server = MockServer::start();
        let gateway = server.mock(|when, then| {
            when.method(POST)
                .path("/sms/send.json")
                .x_www_form_urlencoded_tuple("receptor", "09120000000")
                .x_www_form_urlencoded_tuple("message", "Genuine product")
                .x_www_form_urlencoded_tuple("sender", "10004346");
            then.status(200).body("{\"return\":{\"status\":200}}");
        });

        let notifier = SmsNotifier::new(
            server.url("/sms/send.json"),
            Some("10004346".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        notifier
            .send("09120000000", "Genuine product")
            .await
            .unwrap();
        gateway.assert();
    }

    #[tokio::test]
    async fn test_gateway_error_is_reported() {
        let server = MockServer::start();
        let gateway = server.mock(|when, then| {
            when.method(POST).path("/sms/send.json");
            then.status(401).body("invalid api key");
        });

        let notifier =
            SmsNotifier::new(server.url("/sms/send.json"), None, Duration::from_secs(5)).unwrap();

        let err = notifier.send("09120000000", "hello").await.unwrap_err();
        assert!(err.to_string().contains("401"));
        gateway.assert();
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        assert!(LogNotifier.send("anyone", "text").await.is_ok());
    }
}
