use crate::config::auth::{check_api_key, check_callback_token, check_credentials, AuthConfig};
use crate::core::resolver::Resolver;
use crate::domain::model::Verification;
use crate::domain::ports::{Notifier, RangeStore};
use crate::utils::error::{Result, SerialError};
use serde::{Deserialize, Serialize};

pub const REMOTE_SENDER: &str = "remote-api";

/// Body the SMS gateway posts when someone texts a serial in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub from: String,
    pub message: String,
}

/// Entry points for serial checks coming from outside the process.
pub struct VerificationService<S, N>
where
    S: RangeStore + Clone + 'static,
    N: Notifier,
{
    resolver: Resolver<S>,
    notifier: N,
    auth: AuthConfig,
}

impl<S, N> VerificationService<S, N>
where
    S: RangeStore + Clone + 'static,
    N: Notifier,
{
    pub fn new(resolver: Resolver<S>, notifier: N, auth: AuthConfig) -> Self {
        Self {
            resolver,
            notifier,
            auth,
        }
    }

    /// Administrator check; the username is recorded as the sender.
    pub async fn check(&self, username: &str, password: &str, raw: &str) -> Result<Verification> {
        if !check_credentials(&self.auth, username, password) {
            return Err(SerialError::Unauthorized {
                message: format!("invalid credentials for '{}'", username),
            });
        }
        self.resolve(username, raw).await
    }

    pub async fn remote_check(&self, api_key: &str, serial: &str) -> Result<Verification> {
        check_api_key(&self.auth, api_key)?;
        self.resolve(REMOTE_SENDER, serial).await
    }

    /// Resolves a texted serial and relays the answer to its sender.
    /// A failed relay is logged; the verification still stands.
    pub async fn handle_callback(
        &self,
        token: &str,
        payload: &CallbackPayload,
    ) -> Result<Verification> {
        check_callback_token(&self.auth, token)?;
        let verification = self.resolve(&payload.from, &payload.message).await?;

        if let Err(e) = self.notifier.send(&payload.from, &verification.answer).await {
            tracing::warn!("Could not relay answer to {}: {}", payload.from, e);
        }

        Ok(verification)
    }

    async fn resolve(&self, sender: &str, raw: &str) -> Result<Verification> {
        let resolver = self.resolver.clone();
        let sender = sender.to_string();
        let raw = raw.to_string();

        tokio::task::spawn_blocking(move || resolver.check_serial(&sender, &raw))
            .await
            .map_err(|e| SerialError::ProcessingError {
                message: format!("verification task failed: {}", e),
            })?
    }
}
