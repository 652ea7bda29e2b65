use crate::utils::error::{Result, SerialError};
use serde::{Deserialize, Serialize};

/// Secrets guarding the verification surfaces. An empty secret never
/// matches, so an unconfigured surface stays closed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    /// Path token the SMS gateway puts in its callback URL.
    pub callback_token: String,
    /// Key for remote systems calling the single-serial check.
    pub remote_api_key: String,
}

fn secret_matches(expected: &str, given: &str) -> bool {
    if expected.is_empty() || expected.len() != given.len() {
        return false;
    }
    expected
        .bytes()
        .zip(given.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Administrator login check.
pub fn check_credentials(auth: &AuthConfig, username: &str, password: &str) -> bool {
    // 兩個都要比對
    let user_ok = secret_matches(&auth.username, username);
    let pass_ok = secret_matches(&auth.password, password);
    user_ok && pass_ok
}

pub fn check_api_key(auth: &AuthConfig, key: &str) -> Result<()> {
    if secret_matches(&auth.remote_api_key, key) {
        Ok(())
    } else {
        Err(SerialError::Unauthorized {
            message: "invalid remote API key".to_string(),
        })
    }
}

pub fn check_callback_token(auth: &AuthConfig, token: &str) -> Result<()> {
    if secret_matches(&auth.callback_token, token) {
        Ok(())
    } else {
        Err(SerialError::Unauthorized {
            message: "invalid callback token".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthConfig {
        AuthConfig {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            callback_token: "cb".to_string(),
            remote_api_key: "rk".to_string(),
        }
    }

    #[test]
    fn test_check_credentials() {
        assert!(check_credentials(&auth(), "admin", "hunter2"));
        assert!(!check_credentials(&auth(), "admin", "hunter3"));
        assert!(!check_credentials(&auth(), "root", "hunter2"));
        assert!(!check_credentials(&auth(), "admin", ""));
    }

    #[test]
    fn test_unconfigured_secrets_reject_everything() {
        let empty = AuthConfig::default();
        assert!(!check_credentials(&empty, "", ""));
        assert!(check_api_key(&empty, "").is_err());
        assert!(check_callback_token(&empty, "").is_err());
    }

    #[test]
    fn test_tokens() {
        assert!(check_api_key(&auth(), "rk").is_ok());
        assert!(check_api_key(&auth(), "cb").is_err());
        assert!(check_callback_token(&auth(), "cb").is_ok());
        assert!(matches!(
            check_callback_token(&auth(), "nope"),
            Err(SerialError::Unauthorized { .. })
        ));
    }
}
