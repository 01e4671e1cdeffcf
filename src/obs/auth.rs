//! obs-websocket Authentication
//!
//! Single responsibility: turn the server's challenge into a response token.
//!
//! # Authentication Flow
//!
//! 1. **Ask for the challenge**
//!    - Send `GetAuthRequired`
//!    - Reply carries `authRequired`, and when true also `salt` and `challenge`
//!
//! 2. **Answer it**
//!    - `secret = base64(sha256(password + salt))`
//!    - `auth = base64(sha256(secret + challenge))`
//!    - Send `Authenticate { auth }`; an `ok` reply means the connection is usable
//!
//! The password itself never crosses the wire.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

use crate::error::ObsError;

pub const GET_AUTH_REQUIRED: &str = "GetAuthRequired";
pub const AUTHENTICATE: &str = "Authenticate";

/// The shared secret configured in obs-websocket.
///
/// Wiped from memory on drop and redacted from `Debug` output.
#[derive(Clone, Default)]
pub struct Password(Zeroizing<String>);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(Zeroizing::new(password.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

impl From<&str> for Password {
    fn from(password: &str) -> Self {
        Self::new(password)
    }
}

impl From<String> for Password {
    fn from(password: String) -> Self {
        Self::new(password)
    }
}

/// Reply to `GetAuthRequired`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthChallenge {
    #[serde(rename = "authRequired", default)]
    pub auth_required: bool,
    #[serde(default)]
    pub salt: Option<String>,
    #[serde(default)]
    pub challenge: Option<String>,
}

impl AuthChallenge {
    pub fn from_reply(reply: &serde_json::Value) -> Result<Self, ObsError> {
        Ok(Self::deserialize(reply)?)
    }

    /// Compute the `auth` field for `Authenticate`, or `None` when the server
    /// does not require authentication.
    pub fn respond(&self, password: &Password) -> Result<Option<String>, ObsError> {
        if !self.auth_required {
            return Ok(None);
        }
        let salt = self
            .salt
            .as_deref()
            .ok_or_else(|| ObsError::Auth("Challenge is missing 'salt'".into()))?;
        let challenge = self
            .challenge
            .as_deref()
            .ok_or_else(|| ObsError::Auth("Challenge is missing 'challenge'".into()))?;
        Ok(Some(auth_response(password.expose(), salt, challenge)))
    }
}

/// Two-round salted SHA-256, each round base64-encoded.
pub fn auth_response(password: &str, salt: &str, challenge: &str) -> String {
    let secret = Zeroizing::new(hash_base64(&[password.as_bytes(), salt.as_bytes()]));
    hash_base64(&[secret.as_bytes(), challenge.as_bytes()])
}

fn hash_base64(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    STANDARD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auth_response_two_rounds() {
        // base64(sha256(base64(sha256("pwS")) + "C"))
        assert_eq!(
            auth_response("pw", "S", "C"),
            "VWC60yMM5XWsmGiCZZnUciqVhEzf7nvaE8mOkpgD2KQ="
        );
    }

    #[test]
    fn test_auth_response_realistic_challenge() {
        assert_eq!(
            auth_response(
                "supersecret",
                "+IxH4CnCiqpX1rM9scsNynZzbOe4KhDeYcTNS3PDaeY=",
                "ztTBnnuqrqaKDzRM3xcVdbYm"
            ),
            "xpyl/DAKWiwsv36ZLpazBN7T03lq2VoCcKUmY3Xiy2w="
        );
    }

    #[test]
    fn test_challenge_not_required() {
        let challenge = AuthChallenge::from_reply(&json!({
            "message-id": "0",
            "status": "ok",
            "authRequired": false
        }))
        .unwrap();
        assert!(!challenge.auth_required);
        assert_eq!(challenge.respond(&Password::new("pw")).unwrap(), None);
    }

    #[test]
    fn test_challenge_flag_absent_means_not_required() {
        let challenge = AuthChallenge::from_reply(&json!({"status": "ok"})).unwrap();
        assert!(!challenge.auth_required);
    }

    #[test]
    fn test_challenge_missing_salt_is_auth_error() {
        let challenge = AuthChallenge::from_reply(&json!({
            "authRequired": true,
            "challenge": "C"
        }))
        .unwrap();
        let err = challenge.respond(&Password::new("pw")).unwrap_err();
        assert!(matches!(err, ObsError::Auth(_)));
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let password = Password::new("hunter2");
        assert!(!format!("{:?}", password).contains("hunter2"));
    }
}
