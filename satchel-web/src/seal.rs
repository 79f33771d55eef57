//! Cookie sealing with authenticated encryption
//!
//! Session content is encrypted and authenticated with AES-256-GCM under a key
//! derived from the cookie password. The client can neither read nor alter it.

use chrono::Utc;
use cookie::{Cookie, CookieJar, Key};
use satchel_core::config::MIN_PASSWORD_LENGTH;
use satchel_core::{
    async_trait, config_error, cookie_error, CookieOptions, CookieSealer, SatchelResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Name bound into the ciphertext as associated data
const SEAL_NAME: &str = "satchel";

/// Plaintext carried inside a sealed cookie
#[derive(Debug, Serialize, Deserialize)]
struct SealedEnvelope {
    /// Session content
    dat: Value,
    /// Expiration time (unix milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

pub struct PrivateSealer {
    key: Key,
    ttl: Option<Duration>,
}

impl std::fmt::Debug for PrivateSealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateSealer").field("ttl", &self.ttl).finish()
    }
}

impl PrivateSealer {
    /// Sealer keyed by `password`; sealed values expire after `ttl` when given
    pub fn new(password: &str, ttl: Option<Duration>) -> SatchelResult<Self> {
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(config_error!(
                format!(
                    "Cookie password must be at least {} bytes",
                    MIN_PASSWORD_LENGTH
                ),
                "private_sealer"
            ));
        }

        Ok(Self {
            key: Key::derive_from(password.as_bytes()),
            ttl,
        })
    }

    pub fn from_options(options: &CookieOptions) -> SatchelResult<Self> {
        Self::new(&options.password, options.ttl())
    }
}

#[async_trait]
impl CookieSealer for PrivateSealer {
    async fn seal(&self, content: &Value) -> SatchelResult<String> {
        let envelope = SealedEnvelope {
            dat: content.clone(),
            exp: self
                .ttl
                .map(|ttl| Utc::now().timestamp_millis() + ttl.as_millis() as i64),
        };
        let plaintext = serde_json::to_string(&envelope)?;

        let mut jar = CookieJar::new();
        jar.private_mut(&self.key)
            .add(Cookie::new(SEAL_NAME, plaintext));

        jar.get(SEAL_NAME)
            .map(|cookie| cookie.value().to_string())
            .ok_or_else(|| cookie_error!("Failed to seal session cookie", "private_sealer"))
    }

    async fn unseal(&self, sealed: &str) -> SatchelResult<Value> {
        let jar = CookieJar::new();
        let opened = jar
            .private(&self.key)
            .decrypt(Cookie::new(SEAL_NAME, sealed.to_string()))
            .ok_or_else(|| {
                debug!("Session cookie failed to decrypt");
                cookie_error!("Invalid session cookie", "private_sealer")
            })?;

        let envelope: SealedEnvelope = serde_json::from_str(opened.value())
            .map_err(|e| cookie_error!("Malformed session cookie", "private_sealer", e))?;

        if let Some(exp) = envelope.exp {
            if Utc::now().timestamp_millis() >= exp {
                debug!(expired_at = exp, "Session cookie expired");
                return Err(cookie_error!("Session cookie expired", "private_sealer"));
            }
        }

        Ok(envelope.dat)
    }
}
