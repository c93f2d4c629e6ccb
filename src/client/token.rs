use crate::error::AuthError;
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Subtracted from the lifetime declared by the server, so a token is never sent right at
/// the edge of its expiry.
pub const TOKEN_SAFETY_MARGIN: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: Instant,
}

impl AccessToken {
    /// Fails when the declared lifetime does not fit on the monotonic clock.
    pub fn new(secret: String, issued_at: Instant, lifetime: Duration) -> Result<Self, AuthError> {
        let usable_for = lifetime.saturating_sub(TOKEN_SAFETY_MARGIN);
        let expires_at = issued_at.checked_add(usable_for).ok_or_else(|| {
            AuthError::Malformed(format!("expires_in out of range: {}s", lifetime.as_secs()))
        })?;
        Ok(Self { secret, expires_at })
    }

    /// Usable strictly before the margin-adjusted expiry.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.secret)
    }
}

// Keep the credential itself out of logs.
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Body of the client-credentials exchange. Both fields are optional at the decoding
/// level so a missing one is reported by name instead of as a generic decode failure.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

impl TokenResponse {
    pub(crate) fn parse(body: &str) -> Result<Self, AuthError> {
        serde_json::from_str(body).map_err(|e| AuthError::Malformed(e.to_string()))
    }

    pub(crate) fn into_token(self, issued_at: Instant) -> Result<AccessToken, AuthError> {
        let secret = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingField("access_token"))?;
        let expires_in = self.expires_in.ok_or(AuthError::MissingField("expires_in"))?;
        AccessToken::new(secret, issued_at, Duration::from_secs(expires_in))
    }
}
