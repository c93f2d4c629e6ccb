use crate::{
    client::token::{AccessToken, TokenResponse},
    clock::{Clock, SystemClock},
    config::Settings,
    core::ranking::RankingMode,
    error::{AuthError, AvailabilityError, BotResult, FetchError},
};
use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use serde::Serialize;
use std::{fmt, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

const USER_AGENT: &str = concat!("pp-watcher/", env!("CARGO_PKG_VERSION"));

pub(crate) enum Endpoint {
    Token,
    ApiRoot,
    Ranking(RankingMode),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Endpoint::Token => write!(f, "/oauth/token"),
            Endpoint::ApiRoot => write!(f, "/api/v2"),
            Endpoint::Ranking(mode) => write!(f, "/api/v2/rankings/{}/performance", mode),
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// osu! API v2 client authenticated through the client-credentials grant.
///
/// The token is refreshed lazily: every authorized call first makes sure the current token
/// is still valid and only then talks to the API. Failures are reported, never retried.
pub struct OsuClient {
    http_client: Client,
    base_url: String,
    credentials: Credentials,
    // Held across a refresh, so callers never see a half-swapped token.
    token: Mutex<Option<AccessToken>>,
    clock: Arc<dyn Clock>,
}

impl OsuClient {
    pub fn new(base_url: String, timeout: Duration, credentials: Credentials) -> BotResult<Self> {
        Self::with_clock(base_url, timeout, credentials, Arc::new(SystemClock))
    }

    pub fn with_clock(
        base_url: String,
        timeout: Duration,
        credentials: Credentials,
        clock: Arc<dyn Clock>,
    ) -> BotResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            token: Mutex::new(None),
            clock,
        })
    }

    pub fn from_settings(settings: &Settings) -> BotResult<Self> {
        Self::new(
            settings.osu_base_url.clone(),
            Duration::from_secs(settings.osu_api_timeout_sec),
            Credentials {
                client_id: settings.osu_oauth_client_id.clone(),
                client_secret: settings.osu_oauth_client_secret.clone(),
            },
        )
    }

    fn url(&self, endpoint: &Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Makes sure a valid access token is held, requesting a new one if needed.
    /// No I/O happens while the current token is unexpired.
    pub async fn ensure_token(&self) -> Result<(), AuthError> {
        self.authorization().await.map(|_| ())
    }

    /// Asserts the API answers with valid credentials. Only meant for startup.
    pub async fn check_reachable(&self) -> Result<(), AvailabilityError> {
        let authorization = self.authorization().await?;

        let response = self
            .http_client
            .get(self.url(&Endpoint::ApiRoot))
            .header(AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| AvailabilityError::Transport(e.to_string()))?;

        // The API root is not a resource: authorized requests get NOT_FOUND,
        // bad credentials get UNAUTHORIZED.
        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            received => Err(AvailabilityError::UnexpectedStatus {
                expected: StatusCode::NOT_FOUND,
                received,
            }),
        }
    }

    /// Authorized GET returning the raw body of a successful response.
    pub(crate) async fn get<Q: Serialize + ?Sized>(
        &self,
        endpoint: &Endpoint,
        query: &Q,
    ) -> Result<String, FetchError> {
        let authorization = self.authorization().await?;
        let url = self.url(endpoint);
        debug!("GET {url}");

        let response = self
            .http_client
            .get(&url)
            .header(AUTHORIZATION, authorization)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .text()
                .await
                .map_err(|e| FetchError::Transport(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(FetchError::Unauthorized(format!(
                "{} rejected the access token",
                endpoint
            ))),
            status => Err(FetchError::UnexpectedStatus(status)),
        }
    }

    /// Value for the `Authorization` header, refreshing the token first if it went stale.
    async fn authorization(&self) -> Result<String, AuthError> {
        let mut slot = self.token.lock().await;

        if let Some(token) = slot.as_ref() {
            if token.is_valid_at(self.clock.now()) {
                return Ok(token.bearer());
            }
        }

        info!("The osu! API access token has expired. Requesting a new one...");
        let token = self.request_token().await.map_err(|e| {
            error!("Failed to request an osu! API access token: {e}");
            e
        })?;

        let remaining = token.expires_at().saturating_duration_since(self.clock.now());
        let expires_at = chrono::Utc::now()
            + chrono::Duration::from_std(remaining).unwrap_or_else(|_| chrono::Duration::zero());
        info!("The osu! API access token has been updated and expires at {expires_at}.");

        let bearer = token.bearer();
        *slot = Some(token);
        Ok(bearer)
    }

    async fn request_token(&self) -> Result<AccessToken, AuthError> {
        let issued_at = self.clock.now();
        let form = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("scope", "public"),
        ];

        let response = self
            .http_client
            .post(self.url(&Endpoint::Token))
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        // osu! answers an unknown client id with INTERNAL_SERVER_ERROR.
        if status == StatusCode::UNAUTHORIZED || status.is_server_error() {
            return Err(AuthError::Rejected(status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        TokenResponse::parse(&body)?.into_token(issued_at)
    }

    #[cfg(test)]
    pub(crate) async fn token_expiry(&self) -> Option<std::time::Instant> {
        self.token.lock().await.as_ref().map(|t| t.expires_at())
    }
}
