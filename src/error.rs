use reqwest::StatusCode;
use thiserror::Error;

/// Custom Error and Result types to unify errors from all sources.
pub type BotResult<T> = Result<T, BotError>;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Configuration Error: {0}")]
    Config(String),
    #[error("Auth Error: {0}")]
    Auth(#[from] AuthError),
    #[error("Fetch Error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Availability Error: {0}")]
    Availability(#[from] AvailabilityError),
    #[error("HTTP Error: {0}")]
    Http(String),
    #[error("Slack Error: {0}")]
    Slack(String),
    #[error("Channel Send Error: {0}")]
    ChannelSend(String),
    #[error("Template Error: {0}")]
    Template(String),
}

/// Failure of the client-credentials token exchange.
#[derive(Debug, Error)]
pub enum AuthError {
    // osu! answers an unknown client id with INTERNAL_SERVER_ERROR, not UNAUTHORIZED.
    #[error("token endpoint rejected the client credentials ({0})")]
    Rejected(StatusCode),
    #[error("token response is missing the '{0}' field")]
    MissingField(&'static str),
    #[error("token response could not be decoded: {0}")]
    Malformed(String),
    #[error("token request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    UnexpectedStatus(StatusCode),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
pub enum AvailabilityError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("probe request failed: {0}")]
    Transport(String),
    #[error("API returned status code {received}. Expected: {expected}")]
    UnexpectedStatus {
        expected: StatusCode,
        received: StatusCode,
    },
}

impl From<AuthError> for FetchError {
    fn from(error: AuthError) -> Self {
        FetchError::Unauthorized(error.to_string())
    }
}

impl From<reqwest::Error> for BotError {
    fn from(error: reqwest::Error) -> Self {
        BotError::Http(error.to_string())
    }
}

impl From<figment::Error> for BotError {
    fn from(error: figment::Error) -> Self {
        BotError::Config(error.to_string())
    }
}

impl From<minijinja::Error> for BotError {
    fn from(error: minijinja::Error) -> Self {
        BotError::Template(error.to_string())
    }
}
