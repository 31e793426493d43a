//! Error taxonomy shared by the scraper, the notifier and the bootstrap.

/// Failure talking to the statistics service.
#[derive(Debug, thiserror::Error)]
pub enum RemoteServiceError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {code}: {message}")]
    Api { code: u16, message: String },
    #[error("batch of {0} ids exceeds the limit of 100")]
    BatchTooLarge(usize),
    #[error("URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Outbound chat delivery failure.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat platform rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("remote service: {0}")]
    Remote(#[from] RemoteServiceError),
    #[error("invalid ship list returned for account {account_id}")]
    InvalidShipList { account_id: i64 },
    #[error("unknown realm `{0}` (expected eu, na or asia)")]
    UnknownRealm(String),
    #[error("{0} must be set")]
    MissingEnv(&'static str),
    #[error("{name} has an invalid value `{value}`")]
    InvalidEnv { name: &'static str, value: String },
    #[error("store: {0}")]
    Store(#[from] sqlx::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
