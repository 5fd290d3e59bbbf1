use thiserror::Error;

/// Transport-level failure talking to a publisher.
///
/// Any of these aborts the whole extraction for the article; the candidate
/// loop does not move on to the next URL.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("failed reading body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("request to {url} failed: {message}")]
    Other { url: String, message: String },
}

impl FetchError {
    /// Classify a reqwest error raised while requesting `url`.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        let message = err.to_string();
        if err.is_timeout() {
            FetchError::Timeout { url }
        } else if err.is_connect() {
            FetchError::Connect { url, message }
        } else if err.is_body() || err.is_decode() {
            FetchError::Body { url, message }
        } else {
            FetchError::Other { url, message }
        }
    }
}
