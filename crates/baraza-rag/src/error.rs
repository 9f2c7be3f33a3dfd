use thiserror::Error;

/// Failure of one retrieval+generation call.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("backend request failed: {0}")]
    Http(String),

    #[error("backend request timed out: {0}")]
    Timeout(String),

    #[error("unexpected backend response: {0}")]
    Decode(String),

    #[error("collection not found: {0}")]
    Collection(String),

    #[error("query processor failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for QueryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Http(e.to_string())
        }
    }
}
