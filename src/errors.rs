//!
//! src/errors.rs  Oct 19th, 2026
//!
//! Defines enums and methods of error conversion
//! for errors the release crawler uses
//!
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("rate limited: retry {0:?}")]
    RateLimited(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("db error: {0}")]
    Db(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl ReleaseError {
    /// Search results past the upstream result cap come back as 400/404
    pub fn is_search_cap(&self) -> bool {
        matches!(self, ReleaseError::Status { status: 400 | 404, .. })
    }
}

impl From<reqwest::Error> for ReleaseError {
    fn from(e: reqwest::Error) -> Self { ReleaseError::Http(e.to_string()) }
}

impl From<serde_json::Error> for ReleaseError {
    fn from(e: serde_json::Error) -> Self { ReleaseError::Parse(e.to_string()) }
}

impl From<sqlx::Error> for ReleaseError {
    fn from(e: sqlx::Error) -> Self { ReleaseError::Db(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_cap_only_matches_client_errors() {
        let capped = ReleaseError::Status { status: 404, body: String::new() };
        let bad    = ReleaseError::Status { status: 400, body: String::new() };
        let server = ReleaseError::Status { status: 502, body: String::new() };

        assert!(capped.is_search_cap());
        assert!(bad.is_search_cap());
        assert!(!server.is_search_cap());
        assert!(!ReleaseError::Http("timeout".into()).is_search_cap());
    }
}
