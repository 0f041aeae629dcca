use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the SIS backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to send request to {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API request failed with status {status} for URL {url}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    #[error("failed to parse JSON response from {url} (body starts with: {excerpt}): {source}")]
    Decode {
        url: String,
        excerpt: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Blocking failure of the initial grid load. Nothing is rendered when this occurs.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load course section {section_id}: {source}")]
    CourseSection {
        section_id: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to load grades for course section {section_id}: {source}")]
    Grades {
        section_id: String,
        #[source]
        source: ApiError,
    },
}
