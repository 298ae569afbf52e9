//! Error types for the Stockholm EBikes client

use thiserror::Error;

/// Errors that can occur when using the Stockholm EBikes client
#[derive(Error, Debug)]
pub enum EbikesError {
    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service explicitly rejected the supplied credentials
    #[error("authentication rejected by service: {body}")]
    AuthenticationRejected {
        /// The JSON error payload returned by the login endpoint
        body: serde_json::Value,
    },

    /// The login exchange returned a status or shape outside the known protocol
    #[error("unexpected authentication response (status {status}): {body}")]
    UnexpectedAuthResponse {
        /// The status code that was received
        status: reqwest::StatusCode,
        /// The raw response body, kept verbatim for diagnosis
        body: String,
    },

    /// An authenticated call returned a non-success status
    #[error("service returned status {status}: {body}")]
    RemoteService {
        /// The status code that was received
        status: reqwest::StatusCode,
        /// The JSON error payload returned by the service
        body: serde_json::Value,
    },

    /// The service area GeoJSON field was missing or unparsable
    #[error("malformed service area data: {0}")]
    MalformedAreaData(String),

    /// A response body could not be parsed as JSON
    #[error("failed to parse response body as JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Client initialization failed
    #[error("client initialization failed: {0}")]
    ClientInit(String),

    /// A request path could not be resolved against the base URL
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}
