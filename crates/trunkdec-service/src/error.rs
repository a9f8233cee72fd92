//! Error types for the ingestion service and their HTTP mapping.

use thiserror::Error;

use crate::http::Response;

/// Errors surfaced by the service and its HTTP layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The processing queue is at capacity.
    #[error("processing queue is full")]
    QueueFull,

    /// No job is tracked under the given identifier.
    #[error("job not found: {id}")]
    JobNotFound {
        /// The identifier the client asked about.
        id: String,
    },

    /// The request carried no acceptable credentials.
    #[error("authentication required")]
    AuthRequired,

    /// The multipart body could not be parsed.
    #[error("upload parse failed: {0}")]
    UploadParseFailed(String),

    /// A configuration this build cannot honor.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// TLS material could not be loaded.
    #[error("TLS setup failed: {0}")]
    Tls(String),

    /// Configuration file problems.
    #[error("config error: {0}")]
    Config(String),
}

impl ServiceError {
    /// The HTTP response this error maps to under the API contract.
    ///
    /// Responses are always JSON with an `error` field; internal detail
    /// (paths, parser messages) never reaches the client.
    #[must_use]
    pub fn to_response(&self) -> Response {
        match self {
            ServiceError::QueueFull => Response::error(503, "Processing queue is full"),
            ServiceError::JobNotFound { .. } => Response::error(404, "Job not found"),
            ServiceError::AuthRequired => Response::error(401, "Authentication required")
                .with_header("WWW-Authenticate", "Bearer realm=\"trunkdec\""),
            ServiceError::UploadParseFailed(_) => {
                Response::error(400, "Malformed multipart body")
            }
            ServiceError::Unsupported(what) => {
                Response::error(400, &format!("Unsupported: {what}"))
            }
            ServiceError::Io(_) | ServiceError::Tls(_) | ServiceError::Config(_) => {
                Response::error(500, "Internal server error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_status_codes() {
        assert_eq!(ServiceError::QueueFull.to_response().status, 503);
        assert_eq!(
            ServiceError::JobNotFound {
                id: "x".to_string()
            }
            .to_response()
            .status,
            404
        );
        assert_eq!(ServiceError::AuthRequired.to_response().status, 401);
        assert_eq!(
            ServiceError::UploadParseFailed("detail".to_string())
                .to_response()
                .status,
            400
        );
        assert_eq!(
            ServiceError::Unsupported("audio format \"webm\"".to_string())
                .to_response()
                .status,
            400
        );
        assert_eq!(
            ServiceError::Tls("bad pem".to_string()).to_response().status,
            500
        );
    }

    #[test]
    fn auth_response_carries_the_challenge() {
        let resp = ServiceError::AuthRequired.to_response();
        assert!(resp
            .headers
            .iter()
            .any(|(k, v)| k == "WWW-Authenticate" && v.contains("Bearer")));
    }

    #[test]
    fn internal_detail_stays_out_of_the_body() {
        let resp =
            ServiceError::UploadParseFailed("/tmp/secret/path oddity".to_string()).to_response();
        let body = String::from_utf8(resp.body).unwrap();
        assert!(!body.contains("/tmp"));
    }
}
