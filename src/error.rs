use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CalTopo API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// Whether the error stems from caller input rather than the service itself
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Status code of a failed CalTopo call, if that is what this error is
    pub fn api_status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_includes_status_and_body() {
        let err = Error::Api {
            status: 403,
            body: "bad signature".to_string(),
        };
        assert_eq!(err.to_string(), "CalTopo API error 403: bad signature");
        assert_eq!(err.api_status(), Some(403));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_validation_classification() {
        let err = Error::Validation("Missing 'title' field".to_string());
        assert!(err.is_validation());
        assert_eq!(err.api_status(), None);
    }
}
