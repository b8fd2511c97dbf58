use thiserror::Error;

/// A single provider call failed.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Connection, TLS, timeout or body decoding failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("Provider rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl DispatchError {
    /// HTTP status for rejections, `None` for transport failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            DispatchError::Rejected { status, .. } => Some(*status),
            DispatchError::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_message_carries_body() {
        let err = DispatchError::Rejected {
            status: 500,
            body: "upstream exploded".to_string(),
        };
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("upstream exploded"));
    }
}
