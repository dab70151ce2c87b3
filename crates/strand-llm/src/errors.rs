//! Gateway error taxonomy.

/// Failures of the model provider call.
///
/// All of these are systemic: unlike per-tool errors they are not fed back
/// to the model but escalate the session to its failed terminal state.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned a non-success status.
    #[error("provider returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (may be truncated).
        body: String,
    },

    /// Provider response could not be interpreted — missing choices,
    /// unparsable tool-call arguments, neither text nor tool calls.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        let e = GatewayError::Status {
            status: 429,
            body: "rate limited".into(),
        };
        assert_eq!(
            e.to_string(),
            "provider returned status 429: rate limited"
        );
    }

    #[test]
    fn malformed_display() {
        let e = GatewayError::MalformedResponse("no choices".into());
        assert!(e.to_string().contains("no choices"));
    }
}
