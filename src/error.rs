//! Error taxonomy shared by the pipeline, the streams and the request surface.
//!
//! Only `Configuration` is fatal. Everything else is isolated at the layer
//! that produced it and converted into an empty or neutral result.

/// Failure classes of the sentinel pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SentinelError {
    /// One fetch adapter failed or timed out. Degrades that source to zero items.
    #[error("source {name} unavailable: {reason}")]
    SourceUnavailable { name: String, reason: String },

    /// Invalid static configuration (e.g. ensemble weights). Fatal at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Request gate rejected the call.
    #[error("rate limited on {endpoint}")]
    RateLimited { endpoint: String },

    /// LLM / RAG / persistence / alert destination failed.
    #[error("downstream unavailable: {0}")]
    DownstreamUnavailable(String),

    /// Streaming peer went away.
    #[error("connection closed")]
    ConnectionClosed,
}

impl SentinelError {
    pub fn source_unavailable(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn downstream(reason: impl ToString) -> Self {
        Self::DownstreamUnavailable(reason.to_string())
    }
}

pub type SentinelResult<T> = Result<T, SentinelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let e = SentinelError::source_unavailable("reddit", "timeout after 5000ms");
        assert_eq!(
            e.to_string(),
            "source reddit unavailable: timeout after 5000ms"
        );
        let e = SentinelError::RateLimited {
            endpoint: "/signals".into(),
        };
        assert_eq!(e.to_string(), "rate limited on /signals");
    }
}
