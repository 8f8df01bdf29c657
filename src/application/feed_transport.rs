// Transport trait for the live push feed
use axum::http::Uri;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;
use thiserror::Error;

/// Failures of a live producer. None of these reach the dashboard user; they
/// all end in the synthetic fallback.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid feed target `{url}`: {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("feed transport error: {0}")]
    Transport(String),

    #[error("feed connection closed")]
    Closed,
}

/// Raw text payloads from an open feed. The stream ends when the peer closes.
pub type MessageStream = BoxStream<'static, Result<String, FeedError>>;

/// A validated `ws://` or `wss://` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedTarget {
    url: String,
}

impl FeedTarget {
    pub fn parse(url: &str) -> Result<Self, FeedError> {
        let url = url.trim();
        let invalid = |reason: &str| FeedError::InvalidTarget {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let uri: Uri = url.parse().map_err(|_| invalid("not a valid URI"))?;
        match uri.scheme_str() {
            Some("ws") | Some("wss") => {}
            Some(_) => return Err(invalid("scheme must be ws or wss")),
            None => return Err(invalid("missing scheme")),
        }
        if uri.host().is_none_or(str::is_empty) {
            return Err(invalid("missing host"));
        }

        Ok(Self {
            url: url.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for FeedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Open a push connection; resolves once the connection is established.
    async fn open(&self, target: &FeedTarget) -> Result<MessageStream, FeedError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_websocket_urls() {
        let target = FeedTarget::parse(" ws://localhost:9000/feed ").unwrap();
        assert_eq!(target.as_str(), "ws://localhost:9000/feed");
        assert!(FeedTarget::parse("wss://turbine.example.com/stream").is_ok());
    }

    #[test]
    fn test_rejects_unusable_urls() {
        for url in ["not a url", "http://localhost/feed", "localhost:9000", "ws:///feed"] {
            assert!(
                matches!(FeedTarget::parse(url), Err(FeedError::InvalidTarget { .. })),
                "{url} should be rejected"
            );
        }
    }
}
