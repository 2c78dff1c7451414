//! Feed error taxonomy.
//!
//! Only `Transport` ends a session. Everything else drops the single
//! message (or single oracle read) that caused it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// Connection refused, closed, timed out or the socket errored.
    #[error("transport: {0}")]
    Transport(String),

    /// Message or payload could not be parsed.
    #[error("decode: {0}")]
    Decode(String),

    /// Price parsed but was zero, negative or not finite.
    #[error("invalid price {0}")]
    InvalidPrice(f64),

    /// The JSON-RPC node returned an error object.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl FeedError {
    /// Whether the owning session must be torn down.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Short label for the `reason` metric dimension.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
            Self::InvalidPrice(_) => "invalid_price",
            Self::Rpc { .. } => "rpc",
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Parse a decimal price string and reject non-positive values.
pub fn parse_price(raw: &str) -> Result<f64, FeedError> {
    let price: f64 = raw
        .trim()
        .parse()
        .map_err(|_| FeedError::Decode(format!("non-numeric price {raw:?}")))?;
    if crate::domain::quote::is_valid_price(price) {
        Ok(price)
    } else {
        Err(FeedError::InvalidPrice(price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("65000.12").unwrap(), 65_000.12);
        assert!(matches!(parse_price("abc"), Err(FeedError::Decode(_))));
        assert!(matches!(parse_price("0"), Err(FeedError::InvalidPrice(_))));
        assert!(matches!(parse_price("-3.5"), Err(FeedError::InvalidPrice(_))));
    }

    #[test]
    fn test_only_transport_tears_down() {
        assert!(FeedError::Transport("closed".into()).is_transport());
        assert!(!FeedError::Decode("bad".into()).is_transport());
        assert!(!FeedError::InvalidPrice(-1.0).is_transport());
        assert_eq!(
            FeedError::Rpc { code: -32000, message: "x".into() }.reason(),
            "rpc"
        );
    }
}
