//! Content-addressed storage collaborators.
//!
//! Rendering never touches the network. This module holds the interface the
//! surrounding application uses to fetch Markdown sources from, and publish
//! rendered output to, a content-addressed store such as IPFS.
//!
//! Fetching is the only call whose failure the caller must handle. Telemetry
//! and publishing degrade to [`BestEffort::Unavailable`], which keeps "the
//! node is offline" distinct from a zero reading or an empty identifier.

#[cfg(feature = "store")]
mod ipfs;

use std::fmt;

use serde::Serialize;

use crate::error::Result;

#[cfg(feature = "store")]
pub use ipfs::{IpfsClient, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT};

/// Result of a call that may silently fail.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestEffort<T> {
    /// The collaborator answered
    Available(T),
    /// The collaborator could not be reached or gave no usable answer
    Unavailable,
}

impl<T> BestEffort<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, BestEffort::Available(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            BestEffort::Available(value) => Some(value),
            BestEffort::Unavailable => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> BestEffort<U> {
        match self {
            BestEffort::Available(value) => BestEffort::Available(f(value)),
            BestEffort::Unavailable => BestEffort::Unavailable,
        }
    }

    /// The value, or `default` when unavailable.
    pub fn value_or(self, default: T) -> T {
        self.into_option().unwrap_or(default)
    }
}

impl<T: Default> BestEffort<T> {
    /// The value, or the type's zero default when unavailable.
    pub fn value_or_default(self) -> T {
        self.into_option().unwrap_or_default()
    }
}

impl<T> From<Option<T>> for BestEffort<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => BestEffort::Available(value),
            None => BestEffort::Unavailable,
        }
    }
}

/// Identifier of published content (an IPFS CID). Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Wrap a non-empty identifier.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == id.len() {
            Some(Self(id))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current transfer rates in bytes per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Bandwidth {
    pub rate_in: f64,
    pub rate_out: f64,
}

/// A content-addressed store.
pub trait ContentStore: Send + Sync {
    /// Retrieve the content at `path`. Connection and timeout errors propagate.
    fn fetch(&self, path: &str) -> Result<Vec<u8>>;

    /// Store `content` under `name` and return its identifier.
    fn publish(&self, name: &str, content: &[u8]) -> BestEffort<ContentId>;

    /// Number of connected peers.
    fn peer_count(&self) -> BestEffort<usize>;

    /// Current transfer rates.
    fn bandwidth(&self) -> BestEffort<Bandwidth>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_effort_defaults() {
        let peers: BestEffort<usize> = BestEffort::Unavailable;
        assert!(!peers.is_available());
        assert_eq!(peers.value_or_default(), 0);

        let bw: BestEffort<Bandwidth> = BestEffort::Unavailable;
        assert_eq!(bw.value_or_default(), Bandwidth::default());

        assert_eq!(BestEffort::Available(7).value_or(1), 7);
    }

    #[test]
    fn test_best_effort_map_and_option() {
        let doubled = BestEffort::Available(21).map(|n| n * 2);
        assert_eq!(doubled.into_option(), Some(42));
        assert_eq!(BestEffort::from(None::<u8>), BestEffort::Unavailable);
    }

    #[test]
    fn test_content_id_never_empty() {
        assert!(ContentId::new("").is_none());
        assert!(ContentId::new("  \n").is_none());

        let id = ContentId::new(" QmHash\n").unwrap();
        assert_eq!(id.as_str(), "QmHash");
        assert_eq!(id.to_string(), "QmHash");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"QmHash\"");
    }
}
