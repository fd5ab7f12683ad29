#![forbid(unsafe_code)]

use std::sync::Arc;

use taskboard_core::DecodeError;
use thiserror::Error;

use crate::transport::TransportError;

/// Terminal failure of one collection subscription.
///
/// The collection stays failed until it is subscribed again.
#[derive(Debug, Clone, Error)]
pub enum SubscriptionError {
    #[error("subscription to {query} failed: {source}")]
    Transport {
        query: String,
        #[source]
        source: TransportError,
    },
    #[error("snapshot for {query} could not be decoded: {source}")]
    Decode {
        query: String,
        #[source]
        source: Arc<DecodeError>,
    },
}

impl SubscriptionError {
    #[must_use]
    pub fn query(&self) -> &str {
        match self {
            Self::Transport { query, .. } | Self::Decode { query, .. } => query,
        }
    }
}

impl PartialEq for SubscriptionError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Transport { query: a, source: sa },
                Self::Transport { query: b, source: sb },
            ) => a == b && sa == sb,
            (Self::Decode { query: a, source: sa }, Self::Decode { query: b, source: sb }) => {
                a == b && Arc::ptr_eq(sa, sb)
            }
            _ => false,
        }
    }
}
