use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

pub const UNKNOWN_VIEWER: &str = "unknown";

/// Best-effort client identity used to de-duplicate views.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewerKey(String);

impl ViewerKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// First `X-Forwarded-For` entry, then the peer address, then [`UNKNOWN_VIEWER`].
    pub fn resolve(forwarded_for: Option<&str>, peer: Option<IpAddr>) -> Self {
        let forwarded = forwarded_for
            .and_then(|xf| xf.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match (forwarded, peer) {
            (Some(ip), _) => Self(ip.to_string()),
            (None, Some(addr)) => Self(addr.to_string()),
            (None, None) => Self(UNKNOWN_VIEWER.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
