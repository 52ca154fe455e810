//! Core type definitions shared by the registry and delivery layers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where a registered file's bytes live.
///
/// Resolved once per request; delivery dispatches on the variant instead of
/// probing individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FileOrigin {
    /// Bytes held in the local byte store, addressed by `(id, name)`.
    Local {
        /// Location of the blob inside the store.
        path: PathBuf,
    },
    /// Bytes held by a third party that honors HTTP range requests.
    Remote {
        /// Absolute URL of the remote file.
        url: String,
        /// Whether the remote is expected to answer `Range` requests.
        proxied_range_supported: bool,
    },
}

impl FileOrigin {
    /// Build a [`FileOrigin::Local`].
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local { path: path.into() }
    }

    /// Build a [`FileOrigin::Remote`].
    pub fn remote(url: impl Into<String>, proxied_range_supported: bool) -> Self {
        Self::Remote {
            url: url.into(),
            proxied_range_supported,
        }
    }

    /// Short kind tag as stored in the registry.
    pub fn kind(&self) -> OriginKind {
        match self {
            Self::Local { .. } => OriginKind::Local,
            Self::Remote { .. } => OriginKind::Remote,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

/// Discriminant of [`FileOrigin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginKind {
    Local,
    Remote,
}

impl OriginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OriginKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(format!("unknown origin kind: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trip() {
        for kind in [OriginKind::Local, OriginKind::Remote] {
            let parsed: OriginKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("s3".parse::<OriginKind>().is_err());
    }

    #[test]
    fn origin_kind_matches_variant() {
        assert_eq!(FileOrigin::local("AbC12XyZ/movie.mp4").kind(), OriginKind::Local);
        assert_eq!(
            FileOrigin::remote("https://cdn.example.com/x", false).kind(),
            OriginKind::Remote
        );
    }

    #[test]
    fn origin_serializes_tagged() {
        let origin = FileOrigin::remote("https://cdn.example.com/x", true);
        let json = serde_json::to_value(&origin).unwrap();
        assert_eq!(json["kind"], "remote");
        assert_eq!(json["proxied_range_supported"], true);
    }
}
