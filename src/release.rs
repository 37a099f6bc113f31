//! Fully-qualified compiler release identifiers.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr};

/// A specific compiler build: `vMAJOR.MINOR.PATCH+commit.HHHHHHHH`.
///
/// Ordered by the wrapped [`Version`] alone — the commit hash is build
/// metadata, not a distinguishing ordering input, the same rule semver
/// itself applies to build-metadata suffixes.
#[derive(Clone, Debug, Eq, Serialize, Deserialize)]
pub struct ReleaseId {
    pub version: Version,
    /// Short or long commit hash, without a leading `commit.`.
    pub commit: String,
}

impl ReleaseId {
    pub fn new(version: Version, commit: impl Into<String>) -> Self {
        Self { version, commit: commit.into() }
    }
}

impl PartialEq for ReleaseId {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.commit == other.commit
    }
}

impl std::hash::Hash for ReleaseId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.version.hash(state);
        self.commit.hash(state);
    }
}

impl PartialOrd for ReleaseId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReleaseId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version).then_with(|| self.commit.cmp(&other.commit))
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}+commit.{}", self.version, self.commit)
    }
}

/// Error returned when a string doesn't match `vMAJOR.MINOR.PATCH+commit.HASH`.
#[derive(Debug, thiserror::Error)]
#[error("invalid release id: {0:?}")]
pub struct ParseReleaseIdError(String);

impl FromStr for ReleaseId {
    type Err = ParseReleaseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix('v').unwrap_or(s);
        let (version_part, commit_part) =
            stripped.split_once("+commit.").ok_or_else(|| ParseReleaseIdError(s.to_string()))?;
        let version =
            Version::parse(version_part).map_err(|_| ParseReleaseIdError(s.to_string()))?;
        if commit_part.is_empty() {
            return Err(ParseReleaseIdError(s.to_string()));
        }
        Ok(Self { version, commit: commit_part.to_string() })
    }
}
