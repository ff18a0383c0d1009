use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Card protocol version as carried on the wire, e.g. `"4.0"`.
///
/// Compared component-wise on its dot-separated numeric parts, with missing
/// trailing parts treated as zero (`"4"` == `"4.0"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(String);

impl ProtocolVersion {
    /// The version every card built here is stamped with.
    pub const CURRENT: &'static str = "4.0";

    /// First version whose cards carry signatures.
    pub const SIGNATURES_SINCE: &'static str = "4.0";

    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn current() -> Self {
        Self::new(Self::CURRENT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn components(&self) -> Option<Vec<u64>> {
        self.0
            .trim()
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect()
    }

    /// Compare two versions. `None` when either side is not a dotted number.
    pub fn compare(&self, other: &ProtocolVersion) -> Option<Ordering> {
        let mut a = self.components()?;
        let mut b = other.components()?;
        let len = a.len().max(b.len());
        a.resize(len, 0);
        b.resize(len, 0);
        Some(a.cmp(&b))
    }

    /// Whether this version predates signatures. Unparseable versions are
    /// never legacy, so they always go through signature checks.
    pub fn is_legacy(&self) -> bool {
        matches!(
            self.compare(&ProtocolVersion::new(Self::SIGNATURES_SINCE)),
            Some(Ordering::Less)
        )
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
