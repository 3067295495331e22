// ABOUTME: Core identifier types - AntennaId and Group.
// ABOUTME: Both are opaque string tokens with parsing helpers for CLI lists.

use serde::{Deserialize, Serialize};

/// A single antenna, addressed by a short token such as "1a".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AntennaId(String);

impl AntennaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a comma-separated list such as "1a,2b, 3c".
    /// Empty entries are skipped.
    pub fn parse_list(list: &str) -> Vec<AntennaId> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(AntennaId::new)
            .collect()
    }

    /// Join antennas into the comma-separated form device commands expect.
    pub fn join(ants: &[AntennaId]) -> String {
        ants.iter().map(AntennaId::as_str).collect::<Vec<_>>().join(",")
    }
}

impl std::fmt::Display for AntennaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AntennaId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AntennaId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A named partition of the antenna fleet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Group(String);

impl Group {
    /// Idle pool.
    pub const NONE: &'static str = "none";
    /// Reserved, in-use pool.
    pub const BFA: &'static str = "bfa";
    /// Maintenance pool.
    pub const MAINT: &'static str = "maint";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn none() -> Self {
        Self::new(Self::NONE)
    }

    pub fn bfa() -> Self {
        Self::new(Self::BFA)
    }

    pub fn maint() -> Self {
        Self::new(Self::MAINT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Group {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Group {
    fn from(s: String) -> Self {
        Self(s)
    }
}
