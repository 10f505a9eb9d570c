//! Pre-release suffix handling (`-rc.3`, `-preview.0`)
//!
//! Only the two-part `TAG.N` shape is accepted, matching the versions this
//! tool itself writes into chart manifests.

use crate::error::{ReleaseError, Result};
use std::cmp::Ordering;
use std::fmt;

/// Pre-release marker with its iteration number
///
/// # Examples
/// - "rc.0" -> Prerelease { tag: "rc", number: 0 }
/// - "preview.12" -> Prerelease { tag: "preview", number: 12 }
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Prerelease {
    /// The pre-release family, e.g. "rc" or "preview"
    pub tag: String,
    /// Iteration within the family, starting at 0
    pub number: u64,
}

impl Prerelease {
    pub fn new(tag: impl Into<String>, number: u64) -> Self {
        Prerelease {
            tag: tag.into(),
            number,
        }
    }

    /// First iteration of a pre-release family (`{tag}.0`)
    pub fn first(tag: impl Into<String>) -> Self {
        Prerelease::new(tag, 0)
    }

    /// Parse a pre-release suffix of the form `TAG.N`
    pub fn parse(s: &str) -> Result<Self> {
        let (tag, number) = s.split_once('.').ok_or_else(|| {
            ReleaseError::version(format!(
                "Invalid pre-release '{}': expected TAG.N (e.g. rc.0)",
                s
            ))
        })?;

        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ReleaseError::version(format!(
                "Invalid pre-release identifier: '{}'",
                tag
            )));
        }
        if tag.chars().all(|c| c.is_ascii_digit()) {
            return Err(ReleaseError::version(format!(
                "Pre-release identifier must not be numeric: '{}'",
                tag
            )));
        }

        let number = number.parse::<u64>().map_err(|_| {
            ReleaseError::version(format!("Invalid pre-release number: '{}'", number))
        })?;

        Ok(Prerelease::new(tag, number))
    }

    /// Next iteration within the same family
    pub fn next(&self) -> Result<Self> {
        let number = self.number.checked_add(1).ok_or_else(|| {
            ReleaseError::version(format!("Pre-release number of '{}' cannot be incremented", self))
        })?;
        Ok(Prerelease::new(self.tag.clone(), number))
    }

    /// Whether this marker belongs to the given family
    pub fn is_family(&self, prefix: &str) -> bool {
        self.tag == prefix
    }
}

impl Ord for Prerelease {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tag
            .cmp(&other.tag)
            .then_with(|| self.number.cmp(&other.number))
    }
}

impl PartialOrd for Prerelease {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Prerelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.tag, self.number)
    }
}
