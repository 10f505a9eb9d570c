use crate::domain::Prerelease;
use crate::error::{ReleaseError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Semantic version in canonical `MAJOR.MINOR.PATCH[-TAG.N]` form
///
/// Pre-releases of a version sort before the release of that version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<Prerelease>,
}

/// How a version is incremented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpLevel {
    /// patch += 1, pre-release dropped
    Patch,
    /// minor += 1, patch = 0, pre-release dropped
    Minor,
    /// minor += 1, patch = 0, pre-release `{prefix}.0`
    PreMinor,
    /// pre-release number += 1 within the same family, else like `PreMinor`
    Prerelease,
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BumpLevel::Patch => "patch",
            BumpLevel::Minor => "minor",
            BumpLevel::PreMinor => "preminor",
            BumpLevel::Prerelease => "prerelease",
        };
        f.write_str(name)
    }
}

impl SemanticVersion {
    /// Create a release version without a pre-release suffix
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        SemanticVersion {
            major,
            minor,
            patch,
            prerelease: None,
        }
    }

    pub fn with_prerelease(mut self, prerelease: Prerelease) -> Self {
        self.prerelease = Some(prerelease);
        self
    }

    /// Parse a canonical version string (e.g. "1.5.0" or "1.5.0-rc.1")
    ///
    /// Build metadata and leading `v` prefixes are rejected: the value must
    /// round-trip through [`fmt::Display`] unchanged.
    pub fn parse(text: &str) -> Result<Self> {
        let parsed = semver::Version::parse(text)
            .map_err(|e| ReleaseError::version(format!("Invalid version '{}': {}", text, e)))?;

        if !parsed.build.is_empty() {
            return Err(ReleaseError::version(format!(
                "Invalid version '{}': build metadata is not supported",
                text
            )));
        }

        let prerelease = if parsed.pre.is_empty() {
            None
        } else {
            Some(Prerelease::parse(parsed.pre.as_str()).map_err(|e| {
                ReleaseError::version(format!("Invalid version '{}': {}", text, e))
            })?)
        };

        Ok(SemanticVersion {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            prerelease,
        })
    }

    /// Increment according to `level`
    ///
    /// `prefix` names the pre-release family for `PreMinor` and `Prerelease`;
    /// it is ignored for `Patch` and `Minor`. A missing prefix for a
    /// pre-release level is treated as "rc". Fails if a component would
    /// overflow.
    pub fn increment(&self, level: BumpLevel, prefix: Option<&str>) -> Result<Self> {
        let prefix = prefix.unwrap_or("rc");
        match level {
            BumpLevel::Patch => Ok(SemanticVersion::new(
                self.major,
                self.minor,
                self.bumped(self.patch, "patch")?,
            )),
            BumpLevel::Minor => Ok(SemanticVersion::new(
                self.major,
                self.bumped(self.minor, "minor")?,
                0,
            )),
            BumpLevel::PreMinor => Ok(SemanticVersion::new(
                self.major,
                self.bumped(self.minor, "minor")?,
                0,
            )
            .with_prerelease(Prerelease::first(prefix))),
            BumpLevel::Prerelease => match &self.prerelease {
                Some(pre) if pre.is_family(prefix) => Ok(SemanticVersion {
                    prerelease: Some(pre.next()?),
                    ..self.clone()
                }),
                _ => self.increment(BumpLevel::PreMinor, Some(prefix)),
            },
        }
    }

    fn bumped(&self, component: u64, name: &str) -> Result<u64> {
        component.checked_add(1).ok_or_else(|| {
            ReleaseError::version(format!("The {} of {} cannot be incremented", name, self))
        })
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for SemanticVersion {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        SemanticVersion::parse(s)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}
