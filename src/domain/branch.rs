use crate::domain::SemanticVersion;
use crate::error::{ReleaseError, Result};
use regex::Regex;
use std::fmt;

/// Where a release is being cut from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchIdentity {
    /// The trunk branch (usually "main")
    Trunk,
    /// A long-lived `release/<major>-<minor>` branch
    ReleaseBranch { major: u64, minor: u64 },
}

const RELEASE_BRANCH_PATTERN: &str = r"^release/(\d+)-(\d+)$";

impl BranchIdentity {
    /// Resolve a raw branch name against the trunk name
    ///
    /// Anything that is neither the trunk nor `release/<major>-<minor>` is
    /// rejected; the caller must not guess.
    pub fn resolve(raw: &str, trunk: &str) -> Result<Self> {
        if raw == trunk {
            return Ok(BranchIdentity::Trunk);
        }

        let pattern = Regex::new(RELEASE_BRANCH_PATTERN)
            .map_err(|e| ReleaseError::branch(format!("Invalid release branch pattern: {}", e)))?;
        let captures = pattern.captures(raw).ok_or_else(|| {
            ReleaseError::branch(format!(
                "Releases can only be cut from '{}' or a release/<major>-<minor> branch, \
                 current branch is '{}'",
                trunk, raw
            ))
        })?;

        let major = captures[1]
            .parse::<u64>()
            .map_err(|_| ReleaseError::branch(format!("Invalid major in branch '{}'", raw)))?;
        let minor = captures[2]
            .parse::<u64>()
            .map_err(|_| ReleaseError::branch(format!("Invalid minor in branch '{}'", raw)))?;

        Ok(BranchIdentity::ReleaseBranch { major, minor })
    }

    /// Whether `version` belongs to the release line this branch maintains.
    /// Trunk accepts any version.
    pub fn accepts(&self, version: &SemanticVersion) -> bool {
        match self {
            BranchIdentity::Trunk => true,
            BranchIdentity::ReleaseBranch { major, minor } => {
                version.major == *major && version.minor == *minor
            }
        }
    }
}

/// Release branch name for a target version (`release/{major}-{minor}`)
pub fn branch_name_for(version: &SemanticVersion) -> String {
    format!("release/{}-{}", version.major, version.minor)
}

impl fmt::Display for BranchIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchIdentity::Trunk => write!(f, "trunk"),
            BranchIdentity::ReleaseBranch { major, minor } => {
                write!(f, "release/{}-{}", major, minor)
            }
        }
    }
}
