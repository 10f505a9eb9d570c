//! Branch × release-kind decision table
//!
//! | Branch         | Kind    | Result                                            |
//! |----------------|---------|---------------------------------------------------|
//! | trunk          | release | rejected                                          |
//! | trunk          | rc      | prerelease-or-preminor "rc", creates branch       |
//! | trunk          | preview | prerelease-or-preminor "preview"                  |
//! | release/M-m    | release | patch                                             |
//! | release/M-m    | rc      | prerelease "rc"                                   |
//! | release/M-m    | preview | rejected                                          |
//!
//! "prerelease-or-preminor" continues the current pre-release lineage when the
//! current version already carries a pre-release of the same family, and
//! starts a new minor otherwise.

use crate::domain::{BranchIdentity, BumpLevel, SemanticVersion};
use crate::error::Result;
use std::fmt;
use thiserror::Error;

pub const RC_PREFIX: &str = "rc";
pub const PREVIEW_PREFIX: &str = "preview";

/// What kind of release the operator asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    Release,
    ReleaseCandidate,
    Preview,
}

impl ReleaseKind {
    pub fn name(&self) -> &'static str {
        match self {
            ReleaseKind::Release => "release",
            ReleaseKind::ReleaseCandidate => "rc",
            ReleaseKind::Preview => "preview",
        }
    }
}

impl fmt::Display for ReleaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved bump strategy, fixed for the whole invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpStrategy {
    pub level: BumpLevel,
    pub prerelease_prefix: Option<String>,
    pub creates_branch: bool,
}

impl BumpStrategy {
    pub fn new(level: BumpLevel, prerelease_prefix: Option<&str>, creates_branch: bool) -> Self {
        BumpStrategy {
            level,
            prerelease_prefix: prerelease_prefix.map(str::to_string),
            creates_branch,
        }
    }

    /// Apply this strategy to a version
    pub fn apply(&self, version: &SemanticVersion) -> Result<SemanticVersion> {
        version.increment(self.level, self.prerelease_prefix.as_deref())
    }
}

impl fmt::Display for BumpStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level)?;
        if let Some(prefix) = &self.prerelease_prefix {
            write!(f, " ({})", prefix)?;
        }
        if self.creates_branch {
            write!(f, ", creates release branch")?;
        }
        Ok(())
    }
}

/// Cells of the decision table that refuse to produce a strategy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrategyRejection {
    #[error(
        "Releases cannot be cut from '{trunk}'. Use --kind rc to cut a release candidate \
         (this also creates its release branch), then run --kind release on that release branch"
    )]
    ReleaseFromTrunk { trunk: String },

    #[error(
        "Previews can only be cut from the trunk branch, not from '{branch}'. \
         Use --kind rc for a release candidate or --kind release for a patch release"
    )]
    PreviewFromReleaseBranch { branch: String },
}

/// Map (branch, kind, current version) to a bump strategy
///
/// Pure function; reads no process or repository state.
pub fn resolve_strategy(
    branch: &BranchIdentity,
    kind: ReleaseKind,
    current: &SemanticVersion,
    trunk: &str,
) -> std::result::Result<BumpStrategy, StrategyRejection> {
    match (branch, kind) {
        (BranchIdentity::Trunk, ReleaseKind::Release) => Err(StrategyRejection::ReleaseFromTrunk {
            trunk: trunk.to_string(),
        }),
        (BranchIdentity::Trunk, ReleaseKind::ReleaseCandidate) => {
            Ok(continue_or_start_minor(current, RC_PREFIX, true))
        }
        (BranchIdentity::Trunk, ReleaseKind::Preview) => {
            Ok(continue_or_start_minor(current, PREVIEW_PREFIX, false))
        }
        (BranchIdentity::ReleaseBranch { .. }, ReleaseKind::Release) => {
            Ok(BumpStrategy::new(BumpLevel::Patch, None, false))
        }
        (BranchIdentity::ReleaseBranch { .. }, ReleaseKind::ReleaseCandidate) => Ok(
            BumpStrategy::new(BumpLevel::Prerelease, Some(RC_PREFIX), false),
        ),
        (BranchIdentity::ReleaseBranch { .. }, ReleaseKind::Preview) => {
            Err(StrategyRejection::PreviewFromReleaseBranch {
                branch: branch.to_string(),
            })
        }
    }
}

fn continue_or_start_minor(
    current: &SemanticVersion,
    prefix: &str,
    creates_branch: bool,
) -> BumpStrategy {
    let in_lineage = current
        .prerelease
        .as_ref()
        .is_some_and(|pre| pre.is_family(prefix));

    let level = if in_lineage {
        BumpLevel::Prerelease
    } else {
        BumpLevel::PreMinor
    };

    BumpStrategy::new(level, Some(prefix), creates_branch)
}
