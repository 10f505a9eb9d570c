//! Domain logic - pure release rules independent of git and the file system

pub mod branch;
pub mod prerelease;
pub mod strategy;
pub mod version;

pub use branch::{branch_name_for, BranchIdentity};
pub use prerelease::Prerelease;
pub use strategy::{resolve_strategy, BumpStrategy, ReleaseKind, StrategyRejection};
pub use version::{BumpLevel, SemanticVersion};
