//! Git operations abstraction layer
//!
//! The release engine only needs a handful of primitives: read the current
//! branch, check the working tree, commit everything, create an annotated
//! tag, create a branch, and push refs. They are expressed as the
//! [Repository] trait so the engine can run against:
//!
//! - [repository::Git2Repository]: a real repository through the `git2` crate
//! - [mock::MockRepository]: an in-memory recorder with failure injection
//!
//! ```rust
//! # use chart_release::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> chart_release::Result<()> {
//! let branch = repo.current_branch()?;
//! if repo.is_clean()? {
//!     println!("{} is ready for a release", branch);
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;

/// Full ref name of a local branch
pub fn branch_ref(name: &str) -> String {
    format!("refs/heads/{}", name)
}

/// Full ref name of a tag
pub fn tag_ref(name: &str) -> String {
    format!("refs/tags/{}", name)
}

/// Source-control primitives consumed by the release engine
///
/// Every method either succeeds fully or returns an error; implementations
/// never retry.
pub trait Repository {
    /// Short name of the checked-out branch (e.g. "main", "release/1-5")
    ///
    /// Fails on a detached HEAD.
    fn current_branch(&self) -> Result<String>;

    /// Whether the working tree and index have no changes, untracked files included
    fn is_clean(&self) -> Result<bool>;

    fn tag_exists(&self, name: &str) -> Result<bool>;

    fn branch_exists(&self, name: &str) -> Result<bool>;

    /// Stage every modified, deleted and new file and commit on HEAD
    ///
    /// # Returns
    /// * `Ok(String)` - Hash of the new commit
    fn commit_all(&self, message: &str) -> Result<String>;

    /// Create an annotated tag pointing at HEAD
    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()>;

    /// Create a local branch at HEAD without checking it out
    fn create_branch(&self, name: &str) -> Result<()>;

    /// Push full ref names (e.g. "refs/tags/1.5.0") to the same names on `remote`
    fn push(&self, remote: &str, refs: &[String]) -> Result<()>;
}
