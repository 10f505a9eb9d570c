use crate::error::{ReleaseError, Result};
use crate::git::{branch_ref, tag_ref};
use git2::{
    BranchType, Cred, CredentialType, IndexAddOption, PushOptions, RemoteCallbacks,
    Repository as Git2Repo, StatusOptions,
};
use std::path::{Path, PathBuf};

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path.as_ref()).map_err(|e| {
            ReleaseError::preflight(format!(
                "Not in a git repository ({}): {}",
                path.as_ref().display(),
                e.message()
            ))
        })?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    /// Working directory root
    pub fn workdir(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| ReleaseError::preflight("Repository is bare, no working tree"))
    }

    fn head_commit(&self) -> Result<git2::Commit<'_>> {
        let head = self
            .repo
            .head()
            .map_err(|e| ReleaseError::vcs(format!("Cannot resolve HEAD: {}", e.message())))?;
        Ok(head.peel_to_commit()?)
    }
}

/// Credential and push-status callbacks shared by every push
///
/// Tries SSH keys from `~/.ssh`, then the SSH agent, then default credentials.
fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        let username = username_from_url.unwrap_or("git");

        if allowed_types.contains(CredentialType::SSH_KEY) {
            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }

            if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
        }

        Cred::default()
    });

    callbacks.push_update_reference(|refname, status| match status {
        Some(status) => Err(git2::Error::from_str(&format!(
            "remote rejected {}: {}",
            refname, status
        ))),
        None => Ok(()),
    });

    callbacks
}

impl super::Repository for Git2Repository {
    fn current_branch(&self) -> Result<String> {
        let head = self
            .repo
            .head()
            .map_err(|e| ReleaseError::branch(format!("Cannot resolve HEAD: {}", e.message())))?;

        if !head.is_branch() {
            return Err(ReleaseError::branch(
                "HEAD is detached; check out the trunk or a release branch",
            ));
        }

        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| ReleaseError::branch("Current branch name is not valid UTF-8"))
    }

    fn is_clean(&self) -> Result<bool> {
        let mut options = StatusOptions::new();
        options.include_untracked(true).include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(statuses.is_empty())
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        match self.repo.find_reference(&tag_ref(name)) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        match self.repo.find_branch(name, BranchType::Local) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn commit_all(&self, message: &str) -> Result<String> {
        let mut index = self.repo.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"], None)?;
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.repo.signature().map_err(|e| {
            ReleaseError::vcs(format!(
                "No commit identity configured (user.name / user.email): {}",
                e.message()
            ))
        })?;
        let parent = self.head_commit()?;

        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?;

        Ok(oid.to_string())
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        let head = self.head_commit()?;
        let signature = self.repo.signature()?;

        self.repo
            .tag(name, head.as_object(), &signature, message, false)
            .map_err(|e| ReleaseError::vcs(format!("Cannot create tag '{}': {}", name, e.message())))?;

        Ok(())
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        let head = self.head_commit()?;

        self.repo.branch(name, &head, false).map_err(|e| {
            ReleaseError::vcs(format!("Cannot create branch '{}': {}", name, e.message()))
        })?;

        Ok(())
    }

    fn push(&self, remote: &str, refs: &[String]) -> Result<()> {
        let mut remote_handle = self
            .repo
            .find_remote(remote)
            .map_err(|_| ReleaseError::vcs(format!("No remote named '{}' found", remote)))?;

        let refspecs: Vec<String> = refs.iter().map(|r| format!("{}:{}", r, r)).collect();

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(remote_callbacks());

        remote_handle
            .push(&refspecs, Some(&mut push_options))
            .map_err(|e| match e.class() {
                git2::ErrorClass::Net => {
                    ReleaseError::vcs(format!("Network error during push: {}", e.message()))
                }
                git2::ErrorClass::Reference => {
                    ReleaseError::vcs(format!("Reference error during push: {}", e.message()))
                }
                _ => ReleaseError::vcs(format!(
                    "Failed to push {} to '{}': {}",
                    refs.join(", "),
                    remote,
                    e.message()
                )),
            })
    }
}

/// Refs the release pushes for `branch` and `tag`
pub fn release_refs(branch: &str, tag: &str, new_branch: Option<&str>) -> Vec<String> {
    let mut refs = vec![branch_ref(branch), tag_ref(tag)];
    if let Some(new_branch) = new_branch {
        refs.push(branch_ref(new_branch));
    }
    refs
}
