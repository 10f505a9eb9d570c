//! Ordered source-control mutations for one release
//!
//! A [MutationPlan] is a list of [VcsStep]s built once from the target version
//! and the strategy, then executed in order by [run_plan]:
//!
//! ```text
//! Idle -> Committed -> Tagged -> (BranchCreated) -> (Pushed) -> Done
//! ```
//!
//! Local steps always run so a dry run leaves an inspectable commit, tag and
//! branch. The push step is only planned outside dry-run mode. A failed step
//! stops the run; earlier local mutations are reported, never rolled back.

use crate::domain::SemanticVersion;
use crate::error::{ReleaseError, Result};
use crate::git::repository::release_refs;
use crate::git::Repository;
use std::fmt;
use thiserror::Error;

/// One source-control mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsStep {
    Commit { message: String },
    Tag { name: String, message: String },
    Branch { name: String },
    Push { remote: String, refs: Vec<String> },
}

impl fmt::Display for VcsStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsStep::Commit { message } => write!(f, "commit '{}'", message),
            VcsStep::Tag { name, .. } => write!(f, "tag {}", name),
            VcsStep::Branch { name } => write!(f, "branch {}", name),
            VcsStep::Push { remote, refs } => write!(f, "push {} to {}", refs.join(", "), remote),
        }
    }
}

/// Sequencer progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Committed,
    Tagged,
    BranchCreated,
    Pushed,
    Done,
}

/// Commit message used for release commits
pub fn release_commit_message(version: &SemanticVersion) -> String {
    format!("chore: release {}", version)
}

/// Ordered steps for one release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationPlan {
    steps: Vec<VcsStep>,
}

impl MutationPlan {
    /// Build the plan for `version`
    ///
    /// # Arguments
    /// * `version` - Target version; also the tag name
    /// * `current_branch` - Branch the release commit lands on
    /// * `new_branch` - Release branch to create, if the strategy requires one
    /// * `remote` - Remote to push to
    /// * `dry_run` - Leave out the push step
    pub fn build(
        version: &SemanticVersion,
        current_branch: &str,
        new_branch: Option<&str>,
        remote: &str,
        dry_run: bool,
    ) -> Self {
        let tag = version.to_string();
        let mut steps = vec![
            VcsStep::Commit {
                message: release_commit_message(version),
            },
            VcsStep::Tag {
                name: tag.clone(),
                message: format!("Release {}", version),
            },
        ];

        if let Some(name) = new_branch {
            steps.push(VcsStep::Branch {
                name: name.to_string(),
            });
        }

        if !dry_run {
            steps.push(VcsStep::Push {
                remote: remote.to_string(),
                refs: release_refs(current_branch, &tag, new_branch),
            });
        }

        MutationPlan { steps }
    }

    pub fn steps(&self) -> &[VcsStep] {
        &self.steps
    }

    pub fn pushes(&self) -> bool {
        self.steps.iter().any(|s| matches!(s, VcsStep::Push { .. }))
    }
}

/// What a completed run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceReport {
    pub commit: String,
    pub completed: Vec<VcsStep>,
    pub state: SequencerState,
}

impl SequenceReport {
    pub fn pushed(&self) -> bool {
        self.completed
            .iter()
            .any(|s| matches!(s, VcsStep::Push { .. }))
    }
}

/// A step failed after zero or more steps succeeded
#[derive(Error, Debug)]
#[error("{} failed{}: {cause}", .failed, describe_completed(.completed))]
pub struct SequenceFailure {
    pub failed: VcsStep,
    pub completed: Vec<VcsStep>,
    pub state: SequencerState,
    #[source]
    pub cause: Box<ReleaseError>,
}

fn describe_completed(completed: &[VcsStep]) -> String {
    if completed.is_empty() {
        return String::new();
    }
    let done: Vec<String> = completed.iter().map(ToString::to_string).collect();
    format!(
        " after {} (left in place, resolve manually)",
        done.join(", ")
    )
}

/// Execute `plan` step by step against `repo`
pub fn run_plan<R: Repository>(repo: &R, plan: &MutationPlan) -> Result<SequenceReport> {
    let mut state = SequencerState::Idle;
    let mut completed = Vec::with_capacity(plan.steps().len());
    let mut commit = String::new();

    for step in plan.steps() {
        log::debug!("executing {}", step);
        let outcome = match step {
            VcsStep::Commit { message } => repo.commit_all(message).map(|hash| {
                commit = hash;
                SequencerState::Committed
            }),
            VcsStep::Tag { name, message } => repo
                .create_annotated_tag(name, message)
                .map(|_| SequencerState::Tagged),
            VcsStep::Branch { name } => repo
                .create_branch(name)
                .map(|_| SequencerState::BranchCreated),
            VcsStep::Push { remote, refs } => {
                repo.push(remote, refs).map(|_| SequencerState::Pushed)
            }
        };

        match outcome {
            Ok(next) => {
                state = next;
                completed.push(step.clone());
            }
            Err(cause) => {
                return Err(SequenceFailure {
                    failed: step.clone(),
                    completed,
                    state,
                    cause: Box::new(cause),
                }
                .into());
            }
        }
    }

    Ok(SequenceReport {
        commit,
        completed,
        state: SequencerState::Done,
    })
}
