use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

/// Mutating operations recorded by [MockRepository]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Commit { message: String },
    Tag { name: String, message: String },
    Branch { name: String },
    Push { remote: String, refs: Vec<String> },
}

/// Which primitive the mock should fail on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Commit,
    Tag,
    Branch,
    Push,
}

/// Mock repository for testing without actual git operations
///
/// Records every mutating call in order and can be told to fail on one of them.
pub struct MockRepository {
    branch: String,
    clean: bool,
    tags: RefCell<BTreeSet<String>>,
    branches: RefCell<BTreeSet<String>>,
    operations: RefCell<Vec<MockOperation>>,
    fail_on: Option<MockFailure>,
    commits: Cell<u32>,
}

impl MockRepository {
    /// Create a clean mock repository checked out on `branch`
    pub fn new(branch: impl Into<String>) -> Self {
        let branch = branch.into();
        let mut branches = BTreeSet::new();
        branches.insert(branch.clone());

        MockRepository {
            branch,
            clean: true,
            tags: RefCell::new(BTreeSet::new()),
            branches: RefCell::new(branches),
            operations: RefCell::new(Vec::new()),
            fail_on: None,
            commits: Cell::new(0),
        }
    }

    /// Report uncommitted changes from `is_clean`
    pub fn dirty(mut self) -> Self {
        self.clean = false;
        self
    }

    /// Make the given primitive fail
    pub fn failing_on(mut self, failure: MockFailure) -> Self {
        self.fail_on = Some(failure);
        self
    }

    /// Add an existing tag
    pub fn with_tag(self, name: impl Into<String>) -> Self {
        self.tags.borrow_mut().insert(name.into());
        self
    }

    /// Add an existing local branch
    pub fn with_branch(self, name: impl Into<String>) -> Self {
        self.branches.borrow_mut().insert(name.into());
        self
    }

    /// Mutating operations performed so far, in order
    pub fn operations(&self) -> Vec<MockOperation> {
        self.operations.borrow().clone()
    }

    fn check(&self, failure: MockFailure) -> Result<()> {
        if self.fail_on == Some(failure) {
            return Err(ReleaseError::vcs(format!("injected {:?} failure", failure)));
        }
        Ok(())
    }

    fn record(&self, operation: MockOperation) {
        self.operations.borrow_mut().push(operation);
    }
}

impl Repository for MockRepository {
    fn current_branch(&self) -> Result<String> {
        Ok(self.branch.clone())
    }

    fn is_clean(&self) -> Result<bool> {
        Ok(self.clean)
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        Ok(self.tags.borrow().contains(name))
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        Ok(self.branches.borrow().contains(name))
    }

    fn commit_all(&self, message: &str) -> Result<String> {
        self.check(MockFailure::Commit)?;
        self.record(MockOperation::Commit {
            message: message.to_string(),
        });
        let count = self.commits.get() + 1;
        self.commits.set(count);
        Ok(format!("{:040x}", count))
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        self.check(MockFailure::Tag)?;
        if !self.tags.borrow_mut().insert(name.to_string()) {
            return Err(ReleaseError::vcs(format!("tag '{}' already exists", name)));
        }
        self.record(MockOperation::Tag {
            name: name.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        self.check(MockFailure::Branch)?;
        if !self.branches.borrow_mut().insert(name.to_string()) {
            return Err(ReleaseError::vcs(format!("branch '{}' already exists", name)));
        }
        self.record(MockOperation::Branch {
            name: name.to_string(),
        });
        Ok(())
    }

    fn push(&self, remote: &str, refs: &[String]) -> Result<()> {
        self.check(MockFailure::Push)?;
        self.record(MockOperation::Push {
            remote: remote.to_string(),
            refs: refs.to_vec(),
        });
        Ok(())
    }
}
