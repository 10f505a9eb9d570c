//! Main release workflow orchestration logic
//!
//! Composes branch resolution, strategy resolution, manifest mutation and the
//! VCS sequence, and is the only place that decides whether a failure stops
//! the run. Everything up to the confirmation gate is read-only:
//!
//! 1. Resolve the checked-out branch
//! 2. Read the current application version from the umbrella manifest
//! 3. Resolve the bump strategy and compute the target version
//! 4. Pre-flight: clean tree, free tag and branch names, every manifest edit computable
//! 5. Present the summary and confirm (unless `yes`)
//! 6. Write manifests, refresh the dependency lock
//! 7. Commit, tag, create branch, push (push skipped on dry run)

use std::path::{Path, PathBuf};

use crate::charts::{
    manifest_targets, read_app_version, umbrella_manifest, DependencyRefresher,
    LinePatternMutator, ManifestPlan, PlannedEdit,
};
use crate::config::Config;
use crate::domain::{
    branch_name_for, resolve_strategy, BranchIdentity, BumpStrategy, ReleaseKind, SemanticVersion,
};
use crate::error::{ReleaseError, Result};
use crate::git::repository::release_refs;
use crate::git::Repository;
use crate::sequencer::{run_plan, MutationPlan};

/// Arguments for the release workflow
///
/// Mirrors the CLI Args but in a format suitable for orchestration logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    pub kind: ReleaseKind,
    /// Skip the confirmation gate
    pub yes: bool,
    /// Create local commit, tag and branch but never push
    pub dry_run: bool,
    /// Branch the operator expects to be on
    pub branch: Option<String>,
}

impl ReleaseRequest {
    pub fn new(kind: ReleaseKind) -> Self {
        ReleaseRequest {
            kind,
            yes: false,
            dry_run: false,
            branch: None,
        }
    }
}

/// Everything the operator is asked to confirm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePreview {
    pub branch: String,
    pub current: SemanticVersion,
    pub next: SemanticVersion,
    pub strategy: BumpStrategy,
    pub tag: String,
    pub new_branch: Option<String>,
    pub edits: Vec<PlannedEdit>,
    pub dry_run: bool,
}

/// Result of a completed release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseReport {
    pub current: SemanticVersion,
    pub next: SemanticVersion,
    /// Manifest files that were rewritten
    pub files: Vec<PathBuf>,
    pub tag: String,
    pub commit: String,
    pub branch_created: Option<String>,
    pub pushed: bool,
    pub remote: String,
    /// Refs a push sends (or would send, on a dry run)
    pub push_refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released(ReleaseReport),
    /// The operator declined at the confirmation gate; nothing was changed
    Declined,
}

/// Confirmation gate in front of the first mutation
pub trait Confirmation {
    /// Show the summary; called whether or not confirmation is skipped
    fn present(&self, _preview: &ReleasePreview) {}

    fn confirm(&self, preview: &ReleasePreview) -> Result<bool>;
}

/// Release orchestrator
///
/// Generic over its collaborators so tests can swap the repository, the
/// dependency refresher and the confirmation gate.
pub struct Releaser<'a, R, D, C> {
    repo: R,
    config: &'a Config,
    repo_root: PathBuf,
    refresher: D,
    confirmation: C,
    mutator: LinePatternMutator,
}

impl<'a, R, D, C> Releaser<'a, R, D, C>
where
    R: Repository,
    D: DependencyRefresher,
    C: Confirmation,
{
    pub fn new(
        repo: R,
        config: &'a Config,
        repo_root: impl Into<PathBuf>,
        refresher: D,
        confirmation: C,
    ) -> Self {
        Releaser {
            repo,
            config,
            repo_root: repo_root.into(),
            refresher,
            confirmation,
            mutator: LinePatternMutator::new(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Run one release
    ///
    /// # Returns
    /// * `Ok(ReleaseOutcome::Released)` - Manifests committed, tagged and (unless dry run) pushed
    /// * `Ok(ReleaseOutcome::Declined)` - Operator said no; no side effects
    /// * `Err` - Precondition, mutation or VCS failure
    pub fn release(&self, request: &ReleaseRequest) -> Result<ReleaseOutcome> {
        let (preview, plan) = self.prepare(request)?;

        self.confirmation.present(&preview);
        if !request.yes && !self.confirmation.confirm(&preview)? {
            log::info!("release of {} declined", preview.next);
            return Ok(ReleaseOutcome::Declined);
        }

        let files = plan.apply()?;
        log::info!("updated {} manifest file(s)", files.len());

        self.refresher
            .refresh(&chart_dir(&self.repo_root, self.config))?;

        let steps = MutationPlan::build(
            &preview.next,
            &preview.branch,
            preview.new_branch.as_deref(),
            &self.config.remote,
            request.dry_run,
        );
        if request.dry_run {
            log::info!("dry run, push to {} skipped", self.config.remote);
        }
        let sequence = run_plan(&self.repo, &steps)?;

        Ok(ReleaseOutcome::Released(ReleaseReport {
            push_refs: release_refs(&preview.branch, &preview.tag, preview.new_branch.as_deref()),
            pushed: sequence.pushed(),
            commit: sequence.commit,
            current: preview.current,
            next: preview.next,
            files,
            tag: preview.tag,
            branch_created: preview.new_branch,
            remote: self.config.remote.clone(),
        }))
    }

    /// Everything before the confirmation gate; never mutates anything
    fn prepare(&self, request: &ReleaseRequest) -> Result<(ReleasePreview, ManifestPlan)> {
        let branch = self.repo.current_branch()?;
        if let Some(expected) = &request.branch {
            if expected != &branch {
                return Err(ReleaseError::preflight(format!(
                    "Expected to be on '{}' but '{}' is checked out",
                    expected, branch
                )));
            }
        }

        let identity = BranchIdentity::resolve(&branch, &self.config.trunk)?;
        let umbrella = umbrella_manifest(&self.repo_root, &self.config.chart);
        let current = read_app_version(&self.mutator, &umbrella)?;

        let strategy = resolve_strategy(&identity, request.kind, &current, &self.config.trunk)?;
        let next = strategy.apply(&current)?;
        if next <= current {
            return Err(ReleaseError::version(format!(
                "Application version would not advance from {} to {}",
                current, next
            )));
        }
        log::debug!(
            "{} on {}: {} -> {} ({})",
            request.kind,
            identity,
            current,
            next,
            strategy
        );

        if !identity.accepts(&next) {
            return Err(ReleaseError::preflight(format!(
                "{} does not belong to the {} line of '{}'; cut new minor versions from '{}'",
                next,
                identity,
                branch,
                self.config.trunk
            )));
        }

        let tag = next.to_string();
        let new_branch = strategy.creates_branch.then(|| branch_name_for(&next));
        self.check_repository(&tag, new_branch.as_deref())?;

        let targets = manifest_targets(&self.repo_root, &self.config.chart);
        let plan = ManifestPlan::prepare(&self.mutator, &targets, &strategy, &next)?;

        let preview = ReleasePreview {
            branch,
            current,
            next,
            strategy,
            tag,
            new_branch,
            edits: plan.edits().to_vec(),
            dry_run: request.dry_run,
        };
        Ok((preview, plan))
    }

    fn check_repository(&self, tag: &str, new_branch: Option<&str>) -> Result<()> {
        if !self.repo.is_clean()? {
            return Err(ReleaseError::preflight(
                "Working tree has uncommitted changes; commit or stash them first",
            ));
        }

        if self.repo.tag_exists(tag)? {
            return Err(ReleaseError::preflight(format!(
                "Tag '{}' already exists",
                tag
            )));
        }

        if let Some(name) = new_branch {
            if self.repo.branch_exists(name)? {
                return Err(ReleaseError::preflight(format!(
                    "Branch '{}' already exists",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Path of the umbrella chart directory for `config` under `repo_root`
pub fn chart_dir(repo_root: &Path, config: &Config) -> PathBuf {
    repo_root.join(&config.chart.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::mock::{MockFailure, MockOperation};
    use crate::git::MockRepository;
    use std::cell::{Cell, RefCell};
    use std::fs;
    use tempfile::TempDir;

    struct Answer(bool, Cell<u32>);

    impl Answer {
        fn new(answer: bool) -> Self {
            Answer(answer, Cell::new(0))
        }
    }

    impl Confirmation for Answer {
        fn confirm(&self, _preview: &ReleasePreview) -> Result<bool> {
            self.1.set(self.1.get() + 1);
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct RecordingRefresher(RefCell<Vec<PathBuf>>);

    impl DependencyRefresher for RecordingRefresher {
        fn refresh(&self, chart_dir: &Path) -> Result<()> {
            self.0.borrow_mut().push(chart_dir.to_path_buf());
            Ok(())
        }
    }

    struct FailingRefresher;

    impl DependencyRefresher for FailingRefresher {
        fn refresh(&self, _chart_dir: &Path) -> Result<()> {
            Err(ReleaseError::dependency("helm exploded"))
        }
    }

    const UMBRELLA: &str = "k8s/helm/testkube/Chart.yaml";
    const API: &str = "k8s/helm/testkube/charts/testkube-api/Chart.yaml";
    const VALUES: &str = "k8s/helm/testkube/charts/testkube-api/values.yaml";
    const OPERATOR: &str = "k8s/helm/testkube/charts/testkube-operator/Chart.yaml";

    fn chart_fixture(app_version: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        let files = [
            (
                UMBRELLA,
                format!(
                    "apiVersion: v2\nname: testkube\nversion: 1.16.3\nappVersion: {}\ndependencies:\n  - name: testkube-api\n    version: 1.16.3\n",
                    app_version
                ),
            ),
            (
                API,
                format!("name: testkube-api\nversion: 1.16.3\nappVersion: {}\n", app_version),
            ),
            (VALUES, format!("image:\n  repository: kubeshop/testkube-api\n  tag: \"{}\"\n", app_version)),
            (OPERATOR, "name: testkube-operator\nversion: 1.15.0\n".to_string()),
        ];
        for (path, content) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn read(dir: &TempDir, path: &str) -> String {
        fs::read_to_string(dir.path().join(path)).unwrap()
    }

    fn request(kind: ReleaseKind) -> ReleaseRequest {
        ReleaseRequest {
            yes: true,
            ..ReleaseRequest::new(kind)
        }
    }

    #[test]
    fn test_rc_from_trunk_creates_branch() {
        let dir = chart_fixture("1.4.2");
        let config = Config::default();
        let releaser = Releaser::new(
            MockRepository::new("main"),
            &config,
            dir.path(),
            RecordingRefresher::default(),
            Answer::new(true),
        );

        let outcome = releaser.release(&request(ReleaseKind::ReleaseCandidate)).unwrap();
        let ReleaseOutcome::Released(report) = outcome else {
            panic!("expected a release");
        };

        assert_eq!(report.next.to_string(), "1.5.0-rc.0");
        assert_eq!(report.tag, "1.5.0-rc.0");
        assert_eq!(report.branch_created.as_deref(), Some("release/1-5"));
        assert!(report.pushed);
        assert_eq!(report.files.len(), 4);

        assert!(read(&dir, UMBRELLA).contains("version: 1.17.0-rc.0\nappVersion: 1.5.0-rc.0\n"));
        assert!(read(&dir, UMBRELLA).contains("  - name: testkube-api\n    version: 1.17.0-rc.0\n"));
        assert!(read(&dir, VALUES).contains("tag: \"1.5.0-rc.0\""));
        assert_eq!(
            read(&dir, OPERATOR),
            "name: testkube-operator\nversion: 1.16.0-rc.0\n"
        );

        let operations = releaser.repository().operations();
        assert_eq!(operations.len(), 4);
        assert_eq!(
            operations[2],
            MockOperation::Branch {
                name: "release/1-5".to_string()
            }
        );
    }

    #[test]
    fn test_dependency_refresh_runs_on_chart_dir() {
        let dir = chart_fixture("1.4.2");
        let config = Config::default();
        let releaser = Releaser::new(
            MockRepository::new("main"),
            &config,
            dir.path(),
            RecordingRefresher::default(),
            Answer::new(true),
        );

        releaser.release(&request(ReleaseKind::Preview)).unwrap();
        assert_eq!(
            releaser.refresher.0.borrow().as_slice(),
            &[dir.path().join("k8s/helm/testkube")]
        );
    }

    #[test]
    fn test_declined_confirmation_changes_nothing() {
        let dir = chart_fixture("1.4.2");
        let config = Config::default();
        let before = read(&dir, UMBRELLA);
        let releaser = Releaser::new(
            MockRepository::new("main"),
            &config,
            dir.path(),
            RecordingRefresher::default(),
            Answer::new(false),
        );

        let outcome = releaser
            .release(&ReleaseRequest::new(ReleaseKind::ReleaseCandidate))
            .unwrap();

        assert_eq!(outcome, ReleaseOutcome::Declined);
        assert_eq!(releaser.confirmation.1.get(), 1);
        assert_eq!(read(&dir, UMBRELLA), before);
        assert!(releaser.repository().operations().is_empty());
        assert!(releaser.refresher.0.borrow().is_empty());
    }

    #[test]
    fn test_yes_skips_confirmation() {
        let dir = chart_fixture("1.4.2");
        let config = Config::default();
        let releaser = Releaser::new(
            MockRepository::new("main"),
            &config,
            dir.path(),
            RecordingRefresher::default(),
            Answer::new(false),
        );

        let outcome = releaser.release(&request(ReleaseKind::Preview)).unwrap();
        assert!(matches!(outcome, ReleaseOutcome::Released(_)));
        assert_eq!(releaser.confirmation.1.get(), 0);
    }

    #[test]
    fn test_release_from_trunk_is_rejected_without_side_effects() {
        let dir = chart_fixture("1.4.2");
        let config = Config::default();
        let before = read(&dir, UMBRELLA);
        let releaser = Releaser::new(
            MockRepository::new("main"),
            &config,
            dir.path(),
            RecordingRefresher::default(),
            Answer::new(true),
        );

        let err = releaser.release(&request(ReleaseKind::Release)).unwrap_err();
        assert_eq!(err.category(), "precondition");
        assert!(err.to_string().contains("--kind rc"));
        assert_eq!(read(&dir, UMBRELLA), before);
        assert!(releaser.repository().operations().is_empty());
    }

    #[test]
    fn test_dry_run_patch_release_skips_push() {
        let dir = chart_fixture("1.5.0-rc.1");
        let config = Config::default();
        let releaser = Releaser::new(
            MockRepository::new("release/1-5"),
            &config,
            dir.path(),
            RecordingRefresher::default(),
            Answer::new(true),
        );

        let outcome = releaser
            .release(&ReleaseRequest {
                dry_run: true,
                ..request(ReleaseKind::Release)
            })
            .unwrap();
        let ReleaseOutcome::Released(report) = outcome else {
            panic!("expected a release");
        };

        assert_eq!(report.next.to_string(), "1.5.1");
        assert!(!report.pushed);
        assert_eq!(report.branch_created, None);
        assert_eq!(
            report.push_refs,
            vec!["refs/heads/release/1-5".to_string(), "refs/tags/1.5.1".to_string()]
        );

        let operations = releaser.repository().operations();
        assert_eq!(operations.len(), 2);
        assert!(!operations
            .iter()
            .any(|op| matches!(op, MockOperation::Push { .. })));
    }

    #[test]
    fn test_preflight_rejections() {
        let config = Config::default();

        let dir = chart_fixture("1.4.2");
        let releaser = Releaser::new(
            MockRepository::new("main").dirty(),
            &config,
            dir.path(),
            RecordingRefresher::default(),
            Answer::new(true),
        );
        let err = releaser.release(&request(ReleaseKind::Preview)).unwrap_err();
        assert!(err.to_string().contains("uncommitted changes"));

        let releaser = Releaser::new(
            MockRepository::new("main").with_tag("1.5.0-rc.0"),
            &config,
            dir.path(),
            RecordingRefresher::default(),
            Answer::new(true),
        );
        let err = releaser
            .release(&request(ReleaseKind::ReleaseCandidate))
            .unwrap_err();
        assert!(err.to_string().contains("Tag '1.5.0-rc.0' already exists"));

        let releaser = Releaser::new(
            MockRepository::new("main").with_branch("release/1-5"),
            &config,
            dir.path(),
            RecordingRefresher::default(),
            Answer::new(true),
        );
        let err = releaser
            .release(&request(ReleaseKind::ReleaseCandidate))
            .unwrap_err();
        assert!(err.to_string().contains("Branch 'release/1-5' already exists"));

        let releaser = Releaser::new(
            MockRepository::new("main"),
            &config,
            dir.path(),
            RecordingRefresher::default(),
            Answer::new(true),
        );
        let err = releaser
            .release(&ReleaseRequest {
                branch: Some("release/1-4".to_string()),
                ..request(ReleaseKind::Preview)
            })
            .unwrap_err();
        assert!(err.to_string().contains("Expected to be on 'release/1-4'"));

        assert!(read(&dir, UMBRELLA).contains("appVersion: 1.4.2\n"));
    }

    #[test]
    fn test_version_off_release_line_is_rejected() {
        let dir = chart_fixture("1.5.1");
        let config = Config::default();
        let releaser = Releaser::new(
            MockRepository::new("release/1-5"),
            &config,
            dir.path(),
            RecordingRefresher::default(),
            Answer::new(true),
        );

        let err = releaser
            .release(&request(ReleaseKind::ReleaseCandidate))
            .unwrap_err();
        assert_eq!(err.category(), "precondition");
        assert!(err.to_string().contains("1.6.0-rc.0"));
    }

    #[test]
    fn test_exhausted_app_version_is_rejected_before_writing() {
        let dir = chart_fixture("1.5.18446744073709551615");
        let config = Config::default();
        let before = read(&dir, UMBRELLA);
        let releaser = Releaser::new(
            MockRepository::new("release/1-5"),
            &config,
            dir.path(),
            RecordingRefresher::default(),
            Answer::new(true),
        );

        let err = releaser.release(&request(ReleaseKind::Release)).unwrap_err();
        assert_eq!(err.category(), "precondition");
        assert!(err.to_string().contains("cannot be incremented"));
        assert_eq!(read(&dir, UMBRELLA), before);
        assert!(releaser.repository().operations().is_empty());
    }

    #[test]
    fn test_unknown_branch_is_rejected() {
        let dir = chart_fixture("1.4.2");
        let config = Config::default();
        let releaser = Releaser::new(
            MockRepository::new("feature/x"),
            &config,
            dir.path(),
            RecordingRefresher::default(),
            Answer::new(true),
        );

        let err = releaser.release(&request(ReleaseKind::Preview)).unwrap_err();
        assert_eq!(err.category(), "precondition");
    }

    #[test]
    fn test_dependency_failure_stops_before_commit() {
        let dir = chart_fixture("1.4.2");
        let config = Config::default();
        let releaser = Releaser::new(
            MockRepository::new("main"),
            &config,
            dir.path(),
            FailingRefresher,
            Answer::new(true),
        );

        let err = releaser.release(&request(ReleaseKind::Preview)).unwrap_err();
        assert_eq!(err.category(), "mutation");
        assert!(releaser.repository().operations().is_empty());
    }

    #[test]
    fn test_tag_failure_reports_partial_state() {
        let dir = chart_fixture("1.4.2");
        let config = Config::default();
        let releaser = Releaser::new(
            MockRepository::new("main").failing_on(MockFailure::Tag),
            &config,
            dir.path(),
            RecordingRefresher::default(),
            Answer::new(true),
        );

        let err = releaser.release(&request(ReleaseKind::Preview)).unwrap_err();
        assert_eq!(err.category(), "vcs");
        assert!(err.to_string().contains("resolve manually"));
        assert_eq!(releaser.repository().operations().len(), 1);
    }
}
