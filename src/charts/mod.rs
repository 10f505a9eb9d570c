//! Helm chart manifests touched by a release
//!
//! A release edits one umbrella chart and its named subcharts:
//!
//! - `Chart.yaml` `version:` of every chart, bumped from that chart's own value
//! - `Chart.yaml` `appVersion:` of the umbrella and of subcharts that follow the app
//! - an image `tag:` line in a subchart values file, where configured
//! - the umbrella's `dependencies:` pin for each subchart, set to that
//!   subchart's new chart version
//!
//! Edits are computed for every target first ([`plan::ManifestPlan`]) and only
//! written once all of them are known to succeed.

pub mod dependency;
pub mod mutator;
pub mod plan;

pub use dependency::{CommandRefresher, DependencyRefresher};
pub use mutator::{LinePatternMutator, ManifestVersionMutator};
pub use plan::{read_app_version, ManifestPlan, PlannedEdit};

use crate::config::ChartConfig;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which scalar of a manifest file is rewritten
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Top-level `version:` in Chart.yaml
    ChartVersion,
    /// Top-level `appVersion:` in Chart.yaml
    AppVersion,
    /// An (indented) `tag:` in a values file
    ImageTag,
    /// `version:` of the `dependencies:` entry `name`, following the chart
    /// version of the subchart manifest at `chart`
    DependencyVersion { name: String, chart: PathBuf },
}

impl FieldKind {
    pub fn dependency(name: impl Into<String>, chart: impl Into<PathBuf>) -> Self {
        FieldKind::DependencyVersion {
            name: name.into(),
            chart: chart.into(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::ChartVersion => f.write_str("version"),
            FieldKind::AppVersion => f.write_str("appVersion"),
            FieldKind::ImageTag => f.write_str("tag"),
            FieldKind::DependencyVersion { name, .. } => {
                write!(f, "dependencies[{}].version", name)
            }
        }
    }
}

/// One field in one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestTarget {
    pub path: PathBuf,
    pub field: FieldKind,
}

impl ManifestTarget {
    pub fn new(path: impl Into<PathBuf>, field: FieldKind) -> Self {
        ManifestTarget {
            path: path.into(),
            field,
        }
    }
}

/// Build the static target set for the umbrella chart and its subcharts
///
/// The umbrella `appVersion` comes first; it is the source of the current
/// application version. Each dependency pin follows its subchart's
/// `version:` target.
pub fn manifest_targets(repo_root: &Path, chart: &ChartConfig) -> Vec<ManifestTarget> {
    let umbrella_dir = repo_root.join(&chart.path);
    let umbrella = umbrella_dir.join("Chart.yaml");

    let mut targets = vec![
        ManifestTarget::new(&umbrella, FieldKind::AppVersion),
        ManifestTarget::new(&umbrella, FieldKind::ChartVersion),
    ];

    for subchart in &chart.subcharts {
        let dir = umbrella_dir.join("charts").join(&subchart.name);
        let manifest = dir.join("Chart.yaml");

        targets.push(ManifestTarget::new(&manifest, FieldKind::ChartVersion));
        if subchart.app_version {
            targets.push(ManifestTarget::new(&manifest, FieldKind::AppVersion));
        }
        if let Some(values) = &subchart.image_tag {
            targets.push(ManifestTarget::new(dir.join(values), FieldKind::ImageTag));
        }
        targets.push(ManifestTarget::new(
            &umbrella,
            FieldKind::dependency(&subchart.name, &manifest),
        ));
    }

    targets
}

/// Path of the umbrella chart manifest
pub fn umbrella_manifest(repo_root: &Path, chart: &ChartConfig) -> PathBuf {
    repo_root.join(&chart.path).join("Chart.yaml")
}
