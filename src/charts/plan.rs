use crate::charts::{FieldKind, ManifestTarget, ManifestVersionMutator};
use crate::domain::{BumpStrategy, SemanticVersion};
use crate::error::{ReleaseError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A single field change, computed but not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEdit {
    pub target: ManifestTarget,
    pub current: String,
    pub next: String,
}

/// Original and rewritten text of one file
#[derive(Debug, Clone)]
struct FileRewrite {
    path: PathBuf,
    original: String,
    updated: String,
}

/// All manifest edits for one release, validated before anything is written
#[derive(Debug, Clone)]
pub struct ManifestPlan {
    edits: Vec<PlannedEdit>,
    files: Vec<FileRewrite>,
}

/// Read the application version from the umbrella manifest
pub fn read_app_version<M: ManifestVersionMutator>(
    mutator: &M,
    umbrella: &Path,
) -> Result<SemanticVersion> {
    let content = read_manifest(umbrella)?;
    let raw = mutator
        .read_field(&content, &FieldKind::AppVersion)
        .map_err(|e| with_path(e, umbrella))?;

    SemanticVersion::parse(&raw).map_err(|e| {
        ReleaseError::version(format!(
            "{}: current appVersion '{}' is not usable: {}",
            umbrella.display(),
            raw,
            e
        ))
    })
}

fn read_manifest(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| ReleaseError::manifest(format!("Cannot read {}: {}", path.display(), e)))
}

fn with_path(err: ReleaseError, path: &Path) -> ReleaseError {
    match err {
        ReleaseError::Manifest(msg) => {
            ReleaseError::manifest(format!("{}: {}", path.display(), msg))
        }
        other => other,
    }
}

impl ManifestPlan {
    /// Compute every edit for `targets`
    ///
    /// Chart versions are bumped from each file's own value with `strategy`;
    /// app version and image tag fields are set to `app_version`; dependency
    /// pins take the planned chart version of their subchart. Fails without
    /// touching the file system if any target is missing, unparsable, or
    /// would move its chart version backwards.
    ///
    /// A subchart the umbrella does not pin, or pins with a range, is left
    /// alone.
    pub fn prepare<M: ManifestVersionMutator>(
        mutator: &M,
        targets: &[ManifestTarget],
        strategy: &BumpStrategy,
        app_version: &SemanticVersion,
    ) -> Result<Self> {
        let mut files: Vec<FileRewrite> = Vec::new();
        let mut edits = Vec::with_capacity(targets.len());
        let mut chart_versions: HashMap<PathBuf, String> = HashMap::new();

        for target in targets {
            let index = match files.iter().position(|f| f.path == target.path) {
                Some(index) => index,
                None => {
                    let original = read_manifest(&target.path)?;
                    files.push(FileRewrite {
                        path: target.path.clone(),
                        updated: original.clone(),
                        original,
                    });
                    files.len() - 1
                }
            };
            let file = &mut files[index];

            if let FieldKind::DependencyVersion { name, .. } = &target.field {
                if !mutator.has_field(&file.updated, &target.field) {
                    log::debug!("{} does not pin {}", target.path.display(), name);
                    continue;
                }
            }

            let current = mutator
                .read_field(&file.updated, &target.field)
                .map_err(|e| with_path(e, &target.path))?;

            let next = match &target.field {
                FieldKind::ChartVersion => {
                    let next = next_chart_version(&target.path, &current, strategy)?;
                    chart_versions.insert(target.path.clone(), next.clone());
                    next
                }
                FieldKind::AppVersion | FieldKind::ImageTag => app_version.to_string(),
                FieldKind::DependencyVersion { name, chart } => {
                    if SemanticVersion::parse(&current).is_err() {
                        log::warn!(
                            "{}: {} pin '{}' is not an exact version, left as is",
                            target.path.display(),
                            name,
                            current
                        );
                        continue;
                    }
                    chart_versions.get(chart).cloned().ok_or_else(|| {
                        ReleaseError::manifest(format!(
                            "{}: {} is pinned but {} is not released with it",
                            target.path.display(),
                            name,
                            chart.display()
                        ))
                    })?
                }
            };

            file.updated = mutator
                .write_field(&file.updated, &target.field, &next)
                .map_err(|e| with_path(e, &target.path))?;

            log::debug!(
                "planned {} {}: {} -> {}",
                target.path.display(),
                target.field,
                current,
                next
            );
            edits.push(PlannedEdit {
                target: target.clone(),
                current,
                next,
            });
        }

        Ok(ManifestPlan { edits, files })
    }

    pub fn edits(&self) -> &[PlannedEdit] {
        &self.edits
    }

    /// Files whose content changes
    pub fn changed_files(&self) -> Vec<&Path> {
        self.files
            .iter()
            .filter(|f| f.original != f.updated)
            .map(|f| f.path.as_path())
            .collect()
    }

    /// Write every changed file
    pub fn apply(&self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for file in self.files.iter().filter(|f| f.original != f.updated) {
            fs::write(&file.path, &file.updated).map_err(|e| {
                ReleaseError::manifest(format!("Cannot write {}: {}", file.path.display(), e))
            })?;
            written.push(file.path.clone());
        }
        Ok(written)
    }
}

fn next_chart_version(path: &Path, current: &str, strategy: &BumpStrategy) -> Result<String> {
    let version = SemanticVersion::parse(current).map_err(|e| {
        ReleaseError::manifest(format!(
            "{}: chart version '{}' is not usable: {}",
            path.display(),
            current,
            e
        ))
    })?;

    let next = strategy.apply(&version).map_err(|e| {
        ReleaseError::manifest(format!("{}: chart version {}: {}", path.display(), version, e))
    })?;
    if next <= version {
        return Err(ReleaseError::manifest(format!(
            "{}: chart version would regress from {} to {}",
            path.display(),
            version,
            next
        )));
    }

    Ok(next.to_string())
}
