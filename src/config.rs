use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name looked up in the repository root and the user config directory
pub const CONFIG_FILE_NAME: &str = "chart-release.toml";

/// Represents the complete configuration for chart-release.
///
/// Names the trunk branch and remote, the umbrella chart and its subcharts,
/// and the command that refreshes the chart dependency lock.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_trunk")]
    pub trunk: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default)]
    pub chart: ChartConfig,

    #[serde(default)]
    pub dependencies: DependencyConfig,
}

fn default_trunk() -> String {
    "main".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

/// The umbrella chart and the subcharts released with it.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChartConfig {
    /// Umbrella chart directory, relative to the repository root
    #[serde(default = "default_chart_path")]
    pub path: String,

    /// Subcharts under `<path>/charts/<name>`
    #[serde(default = "default_subcharts")]
    pub subcharts: Vec<SubchartConfig>,
}

fn default_chart_path() -> String {
    "k8s/helm/testkube".to_string()
}

fn default_subcharts() -> Vec<SubchartConfig> {
    vec![
        SubchartConfig {
            name: "testkube-api".to_string(),
            app_version: true,
            image_tag: Some("values.yaml".to_string()),
        },
        SubchartConfig {
            name: "testkube-operator".to_string(),
            app_version: false,
            image_tag: None,
        },
    ]
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            path: default_chart_path(),
            subcharts: default_subcharts(),
        }
    }
}

/// A subchart and which of its fields follow the application version.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SubchartConfig {
    pub name: String,

    /// Whether `appVersion` is set to the released application version.
    /// The chart version is always bumped.
    #[serde(default = "default_true")]
    pub app_version: bool,

    /// Values file (relative to the subchart) whose image `tag:` follows the
    /// application version
    #[serde(default)]
    pub image_tag: Option<String>,
}

fn default_true() -> bool {
    true
}

/// External dependency-lock refresh run after the manifests are edited.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DependencyConfig {
    /// Program and arguments; the chart directory is appended. Empty disables the refresh.
    #[serde(default = "default_dependency_command")]
    pub command: Vec<String>,
}

fn default_dependency_command() -> Vec<String> {
    vec![
        "helm".to_string(),
        "dependency".to_string(),
        "update".to_string(),
    ]
}

impl Default for DependencyConfig {
    fn default() -> Self {
        DependencyConfig {
            command: default_dependency_command(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            trunk: default_trunk(),
            remote: default_remote(),
            chart: ChartConfig::default(),
            dependencies: DependencyConfig::default(),
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `chart-release.toml` in the repository root
/// 3. `chart-release.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `repo_root` - Repository working directory
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If a file exists but cannot be read or parsed
pub fn load_config(repo_root: &Path, config_path: Option<&str>) -> Result<Config> {
    let candidate = if let Some(path) = config_path {
        Some(Path::new(path).to_path_buf())
    } else if repo_root.join(CONFIG_FILE_NAME).exists() {
        Some(repo_root.join(CONFIG_FILE_NAME))
    } else {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    };

    let Some(path) = candidate else {
        log::debug!("no {} found, using defaults", CONFIG_FILE_NAME);
        return Ok(Config::default());
    };

    log::debug!("loading configuration from {}", path.display());
    let config_str = fs::read_to_string(&path).map_err(|e| {
        ReleaseError::config(format!("Cannot read '{}': {}", path.display(), e))
    })?;

    validate(&config_str)
        .map_err(|e| ReleaseError::config(format!("Invalid '{}': {}", path.display(), e)))
}

/// Parse and validate configuration text.
pub fn parse_config(text: &str) -> Result<Config> {
    validate(text).map_err(ReleaseError::config)
}

fn validate(text: &str) -> std::result::Result<Config, String> {
    let config: Config = toml::from_str(text).map_err(|e| e.to_string())?;

    if config.trunk.trim().is_empty() {
        return Err("trunk branch name must not be empty".to_string());
    }
    if config.chart.path.trim().is_empty() {
        return Err("chart.path must not be empty".to_string());
    }
    for subchart in &config.chart.subcharts {
        if subchart.name.trim().is_empty() || subchart.name.contains(['/', '\\']) {
            return Err(format!("Invalid subchart name '{}'", subchart.name));
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.trunk, "main");
        assert_eq!(config.remote, "origin");
        assert_eq!(config.chart.path, "k8s/helm/testkube");
        assert_eq!(config.chart.subcharts.len(), 2);
        assert!(!config.chart.subcharts[1].app_version);
        assert_eq!(config.dependencies.command[0], "helm");
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse_config("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = parse_config("trunk = \"develop\"\n").unwrap();
        assert_eq!(config.trunk, "develop");
        assert_eq!(config.remote, "origin");
        assert_eq!(config.chart, ChartConfig::default());
    }

    #[test]
    fn test_subchart_app_version_defaults_to_true() {
        let config = parse_config(
            r#"
[chart]
path = "charts/umbrella"

[[chart.subcharts]]
name = "api"
"#,
        )
        .unwrap();
        assert_eq!(config.chart.subcharts.len(), 1);
        assert!(config.chart.subcharts[0].app_version);
        assert_eq!(config.chart.subcharts[0].image_tag, None);
    }

    #[test]
    fn test_invalid_subchart_name() {
        let err = parse_config(
            r#"
[[chart.subcharts]]
name = "../escape"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid subchart name"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = parse_config("trunk = ").unwrap_err();
        assert_eq!(err.category(), "precondition");
    }
}
