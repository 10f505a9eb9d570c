use crate::charts::FieldKind;
use crate::error::{ReleaseError, Result};
use regex::Regex;

/// Reads and rewrites a single version scalar in manifest text
///
/// Callers only see "read field" and "write field", so the line-oriented
/// implementation can be replaced by a structured YAML editor.
pub trait ManifestVersionMutator {
    /// Current value of `field` with surrounding quotes removed
    fn read_field(&self, content: &str, field: &FieldKind) -> Result<String>;

    /// `content` with `field` set to `value`; everything else is untouched
    fn write_field(&self, content: &str, field: &FieldKind, value: &str) -> Result<String>;

    /// Whether `content` carries `field` at all
    fn has_field(&self, content: &str, field: &FieldKind) -> bool {
        self.read_field(content, field).is_ok()
    }
}

/// Rewrites the first line matching the field's pattern in place
///
/// - `version:` and `appVersion:` must start at column 0 (top-level keys)
/// - `tag:` may be indented
/// - a dependency pin is the `version:` key of the `dependencies:` item whose
///   `name:` matches, at that item's own indentation
///
/// Indentation, quote style, trailing comments and line endings are kept.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinePatternMutator;

/// A matched scalar line split into the parts that are preserved
struct ScalarLine<'a> {
    key: &'a str,
    value: &'a str,
    trailer: &'a str,
}

/// One `- ...` entry of the `dependencies:` sequence
struct DependencyItem {
    column: usize,
    matches: bool,
    version_line: Option<usize>,
}

impl DependencyItem {
    fn pin(&self) -> Option<usize> {
        if self.matches {
            self.version_line
        } else {
            None
        }
    }
}

impl LinePatternMutator {
    pub fn new() -> Self {
        LinePatternMutator
    }

    fn pattern(field: &FieldKind) -> Result<Regex> {
        let key = match field {
            FieldKind::ChartVersion => r"version:",
            FieldKind::AppVersion => r"appVersion:",
            FieldKind::ImageTag => r"\s*tag:",
            FieldKind::DependencyVersion { .. } => r"[ \t]*(?:-[ \t]+)?version:",
        };
        let source = format!(r"^({}[ \t]*)(.*?)((?:[ \t]+#.*)?[ \t]*)$", key);
        Regex::new(&source)
            .map_err(|e| ReleaseError::manifest(format!("Invalid pattern for '{}': {}", field, e)))
    }

    fn find_line<'a>(pattern: &Regex, line: &'a str) -> Option<ScalarLine<'a>> {
        let captures = pattern.captures(line)?;
        Some(ScalarLine {
            key: captures.get(1)?.as_str(),
            value: captures.get(2)?.as_str(),
            trailer: captures.get(3).map_or("", |m| m.as_str()),
        })
    }

    /// Index of the line holding `field`
    fn locate(pattern: &Regex, bodies: &[&str], field: &FieldKind) -> Option<usize> {
        match field {
            FieldKind::DependencyVersion { name, .. } => dependency_pin_line(bodies, name),
            _ => bodies.iter().position(|body| pattern.is_match(body)),
        }
    }

    fn scalar<'a>(
        pattern: &Regex,
        bodies: &[&'a str],
        field: &FieldKind,
    ) -> Result<(usize, ScalarLine<'a>)> {
        Self::locate(pattern, bodies, field)
            .and_then(|index| Some((index, Self::find_line(pattern, bodies[index])?)))
            .ok_or_else(|| ReleaseError::manifest(format!("no '{}' line found", field)))
    }
}

/// Line index of the `version:` key in the `dependencies:` item named `name`
fn dependency_pin_line(bodies: &[&str], name: &str) -> Option<usize> {
    let start = bodies
        .iter()
        .position(|body| body.trim_end() == "dependencies:")?
        + 1;
    let mut current: Option<DependencyItem> = None;
    let mut item_indent: Option<usize> = None;

    for (index, body) in bodies.iter().enumerate().skip(start) {
        let trimmed = body.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = body.len() - trimmed.len();
        if indent == 0 && !trimmed.starts_with('-') {
            break;
        }

        let dash = trimmed
            .strip_prefix('-')
            .filter(|_| *item_indent.get_or_insert(indent) == indent);
        let (column, text) = match dash {
            Some(rest) => {
                if let Some(line) = current.as_ref().and_then(DependencyItem::pin) {
                    return Some(line);
                }
                let text = rest.trim_start();
                let column = body.len() - text.len();
                current = Some(DependencyItem {
                    column,
                    matches: false,
                    version_line: None,
                });
                (column, text)
            }
            None => (indent, trimmed),
        };

        let Some(item) = current.as_mut() else {
            continue;
        };
        if column != item.column {
            continue;
        }
        if let Some(value) = text.strip_prefix("name:") {
            item.matches = unquote(strip_comment(value)) == name;
        } else if text.starts_with("version:") {
            item.version_line = Some(index);
        }
    }

    current.as_ref().and_then(DependencyItem::pin)
}

/// Split a line into its body and its terminator ("\n", "\r\n" or "")
fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

fn strip_comment(raw: &str) -> &str {
    match raw.find(" #").or_else(|| raw.find("\t#")) {
        Some(index) => raw[..index].trim(),
        None => raw.trim(),
    }
}

fn quote_of(raw: &str) -> Option<char> {
    let first = raw.chars().next()?;
    if (first == '"' || first == '\'') && raw.len() >= 2 && raw.ends_with(first) {
        Some(first)
    } else {
        None
    }
}

fn unquote(raw: &str) -> &str {
    match quote_of(raw) {
        Some(_) => &raw[1..raw.len() - 1],
        None => raw,
    }
}

impl ManifestVersionMutator for LinePatternMutator {
    fn read_field(&self, content: &str, field: &FieldKind) -> Result<String> {
        let pattern = Self::pattern(field)?;
        let bodies: Vec<&str> = content
            .split_inclusive('\n')
            .map(|line| split_terminator(line).0)
            .collect();

        let (_, scalar) = Self::scalar(&pattern, &bodies, field)?;
        Ok(unquote(scalar.value.trim()).to_string())
    }

    fn write_field(&self, content: &str, field: &FieldKind, value: &str) -> Result<String> {
        let pattern = Self::pattern(field)?;
        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        let bodies: Vec<&str> = lines.iter().map(|line| split_terminator(line).0).collect();
        let (target, scalar) = Self::scalar(&pattern, &bodies, field)?;

        let mut output = String::with_capacity(content.len() + value.len());
        for (index, line) in lines.iter().enumerate() {
            if index != target {
                output.push_str(line);
                continue;
            }

            output.push_str(scalar.key);
            if scalar.key.ends_with(':') {
                output.push(' ');
            }
            match quote_of(scalar.value.trim()) {
                Some(quote) => {
                    output.push(quote);
                    output.push_str(value);
                    output.push(quote);
                }
                None => output.push_str(value),
            }
            output.push_str(scalar.trailer);
            output.push_str(split_terminator(line).1);
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = "apiVersion: v2\n\
name: testkube\n\
description: Testkube umbrella chart\n\
type: application\n\
version: 1.16.3\n\
appVersion: \"1.4.2\"\n\
dependencies:\n\
  - name: testkube-api\n\
    version: 1.16.1\n\
    repository: file://charts/testkube-api\n";

    #[test]
    fn test_read_top_level_fields() {
        let mutator = LinePatternMutator::new();
        assert_eq!(
            mutator.read_field(CHART, &FieldKind::ChartVersion).unwrap(),
            "1.16.3"
        );
        assert_eq!(
            mutator.read_field(CHART, &FieldKind::AppVersion).unwrap(),
            "1.4.2"
        );
    }

    #[test]
    fn test_write_keeps_quotes_and_other_lines() {
        let mutator = LinePatternMutator::new();
        let updated = mutator
            .write_field(CHART, &FieldKind::AppVersion, "1.5.0-rc.0")
            .unwrap();

        assert!(updated.contains("appVersion: \"1.5.0-rc.0\"\n"));
        assert_eq!(
            updated.replace("appVersion: \"1.5.0-rc.0\"", "appVersion: \"1.4.2\""),
            CHART
        );
    }

    #[test]
    fn test_dependency_versions_are_not_touched() {
        let mutator = LinePatternMutator::new();
        let updated = mutator
            .write_field(CHART, &FieldKind::ChartVersion, "1.17.0-rc.0")
            .unwrap();

        assert!(updated.contains("\nversion: 1.17.0-rc.0\n"));
        assert!(updated.contains("    version: 1.16.1\n"));
    }

    #[test]
    fn test_image_tag_is_indented() {
        let values = "image:\n  registry: docker.io\n  repository: kubeshop/testkube-api-server\n  tag: '1.4.2' # managed by release\n  pullPolicy: IfNotPresent\n";
        let mutator = LinePatternMutator::new();

        assert_eq!(
            mutator.read_field(values, &FieldKind::ImageTag).unwrap(),
            "1.4.2"
        );

        let updated = mutator
            .write_field(values, &FieldKind::ImageTag, "1.5.0")
            .unwrap();
        assert_eq!(
            updated,
            "image:\n  registry: docker.io\n  repository: kubeshop/testkube-api-server\n  tag: '1.5.0' # managed by release\n  pullPolicy: IfNotPresent\n"
        );
    }

    #[test]
    fn test_empty_image_tag_is_filled() {
        let values = "image:\n  tag: \"\"\n";
        let mutator = LinePatternMutator::new();
        assert_eq!(mutator.read_field(values, &FieldKind::ImageTag).unwrap(), "");
        assert_eq!(
            mutator.write_field(values, &FieldKind::ImageTag, "2.0.0").unwrap(),
            "image:\n  tag: \"2.0.0\"\n"
        );
    }

    #[test]
    fn test_bare_key_gets_a_separating_space() {
        let mutator = LinePatternMutator::new();
        assert_eq!(
            mutator
                .write_field("image:\n  tag:\n", &FieldKind::ImageTag, "2.0.0")
                .unwrap(),
            "image:\n  tag: 2.0.0\n"
        );
    }

    #[test]
    fn test_crlf_line_endings_preserved() {
        let chart = "name: x\r\nversion: 0.1.0\r\nappVersion: 0.1.0\r\n";
        let mutator = LinePatternMutator::new();
        let updated = mutator
            .write_field(chart, &FieldKind::ChartVersion, "0.1.1")
            .unwrap();
        assert_eq!(updated, "name: x\r\nversion: 0.1.1\r\nappVersion: 0.1.0\r\n");
    }

    #[test]
    fn test_missing_trailing_newline_preserved() {
        let mutator = LinePatternMutator::new();
        let updated = mutator
            .write_field("version: 1.0.0", &FieldKind::ChartVersion, "1.0.1")
            .unwrap();
        assert_eq!(updated, "version: 1.0.1");
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let mutator = LinePatternMutator::new();
        let chart = "name: operator\nversion: 1.0.0\n";

        let err = mutator.read_field(chart, &FieldKind::AppVersion).unwrap_err();
        assert_eq!(err.category(), "mutation");
        assert!(mutator
            .write_field(chart, &FieldKind::AppVersion, "1.0.0")
            .is_err());
    }

    #[test]
    fn test_write_is_idempotent() {
        let mutator = LinePatternMutator::new();
        for field in [FieldKind::ChartVersion, FieldKind::AppVersion] {
            let once = mutator.write_field(CHART, &field, "2.0.0-rc.3").unwrap();
            let twice = mutator.write_field(&once, &field, "2.0.0-rc.3").unwrap();
            assert_eq!(once, twice);
        }
    }

    fn pin(name: &str) -> FieldKind {
        FieldKind::dependency(name, format!("charts/{}/Chart.yaml", name))
    }

    const UMBRELLA: &str = "apiVersion: v2\n\
name: testkube\n\
version: 1.16.3\n\
dependencies:\n\
  - name: testkube-api\n\
    version: 1.16.3\n\
    repository: file://charts/testkube-api\n\
  - name: \"testkube-operator\" # crds\n\
    repository: file://charts/testkube-operator\n\
    version: '1.15.0'\n\
    import-values:\n\
      - version: ignored\n\
  - name: minio\n\
    repository: https://charts.min.io\n\
    version: ~5.0.0\n\
maintainers:\n\
  - name: testkube-api\n\
    version: not-a-pin\n";

    #[test]
    fn test_dependency_pins_are_read_by_name() {
        let mutator = LinePatternMutator::new();
        assert_eq!(
            mutator.read_field(UMBRELLA, &pin("testkube-api")).unwrap(),
            "1.16.3"
        );
        assert_eq!(
            mutator.read_field(UMBRELLA, &pin("testkube-operator")).unwrap(),
            "1.15.0"
        );
        assert_eq!(mutator.read_field(UMBRELLA, &pin("minio")).unwrap(), "~5.0.0");
        assert!(!mutator.has_field(UMBRELLA, &pin("testkube-dashboard")));
    }

    #[test]
    fn test_dependency_pin_write_touches_only_that_entry() {
        let mutator = LinePatternMutator::new();
        let updated = mutator
            .write_field(UMBRELLA, &pin("testkube-operator"), "1.16.0-rc.0")
            .unwrap();

        assert_eq!(
            updated,
            UMBRELLA.replace("    version: '1.15.0'\n", "    version: '1.16.0-rc.0'\n")
        );
        assert!(updated.contains("\nversion: 1.16.3\n"));
        assert!(updated.contains("      - version: ignored\n"));
        assert!(updated.contains("    version: not-a-pin\n"));
    }

    #[test]
    fn test_dependency_pin_in_unindented_sequence() {
        let chart = "version: 1.0.0\ndependencies:\n- name: api\n  version: 1.0.0\n- version: 2.0.0\n  name: worker\n";
        let mutator = LinePatternMutator::new();

        let updated = mutator.write_field(chart, &pin("worker"), "2.1.0").unwrap();
        assert_eq!(
            updated,
            "version: 1.0.0\ndependencies:\n- name: api\n  version: 1.0.0\n- version: 2.1.0\n  name: worker\n"
        );
    }

    #[test]
    fn test_missing_dependency_pin_is_an_error() {
        let mutator = LinePatternMutator::new();
        let err = mutator
            .write_field(CHART, &pin("testkube-operator"), "1.0.0")
            .unwrap_err();
        assert_eq!(err.category(), "mutation");
        assert!(err.to_string().contains("testkube-operator"));
    }
}
