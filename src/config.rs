use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detectors::Severity;
use crate::error::AnalyzerError;

/// Top-level analyzer configuration, merged from foundry.toml + CLI flags.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Which detectors to run. Empty = all.
    pub detectors: DetectorSelection,
    /// Minimum severity to report.
    pub min_severity: Severity,
    /// Suppress specific findings by (detector_id, fingerprint).
    pub suppressions: Vec<Suppression>,
    /// Skip the forge clean/build step and use existing artifacts.
    pub no_build: bool,
    /// Exit non-zero when findings exist, not only on contract failures.
    pub fail_on_findings: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            detectors: DetectorSelection::All,
            min_severity: Severity::Low,
            suppressions: Vec::new(),
            no_build: false,
            fail_on_findings: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DetectorSelection {
    All,
    Include(HashSet<String>),
    Exclude(HashSet<String>),
}

impl DetectorSelection {
    pub fn should_run(&self, detector_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Include(ids) => ids.contains(detector_id),
            Self::Exclude(ids) => !ids.contains(detector_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suppression {
    pub detector_id: String,
    /// Finding fingerprint; absent suppresses the whole detector.
    pub location_hash: Option<String>,
}

/// The `[tool.solhawk]` table from foundry.toml.
#[derive(Debug, Default, Deserialize)]
pub struct FoundryAnalyzerConfig {
    pub detectors: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub severity_threshold: Option<String>,
    pub suppress: Option<Vec<FoundrySuppression>>,
}

#[derive(Debug, Deserialize)]
pub struct FoundrySuppression {
    pub id: String,
    pub location_hash: Option<String>,
}

/// Partial foundry.toml structure — only the parts we need.
#[derive(Debug, Default, Deserialize)]
struct FoundryToml {
    #[serde(default)]
    tool: FoundryToolSection,
}

#[derive(Debug, Default, Deserialize)]
struct FoundryToolSection {
    #[serde(default)]
    solhawk: Option<FoundryAnalyzerConfig>,
}

pub fn load_foundry_config(
    manifest_path: &Path,
) -> Result<Option<FoundryAnalyzerConfig>, AnalyzerError> {
    if !manifest_path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(manifest_path).map_err(|e| AnalyzerError::Io {
        path: manifest_path.to_path_buf(),
        source: e,
    })?;

    let parsed: FoundryToml = toml::from_str(&content)
        .map_err(|e| AnalyzerError::Config(format!("failed to parse foundry.toml: {e}")))?;

    Ok(parsed.tool.solhawk)
}

impl AnalyzerConfig {
    pub fn from_foundry(foundry: FoundryAnalyzerConfig) -> Result<Self, AnalyzerError> {
        let detectors = match (foundry.detectors, foundry.exclude) {
            (Some(include), _) if !include.iter().any(|d| d == "all") => {
                DetectorSelection::Include(include.into_iter().collect())
            }
            (_, Some(exclude)) => DetectorSelection::Exclude(exclude.into_iter().collect()),
            _ => DetectorSelection::All,
        };

        let min_severity = match foundry.severity_threshold.as_deref() {
            Some("critical") => Severity::Critical,
            Some("high") => Severity::High,
            Some("medium") => Severity::Medium,
            Some("low") | None => Severity::Low,
            Some("info") => Severity::Info,
            Some(other) => {
                return Err(AnalyzerError::Config(format!(
                    "unknown severity threshold '{other}'"
                )))
            }
        };

        let suppressions = foundry
            .suppress
            .unwrap_or_default()
            .into_iter()
            .map(|s| Suppression {
                detector_id: s.id,
                location_hash: s.location_hash,
            })
            .collect();

        Ok(Self {
            detectors,
            min_severity,
            suppressions,
            no_build: false,
            fail_on_findings: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_section() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = tmp.path().join("foundry.toml");
        std::fs::write(
            &manifest,
            r#"
[profile.default]
src = "src"

[tool.solhawk]
exclude = ["reentrancy"]
severity_threshold = "high"

[[tool.solhawk.suppress]]
id = "reentrancy"
location_hash = "abcd1234"
"#,
        )
        .unwrap();

        let parsed = load_foundry_config(&manifest).unwrap().unwrap();
        let config = AnalyzerConfig::from_foundry(parsed).unwrap();
        assert!(!config.detectors.should_run("reentrancy"));
        assert_eq!(config.min_severity, Severity::High);
        assert_eq!(config.suppressions.len(), 1);
    }

    #[test]
    fn missing_manifest_is_none() {
        assert!(load_foundry_config(Path::new("/nonexistent/foundry.toml"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn unknown_threshold_is_a_config_error() {
        let parsed = FoundryAnalyzerConfig {
            severity_threshold: Some("serious".into()),
            ..Default::default()
        };
        assert!(AnalyzerConfig::from_foundry(parsed).is_err());
    }
}
