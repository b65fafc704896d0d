use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::detectors::Finding;
use crate::error::AnalyzerWarning;

/// Bumped on any breaking change to the report shape.
pub const REPORT_VERSION: u32 = 1;

/// Machine-readable run report.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub report_version: u32,
    pub tool: ToolInfo,
    /// Source artifact(s) that were analysed.
    pub sources: Vec<String>,
    /// Finding counts keyed by severity name; only non-zero buckets appear,
    /// plus a `total`.
    pub counts: BTreeMap<String, usize>,
    pub findings: Vec<Finding>,
    pub warnings: Vec<JsonWarning>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonWarning {
    pub kind: String,
    pub message: String,
}

impl JsonReport {
    pub fn build(findings: &[Finding], warnings: &[AnalyzerWarning], sources: Vec<String>) -> Self {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for finding in findings {
            *counts.entry(finding.severity.to_string()).or_insert(0) += 1;
        }
        counts.insert("total".into(), findings.len());

        Self {
            report_version: REPORT_VERSION,
            tool: ToolInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            sources,
            counts,
            findings: findings.to_vec(),
            warnings: warnings
                .iter()
                .map(|w| JsonWarning {
                    kind: format!("{:?}", w.kind),
                    message: w.message.clone(),
                })
                .collect(),
        }
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::{Confidence, Location, Severity};

    #[test]
    fn report_counts_by_severity_and_round_trips() {
        let finding = Finding::new(
            "reentrancy",
            Severity::High,
            Confidence::Medium,
            "Potential reentrancy",
            "call precedes write".into(),
            Location {
                file: "Vault.json".into(),
                contract: "Vault".into(),
                function: "withdraw".into(),
                line: None,
                col: None,
            },
        );

        let report = JsonReport::build(&[finding], &[], vec!["Vault.json".into()]);
        assert_eq!(report.counts["high"], 1);
        assert_eq!(report.counts["total"], 1);
        assert!(!report.counts.contains_key("low"));

        let text = report.to_json_string().unwrap();
        let parsed: JsonReport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.report_version, REPORT_VERSION);
        assert_eq!(parsed.findings.len(), 1);
        assert_eq!(parsed.findings[0].detector_id, "reentrancy");
    }
}
