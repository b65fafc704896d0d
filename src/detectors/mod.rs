use serde::{Deserialize, Serialize};

use crate::error::AnalyzerWarning;
use crate::ir::contract::ContractIR;

pub mod reentrancy;

// ── Finding model ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A single finding produced by a detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Unique detector identifier (e.g. "reentrancy").
    pub detector_id: String,
    pub severity: Severity,
    pub confidence: Confidence,
    pub title: String,
    pub description: String,
    pub location: Location,
    /// SHA-256 fingerprint for suppression and deduplication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Source artifact the contract came from.
    pub file: String,
    pub contract: String,
    pub function: String,
    pub line: Option<u32>,
    pub col: Option<u32>,
}

impl Finding {
    pub fn new(
        detector_id: &str,
        severity: Severity,
        confidence: Confidence,
        title: &str,
        description: String,
        location: Location,
    ) -> Self {
        let fingerprint = compute_fingerprint(detector_id, &location);
        Self {
            detector_id: detector_id.to_string(),
            severity,
            confidence,
            title: title.to_string(),
            description,
            location,
            fingerprint: Some(fingerprint),
        }
    }
}

fn compute_fingerprint(detector_id: &str, loc: &Location) -> String {
    use sha2::{Digest, Sha256};
    let input = format!("{detector_id}:{}:{}:{}", loc.contract, loc.function, loc.file);
    let hash = Sha256::digest(input.as_bytes());
    hex::encode(&hash[..8])
}

// ── Detector trait ───────────────────────────────────────────────────────────

/// The detector trait. All detectors implement this.
pub trait Detector: Send + Sync {
    fn id(&self) -> &'static str;
    fn severity(&self) -> Severity;
    fn confidence(&self) -> Confidence;
    fn description(&self) -> &'static str;

    /// Run the detector against one contract's IR.
    /// Returns (findings, warnings).
    fn run(&self, contract: &ContractIR) -> (Vec<Finding>, Vec<AnalyzerWarning>);
}

// ── DetectorRegistry ─────────────────────────────────────────────────────────

pub struct DetectorRegistry {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorRegistry {
    /// Build with all built-in detectors in deterministic order.
    pub fn all() -> Self {
        Self {
            detectors: vec![Box::new(reentrancy::Reentrancy)],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Detector> {
        self.detectors.iter().map(|d| d.as_ref())
    }

    /// Run every selected detector over one contract. Detector iteration is
    /// sequential; parallelism lives at contract granularity in the caller.
    pub fn run_contract(
        &self,
        contract: &ContractIR,
        config: &crate::config::AnalyzerConfig,
    ) -> (Vec<Finding>, Vec<AnalyzerWarning>) {
        let mut all_findings = Vec::new();
        let mut all_warnings = Vec::new();

        for detector in &self.detectors {
            if !config.detectors.should_run(detector.id()) {
                continue;
            }
            let (mut findings, warnings) = detector.run(contract);
            findings.retain(|f| !is_suppressed(f, &config.suppressions));
            findings.retain(|f| f.severity >= config.min_severity);
            all_findings.extend(findings);
            all_warnings.extend(warnings);
        }

        // Deterministic order: severity desc, then detector id, then fingerprint.
        all_findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.detector_id.cmp(&b.detector_id))
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        });

        (all_findings, all_warnings)
    }
}

fn is_suppressed(finding: &Finding, suppressions: &[crate::config::Suppression]) -> bool {
    suppressions.iter().any(|s| {
        s.detector_id == finding.detector_id
            && match &s.location_hash {
                None => true,
                Some(hash) => finding.fingerprint.as_deref() == Some(hash.as_str()),
            }
    })
}
