use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Required input missing: {path}")]
    InputMissing { path: PathBuf },

    #[error("JSON parse error in {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed AST for {subject}: {reason}")]
    InputMalformed { subject: String, reason: String },

    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),

    #[error("Compiler driver failed: {0}")]
    Forge(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// A non-fatal warning that doesn't stop analysis but should be surfaced.
#[derive(Debug, Clone)]
pub struct AnalyzerWarning {
    pub kind: WarningKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Statement kind outside the supported surface; the function was skipped.
    UnsupportedConstruct,
    /// One contract failed to build; the rest of the run continued.
    ContractSkipped,
    /// Source text for a contract could not be located; locations degrade to 0:0.
    MissingSource,
}

impl AnalyzerWarning {
    pub fn unsupported_construct(contract: &str, function: &str, node_type: &str) -> Self {
        Self {
            kind: WarningKind::UnsupportedConstruct,
            message: format!(
                "{contract}.{function}: unsupported construct '{node_type}' — function body skipped"
            ),
        }
    }

    pub fn contract_skipped(contract: &str, reason: &str) -> Self {
        Self {
            kind: WarningKind::ContractSkipped,
            message: format!("contract '{contract}' skipped: {reason}"),
        }
    }

    pub fn missing_source(label: &str) -> Self {
        Self {
            kind: WarningKind::MissingSource,
            message: format!("no source text for {label}; locations degrade to 0:0"),
        }
    }
}
