pub mod analysis;
pub mod config;
pub mod detectors;
pub mod error;
pub mod ir;
pub mod loader;
pub mod output;

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::Value;

use crate::config::AnalyzerConfig;
use crate::detectors::{DetectorRegistry, Finding};
use crate::error::{AnalyzerError, AnalyzerWarning};
use crate::ir::contract::ContractIR;
use crate::loader::solc_ast::{parse_source_unit, SourceNode};
use crate::loader::{artifacts, forge};
use crate::output::JsonReport;

/// Output format for analysis results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Result of analysing a project or a set of AST documents.
#[derive(Debug)]
pub struct AnalysisResult {
    pub contracts: Vec<ContractIR>,
    pub findings: Vec<Finding>,
    pub warnings: Vec<AnalyzerWarning>,
    pub sources: Vec<String>,
    /// Contracts that failed to build and were skipped.
    pub failed_contracts: usize,
}

impl AnalysisResult {
    /// Exit code convention:
    ///   0 = analysis ran (findings alone do not fail the run)
    ///   1 = a contract-level fatal error occurred, or findings exist and
    ///       `fail_on_findings` was requested
    ///   2 = execution error (set by the caller)
    pub fn exit_code(&self, fail_on_findings: bool) -> i32 {
        if self.failed_contracts > 0 {
            1
        } else if fail_on_findings && !self.findings.is_empty() {
            1
        } else {
            0
        }
    }
}

/// Analyse one parsed AST document against its source text.
///
/// This is the pure core: no filesystem access, no process invocation. The
/// document is the `ast` object of a forge artifact; `label` names it in
/// diagnostics. Malformed contracts are skipped with a warning; the rest of
/// the document is still analysed.
pub fn analyse_document(
    ast: &Value,
    source_text: &str,
    label: &str,
) -> Result<(Vec<ContractIR>, Vec<AnalyzerWarning>, usize), AnalyzerError> {
    let unit = parse_source_unit(ast);

    let mut pragma = String::new();
    for node in &unit.nodes {
        if let SourceNode::Pragma { literals } = node {
            pragma = literals.join(" ");
        }
    }

    let mut contracts = Vec::new();
    let mut warnings = Vec::new();
    let mut failed = 0usize;

    for node in &unit.nodes {
        let SourceNode::Contract(contract_node) = node else {
            continue;
        };
        match ContractIR::build(contract_node, &pragma, source_text, label) {
            Ok((contract, mut contract_warnings)) => {
                warnings.append(&mut contract_warnings);
                contracts.push(contract);
            }
            Err(AnalyzerError::InputMalformed { subject, reason }) => {
                // Fatal for this contract only; the run continues.
                warnings.push(AnalyzerWarning::contract_skipped(&subject, &reason));
                failed += 1;
            }
            Err(fatal) => return Err(fatal),
        }
    }

    Ok((contracts, warnings, failed))
}

/// Top-level analysis entry point for a Foundry project directory.
pub fn analyse_project(
    project_root: &Path,
    config: &AnalyzerConfig,
    registry: &DetectorRegistry,
) -> Result<AnalysisResult, AnalyzerError> {
    if !project_root.exists() {
        return Err(AnalyzerError::InputMissing {
            path: project_root.to_path_buf(),
        });
    }

    if !config.no_build {
        forge::clean_project(project_root)?;
        forge::build_ast(project_root)?;
    }

    let sources = artifacts::find_source_files(project_root);
    let ast_files = artifacts::find_ast_files(project_root, &sources);
    if ast_files.is_empty() {
        return Err(AnalyzerError::InputMissing {
            path: project_root.join("out"),
        });
    }

    let mut contracts: Vec<ContractIR> = Vec::new();
    let mut warnings: Vec<AnalyzerWarning> = Vec::new();
    let mut source_labels: Vec<String> = Vec::new();
    let mut failed = 0usize;

    for ast_file in &ast_files {
        let document = artifacts::load_document(ast_file, &sources)?;
        let label = document.artifact_path.display().to_string();
        if document.source_text.is_empty() {
            warnings.push(AnalyzerWarning::missing_source(&label));
        }
        source_labels.push(label.clone());

        let (mut new_contracts, mut new_warnings, new_failed) =
            analyse_document(&document.ast, &document.source_text, &label)?;
        warnings.append(&mut new_warnings);
        failed += new_failed;

        // Forge emits one artifact per contract of a file; the same contract
        // definition recurs in each. Keep the first instance only.
        for contract in new_contracts.drain(..) {
            if !contracts.iter().any(|c| c.name == contract.name) {
                contracts.push(contract);
            }
        }
    }

    let (findings, detector_warnings) = run_detectors(&contracts, config, registry);
    warnings.extend(detector_warnings);

    Ok(AnalysisResult {
        contracts,
        findings,
        warnings,
        sources: source_labels,
        failed_contracts: failed,
    })
}

/// Run the registry over every contract. Contracts are independent, so this
/// is the one place parallelism is applied.
pub fn run_detectors(
    contracts: &[ContractIR],
    config: &AnalyzerConfig,
    registry: &DetectorRegistry,
) -> (Vec<Finding>, Vec<AnalyzerWarning>) {
    let results: Vec<(Vec<Finding>, Vec<AnalyzerWarning>)> = contracts
        .par_iter()
        .map(|contract| registry.run_contract(contract, config))
        .collect();

    let mut findings = Vec::new();
    let mut warnings = Vec::new();
    for (f, w) in results {
        findings.extend(f);
        warnings.extend(w);
    }

    findings.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.detector_id.cmp(&b.detector_id))
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });

    (findings, warnings)
}

/// Render analysis results in the requested format.
pub fn render_output(result: &AnalysisResult, format: OutputFormat) -> Result<String, AnalyzerError> {
    match format {
        OutputFormat::Human => {
            let mut buf = Vec::new();
            let source = result.sources.join(", ");
            output::human::print_report(&mut buf, &result.findings, &result.warnings, &source)
                .map_err(|e| AnalyzerError::Io {
                    path: PathBuf::from("<stdout>"),
                    source: e,
                })?;
            Ok(String::from_utf8_lossy(&buf).into_owned())
        }
        OutputFormat::Json => {
            let report =
                JsonReport::build(&result.findings, &result.warnings, result.sources.clone());
            report
                .to_json_string()
                .map_err(|e| AnalyzerError::Config(format!("JSON serialisation failed: {e}")))
        }
    }
}
