use std::collections::BTreeMap;
use std::io::Write;

use crate::detectors::{Finding, Severity};
use crate::error::AnalyzerWarning;
use crate::ir::contract::ContractIR;

/// Write the findings report for one run.
///
/// One compact record per finding: a `[severity] detector — title` header,
/// the place it was found, then the description. A severity tally closes the
/// report; warnings follow, one per line.
pub fn print_report<W: Write>(
    writer: &mut W,
    findings: &[Finding],
    warnings: &[AnalyzerWarning],
    source: &str,
) -> std::io::Result<()> {
    match findings.len() {
        0 => writeln!(writer, "{source}: no findings")?,
        1 => writeln!(writer, "{source}: 1 finding")?,
        n => writeln!(writer, "{source}: {n} findings")?,
    }

    for finding in findings {
        writeln!(writer)?;
        writeln!(
            writer,
            "[{}] {} — {}",
            finding.severity, finding.detector_id, finding.title
        )?;
        writeln!(writer, "  in {}", place_of(finding))?;
        writeln!(writer, "  confidence {}", finding.confidence)?;
        writeln!(writer, "  {}", finding.description)?;
        if let Some(fingerprint) = &finding.fingerprint {
            writeln!(writer, "  fingerprint {fingerprint}")?;
        }
    }

    if !findings.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "{}", severity_tally(findings))?;
    }

    for warning in warnings {
        writeln!(writer, "warning: {}", warning.message)?;
    }

    Ok(())
}

/// `Contract.function (file:line:col)`, with the location parts that exist.
fn place_of(finding: &Finding) -> String {
    let mut place = format!("{}.{}", finding.location.contract, finding.location.function);
    place.push_str(" (");
    place.push_str(&finding.location.file);
    if let Some(line) = finding.location.line {
        place.push_str(&format!(":{line}"));
        if let Some(col) = finding.location.col {
            place.push_str(&format!(":{col}"));
        }
    }
    place.push(')');
    place
}

/// `2 high, 1 low` — non-empty buckets only, most severe first.
fn severity_tally(findings: &[Finding]) -> String {
    let mut counts: BTreeMap<Severity, usize> = BTreeMap::new();
    for finding in findings {
        *counts.entry(finding.severity).or_insert(0) += 1;
    }
    counts
        .iter()
        .rev()
        .map(|(severity, n)| format!("{n} {severity}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Dump per-contract entrypoint IR: blocks, SSA, accesses and calls.
pub fn print_ir<W: Write>(writer: &mut W, contracts: &[ContractIR]) -> std::io::Result<()> {
    for contract in contracts {
        writeln!(writer, "Contract: {}", contract.name)?;
        if !contract.pragma.is_empty() {
            writeln!(writer, "  pragma {}", contract.pragma)?;
        }

        if contract.entrypoints.is_empty() {
            writeln!(writer, "  No entrypoints.")?;
            continue;
        }

        for function in &contract.entrypoints {
            writeln!(
                writer,
                "Entrypoint: {} ({}) at {}",
                function.name, function.visibility, function.location
            )?;
            if let Some(error) = &function.error {
                writeln!(writer, "  skipped: {error}")?;
                continue;
            }
            writeln!(writer, "  Blocks: {}", function.blocks.len())?;

            let reads: usize = function.blocks.iter().map(|b| b.accesses.reads.len()).sum();
            let writes: usize = function.blocks.iter().map(|b| b.accesses.writes.len()).sum();
            writeln!(writer, "  Variable accesses: {reads} reads, {writes} writes")?;

            for block in &function.blocks {
                let terminator = block
                    .terminator
                    .as_ref()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".into());
                writeln!(writer, "  {} [{terminator}]", block.id)?;
                for stmt in &block.ssa_statements {
                    writeln!(writer, "    {stmt}")?;
                }
            }

            let internal: Vec<String> = function
                .calls
                .iter()
                .filter(|c| c.in_contract)
                .map(|c| format!("{} at {}", c.callee, c.location))
                .collect();
            let external: Vec<String> = function
                .calls
                .iter()
                .filter(|c| !c.in_contract)
                .map(|c| format!("{} [{}] at {}", c.callee, c.kind, c.location))
                .collect();
            if internal.is_empty() {
                writeln!(writer, "  No internal calls")?;
            } else {
                writeln!(writer, "  Internal calls: {}", internal.join(", "))?;
            }
            if !external.is_empty() {
                writeln!(writer, "  External calls: {}", external.join(", "))?;
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::{Confidence, Location};

    fn finding(severity: Severity, function: &str) -> Finding {
        Finding::new(
            "reentrancy",
            severity,
            Confidence::Medium,
            "Potential reentrancy",
            "call precedes write".into(),
            Location {
                file: "out/Vault.sol/Vault.json".into(),
                contract: "Vault".into(),
                function: function.into(),
                line: Some(12),
                col: Some(5),
            },
        )
    }

    #[test]
    fn report_lists_findings_and_tallies_by_severity() {
        let findings = vec![
            finding(Severity::High, "withdraw"),
            finding(Severity::High, "sweep"),
            finding(Severity::Low, "poke"),
        ];
        let mut buf = Vec::new();
        print_report(&mut buf, &findings, &[], "out").unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("out: 3 findings"));
        assert!(text.contains("[high] reentrancy — Potential reentrancy"));
        assert!(text.contains("in Vault.withdraw (out/Vault.sol/Vault.json:12:5)"));
        assert!(text.contains("2 high, 1 low"));
    }

    #[test]
    fn empty_report_says_so() {
        let mut buf = Vec::new();
        print_report(&mut buf, &[], &[], "out").unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("out: no findings"));
    }

    #[test]
    fn warnings_are_appended_one_per_line() {
        let warnings = vec![AnalyzerWarning::missing_source("Vault.json")];
        let mut buf = Vec::new();
        print_report(&mut buf, &[], &warnings, "out").unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("warning: no source text for Vault.json"));
    }
}
