//! The reentrancy detector: an external-kind call followed by a write to a
//! declared state variable, in SSA order within a block and block order
//! across blocks.

use std::collections::BTreeSet;

use crate::analysis::ssa::{root_name, write_target};
use crate::detectors::{Confidence, Detector, Finding, Location, Severity};
use crate::error::AnalyzerWarning;
use crate::ir::contract::ContractIR;
use crate::ir::function::{CallKind, FunctionIR};

/// Evidence of one call-then-write pattern in a function.
#[derive(Debug, Clone)]
pub struct ReentrancyEvidence {
    pub function: String,
    /// SSA text of the arming external call.
    pub external_call: String,
    /// SSA text of the state write reached after it.
    pub state_write: String,
    pub call_block: String,
    pub write_block: String,
}

/// Scan one function's linearized IR for external call → state write.
pub fn check_reentrancy(function: &FunctionIR, state_vars: &BTreeSet<&str>) -> Vec<ReentrancyEvidence> {
    let mut evidence = Vec::new();
    let mut armed: Option<(String, String)> = None;

    for block in &function.blocks {
        for stmt in &block.ssa_statements {
            if let Some(kind) = CallKind::scan(stmt) {
                // Revert-shaped statements never arm the detector; internal
                // calls are ordering-neutral (their inlined effects follow).
                if kind.is_external_kind() {
                    armed = Some((stmt.clone(), block.id.clone()));
                    continue;
                }
            }
            if let Some((call, call_block)) = &armed {
                if let Some((target, _)) = write_target(stmt) {
                    if state_vars.contains(root_name(target)) {
                        evidence.push(ReentrancyEvidence {
                            function: function.name.clone(),
                            external_call: call.clone(),
                            state_write: stmt.clone(),
                            call_block: call_block.clone(),
                            write_block: block.id.clone(),
                        });
                    }
                }
            }
        }
    }

    evidence
}

/// Detects state writes that an external call can front-run by re-entering.
///
/// Conservative: any external-kind call (`external`, `low_level_external`,
/// `delegatecall`, `staticcall`) arms the scan; every subsequent SSA write
/// whose base name is a declared state variable is evidence. One finding is
/// reported per entrypoint.
pub struct Reentrancy;

impl Detector for Reentrancy {
    fn id(&self) -> &'static str {
        "reentrancy"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn confidence(&self) -> Confidence {
        Confidence::Medium
    }

    fn description(&self) -> &'static str {
        "External call followed by a state variable write. The callee can \
         re-enter before state is committed."
    }

    fn run(&self, contract: &ContractIR) -> (Vec<Finding>, Vec<AnalyzerWarning>) {
        let mut findings = Vec::new();
        let warnings = Vec::new();
        let state_vars = contract.state_var_names();

        for function in &contract.entrypoints {
            // A function whose analysis failed contributes no findings.
            if function.error.is_some() {
                continue;
            }

            let evidence = check_reentrancy(function, &state_vars);
            let Some(first) = evidence.first() else {
                continue;
            };

            findings.push(Finding::new(
                self.id(),
                self.severity(),
                self.confidence(),
                "Potential reentrancy",
                format!(
                    "Function '{}': external call `{}` (block {}) precedes state write \
                     `{}` (block {}). The called contract can re-enter before the \
                     write commits.",
                    first.function,
                    first.external_call,
                    first.call_block,
                    first.state_write,
                    first.write_block,
                ),
                Location {
                    file: contract.source_label.clone(),
                    contract: contract.name.clone(),
                    function: function.name.clone(),
                    line: function.location.is_known().then_some(function.location.line),
                    col: function.location.is_known().then_some(function.location.col),
                },
            ));
        }

        (findings, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::block::BasicBlock;
    use crate::ir::function::{Parameter, Visibility};
    use crate::loader::source_map::SourceLocation;

    fn function_with(blocks: Vec<Vec<&str>>) -> FunctionIR {
        let blocks = blocks
            .into_iter()
            .enumerate()
            .map(|(i, stmts)| {
                let mut block = BasicBlock::new(format!("Block{i}"));
                block.ssa_statements = stmts.into_iter().map(String::from).collect();
                block
            })
            .collect();
        FunctionIR {
            name: "withdraw".into(),
            visibility: Visibility::Public,
            params: Vec::<Parameter>::new(),
            location: SourceLocation::unknown(),
            blocks,
            calls: Vec::new(),
            error: None,
        }
    }

    fn state(names: &[&'static str]) -> BTreeSet<&'static str> {
        names.iter().copied().collect()
    }

    #[test]
    fn call_then_write_across_blocks_is_evidence() {
        let function = function_with(vec![
            vec!["bal_1 = balances_0 balances[msg.sender]_0 msg.sender_0"],
            vec!["ret_1 = call[low_level_external](msg.sender.call, \"\")"],
            vec!["balances[msg.sender]_1 = 0"],
        ]);
        let evidence = check_reentrancy(&function, &state(&["balances"]));
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].write_block, "Block2");
    }

    #[test]
    fn call_then_write_within_one_block_is_evidence() {
        let function = function_with(vec![vec![
            "ret_1 = call[external](ext.ping)",
            "balances[i]_1 = v_0",
        ]]);
        let evidence = check_reentrancy(&function, &state(&["balances"]));
        assert_eq!(evidence.len(), 1);
    }

    #[test]
    fn write_before_call_is_safe() {
        let function = function_with(vec![
            vec!["x_1 = 1"],
            vec!["ret_1 = call[external](IA(a).hello)"],
        ]);
        assert!(check_reentrancy(&function, &state(&["x"])).is_empty());
    }

    #[test]
    fn revert_and_internal_calls_do_not_arm() {
        let function = function_with(vec![
            vec!["revert \"nope\""],
            vec!["ret_1 = call[internal](_helper)"],
            vec!["x_1 = 0"],
        ]);
        assert!(check_reentrancy(&function, &state(&["x"])).is_empty());
    }

    #[test]
    fn writes_to_locals_are_not_evidence() {
        let function = function_with(vec![
            vec!["ret_1 = call[external](ext.ping)"],
            vec!["tmp_1 = 5"],
        ]);
        assert!(check_reentrancy(&function, &state(&["balances"])).is_empty());
    }
}
