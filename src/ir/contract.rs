//! Contract-level IR and the pipeline that builds it.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::{accesses, blocks, calls, control_flow, inline, loops, phi, ssa, statements};
use crate::error::{AnalyzerError, AnalyzerWarning};
use crate::ir::block::{BasicBlock, StatementKind, Terminator};
use crate::ir::function::{FunctionIR, Parameter, Visibility};
use crate::loader::solc_ast::{ContractNode, FunctionNode};
use crate::loader::source_map::{src_to_location, SourceLocation};

#[derive(Debug, Clone)]
pub struct StateVariable {
    pub name: String,
    pub type_name: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct EventDecl {
    pub name: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct FunctionMeta {
    pub visibility: Visibility,
    pub location: SourceLocation,
}

/// Fully analysed IR for one contract. Owned by the analysis run, consumed
/// by detectors and reporting, never persisted.
#[derive(Debug, Clone)]
pub struct ContractIR {
    pub name: String,
    pub pragma: String,
    /// Artifact or file the contract came from, for reporting.
    pub source_label: String,
    pub location: SourceLocation,
    pub state_vars: Vec<StateVariable>,
    pub functions: BTreeMap<String, FunctionMeta>,
    pub events: Vec<EventDecl>,
    pub entrypoints: Vec<FunctionIR>,
    pub internal_functions: Vec<FunctionIR>,
}

impl ContractIR {
    pub fn state_var_names(&self) -> BTreeSet<&str> {
        self.state_vars.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn all_functions(&self) -> impl Iterator<Item = &FunctionIR> {
        self.entrypoints.iter().chain(&self.internal_functions)
    }

    /// Run the whole pipeline over one contract definition.
    pub fn build(
        contract: &ContractNode,
        pragma: &str,
        source_text: &str,
        source_label: &str,
    ) -> Result<(Self, Vec<AnalyzerWarning>), AnalyzerError> {
        if contract.name.is_empty() {
            return Err(AnalyzerError::InputMalformed {
                subject: source_label.to_string(),
                reason: "contract definition without a name".into(),
            });
        }

        let mut warnings = Vec::new();

        let state_vars: Vec<StateVariable> = contract
            .state_vars
            .iter()
            .map(|v| StateVariable {
                name: v.name.clone(),
                type_name: v.type_name.clone(),
                location: src_to_location(&v.src, source_text),
            })
            .collect();

        let events: Vec<EventDecl> = contract
            .events
            .iter()
            .map(|e| EventDecl {
                name: e.name.clone(),
                location: src_to_location(&e.src, source_text),
            })
            .collect();

        let mut functions: BTreeMap<String, FunctionMeta> = BTreeMap::new();
        let mut definition_srcs: BTreeMap<String, String> = BTreeMap::new();
        for function in &contract.functions {
            if function.name.is_empty() {
                // Constructors and fallbacks carry no name; they are not
                // callable by name and stay out of the registry.
                continue;
            }
            functions.insert(
                function.name.clone(),
                FunctionMeta {
                    visibility: Visibility::parse(&function.visibility),
                    location: src_to_location(&function.src, source_text),
                },
            );
            definition_srcs.insert(function.name.clone(), function.src.clone());
        }
        let function_names: BTreeSet<String> = functions.keys().cloned().collect();

        // Phase 1: build every function's SSA in isolation. Callees must be
        // fully built before any caller inlines them.
        let mut built: BTreeMap<String, inline::CalleeSsa> = BTreeMap::new();
        let mut skipped: BTreeMap<String, String> = BTreeMap::new();

        for function in &contract.functions {
            if function.name.is_empty() {
                continue;
            }
            match build_function_blocks(function, &function_names) {
                Ok(function_blocks) => {
                    built.insert(
                        function.name.clone(),
                        inline::CalleeSsa {
                            params: function.params.iter().map(|p| p.name.clone()).collect(),
                            blocks: function_blocks,
                        },
                    );
                }
                Err(node_type) => {
                    warnings.push(AnalyzerWarning::unsupported_construct(
                        &contract.name,
                        &function.name,
                        &node_type,
                    ));
                    skipped.insert(function.name.clone(), node_type);
                }
            }
        }

        // Phase 2: inline internal calls into each function, then finalize.
        let mut entrypoints = Vec::new();
        let mut internal_functions = Vec::new();

        for function in &contract.functions {
            if function.name.is_empty() {
                continue;
            }
            let meta = &functions[&function.name];
            let params: Vec<Parameter> = function
                .params
                .iter()
                .map(|p| Parameter {
                    name: p.name.clone(),
                    type_name: p.type_name.clone(),
                })
                .collect();

            let ir = if let Some(node_type) = skipped.get(&function.name) {
                FunctionIR {
                    name: function.name.clone(),
                    visibility: meta.visibility,
                    params,
                    location: meta.location,
                    blocks: vec![return_only_block()],
                    calls: Vec::new(),
                    error: Some(format!("unsupported construct: {node_type}")),
                }
            } else {
                let mut function_blocks = built[&function.name].blocks.clone();
                inline::inline_internal_calls(&mut function_blocks, &built);
                let mut function_blocks = inline::resplit_compound_blocks(function_blocks);
                control_flow::finalize_terminators(&mut function_blocks);
                ssa::cleanup_statements(&mut function_blocks);
                ssa::validate_ssa(&function.name, &function_blocks)?;

                let call_sites = calls::collect_call_sites(
                    &function_blocks,
                    &function.body,
                    &definition_srcs,
                    source_text,
                );

                FunctionIR {
                    name: function.name.clone(),
                    visibility: meta.visibility,
                    params,
                    location: meta.location,
                    blocks: function_blocks,
                    calls: call_sites,
                    error: None,
                }
            };

            if ir.is_entrypoint() {
                entrypoints.push(ir);
            } else {
                internal_functions.push(ir);
            }
        }

        Ok((
            Self {
                name: contract.name.clone(),
                pragma: pragma.to_string(),
                source_label: source_label.to_string(),
                location: src_to_location(&contract.src, source_text),
                state_vars,
                functions,
                events,
                entrypoints,
                internal_functions,
            },
            warnings,
        ))
    }
}

/// Classify, split, refine, track, version, loop-analyze and φ-insert one
/// function body. Returns the unsupported node type when the body contains a
/// construct outside the supported surface.
fn build_function_blocks(
    function: &FunctionNode,
    function_names: &BTreeSet<String>,
) -> Result<Vec<BasicBlock>, String> {
    let typed = statements::classify_statements(&function.body);

    if let Some(unsupported) = typed.iter().find(|s| s.kind == StatementKind::Unknown) {
        let node_type = statements::unsupported_kind(&unsupported.node)
            .unwrap_or("unknown")
            .to_string();
        return Err(node_type);
    }

    let function_blocks = blocks::split_into_blocks(typed);
    if function_blocks.is_empty() {
        return Ok(vec![return_only_block()]);
    }

    let mut function_blocks = control_flow::refine_blocks(function_blocks);
    accesses::track_accesses(&mut function_blocks);
    ssa::assign_versions(&mut function_blocks, function_names);
    loops::analyze_loop_calls(&mut function_blocks);
    phi::insert_phi_functions(&mut function_blocks);
    Ok(function_blocks)
}

fn return_only_block() -> BasicBlock {
    let mut block = BasicBlock::new("Block0");
    block.terminator = Some(Terminator::Return);
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::solc_ast::{parse_source_unit, SourceNode};
    use serde_json::json;

    fn minimal_contract(function_body: serde_json::Value) -> ContractNode {
        let ast = json!({
            "nodes": [{
                "nodeType": "ContractDefinition",
                "name": "C",
                "src": "0:10:0",
                "nodes": [
                    {
                        "nodeType": "VariableDeclaration",
                        "stateVariable": true,
                        "name": "x",
                        "typeName": { "name": "uint256" },
                        "src": "2:5:0"
                    },
                    {
                        "nodeType": "FunctionDefinition",
                        "name": "f",
                        "visibility": "public",
                        "src": "5:5:0",
                        "parameters": { "parameters": [] },
                        "body": { "nodeType": "Block", "statements": function_body }
                    }
                ]
            }]
        });
        let unit = parse_source_unit(&ast);
        let SourceNode::Contract(contract) = &unit.nodes[0] else {
            panic!("expected contract");
        };
        contract.clone()
    }

    #[test]
    fn empty_body_yields_single_return_block() {
        let contract = minimal_contract(json!([]));
        let (ir, warnings) = ContractIR::build(&contract, "", "", "test").unwrap();
        assert!(warnings.is_empty());
        assert_eq!(ir.entrypoints.len(), 1);
        let function = &ir.entrypoints[0];
        assert_eq!(function.blocks.len(), 1);
        assert_eq!(function.blocks[0].terminator, Some(Terminator::Return));
        assert!(function.blocks[0].ssa_statements.is_empty());
    }

    #[test]
    fn unsupported_construct_skips_the_function_with_a_warning() {
        let contract = minimal_contract(json!([
            { "nodeType": "InlineAssembly", "src": "6:2:0" }
        ]));
        let (ir, warnings) = ContractIR::build(&contract, "", "", "test").unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("InlineAssembly"));
        let function = &ir.entrypoints[0];
        assert!(function.error.is_some());
        assert!(function.blocks[0].ssa_statements.is_empty());
    }

    #[test]
    fn revert_only_body_terminates_with_revert() {
        let contract = minimal_contract(json!([{
            "nodeType": "ExpressionStatement",
            "expression": {
                "nodeType": "FunctionCall",
                "expression": { "nodeType": "Identifier", "name": "revert" },
                "arguments": []
            }
        }]));
        let (ir, _) = ContractIR::build(&contract, "", "", "test").unwrap();
        let function = &ir.entrypoints[0];
        assert_eq!(function.blocks.len(), 1);
        assert_eq!(function.blocks[0].terminator, Some(Terminator::Revert));
    }

    #[test]
    fn state_vars_and_registry_are_extracted() {
        let contract = minimal_contract(json!([]));
        let (ir, _) = ContractIR::build(&contract, "solidity ^0.8.13", "", "test").unwrap();
        assert_eq!(ir.pragma, "solidity ^0.8.13");
        assert_eq!(ir.state_vars.len(), 1);
        assert_eq!(ir.state_vars[0].name, "x");
        assert!(ir.functions.contains_key("f"));
        assert_eq!(ir.functions["f"].visibility, Visibility::Public);
    }
}
