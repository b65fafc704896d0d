//! Classifies call expressions into the closed call-kind set and collects a
//! function's consolidated outgoing-call list.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::statements::REVERT_BUILTINS;
use crate::ir::block::BasicBlock;
use crate::ir::function::{CallKind, CallSite};
use crate::loader::solc_ast::{Expr, Stmt};
use crate::loader::source_map::{src_to_location, SourceLocation};

const LOW_LEVEL_MEMBERS: [&str; 3] = ["call", "send", "transfer"];

#[derive(Debug, Clone)]
pub struct ClassifiedCall {
    pub kind: CallKind,
    /// Rendered callee, e.g. `_transfer`, `msg.sender.call`, `IA(a).hello`.
    pub name: String,
}

/// Classify a call by its callee shape and the same-contract function set.
pub fn classify_call(callee: &Expr, contract_functions: &BTreeSet<String>) -> ClassifiedCall {
    let callee = callee.peel_options();
    match callee {
        Expr::Identifier { name, .. } => {
            let kind = if REVERT_BUILTINS.contains(&name.as_str()) {
                CallKind::Revert
            } else if contract_functions.contains(name) {
                CallKind::Internal
            } else {
                CallKind::External
            };
            ClassifiedCall {
                kind,
                name: name.clone(),
            }
        }
        Expr::Member { base, member } => {
            let kind = if LOW_LEVEL_MEMBERS.contains(&member.as_str()) {
                CallKind::LowLevelExternal
            } else if member == "delegatecall" {
                CallKind::Delegatecall
            } else if member == "staticcall" {
                CallKind::Staticcall
            } else {
                // Interface casts (`IA(a).hello`), contract-typed receivers
                // and anything unrecognized all leave the contract.
                CallKind::External
            };
            ClassifiedCall {
                kind,
                name: callee.render(),
            }
        }
        other => ClassifiedCall {
            kind: CallKind::External,
            name: other.render(),
        },
    }
}

/// Parse the callee name out of an SSA call statement
/// (`ret_1 = call[kind](name, args…)`).
pub fn callee_of_ssa(ssa_statement: &str) -> Option<&str> {
    let rest = ssa_statement.split("](").nth(1)?;
    let inner = rest.strip_suffix(')').unwrap_or(rest);
    let name = match inner.find(',') {
        Some(comma) => &inner[..comma],
        None => inner,
    };
    Some(name.trim())
}

/// Build the consolidated outgoing-call list for one function.
///
/// Internal callees point at their definition; everything else points at the
/// call site found in the AST, falling back to an unknown location. Scans the
/// final SSA so calls contributed by inlining are included.
pub fn collect_call_sites(
    blocks: &[BasicBlock],
    body: &[Stmt],
    function_defs: &BTreeMap<String, String>,
    source_text: &str,
) -> Vec<CallSite> {
    let contract_functions: BTreeSet<String> = function_defs.keys().cloned().collect();

    // Call-site locations keyed by rendered callee name.
    let mut site_srcs: BTreeMap<String, String> = BTreeMap::new();
    for stmt in body {
        walk_statement(stmt, &mut |call_src, callee| {
            let classified = classify_call(callee, &contract_functions);
            site_srcs
                .entry(classified.name)
                .or_insert_with(|| call_src.to_string());
        });
    }

    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut sites = Vec::new();

    for block in blocks {
        for ssa in &block.ssa_statements {
            let Some(kind) = CallKind::scan(ssa) else {
                continue;
            };
            if kind == CallKind::Revert {
                continue;
            }
            let Some(name) = callee_of_ssa(ssa) else {
                continue;
            };
            if name.is_empty() || !seen.insert(name.to_string()) {
                continue;
            }

            let in_contract = kind == CallKind::Internal;
            let location = if in_contract {
                function_defs
                    .get(name)
                    .map(|src| src_to_location(src, source_text))
                    .unwrap_or_else(SourceLocation::unknown)
            } else {
                site_srcs
                    .get(name)
                    .map(|src| src_to_location(src, source_text))
                    .unwrap_or_else(SourceLocation::unknown)
            };

            sites.push(CallSite {
                callee: name.to_string(),
                kind,
                location,
                in_contract,
            });
        }
    }

    sites
}

fn walk_statement(stmt: &Stmt, visit: &mut impl FnMut(&str, &Expr)) {
    match stmt {
        Stmt::Expression { expr, .. } => walk_expr(expr, visit),
        Stmt::VarDecl { init, .. } => {
            if let Some(init) = init {
                walk_expr(init, visit);
            }
        }
        Stmt::If {
            condition,
            true_body,
            false_body,
            ..
        } => {
            walk_expr(condition, visit);
            for s in true_body.iter().chain(false_body) {
                walk_statement(s, visit);
            }
        }
        Stmt::For {
            init,
            condition,
            update,
            body,
            ..
        } => {
            if let Some(init) = init {
                walk_statement(init, visit);
            }
            if let Some(condition) = condition {
                walk_expr(condition, visit);
            }
            if let Some(update) = update {
                walk_statement(update, visit);
            }
            for s in body {
                walk_statement(s, visit);
            }
        }
        Stmt::While { condition, body, .. } => {
            walk_expr(condition, visit);
            for s in body {
                walk_statement(s, visit);
            }
        }
        Stmt::Return { expr, .. } => {
            if let Some(expr) = expr {
                walk_expr(expr, visit);
            }
        }
        Stmt::Emit { call, .. } => walk_expr(call, visit),
        Stmt::Block { statements, .. } => {
            for s in statements {
                walk_statement(s, visit);
            }
        }
        Stmt::Unsupported { .. } => {}
    }
}

fn walk_expr(expr: &Expr, visit: &mut impl FnMut(&str, &Expr)) {
    match expr {
        Expr::Call { callee, args, src } => {
            visit(src, callee);
            walk_expr(callee, visit);
            for arg in args {
                walk_expr(arg, visit);
            }
        }
        Expr::CallOptions { base } => walk_expr(base, visit),
        Expr::Member { base, .. } => walk_expr(base, visit),
        Expr::Index { base, index } => {
            walk_expr(base, visit);
            walk_expr(index, visit);
        }
        Expr::Binary { left, right, .. } => {
            walk_expr(left, visit);
            walk_expr(right, visit);
        }
        Expr::Unary { sub, .. } => walk_expr(sub, visit),
        Expr::Assignment { lhs, rhs, .. } => {
            walk_expr(lhs, visit);
            walk_expr(rhs, visit);
        }
        Expr::Tuple { components } => {
            for component in components.iter().flatten() {
                walk_expr(component, visit);
            }
        }
        Expr::Identifier { .. }
        | Expr::Literal { .. }
        | Expr::ElementaryType { .. }
        | Expr::Unknown { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::solc_ast::parse_expression;
    use serde_json::json;

    fn functions(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn classify_json(node: serde_json::Value, fns: &[&str]) -> ClassifiedCall {
        classify_call(&parse_expression(&node), &functions(fns))
    }

    #[test]
    fn identifiers_split_on_the_function_registry() {
        let internal = classify_json(json!({ "nodeType": "Identifier", "name": "_transfer" }), &["_transfer"]);
        assert_eq!(internal.kind, CallKind::Internal);

        let external = classify_json(json!({ "nodeType": "Identifier", "name": "mystery" }), &["_transfer"]);
        assert_eq!(external.kind, CallKind::External);
    }

    #[test]
    fn revert_builtins_are_never_calls() {
        for builtin in ["revert", "require", "assert"] {
            let c = classify_json(json!({ "nodeType": "Identifier", "name": builtin }), &[]);
            assert_eq!(c.kind, CallKind::Revert);
        }
    }

    #[test]
    fn low_level_members_classify_by_name() {
        let cases = [
            ("call", CallKind::LowLevelExternal),
            ("send", CallKind::LowLevelExternal),
            ("transfer", CallKind::LowLevelExternal),
            ("delegatecall", CallKind::Delegatecall),
            ("staticcall", CallKind::Staticcall),
            ("hello", CallKind::External),
        ];
        for (member, expected) in cases {
            let c = classify_json(
                json!({
                    "nodeType": "MemberAccess",
                    "memberName": member,
                    "expression": { "nodeType": "Identifier", "name": "target" }
                }),
                &[],
            );
            assert_eq!(c.kind, expected, "member {member}");
            assert_eq!(c.name, format!("target.{member}"));
        }
    }

    #[test]
    fn interface_cast_calls_are_external_with_full_name() {
        let c = classify_json(
            json!({
                "nodeType": "MemberAccess",
                "memberName": "hello",
                "expression": {
                    "nodeType": "FunctionCall",
                    "expression": { "nodeType": "Identifier", "name": "IA" },
                    "arguments": [ { "nodeType": "Identifier", "name": "a" } ]
                }
            }),
            &[],
        );
        assert_eq!(c.kind, CallKind::External);
        assert_eq!(c.name, "IA(a).hello");
    }

    #[test]
    fn parses_callee_out_of_ssa_text() {
        assert_eq!(
            callee_of_ssa("ret_1 = call[internal](_transfer, to_0, amount_0)"),
            Some("_transfer")
        );
        assert_eq!(
            callee_of_ssa("ret_2 = call[external](IA(a).hello)"),
            Some("IA(a).hello")
        );
        assert_eq!(callee_of_ssa("x_1 = 0"), None);
    }
}
