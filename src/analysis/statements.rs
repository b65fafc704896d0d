//! Classifies top-level statements into the closed kind set the block
//! splitter and SSA passes dispatch on.

use crate::ir::block::{StatementKind, TypedStatement};
use crate::loader::solc_ast::{Expr, Stmt};

/// Callee names that are revert-shaped builtins, not calls.
pub const REVERT_BUILTINS: [&str; 3] = ["revert", "require", "assert"];

pub fn classify_statements(statements: &[Stmt]) -> Vec<TypedStatement> {
    statements
        .iter()
        .map(|stmt| TypedStatement {
            kind: classify(stmt),
            node: stmt.clone(),
        })
        .collect()
}

pub fn classify(stmt: &Stmt) -> StatementKind {
    match stmt {
        Stmt::Expression { expr, .. } => match expr {
            Expr::Assignment { .. } => StatementKind::Assignment,
            Expr::Call { callee, .. } => {
                if is_revert_callee(callee) {
                    StatementKind::Revert
                } else {
                    StatementKind::FunctionCall
                }
            }
            _ => StatementKind::Expression,
        },
        Stmt::Emit { .. } => StatementKind::EmitStatement,
        Stmt::If { .. } => StatementKind::IfStatement,
        Stmt::Return { .. } => StatementKind::Return,
        Stmt::VarDecl { .. } => StatementKind::VariableDeclaration,
        Stmt::For { .. } => StatementKind::ForLoop,
        Stmt::While { .. } => StatementKind::WhileLoop,
        Stmt::Block { .. } => StatementKind::Block,
        Stmt::Unsupported { .. } => StatementKind::Unknown,
    }
}

fn is_revert_callee(callee: &Expr) -> bool {
    matches!(
        callee.peel_options(),
        Expr::Identifier { name, .. } if REVERT_BUILTINS.contains(&name.as_str())
    )
}

/// The node-type string of an unsupported statement, for the warning message.
pub fn unsupported_kind(stmt: &Stmt) -> Option<&str> {
    match stmt {
        Stmt::Unsupported { node_type, .. } => Some(node_type),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::solc_ast::parse_statement;
    use serde_json::json;

    fn classify_json(node: serde_json::Value) -> StatementKind {
        classify(&parse_statement(&node))
    }

    #[test]
    fn expression_statements_split_by_inner_shape() {
        assert_eq!(
            classify_json(json!({
                "nodeType": "ExpressionStatement",
                "expression": {
                    "nodeType": "Assignment",
                    "operator": "=",
                    "leftHandSide": { "nodeType": "Identifier", "name": "x" },
                    "rightHandSide": { "nodeType": "Literal", "value": "1" }
                }
            })),
            StatementKind::Assignment
        );
        assert_eq!(
            classify_json(json!({
                "nodeType": "ExpressionStatement",
                "expression": {
                    "nodeType": "FunctionCall",
                    "expression": { "nodeType": "Identifier", "name": "helper" },
                    "arguments": []
                }
            })),
            StatementKind::FunctionCall
        );
        assert_eq!(
            classify_json(json!({
                "nodeType": "ExpressionStatement",
                "expression": {
                    "nodeType": "UnaryOperation",
                    "operator": "++",
                    "subExpression": { "nodeType": "Identifier", "name": "i" }
                }
            })),
            StatementKind::Expression
        );
    }

    #[test]
    fn revert_shaped_calls_are_reverts_not_calls() {
        for builtin in REVERT_BUILTINS {
            assert_eq!(
                classify_json(json!({
                    "nodeType": "ExpressionStatement",
                    "expression": {
                        "nodeType": "FunctionCall",
                        "expression": { "nodeType": "Identifier", "name": builtin },
                        "arguments": [ { "nodeType": "Literal", "kind": "string", "value": "nope" } ]
                    }
                })),
                StatementKind::Revert
            );
        }
    }

    #[test]
    fn control_flow_and_declarations() {
        assert_eq!(
            classify_json(json!({ "nodeType": "IfStatement", "condition": {} })),
            StatementKind::IfStatement
        );
        assert_eq!(
            classify_json(json!({ "nodeType": "ForStatement" })),
            StatementKind::ForLoop
        );
        assert_eq!(
            classify_json(json!({ "nodeType": "WhileStatement", "condition": {} })),
            StatementKind::WhileLoop
        );
        assert_eq!(
            classify_json(json!({ "nodeType": "Return" })),
            StatementKind::Return
        );
        assert_eq!(
            classify_json(json!({ "nodeType": "VariableDeclarationStatement", "declarations": [] })),
            StatementKind::VariableDeclaration
        );
        assert_eq!(
            classify_json(json!({ "nodeType": "EmitStatement", "eventCall": {} })),
            StatementKind::EmitStatement
        );
        assert_eq!(
            classify_json(json!({ "nodeType": "Block", "statements": [] })),
            StatementKind::Block
        );
        assert_eq!(
            classify_json(json!({ "nodeType": "TryStatement" })),
            StatementKind::Unknown
        );
    }
}
