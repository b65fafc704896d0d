//! Typed view of the solc AST surface the analyzer consumes.
//!
//! Forge artifacts carry the AST as free-form JSON. The raw document is
//! converted into closed statement and expression sums here, once, so every
//! later pass pattern-matches on enums instead of string-keyed maps. Node
//! kinds outside the supported surface land in `Unsupported`/`Unknown`
//! variants and degrade per the error-handling contract instead of failing
//! deserialization.

use serde_json::Value;

// ── Source-unit level ────────────────────────────────────────────────────────

/// A parsed top-level AST document (one file).
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub nodes: Vec<SourceNode>,
}

#[derive(Debug, Clone)]
pub enum SourceNode {
    Pragma { literals: Vec<String> },
    Contract(ContractNode),
    Other { node_type: String },
}

#[derive(Debug, Clone)]
pub struct ContractNode {
    pub name: String,
    pub src: String,
    pub state_vars: Vec<StateVarNode>,
    pub functions: Vec<FunctionNode>,
    pub events: Vec<EventNode>,
}

#[derive(Debug, Clone)]
pub struct StateVarNode {
    pub name: String,
    pub type_name: String,
    pub src: String,
}

#[derive(Debug, Clone)]
pub struct EventNode {
    pub name: String,
    pub src: String,
}

#[derive(Debug, Clone)]
pub struct FunctionNode {
    pub name: String,
    pub visibility: String,
    pub src: String,
    pub params: Vec<ParamNode>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ParamNode {
    pub name: String,
    pub type_name: String,
}

// ── Statements ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `ExpressionStatement` — assignment, call, unary increment, …
    Expression { expr: Expr, src: String },
    /// `VariableDeclarationStatement`.
    VarDecl {
        names: Vec<String>,
        init: Option<Expr>,
        src: String,
    },
    If {
        condition: Expr,
        true_body: Vec<Stmt>,
        false_body: Vec<Stmt>,
        src: String,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Box<Stmt>>,
        body: Vec<Stmt>,
        src: String,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
        src: String,
    },
    Return { expr: Option<Expr>, src: String },
    Emit { call: Expr, src: String },
    Block { statements: Vec<Stmt>, src: String },
    /// Anything outside the supported statement surface (assembly, try/catch…).
    Unsupported { node_type: String, src: String },
}

impl Stmt {
    pub fn src(&self) -> &str {
        match self {
            Stmt::Expression { src, .. }
            | Stmt::VarDecl { src, .. }
            | Stmt::If { src, .. }
            | Stmt::For { src, .. }
            | Stmt::While { src, .. }
            | Stmt::Return { src, .. }
            | Stmt::Emit { src, .. }
            | Stmt::Block { src, .. }
            | Stmt::Unsupported { src, .. } => src,
        }
    }
}

// ── Expressions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Expr {
    Identifier {
        name: String,
        /// solc `typeDescriptions.typeString`, when present. Used to spot
        /// contract/interface-typed receivers.
        type_string: Option<String>,
    },
    Literal { value: String, is_string: bool },
    Member { base: Box<Expr>, member: String },
    Index { base: Box<Expr>, index: Box<Expr> },
    Binary { left: Box<Expr>, op: String, right: Box<Expr> },
    Unary { op: String, sub: Box<Expr>, prefix: bool },
    Assignment { lhs: Box<Expr>, op: String, rhs: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr>, src: String },
    /// `x.call{value: v}(…)` — the options wrapper around the callee.
    CallOptions { base: Box<Expr> },
    /// `address` in `address(0)` and similar type conversions.
    ElementaryType { name: String },
    Tuple { components: Vec<Option<Expr>> },
    Unknown { node_type: String },
}

impl Expr {
    /// Unwrap `{…}` call-option wrappers down to the underlying callee shape.
    pub fn peel_options(&self) -> &Expr {
        match self {
            Expr::CallOptions { base } => base.peel_options(),
            other => other,
        }
    }

    /// Render back to source-ish text, used for terminator conditions and
    /// call-target names.
    pub fn render(&self) -> String {
        match self {
            Expr::Identifier { name, .. } => name.clone(),
            Expr::Literal { value, is_string } => {
                if *is_string {
                    format!("\"{value}\"")
                } else {
                    value.clone()
                }
            }
            Expr::Member { base, member } => format!("{}.{member}", base.render()),
            Expr::Index { base, index } => format!("{}[{}]", base.render(), index.render()),
            Expr::Binary { left, op, right } => {
                format!("{} {op} {}", left.render(), right.render())
            }
            Expr::Unary { op, sub, prefix } => {
                if *prefix {
                    format!("{op}{}", sub.render())
                } else {
                    format!("{}{op}", sub.render())
                }
            }
            Expr::Assignment { lhs, op, rhs } => {
                format!("{} {op} {}", lhs.render(), rhs.render())
            }
            Expr::Call { callee, args, .. } => {
                let rendered: Vec<String> = args.iter().map(Expr::render).collect();
                format!("{}({})", callee.render(), rendered.join(", "))
            }
            Expr::CallOptions { base } => base.render(),
            Expr::ElementaryType { name } => name.clone(),
            Expr::Tuple { components } => {
                let rendered: Vec<String> = components
                    .iter()
                    .map(|c| c.as_ref().map(Expr::render).unwrap_or_default())
                    .collect();
                format!("({})", rendered.join(", "))
            }
            Expr::Unknown { .. } => String::from("?"),
        }
    }
}

// ── Conversion from raw JSON ─────────────────────────────────────────────────

fn str_of(node: &Value, key: &str) -> String {
    node.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn node_type(node: &Value) -> &str {
    node.get("nodeType").and_then(Value::as_str).unwrap_or("")
}

fn type_string(node: &Value) -> Option<String> {
    node.get("typeDescriptions")
        .and_then(|t| t.get("typeString"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Parse a whole AST document (the `ast` object of a forge artifact).
pub fn parse_source_unit(ast: &Value) -> SourceUnit {
    let nodes = ast
        .get("nodes")
        .and_then(Value::as_array)
        .map(|nodes| nodes.iter().map(parse_source_node).collect())
        .unwrap_or_default();
    SourceUnit { nodes }
}

fn parse_source_node(node: &Value) -> SourceNode {
    match node_type(node) {
        "PragmaDirective" => {
            let literals = node
                .get("literals")
                .and_then(Value::as_array)
                .map(|lits| {
                    lits.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            SourceNode::Pragma { literals }
        }
        "ContractDefinition" => SourceNode::Contract(parse_contract(node)),
        other => SourceNode::Other {
            node_type: other.to_string(),
        },
    }
}

fn parse_contract(node: &Value) -> ContractNode {
    let mut state_vars = Vec::new();
    let mut functions = Vec::new();
    let mut events = Vec::new();

    if let Some(items) = node.get("nodes").and_then(Value::as_array) {
        for item in items {
            match node_type(item) {
                "VariableDeclaration"
                    if item.get("stateVariable").and_then(Value::as_bool).unwrap_or(false) =>
                {
                    state_vars.push(StateVarNode {
                        name: str_of(item, "name"),
                        type_name: item
                            .get("typeName")
                            .map(|t| {
                                let named = str_of(t, "name");
                                if named.is_empty() {
                                    type_string(item).unwrap_or_else(|| "unknown".into())
                                } else {
                                    named
                                }
                            })
                            .unwrap_or_else(|| "unknown".into()),
                        src: str_of(item, "src"),
                    });
                }
                "FunctionDefinition" => functions.push(parse_function(item)),
                "EventDefinition" => events.push(EventNode {
                    name: str_of(item, "name"),
                    src: str_of(item, "src"),
                }),
                _ => {}
            }
        }
    }

    ContractNode {
        name: str_of(node, "name"),
        src: str_of(node, "src"),
        state_vars,
        functions,
        events,
    }
}

fn parse_function(node: &Value) -> FunctionNode {
    let params = node
        .get("parameters")
        .and_then(|p| p.get("parameters"))
        .and_then(Value::as_array)
        .map(|params| {
            params
                .iter()
                .map(|p| ParamNode {
                    name: str_of(p, "name"),
                    type_name: p
                        .get("typeName")
                        .map(|t| str_of(t, "name"))
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| "unknown".into()),
                })
                .collect()
        })
        .unwrap_or_default();

    let body = node
        .get("body")
        .and_then(|b| b.get("statements"))
        .and_then(Value::as_array)
        .map(|stmts| stmts.iter().map(parse_statement).collect())
        .unwrap_or_default();

    FunctionNode {
        name: str_of(node, "name"),
        visibility: {
            let v = str_of(node, "visibility");
            if v.is_empty() { "internal".into() } else { v }
        },
        src: str_of(node, "src"),
        params,
        body,
    }
}

pub fn parse_statement(node: &Value) -> Stmt {
    let src = str_of(node, "src");
    match node_type(node) {
        "ExpressionStatement" => Stmt::Expression {
            expr: node.get("expression").map(parse_expression).unwrap_or(Expr::Unknown {
                node_type: "missing".into(),
            }),
            src,
        },
        "VariableDeclarationStatement" => {
            let names = node
                .get("declarations")
                .and_then(Value::as_array)
                .map(|decls| {
                    decls
                        .iter()
                        .filter(|d| !d.is_null())
                        .map(|d| str_of(d, "name"))
                        .filter(|n| !n.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            Stmt::VarDecl {
                names,
                init: node
                    .get("initialValue")
                    .filter(|v| !v.is_null())
                    .map(parse_expression),
                src,
            }
        }
        "IfStatement" => Stmt::If {
            condition: node
                .get("condition")
                .map(parse_expression)
                .unwrap_or(Expr::Unknown { node_type: "missing".into() }),
            true_body: parse_body(node.get("trueBody")),
            false_body: parse_body(node.get("falseBody")),
            src,
        },
        "ForStatement" => Stmt::For {
            init: node
                .get("initializationExpression")
                .filter(|v| !v.is_null())
                .map(|v| Box::new(parse_statement(v))),
            condition: node
                .get("condition")
                .filter(|v| !v.is_null())
                .map(parse_expression),
            update: node
                .get("loopExpression")
                .filter(|v| !v.is_null())
                .map(|v| Box::new(parse_statement(v))),
            body: parse_body(node.get("body")),
            src,
        },
        "WhileStatement" => Stmt::While {
            condition: node
                .get("condition")
                .map(parse_expression)
                .unwrap_or(Expr::Unknown { node_type: "missing".into() }),
            body: parse_body(node.get("body")),
            src,
        },
        "Return" | "ReturnStatement" => Stmt::Return {
            expr: node
                .get("expression")
                .filter(|v| !v.is_null())
                .map(parse_expression),
            src,
        },
        "EmitStatement" => Stmt::Emit {
            call: node
                .get("eventCall")
                .map(parse_expression)
                .unwrap_or(Expr::Unknown { node_type: "missing".into() }),
            src,
        },
        "Block" => Stmt::Block {
            statements: node
                .get("statements")
                .and_then(Value::as_array)
                .map(|stmts| stmts.iter().map(parse_statement).collect())
                .unwrap_or_default(),
            src,
        },
        other => Stmt::Unsupported {
            node_type: other.to_string(),
            src,
        },
    }
}

/// A body is either a `Block` node or a single bare statement.
fn parse_body(node: Option<&Value>) -> Vec<Stmt> {
    let Some(node) = node.filter(|v| !v.is_null()) else {
        return Vec::new();
    };
    if node_type(node) == "Block" {
        node.get("statements")
            .and_then(Value::as_array)
            .map(|stmts| stmts.iter().map(parse_statement).collect())
            .unwrap_or_default()
    } else {
        vec![parse_statement(node)]
    }
}

pub fn parse_expression(node: &Value) -> Expr {
    match node_type(node) {
        "Identifier" => Expr::Identifier {
            name: str_of(node, "name"),
            type_string: type_string(node),
        },
        "Literal" => {
            let raw = node.get("value");
            let is_string = node
                .get("kind")
                .and_then(Value::as_str)
                .map(|k| k == "string")
                .unwrap_or(false);
            let value = match raw {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            Expr::Literal { value, is_string }
        }
        "MemberAccess" => Expr::Member {
            base: Box::new(
                node.get("expression")
                    .map(parse_expression)
                    .unwrap_or(Expr::Unknown { node_type: "missing".into() }),
            ),
            member: str_of(node, "memberName"),
        },
        "IndexAccess" => Expr::Index {
            base: Box::new(
                node.get("baseExpression")
                    .map(parse_expression)
                    .unwrap_or(Expr::Unknown { node_type: "missing".into() }),
            ),
            index: Box::new(
                node.get("indexExpression")
                    .map(parse_expression)
                    .unwrap_or(Expr::Unknown { node_type: "missing".into() }),
            ),
        },
        "BinaryOperation" => Expr::Binary {
            left: Box::new(
                node.get("leftExpression")
                    .map(parse_expression)
                    .unwrap_or(Expr::Unknown { node_type: "missing".into() }),
            ),
            op: str_of(node, "operator"),
            right: Box::new(
                node.get("rightExpression")
                    .map(parse_expression)
                    .unwrap_or(Expr::Unknown { node_type: "missing".into() }),
            ),
        },
        "UnaryOperation" => Expr::Unary {
            op: str_of(node, "operator"),
            sub: Box::new(
                node.get("subExpression")
                    .map(parse_expression)
                    .unwrap_or(Expr::Unknown { node_type: "missing".into() }),
            ),
            prefix: node.get("prefix").and_then(Value::as_bool).unwrap_or(false),
        },
        "Assignment" => Expr::Assignment {
            lhs: Box::new(
                node.get("leftHandSide")
                    .map(parse_expression)
                    .unwrap_or(Expr::Unknown { node_type: "missing".into() }),
            ),
            op: {
                let op = str_of(node, "operator");
                if op.is_empty() { "=".into() } else { op }
            },
            rhs: Box::new(
                node.get("rightHandSide")
                    .map(parse_expression)
                    .unwrap_or(Expr::Unknown { node_type: "missing".into() }),
            ),
        },
        "FunctionCall" => Expr::Call {
            callee: Box::new(
                node.get("expression")
                    .map(parse_expression)
                    .unwrap_or(Expr::Unknown { node_type: "missing".into() }),
            ),
            args: node
                .get("arguments")
                .and_then(Value::as_array)
                .map(|args| args.iter().map(parse_expression).collect())
                .unwrap_or_default(),
            src: str_of(node, "src"),
        },
        "FunctionCallOptions" => Expr::CallOptions {
            base: Box::new(
                node.get("expression")
                    .map(parse_expression)
                    .unwrap_or(Expr::Unknown { node_type: "missing".into() }),
            ),
        },
        "ElementaryTypeNameExpression" => {
            let name = node
                .get("typeName")
                .map(|t| {
                    let n = str_of(t, "name");
                    if n.is_empty() {
                        t.as_str().unwrap_or_default().to_string()
                    } else {
                        n
                    }
                })
                .unwrap_or_default();
            Expr::ElementaryType { name }
        }
        "TupleExpression" => Expr::Tuple {
            components: node
                .get("components")
                .and_then(Value::as_array)
                .map(|comps| {
                    comps
                        .iter()
                        .map(|c| if c.is_null() { None } else { Some(parse_expression(c)) })
                        .collect()
                })
                .unwrap_or_default(),
        },
        other => Expr::Unknown {
            node_type: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_contract_surface() {
        let ast = json!({
            "nodes": [
                { "nodeType": "PragmaDirective", "literals": ["solidity", "^0.8.13"] },
                {
                    "nodeType": "ContractDefinition",
                    "name": "Vault",
                    "src": "25:100:0",
                    "nodes": [
                        {
                            "nodeType": "VariableDeclaration",
                            "stateVariable": true,
                            "name": "balances",
                            "typeName": { "nodeType": "Mapping" },
                            "typeDescriptions": { "typeString": "mapping(address => uint256)" },
                            "src": "40:10:0"
                        },
                        {
                            "nodeType": "EventDefinition",
                            "name": "Withdrawal",
                            "src": "55:10:0"
                        },
                        {
                            "nodeType": "FunctionDefinition",
                            "name": "withdraw",
                            "visibility": "public",
                            "src": "70:30:0",
                            "parameters": { "parameters": [
                                { "name": "amount", "typeName": { "name": "uint256" } }
                            ]},
                            "body": { "nodeType": "Block", "statements": [] }
                        }
                    ]
                }
            ]
        });

        let unit = parse_source_unit(&ast);
        assert_eq!(unit.nodes.len(), 2);
        let SourceNode::Contract(contract) = &unit.nodes[1] else {
            panic!("expected contract");
        };
        assert_eq!(contract.name, "Vault");
        assert_eq!(contract.state_vars[0].name, "balances");
        assert_eq!(contract.events[0].name, "Withdrawal");
        assert_eq!(contract.functions[0].params[0].name, "amount");
    }

    #[test]
    fn unsupported_statement_kinds_are_preserved() {
        let stmt = parse_statement(&json!({
            "nodeType": "InlineAssembly",
            "src": "0:0:0"
        }));
        assert!(matches!(stmt, Stmt::Unsupported { ref node_type, .. } if node_type == "InlineAssembly"));
    }

    #[test]
    fn renders_expressions() {
        let expr = parse_expression(&json!({
            "nodeType": "IndexAccess",
            "baseExpression": { "nodeType": "Identifier", "name": "balances" },
            "indexExpression": {
                "nodeType": "MemberAccess",
                "memberName": "sender",
                "expression": { "nodeType": "Identifier", "name": "msg" }
            }
        }));
        assert_eq!(expr.render(), "balances[msg.sender]");
    }

    #[test]
    fn call_options_peel_to_the_callee() {
        let expr = parse_expression(&json!({
            "nodeType": "FunctionCallOptions",
            "expression": {
                "nodeType": "MemberAccess",
                "memberName": "call",
                "expression": {
                    "nodeType": "MemberAccess",
                    "memberName": "sender",
                    "expression": { "nodeType": "Identifier", "name": "msg" }
                }
            }
        }));
        let Expr::Member { member, .. } = expr.peel_options() else {
            panic!("expected member access under options");
        };
        assert_eq!(member, "call");
    }
}
