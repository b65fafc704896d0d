//! SSA versioning and textual statement emission.
//!
//! A single counter table per function assigns monotonically increasing
//! versions to writes; reads thread the current version. Statements are
//! emitted as plain text (`balances[msg.sender]_2 = 0`), which keeps the IR
//! trivially inspectable and lets detectors work by scanning lines.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::accesses::{extract_reads, structured_name};
use crate::analysis::calls::classify_call;
use crate::analysis::statements::REVERT_BUILTINS;
use crate::error::AnalyzerError;
use crate::ir::block::{BasicBlock, StatementKind};
use crate::ir::function::CallKind;
use crate::loader::solc_ast::{Expr, Stmt};

/// Variables preferred as the witness of a compound-assignment RHS, in order.
const WITNESS_PRIMARY: [&str; 2] = ["amount", "value"];
const WITNESS_SECONDARY: [&str; 5] = ["recipient", "spender", "sender", "from", "to"];

pub fn assign_versions(blocks: &mut [BasicBlock], contract_functions: &BTreeSet<String>) {
    let mut counters: BTreeMap<String, u32> = BTreeMap::new();
    let mut current: BTreeMap<String, u32> = BTreeMap::new();

    for block in blocks.iter() {
        for var in block.accesses.reads.iter().chain(&block.accesses.writes) {
            counters.entry(var.clone()).or_insert(0);
            current.entry(var.clone()).or_insert(0);
        }
    }
    counters.entry("ret".into()).or_insert(0);

    for block in blocks.iter_mut() {
        let mut reads_v: BTreeMap<String, u32> = BTreeMap::new();
        let mut writes_v: BTreeMap<String, u32> = BTreeMap::new();

        for var in &block.accesses.reads {
            reads_v.insert(var.clone(), current.get(var).copied().unwrap_or(0));
        }

        let has_if = block
            .statements
            .iter()
            .any(|s| s.kind == StatementKind::IfStatement);

        for var in &block.accesses.writes {
            let counter = counters.entry(var.clone()).or_insert(0);
            *counter += 1;
            let version = *counter;
            writes_v.insert(var.clone(), version);
            current.insert(var.clone(), version);

            // A variable read inside an `if` condition after being written in
            // the same block sees the written version.
            if has_if && block.accesses.reads.contains(var) {
                reads_v.insert(var.clone(), version);
            }
        }

        let mut emitter = Emitter {
            contract_functions,
            counters: &mut counters,
            current: &mut current,
            reads_v: &reads_v,
            writes_v: &mut writes_v,
            emitted_writes: BTreeSet::new(),
            out: Vec::new(),
        };

        let statements = std::mem::take(&mut block.statements);
        for statement in &statements {
            emitter.emit_statement(statement.kind, &statement.node);
        }
        block.statements = statements;

        block.ssa_statements = emitter.out;
        block.ssa_versions.reads = reads_v;
        block.ssa_versions.writes = writes_v;
    }
}

struct Emitter<'a> {
    contract_functions: &'a BTreeSet<String>,
    counters: &'a mut BTreeMap<String, u32>,
    current: &'a mut BTreeMap<String, u32>,
    reads_v: &'a BTreeMap<String, u32>,
    writes_v: &'a mut BTreeMap<String, u32>,
    /// Targets already defined in this block; a second write to the same name
    /// takes a fresh version so the SSA property holds inside one block too.
    emitted_writes: BTreeSet<String>,
    out: Vec<String>,
}

impl Emitter<'_> {
    fn read_version(&self, name: &str) -> u32 {
        self.reads_v.get(name).copied().unwrap_or(0)
    }

    fn write_version(&mut self, name: &str) -> u32 {
        if self.emitted_writes.contains(name) {
            let counter = self.counters.entry(name.to_string()).or_insert(0);
            *counter += 1;
            let version = *counter;
            self.current.insert(name.to_string(), version);
            self.writes_v.insert(name.to_string(), version);
            version
        } else {
            self.emitted_writes.insert(name.to_string());
            self.writes_v.get(name).copied().unwrap_or(0)
        }
    }

    fn emit_statement(&mut self, kind: StatementKind, node: &Stmt) {
        match kind {
            StatementKind::Assignment => {
                if let Stmt::Expression {
                    expr: Expr::Assignment { lhs, op, rhs },
                    ..
                } = node
                {
                    self.emit_assignment(lhs, op, rhs);
                }
            }
            StatementKind::VariableDeclaration => {
                if let Stmt::VarDecl { names, init, .. } = node {
                    self.emit_declaration(names, init.as_ref());
                }
            }
            StatementKind::IfStatement => {
                if let Stmt::If { condition, .. } = node {
                    let line = format!("if ({})", self.versioned_condition(condition));
                    self.out.push(line);
                }
            }
            StatementKind::Revert => {
                if let Stmt::Expression { expr, .. } = node {
                    self.emit_revert(expr);
                }
            }
            StatementKind::FunctionCall => {
                if let Stmt::Expression {
                    expr: Expr::Call { callee, args, .. },
                    ..
                } = node
                {
                    self.emit_call(callee, args);
                }
            }
            StatementKind::EmitStatement => {
                if let Stmt::Emit {
                    call: Expr::Call { callee, args, .. },
                    ..
                } = node
                {
                    self.emit_event(callee, args);
                }
            }
            StatementKind::Return => {
                if let Stmt::Return { expr, .. } = node {
                    self.emit_return(expr.as_ref());
                }
            }
            StatementKind::Expression => {
                if let Stmt::Expression { expr, .. } = node {
                    self.emit_expression(expr);
                }
            }
            StatementKind::ForLoop
            | StatementKind::WhileLoop
            | StatementKind::Block
            | StatementKind::Unknown => {}
        }
    }

    fn emit_assignment(&mut self, lhs: &Expr, op: &str, rhs: &Expr) {
        let Some(target) = structured_name(lhs) else {
            return;
        };
        let version = self.write_version(&target);

        let mut stmt = format!("{target}_{version} = ");
        if op != "=" {
            let prev = version.saturating_sub(1);
            let operation = op.chars().next().unwrap_or('+');
            stmt.push_str(&format!("{target}_{prev} {operation} "));
        }
        stmt.push_str(&self.rhs_text(rhs, op));
        self.out.push(stmt);
    }

    fn emit_declaration(&mut self, names: &[String], init: Option<&Expr>) {
        let init_text = match init {
            Some(Expr::Literal { value, is_string }) => literal_text(value, *is_string),
            Some(expr) => self.rhs_text(expr, "="),
            None => String::new(),
        };
        for name in names {
            let version = self.write_version(name);
            self.out.push(format!("{name}_{version} = {init_text}").trim_end().to_string());
        }
    }

    fn emit_expression(&mut self, expr: &Expr) {
        // Unary increments become explicit arithmetic; bare expressions
        // (loop-header conditions) emit nothing — their text lives in the
        // block terminator.
        if let Expr::Unary { op, sub, .. } = expr {
            if op == "++" || op == "--" {
                if let Some(name) = structured_name(sub) {
                    let read = self.read_version(&name);
                    let write = self.write_version(&name);
                    let operation = if op == "++" { '+' } else { '-' };
                    self.out
                        .push(format!("{name}_{write} = {name}_{read} {operation} 1"));
                }
            }
        }
    }

    fn emit_call(&mut self, callee: &Expr, args: &[Expr]) {
        let classified = classify_call(callee, self.contract_functions);
        if classified.kind == CallKind::Revert {
            self.emit_revert_parts(&classified.name, args);
            return;
        }

        let counter = self.counters.entry("ret".into()).or_insert(0);
        *counter += 1;
        let ret_version = *counter;
        self.writes_v.insert("ret".into(), ret_version);
        self.current.insert("ret".into(), ret_version);

        let rendered_args: Vec<String> = args.iter().map(|arg| self.argument_text(arg)).collect();
        let kind = classified.kind;
        let name = classified.name;
        let stmt = if rendered_args.is_empty() {
            format!("ret_{ret_version} = call[{kind}]({name})")
        } else {
            format!("ret_{ret_version} = call[{kind}]({name}, {})", rendered_args.join(", "))
        };
        self.out.push(stmt);
    }

    fn emit_event(&mut self, callee: &Expr, args: &[Expr]) {
        let event_name = match callee {
            Expr::Identifier { name, .. } => name.clone(),
            other => other.render(),
        };
        let rendered: Vec<String> = args.iter().map(|arg| self.argument_text(arg)).collect();
        self.out.push(format!("emit {event_name}({})", rendered.join(", ")));
    }

    fn emit_return(&mut self, expr: Option<&Expr>) {
        let Some(expr) = expr else {
            self.out.push("return".into());
            return;
        };
        match expr {
            Expr::Literal { value, is_string } => {
                self.out.push(format!("return {}", literal_text(value, *is_string)));
            }
            other => {
                let mut reads = BTreeSet::new();
                extract_reads(other, &mut reads);
                let rendered: Vec<String> = reads
                    .iter()
                    .map(|r| format!("{r}_{}", self.read_version(r)))
                    .collect();
                self.out.push(format!("return {}", rendered.join(" ")).trim_end().to_string());
            }
        }
    }

    fn emit_revert(&mut self, expr: &Expr) {
        let Expr::Call { callee, args, .. } = expr else {
            self.out.push("revert".into());
            return;
        };
        let name = match callee.peel_options() {
            Expr::Identifier { name, .. } if REVERT_BUILTINS.contains(&name.as_str()) => {
                name.clone()
            }
            _ => "revert".into(),
        };
        self.emit_revert_parts(&name, args);
    }

    fn emit_revert_parts(&mut self, builtin: &str, args: &[Expr]) {
        let rendered: Vec<String> = args.iter().map(|arg| self.argument_text(arg)).collect();
        if rendered.is_empty() {
            self.out.push(builtin.to_string());
        } else {
            self.out.push(format!("{builtin} {}", rendered.join(", ")));
        }
    }

    /// One call/emit/revert argument, versioned.
    fn argument_text(&self, arg: &Expr) -> String {
        match arg {
            Expr::Literal { value, is_string } => literal_text(value, *is_string),
            Expr::Binary { left, op, right } => format!(
                "{} {op} {}",
                self.argument_text(left),
                self.argument_text(right)
            ),
            Expr::Call { callee, .. } if matches!(callee.as_ref(), Expr::ElementaryType { .. }) => {
                // Type conversions like address(0) appear as opaque version-0 names.
                format!("{}_0", arg.render())
            }
            other => {
                if let Some(name) = structured_name(other) {
                    format!("{name}_{}", self.read_version(&name))
                } else {
                    let mut reads = BTreeSet::new();
                    extract_reads(other, &mut reads);
                    reads
                        .iter()
                        .map(|r| format!("{r}_{}", self.read_version(r)))
                        .collect::<Vec<_>>()
                        .join(" ")
                }
            }
        }
    }

    /// Versioned rendering of an assignment RHS. Compound assignments prefer
    /// a small parameter-like witness over the full over-approximated read
    /// set; everything else lists all reads deterministically.
    fn rhs_text(&self, rhs: &Expr, op: &str) -> String {
        if let Expr::Literal { value, is_string } = rhs {
            return literal_text(value, *is_string);
        }

        let mut reads = BTreeSet::new();
        extract_reads(rhs, &mut reads);

        if matches!(op, "+=" | "-=" | "*=" | "/=") {
            let mut selected: Vec<&str> = Vec::new();
            for name in WITNESS_PRIMARY {
                if reads.contains(name) {
                    selected.push(name);
                    break;
                }
            }
            if selected.is_empty() {
                for name in WITNESS_SECONDARY {
                    if reads.contains(name) {
                        selected.push(name);
                    }
                }
            }
            if !selected.is_empty() {
                return selected
                    .iter()
                    .map(|name| format!("{name}_{}", self.read_version(name)))
                    .collect::<Vec<_>>()
                    .join(" ");
            }
        }

        reads
            .iter()
            .map(|name| format!("{name}_{}", self.read_version(name)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Versioned text for an `if` condition: the left-hand variable when the
    /// condition has one, otherwise every read.
    fn versioned_condition(&self, condition: &Expr) -> String {
        if let Expr::Binary { left, .. } = condition {
            if let Some(name) = structured_name(left) {
                if self.reads_v.contains_key(&name) {
                    return format!("{name}_{}", self.read_version(&name));
                }
            }
        }
        let mut reads = BTreeSet::new();
        extract_reads(condition, &mut reads);
        reads
            .iter()
            .map(|name| format!("{name}_{}", self.read_version(name)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn literal_text(value: &str, is_string: bool) -> String {
    if is_string {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

// ── versioned-token utilities ────────────────────────────────────────────────

/// Split `name_3` into (`name`, 3). Returns `None` when the token carries no
/// numeric version suffix.
pub fn split_versioned(token: &str) -> Option<(&str, u32)> {
    let idx = token.rfind('_')?;
    let (base, suffix) = token.split_at(idx);
    let digits = &suffix[1..];
    if base.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((base, digits.parse().ok()?))
}

/// The SSA write target of a statement, if it has one.
pub fn write_target(ssa_statement: &str) -> Option<(&str, u32)> {
    let lhs = ssa_statement.split(" = ").next()?;
    if lhs == ssa_statement {
        return None;
    }
    split_versioned(lhs.trim())
}

/// Base variable of a structured name: `balances[msg.sender]` → `balances`,
/// `msg.sender` → `msg`.
pub fn root_name(structured: &str) -> &str {
    let bracket = structured.find('[').unwrap_or(structured.len());
    let dot = structured.find('.').unwrap_or(structured.len());
    &structured[..bracket.min(dot)]
}

/// Rewrite every versioned token via `f`; tokens `f` returns `None` for are
/// left untouched. Token boundaries are spaces, commas and the last opening
/// parenthesis, so structured names survive intact.
pub fn rewrite_versions(statement: &str, f: &mut dyn FnMut(&str, u32) -> Option<u32>) -> String {
    let mut out = String::with_capacity(statement.len());
    let mut token = String::new();
    for ch in statement.chars() {
        if ch == ' ' || ch == ',' {
            rewrite_token(&mut out, &token, f);
            token.clear();
            out.push(ch);
        } else {
            token.push(ch);
        }
    }
    rewrite_token(&mut out, &token, f);
    out
}

fn rewrite_token(out: &mut String, token: &str, f: &mut dyn FnMut(&str, u32) -> Option<u32>) {
    if token.is_empty() {
        return;
    }
    let (prefix, rest) = match token.rfind('(') {
        Some(i) => token.split_at(i + 1),
        None => ("", token),
    };
    let trailing = rest.chars().rev().take_while(|c| *c == ')').count();
    let (core, suffix) = rest.split_at(rest.len() - trailing);

    if let Some((base, version)) = split_versioned(core) {
        if let Some(new_version) = f(base, version) {
            out.push_str(prefix);
            out.push_str(base);
            out.push('_');
            out.push_str(&new_version.to_string());
            out.push_str(suffix);
            return;
        }
    }
    out.push_str(token);
}

// ── cleanup ──────────────────────────────────────────────────────────────────

/// Remove per-base duplicates from compound arithmetic introduced by
/// over-approximated reads or parameter substitution.
pub fn cleanup_statements(blocks: &mut [BasicBlock]) {
    for block in blocks {
        for stmt in &mut block.ssa_statements {
            let Some((lhs, rhs)) = stmt.split_once(" = ") else {
                continue;
            };
            if rhs.contains(" + ") {
                let terms: Vec<&str> = rhs.split(" + ").map(str::trim).collect();
                let deduped = dedup_by_base(&terms);
                if deduped.len() != terms.len() {
                    *stmt = format!("{lhs} = {}", deduped.join(" + "));
                }
            } else if let Some((first, rest)) = rhs.split_once(" - ") {
                let terms: Vec<&str> = rest.split_whitespace().collect();
                let deduped = dedup_by_base(&terms);
                if deduped.len() != terms.len() {
                    *stmt = format!("{lhs} = {first} - {}", deduped.join(" "));
                }
            }
        }
    }
}

fn dedup_by_base<'a>(terms: &[&'a str]) -> Vec<&'a str> {
    let mut seen = BTreeSet::new();
    let mut kept = Vec::new();
    for term in terms {
        match split_versioned(term) {
            Some((base, _)) => {
                if seen.insert(base.to_string()) {
                    kept.push(*term);
                }
            }
            None => kept.push(*term),
        }
    }
    kept
}

// ── validation ───────────────────────────────────────────────────────────────

/// The SSA property: each (variable, version) pair is defined at most once
/// per function. φ-functions count as definitions.
pub fn validate_ssa(function_name: &str, blocks: &[BasicBlock]) -> Result<(), AnalyzerError> {
    let mut defined: BTreeSet<(String, u32)> = BTreeSet::new();
    for block in blocks {
        for stmt in &block.ssa_statements {
            let Some((base, version)) = write_target(stmt) else {
                continue;
            };
            if !defined.insert((base.to_string(), version)) {
                return Err(AnalyzerError::InternalInvariant(format!(
                    "{function_name}: duplicate SSA definition {base}_{version}"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::accesses::track_accesses;
    use crate::analysis::blocks::split_into_blocks;
    use crate::analysis::statements::classify_statements;
    use crate::loader::solc_ast::parse_statement;
    use serde_json::json;

    fn pipeline(statements: serde_json::Value) -> Vec<BasicBlock> {
        let stmts: Vec<Stmt> = statements
            .as_array()
            .unwrap()
            .iter()
            .map(parse_statement)
            .collect();
        let mut blocks = split_into_blocks(classify_statements(&stmts));
        track_accesses(&mut blocks);
        assign_versions(&mut blocks, &BTreeSet::new());
        blocks
    }

    fn assign(lhs: serde_json::Value, op: &str, rhs: serde_json::Value) -> serde_json::Value {
        json!({
            "nodeType": "ExpressionStatement",
            "expression": {
                "nodeType": "Assignment", "operator": op,
                "leftHandSide": lhs, "rightHandSide": rhs
            }
        })
    }

    fn ident(name: &str) -> serde_json::Value {
        json!({ "nodeType": "Identifier", "name": name })
    }

    #[test]
    fn versions_increase_across_blocks() {
        let blocks = pipeline(json!([
            assign(ident("x"), "=", json!({ "nodeType": "Literal", "value": "1" })),
            assign(ident("x"), "=", json!({ "nodeType": "Literal", "value": "2" })),
        ]));
        assert_eq!(blocks[0].ssa_statements, vec!["x_1 = 1"]);
        assert_eq!(blocks[1].ssa_statements, vec!["x_2 = 2"]);
    }

    #[test]
    fn compound_assignment_clamps_and_uses_witness() {
        let blocks = pipeline(json!([assign(
            json!({
                "nodeType": "IndexAccess",
                "baseExpression": ident("balances"),
                "indexExpression": ident("to")
            }),
            "+=",
            ident("amount")
        )]));
        assert_eq!(
            blocks[0].ssa_statements,
            vec!["balances[to]_1 = balances[to]_0 + amount_0"]
        );
    }

    #[test]
    fn declaration_reads_are_versioned() {
        let blocks = pipeline(json!([{
            "nodeType": "VariableDeclarationStatement",
            "declarations": [ { "nodeType": "VariableDeclaration", "name": "bal" } ],
            "initialValue": {
                "nodeType": "IndexAccess",
                "baseExpression": ident("balances"),
                "indexExpression": {
                    "nodeType": "MemberAccess",
                    "memberName": "sender",
                    "expression": ident("msg")
                }
            }
        }]));
        assert_eq!(
            blocks[0].ssa_statements,
            vec!["bal_1 = balances_0 balances[msg.sender]_0 msg.sender_0"]
        );
    }

    #[test]
    fn unary_increment_emits_arithmetic() {
        let blocks = pipeline(json!([{
            "nodeType": "ExpressionStatement",
            "expression": {
                "nodeType": "UnaryOperation",
                "operator": "++",
                "subExpression": ident("number")
            }
        }]));
        assert_eq!(blocks[0].ssa_statements, vec!["number_1 = number_0 + 1"]);
    }

    #[test]
    fn low_level_call_emits_external_kind_with_ret() {
        let blocks = pipeline(json!([{
            "nodeType": "ExpressionStatement",
            "expression": {
                "nodeType": "FunctionCall",
                "expression": {
                    "nodeType": "FunctionCallOptions",
                    "expression": {
                        "nodeType": "MemberAccess",
                        "memberName": "call",
                        "expression": {
                            "nodeType": "MemberAccess",
                            "memberName": "sender",
                            "expression": ident("msg")
                        }
                    }
                },
                "arguments": [ { "nodeType": "Literal", "kind": "string", "value": "" } ]
            }
        }]));
        assert_eq!(
            blocks[0].ssa_statements,
            vec!["ret_1 = call[low_level_external](msg.sender.call, \"\")"]
        );
    }

    #[test]
    fn revert_is_not_a_call() {
        let blocks = pipeline(json!([{
            "nodeType": "ExpressionStatement",
            "expression": {
                "nodeType": "FunctionCall",
                "expression": ident("revert"),
                "arguments": [ { "nodeType": "Literal", "kind": "string", "value": "nope" } ]
            }
        }]));
        assert_eq!(blocks[0].ssa_statements, vec!["revert \"nope\""]);
    }

    #[test]
    fn emit_renders_event_arguments() {
        let blocks = pipeline(json!([{
            "nodeType": "EmitStatement",
            "eventCall": {
                "nodeType": "FunctionCall",
                "expression": ident("Transfer"),
                "arguments": [
                    {
                        "nodeType": "FunctionCall",
                        "expression": {
                            "nodeType": "ElementaryTypeNameExpression",
                            "typeName": { "name": "address" }
                        },
                        "arguments": [ { "nodeType": "Literal", "value": "0" } ]
                    },
                    ident("to"),
                    ident("amount")
                ]
            }
        }]));
        assert_eq!(
            blocks[0].ssa_statements,
            vec!["emit Transfer(address(0)_0, to_0, amount_0)"]
        );
    }

    #[test]
    fn second_write_in_one_block_takes_a_fresh_version() {
        // Both writes share a block only when nothing splits them; emission
        // still may not define the same (name, version) twice.
        let mut block = BasicBlock::new("Block0");
        let stmts: Vec<Stmt> = vec![
            parse_statement(&assign(ident("x"), "=", json!({ "nodeType": "Literal", "value": "1" }))),
            parse_statement(&assign(ident("x"), "=", json!({ "nodeType": "Literal", "value": "2" }))),
        ];
        block.statements = classify_statements(&stmts);
        let mut blocks = vec![block];
        track_accesses(&mut blocks);
        assign_versions(&mut blocks, &BTreeSet::new());
        assert_eq!(blocks[0].ssa_statements, vec!["x_1 = 1", "x_2 = 2"]);
        assert!(validate_ssa("f", &blocks).is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_definitions() {
        let mut block = BasicBlock::new("Block0");
        block.ssa_statements = vec!["x_1 = 0".into(), "x_1 = 1".into()];
        assert!(validate_ssa("f", &[block]).is_err());
    }

    #[test]
    fn token_rewriting_preserves_structured_names() {
        let stmt = "balances[msg.sender]_1 = balances[msg.sender]_0 - amount_0";
        let rewritten = rewrite_versions(stmt, &mut |base, v| {
            (base == "balances[msg.sender]" && v == 0).then_some(3)
        });
        assert_eq!(rewritten, "balances[msg.sender]_1 = balances[msg.sender]_3 - amount_0");
    }

    #[test]
    fn token_rewriting_reaches_call_arguments() {
        let stmt = "ret_1 = call[internal](_transfer, to_0, amount_0)";
        let rewritten = rewrite_versions(stmt, &mut |base, _| (base == "amount").then_some(2));
        assert_eq!(rewritten, "ret_1 = call[internal](_transfer, to_0, amount_2)");
    }

    #[test]
    fn cleanup_dedups_compound_terms() {
        let mut block = BasicBlock::new("Block0");
        block.ssa_statements = vec!["x_1 = x_0 + amount_0 + amount_1".into()];
        cleanup_statements(std::slice::from_mut(&mut block));
        assert_eq!(block.ssa_statements, vec!["x_1 = x_0 + amount_0"]);

        block.ssa_statements = vec!["b[from]_1 = b[from]_0 - amount_0 amount_1".into()];
        cleanup_statements(std::slice::from_mut(&mut block));
        assert_eq!(block.ssa_statements, vec!["b[from]_1 = b[from]_0 - amount_0"]);
    }

    #[test]
    fn write_target_and_root_name() {
        assert_eq!(
            write_target("balances[msg.sender]_2 = 0"),
            Some(("balances[msg.sender]", 2))
        );
        assert_eq!(write_target("return x_0"), None);
        assert_eq!(root_name("balances[msg.sender]"), "balances");
        assert_eq!(root_name("allowance[owner][spender]"), "allowance");
        assert_eq!(root_name("msg.sender"), "msg");
        assert_eq!(root_name("totalSupply"), "totalSupply");
    }
}
