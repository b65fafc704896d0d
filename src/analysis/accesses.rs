//! Tracks variable reads and writes per block, including structured names
//! for member and index accesses.
//!
//! A write to `allowance[owner][spender]` records every level — `allowance`,
//! `allowance[owner]`, `allowance[owner][spender]` — so coarse queries on the
//! base name and exact-match SSA versioning both work off the same sets.

use std::collections::BTreeSet;

use crate::ir::block::{BasicBlock, StatementKind};
use crate::loader::solc_ast::{Expr, Stmt};

/// Canonical textual name for an lvalue-ish expression, if it has one.
pub fn structured_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier { name, .. } if !name.is_empty() => Some(name.clone()),
        Expr::Member { base, member } => match base.as_ref() {
            Expr::Identifier { name, .. } if !name.is_empty() && !member.is_empty() => {
                Some(format!("{name}.{member}"))
            }
            _ => None,
        },
        Expr::Index { base, index } => {
            let base_name = structured_name(base)?;
            let key = index_key(index)?;
            Some(format!("{base_name}[{key}]"))
        }
        _ => None,
    }
}

/// How an index expression appears inside a structured name.
fn index_key(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Literal { value, .. } if !value.is_empty() => Some(value.clone()),
        Expr::Identifier { name, .. } if !name.is_empty() => Some(name.clone()),
        Expr::Member { base, member } => match base.as_ref() {
            Expr::Identifier { name, .. } if !name.is_empty() && !member.is_empty() => {
                Some(format!("{name}.{member}"))
            }
            _ => None,
        },
        _ => None,
    }
}

/// Every structured level of an index write: `a[i][j]` → `a`, `a[i]`, `a[i][j]`.
pub fn index_write_levels(expr: &Expr) -> Vec<String> {
    let mut levels = Vec::new();
    fn walk(expr: &Expr, levels: &mut Vec<String>) -> Option<String> {
        match expr {
            Expr::Index { base, index } => {
                let base_name = walk(base, levels)?;
                let key = index_key(index)?;
                let name = format!("{base_name}[{key}]");
                levels.push(name.clone());
                Some(name)
            }
            other => {
                let name = structured_name(other)?;
                levels.push(name.clone());
                Some(name)
            }
        }
    }
    walk(expr, &mut levels);
    levels
}

/// Recursively collect the names an expression reads.
pub fn extract_reads(expr: &Expr, reads: &mut BTreeSet<String>) {
    match expr {
        Expr::Identifier { name, .. } => {
            if !name.is_empty() {
                reads.insert(name.clone());
            }
        }
        Expr::Binary { left, right, .. } => {
            extract_reads(left, reads);
            extract_reads(right, reads);
        }
        Expr::Member { base, member } => {
            if let Expr::Identifier { name, .. } = base.as_ref() {
                if !name.is_empty() {
                    reads.insert(name.clone());
                    if !member.is_empty() {
                        reads.insert(format!("{name}.{member}"));
                    }
                }
            } else {
                extract_reads(base, reads);
            }
        }
        Expr::Index { base, index } => {
            for level in index_write_levels(expr) {
                reads.insert(level);
            }
            // Root base name even when a level fails to canonicalize.
            let mut root = base.as_ref();
            while let Expr::Index { base, .. } = root {
                root = base.as_ref();
            }
            extract_reads(root, reads);
            extract_reads(index, reads);
            if let Expr::Index { index: inner, .. } = base.as_ref() {
                extract_reads(inner, reads);
            }
        }
        Expr::Call { callee, args, .. } => {
            for arg in args {
                extract_reads(arg, reads);
            }
            if let Expr::Member { base, .. } = callee.peel_options() {
                extract_reads(base, reads);
            }
        }
        Expr::CallOptions { base } => extract_reads(base, reads),
        Expr::Unary { sub, .. } => extract_reads(sub, reads),
        Expr::Tuple { components } => {
            for component in components.iter().flatten() {
                extract_reads(component, reads);
            }
        }
        Expr::Assignment { .. }
        | Expr::Literal { .. }
        | Expr::ElementaryType { .. }
        | Expr::Unknown { .. } => {}
    }
}

/// Names containing call syntax are artifacts, never variables.
pub fn is_real_variable(name: &str) -> bool {
    !name.is_empty() && !name.contains("call[") && !name.contains("call(") && !name.contains(')')
}

/// Compute and attach the access sets of every block.
pub fn track_accesses(blocks: &mut [BasicBlock]) {
    for block in blocks {
        let mut reads = BTreeSet::new();
        let mut writes = BTreeSet::new();

        for statement in &block.statements {
            record_statement(statement.kind, &statement.node, &mut reads, &mut writes);
        }

        block.accesses.reads = reads.into_iter().filter(|n| is_real_variable(n)).collect();
        block.accesses.writes = writes.into_iter().filter(|n| is_real_variable(n)).collect();
    }
}

fn record_statement(
    kind: StatementKind,
    node: &Stmt,
    reads: &mut BTreeSet<String>,
    writes: &mut BTreeSet<String>,
) {
    match kind {
        StatementKind::Assignment => {
            if let Stmt::Expression {
                expr: Expr::Assignment { lhs, op, rhs },
                ..
            } = node
            {
                record_assignment(lhs, op, rhs, reads, writes);
            }
        }
        StatementKind::FunctionCall | StatementKind::Revert => {
            if let Stmt::Expression { expr, .. } = node {
                // Arguments and any receiver are reads.
                extract_reads(expr, reads);
            }
        }
        StatementKind::EmitStatement => {
            if let Stmt::Emit { call, .. } = node {
                if let Expr::Call { args, .. } = call {
                    for arg in args {
                        extract_reads(arg, reads);
                    }
                }
            }
        }
        StatementKind::IfStatement => {
            if let Stmt::If { condition, .. } = node {
                extract_reads(condition, reads);
            }
        }
        StatementKind::Return => {
            if let Stmt::Return { expr: Some(expr), .. } = node {
                extract_reads(expr, reads);
            }
        }
        StatementKind::VariableDeclaration => {
            if let Stmt::VarDecl { names, init, .. } = node {
                for name in names {
                    writes.insert(name.clone());
                }
                if let Some(init) = init {
                    extract_reads(init, reads);
                }
            }
        }
        StatementKind::Expression => {
            if let Stmt::Expression { expr, .. } = node {
                record_expression(expr, reads, writes);
            }
        }
        StatementKind::ForLoop => {
            if let Stmt::For {
                init,
                condition,
                update,
                body,
                ..
            } = node
            {
                if let Some(init) = init {
                    record_statement(
                        crate::analysis::statements::classify(init),
                        init,
                        reads,
                        writes,
                    );
                }
                if let Some(condition) = condition {
                    extract_reads(condition, reads);
                }
                if let Some(update) = update {
                    if let Stmt::Expression { expr, .. } = update.as_ref() {
                        record_expression(expr, reads, writes);
                    }
                }
                for stmt in body {
                    if let Stmt::Expression { expr, .. } = stmt {
                        record_expression(expr, reads, writes);
                    }
                }
            }
        }
        StatementKind::WhileLoop => {
            if let Stmt::While { condition, .. } = node {
                extract_reads(condition, reads);
            }
        }
        StatementKind::Block | StatementKind::Unknown => {}
    }
}

/// Expression statements: unary increments write their operand; anything
/// else (loop-header conditions in particular) only reads.
fn record_expression(expr: &Expr, reads: &mut BTreeSet<String>, writes: &mut BTreeSet<String>) {
    match expr {
        Expr::Unary { op, sub, .. } if op == "++" || op == "--" => {
            if let Some(name) = structured_name(sub) {
                reads.insert(name.clone());
                writes.insert(name);
                if let Expr::Index { .. } = sub.as_ref() {
                    for level in index_write_levels(sub) {
                        writes.insert(level);
                    }
                }
            }
        }
        Expr::Assignment { lhs, op, rhs } => record_assignment(lhs, op, rhs, reads, writes),
        other => extract_reads(other, reads),
    }
}

fn record_assignment(
    lhs: &Expr,
    op: &str,
    rhs: &Expr,
    reads: &mut BTreeSet<String>,
    writes: &mut BTreeSet<String>,
) {
    match lhs {
        Expr::Identifier { name, .. } => {
            if !name.is_empty() {
                writes.insert(name.clone());
            }
        }
        Expr::Member { base, member } => {
            if let Expr::Identifier { name, .. } = base.as_ref() {
                if !name.is_empty() {
                    writes.insert(name.clone());
                    if !member.is_empty() {
                        writes.insert(format!("{name}.{member}"));
                    }
                }
            }
        }
        Expr::Index { index, .. } => {
            for level in index_write_levels(lhs) {
                writes.insert(level);
            }
            extract_reads(index, reads);
            // Keys of inner levels are reads too.
            let mut inner = lhs;
            while let Expr::Index { base, index } = inner {
                extract_reads(index, reads);
                inner = base.as_ref();
            }
        }
        Expr::Tuple { components } => {
            for component in components.iter().flatten() {
                if let Some(name) = structured_name(component) {
                    writes.insert(name);
                }
            }
        }
        _ => {}
    }

    // Compound assignments read their target as well.
    if op != "=" {
        if let Some(name) = structured_name(lhs) {
            reads.insert(name);
        }
        if let Expr::Index { .. } = lhs {
            for level in index_write_levels(lhs) {
                reads.insert(level);
            }
        }
    }

    extract_reads(rhs, reads);
}
