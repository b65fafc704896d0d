//! Internal-call inlining.
//!
//! `ret_k = call[internal](f, …)` statements are kept for traceability and
//! immediately followed by a renamed copy of `f`'s SSA effects: formal
//! parameters are bound to the actual arguments, and every other versioned
//! name is remapped into the caller's numbering — writes allocate a fresh
//! version above the caller's maximum for that name, reads thread the
//! caller's latest version.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::accesses::is_real_variable;
use crate::analysis::calls::callee_of_ssa;
use crate::analysis::ssa::{root_name, split_versioned, write_target};
use crate::ir::block::{BasicBlock, Terminator};
use crate::ir::function::CallKind;

/// A callee's pre-inline SSA, as built by the per-function pipeline.
#[derive(Debug, Clone)]
pub struct CalleeSsa {
    pub params: Vec<String>,
    pub blocks: Vec<BasicBlock>,
}

pub fn inline_internal_calls(blocks: &mut [BasicBlock], callees: &BTreeMap<String, CalleeSsa>) {
    if callees.is_empty() {
        return;
    }

    // Caller-wide version ceiling per variable, seeded from every block so
    // fresh versions can never collide with writes later in the function.
    let mut caller_versions: BTreeMap<String, u32> = BTreeMap::new();
    for block in blocks.iter() {
        for (var, v) in block.ssa_versions.reads.iter().chain(&block.ssa_versions.writes) {
            let entry = caller_versions.entry(var.clone()).or_insert(0);
            *entry = (*entry).max(*v);
        }
    }

    for block in blocks.iter_mut() {
        let statements = std::mem::take(&mut block.ssa_statements);
        let mut expanded: Vec<String> = Vec::new();
        let mut added_reads: BTreeSet<String> = BTreeSet::new();
        let mut added_writes: BTreeSet<String> = BTreeSet::new();

        for stmt in statements {
            let is_internal = CallKind::scan(&stmt) == Some(CallKind::Internal);
            if !is_internal {
                expanded.push(stmt);
                continue;
            }

            let Some(name) = callee_of_ssa(&stmt).map(str::to_string) else {
                expanded.push(stmt);
                continue;
            };
            let args = call_arguments(&stmt);

            // The original call stays in the IR.
            expanded.push(stmt);

            let Some(callee) = callees.get(&name) else {
                continue;
            };

            let binding = bind_parameters(&callee.params, &args);

            for callee_block in &callee.blocks {
                for callee_stmt in &callee_block.ssa_statements {
                    // φ-functions belong to the callee's CFG and do not
                    // survive statement-level inlining.
                    if callee_stmt.contains("= phi(") {
                        continue;
                    }

                    let bound = substitute_params(callee_stmt, &binding);
                    let remapped = remap_versions(
                        &bound,
                        &mut caller_versions,
                        &mut added_reads,
                        &mut added_writes,
                    );
                    expanded.push(remapped);
                }
            }
        }

        block.ssa_statements = expanded;
        block
            .accesses
            .reads
            .extend(added_reads.into_iter().filter(|n| is_real_variable(n)));
        block
            .accesses
            .writes
            .extend(added_writes.into_iter().filter(|n| is_real_variable(n)));
    }
}

/// Arguments of a `call[...](name, a, b)` statement, as raw tokens.
fn call_arguments(stmt: &str) -> Vec<String> {
    let Some(rest) = stmt.split("](").nth(1) else {
        return Vec::new();
    };
    let inner = rest.strip_suffix(')').unwrap_or(rest);
    inner
        .split(',')
        .skip(1)
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}

/// Formal parameter → (argument base, argument version), for versioned
/// arguments only; literals have nothing to substitute.
fn bind_parameters(params: &[String], args: &[String]) -> BTreeMap<String, (String, u32)> {
    let mut binding = BTreeMap::new();
    for (param, arg) in params.iter().zip(args) {
        if param.is_empty() {
            continue;
        }
        if let Some((base, version)) = split_versioned(arg) {
            binding.insert(param.clone(), (base.to_string(), version));
        }
    }
    binding
}

/// Replace parameter references with their bound arguments. Inside compound
/// arithmetic a second substitution of the same argument within one
/// statement is suppressed, so two parameters bound to the same actual do
/// not leave `balances[to] += amount amount` behind.
fn substitute_params(stmt: &str, binding: &BTreeMap<String, (String, u32)>) -> String {
    if binding.is_empty() {
        return stmt.to_string();
    }
    let compound = stmt.contains(" + ") || stmt.contains(" - ");
    let mut seen_args: BTreeSet<String> = BTreeSet::new();

    let mut out: Vec<String> = Vec::new();
    for word in stmt.split(' ') {
        let (prefix, rest) = match word.rfind('(') {
            Some(i) => word.split_at(i + 1),
            None => ("", word),
        };
        let trailing = rest.len()
            - rest
                .chars()
                .rev()
                .take_while(|c| *c == ')' || *c == ',')
                .count();
        let (core, suffix) = rest.split_at(trailing);

        if let Some((base, _)) = split_versioned(core) {
            if let Some((arg_base, arg_version)) = binding.get(base) {
                if compound && !seen_args.insert(arg_base.clone()) {
                    // Duplicate operand — drop the token entirely.
                    continue;
                }
                out.push(format!("{prefix}{arg_base}_{arg_version}{suffix}"));
                continue;
            }
        }
        out.push(word.to_string());
    }
    out.join(" ")
}

/// Remap every remaining versioned name into the caller's numbering.
fn remap_versions(
    stmt: &str,
    caller_versions: &mut BTreeMap<String, u32>,
    added_reads: &mut BTreeSet<String>,
    added_writes: &mut BTreeSet<String>,
) -> String {
    let written: Option<String> = write_target(stmt).map(|(base, _)| base.to_string());

    let mut fresh_write: Option<(String, u32)> = None;
    if let Some(var) = &written {
        let current = caller_versions.get(var).copied().unwrap_or(0);
        fresh_write = Some((var.clone(), current + 1));
        added_writes.insert(var.clone());
        added_writes.insert(root_name(var).to_string());
    }

    let mut first_lhs = true;
    let rewritten = crate::analysis::ssa::rewrite_versions(stmt, &mut |base, v| {
        if let Some((write_var, new_version)) = &fresh_write {
            if base == write_var {
                if first_lhs {
                    // The defining occurrence gets the fresh version…
                    first_lhs = false;
                    return Some(*new_version);
                }
                // …and RHS occurrences read the caller's current version.
                return Some(new_version.saturating_sub(1).max(
                    caller_versions.get(base).copied().unwrap_or(0),
                ));
            }
        }
        if Some(base) != written.as_deref() {
            if let Some(current) = caller_versions.get(base) {
                added_reads.insert(base.to_string());
                return Some(*current);
            }
            added_reads.insert(base.to_string());
        }
        let _ = v;
        None
    });

    if let Some((var, new_version)) = fresh_write {
        caller_versions.insert(var, new_version);
    }
    rewritten
}

// ── post-inline re-splitting ─────────────────────────────────────────────────

/// After inlining, a block may hold several compound state mutations
/// (mint/burn shapes like `balances[to] += amount; totalSupply += amount`).
/// Each mutation ends a block so downstream ordering stays per-block.
pub fn resplit_compound_blocks(blocks: Vec<BasicBlock>) -> Vec<BasicBlock> {
    let mut counter = next_block_number(&blocks);
    let mut out: Vec<BasicBlock> = Vec::new();

    for block in blocks {
        let compound_count = block
            .ssa_statements
            .iter()
            .filter(|s| is_compound_mutation(s))
            .count();
        if compound_count < 2 {
            out.push(block);
            continue;
        }

        // Partition statements so every compound mutation ends a segment.
        let mut segments: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        for stmt in &block.ssa_statements {
            let compound = is_compound_mutation(stmt);
            current.push(stmt.clone());
            if compound {
                segments.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }

        let terminator = block.terminator.clone();
        let original_id = block.id.clone();
        let total = segments.len();

        for (i, segment) in segments.into_iter().enumerate() {
            let id = if i == 0 {
                original_id.clone()
            } else {
                let id = format!("Block{counter}");
                counter += 1;
                id
            };
            let mut piece = BasicBlock::new(id);
            if i == 0 {
                piece.statements = block.statements.clone();
                piece.is_loop_init = block.is_loop_init;
                piece.is_loop_header = block.is_loop_header;
                piece.is_loop_body = block.is_loop_body;
                piece.is_loop_increment = block.is_loop_increment;
                piece.is_loop_exit = block.is_loop_exit;
                piece.external_call_effects = block.external_call_effects.clone();
            }
            recompute_from_ssa(&mut piece, segment);
            out.push(piece);
        }

        // Chain the pieces, the last one keeping the original terminator.
        let first_new = out.len() - total;
        for i in first_new..out.len() - 1 {
            let next_id = out[i + 1].id.clone();
            out[i].terminator = Some(Terminator::Goto(next_id));
        }
        if let Some(last) = out.last_mut() {
            last.terminator = terminator;
        }
    }

    out
}

fn next_block_number(blocks: &[BasicBlock]) -> usize {
    blocks
        .iter()
        .filter_map(|b| b.id.strip_prefix("Block"))
        .filter_map(|n| n.parse::<usize>().ok())
        .max()
        .map(|n| n + 1)
        .unwrap_or(0)
}

fn is_compound_mutation(stmt: &str) -> bool {
    stmt.contains(" = ")
        && !stmt.contains("= phi(")
        && !stmt.contains("call[")
        && (stmt.contains(" + ") || stmt.contains(" - "))
}

/// Rebuild a re-split block's accesses and version maps from its SSA text.
fn recompute_from_ssa(block: &mut BasicBlock, statements: Vec<String>) {
    for stmt in &statements {
        if let Some((target, version)) = write_target(stmt) {
            if is_real_variable(target) {
                block.accesses.writes.insert(target.to_string());
                block.accesses.writes.insert(root_name(target).to_string());
                let entry = block
                    .ssa_versions
                    .writes
                    .entry(target.to_string())
                    .or_insert(0);
                *entry = (*entry).max(version);
            }
        }
        if let Some((_, rhs)) = stmt.split_once(" = ") {
            for word in rhs.split([' ', ',']) {
                let trimmed = word.trim_matches(|c| c == '(' || c == ')');
                if let Some((base, version)) = split_versioned(trimmed) {
                    if is_real_variable(base) {
                        block.accesses.reads.insert(base.to_string());
                        block
                            .ssa_versions
                            .reads
                            .entry(base.to_string())
                            .or_insert(version);
                    }
                }
            }
        }
    }
    block.ssa_statements = statements;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callee_transfer() -> CalleeSsa {
        // _performTransfer(amount): writes state, then an external transfer.
        let mut b0 = BasicBlock::new("Block0");
        b0.accesses.writes.insert("balances[msg.sender]".into());
        b0.ssa_versions.writes.insert("balances[msg.sender]".into(), 1);
        b0.ssa_statements = vec!["balances[msg.sender]_1 = 0".into()];

        let mut b1 = BasicBlock::new("Block1");
        b1.ssa_versions.writes.insert("ret".into(), 1);
        b1.ssa_statements =
            vec!["ret_1 = call[low_level_external](msg.sender.transfer, amount_0)".into()];

        CalleeSsa {
            params: vec!["amount".into()],
            blocks: vec![b0, b1],
        }
    }

    fn caller_block() -> BasicBlock {
        let mut block = BasicBlock::new("Block0");
        block.ssa_versions.writes.insert("bal".into(), 1);
        block.ssa_versions.writes.insert("ret".into(), 1);
        block.ssa_statements = vec!["ret_1 = call[internal](_performTransfer, bal_1)".into()];
        block
    }

    #[test]
    fn inlines_callee_after_the_original_call() {
        let mut blocks = vec![caller_block()];
        let mut callees = BTreeMap::new();
        callees.insert("_performTransfer".into(), callee_transfer());

        inline_internal_calls(&mut blocks, &callees);

        let stmts = &blocks[0].ssa_statements;
        assert_eq!(stmts[0], "ret_1 = call[internal](_performTransfer, bal_1)");
        assert_eq!(stmts[1], "balances[msg.sender]_1 = 0");
        // The parameter is bound to the actual argument, and ret is remapped
        // past the caller's existing version.
        assert_eq!(
            stmts[2],
            "ret_2 = call[low_level_external](msg.sender.transfer, bal_1)"
        );
        assert!(blocks[0].accesses.writes.contains("balances[msg.sender]"));
        assert!(blocks[0].accesses.writes.contains("balances"));
    }

    #[test]
    fn callee_phis_are_skipped() {
        let mut callee = callee_transfer();
        callee.blocks[0]
            .ssa_statements
            .insert(0, "i_2 = phi(i_0, i_1)".into());

        let mut blocks = vec![caller_block()];
        let mut callees = BTreeMap::new();
        callees.insert("_performTransfer".into(), callee);
        inline_internal_calls(&mut blocks, &callees);

        assert!(blocks[0]
            .ssa_statements
            .iter()
            .all(|s| !s.contains("phi(")));
    }

    #[test]
    fn writes_allocate_versions_above_the_caller_maximum() {
        // The caller already wrote balances[msg.sender] at version 2
        // (in a later block); the inlined write must go above it.
        let mut caller = caller_block();
        caller
            .ssa_versions
            .writes
            .insert("balances[msg.sender]".into(), 2);

        let mut blocks = vec![caller];
        let mut callees = BTreeMap::new();
        callees.insert("_performTransfer".into(), callee_transfer());
        inline_internal_calls(&mut blocks, &callees);

        assert_eq!(blocks[0].ssa_statements[1], "balances[msg.sender]_3 = 0");
    }

    #[test]
    fn compound_duplicate_arguments_are_suppressed() {
        let mut callee_block = BasicBlock::new("Block0");
        callee_block.ssa_statements =
            vec!["balances[to]_1 = balances[to]_0 + amount_0 to_0".into()];
        let callee = CalleeSsa {
            params: vec!["to".into(), "amount".into()],
            blocks: vec![callee_block],
        };

        let mut caller = BasicBlock::new("Block0");
        caller.ssa_versions.writes.insert("ret".into(), 1);
        caller.ssa_versions.reads.insert("amount".into(), 1);
        caller.ssa_statements =
            vec!["ret_1 = call[internal](_credit, amount_1, amount_1)".into()];

        let mut blocks = vec![caller];
        let mut callees = BTreeMap::new();
        callees.insert("_credit".into(), callee);
        inline_internal_calls(&mut blocks, &callees);

        // Both parameters bind to the same actual; the second substitution
        // inside the compound RHS is suppressed instead of duplicated.
        let inlined = &blocks[0].ssa_statements[1];
        assert_eq!(inlined, "balances[to]_1 = balances[to]_0 + amount_1");
    }

    #[test]
    fn resplit_separates_mint_shaped_blocks() {
        let mut block = BasicBlock::new("Block0");
        block.ssa_statements = vec![
            "ret_1 = call[internal](_mint, to_0, amount_0)".into(),
            "totalSupply_1 = totalSupply_0 + amount_0".into(),
            "balances[to]_1 = balances[to]_0 + amount_0".into(),
            "emit Transfer(address(0)_0, to_0, amount_0)".into(),
        ];
        block.terminator = Some(Terminator::Return);

        let out = resplit_compound_blocks(vec![block]);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].id, "Block0");
        // Each compound mutation ends a block; the chain is re-linked and the
        // original terminator lands on the tail.
        assert_eq!(out[0].terminator, Some(Terminator::Goto(out[1].id.clone())));
        assert_eq!(out[1].ssa_statements, vec!["balances[to]_1 = balances[to]_0 + amount_0"]);
        assert_eq!(out[2].terminator, Some(Terminator::Return));
        assert!(out[1].accesses.writes.contains("balances"));
    }

    #[test]
    fn resplit_leaves_single_mutation_blocks_alone() {
        let mut block = BasicBlock::new("Block0");
        block.ssa_statements = vec!["x_1 = x_0 + 1".into()];
        block.terminator = Some(Terminator::Return);
        let out = resplit_compound_blocks(vec![block]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].terminator, Some(Terminator::Return));
    }
}
