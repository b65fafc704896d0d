//! Conservative modeling of external calls inside loops.
//!
//! An external-kind call in a loop body may re-enter and mutate any state
//! before the next iteration. The header's write set is widened to every
//! variable written anywhere in the function, so φ-insertion covers them all.

use std::collections::{BTreeMap, BTreeSet};

use crate::ir::block::{BasicBlock, Terminator};
use crate::ir::function::CallKind;

pub fn analyze_loop_calls(blocks: &mut [BasicBlock]) {
    // Variables actually written somewhere in the function, i.e. appearing
    // as an SSA definition, not just in an access set.
    let mut written: BTreeSet<String> = BTreeSet::new();
    for block in blocks.iter() {
        for var in &block.accesses.writes {
            let tag = format!("{var}_");
            if block
                .ssa_statements
                .iter()
                .any(|s| s.contains(" = ") && s.contains(&tag))
            {
                written.insert(var.clone());
            }
        }
    }

    let index_of: BTreeMap<String, usize> = blocks
        .iter()
        .enumerate()
        .map(|(i, b)| (b.id.clone(), i))
        .collect();

    let header_indices: Vec<usize> = blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.is_loop_header)
        .map(|(i, _)| i)
        .collect();

    for header_idx in header_indices {
        let body_indices = body_blocks_of(blocks, header_idx, &index_of);

        let mut kinds: Vec<CallKind> = Vec::new();
        for &body_idx in &body_indices {
            for stmt in &blocks[body_idx].ssa_statements {
                if let Some(kind) = CallKind::scan(stmt) {
                    if kind.is_external_kind() && !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
            }
        }

        if kinds.is_empty() {
            continue;
        }

        let header = &mut blocks[header_idx];
        header.accesses.writes.extend(written.iter().cloned());
        header.external_call_effects = kinds;
    }
}

/// Body blocks reachable from a header without crossing the back-edge:
/// follow the header's then-arm through unconditional gotos until the loop
/// exit or the header itself.
fn body_blocks_of(
    blocks: &[BasicBlock],
    header_idx: usize,
    index_of: &BTreeMap<String, usize>,
) -> Vec<usize> {
    let mut body = Vec::new();

    let Some(Terminator::Branch { then_target, .. }) = &blocks[header_idx].terminator else {
        return body;
    };
    let crate::ir::block::BranchTarget::Block(first) = then_target else {
        return body;
    };
    let Some(&first_idx) = index_of.get(first) else {
        return body;
    };

    let mut current = first_idx;
    loop {
        body.push(current);
        let Some(Terminator::Goto(next)) = &blocks[current].terminator else {
            break;
        };
        let Some(&next_idx) = index_of.get(next) else {
            break;
        };
        if next_idx == header_idx
            || blocks[next_idx].is_loop_header
            || blocks[current].is_loop_exit
            || body.contains(&next_idx)
        {
            break;
        }
        current = next_idx;
    }

    body
}
