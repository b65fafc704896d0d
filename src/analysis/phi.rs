//! φ-function insertion at merge points and loop headers.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::ssa::rewrite_versions;
use crate::ir::block::{BasicBlock, Terminator};

pub fn insert_phi_functions(blocks: &mut [BasicBlock]) {
    if blocks.is_empty() {
        return;
    }

    let index_of: BTreeMap<String, usize> = blocks
        .iter()
        .enumerate()
        .map(|(i, b)| (b.id.clone(), i))
        .collect();

    // Predecessors, in block order. A block without a terminator that is not
    // last falls through to its successor.
    let mut predecessors: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, block) in blocks.iter().enumerate() {
        match &block.terminator {
            Some(terminator) => {
                for succ in terminator.successors() {
                    predecessors.entry(succ.to_string()).or_default().push(idx);
                }
            }
            None => {
                if idx + 1 < blocks.len() {
                    predecessors
                        .entry(blocks[idx + 1].id.clone())
                        .or_default()
                        .push(idx);
                }
            }
        }
    }

    // Loop headers: flagged blocks plus any back-edge target.
    let mut headers: BTreeSet<usize> = blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.is_loop_header)
        .map(|(i, _)| i)
        .collect();
    for (idx, block) in blocks.iter().enumerate() {
        if let Some(Terminator::Goto(target)) = &block.terminator {
            if let Some(&target_idx) = index_of.get(target) {
                if target_idx < idx {
                    headers.insert(target_idx);
                }
            }
        }
    }

    let merge_points: BTreeSet<usize> = predecessors
        .iter()
        .filter(|(_, preds)| preds.len() >= 2)
        .filter_map(|(id, _)| index_of.get(id).copied())
        .collect();

    // Function-wide version ceiling per variable; φ versions are allocated
    // above it so definitions stay unique.
    let mut max_version: BTreeMap<String, u32> = BTreeMap::new();
    for block in blocks.iter() {
        for (var, v) in block.ssa_versions.reads.iter().chain(&block.ssa_versions.writes) {
            let entry = max_version.entry(var.clone()).or_insert(0);
            *entry = (*entry).max(*v);
        }
    }

    let mut worklist: Vec<usize> = merge_points.union(&headers).copied().collect();
    worklist.sort_unstable();

    for block_idx in worklist {
        let block_id = blocks[block_idx].id.clone();
        let preds: Vec<usize> = predecessors.get(&block_id).cloned().unwrap_or_default();
        if preds.is_empty() {
            continue;
        }

        // φ candidates: variables written in some predecessor, plus the
        // header's own write set when the loop-call analyzer widened it.
        let mut candidates: BTreeSet<String> = BTreeSet::new();
        for &p in &preds {
            candidates.extend(blocks[p].accesses.writes.iter().cloned());
        }
        let widened: BTreeSet<String> = if blocks[block_idx].has_external_call_effects() {
            blocks[block_idx].accesses.writes.clone()
        } else {
            BTreeSet::new()
        };
        candidates.extend(widened.iter().cloned());

        let mut phi_statements: Vec<String> = Vec::new();

        for var in candidates {
            let mut incoming: Vec<u32> = Vec::new();
            let mut written_versions: BTreeSet<u32> = BTreeSet::new();
            for &p in &preds {
                let written = blocks[p].ssa_versions.writes.get(&var).copied();
                if let Some(v) = written.filter(|v| *v > 0) {
                    written_versions.insert(v);
                    incoming.push(v);
                } else {
                    incoming.push(blocks[p].ssa_versions.reads.get(&var).copied().unwrap_or(0));
                }
            }

            let read_here = blocks[block_idx].accesses.reads.contains(&var);
            let needs_phi = written_versions.len() > 1
                || (read_here && !written_versions.is_empty())
                || widened.contains(&var);
            if !needs_phi {
                continue;
            }

            let ceiling = max_version.get(&var).copied().unwrap_or(0);
            let new_version = ceiling.max(incoming.iter().copied().max().unwrap_or(0)) + 1;
            max_version.insert(var.clone(), new_version);

            let args: Vec<String> = incoming.iter().map(|v| format!("{var}_{v}")).collect();
            phi_statements.push(format!("{var}_{new_version} = phi({})", args.join(", ")));

            let block = &mut blocks[block_idx];
            block.ssa_versions.writes.insert(var.clone(), new_version);
            block.ssa_versions.reads.insert(var.clone(), new_version);

            // Rewrite uses of any older version inside this block.
            for stmt in &mut block.ssa_statements {
                *stmt = rewrite_versions(stmt, &mut |base, v| {
                    (base == var && v < new_version).then_some(new_version)
                });
            }
        }

        if !phi_statements.is_empty() {
            let block = &mut blocks[block_idx];
            phi_statements.append(&mut block.ssa_statements);
            block.ssa_statements = phi_statements;
        }
    }
}
