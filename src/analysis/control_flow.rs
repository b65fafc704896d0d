//! Expands control-flow statements into multi-block shapes and finalizes
//! block terminators.
//!
//! Refinement is single-level: a control-flow statement nested inside a
//! branch or loop body stays in that block and is handled textually by the
//! SSA pass. Blocks that already carry a terminator pass through untouched,
//! which makes refinement idempotent.

use crate::analysis::statements::classify;
use crate::ir::block::{
    BasicBlock, BranchTarget, StatementKind, Terminator, TypedStatement,
};
use crate::loader::solc_ast::{Expr, Stmt};

pub fn refine_blocks(basic_blocks: Vec<BasicBlock>) -> Vec<BasicBlock> {
    if basic_blocks.is_empty() {
        return basic_blocks;
    }

    let next_ids: Vec<Option<String>> = (0..basic_blocks.len())
        .map(|i| basic_blocks.get(i + 1).map(|b| b.id.clone()))
        .collect();

    let mut counter = basic_blocks.len();
    let mut refined = Vec::new();

    for (idx, block) in basic_blocks.into_iter().enumerate() {
        if block.terminator.is_some() {
            refined.push(block);
            continue;
        }

        let kind = block
            .statements
            .iter()
            .map(|s| s.kind)
            .find(|k| {
                matches!(
                    k,
                    StatementKind::IfStatement | StatementKind::ForLoop | StatementKind::WhileLoop
                )
            });

        let next_id = next_ids[idx].clone();
        match kind {
            Some(StatementKind::IfStatement) => {
                expand_if(block, next_id, &mut counter, &mut refined);
            }
            Some(StatementKind::ForLoop) => {
                expand_for(block, next_id, &mut counter, &mut refined);
            }
            Some(StatementKind::WhileLoop) => {
                expand_while(block, next_id, &mut counter, &mut refined);
            }
            _ => refined.push(block),
        }
    }

    refined
}

fn fresh_id(counter: &mut usize) -> String {
    let id = format!("Block{counter}");
    *counter += 1;
    id
}

fn typed(statements: &[Stmt]) -> Vec<TypedStatement> {
    statements
        .iter()
        .map(|s| TypedStatement {
            kind: classify(s),
            node: s.clone(),
        })
        .collect()
}

fn contains_revert(statements: &[TypedStatement]) -> bool {
    statements.iter().any(|s| s.kind == StatementKind::Revert)
}

fn goto_or_none(target: Option<&String>) -> Option<Terminator> {
    target.map(|id| Terminator::Goto(id.clone()))
}

// ── if ───────────────────────────────────────────────────────────────────────

fn expand_if(
    block: BasicBlock,
    next_id: Option<String>,
    counter: &mut usize,
    out: &mut Vec<BasicBlock>,
) {
    let if_idx = block
        .statements
        .iter()
        .position(|s| s.kind == StatementKind::IfStatement)
        .expect("caller checked for an if statement");

    let (condition, true_stmts, false_stmts) = match &block.statements[if_idx].node {
        Stmt::If {
            condition,
            true_body,
            false_body,
            ..
        } => (condition.clone(), true_body.clone(), false_body.clone()),
        _ => (Expr::Unknown { node_type: "missing".into() }, Vec::new(), Vec::new()),
    };

    let mut conditional = BasicBlock::new(block.id.clone());
    conditional.statements = block.statements[..=if_idx].to_vec();

    // Branch block ids are allocated up front; an empty side still consumes
    // its id so numbering stays stable.
    let true_id = fresh_id(counter);
    let false_id = fresh_id(counter);

    let true_typed = typed(&true_stmts);
    let false_typed = typed(&false_stmts);
    let true_reverts = contains_revert(&true_typed);
    let false_reverts = contains_revert(&false_typed);
    let true_has_content = !true_typed.is_empty();
    let false_has_content = !false_typed.is_empty();

    let mut true_block = BasicBlock::new(true_id.clone());
    true_block.statements = true_typed;
    true_block.terminator = if true_reverts {
        Some(Terminator::Revert)
    } else if true_has_content {
        goto_or_none(next_id.as_ref())
    } else {
        None
    };

    let mut false_block = BasicBlock::new(false_id.clone());
    false_block.statements = false_typed;
    false_block.terminator = if false_reverts {
        Some(Terminator::Revert)
    } else if false_has_content {
        goto_or_none(next_id.as_ref())
    } else {
        None
    };

    let condition_text = condition.render();
    let fallthrough = |next: &Option<String>| match next {
        Some(id) => BranchTarget::Block(id.clone()),
        None => BranchTarget::Return,
    };

    if true_has_content || true_reverts {
        if false_has_content || false_reverts {
            conditional.terminator = Some(Terminator::Branch {
                condition: condition_text,
                then_target: BranchTarget::Block(true_id),
                else_target: BranchTarget::Block(false_id),
            });
            out.push(conditional);
            out.push(true_block);
            out.push(false_block);
        } else {
            conditional.terminator = Some(Terminator::Branch {
                condition: condition_text,
                then_target: BranchTarget::Block(true_id),
                else_target: fallthrough(&next_id),
            });
            out.push(conditional);
            out.push(true_block);
        }
    } else if false_has_content || false_reverts {
        conditional.terminator = Some(Terminator::Branch {
            condition: condition_text,
            then_target: fallthrough(&next_id),
            else_target: BranchTarget::Block(false_id),
        });
        out.push(conditional);
        out.push(false_block);
    } else {
        // Both sides empty: the conditional degenerates to a fallthrough.
        conditional.terminator = match next_id {
            Some(id) => Some(Terminator::Goto(id)),
            None => Some(Terminator::Return),
        };
        out.push(conditional);
    }
}

// ── for ──────────────────────────────────────────────────────────────────────

fn expand_for(
    block: BasicBlock,
    next_id: Option<String>,
    counter: &mut usize,
    out: &mut Vec<BasicBlock>,
) {
    let loop_idx = block
        .statements
        .iter()
        .position(|s| s.kind == StatementKind::ForLoop)
        .expect("caller checked for a for loop");

    let (init, condition, update, body) = match &block.statements[loop_idx].node {
        Stmt::For {
            init,
            condition,
            update,
            body,
            ..
        } => (init.clone(), condition.clone(), update.clone(), body.clone()),
        _ => (None, None, None, Vec::new()),
    };

    let mut init_block = BasicBlock::new(block.id.clone());
    init_block.statements = block.statements[..loop_idx].to_vec();
    if let Some(init_stmt) = init {
        init_block.statements.push(TypedStatement {
            kind: classify(&init_stmt),
            node: *init_stmt,
        });
    }
    init_block.is_loop_init = true;

    let header_id = fresh_id(counter);
    let body_id = fresh_id(counter);
    let increment_id = fresh_id(counter);
    let exit_id = fresh_id(counter);

    let mut header = header_block(header_id.clone(), condition.as_ref());
    let mut body_block = BasicBlock::new(body_id.clone());
    body_block.statements = typed(&body);
    body_block.is_loop_body = true;

    let mut increment = BasicBlock::new(increment_id.clone());
    if let Some(update_stmt) = update {
        increment.statements.push(TypedStatement {
            kind: classify(&update_stmt),
            node: *update_stmt,
        });
    }
    increment.is_loop_increment = true;

    let mut exit = BasicBlock::new(exit_id.clone());
    exit.is_loop_exit = true;

    init_block.terminator = Some(Terminator::Goto(header_id.clone()));
    header.terminator = Some(Terminator::Branch {
        condition: condition.as_ref().map(Expr::render).unwrap_or_else(|| "true".into()),
        then_target: BranchTarget::Block(body_id),
        else_target: BranchTarget::Block(exit_id),
    });
    body_block.terminator = Some(Terminator::Goto(increment_id));
    // Back-edge.
    increment.terminator = Some(Terminator::Goto(header_id));
    exit.terminator = goto_or_none(next_id.as_ref());

    out.push(init_block);
    out.push(header);
    out.push(body_block);
    out.push(increment);
    out.push(exit);
}

// ── while ────────────────────────────────────────────────────────────────────

fn expand_while(
    block: BasicBlock,
    next_id: Option<String>,
    counter: &mut usize,
    out: &mut Vec<BasicBlock>,
) {
    let loop_idx = block
        .statements
        .iter()
        .position(|s| s.kind == StatementKind::WhileLoop)
        .expect("caller checked for a while loop");

    let (condition, body) = match &block.statements[loop_idx].node {
        Stmt::While { condition, body, .. } => (condition.clone(), body.clone()),
        _ => (Expr::Unknown { node_type: "missing".into() }, Vec::new()),
    };

    let mut pre = BasicBlock::new(block.id.clone());
    pre.statements = block.statements[..loop_idx].to_vec();

    let header_id = fresh_id(counter);
    let body_id = fresh_id(counter);
    let exit_id = fresh_id(counter);

    let mut header = header_block(header_id.clone(), Some(&condition));
    let mut body_block = BasicBlock::new(body_id.clone());
    body_block.statements = typed(&body);
    body_block.is_loop_body = true;

    let mut exit = BasicBlock::new(exit_id.clone());
    exit.is_loop_exit = true;

    pre.terminator = Some(Terminator::Goto(header_id.clone()));
    header.terminator = Some(Terminator::Branch {
        condition: condition.render(),
        then_target: BranchTarget::Block(body_id),
        else_target: BranchTarget::Block(exit_id),
    });
    // Back-edge.
    body_block.terminator = Some(Terminator::Goto(header_id));
    exit.terminator = goto_or_none(next_id.as_ref());

    out.push(pre);
    out.push(header);
    out.push(body_block);
    out.push(exit);
}

fn header_block(id: String, condition: Option<&Expr>) -> BasicBlock {
    let mut header = BasicBlock::new(id);
    if let Some(condition) = condition {
        header.statements.push(TypedStatement {
            kind: StatementKind::Expression,
            node: Stmt::Expression {
                expr: condition.clone(),
                src: String::new(),
            },
        });
    }
    header.is_loop_header = true;
    header
}

// ── terminator finalization ──────────────────────────────────────────────────

/// Give every block exactly one terminator. Already-terminated blocks are
/// untouched, so the pass is idempotent.
pub fn finalize_terminators(blocks: &mut [BasicBlock]) {
    let ids: Vec<String> = blocks.iter().map(|b| b.id.clone()).collect();
    let count = blocks.len();

    for (idx, block) in blocks.iter_mut().enumerate() {
        if block.terminator.is_some() {
            continue;
        }
        block.terminator = Some(match block.last_statement_kind() {
            Some(StatementKind::Return) => Terminator::Return,
            Some(StatementKind::Revert) => Terminator::Revert,
            _ if idx + 1 < count => Terminator::Goto(ids[idx + 1].clone()),
            _ => Terminator::Return,
        });
    }
}
