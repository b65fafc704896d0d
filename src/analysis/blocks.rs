//! Initial basic-block splitting.
//!
//! Control-flow statements always end a block. Effectful statements (calls,
//! assignments, declarations) end a block too, but only when another
//! statement follows — splitting after the final statement would leave an
//! empty tail block.

use crate::ir::block::{BasicBlock, StatementKind, TypedStatement};

fn always_terminates(kind: StatementKind) -> bool {
    matches!(
        kind,
        StatementKind::IfStatement
            | StatementKind::ForLoop
            | StatementKind::WhileLoop
            | StatementKind::Return
            | StatementKind::EmitStatement
            | StatementKind::Revert
    )
}

fn terminates_unless_last(kind: StatementKind) -> bool {
    matches!(
        kind,
        StatementKind::FunctionCall | StatementKind::Assignment | StatementKind::VariableDeclaration
    )
}

pub fn split_into_blocks(statements: Vec<TypedStatement>) -> Vec<BasicBlock> {
    let mut blocks = Vec::new();
    let mut counter = 0usize;
    let mut current = BasicBlock::new("Block0");
    let total = statements.len();

    for (i, statement) in statements.into_iter().enumerate() {
        let kind = statement.kind;
        current.statements.push(statement);

        let is_terminator =
            always_terminates(kind) || (terminates_unless_last(kind) && i < total - 1);

        if is_terminator {
            blocks.push(current);
            counter += 1;
            current = BasicBlock::new(format!("Block{counter}"));
        }
    }

    if !current.statements.is_empty() {
        blocks.push(current);
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::solc_ast::Stmt;

    fn typed(kind: StatementKind) -> TypedStatement {
        TypedStatement {
            kind,
            node: Stmt::Block {
                statements: Vec::new(),
                src: String::new(),
            },
        }
    }

    #[test]
    fn empty_body_yields_no_blocks() {
        assert!(split_into_blocks(Vec::new()).is_empty());
    }

    #[test]
    fn effectful_statements_split_except_the_last() {
        // decl; call; assignment  →  three blocks, but the trailing
        // assignment does not open an empty fourth.
        let blocks = split_into_blocks(vec![
            typed(StatementKind::VariableDeclaration),
            typed(StatementKind::FunctionCall),
            typed(StatementKind::Assignment),
        ]);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].id, "Block0");
        assert_eq!(blocks[2].id, "Block2");
        assert_eq!(blocks[2].statements.len(), 1);
    }

    #[test]
    fn single_trailing_assignment_stays_in_one_block() {
        let blocks = split_into_blocks(vec![typed(StatementKind::Assignment)]);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn control_flow_always_splits() {
        let blocks = split_into_blocks(vec![
            typed(StatementKind::IfStatement),
            typed(StatementKind::Return),
        ]);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn revert_terminates_even_when_last() {
        let blocks = split_into_blocks(vec![typed(StatementKind::Revert)]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].statements.len(), 1);
    }

    #[test]
    fn splitting_is_stable_on_a_resplit_of_block_contents() {
        // Splitting the statements of an already-split block changes nothing:
        // each produced block ends at its only terminator.
        let first = split_into_blocks(vec![
            typed(StatementKind::Assignment),
            typed(StatementKind::FunctionCall),
            typed(StatementKind::Return),
        ]);
        for block in &first {
            let again = split_into_blocks(block.statements.clone());
            assert_eq!(again.len(), 1);
            assert_eq!(again[0].statements.len(), block.statements.len());
        }
    }
}
