//! Basic blocks: the unit every pipeline pass operates on.
//!
//! Blocks carry their source statements (typed), the variable access sets,
//! per-block SSA version maps, the emitted textual SSA statements and a
//! terminator. Back-edges live in terminator targets, not in a pointer
//! graph, so the block list stays an ordered `Vec`.

use std::collections::{BTreeMap, BTreeSet};

use crate::ir::function::CallKind;
use crate::loader::solc_ast::Stmt;

/// Closed classification of top-level statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Assignment,
    FunctionCall,
    EmitStatement,
    IfStatement,
    Return,
    VariableDeclaration,
    ForLoop,
    WhileLoop,
    Revert,
    Block,
    Expression,
    Unknown,
}

/// A statement tagged with its classification.
#[derive(Debug, Clone)]
pub struct TypedStatement {
    pub kind: StatementKind,
    pub node: Stmt,
}

/// Variable names (possibly structured, e.g. `balances[msg.sender]`) read and
/// written by a block.
#[derive(Debug, Clone, Default)]
pub struct Accesses {
    pub reads: BTreeSet<String>,
    pub writes: BTreeSet<String>,
}

/// SSA versions observed at block granularity: the version each variable has
/// when read on entry, and the version assigned by the block's last write.
#[derive(Debug, Clone, Default)]
pub struct SsaVersions {
    pub reads: BTreeMap<String, u32>,
    pub writes: BTreeMap<String, u32>,
}

/// Where a conditional arm transfers control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchTarget {
    Block(String),
    Return,
}

impl std::fmt::Display for BranchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Block(id) => write!(f, "goto {id}"),
            Self::Return => write!(f, "return"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Goto(String),
    Branch {
        condition: String,
        then_target: BranchTarget,
        else_target: BranchTarget,
    },
    Return,
    Revert,
}

impl Terminator {
    /// Block ids this terminator can transfer control to.
    pub fn successors(&self) -> Vec<&str> {
        match self {
            Self::Goto(id) => vec![id.as_str()],
            Self::Branch {
                then_target,
                else_target,
                ..
            } => [then_target, else_target]
                .into_iter()
                .filter_map(|t| match t {
                    BranchTarget::Block(id) => Some(id.as_str()),
                    BranchTarget::Return => None,
                })
                .collect(),
            Self::Return | Self::Revert => Vec::new(),
        }
    }

    pub fn goto_target(&self) -> Option<&str> {
        match self {
            Self::Goto(id) => Some(id.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Terminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Goto(id) => write!(f, "goto {id}"),
            Self::Branch {
                condition,
                then_target,
                else_target,
            } => write!(f, "if {condition} then {then_target} else {else_target}"),
            Self::Return => write!(f, "return"),
            Self::Revert => write!(f, "revert"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    pub id: String,
    pub statements: Vec<TypedStatement>,
    pub accesses: Accesses,
    pub ssa_versions: SsaVersions,
    pub ssa_statements: Vec<String>,
    pub terminator: Option<Terminator>,

    pub is_loop_init: bool,
    pub is_loop_header: bool,
    pub is_loop_body: bool,
    pub is_loop_increment: bool,
    pub is_loop_exit: bool,
    /// Call kinds observed in a loop body reachable from this header; set by
    /// the loop-call analyzer together with the write-set widening.
    pub external_call_effects: Vec<CallKind>,
}

impl BasicBlock {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn has_external_call_effects(&self) -> bool {
        !self.external_call_effects.is_empty()
    }

    /// Kind of the last source statement, if any.
    pub fn last_statement_kind(&self) -> Option<StatementKind> {
        self.statements.last().map(|s| s.kind)
    }
}
