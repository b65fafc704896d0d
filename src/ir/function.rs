use serde::{Deserialize, Serialize};

use crate::ir::block::BasicBlock;
use crate::loader::source_map::SourceLocation;

/// Declared function visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    External,
    Internal,
    Private,
}

impl Visibility {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "public" => Self::Public,
            "external" => Self::External,
            "private" => Self::Private,
            _ => Self::Internal,
        }
    }

    /// Entrypoints are the externally reachable functions.
    pub fn is_entrypoint(self) -> bool {
        matches!(self, Self::Public | Self::External)
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::External => write!(f, "external"),
            Self::Internal => write!(f, "internal"),
            Self::Private => write!(f, "private"),
        }
    }
}

/// How a call site leaves (or stays inside) the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Internal,
    External,
    LowLevelExternal,
    Delegatecall,
    Staticcall,
    /// `revert`/`require`/`assert` — call-shaped in the AST, not a call.
    Revert,
}

impl CallKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
            Self::LowLevelExternal => "low_level_external",
            Self::Delegatecall => "delegatecall",
            Self::Staticcall => "staticcall",
            Self::Revert => "revert",
        }
    }

    /// Any kind that hands control to foreign code.
    pub fn is_external_kind(self) -> bool {
        matches!(
            self,
            Self::External | Self::LowLevelExternal | Self::Delegatecall | Self::Staticcall
        )
    }

    /// Extract the kind tag from an SSA call statement (`… call[kind](…)`).
    pub fn scan(ssa_statement: &str) -> Option<Self> {
        let rest = ssa_statement.split("call[").nth(1)?;
        let tag = rest.split(']').next()?;
        match tag {
            "internal" => Some(Self::Internal),
            "external" => Some(Self::External),
            "low_level_external" => Some(Self::LowLevelExternal),
            "delegatecall" => Some(Self::Delegatecall),
            "staticcall" => Some(Self::Staticcall),
            "revert" => Some(Self::Revert),
            _ => None,
        }
    }
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outgoing call recorded on a function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSite {
    pub callee: String,
    pub kind: CallKind,
    /// Definition location when the callee is a same-contract function,
    /// otherwise the call site (or unknown).
    pub location: SourceLocation,
    pub in_contract: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

/// Fully analysed IR for one function.
#[derive(Debug, Clone)]
pub struct FunctionIR {
    pub name: String,
    pub visibility: Visibility,
    pub params: Vec<Parameter>,
    pub location: SourceLocation,
    pub blocks: Vec<BasicBlock>,
    pub calls: Vec<CallSite>,
    /// Set when the function body was skipped (unsupported construct).
    /// Detectors treat such a function as having no findings.
    pub error: Option<String>,
}

impl FunctionIR {
    pub fn is_entrypoint(&self) -> bool {
        self.visibility.is_entrypoint()
    }

    /// Flat view of all SSA statements, in block order.
    pub fn ssa_statements(&self) -> impl Iterator<Item = &str> {
        self.blocks
            .iter()
            .flat_map(|b| b.ssa_statements.iter().map(String::as_str))
    }
}
