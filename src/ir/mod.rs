pub mod block;
pub mod contract;
pub mod function;

pub use block::{Accesses, BasicBlock, BranchTarget, SsaVersions, StatementKind, Terminator, TypedStatement};
pub use contract::{ContractIR, EventDecl, FunctionMeta, StateVariable};
pub use function::{CallKind, CallSite, FunctionIR, Parameter, Visibility};
