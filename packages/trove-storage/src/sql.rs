//! Store-agnostic query AST and its dialect compilers.

mod ast;
mod compile;

pub use ast::{BinaryOp, Expr, Join, JoinKind, OrderBy, Select, SelectItem, Source, SqlValue};
pub use compile::{CompiledQuery, Dialect, compile};
