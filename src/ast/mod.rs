//! Abstract Syntax Tree: the algebraic description of expressions, tables,
//! and statements that a [`Compiler`](crate::compiler::Compiler) walks to
//! produce SQL text.
//!
//! Every node is logically immutable once built; the builder surface
//! ([`TableOps`](table::TableOps)) evolves nodes by structural replacement —
//! producing a new node with selected fields overridden — rather than
//! mutating in place. The one exception is the one-shot resolution of a
//! `this.foo` placeholder (see [`resolve`]).

pub mod expr;
pub mod resolve;
pub mod stmt;
pub mod table;

pub use expr::Expr;
pub use stmt::Stmt;
pub use table::{TableNode, TableOps, TablePath, TableRef};

/// Drops the `SKIP`-marked elements from a variadic argument list.
///
/// `spec.md` models "omit this argument" with a singleton `SKIP` sentinel
/// threaded through a dynamically-typed argument list. Rust already has a
/// sentinel for "this slot is absent": `Option::None`. So `select`, `where`,
/// `order_by`, `on` take `Vec<Option<Expr>>` (and `limit` takes
/// `Option<i64>` directly) — this free function is the builder-side
/// equivalent of the Python source's `_drop_skips`.
pub(crate) fn drop_skips(exprs: Vec<Option<Expr>>) -> Vec<Expr> {
    exprs.into_iter().flatten().collect()
}
