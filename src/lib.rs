//! A composable SQL query construction and compilation core.
//!
//! A [`TableRef`] is built up through the [`TableOps`](ast::TableOps) fluent
//! surface — `select`, `where`, `join`, `union`, ... — each call wrapping the
//! previous node rather than mutating it. Column references inside a builder
//! call can be written with [`THIS`](ast::resolve::THIS) before the table
//! they belong to is known; [`resolve_names`](ast::resolve::resolve_names)
//! binds them once, right before the node that owns them compiles. A
//! [`Compiler`] walks the finished tree and renders it to SQL for whichever
//! [`Dialect`] you pick.
//!
//! ```
//! use relquery::ast::resolve::THIS;
//! use relquery::ast::{TableOps, TablePath};
//! use relquery::compiler::{Compiler, Dialect};
//!
//! let users = TablePath::at(vec!["users".to_string()], None);
//! let query = users.r#where(vec![Some(THIS.col("age").gt(18))]).unwrap();
//!
//! let sql = Compiler::new(Dialect::Generic).compile(&query).unwrap();
//! assert!(sql.contains("WHERE"));
//! ```

#![allow(clippy::result_large_err)]

pub mod ast;
pub mod compiler;
pub mod error;
pub mod schema;
mod utils;

pub use ast::resolve::THIS;
pub use ast::{Expr, TableOps, TablePath, TableRef};
pub use compiler::{Compiler, Dialect, Options};
pub use error::{Error, Result};
pub use utils::IntoOnly;
