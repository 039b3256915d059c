//! Compiles an AST into SQL text for a chosen dialect (§4.8, §4.9).

pub mod context;
pub mod dialect;

pub use context::Context;
pub use dialect::{Dialect, DialectHandler};

use anyhow::Result;

use crate::ast::TableRef;

/// Capability shared by every node that can render itself to SQL under a [`Context`].
pub trait Compilable {
    fn compile(&self, ctx: &Context) -> Result<String>;
}

/// Formatting and provenance knobs that don't change the SQL's meaning.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Pretty-print the final SQL with `sqlformat`.
    pub format: bool,
    /// Prepend a `-- generated by relquery` comment to the compiled text.
    pub signature_comment: bool,
}

/// Compiles `table`, prefixing any CTEs it registered along the way as a
/// leading `WITH` clause (§4.7). This is the one case where the tree's shape
/// doesn't mirror the output's shape: a `Cte` node deep in the tree still
/// surfaces its definition at the very top of the statement.
pub fn assemble_with_ctes(table: &TableRef, dialect: Dialect, options: Options) -> Result<String> {
    let ctx = Context::root(dialect.handler(), options.clone());
    let body = table.compile(&ctx)?;

    let ctes = ctx.take_ctes();
    let mut sql = if ctes.is_empty() {
        body
    } else {
        let withs = ctes
            .into_iter()
            .map(|(name, sql)| format!("{} AS ({sql})", ctx.quote(&name)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("WITH {withs} {body}")
    };

    if options.signature_comment {
        sql = format!("-- generated by relquery\n{sql}");
    }
    if options.format {
        sql = sqlformat::format(&sql, &sqlformat::QueryParams::None, sqlformat::FormatOptions::default());
    }
    Ok(sql)
}

/// The crate's public entry point: picks a dialect once, compiles as many
/// tables as needed against it.
#[derive(Debug, Clone)]
pub struct Compiler {
    dialect: Dialect,
    options: Options,
}

impl Compiler {
    pub fn new(dialect: Dialect) -> Self {
        Compiler {
            dialect,
            options: Options::default(),
        }
    }

    pub fn with_options(dialect: Dialect, options: Options) -> Self {
        Compiler { dialect, options }
    }

    pub fn compile(&self, table: &TableRef) -> Result<String> {
        assemble_with_ctes(table, self.dialect, self.options.clone())
    }
}
