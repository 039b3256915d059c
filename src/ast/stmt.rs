//! Statements (§4.7): operations against a table rather than reads from one.
//!
//! `Stmt` is deliberately not a [`Compilable`](crate::compiler::Compilable):
//! every other node always renders to a `String`, but `Commit` renders to
//! *nothing* on an autocommit connection, and a type that sometimes has no
//! SQL to emit is better modeled as `Option<String>` than as an empty string
//! a caller has to remember to filter out.

use anyhow::Result;

use crate::ast::expr::Expr;
use crate::ast::table::{TableNode, TableOps, TableRef};
use crate::compiler::{Compilable, Context};
use crate::error::Error;
use crate::schema::Schema;

#[derive(Debug)]
pub enum Stmt {
    CreateTable {
        table: TableRef,
        if_not_exists: bool,
    },
    DropTable {
        table: TableRef,
        if_exists: bool,
    },
    InsertToTable {
        table: TableRef,
        columns: Vec<String>,
        rows: Vec<Vec<Expr>>,
    },
    Commit,
    Explain {
        query: TableRef,
    },
}

fn table_path_sql(ctx: &Context, table: &TableRef) -> Result<String> {
    match table.as_ref() {
        TableNode::Path { path, .. } => Ok(ctx.dialect().compile_path(path)),
        _ => table.compile(ctx),
    }
}

fn column_defs(schema: &Schema, ctx: &Context) -> String {
    schema
        .iter()
        .map(|(name, ty)| format!("{} {}", ctx.quote(name), ctx.dialect().type_repr(ty)))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Stmt {
    /// Renders this statement to SQL, or `None` if it has nothing to emit
    /// under the active dialect (only ever true for `Commit`).
    pub fn compile(&self, ctx: &Context) -> Result<Option<String>> {
        let sql = match self {
            Stmt::CreateTable { table, if_not_exists } => {
                let schema = table.schema().ok_or_else(|| {
                    Error::invariant("CREATE TABLE requires a known schema for the target table")
                })?;
                let clause = if *if_not_exists && ctx.dialect().supports_if_not_exists() {
                    "IF NOT EXISTS "
                } else {
                    ""
                };
                format!(
                    "CREATE TABLE {clause}{} ({})",
                    table_path_sql(ctx, table)?,
                    column_defs(&schema, ctx)
                )
            }
            Stmt::DropTable { table, if_exists } => {
                let clause = if *if_exists { "IF EXISTS " } else { "" };
                format!("DROP TABLE {clause}{}", table_path_sql(ctx, table)?)
            }
            Stmt::InsertToTable { table, columns, rows } => {
                if rows.is_empty() {
                    return Err(Error::invariant("INSERT requires at least one row").into());
                }
                let cols = columns.iter().map(|c| ctx.quote(c)).collect::<Vec<_>>().join(", ");
                let values = rows
                    .iter()
                    .map(|row| {
                        let items = row
                            .iter()
                            .map(|e| e.compile(ctx))
                            .collect::<Result<Vec<_>>>()?
                            .join(", ");
                        Ok(format!("({items})"))
                    })
                    .collect::<Result<Vec<_>>>()?
                    .join(", ");
                format!("INSERT INTO {} ({cols}) VALUES {values}", table_path_sql(ctx, table)?)
            }
            Stmt::Commit => {
                if ctx.dialect().is_autocommit() {
                    log::debug!("omitting COMMIT: dialect is autocommit");
                    return Ok(None);
                }
                "COMMIT".to_string()
            }
            Stmt::Explain { query } => format!("EXPLAIN {}", query.compile(ctx)?),
        };
        Ok(Some(sql))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::table::TablePath;
    use crate::compiler::dialect::{Dialect, PostgresDialect};
    use crate::compiler::Options;
    use crate::schema::ColumnType;

    fn users() -> TableRef {
        TablePath::at(
            vec!["users".to_string()],
            Some(Schema::new(vec![("id".to_string(), ColumnType::Int)])),
        )
    }

    #[test]
    fn commit_is_omitted_on_autocommit_dialect() {
        let ctx = Context::root(Dialect::Generic.handler(), Options::default());
        assert_eq!(Stmt::Commit.compile(&ctx).unwrap(), None);
    }

    #[test]
    fn commit_emits_sql_on_non_autocommit_dialect() {
        let ctx = Context::root(std::rc::Rc::new(PostgresDialect), Options::default());
        assert_eq!(Stmt::Commit.compile(&ctx).unwrap(), Some("COMMIT".to_string()));
    }

    #[test]
    fn create_table_renders_columns() {
        let ctx = Context::root(Dialect::Generic.handler(), Options::default());
        let stmt = Stmt::CreateTable {
            table: users(),
            if_not_exists: true,
        };
        let sql = stmt.compile(&ctx).unwrap().unwrap();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS"));
        assert!(sql.contains("\"id\""));
    }
}
