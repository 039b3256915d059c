//! Table-valued AST nodes (§4.2, §4.4–§4.7): the relational half of the tree.
//!
//! Every node owns (or points to) the table it was built from, the same way
//! the source's `ITable` subclasses carried a `source_table` pointer back to
//! themselves; here that's `Rc<TableNode>` rather than a raw self-reference,
//! since a shared owner is exactly what an `Rc` is for.

use std::rc::Rc;

use anyhow::Result;

use crate::ast::expr::Expr;
use crate::ast::resolve::resolve_names;
use crate::ast::{drop_skips, Stmt};
use crate::compiler::{Compilable, Context};
use crate::error::Error;
use crate::schema::{DbPath, Schema};

/// Shared handle to a table node. Builder methods take `&TableRef` and return
/// a fresh `TableRef` wrapping it — nodes are immutable once built.
pub type TableRef = Rc<TableNode>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionKind {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl UnionKind {
    fn as_sql(self) -> &'static str {
        match self {
            UnionKind::Union => "UNION",
            UnionKind::UnionAll => "UNION ALL",
            UnionKind::Intersect => "INTERSECT",
            UnionKind::Except => "EXCEPT",
        }
    }
}

#[derive(Debug, enum_as_inner::EnumAsInner)]
pub enum TableNode {
    Path {
        path: DbPath,
        schema: Option<Schema>,
    },
    Alias {
        table: TableRef,
        name: String,
    },
    Select {
        table: TableRef,
        select: Option<Vec<Expr>>,
        where_: Vec<Expr>,
        order_by: Vec<Expr>,
        limit: Option<i64>,
        distinct: bool,
    },
    Join {
        left: TableRef,
        right: TableRef,
        kind: JoinKind,
        on: Vec<Expr>,
        select: Option<Vec<Expr>>,
    },
    Union {
        kind: UnionKind,
        tables: Vec<TableRef>,
    },
    Cte {
        table: TableRef,
        name: String,
    },
}

/// Convenience constructor so call sites don't spell out `Rc::new` themselves.
pub struct TablePath;

impl TablePath {
    pub fn at(path: DbPath, schema: Option<Schema>) -> TableRef {
        Rc::new(TableNode::Path { path, schema })
    }
}

/// The fluent builder surface, implemented for every [`TableRef`].
///
/// `select`/`where`/`order_by` take `Vec<Option<Expr>>` rather than a
/// variadic list peppered with a `SKIP` sentinel (see
/// [`drop_skips`](crate::ast::drop_skips)); pass `None` for an argument you'd
/// otherwise omit.
pub trait TableOps {
    fn source_table(&self) -> TableRef;
    fn schema(&self) -> Option<Schema>;

    /// A single column reference bound to this table, replacing the indexing
    /// (`table["col"]`) the source used — Rust's `Index` requires an
    /// infallible, fixed-`Output` lookup, which a schema-less table can't offer.
    fn get(&self, name: &str) -> Result<Expr, Error>;

    fn select(&self, exprs: Vec<Option<Expr>>) -> Result<TableRef, Error>;
    fn select_concat(&self, exprs: Vec<Option<Expr>>) -> Result<TableRef, Error>;
    fn r#where(&self, exprs: Vec<Option<Expr>>) -> Result<TableRef, Error>;
    fn order_by(&self, exprs: Vec<Option<Expr>>) -> Result<TableRef, Error>;
    fn limit(&self, n: i64) -> Result<TableRef, Error>;
    fn distinct(&self) -> Result<TableRef, Error>;

    fn join(&self, other: TableRef, kind: JoinKind, on: Vec<Expr>) -> TableRef;
    /// Appends conditions to an existing `Join`'s `on` clause. Errors if `self`
    /// isn't a `Join`.
    fn on(&self, exprs: Vec<Expr>) -> Result<TableRef, Error>;
    fn union(&self, other: TableRef, kind: UnionKind) -> Result<TableRef, Error>;
    fn count(&self) -> TableRef;
    fn alias(&self, name: impl Into<String>) -> TableRef;
    fn cte(&self, name: impl Into<String>) -> TableRef;

    /// Reserved surface area (§9); fails with [`Error::not_implemented`].
    fn group_by(&self, _exprs: Vec<Expr>) -> Result<TableRef, Error> {
        Err(Error::not_implemented("group_by"))
    }
    /// Reserved surface area (§9); fails with [`Error::not_implemented`].
    fn insert_values(&self, _columns: Vec<String>, _rows: Vec<Vec<Expr>>) -> Result<Stmt, Error> {
        Err(Error::not_implemented("insert_values"))
    }
    /// Reserved surface area (§9); fails with [`Error::not_implemented`].
    fn with_schema(&self, _schema: Schema) -> Result<TableRef, Error> {
        Err(Error::not_implemented("with_schema"))
    }
    /// Reserved surface area (§9), time-travel queries; fails with [`Error::not_implemented`].
    fn at(&self, _timestamp: impl Into<String>) -> Result<TableRef, Error> {
        Err(Error::not_implemented("at"))
    }
}

impl TableOps for TableRef {
    fn source_table(&self) -> TableRef {
        Rc::clone(self)
    }

    fn schema(&self) -> Option<Schema> {
        match self.as_ref() {
            TableNode::Path { schema, .. } => schema.clone(),
            TableNode::Alias { table, .. } | TableNode::Cte { table, .. } => table.schema(),
            TableNode::Select { select: Some(exprs), .. } => schema_from_projection(exprs),
            TableNode::Select { select: None, table, .. } => table.schema(),
            TableNode::Join { select: Some(exprs), .. } => schema_from_projection(exprs),
            TableNode::Join { .. } => None,
            TableNode::Union { tables, .. } => tables.first().and_then(|t| t.schema()),
        }
    }

    fn get(&self, name: &str) -> Result<Expr, Error> {
        let actual_name = match self.schema() {
            Some(schema) => {
                if schema.get(name).is_none() {
                    return Err(Error::unresolved(name)
                        .with_help(format!("no such column on this table's schema: {name}")));
                }
                schema.get_key(name)
            }
            None => name.to_string(),
        };
        Ok(Expr::Column {
            source_table: self.source_table(),
            name: actual_name,
        })
    }

    fn select(&self, exprs: Vec<Option<Expr>>) -> Result<TableRef, Error> {
        select_into(self, drop_skips(exprs), false)
    }

    fn select_concat(&self, exprs: Vec<Option<Expr>>) -> Result<TableRef, Error> {
        select_into(self, drop_skips(exprs), true)
    }

    fn r#where(&self, exprs: Vec<Option<Expr>>) -> Result<TableRef, Error> {
        let mut exprs = drop_skips(exprs);
        resolve_names(&self.source_table(), &mut exprs);
        Select::make(self, SelectEdit::Where(exprs))
    }

    fn order_by(&self, exprs: Vec<Option<Expr>>) -> Result<TableRef, Error> {
        let mut exprs = drop_skips(exprs);
        resolve_names(&self.source_table(), &mut exprs);
        Select::make(self, SelectEdit::OrderBy(exprs))
    }

    fn limit(&self, n: i64) -> Result<TableRef, Error> {
        Select::make(self, SelectEdit::Limit(n))
    }

    fn distinct(&self) -> Result<TableRef, Error> {
        Select::make(self, SelectEdit::Distinct)
    }

    fn join(&self, other: TableRef, kind: JoinKind, on: Vec<Expr>) -> TableRef {
        Rc::new(TableNode::Join {
            left: self.source_table(),
            right: other,
            kind,
            on,
            select: None,
        })
    }

    fn on(&self, exprs: Vec<Expr>) -> Result<TableRef, Error> {
        match self.as_ref() {
            TableNode::Join {
                left,
                right,
                kind,
                on,
                select,
            } => {
                let mut on = on.clone();
                on.extend(exprs);
                Ok(Rc::new(TableNode::Join {
                    left: Rc::clone(left),
                    right: Rc::clone(right),
                    kind: *kind,
                    on,
                    select: select.clone(),
                }))
            }
            _ => Err(Error::simple("`on` can only be called on a join")),
        }
    }

    fn union(&self, other: TableRef, kind: UnionKind) -> Result<TableRef, Error> {
        if let (Some(a), Some(b)) = (self.schema(), other.schema()) {
            if a.len() != b.len() {
                return Err(Error::invariant("union branches have differing column counts"));
            }
        }
        let tables = match self.as_ref() {
            TableNode::Union { kind: k, tables } if *k == kind => {
                let mut tables = tables.clone();
                tables.push(other);
                tables
            }
            _ => vec![self.source_table(), other],
        };
        Ok(Rc::new(TableNode::Union { kind, tables }))
    }

    fn count(&self) -> TableRef {
        let count_expr = Expr::Count {
            expr: Box::new(Expr::Star),
            distinct: false,
        };
        Rc::new(TableNode::Select {
            table: self.source_table(),
            select: Some(vec![count_expr]),
            where_: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            distinct: false,
        })
    }

    fn alias(&self, name: impl Into<String>) -> TableRef {
        Rc::new(TableNode::Alias {
            table: self.source_table(),
            name: name.into(),
        })
    }

    fn cte(&self, name: impl Into<String>) -> TableRef {
        Rc::new(TableNode::Cte {
            table: self.source_table(),
            name: name.into(),
        })
    }
}

fn schema_from_projection(exprs: &[Expr]) -> Option<Schema> {
    let mut columns = Vec::with_capacity(exprs.len());
    for e in exprs {
        let name = match e {
            Expr::Alias { name, .. } => name.clone(),
            Expr::Column { name, .. } => name.clone(),
            _ => return None,
        };
        let ty = e.value_type().ok().flatten()?;
        columns.push((name, ty));
    }
    Some(Schema::new(columns))
}

/// The field a builder call is attempting to set, used by [`Select::make`]'s
/// merge policy: wrap if `table` isn't already a bare `Select`, overwrite if
/// the field is unset, concatenate only for `select` under `select_concat`,
/// error otherwise.
enum SelectEdit {
    Select { exprs: Vec<Expr>, concat: bool },
    Where(Vec<Expr>),
    OrderBy(Vec<Expr>),
    Limit(i64),
    Distinct,
}

fn select_into(table: &TableRef, mut exprs: Vec<Expr>, concat: bool) -> Result<TableRef, Error> {
    resolve_names(&table.source_table(), &mut exprs);

    // A plain (non-concat) `select` on a `Join` sets/replaces its own
    // projection in place rather than wrapping it in a new `Select` (§3
    // invariant 6); `select_concat` still falls through to the generic path.
    if !concat {
        if let TableNode::Join {
            left,
            right,
            kind,
            on,
            ..
        } = table.as_ref()
        {
            return Ok(Rc::new(TableNode::Join {
                left: Rc::clone(left),
                right: Rc::clone(right),
                kind: *kind,
                on: on.clone(),
                select: Some(exprs),
            }));
        }
    }
    Select::make(table, SelectEdit::Select { exprs, concat })
}

struct Select;

impl Select {
    fn make(table: &TableRef, edit: SelectEdit) -> Result<TableRef, Error> {
        match table.as_ref() {
            TableNode::Select {
                table: inner,
                select,
                where_,
                order_by,
                limit,
                distinct,
            } => {
                let mut select = select.clone();
                let mut where_ = where_.clone();
                let mut order_by = order_by.clone();
                let mut limit = *limit;
                let mut distinct = *distinct;
                match edit {
                    SelectEdit::Select { exprs, concat } => {
                        select = Some(match (select, concat) {
                            (Some(mut existing), true) => {
                                existing.extend(exprs);
                                existing
                            }
                            (Some(_), false) => return Err(Error::merge_conflict("select")),
                            (None, _) => exprs,
                        });
                    }
                    SelectEdit::Where(exprs) => where_.extend(exprs),
                    SelectEdit::OrderBy(exprs) => order_by.extend(exprs),
                    SelectEdit::Limit(n) => {
                        if limit.is_some() {
                            return Err(Error::merge_conflict("limit"));
                        }
                        limit = Some(n);
                    }
                    SelectEdit::Distinct => distinct = true,
                }
                Ok(Rc::new(TableNode::Select {
                    table: Rc::clone(inner),
                    select,
                    where_,
                    order_by,
                    limit,
                    distinct,
                }))
            }
            _ => {
                let mut node = TableNode::Select {
                    table: table.source_table(),
                    select: None,
                    where_: Vec::new(),
                    order_by: Vec::new(),
                    limit: None,
                    distinct: false,
                };
                if let TableNode::Select {
                    select,
                    where_,
                    order_by,
                    limit,
                    distinct,
                    ..
                } = &mut node
                {
                    match edit {
                        SelectEdit::Select { exprs, .. } => *select = Some(exprs),
                        SelectEdit::Where(exprs) => *where_ = exprs,
                        SelectEdit::OrderBy(exprs) => *order_by = exprs,
                        SelectEdit::Limit(n) => *limit = Some(n),
                        SelectEdit::Distinct => *distinct = true,
                    }
                }
                Ok(Rc::new(node))
            }
        }
    }
}

impl Compilable for TableRef {
    fn compile(&self, ctx: &Context) -> Result<String> {
        log::debug!("compiling table {self:?}");
        match self.as_ref() {
            TableNode::Path { path, .. } => Ok(ctx.dialect().compile_path(path)),
            TableNode::Alias { table, name } => {
                let inner = ctx.compile_derived(table)?;
                Ok(format!("{inner} AS {}", ctx.quote(name)))
            }
            TableNode::Select {
                table,
                select,
                where_,
                order_by,
                limit,
                distinct,
            } => compile_select(ctx, table, select.as_deref(), where_, order_by, *limit, *distinct),
            TableNode::Join {
                left,
                right,
                kind,
                on,
                select,
            } => compile_join(ctx, left, right, *kind, on, select.as_deref()),
            TableNode::Union { kind, tables } => compile_union(ctx, *kind, tables),
            TableNode::Cte { table, name } => ctx.compile_cte(table, name),
        }
    }
}

fn compile_select(
    ctx: &Context,
    table: &TableRef,
    select: Option<&[Expr]>,
    where_: &[Expr],
    order_by: &[Expr],
    limit: Option<i64>,
    distinct: bool,
) -> Result<String> {
    let inner_ctx = ctx.entering_select();
    let from = inner_ctx.compile_from(table)?;

    let select_sql = match select {
        Some(exprs) if !exprs.is_empty() => exprs
            .iter()
            .map(|e| e.compile(&inner_ctx))
            .collect::<Result<Vec<_>>>()?
            .join(", "),
        _ => "*".to_string(),
    };

    let mut sql = format!(
        "SELECT {}{select_sql} FROM {from}",
        if distinct { "DISTINCT " } else { "" }
    );

    if !where_.is_empty() {
        let clauses = where_
            .iter()
            .map(|e| e.compile(&inner_ctx))
            .collect::<Result<Vec<_>>>()?
            .join(" AND ");
        sql.push_str(&format!(" WHERE {clauses}"));
    }
    if !order_by.is_empty() {
        let clauses = order_by
            .iter()
            .map(|e| e.compile(&inner_ctx))
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        sql.push_str(&format!(" ORDER BY {clauses}"));
    }
    if let Some(n) = limit {
        sql.push_str(&format!(" {}", ctx.dialect().offset_limit(None, Some(n))));
    }
    Ok(sql)
}

fn compile_join(
    ctx: &Context,
    left: &TableRef,
    right: &TableRef,
    kind: JoinKind,
    on: &[Expr],
    select: Option<&[Expr]>,
) -> Result<String> {
    let inner_ctx = ctx.entering_join();
    let left_sql = inner_ctx.compile_from(left)?;
    let right_sql = inner_ctx.compile_from(right)?;
    let on_sql = on
        .iter()
        .map(|e| e.compile(&inner_ctx))
        .collect::<Result<Vec<_>>>()?
        .join(" AND ");
    let from = format!("{left_sql} {} {right_sql} ON {on_sql}", kind.as_sql());

    let select_sql = match select {
        Some(exprs) if !exprs.is_empty() => exprs
            .iter()
            .map(|e| e.compile(&inner_ctx))
            .collect::<Result<Vec<_>>>()?
            .join(", "),
        _ => "*".to_string(),
    };
    Ok(format!("SELECT {select_sql} FROM {from}"))
}

fn compile_union(ctx: &Context, kind: UnionKind, tables: &[TableRef]) -> Result<String> {
    if tables.is_empty() {
        return Err(Error::invariant("union requires at least one table").into());
    }
    let parts = tables
        .iter()
        .map(|t| ctx.compile_derived(t))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(&format!(" {} ", kind.as_sql())))
}

/// Builds the `CREATE TABLE`/`DROP TABLE`/`INSERT`/`COMMIT` statements that
/// operate on a table reference as their target, rather than producing SQL
/// that reads *from* it.
pub fn as_target(table: &TableRef) -> Stmt {
    Stmt::CreateTable {
        table: Rc::clone(table),
        if_not_exists: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{Dialect, Options};

    fn users() -> TableRef {
        TablePath::at(
            vec!["users".to_string()],
            Some(Schema::new(vec![
                ("id".to_string(), crate::schema::ColumnType::Int),
                ("age".to_string(), crate::schema::ColumnType::Int),
            ])),
        )
    }

    #[test]
    fn select_wraps_bare_table() {
        let t = users().select(vec![Some(users().get("id").unwrap())]).unwrap();
        assert!(matches!(t.as_ref(), TableNode::Select { .. }));
    }

    #[test]
    fn repeated_where_merges_in_place() {
        let t = users()
            .r#where(vec![Some(crate::ast::resolve::THIS.col("age").gt(1))])
            .unwrap();
        let t = t
            .r#where(vec![Some(crate::ast::resolve::THIS.col("age").lt(99))])
            .unwrap();
        match t.as_ref() {
            TableNode::Select { where_, .. } => assert_eq!(where_.len(), 2),
            other => panic!("expected Select, got {other:?}"),
        }
    }

    #[test]
    fn double_select_without_concat_errors() {
        let t = users().select(vec![Some(users().get("id").unwrap())]).unwrap();
        let err = t.select(vec![Some(users().get("age").unwrap())]);
        assert!(err.is_err());
    }

    #[test]
    fn compiles_simple_select() {
        let t = users()
            .r#where(vec![Some(crate::ast::resolve::THIS.col("age").gt(18))])
            .unwrap();
        let ctx = Context::root(Dialect::Generic.handler(), Options::default());
        let sql = t.compile(&ctx).unwrap();
        assert!(sql.contains("WHERE"));
        assert!(sql.contains("users"));
    }
}
