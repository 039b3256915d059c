//! Late-bound column references (§4.3).
//!
//! A builder closure receives no table argument; instead it writes `this.col("x")`
//! and gets back a [`Expr::Placeholder`] that names the column but doesn't yet
//! know which table it belongs to. [`resolve_names`] walks the resulting
//! expression tree exactly once, just before the node that owns it is
//! compiled, and rewrites every placeholder into a real [`Expr::Column`]
//! bound to that node's own source table.

use crate::ast::expr::Expr;
use crate::ast::table::{TableOps, TableRef};

/// An unbound `this.foo` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveColumn {
    name: String,
}

impl ResolveColumn {
    pub fn new(name: impl Into<String>) -> Self {
        ResolveColumn { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Marker used as the receiver for lazy column references inside a builder
/// closure, e.g. `|_| This.col("amount").gt(0)`. It carries no state of its
/// own — every method just stamps out a [`Expr::Placeholder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct This;

impl This {
    pub fn col(self, name: impl Into<String>) -> Expr {
        Expr::Placeholder(ResolveColumn::new(name.into()))
    }

    pub fn cols<I, S>(self, names: I) -> Vec<Expr>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().map(|n| self.col(n)).collect()
    }
}

/// The canonical [`This`] value; builder closures take it as their single argument.
pub const THIS: This = This;

/// Binds every unresolved placeholder in `exprs` to `source_table`, in place.
///
/// Does not descend into a [`Expr::Column`]'s own `source_table` — that table
/// is already resolved, and re-walking it would rebind placeholders that
/// belong to an outer scope's closure, not this one.
pub fn resolve_names(source_table: &TableRef, exprs: &mut [Expr]) {
    for expr in exprs {
        resolve_one(source_table, expr);
    }
}

fn resolve_one(source_table: &TableRef, expr: &mut Expr) {
    match expr {
        Expr::Placeholder(p) => {
            let raw_name = p.name();
            let name = match source_table.schema() {
                Some(schema) => schema.get_key(raw_name),
                None => raw_name.to_string(),
            };
            log::debug!("resolving `this.{raw_name}` against {source_table:?} as `{name}`");
            *expr = Expr::Column {
                source_table: source_table.clone(),
                name,
            };
        }
        Expr::Column { .. } | Expr::Literal(_) | Expr::Random | Expr::Star => {}
        Expr::Alias { expr, .. } | Expr::Count { expr, .. } | Expr::Cast { expr, .. } => {
            resolve_one(source_table, expr)
        }
        Expr::Arith { lhs, rhs, .. } | Expr::Compare { lhs, rhs, .. } => {
            resolve_one(source_table, lhs);
            resolve_one(source_table, rhs);
        }
        Expr::IsDistinctFrom(a, b) => {
            resolve_one(source_table, a);
            resolve_one(source_table, b);
        }
        Expr::CaseWhen { cases, else_ } => {
            for (when, then) in cases {
                resolve_one(source_table, when);
                resolve_one(source_table, then);
            }
            if let Some(else_) = else_ {
                resolve_one(source_table, else_);
            }
        }
        Expr::Func { args, .. } | Expr::Concat { exprs: args, .. } => {
            for a in args {
                resolve_one(source_table, a);
            }
        }
        Expr::In { expr, list } => {
            resolve_one(source_table, expr);
            for a in list {
                resolve_one(source_table, a);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::table::TablePath;

    #[test]
    fn resolves_placeholder_to_column() {
        let table = TablePath::at(vec!["users".to_string()], None);
        let mut exprs = vec![THIS.col("age").gt(18)];
        resolve_names(&table, &mut exprs);
        match &exprs[0] {
            Expr::Compare { lhs, .. } => match lhs.as_ref() {
                Expr::Column { name, .. } => assert_eq!(name, "age"),
                other => panic!("expected Column, got {other:?}"),
            },
            other => panic!("expected Compare, got {other:?}"),
        }
    }

    #[test]
    fn resolves_placeholder_to_schemas_actual_casing() {
        use crate::schema::{ColumnType, Schema};

        let table = TablePath::at(
            vec!["users".to_string()],
            Some(Schema::new(vec![("Name".to_string(), ColumnType::Text)]).case_insensitive()),
        );
        let mut exprs = vec![THIS.col("name")];
        resolve_names(&table, &mut exprs);
        match &exprs[0] {
            Expr::Column { name, .. } => assert_eq!(name, "Name"),
            other => panic!("expected Column, got {other:?}"),
        }
    }

    #[test]
    fn does_not_resolve_already_bound_column() {
        let outer = TablePath::at(vec!["outer".to_string()], None);
        let inner = TablePath::at(vec!["inner".to_string()], None);
        let mut exprs = vec![Expr::Column {
            source_table: inner.clone(),
            name: "id".to_string(),
        }];
        resolve_names(&outer, &mut exprs);
        match &exprs[0] {
            Expr::Column { source_table, .. } => assert!(std::rc::Rc::ptr_eq(source_table, &inner)),
            other => panic!("expected Column, got {other:?}"),
        }
    }
}
