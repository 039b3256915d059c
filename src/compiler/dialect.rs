//! The pluggable dialect adapter (§4.8).
//!
//! `Dialect` is a closed enum a caller picks from; `.handler()` resolves it to
//! a `Rc<dyn DialectHandler>` so the compiler never has to match on the enum
//! itself again. Most SQL is dialect-neutral and lives in the default trait
//! methods; a concrete dialect overrides only the handful of operations that
//! actually vary across engines.

use std::rc::Rc;

use crate::schema::{ColumnType, DbPath};

pub trait DialectHandler: std::fmt::Debug {
    fn ident_quote_char(&self) -> char {
        '"'
    }

    fn quote(&self, name: &str) -> String {
        let q = self.ident_quote_char();
        let doubled = q.to_string().repeat(2);
        format!("{q}{}{q}", name.replace(q, &doubled))
    }

    fn compile_path(&self, path: &DbPath) -> String {
        path.iter().map(|p| self.quote(p)).collect::<Vec<_>>().join(".")
    }

    fn is_distinct_from(&self, a: &str, b: &str) -> String {
        format!("({a} IS DISTINCT FROM {b})")
    }

    fn to_string_expr(&self, expr: &str) -> String {
        format!("cast({expr} as varchar)")
    }

    fn concat(&self, items: &[String]) -> String {
        format!("concat({})", items.join(", "))
    }

    fn offset_limit(&self, offset: Option<i64>, limit: Option<i64>) -> String {
        match (offset, limit) {
            (None, Some(limit)) => format!("LIMIT {limit}"),
            (Some(offset), Some(limit)) => format!("LIMIT {limit} OFFSET {offset}"),
            (Some(offset), None) => format!("OFFSET {offset}"),
            (None, None) => String::new(),
        }
    }

    fn random(&self) -> String {
        "random()".to_string()
    }

    fn type_repr(&self, ty: &ColumnType) -> String {
        match ty {
            ColumnType::Int => "INTEGER".to_string(),
            ColumnType::Float => "DOUBLE PRECISION".to_string(),
            ColumnType::Bool => "BOOLEAN".to_string(),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::DateTime => "TIMESTAMP".to_string(),
            ColumnType::Decimal => "DECIMAL".to_string(),
            ColumnType::Custom(name) => name.clone(),
        }
    }

    /// Whether `COMMIT` is a no-op on this engine's default connection mode.
    /// `Stmt::Commit` compiles to `None` (omitted entirely) when this is `true`.
    fn is_autocommit(&self) -> bool {
        true
    }

    fn supports_if_not_exists(&self) -> bool {
        true
    }
}

#[derive(Debug, Default)]
pub struct GenericDialect;
impl DialectHandler for GenericDialect {}

#[derive(Debug, Default)]
pub struct PostgresDialect;
impl DialectHandler for PostgresDialect {
    fn is_autocommit(&self) -> bool {
        false
    }
}

#[derive(Debug, Default)]
pub struct MySqlDialect;
impl DialectHandler for MySqlDialect {
    fn ident_quote_char(&self) -> char {
        '`'
    }

    fn is_distinct_from(&self, a: &str, b: &str) -> String {
        format!("(NOT ({a} <=> {b}))")
    }

    fn to_string_expr(&self, expr: &str) -> String {
        format!("CAST({expr} AS CHAR)")
    }

    fn random(&self) -> String {
        "RAND()".to_string()
    }

    fn is_autocommit(&self) -> bool {
        true
    }
}

#[derive(Debug, Default)]
pub struct SqliteDialect;
impl DialectHandler for SqliteDialect {
    fn is_distinct_from(&self, a: &str, b: &str) -> String {
        format!("({a} IS NOT {b})")
    }

    fn random(&self) -> String {
        "RANDOM()".to_string()
    }

    fn offset_limit(&self, offset: Option<i64>, limit: Option<i64>) -> String {
        match (offset, limit) {
            (Some(offset), None) => format!("LIMIT -1 OFFSET {offset}"),
            other => {
                let (offset, limit) = other;
                GenericDialect.offset_limit(offset, limit)
            }
        }
    }

    fn supports_if_not_exists(&self) -> bool {
        true
    }
}

/// The set of backends this crate knows how to target.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::EnumVariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum Dialect {
    Generic,
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn handler(&self) -> Rc<dyn DialectHandler> {
        match self {
            Dialect::Generic => Rc::new(GenericDialect),
            Dialect::Postgres => Rc::new(PostgresDialect),
            Dialect::MySql => Rc::new(MySqlDialect),
            Dialect::Sqlite => Rc::new(SqliteDialect),
        }
    }
}
