//! Scalar-valued AST nodes (§4.1): columns, literals, and the lazy operator
//! surface that builds further nodes instead of evaluating anything.

use anyhow::Result;

use crate::ast::resolve::ResolveColumn;
use crate::ast::table::{TableOps, TableRef};
use crate::compiler::{Compilable, Context};
use crate::error::Error;
use crate::schema::ColumnType;

/// A scalar expression node.
///
/// `BinOp` (arithmetic) and `BinBoolOp` (comparison, always `bool`-typed) are
/// merged into one recursive shape tagged by [`ArithOp`]/[`CompareOp`] rather
/// than two near-identical structs, since Rust enums carry the distinction in
/// the tag instead of needing a second type that differs only in its result type.
#[derive(Debug, Clone, enum_as_inner::EnumAsInner)]
pub enum Expr {
    Column {
        source_table: TableRef,
        name: String,
    },
    Alias {
        expr: Box<Expr>,
        name: String,
    },
    Literal(Literal),
    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    IsDistinctFrom(Box<Expr>, Box<Expr>),
    CaseWhen {
        cases: Vec<(Expr, Expr)>,
        else_: Option<Box<Expr>>,
    },
    Func {
        name: String,
        args: Vec<Expr>,
    },
    Count {
        expr: Box<Expr>,
        distinct: bool,
    },
    Concat {
        exprs: Vec<Expr>,
        sep: Option<String>,
    },
    In {
        expr: Box<Expr>,
        list: Vec<Expr>,
    },
    Cast {
        expr: Box<Expr>,
        target_type: String,
    },
    Random,
    /// Bare `*`, unquoted — `Count`'s default argument.
    Star,
    /// `this.foo` before [`resolve_names`](crate::ast::resolve::resolve_names)
    /// has bound it. Reaching compilation in this state is an error (§7).
    Placeholder(ResolveColumn),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn as_sql(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Ge,
    Lt,
    Le,
    /// `=`, used when the right-hand side isn't a null literal.
    Eq,
    /// `IS`, used for null-safe equality (`a == None` in the builder).
    Is,
    Or,
}

impl CompareOp {
    fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Eq => "=",
            CompareOp::Is => "IS",
            CompareOp::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    /// A pre-formatted timestamp literal; this crate does no temporal parsing.
    DateTime(String),
    /// A string that participates in arithmetic (e.g. an IP address or a
    /// UUID with a defined `+`). Compiles the same as `Str`.
    ArithString(String),
    Null,
}

impl Expr {
    pub fn lit(value: impl Into<Literal>) -> Expr {
        Expr::Literal(value.into())
    }

    pub fn null() -> Expr {
        Expr::Literal(Literal::Null)
    }

    fn arith(self, op: ArithOp, other: impl Into<Expr>) -> Expr {
        Expr::Arith {
            op,
            lhs: Box::new(self),
            rhs: Box::new(other.into()),
        }
    }

    fn compare(self, op: CompareOp, other: impl Into<Expr>) -> Expr {
        Expr::Compare {
            op,
            lhs: Box::new(self),
            rhs: Box::new(other.into()),
        }
    }

    pub fn gt(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Gt, other)
    }
    pub fn ge(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Ge, other)
    }
    pub fn lt(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Lt, other)
    }
    pub fn le(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Le, other)
    }

    /// `a == b`: null-safe, compiling to `IS` when `other` is a null literal
    /// and `=` otherwise.
    pub fn eq_expr(self, other: impl Into<Expr>) -> Expr {
        let other = other.into();
        let op = if matches!(other, Expr::Literal(Literal::Null)) {
            CompareOp::Is
        } else {
            CompareOp::Eq
        };
        self.compare(op, other)
    }

    pub fn or_(self, other: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Or, other)
    }

    pub fn is_distinct_from(self, other: impl Into<Expr>) -> Expr {
        Expr::IsDistinctFrom(Box::new(self), Box::new(other.into()))
    }

    pub fn sum_(self) -> Expr {
        Expr::Func {
            name: "SUM".to_string(),
            args: vec![self],
        }
    }

    pub fn cast_to(self, target_type: impl Into<String>) -> Expr {
        Expr::Cast {
            expr: Box::new(self),
            target_type: target_type.into(),
        }
    }

    pub fn alias(self, name: impl Into<String>) -> Expr {
        Expr::Alias {
            expr: Box::new(self),
            name: name.into(),
        }
    }

    pub fn in_(self, list: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self),
            list,
        }
    }

    /// The node's declared type, where derivable. `None` when the source
    /// table's schema is unknown (§3 invariant 1).
    pub fn value_type(&self) -> Result<Option<ColumnType>, Error> {
        match self {
            Expr::Column { source_table, name } => match source_table.schema() {
                Some(schema) => Ok(schema.get(name).cloned()),
                None => Err(Error::invariant(format!(
                    "schema required to get type of column `{name}`"
                ))),
            },
            Expr::Alias { expr, .. } => expr.value_type(),
            Expr::Literal(l) => Ok(l.value_type()),
            Expr::Compare { .. } | Expr::IsDistinctFrom(..) => Ok(Some(ColumnType::Bool)),
            Expr::CaseWhen { cases, else_ } => {
                let mut types: Vec<Option<ColumnType>> = cases
                    .iter()
                    .map(|(_, then)| then.value_type())
                    .collect::<Result<_, _>>()?;
                if let Some(else_) = else_ {
                    types.push(else_.value_type()?);
                }
                let mut unique = types.into_iter();
                let first = unique.next().flatten();
                if unique.all(|t| t == first) {
                    Ok(first)
                } else {
                    Err(Error::invariant("non-matching types in CASE WHEN branches"))
                }
            }
            Expr::Cast { target_type, .. } => Ok(Some(ColumnType::Custom(target_type.clone()))),
            _ => Ok(None),
        }
    }

    #[cfg(test)]
    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Column { .. } | Expr::Literal(_) | Expr::Random | Expr::Star | Expr::Placeholder(_) => vec![],
            Expr::Alias { expr, .. } => vec![expr],
            Expr::Arith { lhs, rhs, .. } | Expr::Compare { lhs, rhs, .. } => vec![lhs, rhs],
            Expr::IsDistinctFrom(a, b) => vec![a, b],
            Expr::CaseWhen { cases, else_ } => {
                let mut out: Vec<&Expr> = cases.iter().flat_map(|(w, t)| [w, t]).collect();
                if let Some(e) = else_ {
                    out.push(e);
                }
                out
            }
            Expr::Func { args, .. } => args.iter().collect(),
            Expr::Count { expr, .. } | Expr::Cast { expr, .. } => vec![expr],
            Expr::In { expr, list } => {
                let mut out = vec![expr.as_ref()];
                out.extend(list.iter());
                out
            }
            Expr::Concat { exprs, .. } => exprs.iter().collect(),
        }
    }

    /// All `_ResolveColumn` placeholders reachable from this node. Mirrors the
    /// DFS that drives `resolve_names`, except that resolution itself needs
    /// `&mut` access to rewrite nodes in place, so the real traversal lives in
    /// [`resolve_names`](crate::ast::resolve::resolve_names) rather than here.
    #[cfg(test)]
    fn placeholder_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        fn walk<'a>(e: &'a Expr, out: &mut Vec<&'a str>) {
            if let Expr::Placeholder(p) = e {
                out.push(p.name());
            }
            for c in e.children() {
                walk(c, out);
            }
        }
        walk(self, &mut out);
        out
    }
}

impl<T: Into<Expr>> std::ops::Add<T> for Expr {
    type Output = Expr;
    fn add(self, rhs: T) -> Expr {
        self.arith(ArithOp::Add, rhs)
    }
}

impl<T: Into<Expr>> std::ops::Sub<T> for Expr {
    type Output = Expr;
    fn sub(self, rhs: T) -> Expr {
        self.arith(ArithOp::Sub, rhs)
    }
}

impl<T: Into<Expr>> std::ops::Mul<T> for Expr {
    type Output = Expr;
    fn mul(self, rhs: T) -> Expr {
        self.arith(ArithOp::Mul, rhs)
    }
}

impl<T: Into<Expr>> std::ops::Div<T> for Expr {
    type Output = Expr;
    fn div(self, rhs: T) -> Expr {
        self.arith(ArithOp::Div, rhs)
    }
}

impl Literal {
    fn value_type(&self) -> Option<ColumnType> {
        match self {
            Literal::Str(_) | Literal::ArithString(_) => Some(ColumnType::Text),
            Literal::Bool(_) => Some(ColumnType::Bool),
            Literal::Int(_) => Some(ColumnType::Int),
            Literal::Float(_) => Some(ColumnType::Float),
            Literal::DateTime(_) => Some(ColumnType::DateTime),
            Literal::Null => None,
        }
    }

    fn compile_sql(&self) -> String {
        match self {
            Literal::Str(s) | Literal::ArithString(s) => quote_string_literal(s),
            Literal::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::DateTime(s) => quote_string_literal(s),
            Literal::Null => "NULL".to_string(),
        }
    }
}

fn quote_string_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

macro_rules! impl_into_expr_literal {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Literal {
            fn from(v: $ty) -> Literal {
                Literal::$variant(v.into())
            }
        }
        impl From<$ty> for Expr {
            fn from(v: $ty) -> Expr {
                Expr::Literal(v.into())
            }
        }
    };
}

impl_into_expr_literal!(bool, Bool);
impl_into_expr_literal!(i64, Int);
impl_into_expr_literal!(i32, Int);
impl_into_expr_literal!(f64, Float);
impl_into_expr_literal!(String, Str);
impl_into_expr_literal!(&str, Str);

impl Compilable for Expr {
    fn compile(&self, ctx: &Context) -> Result<String> {
        log::trace!("compiling expr {self:?}");
        let sql = match self {
            Expr::Column { source_table, name } => ctx.compile_column(source_table, name)?,
            Expr::Alias { expr, name } => format!("{} AS {}", expr.compile(ctx)?, ctx.quote(name)),
            Expr::Literal(l) => l.compile_sql(),
            Expr::Arith { op, lhs, rhs } => {
                format!("({} {} {})", lhs.compile(ctx)?, op.as_sql(), rhs.compile(ctx)?)
            }
            Expr::Compare { op, lhs, rhs } => {
                format!("({} {} {})", lhs.compile(ctx)?, op.as_sql(), rhs.compile(ctx)?)
            }
            Expr::IsDistinctFrom(a, b) => {
                ctx.dialect().is_distinct_from(&a.compile(ctx)?, &b.compile(ctx)?)
            }
            Expr::CaseWhen { cases, else_ } => {
                if cases.is_empty() {
                    return Err(Error::invariant("CASE WHEN requires at least one case").into());
                }
                let when_thens = cases
                    .iter()
                    .map(|(when, then)| -> Result<String> {
                        Ok(format!("WHEN {} THEN {}", when.compile(ctx)?, then.compile(ctx)?))
                    })
                    .collect::<Result<Vec<_>>>()?
                    .join(" ");
                let else_sql = match else_ {
                    Some(e) => format!(" ELSE {}", e.compile(ctx)?),
                    None => String::new(),
                };
                format!("CASE {when_thens}{else_sql} END")
            }
            Expr::Func { name, args } => {
                let args = args
                    .iter()
                    .map(|a| a.compile(ctx))
                    .collect::<Result<Vec<_>>>()?
                    .join(", ");
                format!("{name}({args})")
            }
            Expr::Count { expr, distinct } => {
                let inner = expr.compile(ctx)?;
                if *distinct {
                    format!("count(distinct {inner})")
                } else {
                    format!("count({inner})")
                }
            }
            Expr::Concat { exprs, sep } => compile_concat(exprs, sep.as_deref(), ctx)?,
            Expr::In { expr, list } => {
                let elems = list
                    .iter()
                    .map(|e| e.compile(ctx))
                    .collect::<Result<Vec<_>>>()?
                    .join(", ");
                format!("({} IN ({elems}))", expr.compile(ctx)?)
            }
            Expr::Cast { expr, target_type } => {
                format!("cast({} as {target_type})", expr.compile(ctx)?)
            }
            Expr::Random => ctx.dialect().random(),
            Expr::Star => "*".to_string(),
            Expr::Placeholder(p) => return Err(Error::unresolved(p.name()).into()),
        };
        Ok(sql)
    }
}

/// Wraps each argument in `coalesce(to_string(expr), '<null>')`, since on some
/// databases `concat('a', NULL)` collapses the whole result to `NULL`; with a
/// single item, returns the coalesced item unchanged instead of delegating to
/// the adapter's variadic concat.
fn compile_concat(exprs: &[Expr], sep: Option<&str>, ctx: &Context) -> Result<String> {
    if exprs.is_empty() {
        return Err(Error::invariant("Concat requires at least one expression").into());
    }
    let items = exprs
        .iter()
        .map(|e| -> Result<String> {
            let compiled = e.compile(ctx)?;
            Ok(format!("coalesce({}, '<null>')", ctx.dialect().to_string_expr(&compiled)))
        })
        .collect::<Result<Vec<_>>>()?;

    if items.len() == 1 {
        return Ok(items.into_iter().next().unwrap());
    }

    let items: Vec<String> = match sep {
        Some(sep) => itertools::Itertools::intersperse(items.into_iter(), format!("'{sep}'")).collect(),
        None => items,
    };
    Ok(ctx.dialect().concat(&items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::table::TablePath;

    fn users() -> TableRef {
        TablePath::at(vec!["users".to_string()], None)
    }

    #[test]
    fn eq_with_null_compiles_to_is() {
        let e = users().get("age").unwrap().eq_expr(Expr::null());
        assert!(matches!(e, Expr::Compare { op: CompareOp::Is, .. }));
    }

    #[test]
    fn eq_with_value_compiles_to_eq() {
        let e = users().get("age").unwrap().eq_expr(18);
        assert!(matches!(e, Expr::Compare { op: CompareOp::Eq, .. }));
    }

    #[test]
    fn case_when_requires_matching_types() {
        let bad = Expr::CaseWhen {
            cases: vec![(Expr::lit(true), Expr::lit("a")), (Expr::lit(false), Expr::lit(1i64))],
            else_: None,
        };
        assert!(bad.value_type().is_err());
    }

    #[test]
    fn finds_nested_placeholder_names() {
        let e = crate::ast::resolve::THIS
            .col("a")
            .gt(crate::ast::resolve::THIS.col("b"));
        assert_eq!(e.placeholder_names(), vec!["a", "b"]);
    }
}
