//! Error type for this crate.
//!
//! Unlike the teacher crate's `error.rs`, there is no parser here, so there's
//! no source text to annotate with spans — `Reason` carries just enough
//! structure for a caller to match on the failure kind, and `Display`
//! produces a human-readable message naming the offending entity.

pub use anyhow::Result;

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone)]
pub struct Error {
    pub reason: Reason,
    pub help: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Reason {
    Simple(String),
    /// A builder call expected `expected` but found `found` (e.g. indexing a
    /// table with a non-string key).
    Expected { expected: String, found: String },
    /// `Select::make` (or `Join::select`) was asked to overwrite an
    /// already-set attribute without `_concat`.
    MergeConflict { attr: String },
    /// A `_ResolveColumn` placeholder reached compilation unresolved.
    Unresolved { name: String },
    /// A `Column` matched more than one `TableAlias` in scope.
    Ambiguous { name: String },
    /// `BinOp` arity, `Union`/`Join` schema width, or `CaseWhen` branch type
    /// mismatches.
    InvariantViolation(String),
    /// `insert_values`, `group_by`, `with_schema`, `at`: reserved surface.
    NotImplemented { what: String },
}

impl Error {
    pub fn new(reason: Reason) -> Self {
        Error { reason, help: None }
    }

    pub fn with_help<S: Into<String>>(mut self, help: S) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn simple<S: Into<String>>(message: S) -> Self {
        Error::new(Reason::Simple(message.into()))
    }

    pub fn unresolved(name: impl Into<String>) -> Self {
        Error::new(Reason::Unresolved { name: name.into() })
    }

    pub fn ambiguous(name: impl Into<String>) -> Self {
        Error::new(Reason::Ambiguous { name: name.into() })
    }

    pub fn merge_conflict(attr: impl Into<String>) -> Self {
        Error::new(Reason::MergeConflict { attr: attr.into() })
    }

    pub fn not_implemented(what: impl Into<String>) -> Self {
        Error::new(Reason::NotImplemented { what: what.into() })
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Error::new(Reason::InvariantViolation(message.into()))
    }
}

impl Reason {
    fn message(&self) -> String {
        match self {
            Reason::Simple(text) => text.clone(),
            Reason::Expected { expected, found } => {
                format!("expected {expected}, but found {found}")
            }
            Reason::MergeConflict { attr } => {
                format!("`{attr}` is already set on this select; pass _concat to append")
            }
            Reason::Unresolved { name } => format!("column not resolved: {name}"),
            Reason::Ambiguous { name } => format!("ambiguous reference to column `{name}`"),
            Reason::InvariantViolation(msg) => msg.clone(),
            Reason::NotImplemented { what } => format!("`{what}` is not implemented"),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason.message())?;
        if let Some(help) = &self.help {
            write!(f, " ({help})")?;
        }
        Ok(())
    }
}

impl StdError for Error {}

pub trait WithErrorInfo {
    fn with_help<S: Into<String>>(self, help: S) -> Self;
}

impl<T> WithErrorInfo for Result<T, Error> {
    fn with_help<S: Into<String>>(self, help: S) -> Self {
        self.map_err(|e| e.with_help(help))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_help() {
        let e = Error::unresolved("age").with_help("call .select()/.where() to resolve it");
        assert_eq!(
            e.to_string(),
            "column not resolved: age (call .select()/.where() to resolve it)"
        );
    }
}
