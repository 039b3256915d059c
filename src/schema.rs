//! Table schemas: an ordered, case-aware mapping from column name to declared type.

use serde::{Deserialize, Serialize};

/// A dotted table path, e.g. `["db", "users"]` compiles to `` `db`.`users` ``.
pub type DbPath = Vec<String>;

/// Declared SQL type of a column, used for `Column::value_type` and DDL rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    Text,
    DateTime,
    Decimal,
    /// A type the adapter doesn't have a dedicated variant for; rendered verbatim.
    Custom(String),
}

/// Ordered, optionally case-insensitive mapping from column name to [`ColumnType`].
///
/// Ordering matters: a [`Select`](crate::ast::table::Select) or
/// [`Join`](crate::ast::table::Join) derives its own schema from the order its
/// columns were projected in, and callers may rely on that order (e.g. to
/// zip against a row tuple).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<(String, ColumnType)>,
    case_sensitive: bool,
}

impl Schema {
    pub fn new(columns: Vec<(String, ColumnType)>) -> Self {
        Schema {
            columns,
            case_sensitive: true,
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn matches(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }

    /// Returns the schema's own spelling of `name`, honoring case sensitivity.
    /// Falls back to `name` verbatim if not found (the caller is expected to
    /// fail later, at compile or type-lookup time, if that matters).
    pub fn get_key(&self, name: &str) -> String {
        self.columns
            .iter()
            .find(|(k, _)| self.matches(k, name))
            .map(|(k, _)| k.clone())
            .unwrap_or_else(|| name.to_string())
    }

    pub fn get(&self, name: &str) -> Option<&ColumnType> {
        self.columns
            .iter()
            .find(|(k, _)| self.matches(k, name))
            .map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ColumnType)> {
        self.columns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_lookup() {
        let schema = Schema::new(vec![("Name".into(), ColumnType::Text)]).case_insensitive();
        assert_eq!(schema.get_key("name"), "Name");
        assert_eq!(schema.get("NAME"), Some(&ColumnType::Text));
    }

    #[test]
    fn case_sensitive_lookup_misses() {
        let schema = Schema::new(vec![("Name".into(), ColumnType::Text)]);
        assert_eq!(schema.get_key("name"), "name");
        assert_eq!(schema.get("name"), None);
    }

    #[test]
    fn schema_round_trips_through_json() {
        let schema = Schema::new(vec![
            ("id".into(), ColumnType::Int),
            ("label".into(), ColumnType::Custom("citext".into())),
        ]);
        let json = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, back);
    }
}
