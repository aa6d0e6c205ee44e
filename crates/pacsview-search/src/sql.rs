//! SQL output types: a parameterized query string plus its positional
//! argument list, compatible with a relational engine supporting joins,
//! `like`, date casts and ordering/pagination clauses.

use serde::{Deserialize, Serialize};
use time::Date;

/// A value bound to one positional `?` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Date(Date),
    Char(char),
}

impl SqlValue {
    /// Render the value for logging; never used to build SQL text.
    pub fn as_display_str(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Date(d) => d.to_string(),
            Self::Char(c) => c.to_string(),
        }
    }
}

/// A compiled query: SQL text with `?` placeholders and the matching
/// positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl BuiltQuery {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

impl std::fmt::Display for BuiltQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql)?;
        if !self.params.is_empty() {
            let rendered: Vec<String> = self.params.iter().map(SqlValue::as_display_str).collect();
            write!(f, " [{}]", rendered.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_params() {
        let query = BuiltQuery::new(
            "select 1 from study where lower(study.study_desc) like ?",
            vec![SqlValue::Text("%brain%".into())],
        );
        let rendered = query.to_string();
        assert!(rendered.contains("like ?"));
        assert!(rendered.contains("%brain%"));
    }

    #[test]
    fn test_value_rendering() {
        assert_eq!(SqlValue::Integer(42).as_display_str(), "42");
        assert_eq!(SqlValue::Char('F').as_display_str(), "F");
    }
}
