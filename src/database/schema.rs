//! Structured table schemas and identifier checks
//!
//! Column definitions are split into a primitive type, checked against the
//! active backend's allow-list, and a constraint fragment that is passed to
//! the backend verbatim.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::DatabaseError;

/// Types every backend accepts
pub const COMMON_TYPES: &[&str] = &[
    "INTEGER",
    "INT",
    "SMALLINT",
    "BIGINT",
    "REAL",
    "FLOAT",
    "DOUBLE PRECISION",
    "DOUBLE",
    "DECIMAL",
    "NUMERIC",
    "TEXT",
    "CHARACTER VARYING",
    "VARCHAR",
    "CHARACTER",
    "CHAR",
    "BOOLEAN",
    "BOOL",
    "DATE",
    "TIME",
    "TIMESTAMP",
];

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
            .expect("identifier pattern is valid")
    })
}

/// Reject table, column and index names that are not plain identifiers.
///
/// An optional single `schema.` qualifier is allowed.
pub fn validate_identifier(name: &str) -> Result<(), DatabaseError> {
    if identifier_regex().is_match(name) {
        Ok(())
    } else {
        Err(DatabaseError::ValidationError(format!(
            "Invalid identifier '{}'",
            name
        )))
    }
}

pub fn validate_identifiers<S: AsRef<str>>(names: &[S]) -> Result<(), DatabaseError> {
    names
        .iter()
        .try_for_each(|name| validate_identifier(name.as_ref()))
}

/// Byte length of the leading type (including a parenthesised parameter
/// list such as `VARCHAR(255)` or `ENUM('a','b')`) when it is allowed.
fn match_type(fragment: &str, allowed: &[&str]) -> Result<usize, DatabaseError> {
    let upper = fragment.to_ascii_uppercase();

    let name_len = allowed
        .iter()
        .filter(|ty| {
            upper.starts_with(**ty)
                && upper[ty.len()..]
                    .chars()
                    .next()
                    .map_or(true, |c| c.is_whitespace() || c == '(')
        })
        .map(|ty| ty.len())
        .max()
        .ok_or_else(|| {
            DatabaseError::ValidationError(format!(
                "Unsupported column type in '{}'",
                fragment
            ))
        })?;

    let rest = &fragment[name_len..];
    let trimmed = rest.trim_start();
    if !trimmed.starts_with('(') {
        return Ok(name_len);
    }

    let offset = name_len + (rest.len() - trimmed.len());
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (idx, c) in trimmed.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'') | (None, '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Ok(offset + idx + 1);
                }
            }
            _ => {}
        }
    }

    Err(DatabaseError::ValidationError(format!(
        "Unbalanced type parameters in '{}'",
        fragment
    )))
}

/// One column of a table definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: String,
    /// Verbatim constraint fragment (`PRIMARY KEY`, `NOT NULL DEFAULT 0`, ...)
    pub constraints: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            constraints: String::new(),
        }
    }

    pub fn constraints(mut self, constraints: impl Into<String>) -> Self {
        self.constraints = constraints.into();
        self
    }

    /// Split a raw `"INT PRIMARY KEY"` style fragment into type and constraints.
    pub fn parse(name: &str, fragment: &str, allowed: &[&str]) -> Result<Self, DatabaseError> {
        let fragment = fragment.trim();
        let type_len = match_type(fragment, allowed)?;
        Ok(Self {
            name: name.to_string(),
            data_type: fragment[..type_len].to_string(),
            constraints: fragment[type_len..].trim().to_string(),
        })
    }

    pub fn validate(&self, allowed: &[&str]) -> Result<(), DatabaseError> {
        validate_identifier(&self.name)?;
        let type_len = match_type(self.data_type.trim(), allowed)?;
        if type_len != self.data_type.trim().len() {
            return Err(DatabaseError::ValidationError(format!(
                "Column '{}' type '{}' carries trailing text; use constraints instead",
                self.name, self.data_type
            )));
        }
        Ok(())
    }

    /// `name TYPE constraints`
    pub fn to_sql(&self) -> String {
        if self.constraints.is_empty() {
            format!("{} {}", self.name, self.data_type.trim())
        } else {
            format!("{} {} {}", self.name, self.data_type.trim(), self.constraints)
        }
    }
}

/// Ordered column list of a table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Build from `(name, "TYPE constraints")` pairs
    pub fn from_fragments<N, F>(columns: &[(N, F)], allowed: &[&str]) -> Result<Self, DatabaseError>
    where
        N: AsRef<str>,
        F: AsRef<str>,
    {
        let columns = columns
            .iter()
            .map(|(name, fragment)| ColumnDef::parse(name.as_ref(), fragment.as_ref(), allowed))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns })
    }

    pub fn validate(&self, allowed: &[&str]) -> Result<(), DatabaseError> {
        if self.columns.is_empty() {
            return Err(DatabaseError::ValidationError(
                "A table needs at least one column".to_string(),
            ));
        }
        self.columns.iter().try_for_each(|c| c.validate(allowed))
    }

    /// Comma-separated column definitions for `CREATE TABLE`
    pub fn to_sql(&self) -> String {
        self.columns
            .iter()
            .map(ColumnDef::to_sql)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARIADB_EXTRA: &[&str] = &["ENUM", "DATETIME"];

    fn allowed() -> Vec<&'static str> {
        COMMON_TYPES.iter().chain(MARIADB_EXTRA).copied().collect()
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("_audit_log2").is_ok());
        assert!(validate_identifier("public.users").is_ok());
        assert!(validate_identifier("1users").is_err());
        assert!(validate_identifier("users; DROP TABLE x").is_err());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("a.b.c").is_err());
    }

    #[test]
    fn test_parse_simple_fragment() {
        let col = ColumnDef::parse("id", "INT PRIMARY KEY", &allowed()).unwrap();
        assert_eq!(col.data_type, "INT");
        assert_eq!(col.constraints, "PRIMARY KEY");
        assert_eq!(col.to_sql(), "id INT PRIMARY KEY");
    }

    #[test]
    fn test_parse_prefers_longest_type() {
        let col = ColumnDef::parse("id", "integer not null", &allowed()).unwrap();
        assert_eq!(col.data_type, "integer");
        assert_eq!(col.constraints, "not null");

        let col = ColumnDef::parse("ratio", "DOUBLE PRECISION", &allowed()).unwrap();
        assert_eq!(col.data_type, "DOUBLE PRECISION");
        assert!(col.constraints.is_empty());
    }

    #[test]
    fn test_parse_type_parameters() {
        let col = ColumnDef::parse("name", "VARCHAR(255) NOT NULL", &allowed()).unwrap();
        assert_eq!(col.data_type, "VARCHAR(255)");
        assert_eq!(col.constraints, "NOT NULL");

        let col = ColumnDef::parse("state", "ENUM('a)', 'b') DEFAULT 'a)'", &allowed()).unwrap();
        assert_eq!(col.data_type, "ENUM('a)', 'b')");
        assert_eq!(col.constraints, "DEFAULT 'a)'");
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        assert!(ColumnDef::parse("x", "GEOMETRY", &allowed()).is_err());
        // prefix of an allowed type name is not enough
        assert!(ColumnDef::parse("x", "INTX", &allowed()).is_err());
        assert!(ColumnDef::parse("x", "VARCHAR(10", &allowed()).is_err());
    }

    #[test]
    fn test_schema_validation() {
        let schema = TableSchema::new()
            .column(ColumnDef::new("id", "INTEGER").constraints("PRIMARY KEY"))
            .column(ColumnDef::new("created", "DATETIME"));
        assert!(schema.validate(&allowed()).is_ok());
        assert_eq!(schema.to_sql(), "id INTEGER PRIMARY KEY, created DATETIME");

        assert!(TableSchema::new().validate(&allowed()).is_err());

        let trailing = TableSchema::new().column(ColumnDef::new("id", "INT PRIMARY KEY"));
        assert!(trailing.validate(&allowed()).is_err());

        let bad_name = TableSchema::new().column(ColumnDef::new("my col", "INT"));
        assert!(bad_name.validate(&allowed()).is_err());
    }

    #[test]
    fn test_from_fragments() {
        let schema =
            TableSchema::from_fragments(&[("id", "INT PRIMARY KEY"), ("v", "INT")], &allowed())
                .unwrap();
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.to_sql(), "id INT PRIMARY KEY, v INT");
    }
}
