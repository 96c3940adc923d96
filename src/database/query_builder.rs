//! SQL templating helpers
//!
//! Callers write positional `?` placeholders; engines that use another
//! style rewrite them using [`placeholder_positions`].

use crate::database::types::DatabaseType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Byte offsets of `?` placeholders outside quoted literals, quoted
/// identifiers and comments.
///
/// MariaDB strings honour backslash escapes and `#` opens a line comment there.
pub fn placeholder_positions(sql: &str, dialect: DatabaseType) -> Vec<usize> {
    let mysql_syntax = dialect == DatabaseType::MariaDB;
    let mut positions = Vec::new();
    let mut state = ScanState::Code;
    let mut chars = sql.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        state = match state {
            ScanState::Code => match c {
                '\'' | '"' | '`' => ScanState::Quoted(c),
                '?' => {
                    positions.push(idx);
                    ScanState::Code
                }
                '-' if next == Some('-') => {
                    chars.next();
                    ScanState::LineComment
                }
                '#' if mysql_syntax => ScanState::LineComment,
                '/' if next == Some('*') => {
                    chars.next();
                    ScanState::BlockComment
                }
                _ => ScanState::Code,
            },
            ScanState::Quoted(q) => match c {
                '\\' if mysql_syntax && q != '`' => {
                    chars.next();
                    state
                }
                _ if c == q => ScanState::Code,
                _ => state,
            },
            ScanState::LineComment if c == '\n' => ScanState::Code,
            ScanState::BlockComment if c == '*' && next == Some('/') => {
                chars.next();
                ScanState::Code
            }
            ScanState::LineComment | ScanState::BlockComment => state,
        };
    }

    positions
}

pub fn placeholder_count(sql: &str, dialect: DatabaseType) -> usize {
    placeholder_positions(sql, dialect).len()
}

/// `?, ?, ?`
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// SELECT query builder
pub struct SelectBuilder {
    table: String,
    columns: Vec<String>,
    where_clause: Option<String>,
    order_by: Option<String>,
    limit: Option<u32>,
}

impl SelectBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: vec!["*".to_string()],
            where_clause: None,
            order_by: None,
            limit: None,
        }
    }

    /// An empty list keeps `*`
    pub fn columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        if !columns.is_empty() {
            self.columns = columns.iter().map(|s| s.as_ref().to_string()).collect();
        }
        self
    }

    /// Blank clauses are ignored
    pub fn where_clause(mut self, clause: Option<&str>) -> Self {
        self.where_clause = clause
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);
        self
    }

    pub fn order_by(mut self, order: &str) -> Self {
        self.order_by = Some(order.to_string());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn build(self) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.columns.join(", "), self.table);

        if let Some(where_clause) = self.where_clause {
            sql.push_str(&format!(" WHERE {}", where_clause));
        }

        if let Some(order_by) = self.order_by {
            sql.push_str(&format!(" ORDER BY {}", order_by));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }
}

/// `INSERT INTO t (a, b) VALUES (?, ?), (?, ?)`
pub fn insert_sql<S: AsRef<str>>(table: &str, columns: &[S], row_count: usize) -> String {
    let columns_str = columns
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join(", ");
    let row = format!("({})", placeholders(columns.len()));
    let values = vec![row.as_str(); row_count.max(1)].join(", ");
    format!("INSERT INTO {} ({}) VALUES {}", table, columns_str, values)
}

pub fn update_sql(table: &str, updates: &str, condition: &str) -> String {
    format!("UPDATE {} SET {} WHERE {}", table, updates, condition)
}

pub fn delete_sql(table: &str, condition: Option<&str>) -> String {
    match condition.map(str::trim).filter(|c| !c.is_empty()) {
        Some(condition) => format!("DELETE FROM {} WHERE {}", table, condition),
        None => format!("DELETE FROM {}", table),
    }
}

pub fn create_table_sql(table: &str, column_defs: &str) -> String {
    format!("CREATE TABLE IF NOT EXISTS {} ({})", table, column_defs)
}

pub fn create_index_sql<S: AsRef<str>>(index: &str, table: &str, columns: &[S]) -> String {
    let columns_str = columns
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
        index, table, columns_str
    )
}
