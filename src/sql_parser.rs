//! SQL tokenizing utilities for comment stripping and keyword extraction
//!
//! Uses the sqlparser tokenizer so string literals, quoted identifiers and
//! dialect-specific quoting are handled the way the database sees them.

use crate::types::DatabaseType;
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, RedshiftSqlDialect, SQLiteDialect};
use sqlparser::tokenizer::{Token, Tokenizer, TokenizerError, Whitespace};

/// Get appropriate SQL dialect for the database type
pub fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::Postgres => Box::new(PostgreSqlDialect {}),
        DatabaseType::Redshift => Box::new(RedshiftSqlDialect {}),
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// Tokenize SQL and drop whitespace and comment tokens
///
/// # Errors
/// Returns the tokenizer error for unterminated literals or quoted identifiers.
pub fn significant_tokens(sql: &str, db_type: DatabaseType) -> Result<Vec<Token>, TokenizerError> {
    let dialect = get_dialect(db_type);
    let tokens = Tokenizer::new(&*dialect, sql).tokenize()?;
    Ok(tokens
        .into_iter()
        .filter(|t| !matches!(t, Token::Whitespace(_)))
        .collect())
}

/// Strip SQL comments (single-line and multi-line) using the sqlparser tokenizer
///
/// # Examples
/// ```
/// # use redshift_sql_gateway::sql_parser::strip_comments;
/// # use redshift_sql_gateway::types::DatabaseType;
/// let sql = "SELECT * FROM users -- get all\n/* WHERE active */";
/// let cleaned = strip_comments(sql, DatabaseType::Redshift);
/// assert_eq!(cleaned.trim(), "SELECT * FROM users");
/// ```
///
/// If tokenization fails (malformed SQL) the original SQL is returned unchanged.
pub fn strip_comments(sql: &str, db_type: DatabaseType) -> String {
    let dialect = get_dialect(db_type);
    let mut tokenizer = Tokenizer::new(&*dialect, sql);

    match tokenizer.tokenize() {
        Ok(tokens) => tokens
            .iter()
            .filter(|token| {
                !matches!(
                    token,
                    Token::Whitespace(Whitespace::SingleLineComment { .. })
                        | Token::Whitespace(Whitespace::MultiLineComment(_))
                )
            })
            .map(|token| token.to_string())
            .collect::<Vec<_>>()
            .join(""),
        Err(_) => sql.to_string(),
    }
}

/// Extract the first SQL keyword, uppercased, after stripping comments
///
/// Returns `None` for blank input.
///
/// # Examples
/// ```
/// # use redshift_sql_gateway::sql_parser::extract_first_keyword;
/// # use redshift_sql_gateway::types::DatabaseType;
/// assert_eq!(extract_first_keyword("  select 1", DatabaseType::Redshift).as_deref(), Some("SELECT"));
/// assert_eq!(extract_first_keyword("-- note\nSHOW TABLES", DatabaseType::Redshift).as_deref(), Some("SHOW"));
/// assert_eq!(extract_first_keyword("   ", DatabaseType::Redshift), None);
/// ```
pub fn extract_first_keyword(sql: &str, db_type: DatabaseType) -> Option<String> {
    let cleaned = strip_comments(sql, db_type);
    cleaned
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .find(|w| !w.is_empty())
        .map(|w| w.to_uppercase())
}
