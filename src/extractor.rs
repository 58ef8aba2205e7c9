//! Table reference extraction from raw SQL text
//!
//! Walks the sqlparser token stream looking for the clauses that introduce a
//! table (`FROM`, every `JOIN` variant, comma-joined `FROM` lists) and reads
//! the dotted identifier that follows. This is deliberately not a parser:
//! it never fails, and nested subqueries are picked up on a best-effort basis
//! as the scan walks through them.

use crate::sql_parser::significant_tokens;
use crate::types::{DatabaseType, TargetReference};
use lazy_regex::regex;
use sqlparser::tokenizer::Token;

/// Words that end a table reference instead of aliasing it
const CLAUSE_KEYWORDS: &[&str] = &[
    "WHERE", "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "OUTER", "CROSS", "NATURAL", "ON",
    "USING", "GROUP", "ORDER", "HAVING", "LIMIT", "OFFSET", "UNION", "INTERSECT", "EXCEPT",
    "MINUS", "WINDOW", "QUALIFY", "FETCH", "FOR", "INTO", "SET", "VALUES", "RETURNING",
    "SELECT", "FROM", "WITH", "TOP", "TABLESAMPLE", "LATERAL", "PIVOT", "UNPIVOT",
];

/// Extract referenced tables using the Redshift dialect
///
/// # Examples
/// ```
/// # use redshift_sql_gateway::extractor::extract;
/// let refs = extract("SELECT * FROM sales.orders o JOIN sales.customers c ON o.cid = c.id");
/// let names: Vec<String> = refs.iter().map(|r| r.to_string()).collect();
/// assert_eq!(names, ["SALES.ORDERS", "SALES.CUSTOMERS"]);
/// assert!(extract("").is_empty());
/// ```
pub fn extract(sql: &str) -> Vec<TargetReference> {
    extract_with_dialect(sql, DatabaseType::Redshift)
}

/// Extract referenced tables, tokenizing with the given database dialect
///
/// Falls back to a regex scan when the tokenizer rejects the input
/// (unterminated literal or quoted identifier).
pub fn extract_with_dialect(sql: &str, db_type: DatabaseType) -> Vec<TargetReference> {
    match significant_tokens(sql, db_type) {
        Ok(tokens) => extract_from_tokens(&tokens),
        Err(e) => {
            log::debug!("Tokenizer rejected SQL ({}), using fallback scan", e);
            extract_fallback(sql)
        }
    }
}

fn extract_from_tokens(tokens: &[Token]) -> Vec<TargetReference> {
    let mut refs = Vec::new();
    // One entry per open parenthesis: true when it opens a subquery,
    // false for function-call style groups such as EXTRACT(YEAR FROM ts)
    let mut frames: Vec<bool> = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        match token {
            Token::LParen => {
                let opens_query = matches!(
                    tokens.get(i + 1),
                    Some(t) if is_word(t, "SELECT") || is_word(t, "WITH")
                ) || matches!(tokens.get(i + 1), Some(Token::LParen));
                frames.push(opens_query);
                i += 1;
            }
            Token::RParen => {
                frames.pop();
                i += 1;
            }
            t if frames.last().copied().unwrap_or(true) && is_word(t, "FROM") => {
                // `a IS DISTINCT FROM b` compares values, it does not name a table
                if i > 0 && is_word(&tokens[i - 1], "DISTINCT") {
                    i += 1;
                } else {
                    i = parse_reference_list(tokens, i + 1, true, &mut refs);
                }
            }
            t if frames.last().copied().unwrap_or(true) && is_word(t, "JOIN") => {
                i = parse_reference_list(tokens, i + 1, false, &mut refs);
            }
            _ => i += 1,
        }
    }

    refs
}

/// Parse one reference (or a comma list after FROM) starting at `start`
///
/// Returns the index the outer scan should resume from.
fn parse_reference_list(
    tokens: &[Token],
    start: usize,
    allow_comma: bool,
    refs: &mut Vec<TargetReference>,
) -> usize {
    let mut i = start;
    loop {
        while matches!(tokens.get(i), Some(t) if is_word(t, "ONLY") || is_word(t, "LATERAL")) {
            i += 1;
        }

        let (parts, next) = parse_dotted(tokens, i);
        if parts.is_empty() {
            return i;
        }
        // `FROM generate_series(...)` names a function, not a table
        if matches!(tokens.get(next), Some(Token::LParen)) {
            return next;
        }
        if let Some(reference) = TargetReference::from_parts(&parts) {
            refs.push(reference);
        }

        i = skip_alias(tokens, next);
        if allow_comma && matches!(tokens.get(i), Some(Token::Comma)) {
            i += 1;
            continue;
        }
        return i;
    }
}

/// Read `word(.word)*` and return the components plus the next index
fn parse_dotted(tokens: &[Token], start: usize) -> (Vec<String>, usize) {
    let mut parts = Vec::new();
    let mut i = start;

    while let Some(Token::Word(w)) = tokens.get(i) {
        if parts.is_empty() && w.quote_style.is_none() && is_clause_keyword(&w.value) {
            break;
        }
        parts.push(w.value.clone());
        i += 1;
        if matches!(tokens.get(i), Some(Token::Period))
            && matches!(tokens.get(i + 1), Some(Token::Word(_)))
        {
            i += 1;
        } else {
            break;
        }
    }

    (parts, i)
}

fn skip_alias(tokens: &[Token], i: usize) -> usize {
    match tokens.get(i) {
        Some(Token::Word(w)) if w.quote_style.is_none() && w.value.eq_ignore_ascii_case("AS") => {
            if matches!(tokens.get(i + 1), Some(Token::Word(_))) {
                i + 2
            } else {
                i + 1
            }
        }
        Some(Token::Word(w)) if w.quote_style.is_some() || !is_clause_keyword(&w.value) => i + 1,
        _ => i,
    }
}

fn is_word(token: &Token, keyword: &str) -> bool {
    matches!(token, Token::Word(w) if w.quote_style.is_none() && w.value.eq_ignore_ascii_case(keyword))
}

fn is_clause_keyword(word: &str) -> bool {
    CLAUSE_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Regex scan used when the input cannot be tokenized
fn extract_fallback(sql: &str) -> Vec<TargetReference> {
    let clause = regex!(
        r#"(?i)\b(?:FROM|JOIN)\s+((?:"[^"]*"|[A-Za-z_][\w$]*)(?:\s*\.\s*(?:"[^"]*"|[A-Za-z_][\w$]*)){0,2})"#
    );
    let component = regex!(r#""([^"]*)"|([A-Za-z_][\w$]*)"#);

    clause
        .captures_iter(sql)
        .filter_map(|caps| {
            let ident = caps.get(1)?.as_str();
            let parts: Vec<String> = component
                .captures_iter(ident)
                .filter_map(|c| c.get(1).or_else(|| c.get(2)).map(|m| m.as_str().to_string()))
                .collect();
            if parts.len() == 1 && is_clause_keyword(&parts[0]) {
                return None;
            }
            TargetReference::from_parts(&parts)
        })
        .collect()
}
