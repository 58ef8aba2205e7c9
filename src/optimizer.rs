//! Heuristic Redshift tuning suggestions
//!
//! Advisory only: nothing here runs a query or blocks one.

use crate::extractor::extract;
use lazy_regex::regex_is_match;
use std::collections::BTreeSet;

pub const NO_SUGGESTIONS: &str =
    "No specific optimization suggestions; the query looks reasonable as written.";

/// Suggestions for `sql`, rules evaluated in a fixed order
///
/// `catalog_tables` holds uppercased catalog table names.
pub fn suggest(sql: &str, catalog_tables: &BTreeSet<String>) -> Vec<String> {
    let upper = sql.to_uppercase();
    let mut suggestions = Vec::new();

    if regex_is_match!(r"\bJOIN\b", &upper) {
        suggestions.push(
            "Query uses JOIN: make sure join keys have matching data types and consider \
             distributing the joined tables on the join key (DISTKEY) to avoid redistribution."
                .to_string(),
        );
    }

    if regex_is_match!(r"\bORDER\s+BY\b", &upper) && regex_is_match!(r"\bLIMIT\b", &upper) {
        suggestions.push(
            "Query combines ORDER BY with LIMIT: align the table SORTKEY with the ORDER BY \
             columns so Redshift can stop scanning early."
                .to_string(),
        );
    }

    if regex_is_match!(r"\bSELECT\s+\*", &upper) {
        suggestions.push(
            "Avoid SELECT *: list only the columns you need to reduce columnar I/O.".to_string(),
        );
    }

    let mut seen = BTreeSet::new();
    for reference in extract(sql) {
        if catalog_tables.contains(&reference.table) && seen.insert(reference.table.clone()) {
            suggestions.push(format!(
                "Table {} is a catalog model: review its DISTKEY/SORTKEY choice for this access pattern.",
                reference.table
            ));
        }
    }

    if suggestions.is_empty() {
        suggestions.push(NO_SUGGESTIONS.to_string());
    }
    suggestions
}
