//! Statement classification and allowlist authorization
//!
//! The classifier decides what kind of statement a SQL string is; the
//! authorizer turns that plus the extracted table references into an
//! allow/deny decision against an [`AllowlistPolicy`] snapshot.

use crate::error::DenialReason;
use crate::extractor::extract_with_dialect;
use crate::policy::AllowlistPolicy;
use crate::sql_parser::extract_first_keyword;
use crate::types::{DatabaseType, TargetReference};
use lazy_regex::{Lazy, Regex};
use std::collections::BTreeSet;

/// Keywords that mark a statement as mutating, in reporting order
pub const BLACKLISTED_KEYWORDS: [&str; 6] = ["INSERT", "DROP", "DELETE", "TRUNCATE", "ALTER", "CREATE"];

static BLACKLIST_REGEXES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    BLACKLISTED_KEYWORDS
        .iter()
        .filter_map(|kw| {
            Regex::new(&format!(r"\b{}\b", kw))
                .ok()
                .map(|re| (*kw, re))
        })
        .collect()
});

/// Statement kind as seen by a classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// Blank input
    Empty,
    /// Read query starting with SELECT
    Select,
    /// Non-SELECT statement carrying a mutating keyword
    Mutating { keyword: String },
    /// Anything else, tagged with its leading word
    Other { leading: String },
}

/// Decides the kind of a statement from its normalized (trimmed, uppercased) text
pub trait StatementClassifier: Send + Sync {
    fn classify(&self, normalized: &str) -> StatementKind;
}

/// Whole-token keyword scan over the uppercased statement text
///
/// Only text that literally begins with SELECT skips the blacklist; a SELECT
/// that merely mentions a blacklisted word (as a literal or part of a column
/// name) is still a SELECT. Anything else containing a blacklisted keyword
/// is mutating, including a SELECT hidden behind a leading comment. A clean
/// statement whose first keyword after comments is SELECT still gets the
/// table check.
#[derive(Debug, Clone, Copy)]
pub struct KeywordClassifier {
    dialect: DatabaseType,
}

impl KeywordClassifier {
    /// Classifier that reads leading keywords with `dialect`'s tokenizer
    pub fn new(dialect: DatabaseType) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> DatabaseType {
        self.dialect
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(DatabaseType::Redshift)
    }
}

impl StatementClassifier for KeywordClassifier {
    fn classify(&self, normalized: &str) -> StatementKind {
        if normalized.is_empty() {
            return StatementKind::Empty;
        }
        if starts_with_select(normalized) {
            return StatementKind::Select;
        }
        if let Some((kw, _)) = BLACKLIST_REGEXES.iter().find(|(_, re)| re.is_match(normalized)) {
            return StatementKind::Mutating {
                keyword: (*kw).to_string(),
            };
        }
        let leading = extract_first_keyword(normalized, self.dialect).unwrap_or_default();
        if leading == "SELECT" {
            return StatementKind::Select;
        }
        StatementKind::Other { leading }
    }
}

/// `SELECT` as the very first word of the text, not a prefix of a longer identifier
fn starts_with_select(normalized: &str) -> bool {
    normalized
        .strip_prefix("SELECT")
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
}

/// Outcome of [`Authorizer::authorize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Allowed,
    Denied(DenialReason),
}

impl AuthorizationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Authorizer behaviour switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizerOptions {
    /// Check every extracted reference instead of only the first one
    pub check_all_references: bool,
    /// Reject non-SELECT statements unless their leading word is listed in `safe_prefixes`
    pub default_deny: bool,
    /// Uppercased leading words allowed under `default_deny`
    pub safe_prefixes: Vec<String>,
    /// Dialect used when tokenizing for classification and table extraction
    pub dialect: DatabaseType,
}

impl Default for AuthorizerOptions {
    fn default() -> Self {
        Self {
            check_all_references: false,
            default_deny: false,
            safe_prefixes: vec!["SHOW".into(), "EXPLAIN".into(), "DESCRIBE".into()],
            dialect: DatabaseType::Redshift,
        }
    }
}

/// Pure allow/deny decision over a policy snapshot and catalog table set
pub struct Authorizer {
    classifier: Box<dyn StatementClassifier>,
    options: AuthorizerOptions,
}

impl Default for Authorizer {
    fn default() -> Self {
        Self::new(AuthorizerOptions::default())
    }
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Authorizer {
    /// Authorizer using the keyword classifier in the configured dialect
    pub fn new(options: AuthorizerOptions) -> Self {
        Self::with_classifier(Box::new(KeywordClassifier::new(options.dialect)), options)
    }

    pub fn with_classifier(classifier: Box<dyn StatementClassifier>, options: AuthorizerOptions) -> Self {
        Self {
            classifier,
            options,
        }
    }

    pub fn options(&self) -> &AuthorizerOptions {
        &self.options
    }

    /// Decide whether `sql` may run under `policy`
    ///
    /// `catalog_tables` extends the permitted table set with every table the
    /// schema catalog describes. Comparisons are case-insensitive.
    pub fn authorize(
        &self,
        sql: &str,
        policy: &AllowlistPolicy,
        catalog_tables: &BTreeSet<String>,
    ) -> AuthorizationDecision {
        let normalized = sql.trim().to_uppercase();

        match self.classifier.classify(&normalized) {
            StatementKind::Empty => AuthorizationDecision::Denied(DenialReason::EmptyQuery),
            StatementKind::Mutating { keyword } => {
                AuthorizationDecision::Denied(DenialReason::BlacklistedKeyword(keyword))
            }
            StatementKind::Select => {
                let refs = extract_with_dialect(sql, self.options.dialect);
                let checked: &[TargetReference] = if self.options.check_all_references {
                    &refs
                } else {
                    refs.get(..1).unwrap_or(&[])
                };
                for reference in checked {
                    if let Err(reason) = check_reference(reference, policy, catalog_tables) {
                        return AuthorizationDecision::Denied(reason);
                    }
                }
                AuthorizationDecision::Allowed
            }
            StatementKind::Other { leading } => {
                if self.options.default_deny
                    && !self.options.safe_prefixes.iter().any(|p| p.eq_ignore_ascii_case(&leading))
                {
                    AuthorizationDecision::Denied(DenialReason::StatementNotAllowed(leading))
                } else {
                    AuthorizationDecision::Allowed
                }
            }
        }
    }
}

/// Authorize with the legacy options (first reference only, permissive fallthrough)
pub fn authorize(
    sql: &str,
    policy: &AllowlistPolicy,
    catalog_tables: &BTreeSet<String>,
) -> AuthorizationDecision {
    Authorizer::default().authorize(sql, policy, catalog_tables)
}

fn check_reference(
    reference: &TargetReference,
    policy: &AllowlistPolicy,
    catalog_tables: &BTreeSet<String>,
) -> Result<(), DenialReason> {
    if let (Some(database), Some(allowed)) = (&reference.database, &policy.database)
        && !database.eq_ignore_ascii_case(allowed)
    {
        return Err(DenialReason::DatabaseDenied(database.clone()));
    }

    match &reference.schema {
        Some(schema) if schema.eq_ignore_ascii_case(&policy.schema) => {}
        other => return Err(DenialReason::SchemaDenied(other.clone())),
    }

    let permitted = policy.permits_table(&reference.table)
        || catalog_tables.iter().any(|t| t.eq_ignore_ascii_case(&reference.table));
    if !permitted {
        return Err(DenialReason::TableDenied {
            table: reference.table.clone(),
            schema: reference.schema.clone().unwrap_or_default(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AllowlistPolicy {
        AllowlistPolicy::new(None, "PUBLIC", ["ORDERS"])
    }

    fn no_catalog() -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn denied(sql: &str) -> DenialReason {
        match authorize(sql, &policy(), &no_catalog()) {
            AuthorizationDecision::Denied(reason) => reason,
            AuthorizationDecision::Allowed => panic!("expected denial for {sql}"),
        }
    }

    #[test]
    fn test_allows_permitted_select() {
        assert!(authorize("SELECT id FROM public.orders", &policy(), &no_catalog()).is_allowed());
        assert!(authorize("  select id from PUBLIC.Orders where id = 1; ", &policy(), &no_catalog()).is_allowed());
    }

    #[test]
    fn test_empty_query() {
        assert_eq!(denied(""), DenialReason::EmptyQuery);
        assert_eq!(denied("   "), DenialReason::EmptyQuery);
        assert_eq!(denied("\n\t"), DenialReason::EmptyQuery);
    }

    #[test]
    fn test_blacklisted_keywords_regardless_of_table() {
        assert_eq!(denied("DROP TABLE orders"), DenialReason::BlacklistedKeyword("DROP".into()));
        assert_eq!(
            denied("delete from public.orders"),
            DenialReason::BlacklistedKeyword("DELETE".into())
        );
        assert_eq!(
            denied("UPDATE public.orders SET x = 1; TRUNCATE public.orders"),
            DenialReason::BlacklistedKeyword("TRUNCATE".into())
        );
        assert_eq!(
            denied("WITH t AS (SELECT 1) INSERT INTO x SELECT * FROM t"),
            DenialReason::BlacklistedKeyword("INSERT".into())
        );
        assert_eq!(
            denied("ALTER TABLE public.orders ADD c int"),
            DenialReason::BlacklistedKeyword("ALTER".into())
        );
        // reporting order follows the keyword list, not the text
        assert_eq!(
            denied("CREATE TABLE a AS SELECT 1; DROP TABLE b"),
            DenialReason::BlacklistedKeyword("DROP".into())
        );
    }

    #[test]
    fn test_every_keyword_denied_on_permitted_table() {
        for kw in BLACKLISTED_KEYWORDS {
            for sql in [
                format!("{kw} public.orders"),
                format!("{} public.orders", kw.to_lowercase()),
                format!("WITH x AS (SELECT 1) {kw} public.orders"),
            ] {
                assert_eq!(
                    denied(&sql),
                    DenialReason::BlacklistedKeyword(kw.into()),
                    "statement: {sql}"
                );
            }
        }
    }

    #[test]
    fn test_keyword_inside_identifier_reports_real_keyword() {
        // DROPPED_AT and CREATED contain DROP and CREATE but only DELETE is a token
        assert_eq!(
            denied("DELETE FROM public.orders WHERE dropped_at IS NULL AND created < now()"),
            DenialReason::BlacklistedKeyword("DELETE".into())
        );
    }

    #[test]
    fn test_comment_before_select_does_not_skip_blacklist() {
        assert_eq!(
            denied("/* x */ SELECT 1; DROP TABLE t"),
            DenialReason::BlacklistedKeyword("DROP".into())
        );
        assert_eq!(
            denied("-- hi\nSELECT id FROM public.orders; DELETE FROM public.orders"),
            DenialReason::BlacklistedKeyword("DELETE".into())
        );
    }

    #[test]
    fn test_select_prefix_needs_word_boundary() {
        assert_eq!(
            denied("SELECTED_ROWS; DROP TABLE public.orders"),
            DenialReason::BlacklistedKeyword("DROP".into())
        );
        assert!(authorize("SELECT*FROM public.orders", &policy(), &no_catalog()).is_allowed());
    }

    #[test]
    fn test_keyword_must_be_whole_token() {
        // CREATED_AT contains CREATE, DROPPED contains DROP
        assert!(authorize("SHOW created_at_dropped", &policy(), &no_catalog()).is_allowed());
    }

    #[test]
    fn test_select_mentioning_keyword_is_not_blocked() {
        let sql = "SELECT 'DROP' AS note, created FROM public.orders";
        assert!(authorize(sql, &policy(), &no_catalog()).is_allowed());
    }

    #[test]
    fn test_table_and_schema_denials() {
        assert_eq!(
            denied("SELECT id FROM public.customers"),
            DenialReason::TableDenied {
                table: "CUSTOMERS".into(),
                schema: "PUBLIC".into()
            }
        );
        assert_eq!(
            denied("SELECT * FROM foo.bar"),
            DenialReason::SchemaDenied(Some("FOO".into()))
        );
        assert_eq!(denied("SELECT * FROM orders"), DenialReason::SchemaDenied(None));
    }

    #[test]
    fn test_database_check() {
        let with_db = AllowlistPolicy::new(Some("dev"), "public", ["orders"]);
        assert!(authorize("SELECT * FROM dev.public.orders", &with_db, &no_catalog()).is_allowed());
        assert_eq!(
            authorize("SELECT * FROM prod.public.orders", &with_db, &no_catalog()),
            AuthorizationDecision::Denied(DenialReason::DatabaseDenied("PROD".into()))
        );
        // no database in the policy accepts any qualifier
        assert!(authorize("SELECT * FROM prod.public.orders", &policy(), &no_catalog()).is_allowed());
    }

    #[test]
    fn test_catalog_tables_extend_allowlist() {
        let catalog: BTreeSet<String> = ["api_analytics_products".to_string()].into();
        assert!(
            authorize("SELECT * FROM public.api_analytics_products", &policy(), &catalog).is_allowed()
        );
    }

    #[test]
    fn test_first_reference_only_by_default() {
        let sql = "SELECT * FROM public.orders o JOIN public.secrets s ON s.id = o.id";
        assert!(authorize(sql, &policy(), &no_catalog()).is_allowed());

        let strict = Authorizer::new(AuthorizerOptions {
            check_all_references: true,
            ..Default::default()
        });
        assert_eq!(
            strict.authorize(sql, &policy(), &no_catalog()),
            AuthorizationDecision::Denied(DenialReason::TableDenied {
                table: "SECRETS".into(),
                schema: "PUBLIC".into()
            })
        );
    }

    #[test]
    fn test_leading_comment_does_not_hide_select() {
        assert_eq!(
            denied("/* report */ SELECT * FROM finance.ledger"),
            DenialReason::SchemaDenied(Some("FINANCE".into()))
        );
        assert_eq!(
            denied("-- cleanup\nDROP TABLE public.orders"),
            DenialReason::BlacklistedKeyword("DROP".into())
        );
    }

    #[test]
    fn test_select_without_table_is_allowed() {
        assert!(authorize("SELECT 1", &policy(), &no_catalog()).is_allowed());
        assert!(authorize("SELECT current_date", &policy(), &no_catalog()).is_allowed());
    }

    #[test]
    fn test_permissive_fallthrough_and_default_deny() {
        assert!(authorize("SHOW search_path", &policy(), &no_catalog()).is_allowed());
        assert!(authorize("UPDATE public.orders SET x = 1", &policy(), &no_catalog()).is_allowed());

        let deny = Authorizer::new(AuthorizerOptions {
            default_deny: true,
            ..Default::default()
        });
        assert!(deny.authorize("SHOW search_path", &policy(), &no_catalog()).is_allowed());
        assert!(deny.authorize("explain select 1", &policy(), &no_catalog()).is_allowed());
        assert_eq!(
            deny.authorize("UPDATE public.orders SET x = 1", &policy(), &no_catalog()),
            AuthorizationDecision::Denied(DenialReason::StatementNotAllowed("UPDATE".into()))
        );
        assert_eq!(
            deny.authorize("VACUUM public.orders", &policy(), &no_catalog()),
            AuthorizationDecision::Denied(DenialReason::StatementNotAllowed("VACUUM".into()))
        );
    }

    #[test]
    fn test_classifier_uses_configured_dialect() {
        let authorizer = Authorizer::new(AuthorizerOptions {
            dialect: DatabaseType::SQLite,
            ..Default::default()
        });
        assert_eq!(authorizer.options().dialect, DatabaseType::SQLite);
        assert_eq!(KeywordClassifier::new(DatabaseType::SQLite).dialect(), DatabaseType::SQLite);
        assert_eq!(
            KeywordClassifier::new(DatabaseType::SQLite).classify("/* x */ SHOW TABLES"),
            StatementKind::Other {
                leading: "SHOW".into()
            }
        );
        assert_eq!(
            authorizer.authorize("-- note\nSELECT * FROM finance.ledger", &policy(), &no_catalog()),
            AuthorizationDecision::Denied(DenialReason::SchemaDenied(Some("FINANCE".into())))
        );
    }

    #[test]
    fn test_custom_classifier_plugs_in() {
        struct DenyEverything;
        impl StatementClassifier for DenyEverything {
            fn classify(&self, _normalized: &str) -> StatementKind {
                StatementKind::Mutating {
                    keyword: "ANY".into(),
                }
            }
        }
        let authorizer = Authorizer::with_classifier(Box::new(DenyEverything), AuthorizerOptions::default());
        assert_eq!(
            authorizer.authorize("SELECT 1", &policy(), &no_catalog()),
            AuthorizationDecision::Denied(DenialReason::BlacklistedKeyword("ANY".into()))
        );
    }
}
