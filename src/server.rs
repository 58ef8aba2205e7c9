//! MCP server wiring: tools, the permitted-tables resource and the analyst prompt

use crate::catalog::SchemaCatalog;
use crate::error::GatewayError;
use crate::policy::PolicyStore;
use crate::prompt::{GET_DATA_DESCRIPTION, GET_DATA_NAME, get_data_text};
use crate::tools::{
    BillingAnalyzerArgs, DataDictionaryArgs, GetTableSchemaArgs, GetTablesSchemaArgs, QueryGateway,
    RunSqlQueryArgs, SqlQueryOptimizerArgs,
};
use crate::types::QueryResult;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, CallToolResult, Content, GetPromptRequestParam, GetPromptResult, Implementation,
    ListPromptsResult, ListResourcesResult, PaginatedRequestParam, Prompt, PromptMessage,
    PromptMessageRole, RawResource, ReadResourceRequestParam, ReadResourceResult, ResourceContents,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, tool, tool_handler, tool_router};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;

pub const PERMITTED_TABLES_URI: &str = "file://database_permitted_tables";

const INSTRUCTIONS: &str = "Execute SQL queries and inspect table schema in AWS Redshift.";

/// The gateway MCP service; cheap to clone per session
#[derive(Clone)]
pub struct GatewayServer {
    gateway: Arc<QueryGateway>,
    catalog: Arc<SchemaCatalog>,
    catalog_tables: Arc<BTreeSet<String>>,
    policies: Arc<PolicyStore>,
    tool_router: ToolRouter<Self>,
}

fn json_success(value: &impl Serialize) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Failed to serialize result: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn json_error(payload: &Value) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(payload.to_string())]))
}

fn gateway_error(err: &GatewayError) -> Result<CallToolResult, McpError> {
    json_error(&err.to_payload())
}

#[tool_router]
impl GatewayServer {
    pub fn new(
        gateway: Arc<QueryGateway>,
        catalog: Arc<SchemaCatalog>,
        catalog_tables: Arc<BTreeSet<String>>,
        policies: Arc<PolicyStore>,
    ) -> Self {
        Self {
            gateway,
            catalog,
            catalog_tables,
            policies,
            tool_router: Self::tool_router(),
        }
    }

    /// Current allowlist plus every catalog table name
    pub fn permitted_tables_document(&self) -> Value {
        let policy = self.policies.refresh();
        json!({
            "database": policy.database,
            "schema": policy.schema,
            "tables": policy.tables,
            "catalog_tables": self.catalog.table_names(),
        })
    }

    #[tool(description = "Returns the schema of one table as a list of columns, each with \
        column_name, column_type and column_description. Example: get_table_schema(\"api_analytics_orders\")")]
    async fn get_table_schema(
        &self,
        Parameters(args): Parameters<GetTableSchemaArgs>,
    ) -> Result<CallToolResult, McpError> {
        match crate::tools::get_table_schema(&self.catalog, &args) {
            Ok(value) => json_success(&value),
            Err(e) => gateway_error(&e),
        }
    }

    #[tool(description = "Returns the schemas of several tables as a mapping from table name to its \
        column list (column_name, column_type, column_description). Tables missing from the catalog \
        are left out. Example: get_tables_schema([\"api_analytics_orders\", \"api_analytics_products\"])")]
    async fn get_tables_schema(
        &self,
        Parameters(args): Parameters<GetTablesSchemaArgs>,
    ) -> Result<CallToolResult, McpError> {
        match crate::tools::get_tables_schema(&self.catalog, &args) {
            Ok(value) => json_success(&value),
            Err(e) => gateway_error(&e),
        }
    }

    #[tool(description = "Runs a SQL query on Redshift and returns the result rows. Only SELECT \
        statements against the permitted tables (see resource file://database_permitted_tables) are \
        allowed; statements containing INSERT, DROP, DELETE, TRUNCATE, ALTER or CREATE are rejected.")]
    async fn run_sql_query(
        &self,
        Parameters(args): Parameters<RunSqlQueryArgs>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.gateway.run(&args.query).await;
        match &result {
            QueryResult::Error { error } => json_error(&json!({ "error": error })),
            QueryResult::Rows { .. } => json_success(&result),
        }
    }

    #[tool(description = "Reviews a SQL query without running it and returns Redshift tuning \
        suggestions (join distribution, sort keys, column selection, DISTKEY/SORTKEY review).")]
    async fn sql_query_optimizer(
        &self,
        Parameters(args): Parameters<SqlQueryOptimizerArgs>,
    ) -> Result<CallToolResult, McpError> {
        json_success(&crate::tools::sql_query_optimizer(&args, &self.catalog_tables))
    }

    #[tool(description = "Returns Redshift daily cost and usage hours for an inclusive date range. \
        Dates use the YYYY-MM-DD format.")]
    async fn redshift_billing_analyzer(
        &self,
        Parameters(args): Parameters<BillingAnalyzerArgs>,
    ) -> Result<CallToolResult, McpError> {
        match crate::tools::redshift_billing_analyzer(&args) {
            Ok(value) => json_success(&value),
            Err(e) => gateway_error(&e),
        }
    }

    #[tool(description = "Data dictionary: with table_name returns that table's columns and \
        descriptions; without it returns the names of all documented tables.")]
    async fn data_dictionary_tool(
        &self,
        Parameters(args): Parameters<DataDictionaryArgs>,
    ) -> Result<CallToolResult, McpError> {
        match crate::tools::data_dictionary(&self.catalog, &args) {
            Ok(value) => json_success(&value),
            Err(e) => gateway_error(&e),
        }
    }
}

#[tool_handler]
impl ServerHandler for GatewayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .build(),
            server_info: Implementation {
                name: "Redshift MCP Server".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let mut raw = RawResource::new(PERMITTED_TABLES_URI, "database_permitted_tables");
        raw.description = Some(
            "Database, schema and tables which queries are allowed to access".to_string(),
        );
        raw.mime_type = Some("application/json".to_string());
        Ok(ListResourcesResult::with_all_items(vec![raw.no_annotation()]))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        if request.uri != PERMITTED_TABLES_URI {
            return Err(McpError::resource_not_found(
                format!("Unknown resource: {}", request.uri),
                Some(json!({ "uri": request.uri })),
            ));
        }
        let text = serde_json::to_string_pretty(&self.permitted_tables_document())
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, PERMITTED_TABLES_URI)],
        })
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult::with_all_items(vec![Prompt::new(
            GET_DATA_NAME,
            Some(GET_DATA_DESCRIPTION),
            None,
        )]))
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        if request.name != GET_DATA_NAME {
            return Err(McpError::invalid_params(
                format!("Unknown prompt: {}", request.name),
                None,
            ));
        }
        Ok(GetPromptResult {
            description: Some(GET_DATA_DESCRIPTION.to_string()),
            messages: vec![PromptMessage::new_text(PromptMessageRole::User, get_data_text())],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorizer::{Authorizer, AuthorizerOptions};
    use crate::policy::AllowlistPolicy;
    use crate::tools::QueryExecutor;
    use crate::types::{ColumnDescriptor, DatabaseType};
    use sqlx::any::AnyPoolOptions;

    async fn server() -> GatewayServer {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        for stmt in [
            "ATTACH DATABASE ':memory:' AS public",
            "CREATE TABLE public.orders (id INTEGER)",
            "INSERT INTO public.orders VALUES (7)",
        ] {
            sqlx::query(stmt).execute(&pool).await.unwrap();
        }

        let catalog = Arc::new(SchemaCatalog::from_tables([(
            "api_analytics_products".to_string(),
            vec![ColumnDescriptor {
                name: "sku".into(),
                column_type: "varchar".into(),
                description: "Stock keeping unit".into(),
            }],
        )]));
        let catalog_tables = Arc::new(catalog.table_set());
        let policies = Arc::new(PolicyStore::fixed(AllowlistPolicy::new(Some("dev"), "public", ["orders"])));
        let gateway = QueryGateway::new(
            Authorizer::new(AuthorizerOptions {
                dialect: DatabaseType::SQLite,
                ..Default::default()
            }),
            Arc::clone(&policies),
            Arc::clone(&catalog_tables),
            QueryExecutor::new(Arc::new(pool), None),
        );
        GatewayServer::new(Arc::new(gateway), catalog, catalog_tables, policies)
    }

    fn text_of(result: &CallToolResult) -> Value {
        let text = result.content[0].as_text().unwrap().text.clone();
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_run_sql_query_success_and_denial() {
        let server = server().await;

        let ok = server
            .run_sql_query(Parameters(RunSqlQueryArgs {
                query: "SELECT id FROM public.orders".into(),
            }))
            .await
            .unwrap();
        assert_ne!(ok.is_error, Some(true));
        assert_eq!(text_of(&ok), json!({"columns": ["id"], "rows": [[7]]}));

        let denied = server
            .run_sql_query(Parameters(RunSqlQueryArgs {
                query: "SELECT * FROM public.customers".into(),
            }))
            .await
            .unwrap();
        assert_eq!(denied.is_error, Some(true));
        assert_eq!(
            text_of(&denied),
            json!({"error": "Table CUSTOMERS access denied in schema PUBLIC"})
        );
    }

    #[tokio::test]
    async fn test_catalog_tools() {
        let server = server().await;

        let schema = server
            .get_table_schema(Parameters(GetTableSchemaArgs {
                table: "api_analytics_products".into(),
            }))
            .await
            .unwrap();
        assert_eq!(text_of(&schema)[0]["column_type"], "varchar");

        let missing = server
            .get_table_schema(Parameters(GetTableSchemaArgs { table: "x".into() }))
            .await
            .unwrap();
        assert_eq!(missing.is_error, Some(true));

        let names = server
            .data_dictionary_tool(Parameters(DataDictionaryArgs::default()))
            .await
            .unwrap();
        assert_eq!(text_of(&names), json!(["api_analytics_products"]));
    }

    #[tokio::test]
    async fn test_billing_and_optimizer_tools() {
        let server = server().await;

        let bad = server
            .redshift_billing_analyzer(Parameters(BillingAnalyzerArgs {
                start_date: "01/01/2024".into(),
                end_date: "2024-01-02".into(),
            }))
            .await
            .unwrap();
        assert_eq!(bad.is_error, Some(true));

        let hints = server
            .sql_query_optimizer(Parameters(SqlQueryOptimizerArgs {
                query: "SELECT * FROM public.api_analytics_products".into(),
            }))
            .await
            .unwrap();
        let hints = text_of(&hints);
        assert_eq!(hints.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_permitted_tables_document() {
        let server = server().await;
        assert_eq!(
            server.permitted_tables_document(),
            json!({
                "database": "DEV",
                "schema": "PUBLIC",
                "tables": ["ORDERS"],
                "catalog_tables": ["api_analytics_products"],
            })
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let server = server().await;
        let info = server.get_info();
        assert_eq!(info.instructions.as_deref(), Some(INSTRUCTIONS));
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
        assert!(info.capabilities.prompts.is_some());
        assert_eq!(server.tool_router.list_all().len(), 6);
    }
}
