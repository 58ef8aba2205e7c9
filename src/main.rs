// Redshift SQL gateway MCP server
//
// Serves guarded query execution and schema lookup tools over stdio or
// streamable HTTP (endpoint /mcp), selected by MCP_TRANSPORT.
//
// REQUIRED FILES: the schema catalog (SCHEMA_FILE) and the allowlist
// (PERMITTED_TABLES_FILE). Database credentials come from DB_URL, DB_USER
// and DB_PASSWORD.

use anyhow::{Context, Result};
use redshift_sql_gateway::{GatewayServer, ServerConfig, Transport, build_server};
use rmcp::ServiceExt;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::net::SocketAddr;

// ============================================================================
// TRANSPORTS
// ============================================================================

async fn serve_stdio(server: GatewayServer) -> Result<()> {
    log::info!("Serving MCP over stdio");
    let running = server
        .serve(rmcp::transport::stdio())
        .await
        .context("Failed to start stdio transport")?;

    tokio::select! {
        quit = running.waiting() => {
            quit.context("stdio session ended with an error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Received Ctrl-C, shutting down");
        }
    }
    Ok(())
}

async fn serve_http(server: GatewayServer, addr: SocketAddr) -> Result<()> {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    log::info!("Serving MCP over streamable HTTP at http://{}/mcp", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Failed to listen for Ctrl-C: {}", e);
            }
            log::info!("Received Ctrl-C, shutting down");
        })
        .await
        .context("HTTP server failed")
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // stderr keeps stdout free for the stdio transport
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = ServerConfig::from_env().context("Invalid configuration")?;
    let server = build_server(&config).await?;

    match config.transport {
        Transport::Stdio => serve_stdio(server).await,
        Transport::StreamableHttp => serve_http(server, config.bind_addr).await,
    }
}
