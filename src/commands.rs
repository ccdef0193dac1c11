use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::mcp::protocol::ListToolsResult;
use crate::mcp::{CalculatorHandler, ExpenseTrackerHandler, McpServer};
use crate::repositories::{HttpExpenseApi, resolve_base_url};
use crate::services::ExpenseTrackerService;

/// Build a server with every tool enabled by `config`
#[inline]
pub async fn build_server(config: &Config) -> Result<Arc<McpServer>> {
    let server = McpServer::new(
        config.server.name.clone(),
        env!("CARGO_PKG_VERSION").to_string(),
    )
    .context("Failed to create MCP server")?;

    info!("Setting up tools...");
    server.register_tool(CalculatorHandler::new()).await?;

    if config.expense_tracker.enabled {
        let base_url = resolve_base_url(&config.expense_tracker).await;
        info!(
            "ExpenseTrackerService initialized with BASE_URL={}",
            base_url.as_ref().map_or("<unset>", |url| url.as_str())
        );

        let api = HttpExpenseApi::new(base_url).with_timeout(config.expense_tracker.timeout());
        let service = ExpenseTrackerService::new(Arc::new(api));
        server
            .register_tool(ExpenseTrackerHandler::new(service))
            .await?;
    }

    info!(
        "Registered tools: {:?}",
        server.tools.read().await.tool_names()
    );
    Ok(Arc::new(server))
}

/// Start the MCP server on stdio
#[inline]
pub async fn serve_mcp(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    info!("Starting {}...", config.server.name);

    let server = build_server(&config).await?;
    info!("✅ {} ready!", config.server.name);

    server.serve_stdio().await
}

/// Print the tool definitions advertised by `tools/list`
#[inline]
pub async fn list_tools(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let server = build_server(&config).await?;

    let tools = server.tools.read().await.list_tools();
    let listing = serde_json::to_string_pretty(&ListToolsResult { tools })?;
    println!("{listing}");

    Ok(())
}

/// Invoke one tool outside of an MCP session and print its text output
#[inline]
pub async fn call_tool(config_dir: &Path, tool: &str, arguments: Option<&str>) -> Result<()> {
    let arguments: Value = match arguments {
        Some(raw) => serde_json::from_str(raw).context("--args must be a JSON object")?,
        None => Value::Object(serde_json::Map::new()),
    };
    if !arguments.is_object() {
        bail!("--args must be a JSON object");
    }

    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let server = build_server(&config).await?;

    let result = server.tools.read().await.call(tool, arguments).await;
    println!("{}", result.text_content());

    if result.is_error() {
        bail!("Tool '{tool}' reported an error");
    }
    Ok(())
}
