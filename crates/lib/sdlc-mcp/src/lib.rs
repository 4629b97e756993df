//! MCP server implementation for sdlc-assist-mcp.
//!
//! This crate wires the control plane into rmcp tool handlers and exposes the
//! read-only project tools plus estimation generation.

mod helpers;
pub mod markdown;
pub mod server;
mod tools;

use std::sync::Arc;

use rmcp::{
    ErrorData, ServerHandler,
    handler::server::tool::ToolRouter,
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use sdlc_core::control::SdlcControlPlane;
use sdlc_core::model::TextGenerator;
use sdlc_core::services::ServiceRegistry;

const SERVER_INSTRUCTIONS: &str = r"sdlc-assist-mcp exposes SDLC Assist projects and their generated artifacts.

Workflow:
1. Call `list_projects` to discover project IDs (optionally filter by status: DRAFT, ACTIVE, COMPLETED, ARCHIVED).
2. Call `get_project_summary` to see which artifacts exist, how many screens are defined, and which files were uploaded.
3. Read content with:
   - `get_artifact` for prd, design_system, architecture, data_model, api_contract,
     sequence_diagrams, implementation_plan, claude_md, corporate_guidelines.
   - `get_screens` for the UI screen inventory grouped by epic (`include_prototypes` adds HTML).
   - `get_tech_preferences` for the selected technology stack.
4. Call `generate_estimation` once the PRD, Architecture Overview, Data Model, API Contract and
   Implementation Plan exist. It returns JSON comparing a traditional estimate with an AI-assisted one.

Notes:
- All tools are read-only; nothing is written back to the project store.
- Missing artifacts are reported as messages, not failures.
- Use `help` for the command list. `health` returns `ok`.";

/// MCP server wrapper around the service registry and tool routers.
#[derive(Clone)]
pub struct SdlcMcp {
    tool_router: ToolRouter<Self>,
    registry: Arc<ServiceRegistry>,
}

impl SdlcMcp {
    #[must_use]
    pub fn new(registry: ServiceRegistry) -> Self {
        Self::with_registry(Arc::new(registry))
    }

    #[must_use]
    pub fn with_registry(registry: Arc<ServiceRegistry>) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_projects()
            + Self::tool_router_estimation()
            + Self::tool_router_context();
        Self {
            tool_router,
            registry,
        }
    }

    /// The control plane, or the text to return when the store is unavailable.
    pub(crate) async fn control(&self) -> Result<SdlcControlPlane, String> {
        self.registry
            .control()
            .await
            .map_err(|err| helpers::registry_error_text(&err))
    }

    pub(crate) async fn generator(&self) -> Result<Arc<dyn TextGenerator>, String> {
        self.registry
            .generator()
            .await
            .map_err(|err| helpers::registry_error_text(&err))
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl SdlcMcp {
    #[tool(description = "Health check. Returns 'ok'.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text("ok")]))
    }
}

#[tool_handler]
impl ServerHandler for SdlcMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
