use rmcp::{
    ErrorData,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::SdlcMcp;

/// Payload listing the MCP commands this server offers.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HelpCommands {
    pub commands: Vec<String>,
}

impl Default for HelpCommands {
    fn default() -> Self {
        Self {
            commands: vec![
                "help - List the MCP commands this server offers.".to_string(),
                "health - Returns 'ok' when the server is running.".to_string(),
                "list_projects - List projects with status and artifact completion, optionally filtered by status."
                    .to_string(),
                "get_project_summary - Show a project's tech stack, artifact status table, screen count and uploaded files."
                    .to_string(),
                "get_artifact - Fetch the content of one artifact by type (prd, architecture, data_model, ...)."
                    .to_string(),
                "get_screens - List UI screens grouped by epic, optionally with HTML prototypes."
                    .to_string(),
                "get_tech_preferences - Fetch the technology stack selected for a project."
                    .to_string(),
                "generate_estimation - Compare traditional and AI-assisted cost estimates for a complete project."
                    .to_string(),
            ],
        }
    }
}

#[tool_router(router = tool_router_context, vis = "pub")]
impl SdlcMcp {
    #[tool(description = "List the MCP commands this server offers.")]
    async fn help(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::json(HelpCommands::default())?]))
    }
}
