use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use sdlc_store::{ArtifactKind, ProjectStatus};
use serde::{Deserialize, Serialize};

use crate::SdlcMcp;
use crate::helpers::{self, text_result};
use crate::markdown;

/// Parameters for listing projects.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListProjectsParams {
    /// Only list projects with this status: DRAFT, ACTIVE, COMPLETED or ARCHIVED.
    #[serde(default)]
    pub status_filter: Option<String>,
}

/// Parameters naming a single project.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProjectParams {
    /// Project UUID, as shown by `list_projects`.
    pub project_id: String,
}

/// Parameters for fetching one artifact.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetArtifactParams {
    /// Project UUID, as shown by `list_projects`.
    pub project_id: String,
    /// One of: prd, design_system, architecture, data_model, api_contract,
    /// sequence_diagrams, implementation_plan, claude_md, corporate_guidelines.
    pub artifact_type: String,
}

/// Parameters for the screen inventory.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetScreensParams {
    /// Project UUID, as shown by `list_projects`.
    pub project_id: String,
    /// Include the HTML prototype of each screen. Prototypes can be very large.
    #[serde(default)]
    pub include_prototypes: bool,
}

impl SdlcMcp {
    pub(crate) async fn list_projects_text(&self, status_filter: Option<&str>) -> String {
        let status = match status_filter.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => match value.parse::<ProjectStatus>() {
                Ok(status) => Some(status),
                Err(err) => return format!("Error: {err}"),
            },
            None => None,
        };
        let control = match self.control().await {
            Ok(control) => control,
            Err(text) => return text,
        };
        match control.list_projects(status).await {
            Ok(projects) => markdown::project_list(&projects),
            Err(err) => helpers::error_text(&err),
        }
    }

    pub(crate) async fn project_summary_text(&self, project_id: &str) -> String {
        let control = match self.control().await {
            Ok(control) => control,
            Err(text) => return text,
        };
        match control.project_summary(project_id).await {
            Ok(summary) => markdown::project_summary(&summary),
            Err(err) => helpers::error_text(&err),
        }
    }

    pub(crate) async fn artifact_text(&self, project_id: &str, artifact_type: &str) -> String {
        let kind = match artifact_type.parse::<ArtifactKind>() {
            Ok(kind) => kind,
            Err(err) => return format!("Error: {err}"),
        };
        let control = match self.control().await {
            Ok(control) => control,
            Err(text) => return text,
        };
        match control.get_artifact(project_id, kind).await {
            Ok(view) => markdown::artifact(&view),
            Err(err) => helpers::error_text(&err),
        }
    }

    pub(crate) async fn screens_text(&self, project_id: &str, include_prototypes: bool) -> String {
        let control = match self.control().await {
            Ok(control) => control,
            Err(text) => return text,
        };
        match control.list_screens(project_id, include_prototypes).await {
            Ok(inventory) => markdown::screens(&inventory, include_prototypes),
            Err(err) => helpers::error_text(&err),
        }
    }

    pub(crate) async fn tech_preferences_text(&self, project_id: &str) -> String {
        let control = match self.control().await {
            Ok(control) => control,
            Err(text) => return text,
        };
        match control.tech_preferences(project_id).await {
            Ok(project) => markdown::tech_preferences(&project),
            Err(err) => helpers::error_text(&err),
        }
    }
}

#[tool_router(router = tool_router_projects, vis = "pub")]
impl SdlcMcp {
    #[tool(
        description = "List all SDLC Assist projects with their status and artifact completion. Use this to discover project IDs for the other tools.",
        annotations(
            title = "List SDLC Projects",
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn list_projects(
        &self,
        Parameters(params): Parameters<ListProjectsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(text_result(
            self.list_projects_text(params.status_filter.as_deref()).await,
        ))
    }

    #[tool(
        description = "Get a project's status, tech stack, artifact status table, screen count and uploaded files. Does not return artifact content; use get_artifact for that.",
        annotations(
            title = "Get SDLC Project Summary",
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn get_project_summary(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(text_result(self.project_summary_text(&params.project_id).await))
    }

    #[tool(
        description = "Fetch the full content of one artifact (PRD, architecture, data model, API contract, sequence diagrams, implementation plan, design system, CLAUDE.md or corporate guidelines).",
        annotations(
            title = "Get SDLC Project Artifact",
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn get_artifact(
        &self,
        Parameters(params): Parameters<GetArtifactParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(text_result(
            self.artifact_text(&params.project_id, &params.artifact_type)
                .await,
        ))
    }

    #[tool(
        description = "List the UI screens of a project grouped by epic, with type, complexity, role and design notes. Optionally includes HTML prototypes.",
        annotations(
            title = "Get SDLC Project Screens",
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn get_screens(
        &self,
        Parameters(params): Parameters<GetScreensParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(text_result(
            self.screens_text(&params.project_id, params.include_prototypes)
                .await,
        ))
    }

    #[tool(
        description = "Fetch the technology stack a project's user selected (frontend, backend, database, deployment, auth, API style).",
        annotations(
            title = "Get SDLC Tech Stack Preferences",
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn get_tech_preferences(
        &self,
        Parameters(params): Parameters<ProjectParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(text_result(
            self.tech_preferences_text(&params.project_id).await,
        ))
    }
}
