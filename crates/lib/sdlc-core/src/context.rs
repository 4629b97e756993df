//! Project context document for the estimation model.
//!
//! The document is a fixed sequence of headed sections. Its bytes depend only
//! on the stored project state, so the same project always yields the same
//! prompt.

use sdlc_store::catalog::ArtifactKind;
use sdlc_store::schema::{
    COL_DISPLAY_ORDER, COL_PROJECT_ID, SCREEN_CONTEXT_COLUMNS, TABLE_PROJECT_SCREENS,
};
use sdlc_store::{ArtifactContent, Project, Screen, decode_rows};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::control::{ControlError, SdlcControlPlane};
use crate::store::{Order, Query};

/// Artifacts that must exist before an estimate can be requested, in the
/// order they are reported when missing.
pub const REQUIRED_ARTIFACTS: [ArtifactKind; 5] = [
    ArtifactKind::Prd,
    ArtifactKind::Architecture,
    ArtifactKind::DataModel,
    ArtifactKind::ApiContract,
    ArtifactKind::ImplementationPlan,
];

/// Placed between sections. Artifact text never contains this line.
pub const SECTION_SEPARATOR: &str = "\n\n=== END OF SECTION ===\n\n";

const HEADING_PROJECT_NAME: &str = "PROJECT NAME";
const HEADING_TECH_STACK: &str = "TECHNOLOGY STACK";
const HEADING_SCREENS: &str = "CONFIRMED UI SCREENS";

const fn artifact_heading(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Prd => "PRODUCT REQUIREMENTS DOCUMENT",
        ArtifactKind::DesignSystem => "DESIGN SYSTEM",
        ArtifactKind::Architecture => "ARCHITECTURE OVERVIEW",
        ArtifactKind::DataModel => "DATA MODEL",
        ArtifactKind::ApiContract => "API CONTRACT",
        ArtifactKind::SequenceDiagrams => "SEQUENCE DIAGRAMS",
        ArtifactKind::ImplementationPlan => "IMPLEMENTATION PLAN",
        ArtifactKind::ClaudeMd => "CLAUDE.MD",
        ArtifactKind::CorporateGuidelines => "CORPORATE GUIDELINES",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    pub project_name: String,
    pub screen_count: usize,
    pub document: String,
}

/// The screen fields shown to the model, in a fixed order.
#[derive(Serialize)]
struct ScreenEntry<'a> {
    id: &'a str,
    name: &'a str,
    description: Option<&'a str>,
    screen_type: Option<&'a str>,
    epic_name: Option<&'a str>,
    complexity: Option<&'a str>,
    user_role: Option<&'a str>,
    notes: Option<&'a str>,
}

impl<'a> From<&'a Screen> for ScreenEntry<'a> {
    fn from(screen: &'a Screen) -> Self {
        Self {
            id: &screen.id,
            name: &screen.name,
            description: screen.description.as_deref(),
            screen_type: screen.screen_type.as_deref(),
            epic_name: screen.epic_name.as_deref(),
            complexity: screen.complexity.as_deref(),
            user_role: screen.user_role.as_deref(),
            notes: screen.notes.as_deref(),
        }
    }
}

/// Labels of required artifacts the project lacks.
#[must_use]
pub fn missing_prerequisites(project: &Project) -> Vec<&'static str> {
    REQUIRED_ARTIFACTS
        .iter()
        .filter(|kind| !project.has_artifact(**kind))
        .map(|kind| kind.label())
        .collect()
}

fn section(heading: &str, body: &str) -> String {
    format!("## {heading}\n{body}")
}

fn pretty(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Serializes a project and its screens into the context document.
///
/// Optional sections (tech stack, screens, sequence diagrams) are left out
/// when empty. Required artifacts that are absent render as empty sections;
/// callers check [`missing_prerequisites`] first.
#[must_use]
pub fn render_document(project: &Project, screens: &[Screen]) -> String {
    let artifact = |kind: ArtifactKind| {
        project
            .artifact(kind)
            .map(|content| section(artifact_heading(kind), &content.as_text()))
    };

    let mut sections = vec![section(HEADING_PROJECT_NAME, &project.name)];

    if let Some(preferences) = project
        .tech_preferences
        .as_ref()
        .map(sdlc_store::TechPreferences::to_value)
        .filter(|value| !is_empty_value(value))
    {
        sections.push(section(HEADING_TECH_STACK, &pretty(&preferences)));
    }

    sections.extend(artifact(ArtifactKind::Prd));

    if !screens.is_empty() {
        let entries: Vec<ScreenEntry<'_>> = screens.iter().map(ScreenEntry::from).collect();
        sections.push(section(HEADING_SCREENS, &pretty(&entries)));
    }

    for kind in [
        ArtifactKind::Architecture,
        ArtifactKind::DataModel,
        ArtifactKind::ApiContract,
    ] {
        sections.extend(artifact(kind));
    }
    if project
        .artifact(ArtifactKind::SequenceDiagrams)
        .is_some_and(|content| !is_empty_content(content))
    {
        sections.extend(artifact(ArtifactKind::SequenceDiagrams));
    }
    sections.extend(artifact(ArtifactKind::ImplementationPlan));

    sections.join(SECTION_SEPARATOR)
}

fn is_empty_content(content: &ArtifactContent) -> bool {
    match content {
        ArtifactContent::Text(text) => text.is_empty(),
        ArtifactContent::Json(value) => is_empty_value(value),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Gathers what an estimate needs and renders the context document.
pub struct ContextAssembler<'a> {
    control: &'a SdlcControlPlane,
}

impl<'a> ContextAssembler<'a> {
    #[must_use]
    pub const fn new(control: &'a SdlcControlPlane) -> Self {
        Self { control }
    }

    /// # Errors
    /// `NotFound` for an unknown project, `MissingPrerequisites` naming every
    /// absent required artifact, or a store error.
    pub async fn assemble(&self, project_id: &str) -> Result<ProjectContext, ControlError> {
        let project = self.control.fetch_project(project_id, "*").await?;

        let missing = missing_prerequisites(&project);
        if !missing.is_empty() {
            return Err(ControlError::MissingPrerequisites(missing));
        }

        let rows = self
            .control
            .store()
            .query(
                &Query::table(TABLE_PROJECT_SCREENS)
                    .select(SCREEN_CONTEXT_COLUMNS)
                    .eq(COL_PROJECT_ID, project.id.as_str())
                    .order(Order::asc(COL_DISPLAY_ORDER).nulls_first()),
            )
            .await?;
        let screens: Vec<Screen> = decode_rows(TABLE_PROJECT_SCREENS, rows)?;

        let document = render_document(&project, &screens);
        debug!(
            project_id = %project.id,
            screens = screens.len(),
            chars = document.len(),
            "assembled estimation context"
        );

        Ok(ProjectContext {
            project_name: project.name,
            screen_count: screens.len(),
            document,
        })
    }
}

impl SdlcControlPlane {
    /// # Errors
    /// See [`ContextAssembler::assemble`].
    pub async fn assemble_context(&self, project_id: &str) -> Result<ProjectContext, ControlError> {
        ContextAssembler::new(self).assemble(project_id).await
    }
}
