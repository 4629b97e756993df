use sdlc_store::catalog::{self, ArtifactKind, DecodedArtifact};
use sdlc_store::schema::{
    COL_CREATED_AT, COL_DISPLAY_ORDER, COL_ID, COL_NAME, COL_PROJECT_ID, COL_PROTOTYPE_CONTENT,
    COL_STATUS, COL_TECH_PREFERENCES, COL_TECH_PREFERENCES_SAVED_AT, COL_UPDATED_AT,
    FILE_LISTING_COLUMNS, SCREEN_INVENTORY_COLUMNS, TABLE_PROJECT_FILES, TABLE_PROJECT_SCREENS,
    TABLE_PROJECTS, select_columns,
};
use sdlc_store::{Project, ProjectFile, ProjectStatus, Screen, decode_rows};

use super::{ControlError, SdlcControlPlane, require_project_id};
use crate::store::{Order, Query};

/// Project header plus the counts shown in the summary view.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    pub project: Project,
    pub screen_count: usize,
    pub files: Vec<ProjectFile>,
}

/// A single artifact resolved for display. `content` is `None` when the
/// artifact has not been generated yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactView {
    pub project_name: String,
    pub kind: ArtifactKind,
    pub label: &'static str,
    pub content: Option<DecodedArtifact>,
}

/// Screens of a project in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenInventory {
    pub project_name: String,
    pub screens: Vec<Screen>,
}

impl SdlcControlPlane {
    /// Lists projects newest first, optionally filtered by status.
    ///
    /// # Errors
    /// Returns `ControlError` if the store query fails or a row is malformed.
    pub async fn list_projects(
        &self,
        status: Option<ProjectStatus>,
    ) -> Result<Vec<Project>, ControlError> {
        let select = select_columns(
            &[COL_ID, COL_NAME, COL_STATUS, COL_CREATED_AT, COL_UPDATED_AT],
            catalog::tracked_kinds().map(ArtifactKind::column),
        );
        let mut query = Query::table(TABLE_PROJECTS)
            .select(select)
            .order(Order::desc(COL_CREATED_AT));
        if let Some(status) = status {
            query = query.eq(COL_STATUS, status.as_str());
        }

        let rows = self.store.query(&query).await?;
        Ok(rows
            .iter()
            .map(Project::from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Fetches a project with every column, plus its screen and file counts.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound` for an unknown id, or a store error.
    pub async fn project_summary(&self, project_id: &str) -> Result<ProjectSummary, ControlError> {
        let project = self.fetch_project(project_id, "*").await?;

        let screens = self
            .store
            .query(
                &Query::table(TABLE_PROJECT_SCREENS)
                    .select(COL_ID)
                    .eq(COL_PROJECT_ID, project.id.as_str()),
            )
            .await?;

        let files = self
            .store
            .query(
                &Query::table(TABLE_PROJECT_FILES)
                    .select(FILE_LISTING_COLUMNS)
                    .eq(COL_PROJECT_ID, project.id.as_str()),
            )
            .await?;
        let files = decode_rows(TABLE_PROJECT_FILES, files)?;

        Ok(ProjectSummary {
            project,
            screen_count: screens.len(),
            files,
        })
    }

    /// Fetches one artifact, decoding embedded JSON for structured kinds.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound` for an unknown id, or a store error.
    pub async fn get_artifact(
        &self,
        project_id: &str,
        kind: ArtifactKind,
    ) -> Result<ArtifactView, ControlError> {
        let column = catalog::column_for(kind);
        let label = catalog::label_for_column(column).unwrap_or_else(|| kind.as_str());
        let select = select_columns(&[COL_ID, COL_NAME], [column]);
        let project = self.fetch_project(project_id, &select).await?;

        let content = project
            .artifact(kind)
            .map(|content| catalog::decode(kind, content));

        Ok(ArtifactView {
            project_name: project.name,
            kind,
            label,
            content,
        })
    }

    /// Lists screens ordered by display order, nulls first.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound` for an unknown id, or a store error.
    pub async fn list_screens(
        &self,
        project_id: &str,
        include_prototypes: bool,
    ) -> Result<ScreenInventory, ControlError> {
        let project = self.fetch_project(project_id, "id,name").await?;

        let select = if include_prototypes {
            select_columns(&[SCREEN_INVENTORY_COLUMNS], [COL_PROTOTYPE_CONTENT])
        } else {
            SCREEN_INVENTORY_COLUMNS.to_string()
        };
        let rows = self
            .store
            .query(
                &Query::table(TABLE_PROJECT_SCREENS)
                    .select(select)
                    .eq(COL_PROJECT_ID, project.id.as_str())
                    .order(Order::asc(COL_DISPLAY_ORDER).nulls_first()),
            )
            .await?;

        Ok(ScreenInventory {
            project_name: project.name,
            screens: decode_rows(TABLE_PROJECT_SCREENS, rows)?,
        })
    }

    /// Fetches the tech stack preferences and their save time.
    ///
    /// # Errors
    /// Returns `ControlError::NotFound` for an unknown id, or a store error.
    pub async fn tech_preferences(&self, project_id: &str) -> Result<Project, ControlError> {
        let select = select_columns(
            &[COL_ID, COL_NAME],
            [COL_TECH_PREFERENCES, COL_TECH_PREFERENCES_SAVED_AT],
        );
        self.fetch_project(project_id, &select).await
    }

    pub(crate) async fn fetch_project(
        &self,
        project_id: &str,
        select: &str,
    ) -> Result<Project, ControlError> {
        let project_id = require_project_id(project_id)?;
        let row = self
            .store
            .query_single(
                &Query::table(TABLE_PROJECTS)
                    .select(select)
                    .eq(COL_ID, project_id),
            )
            .await?;
        let Some(row) = row else {
            return Err(ControlError::NotFound {
                project_id: project_id.to_string(),
            });
        };
        Ok(Project::from_row(&row)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    async fn control_with(rows: Vec<(&str, serde_json::Value)>) -> SdlcControlPlane {
        let store = MemoryStore::new();
        for (table, row) in rows {
            store.insert(table, row).await;
        }
        SdlcControlPlane::new(Arc::new(store))
    }

    #[tokio::test]
    async fn lists_newest_first_with_status_filter() {
        let control = control_with(vec![
            ("projects", json!({"id": "a", "name": "Old", "status": "ACTIVE", "created_at": "2025-01-01"})),
            ("projects", json!({"id": "b", "name": "New", "status": "ACTIVE", "created_at": "2025-03-01"})),
            ("projects", json!({"id": "c", "name": "Draft", "status": "DRAFT", "created_at": "2025-02-01"})),
        ])
        .await;

        let projects = control
            .list_projects(Some(ProjectStatus::Active))
            .await
            .expect("listing succeeds");
        let names: Vec<_> = projects.iter().map(|project| project.name.as_str()).collect();
        assert_eq!(names, vec!["New", "Old"]);
    }

    #[tokio::test]
    async fn listing_selects_header_columns_and_timestamps() {
        let control = control_with(vec![(
            "projects",
            json!({
                "id": "a", "name": "Acme", "status": "ACTIVE",
                "created_at": "2025-01-01", "updated_at": "2025-02-01",
                "prd_content": "prd"
            }),
        )])
        .await;

        let projects = control.list_projects(None).await.expect("listing succeeds");
        assert_eq!(projects[0].updated_at.as_deref(), Some("2025-02-01"));
        assert!(projects[0].has_artifact(ArtifactKind::Prd));
    }

    #[tokio::test]
    async fn missing_project_is_not_found() {
        let control = control_with(Vec::new()).await;
        let err = control
            .get_artifact("nope", ArtifactKind::Prd)
            .await
            .expect_err("unknown id");
        assert!(matches!(err, ControlError::NotFound { .. }));
    }

    #[tokio::test]
    async fn blank_project_id_is_invalid_input() {
        let control = control_with(Vec::new()).await;
        let err = control.project_summary("   ").await.expect_err("blank id");
        assert!(matches!(err, ControlError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn absent_artifact_is_a_view_without_content() {
        let control = control_with(vec![("projects", json!({"id": "p", "name": "Acme"}))]).await;
        let view = control
            .get_artifact("p", ArtifactKind::Prd)
            .await
            .expect("lookup succeeds");
        assert_eq!(view.label, "PRD");
        assert_eq!(view.project_name, "Acme");
        assert!(view.content.is_none());
    }

    #[tokio::test]
    async fn summary_counts_screens_and_files() {
        let control = control_with(vec![
            ("projects", json!({"id": "p", "name": "Acme", "status": "DRAFT"})),
            ("project_screens", json!({"id": "s1", "project_id": "p", "name": "Login"})),
            ("project_screens", json!({"id": "s2", "project_id": "p", "name": "Home"})),
            ("project_files", json!({"id": "f1", "project_id": "p", "original_filename": "brief.pdf"})),
        ])
        .await;

        let summary = control.project_summary("p").await.expect("summary succeeds");
        assert_eq!(summary.screen_count, 2);
        assert_eq!(summary.files.len(), 1);
        assert_eq!(summary.files[0].original_filename.as_deref(), Some("brief.pdf"));
    }

    #[tokio::test]
    async fn prototypes_are_only_selected_on_request() {
        let control = control_with(vec![
            ("projects", json!({"id": "p", "name": "Acme"})),
            ("project_screens", json!({
                "id": "s1", "project_id": "p", "name": "Login",
                "prototype_content": "<html></html>"
            })),
        ])
        .await;

        let without = control.list_screens("p", false).await.expect("screens");
        assert!(without.screens[0].prototype_content.is_none());

        let with = control.list_screens("p", true).await.expect("screens");
        assert_eq!(with.screens[0].prototype_content.as_deref(), Some("<html></html>"));
    }
}
