//! Markdown views returned by the read-only tools.

use std::fmt::Write as _;

use sdlc_core::control::{ArtifactView, ProjectSummary, ScreenInventory};
use sdlc_store::catalog::{self, ArtifactKind, DecodedArtifact};
use sdlc_store::{Project, TechPreferences};
use serde_json::Value;

const DASH: &str = "—";

pub fn not_found(project_id: &str) -> String {
    format!(
        "Error: No project found with ID `{project_id}`. \
         Use list_projects to see available project IDs."
    )
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or(DASH)
}

fn status_text(project: &Project) -> &str {
    project.status.map_or(DASH, |status| status.as_str())
}

/// Plain rendering of a preference value: strings as-is, anything else as JSON.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// `frontend_framework` and `api-style` become `Frontend Framework` and `Api Style`.
pub fn title_case(key: &str) -> String {
    let spaced = key.replace(['_', '-'], " ");
    let mut out = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for ch in spaced.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

pub fn project_list(projects: &[Project]) -> String {
    if projects.is_empty() {
        return "No projects found.".to_string();
    }

    let tracked: Vec<ArtifactKind> = catalog::tracked_kinds().collect();
    let mut lines = vec![
        format!("# SDLC Assist Projects ({} total)", projects.len()),
        String::new(),
    ];
    for project in projects {
        let completed = tracked
            .iter()
            .filter(|kind| project.has_artifact(**kind))
            .count();
        lines.push(format!("## {}", project.name));
        lines.push(format!("- **ID:** `{}`", project.id));
        lines.push(format!("- **Status:** {}", status_text(project)));
        lines.push(format!(
            "- **Artifacts:** {completed}/{} complete",
            tracked.len()
        ));
        lines.push(format!(
            "- **Created:** {}",
            or_dash(project.created_at.as_deref())
        ));
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Row label in the summary's artifact table.
fn summary_label(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Architecture => "Architecture",
        _ => kind.label(),
    }
}

pub fn project_summary(summary: &ProjectSummary) -> String {
    let project = &summary.project;
    let mut lines = vec![
        format!("# Project: {}", project.name),
        String::new(),
        format!("- **ID:** `{}`", project.id),
        format!("- **Status:** {}", status_text(project)),
        format!("- **Created:** {}", or_dash(project.created_at.as_deref())),
        format!("- **Updated:** {}", or_dash(project.updated_at.as_deref())),
        String::new(),
    ];

    match &project.tech_preferences {
        Some(TechPreferences::Entries(entries)) if !entries.is_empty() => {
            lines.push("## Tech Stack Preferences".to_string());
            for (key, value) in entries {
                lines.push(format!("- **{key}:** {}", value_text(value)));
            }
            lines.push(String::new());
        }
        Some(TechPreferences::Other(value)) => {
            lines.push("## Tech Stack Preferences".to_string());
            lines.push(format!("- {}", value_text(value)));
            lines.push(String::new());
        }
        _ => {}
    }

    lines.push("## Artifact Status".to_string());
    lines.push(String::new());
    lines.push("| Artifact | Status | Generated At |".to_string());
    lines.push("|----------|--------|-------------|".to_string());
    for kind in ArtifactKind::ALL {
        let icon = if project.has_artifact(kind) { "✅" } else { "❌" };
        lines.push(format!(
            "| {} | {icon} | {} |",
            summary_label(kind),
            or_dash(project.generated_at(kind))
        ));
    }

    lines.push(String::new());
    lines.push(format!("## UI Screens: {} defined", summary.screen_count));
    lines.push(format!("## Uploaded Files: {}", summary.files.len()));
    for file in &summary.files {
        lines.push(format!(
            "- {}",
            file.original_filename.as_deref().unwrap_or("unnamed")
        ));
    }
    lines.join("\n")
}

pub fn artifact(view: &ArtifactView) -> String {
    let Some(content) = &view.content else {
        return format!(
            "The **{}** artifact has not been generated yet for project **{}**. \
             The user needs to generate this artifact in the SDLC Assist application first.",
            view.label, view.project_name
        );
    };

    let header = format!("# {} — {}", view.label, view.project_name);
    match content {
        DecodedArtifact::Json(value) => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            format!("{header}\n\n```json\n{pretty}\n```")
        }
        DecodedArtifact::Text(text) => format!("{header}\n\n{text}"),
    }
}

pub fn screens(inventory: &ScreenInventory, include_prototypes: bool) -> String {
    if inventory.screens.is_empty() {
        return format!(
            "No screens defined for project **{}**. \
             Screens are generated during the UX Design phase.",
            inventory.project_name
        );
    }

    // Epics keep the order in which they first appear.
    let mut epics: Vec<(&str, Vec<&sdlc_store::Screen>)> = Vec::new();
    for screen in &inventory.screens {
        let epic = screen.epic();
        match epics.iter_mut().find(|(name, _)| *name == epic) {
            Some((_, members)) => members.push(screen),
            None => epics.push((epic, vec![screen])),
        }
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "# UI Screens — {} ({} screens)\n",
        inventory.project_name,
        inventory.screens.len()
    );
    for (epic, members) in epics {
        let _ = writeln!(out, "## {epic}\n");
        for screen in members {
            let icon = if screen.has_prototype() { "🎨" } else { "⬜" };
            let _ = writeln!(
                out,
                "### {icon} {} ({} · {} complexity)",
                screen.name,
                or_dash(screen.screen_type.as_deref()),
                or_dash(screen.complexity.as_deref())
            );
            let _ = writeln!(
                out,
                "- **Description:** {}",
                or_dash(screen.description.as_deref())
            );
            let _ = writeln!(out, "- **User Role:** {}", or_dash(screen.user_role.as_deref()));
            if let Some(notes) = screen.notes.as_deref().filter(|notes| !notes.is_empty()) {
                let _ = writeln!(out, "- **Design Notes:** {notes}");
            }
            if let Some(html) = screen
                .prototype_content
                .as_deref()
                .filter(|html| include_prototypes && !html.is_empty())
            {
                let _ = writeln!(
                    out,
                    "\n<details><summary>HTML Prototype</summary>\n\n```html\n{html}\n```\n</details>"
                );
            }
            out.push('\n');
        }
    }
    out.truncate(out.trim_end_matches('\n').len());
    out
}

pub fn tech_preferences(project: &Project) -> String {
    let Some(preferences) = &project.tech_preferences else {
        return format!(
            "Tech preferences have not been set for project **{}**. \
             The user needs to select their tech stack in the SDLC Assist application.",
            project.name
        );
    };

    let mut lines = vec![format!("# Tech Stack — {}", project.name), String::new()];
    if let Some(saved_at) = project.tech_preferences_saved_at.as_deref() {
        lines.push(format!("*Saved at: {saved_at}*"));
        lines.push(String::new());
    }
    match preferences {
        TechPreferences::Entries(entries) => {
            for (key, value) in entries {
                lines.push(format!("- **{}:** {}", title_case(key), value_text(value)));
            }
        }
        TechPreferences::Other(value) => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            lines.push(format!("```json\n{pretty}\n```"));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use sdlc_store::{ArtifactContent, ProjectFile, ProjectStatus, Screen};
    use serde_json::json;

    use super::*;

    fn screen(id: &str, name: &str, epic: Option<&str>) -> Screen {
        Screen {
            id: id.to_string(),
            name: name.to_string(),
            description: Some(format!("{name} screen")),
            screen_type: Some("page".to_string()),
            epic_name: epic.map(str::to_string),
            complexity: Some("low".to_string()),
            user_role: Some("Admin".to_string()),
            notes: None,
            display_order: None,
            prototype_generated_at: None,
            prototype_content: None,
        }
    }

    #[test]
    fn title_case_matches_word_boundaries() {
        assert_eq!(title_case("frontend_framework"), "Frontend Framework");
        assert_eq!(title_case("api-style"), "Api Style");
        assert_eq!(title_case("deploymentTarget"), "Deploymenttarget");
        assert_eq!(title_case("oauth2provider"), "Oauth2Provider");
    }

    #[test]
    fn empty_project_lists_zero_of_eight() {
        let mut project = Project::new("p1", "Acme");
        project.status = Some(ProjectStatus::Draft);
        project.created_at = Some("2026-01-01T00:00:00Z".to_string());

        let text = project_list(&[project]);
        assert!(text.starts_with("# SDLC Assist Projects (1 total)\n\n## Acme\n"));
        assert!(text.contains("- **ID:** `p1`"));
        assert!(text.contains("- **Status:** DRAFT"));
        assert!(text.contains("- **Artifacts:** 0/8 complete"));
    }

    #[test]
    fn corporate_guidelines_do_not_count_toward_completion() {
        let project = Project::new("p1", "Acme")
            .with_artifact(ArtifactKind::Prd, ArtifactContent::Text("prd".into()))
            .with_artifact(
                ArtifactKind::CorporateGuidelines,
                ArtifactContent::Text("rules".into()),
            );
        assert!(project_list(&[project]).contains("- **Artifacts:** 1/8 complete"));
        assert_eq!(project_list(&[]), "No projects found.");
    }

    #[test]
    fn summary_table_marks_generated_artifacts() {
        let mut project = Project::new("p1", "Acme")
            .with_artifact(ArtifactKind::Prd, ArtifactContent::Text("prd".into()));
        project.tech_preferences = TechPreferences::from_value(&json!({"frontend": "React"}));
        let summary = ProjectSummary {
            project,
            screen_count: 3,
            files: vec![
                ProjectFile { id: "f1".into(), original_filename: Some("brief.pdf".into()) },
                ProjectFile { id: "f2".into(), original_filename: None },
            ],
        };

        let text = project_summary(&summary);
        assert!(text.contains("## Tech Stack Preferences\n- **frontend:** React"));
        assert!(text.contains("| PRD | ✅ | — |"));
        assert!(text.contains("| Architecture | ❌ | — |"));
        assert!(text.contains("| Corporate Guidelines | ❌ | — |"));
        assert!(text.contains("## UI Screens: 3 defined\n## Uploaded Files: 2\n- brief.pdf\n- unnamed"));
    }

    #[test]
    fn absent_artifact_is_a_message_not_an_error() {
        let view = ArtifactView {
            project_name: "Acme".into(),
            kind: ArtifactKind::Prd,
            label: "PRD",
            content: None,
        };
        assert_eq!(
            artifact(&view),
            "The **PRD** artifact has not been generated yet for project **Acme**. \
             The user needs to generate this artifact in the SDLC Assist application first."
        );
    }

    #[test]
    fn structured_artifacts_render_as_indented_json() {
        let stored = r#"{"zeta":1,"phases":[{"name":"Foundation","weeks":2}],"alpha":{"y":true,"b":null}}"#;
        let view = ArtifactView {
            project_name: "Acme".into(),
            kind: ArtifactKind::DesignSystem,
            label: "Design System",
            content: Some(catalog::decode(
                ArtifactKind::DesignSystem,
                &ArtifactContent::Text(stored.into()),
            )),
        };

        let text = artifact(&view);
        let body = text
            .strip_prefix("# Design System — Acme\n\n```json\n")
            .and_then(|rest| rest.strip_suffix("\n```"))
            .expect("fenced json block");
        assert!(body.contains("\n  \"phases\": ["));
        let compact: String = body.split_whitespace().collect();
        assert_eq!(compact, stored);
    }

    #[test]
    fn screens_group_by_epic_in_first_seen_order() {
        let mut login = screen("s1", "Login", Some("Auth"));
        login.prototype_generated_at = Some("2026-02-01".into());
        login.prototype_content = Some("<form></form>".into());
        login.notes = Some("Keep it short.".into());
        let inventory = ScreenInventory {
            project_name: "Acme".into(),
            screens: vec![
                login,
                screen("s2", "Orphan", None),
                screen("s3", "Logout", Some("Auth")),
            ],
        };

        let text = screens(&inventory, true);
        assert!(text.starts_with("# UI Screens — Acme (3 screens)\n\n## Auth\n\n### 🎨 Login (page · low complexity)\n"));
        assert!(text.contains("- **Design Notes:** Keep it short."));
        assert!(text.contains("<details><summary>HTML Prototype</summary>\n\n```html\n<form></form>\n```\n</details>"));
        let auth = text.find("## Auth").unwrap_or_default();
        let logout = text.find("Logout").unwrap_or_default();
        let ungrouped = text.find("## Ungrouped").unwrap_or_default();
        assert!(auth < logout && logout < ungrouped);
        assert!(!screens(&inventory, false).contains("<details>"));
    }

    #[test]
    fn no_screens_message() {
        let inventory = ScreenInventory {
            project_name: "Acme".into(),
            screens: Vec::new(),
        };
        assert_eq!(
            screens(&inventory, false),
            "No screens defined for project **Acme**. Screens are generated during the UX Design phase."
        );
    }

    #[test]
    fn tech_preferences_title_case_their_keys() {
        let mut project = Project::new("p1", "Acme");
        assert!(tech_preferences(&project).starts_with("Tech preferences have not been set"));

        project.tech_preferences =
            TechPreferences::from_value(&json!(r#"{"api_style": "REST", "auth-method": "OIDC"}"#));
        project.tech_preferences_saved_at = Some("2026-03-03T09:00:00Z".into());
        assert_eq!(
            tech_preferences(&project),
            "# Tech Stack — Acme\n\n*Saved at: 2026-03-03T09:00:00Z*\n\n- **Api Style:** REST\n- **Auth Method:** OIDC"
        );
    }

    #[test]
    fn tech_preferences_keep_their_stored_order() {
        let mut project = Project::new("p1", "Acme");
        project.tech_preferences = TechPreferences::from_value(&json!(
            r#"{"frontend": "React", "backend": "Spring Boot", "database": "PostgreSQL"}"#
        ));
        assert_eq!(
            tech_preferences(&project),
            "# Tech Stack — Acme\n\n- **Frontend:** React\n- **Backend:** Spring Boot\n- **Database:** PostgreSQL"
        );
    }
}
