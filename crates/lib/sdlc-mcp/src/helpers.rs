use rmcp::model::{CallToolResult, Content};
use sdlc_core::control::ControlError;
use sdlc_core::services::RegistryError;
use tracing::warn;

use crate::markdown;

pub fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

/// Text shown for a failed read tool. Upstream statuses get friendly wording.
pub fn error_text(err: &ControlError) -> String {
    match err {
        ControlError::NotFound { project_id } => return markdown::not_found(project_id),
        ControlError::InvalidInput(message) => return format!("Error: {message}"),
        _ => {}
    }

    warn!(error = %err, "tool call failed");
    match err.upstream_status() {
        Some(404) => "Error: Resource not found. Check that the project_id is correct.".to_string(),
        Some(401) => {
            "Error: Authentication failed. Check your SUPABASE_SERVICE_ROLE_KEY.".to_string()
        }
        Some(status) => format!("Error: Supabase API returned status {status}."),
        None => format!("Error: {err}"),
    }
}

pub fn registry_error_text(err: &RegistryError) -> String {
    warn!(error = %err, "service unavailable");
    format!("Error: {err}")
}

#[cfg(test)]
mod tests {
    use sdlc_core::store::StoreError;

    use super::*;

    fn status(status: u16) -> ControlError {
        ControlError::Store(StoreError::Status {
            status,
            body: String::new(),
        })
    }

    #[test]
    fn upstream_statuses_map_to_friendly_text() {
        assert_eq!(
            error_text(&status(404)),
            "Error: Resource not found. Check that the project_id is correct."
        );
        assert_eq!(
            error_text(&status(401)),
            "Error: Authentication failed. Check your SUPABASE_SERVICE_ROLE_KEY."
        );
        assert_eq!(error_text(&status(503)), "Error: Supabase API returned status 503.");
    }

    #[test]
    fn missing_projects_point_at_the_listing_tool() {
        let text = error_text(&ControlError::NotFound {
            project_id: "abc".into(),
        });
        assert_eq!(
            text,
            "Error: No project found with ID `abc`. Use list_projects to see available project IDs."
        );
    }
}
