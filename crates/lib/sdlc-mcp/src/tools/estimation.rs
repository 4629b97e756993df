use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use sdlc_core::control::estimation::{estimation_error_json, request_estimate};
use sdlc_core::estimation;
use serde::{Deserialize, Serialize};

use crate::SdlcMcp;
use crate::helpers::text_result;

/// Parameters for generating an estimate.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenerateEstimationParams {
    /// Project UUID, as shown by `list_projects`.
    pub project_id: String,
}

/// Registry failures arrive as tool text; the estimation tool answers in JSON.
fn unavailable_json(text: &str) -> String {
    estimation::failure_json(text.trim_start_matches("Error: "))
}

impl SdlcMcp {
    pub(crate) async fn estimation_text(&self, project_id: &str) -> String {
        let control = match self.control().await {
            Ok(control) => control,
            Err(text) => return unavailable_json(&text),
        };

        // The model client is only built once the project is known to be complete.
        let context = match control.assemble_context(project_id).await {
            Ok(context) => context,
            Err(err) => return estimation_error_json(&err),
        };
        let generator = match self.generator().await {
            Ok(generator) => generator,
            Err(text) => return unavailable_json(&text),
        };

        match request_estimate(&context, generator.as_ref()).await {
            Ok(outcome) => outcome.to_json(),
            Err(err) => estimation_error_json(&err),
        }
    }
}

#[tool_router(router = tool_router_estimation, vis = "pub")]
impl SdlcMcp {
    #[tool(
        description = "Generate Traditional vs AI-Assisted cost estimates for a project at a fixed $80/hour rate. Requires the PRD, Architecture Overview, Data Model, API Contract and Implementation Plan. Returns JSON with traditionalEstimate, aiAssistedEstimate, savings and assumptions, or {\"error\": ...}.",
        annotations(
            title = "Generate IT Cost Estimation",
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn generate_estimation(
        &self,
        Parameters(params): Parameters<GenerateEstimationParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(text_result(self.estimation_text(&params.project_id).await))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use sdlc_core::model::{GenerateError, TextGenerator};
    use sdlc_core::services::{BuildFuture, ServiceRegistry, ServiceRegistryConfig};
    use sdlc_core::store::{MemoryStore, RecordStore};
    use serde_json::{Value, json};

    use super::*;

    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for Counting {
        async fn generate(&self, _: &str, _: &str) -> Result<String, GenerateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("I cannot estimate this project.".to_string())
        }
    }

    async fn store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store
            .insert(
                "projects",
                json!({
                    "id": "p1", "name": "Acme",
                    "prd_content": "prd", "arch_overview_content": "arch",
                    "data_model_content": "dm", "api_contract_content": "api",
                    "implementation_plan_content": "plan"
                }),
            )
            .await;
        store
            .insert("projects", json!({"id": "p2", "name": "Bare"}))
            .await;
        Arc::new(store)
    }

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).expect("json document")
    }

    /// A registry whose model client can never be built.
    fn without_model(store: Arc<MemoryStore>) -> SdlcMcp {
        let config = ServiceRegistryConfig::new(
            Arc::new(move || -> BuildFuture<Arc<dyn RecordStore>> {
                let store: Arc<dyn RecordStore> = store.clone();
                Box::pin(async move { Ok(store) })
            }),
            Arc::new(|| -> BuildFuture<Arc<dyn TextGenerator>> {
                Box::pin(async {
                    Err(sdlc_core::services::RegistryError::BuildFailed(
                        "no Google credentials found".to_string(),
                    ))
                })
            }),
        );
        SdlcMcp::new(ServiceRegistry::new(config))
    }

    #[tokio::test]
    async fn unusable_replies_carry_an_excerpt() {
        let generator = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let server = SdlcMcp::new(ServiceRegistry::from_parts(store().await, generator.clone()));

        let value = parse(&server.estimation_text("p1").await);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(value["raw_response"], "I cannot estimate this project.");
        assert!(value["error"].is_string());
    }

    #[tokio::test]
    async fn prerequisite_answers_need_no_model() {
        let server = without_model(store().await);

        let missing = parse(&server.estimation_text("p2").await);
        assert!(
            missing["error"]
                .as_str()
                .unwrap_or_default()
                .starts_with("Missing required artifacts. Generate these first: PRD")
        );

        let unknown = parse(&server.estimation_text("p9").await);
        assert_eq!(unknown, json!({"error": "No project found with ID p9"}));
    }

    #[tokio::test]
    async fn missing_model_configuration_is_a_failure() {
        let server = without_model(store().await);
        let value = parse(&server.estimation_text("p1").await);
        let error = value["error"].as_str().unwrap_or_default();
        assert!(error.starts_with("Failed to generate estimation: "));
        assert!(error.contains("no Google credentials found"));
    }
}
