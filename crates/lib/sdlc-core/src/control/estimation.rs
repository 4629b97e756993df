use chrono::Utc;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::{ControlError, SdlcControlPlane};
use crate::context::ProjectContext;
use crate::estimation::{self, EstimationOutcome, SYSTEM_INSTRUCTION};
use crate::model::TextGenerator;

impl SdlcControlPlane {
    /// Assembles the project context, asks the model for an estimate, and
    /// interprets the reply.
    ///
    /// # Errors
    /// Returns `ControlError` when the project is missing or incomplete, or
    /// when the store or the model call fails. Unusable replies are not errors;
    /// they come back as [`EstimationOutcome`] variants.
    pub async fn generate_estimation(
        &self,
        project_id: &str,
        generator: &dyn TextGenerator,
    ) -> Result<EstimationOutcome, ControlError> {
        let context = self.assemble_context(project_id).await?;
        request_estimate(&context, generator).await
    }

    /// [`generate_estimation`](Self::generate_estimation) rendered as the JSON
    /// document returned to callers, errors included.
    pub async fn estimation_json(&self, project_id: &str, generator: &dyn TextGenerator) -> String {
        match self.generate_estimation(project_id, generator).await {
            Ok(outcome) => outcome.to_json(),
            Err(err) => estimation_error_json(&err),
        }
    }
}

/// Sends an assembled context to the model and interprets the reply.
///
/// # Errors
/// Returns `ControlError::Generate` when the model call fails.
pub async fn request_estimate(
    context: &ProjectContext,
    generator: &dyn TextGenerator,
) -> Result<EstimationOutcome, ControlError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("estimate", %request_id, project = %context.project_name);

    async move {
        info!(
            screens = context.screen_count,
            prompt_chars = context.document.len(),
            "requesting estimate"
        );

        let reply = generator
            .generate(SYSTEM_INSTRUCTION, &context.document)
            .await?;

        let outcome = estimation::interpret_response(&reply, &context.project_name, Utc::now());
        if outcome.is_estimate() {
            info!("estimate accepted");
        } else {
            warn!(reply_chars = reply.len(), "estimate reply rejected");
        }
        Ok(outcome)
    }
    .instrument(span)
    .await
}

/// JSON error document for a failed estimation.
#[must_use]
pub fn estimation_error_json(err: &ControlError) -> String {
    match err {
        ControlError::NotFound { .. }
        | ControlError::MissingPrerequisites(_)
        | ControlError::InvalidInput(_) => estimation::error_json(&err.to_string()),
        ControlError::Store(_) | ControlError::Generate(_) => estimation::failure_json(err),
    }
}
