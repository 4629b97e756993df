//! Estimation contract: the instruction sent to the model and the handling
//! of what comes back.
//!
//! [`interpret_response`] never fails. A reply is either accepted as an
//! [`Estimate`] (after normalization) or classified as invalid JSON or as JSON
//! of the wrong shape, and every outcome renders to a JSON document.

pub mod contract;
pub mod formulas;
pub mod number;
pub mod response;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::warn;

pub use contract::SYSTEM_INSTRUCTION;
pub use response::{ComplexityDrivers, Estimate, Phase, PhaseEstimate, PhaseRecord, Savings};

pub const HOURLY_RATE: f64 = 80.0;

/// Length of the raw reply excerpt attached to rejected responses.
pub const RAW_EXCERPT_CHARS: usize = 2000;

pub const INVALID_JSON_MESSAGE: &str = "Estimation agent returned invalid JSON";
pub const SCHEMA_MISMATCH_MESSAGE: &str =
    "Estimation agent returned JSON that does not match the estimate schema";

#[derive(Debug, Clone, PartialEq)]
pub enum EstimationOutcome {
    Estimate(Box<Estimate>),
    InvalidJson { raw_response: String },
    SchemaMismatch { detail: String, raw_response: String },
}

impl EstimationOutcome {
    #[must_use]
    pub fn to_json(&self) -> String {
        match self {
            Self::Estimate(estimate) => serde_json::to_string(estimate)
                .unwrap_or_else(|err| failure_json(format!("cannot serialize estimate: {err}"))),
            Self::InvalidJson { raw_response } => json!({
                "error": INVALID_JSON_MESSAGE,
                "raw_response": raw_response,
            })
            .to_string(),
            Self::SchemaMismatch {
                detail,
                raw_response,
            } => json!({
                "error": SCHEMA_MISMATCH_MESSAGE,
                "detail": detail,
                "raw_response": raw_response,
            })
            .to_string(),
        }
    }

    #[must_use]
    pub const fn is_estimate(&self) -> bool {
        matches!(self, Self::Estimate(_))
    }
}

/// `{"error": message}`
#[must_use]
pub fn error_json(message: &str) -> String {
    json!({ "error": message }).to_string()
}

/// The error document for a failure before a reply was available.
#[must_use]
pub fn failure_json(detail: impl std::fmt::Display) -> String {
    error_json(&format!("Failed to generate estimation: {detail}"))
}

fn excerpt(raw: &str) -> String {
    raw.chars().take(RAW_EXCERPT_CHARS).collect()
}

/// Removes one surrounding Markdown code fence, if the reply has one.
#[must_use]
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening line.
    body.split_once('\n')
        .map_or(body, |(_, body)| body)
        .trim()
}

/// Classifies and normalizes a model reply.
#[must_use]
pub fn interpret_response(raw: &str, project_name: &str, now: DateTime<Utc>) -> EstimationOutcome {
    let candidate = strip_code_fence(raw);
    let Ok(value) = serde_json::from_str::<Value>(candidate) else {
        return EstimationOutcome::InvalidJson {
            raw_response: excerpt(raw),
        };
    };

    let mut estimate = match serde_json::from_value::<Estimate>(value) {
        Ok(estimate) => estimate,
        Err(err) => {
            return EstimationOutcome::SchemaMismatch {
                detail: err.to_string(),
                raw_response: excerpt(raw),
            };
        }
    };

    if let Err(detail) = estimate.normalize(project_name, now) {
        return EstimationOutcome::SchemaMismatch {
            detail,
            raw_response: excerpt(raw),
        };
    }

    for deviation in formulas::verify(&estimate) {
        warn!(
            side = deviation.side,
            phase = %deviation.phase,
            expected = deviation.expected,
            reported = deviation.reported,
            "estimate deviates from formula"
        );
    }

    EstimationOutcome::Estimate(Box::new(estimate))
}
