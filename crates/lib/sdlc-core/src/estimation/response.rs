//! Typed estimate shape and contract normalization.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::HOURLY_RATE;
use super::formulas;
use super::number::{self, display, round2};

/// Differences smaller than this are treated as equal.
const TOLERANCE: f64 = 0.005;

/// The eight fixed phases, in id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Requirements,
    Design,
    Develop,
    Test,
    Deploy,
    DataCleansing,
    Transition,
    ProjectManagement,
}

impl Phase {
    pub const ALL: [Self; 8] = [
        Self::Requirements,
        Self::Design,
        Self::Develop,
        Self::Test,
        Self::Deploy,
        Self::DataCleansing,
        Self::Transition,
        Self::ProjectManagement,
    ];

    #[must_use]
    pub const fn id(self) -> u32 {
        match self {
            Self::Requirements => 1,
            Self::Design => 2,
            Self::Develop => 3,
            Self::Test => 4,
            Self::Deploy => 5,
            Self::DataCleansing => 6,
            Self::Transition => 7,
            Self::ProjectManagement => 8,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Requirements => "Requirements",
            Self::Design => "Design",
            Self::Develop => "Develop",
            Self::Test => "Test",
            Self::Deploy => "Deploy",
            Self::DataCleansing => "Data Cleansing and Conversion",
            Self::Transition => "Transition to Run",
            Self::ProjectManagement => "Project Management",
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.id() as usize - 1
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityDrivers {
    #[serde(default, with = "number")]
    pub epic_count: f64,
    #[serde(default, with = "number")]
    pub story_count: f64,
    #[serde(default, with = "number")]
    pub task_count: f64,
    #[serde(default, with = "number")]
    pub screen_count: f64,
    #[serde(default, with = "number")]
    pub simple_screens: f64,
    #[serde(default, with = "number")]
    pub medium_screens: f64,
    #[serde(default, with = "number")]
    pub complex_screens: f64,
    #[serde(default, with = "number")]
    pub entity_count: f64,
    #[serde(default, with = "number")]
    pub endpoint_count: f64,
    #[serde(default, with = "number")]
    pub integration_count: f64,
    #[serde(default, with = "number")]
    pub user_role_count: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseRecord {
    #[serde(deserialize_with = "number::deserialize_id")]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(with = "number")]
    pub hours: f64,
    #[serde(default, with = "number")]
    pub cost: f64,
    #[serde(default)]
    pub breakdown: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseEstimate {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub tasks: Vec<PhaseRecord>,
    #[serde(default, with = "number")]
    pub total_hours: f64,
    #[serde(default, with = "number")]
    pub total_cost: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PhaseEstimate {
    /// Hours of a phase. Only meaningful after normalization.
    #[must_use]
    pub fn hours(&self, phase: Phase) -> f64 {
        self.tasks
            .get(phase.index())
            .map_or(0.0, |record| record.hours)
    }

    fn sum_hours(&self) -> f64 {
        self.tasks.iter().map(|record| record.hours).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Savings {
    #[serde(default, with = "number")]
    pub hours_saved: f64,
    #[serde(default, with = "number")]
    pub cost_saved: f64,
    #[serde(default, with = "number")]
    pub percent_reduction: f64,
    #[serde(default)]
    pub narrative: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    #[serde(default)]
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(default, with = "number")]
    pub rate: f64,
    #[serde(default)]
    pub complexity_drivers: ComplexityDrivers,
    pub traditional_estimate: PhaseEstimate,
    pub ai_assisted_estimate: PhaseEstimate,
    #[serde(default)]
    pub savings: Savings,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn differs(left: f64, right: f64) -> bool {
    (left - right).abs() > TOLERANCE
}

impl Estimate {
    /// Enforces the arithmetic invariants of the contract.
    ///
    /// Each value that has to change is recorded in `assumptions` as a
    /// `Normalized:` line.
    ///
    /// # Errors
    /// Returns a description of the problem when either side does not carry
    /// exactly the phase ids 1 through 8.
    pub fn normalize(&mut self, project_name: &str, now: DateTime<Utc>) -> Result<(), String> {
        check_phase_ids("traditionalEstimate", &mut self.traditional_estimate)?;
        check_phase_ids("aiAssistedEstimate", &mut self.ai_assisted_estimate)?;

        let mut notes = Vec::new();

        if self.project_name.trim().is_empty() {
            self.project_name = project_name.to_string();
        }
        if self
            .generated_at
            .as_deref()
            .is_none_or(|value| value.trim().is_empty())
        {
            self.generated_at = Some(now.to_rfc3339_opts(SecondsFormat::Secs, true));
        }

        if differs(self.rate, HOURLY_RATE) {
            notes.push(format!(
                "Normalized: rate set to {} (was {}).",
                display(HOURLY_RATE),
                display(self.rate)
            ));
            self.rate = HOURLY_RATE;
        }

        for phase in [Phase::Requirements, Phase::Design] {
            let record = &mut self.ai_assisted_estimate.tasks[phase.index()];
            if record.hours != 0.0 {
                notes.push(format!(
                    "Normalized: AI-assisted {phase} hours set to 0 (was {}).",
                    display(record.hours)
                ));
                record.hours = 0.0;
            }
        }

        reconcile_side("Traditional", &mut self.traditional_estimate, &mut notes);
        reconcile_side("AI-assisted", &mut self.ai_assisted_estimate, &mut notes);

        let expected = formulas::savings(
            self.traditional_estimate.total_hours,
            self.ai_assisted_estimate.total_hours,
        );
        let savings = &mut self.savings;
        for (name, field, value) in [
            ("hoursSaved", &mut savings.hours_saved, expected.hours_saved),
            ("costSaved", &mut savings.cost_saved, expected.cost_saved),
            (
                "percentReduction",
                &mut savings.percent_reduction,
                expected.percent_reduction,
            ),
        ] {
            if differs(*field, value) {
                notes.push(format!(
                    "Normalized: savings {name} recomputed as {} (was {}).",
                    display(value),
                    display(*field)
                ));
                *field = value;
            }
        }

        self.assumptions.extend(notes);
        Ok(())
    }
}

fn check_phase_ids(side: &str, estimate: &mut PhaseEstimate) -> Result<(), String> {
    estimate.tasks.sort_by_key(|record| record.id);
    let ids: Vec<u32> = estimate.tasks.iter().map(|record| record.id).collect();
    let expected: Vec<u32> = Phase::ALL.iter().map(|phase| phase.id()).collect();
    if ids != expected {
        return Err(format!(
            "{side}.tasks must contain phase ids 1 through 8 exactly once, found {ids:?}"
        ));
    }
    Ok(())
}

fn reconcile_side(side: &str, estimate: &mut PhaseEstimate, notes: &mut Vec<String>) {
    for (phase, record) in Phase::ALL.iter().zip(estimate.tasks.iter_mut()) {
        let cost = round2(record.hours * HOURLY_RATE);
        if differs(record.cost, cost) {
            notes.push(format!(
                "Normalized: {side} {phase} cost recomputed as {} hours * 80 = {} (was {}).",
                display(record.hours),
                display(cost),
                display(record.cost)
            ));
            record.cost = cost;
        }
    }

    let total_hours = round2(estimate.sum_hours());
    if differs(estimate.total_hours, total_hours) {
        notes.push(format!(
            "Normalized: {side} totalHours recomputed as {} (was {}).",
            display(total_hours),
            display(estimate.total_hours)
        ));
        estimate.total_hours = total_hours;
    }

    let total_cost = round2(total_hours * HOURLY_RATE);
    if differs(estimate.total_cost, total_cost) {
        notes.push(format!(
            "Normalized: {side} totalCost recomputed as {} (was {}).",
            display(total_cost),
            display(estimate.total_cost)
        ));
        estimate.total_cost = total_cost;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    pub(crate) fn side(hours: [f64; 8]) -> Value {
        let tasks: Vec<Value> = Phase::ALL
            .iter()
            .zip(hours)
            .map(|(phase, hours)| {
                json!({
                    "id": phase.id(),
                    "name": phase.name(),
                    "hours": hours,
                    "cost": hours * 80.0,
                    "breakdown": "math"
                })
            })
            .collect();
        let total: f64 = hours.iter().sum();
        json!({"label": "side", "tasks": tasks, "totalHours": total, "totalCost": total * 80.0})
    }

    pub(crate) fn sample(traditional: [f64; 8], assisted: [f64; 8]) -> Value {
        let trad: f64 = traditional.iter().sum();
        let ai: f64 = assisted.iter().sum();
        json!({
            "projectName": "Acme",
            "generatedAt": "2026-01-01T00:00:00Z",
            "rate": 80,
            "complexityDrivers": {"epicCount": 4},
            "traditionalEstimate": side(traditional),
            "aiAssistedEstimate": side(assisted),
            "savings": {
                "hoursSaved": trad - ai,
                "costSaved": (trad - ai) * 80.0,
                "percentReduction": if trad == 0.0 { 0.0 } else { (100.0 * (trad - ai) / trad).round() },
                "narrative": "n"
            },
            "assumptions": ["a"]
        })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).single().expect("valid time")
    }

    #[test]
    fn consistent_estimate_is_left_alone() {
        let value = sample(
            [188.0, 328.0, 536.0, 428.0, 136.0, 0.0, 88.0, 255.6],
            [0.0, 0.0, 160.0, 124.0, 81.6, 0.0, 44.0, 20.48],
        );
        let mut estimate: Estimate = serde_json::from_value(value).expect("decodes");
        estimate.normalize("Acme", now()).expect("normalizes");
        assert_eq!(estimate.assumptions, vec!["a".to_string()]);
    }

    #[test]
    fn assisted_requirements_and_design_are_zeroed() {
        let value = sample(
            [100.0, 100.0, 100.0, 100.0, 136.0, 0.0, 88.0, 0.0],
            [10.0, 20.0, 50.0, 30.0, 81.6, 0.0, 44.0, 0.0],
        );
        let mut estimate: Estimate = serde_json::from_value(value).expect("decodes");
        estimate.normalize("Acme", now()).expect("normalizes");

        let assisted = &estimate.ai_assisted_estimate;
        assert_eq!(assisted.hours(Phase::Requirements), 0.0);
        assert_eq!(assisted.hours(Phase::Design), 0.0);
        assert_eq!(assisted.tasks[0].cost, 0.0);
        assert!((assisted.total_hours - 205.6).abs() < 1e-9);
        assert!(
            estimate
                .assumptions
                .iter()
                .any(|note| note.starts_with("Normalized: AI-assisted Requirements hours set to 0"))
        );
    }

    #[test]
    fn costs_totals_and_savings_are_recomputed() {
        let mut value = sample(
            [10.0, 10.0, 10.0, 10.0, 10.0, 0.0, 10.0, 0.0],
            [0.0, 0.0, 5.0, 5.0, 5.0, 0.0, 5.0, 0.0],
        );
        value["rate"] = json!(95);
        value["traditionalEstimate"]["tasks"][2]["cost"] = json!(1);
        value["savings"]["percentReduction"] = json!(12);
        let mut estimate: Estimate = serde_json::from_value(value).expect("decodes");
        estimate.normalize("Acme", now()).expect("normalizes");

        assert_eq!(estimate.rate, 80.0);
        assert_eq!(estimate.traditional_estimate.tasks[2].cost, 800.0);
        assert_eq!(estimate.savings.hours_saved, 40.0);
        assert_eq!(estimate.savings.cost_saved, 3200.0);
        assert_eq!(estimate.savings.percent_reduction, 67.0);
        assert_eq!(
            estimate
                .assumptions
                .iter()
                .filter(|note| note.starts_with("Normalized:"))
                .count(),
            3
        );
    }

    #[test]
    fn tasks_are_sorted_and_must_cover_all_phases() {
        let mut value = sample([1.0; 8], [0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        let tasks = value["traditionalEstimate"]["tasks"]
            .as_array_mut()
            .expect("tasks array");
        tasks.reverse();
        let mut estimate: Estimate = serde_json::from_value(value.clone()).expect("decodes");
        estimate.normalize("Acme", now()).expect("reversed order is fine");
        assert_eq!(estimate.traditional_estimate.tasks[0].id, 1);

        value["aiAssistedEstimate"]["tasks"]
            .as_array_mut()
            .expect("tasks array")
            .pop();
        let mut estimate: Estimate = serde_json::from_value(value).expect("decodes");
        let err = estimate.normalize("Acme", now()).expect_err("seven phases");
        assert!(err.starts_with("aiAssistedEstimate.tasks"));
    }

    #[test]
    fn missing_name_and_timestamp_are_filled() {
        let mut value = sample([0.0; 8], [0.0; 8]);
        value["projectName"] = json!("");
        value.as_object_mut().expect("object").remove("generatedAt");
        let mut estimate: Estimate = serde_json::from_value(value).expect("decodes");
        estimate.normalize("Acme", now()).expect("normalizes");
        assert_eq!(estimate.project_name, "Acme");
        assert_eq!(estimate.generated_at.as_deref(), Some("2026-10-19T12:00:00Z"));
        assert_eq!(estimate.savings.percent_reduction, 0.0);
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let mut value = sample([0.0; 8], [0.0; 8]);
        value["confidence"] = json!("medium");
        let estimate: Estimate = serde_json::from_value(value).expect("decodes");
        let written = serde_json::to_value(&estimate).expect("serializes");
        assert_eq!(written["confidence"], json!("medium"));
        assert_eq!(written["rate"], json!(80));
    }
}
