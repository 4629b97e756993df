//! The cost model the instruction contract asks the model to apply, computed
//! locally so reported figures can be checked against it.

use super::HOURLY_RATE;
use super::number::round2;
use super::response::{ComplexityDrivers, Estimate, Phase};

/// Hours per phase, indexed by [`Phase::index`].
pub type PhaseHours = [f64; 8];

pub const DEPLOY_HOURS: f64 = 40.0 + 24.0 + 16.0 + 24.0 + 16.0 + 16.0;

/// Reported hours further than this from the formula are flagged.
const DEVIATION_HOURS: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavingsFigures {
    pub hours_saved: f64,
    pub cost_saved: f64,
    pub percent_reduction: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deviation {
    pub side: &'static str,
    pub phase: Phase,
    pub expected: f64,
    pub reported: f64,
}

/// Data cleansing hours when the PRD calls for a migration.
#[must_use]
pub fn data_cleansing_hours(drivers: &ComplexityDrivers, data_sources: f64) -> f64 {
    drivers.entity_count * 16.0 + data_sources * 24.0 + 40.0
}

#[must_use]
pub fn traditional_hours(drivers: &ComplexityDrivers, data_cleansing: f64) -> PhaseHours {
    let d = drivers;
    let requirements = d.epic_count * 16.0 + d.story_count * 4.0 + d.integration_count * 8.0 + 40.0;
    let screens = d.complex_screens * 16.0 + d.medium_screens * 8.0 + d.simple_screens * 4.0;
    let design = screens
        + d.epic_count * 24.0
        + d.entity_count * 8.0
        + d.integration_count * 16.0
        + 40.0;
    let develop = screens
        + d.entity_count * 16.0
        + d.endpoint_count * 8.0
        + d.integration_count * 40.0
        + d.user_role_count * 24.0
        + 40.0;
    let test = develop * 0.30
        + develop * 0.20
        + d.screen_count * 8.0
        + d.integration_count * 16.0
        + 24.0;
    let transition = d.epic_count * 8.0 + 16.0 + 24.0 + 16.0;

    let subtotal =
        requirements + design + develop + test + DEPLOY_HOURS + data_cleansing + transition;
    [
        requirements,
        design,
        develop,
        test,
        DEPLOY_HOURS,
        data_cleansing,
        transition,
        subtotal * 0.15,
    ]
}

/// Assisted hours; deploy, data cleansing and transition derive from the
/// traditional figures.
#[must_use]
pub fn assisted_hours(drivers: &ComplexityDrivers, traditional: &PhaseHours) -> PhaseHours {
    let d = drivers;
    let develop = d.complex_screens * 4.0
        + d.medium_screens * 2.0
        + d.simple_screens
        + d.entity_count * 4.0
        + d.endpoint_count * 2.0
        + d.integration_count * 16.0
        + d.user_role_count * 8.0
        + 8.0;
    let test = develop * 0.30 + d.screen_count * 4.0 + d.integration_count * 8.0 + 8.0;
    let deploy = traditional[Phase::Deploy.index()] * 0.60;
    let data_cleansing = traditional[Phase::DataCleansing.index()];
    let transition = traditional[Phase::Transition.index()] * 0.50;

    let subtotal = develop + test + deploy + data_cleansing + transition;
    [
        0.0,
        0.0,
        develop,
        test,
        deploy,
        data_cleansing,
        transition,
        subtotal * 0.05,
    ]
}

#[must_use]
pub fn savings(traditional_total: f64, assisted_total: f64) -> SavingsFigures {
    let hours_saved = round2(traditional_total - assisted_total);
    let percent_reduction = if traditional_total == 0.0 {
        0.0
    } else {
        (100.0 * hours_saved / traditional_total).round()
    };
    SavingsFigures {
        hours_saved,
        cost_saved: round2(hours_saved * HOURLY_RATE),
        percent_reduction,
    }
}

/// Compares reported phase hours with the formulas for the reported drivers.
///
/// Data cleansing depends on whether the PRD mentions a migration and on how
/// many sources it names, which only the model knows. The reported figure is
/// taken as given when it is zero or at least the one-source migration
/// figure; anything in between is flagged. Judgment adjustments also show up
/// here; deviations are advisory.
#[must_use]
pub fn verify(estimate: &Estimate) -> Vec<Deviation> {
    let drivers = &estimate.complexity_drivers;
    let data_cleansing = estimate.traditional_estimate.hours(Phase::DataCleansing);
    let traditional = traditional_hours(drivers, data_cleansing);
    let assisted = assisted_hours(drivers, &traditional);

    let mut deviations = Vec::new();
    let smallest_migration = data_cleansing_hours(drivers, 1.0);
    if data_cleansing.abs() > DEVIATION_HOURS
        && data_cleansing < smallest_migration - DEVIATION_HOURS
    {
        deviations.push(Deviation {
            side: "traditional",
            phase: Phase::DataCleansing,
            expected: smallest_migration,
            reported: data_cleansing,
        });
    }
    for (side, expected, reported) in [
        ("traditional", &traditional, &estimate.traditional_estimate),
        ("assisted", &assisted, &estimate.ai_assisted_estimate),
    ] {
        for phase in Phase::ALL {
            let reported = reported.hours(phase);
            let expected = expected[phase.index()];
            if (reported - expected).abs() > DEVIATION_HOURS {
                deviations.push(Deviation {
                    side,
                    phase,
                    expected,
                    reported,
                });
            }
        }
    }
    deviations
}
