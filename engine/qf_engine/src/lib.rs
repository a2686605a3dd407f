//! # Quadratic Funding Matching Engine
//!
//! Core library of the **Sustained** civic funding platform. Takes a set
//! of donations across several projects and a fixed matching pool, and
//! distributes the pool according to one of four quadratic-funding
//! formulas, optionally filtered by anti-collusion and verification
//! rules, boosted by incentive multipliers, and re-partitioned across
//! project categories.
//!
//! | Stage                      | Module           | Enabled by                 |
//! |----------------------------|------------------|----------------------------|
//! | Donation filtering         | [`filter`]       | `enable_anti_collusion`, `enable_verification` |
//! | Matching formula + rescale | [`formula`]      | always                     |
//! | Incentive adjustment       | [`incentives`]   | `enable_incentives`        |
//! | Categorical reallocation   | [`categories`]   | `categorical_allocation`   |
//!
//! ## Architecture
//!
//! [`simulate`] is a stateless pure function: it takes the full
//! `(projects, donors, donations, config)` tuple, validates the
//! configuration, and recomputes a fresh [`SimulationResult`] from
//! scratch. Data flows strictly forward through the stages; each stage
//! consumes the previous stage's result and produces a new one, with no
//! shared mutable state. Callers that serve concurrent requests can
//! invoke it from any number of threads.
//!
//! Degenerate input is not an error: zero valid donations, a zero raw
//! matching sum, or a category with zero matching all produce well-defined
//! zero/unchanged results. The only failure mode is invalid configuration,
//! rejected up front with a descriptive [`EngineError`].

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, warn};

mod categories;
mod filter;
mod formula;
pub mod generator;
mod incentives;
mod types;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_filters;

pub use filter::{detect_collusion, is_verified};
pub use types::{
    CollusionThresholds, Donation, Donor, DonorInfluence, Formula, Project,
    ProjectMatchingResult, SimulationConfig, SimulationResult, VerificationLevel,
};

/// Invalid-configuration errors, rejected before any computation runs.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("matching pool must be positive and finite, got {0}")]
    InvalidPool(f64),

    #[error("reserved fraction must be in [0, 1), got {0}")]
    InvalidReservedFraction(f64),

    #[error("formula parameter `{name}` must be positive and finite, got {value}")]
    NonPositiveParameter { name: &'static str, value: f64 },

    #[error("declining exponent must be in (0, 1), got {0}")]
    ExponentOutOfRange(f64),
}

/// Run one full simulation.
///
/// Applies the four stages in order — filter, formula, incentives,
/// categorical reallocation — per the config toggles, and returns a fresh
/// result. The inputs are never mutated.
///
/// Donations referencing an unknown project or donor, or carrying a
/// non-positive amount, are logged and excluded rather than failing the
/// run: a data-integrity warning, not a hard error.
pub fn simulate(
    projects: &[Project],
    donors: &[Donor],
    donations: &[Donation],
    config: &SimulationConfig,
) -> Result<SimulationResult, EngineError> {
    config.validate()?;

    let donor_index: HashMap<&str, &Donor> =
        donors.iter().map(|d| (d.id.as_str(), d)).collect();
    let known = drop_dangling(projects, &donor_index, donations);

    let flagged = if config.enable_anti_collusion {
        filter::detect_collusion(&known, &config.collusion)
    } else {
        Vec::new()
    };

    let valid = filter::valid_donations(&known, &donor_index, &flagged, config);
    debug!(
        total = donations.len(),
        valid = valid.len(),
        flagged = flagged.len(),
        "donation filter stage complete"
    );

    let mut result = formula::run(projects, &valid, config);
    result.flagged_donations = flagged;

    if config.enable_incentives {
        result = incentives::apply(result, donors, &valid, config);
    }

    if config.categorical_allocation {
        result = categories::apply(result, projects, config);
    }

    debug!(
        total_matching = result.total_matching,
        reserved = result.reserved_funds,
        "simulation complete"
    );
    Ok(result)
}

/// Exclude donations that reference an unknown project or donor, or carry
/// a non-positive or non-finite amount.
fn drop_dangling(
    projects: &[Project],
    donor_index: &HashMap<&str, &Donor>,
    donations: &[Donation],
) -> Vec<Donation> {
    let project_ids: HashSet<&str> = projects.iter().map(|p| p.id.as_str()).collect();

    donations
        .iter()
        .filter(|d| {
            if !project_ids.contains(d.project_id.as_str()) {
                warn!(
                    donation = %d.id,
                    project = %d.project_id,
                    "donation references unknown project; excluded from matching"
                );
                return false;
            }
            if !donor_index.contains_key(d.donor_id.as_str()) {
                warn!(
                    donation = %d.id,
                    donor = %d.donor_id,
                    "donation references unknown donor; excluded from matching"
                );
                return false;
            }
            if !(d.amount.is_finite() && d.amount > 0.0) {
                warn!(
                    donation = %d.id,
                    amount = d.amount,
                    "donation amount is not positive; excluded from matching"
                );
                return false;
            }
            true
        })
        .cloned()
        .collect()
}
