//! # Categorical reallocation stage
//!
//! Optional final stage. The matching pool is split into equal shares,
//! one per distinct project category (counting every configured project,
//! not just those with donations), and each category's projects are
//! rescaled so their matching sums to that category's share.
//!
//! A category whose projects currently hold zero matching is left
//! untouched; its share stays undistributed rather than forcing a
//! zero-division rescale. Total matching can therefore fall below the
//! pool after this stage.

use std::collections::BTreeSet;

use crate::types::{Project, SimulationConfig, SimulationResult};

/// Re-partition matching evenly across project categories.
pub(crate) fn apply(
    mut result: SimulationResult,
    projects: &[Project],
    config: &SimulationConfig,
) -> SimulationResult {
    // BTreeSet keeps category iteration order stable across runs.
    let categories: BTreeSet<&str> = projects.iter().map(|p| p.category.as_str()).collect();
    if categories.is_empty() {
        return result;
    }

    let share = config.effective_pool() / categories.len() as f64;

    for category in &categories {
        let current: f64 = result
            .projects
            .iter()
            .filter(|p| p.category == *category)
            .map(|p| p.matching_amount)
            .sum();
        if current <= 0.0 {
            continue;
        }

        let scale = share / current;
        for project in result
            .projects
            .iter_mut()
            .filter(|p| p.category == *category)
        {
            project.matching_amount *= scale;
            project.total_funding = project.contributions + project.matching_amount;
            for entry in &mut project.influences {
                entry.matching_generated *= scale;
                entry.influence_percentage = if project.matching_amount > 0.0 {
                    entry.matching_generated / project.matching_amount * 100.0
                } else {
                    0.0
                };
            }
        }
    }

    result.total_matching = result.projects.iter().map(|p| p.matching_amount).sum();
    result
}
