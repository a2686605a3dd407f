#![allow(dead_code)]

use crate::types::{SimulationConfig, SimulationResult};

/// Relative tolerance for floating-point comparisons across a rescale.
pub const TOLERANCE: f64 = 1e-6;

pub fn assert_close(actual: f64, expected: f64, what: &str) {
    let tol = TOLERANCE * expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tol,
        "{what}: expected {expected}, got {actual}"
    );
}

/// Pool conservation: whenever anything was distributed at all, the total
/// matching equals the effective pool.
pub fn assert_pool_conserved(result: &SimulationResult, config: &SimulationConfig) {
    if result.total_matching > 0.0 {
        assert_close(
            result.total_matching,
            config.effective_pool(),
            "total matching",
        );
    }
}

/// Matching is never negative, for any formula and any input.
pub fn assert_matching_non_negative(result: &SimulationResult) {
    for project in &result.projects {
        assert!(
            project.matching_amount >= 0.0,
            "project {} has negative matching ({})",
            project.project_id,
            project.matching_amount
        );
    }
}

/// Funding identity: `total_funding == contributions + matching_amount`
/// for every project, after every stage.
pub fn assert_funding_identity(result: &SimulationResult) {
    for project in &result.projects {
        assert_close(
            project.total_funding,
            project.contributions + project.matching_amount,
            &format!("total funding of project {}", project.project_id),
        );
    }
}

/// The reported total is the sum of the per-project amounts.
pub fn assert_total_consistent(result: &SimulationResult) {
    let sum: f64 = result.projects.iter().map(|p| p.matching_amount).sum();
    assert_close(result.total_matching, sum, "reported total matching");
}

/// Run all stateless result invariants.
pub fn assert_result_invariants(result: &SimulationResult) {
    assert_matching_non_negative(result);
    assert_funding_identity(result);
    assert_total_consistent(result);
}
