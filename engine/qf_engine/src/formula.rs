//! # Matching formula stage
//!
//! Converts the valid donation set into a rescaled per-project matching
//! amount plus per-donation influence, under the selected [`Formula`].
//!
//! Donations are grouped by project first; every formula operates on one
//! project's group in isolation, producing a *raw* (unscaled) matching
//! amount and raw influence terms. A single global rescale pass then
//! multiplies all raw amounts by `effective_pool / Σ raw` so total
//! matching equals the configured pool. When the raw sum is zero (no
//! valid donations anywhere) the pool is simply not distributed.
//!
//! ## Raw matching per project
//!
//! | Formula   | Raw matching                              | Per-donation influence                  |
//! |-----------|-------------------------------------------|-----------------------------------------|
//! | standard  | `(Σ√c)² − Σc`                             | `2·√c·(S − √c)`, `S = Σ√c`              |
//! | capped    | `(Σ√min(c,k))²`                           | `2·√min(c,k)·(S' − √min(c,k))`          |
//! | two-tier  | `α1·(Σ√min(c,t))² + α2·(Σ max(0,√c−√t))²` | small-tier + large-tier terms           |
//! | declining | `(Σc^β)^(1/β) − Σc`                       | `raw · c^β / Σc^β`                      |
//!
//! Raw matching is floored at zero before summation so a negative value
//! can never leak into the rescale factor.

use std::collections::HashSet;

use crate::types::{
    Donation, DonorInfluence, Formula, Project, ProjectMatchingResult, SimulationConfig,
    SimulationResult,
};

impl Formula {
    /// Raw matching and raw per-donation influence for one project's
    /// donation group. The group may be empty.
    fn project_matching(&self, group: &[&Donation]) -> (f64, Vec<DonorInfluence>) {
        if group.is_empty() {
            return (0.0, Vec::new());
        }

        let (raw, terms): (f64, Vec<f64>) = match *self {
            Formula::Standard => {
                let sum_roots: f64 = group.iter().map(|d| d.amount.sqrt()).sum();
                let sum: f64 = group.iter().map(|d| d.amount).sum();
                let raw = sum_roots * sum_roots - sum;
                let terms = group
                    .iter()
                    .map(|d| {
                        let root = d.amount.sqrt();
                        2.0 * root * (sum_roots - root)
                    })
                    .collect();
                (raw, terms)
            }
            Formula::Capped { cap } => {
                let parts: Vec<f64> = group.iter().map(|d| d.amount.min(cap).sqrt()).collect();
                let sum_capped: f64 = parts.iter().sum();
                let raw = sum_capped * sum_capped;
                let terms = parts
                    .iter()
                    .map(|part| 2.0 * part * (sum_capped - part))
                    .collect();
                (raw, terms)
            }
            Formula::TwoTier {
                threshold,
                alpha1,
                alpha2,
            } => {
                let root_t = threshold.sqrt();
                let small: Vec<f64> =
                    group.iter().map(|d| d.amount.min(threshold).sqrt()).collect();
                let large: Vec<f64> = group
                    .iter()
                    .map(|d| (d.amount.sqrt() - root_t).max(0.0))
                    .collect();
                let sum_small: f64 = small.iter().sum();
                let sum_large: f64 = large.iter().sum();
                let raw = alpha1 * sum_small * sum_small + alpha2 * sum_large * sum_large;
                let terms = small
                    .iter()
                    .zip(&large)
                    .map(|(s, l)| {
                        2.0 * alpha1 * s * (sum_small - s) + 2.0 * alpha2 * l * (sum_large - l)
                    })
                    .collect();
                (raw, terms)
            }
            Formula::Declining { beta } => {
                let powered: Vec<f64> = group.iter().map(|d| d.amount.powf(beta)).collect();
                let sum_pow: f64 = powered.iter().sum();
                let sum: f64 = group.iter().map(|d| d.amount).sum();
                let raw = (sum_pow.powf(1.0 / beta) - sum).max(0.0);
                let terms = powered.iter().map(|p| raw * p / sum_pow).collect();
                (raw, terms)
            }
        };

        let influences = group
            .iter()
            .zip(terms)
            .map(|(d, term)| DonorInfluence {
                donor_id: d.donor_id.clone(),
                donation_id: d.id.clone(),
                contribution: d.amount,
                matching_generated: term,
                influence_percentage: 0.0,
            })
            .collect();

        (raw.max(0.0), influences)
    }
}

/// Run the formula stage over all configured projects.
///
/// Projects without valid donations appear in the result with zeroes.
pub(crate) fn run(
    projects: &[Project],
    valid: &[Donation],
    config: &SimulationConfig,
) -> SimulationResult {
    let mut results = Vec::with_capacity(projects.len());
    let mut raws = Vec::with_capacity(projects.len());

    for project in projects {
        let group: Vec<&Donation> = valid
            .iter()
            .filter(|d| d.project_id == project.id)
            .collect();

        let contributions: f64 = group.iter().map(|d| d.amount).sum();
        let contributor_count = group
            .iter()
            .map(|d| d.donor_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let (raw, influences) = config.formula.project_matching(&group);

        raws.push(raw);
        results.push(ProjectMatchingResult {
            project_id: project.id.clone(),
            title: project.title.clone(),
            category: project.category.clone(),
            contributions,
            contributor_count,
            matching_amount: 0.0,
            total_funding: 0.0,
            influences,
        });
    }

    let total_matching = rescale_to_pool(&mut results, &raws, config.effective_pool());

    SimulationResult {
        projects: results,
        total_matching,
        reserved_funds: config.reserved_funds(),
        flagged_donations: Vec::new(),
    }
}

/// Scale per-project raw matching (and the influence terms inside each
/// result) so the totals sum to `pool`, then recompute funding totals and
/// influence percentages. Returns the total matching distributed.
///
/// `raws[i]` is the raw matching for `results[i]`; influence entries are
/// expected to hold raw values and are scaled by the same factor. When
/// the raw sum is zero, everything stays at zero and the pool is not
/// distributed.
pub(crate) fn rescale_to_pool(
    results: &mut [ProjectMatchingResult],
    raws: &[f64],
    pool: f64,
) -> f64 {
    let raw_total: f64 = raws.iter().sum();
    let factor = if raw_total > 0.0 { pool / raw_total } else { 0.0 };

    let mut total = 0.0;
    for (result, &raw) in results.iter_mut().zip(raws) {
        result.matching_amount = raw * factor;
        result.total_funding = result.contributions + result.matching_amount;
        for entry in &mut result.influences {
            entry.matching_generated *= factor;
            entry.influence_percentage = if result.matching_amount > 0.0 {
                entry.matching_generated / result.matching_amount * 100.0
            } else {
                0.0
            };
        }
        total += result.matching_amount;
    }
    total
}
