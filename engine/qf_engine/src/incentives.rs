//! # Incentive adjustment stage
//!
//! Optional post-formula re-weighting. Each influence entry's matching is
//! multiplied by a bonus factor, the boosted entries are summed per
//! project to form a *new* raw matching amount, and everything is rescaled
//! to the pool a second time.
//!
//! This stage fully replaces the formula stage's matching numbers: the
//! bonuses re-weight the already-rescaled shares, they are not added on
//! top of the pool. The pool total is invariant across both passes.

use std::collections::HashMap;

use crate::formula::rescale_to_pool;
use crate::types::{Donation, Donor, SimulationConfig, SimulationResult};

/// Extra weight for a donor's first contribution to the platform.
const FIRST_TIME_BONUS: f64 = 0.25;
/// Extra weight for donations made within the round's first week.
const EARLY_BIRD_BONUS: f64 = 0.10;
/// Extra weight for donors who arrived through a referral.
const REFERRAL_BONUS: f64 = 0.05;

/// Bonus multiplier for one influence entry.
fn bonus_factor(donor: Option<&&Donor>, donation: Option<&&Donation>) -> f64 {
    let mut factor = 1.0;
    if let Some(donor) = donor {
        if donor.first_time {
            factor += FIRST_TIME_BONUS;
        }
        if donor.referrer.is_some() {
            factor += REFERRAL_BONUS;
        }
    }
    if let Some(donation) = donation {
        if donation.early_bird {
            factor += EARLY_BIRD_BONUS;
        }
    }
    factor
}

/// Re-weight the formula stage's matching by incentive bonuses and
/// rescale back to the pool.
pub(crate) fn apply(
    mut result: SimulationResult,
    donors: &[Donor],
    donations: &[Donation],
    config: &SimulationConfig,
) -> SimulationResult {
    let donor_index: HashMap<&str, &Donor> =
        donors.iter().map(|d| (d.id.as_str(), d)).collect();
    let donation_index: HashMap<&str, &Donation> =
        donations.iter().map(|d| (d.id.as_str(), d)).collect();

    let mut raws = Vec::with_capacity(result.projects.len());
    for project in &mut result.projects {
        let mut raw = 0.0;
        for entry in &mut project.influences {
            let factor = bonus_factor(
                donor_index.get(entry.donor_id.as_str()),
                donation_index.get(entry.donation_id.as_str()),
            );
            entry.matching_generated *= factor;
            raw += entry.matching_generated;
        }
        raws.push(raw);
    }

    result.total_matching =
        rescale_to_pool(&mut result.projects, &raws, config.effective_pool());
    result
}
