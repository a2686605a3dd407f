//! # Scenario generators
//!
//! Demo donor/donation generation for the simulator surfaces. Not part of
//! the engine's correctness contract, but test fixtures depend on it being
//! reproducible: every function takes an explicit [`Rng`] so callers can
//! seed a [`rand::rngs::StdRng`] and get identical scenarios run after run.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::types::{Donation, Donor, Project, VerificationLevel};

/// Donations made within this many days of the round start carry the
/// early-bird incentive.
pub const EARLY_BIRD_WINDOW_DAYS: i64 = 7;

/// Length of a generated funding round, in days.
const ROUND_LENGTH_DAYS: i64 = 30;

/// Amount bands, in euros, for weighted-random donation sizing.
const SMALL_BAND: (f64, f64) = (1.0, 25.0);
const MEDIUM_BAND: (f64, f64) = (25.0, 250.0);
const LARGE_BAND: (f64, f64) = (250.0, 2_000.0);

const DONOR_NAMES: &[&str] = &[
    "Anna", "Ben", "Clara", "David", "Elif", "Frieda", "Georg", "Hannah", "Ismail", "Jonas",
    "Katrin", "Lukas", "Miriam", "Noah", "Ozan", "Paula", "Quentin", "Rabea", "Stefan", "Tara",
];

/// Selection probabilities for the small/medium/large amount bands.
/// Weights are normalised before use, so they need not sum to 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandWeights {
    pub small: f64,
    pub medium: f64,
    pub large: f64,
}

/// Pre-baked donation-size mixes for the demo surfaces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scenario {
    /// Mostly small donations with a modest mid/large tail.
    Realistic,
    /// Dominated by a few very large donations.
    WhaleDominated,
    /// Almost entirely small donations.
    Grassroots,
    /// Caller-supplied band weights.
    Custom(BandWeights),
}

impl Scenario {
    fn weights(self) -> BandWeights {
        match self {
            Scenario::Realistic => BandWeights {
                small: 0.60,
                medium: 0.30,
                large: 0.10,
            },
            Scenario::WhaleDominated => BandWeights {
                small: 0.20,
                medium: 0.20,
                large: 0.60,
            },
            Scenario::Grassroots => BandWeights {
                small: 0.85,
                medium: 0.14,
                large: 0.01,
            },
            Scenario::Custom(weights) => weights,
        }
    }
}

/// Create a single donation stamped with the current time.
///
/// IP and device identifiers are synthesised. The early-bird flag is
/// derived from the round's start: a donation placed within the first
/// [`EARLY_BIRD_WINDOW_DAYS`] days qualifies.
pub fn create_donation<R: Rng>(
    rng: &mut R,
    project_id: &str,
    donor_id: &str,
    amount: f64,
    round_start: DateTime<Utc>,
) -> Donation {
    let timestamp = Utc::now();
    donation_at(rng, project_id, donor_id, amount, timestamp, round_start)
}

/// Create a donation with an explicit timestamp (used by the bulk
/// generators to spread donations across the round).
pub fn donation_at<R: Rng>(
    rng: &mut R,
    project_id: &str,
    donor_id: &str,
    amount: f64,
    timestamp: DateTime<Utc>,
    round_start: DateTime<Utc>,
) -> Donation {
    Donation {
        id: format!("don-{:08x}", rng.gen::<u32>()),
        project_id: project_id.to_string(),
        donor_id: donor_id.to_string(),
        amount,
        timestamp,
        ip: Some(synth_ip(rng)),
        device: Some(synth_device(rng)),
        early_bird: timestamp < round_start + Duration::days(EARLY_BIRD_WINDOW_DAYS),
    }
}

/// Generate `count` demo donors with mixed verification levels,
/// first-time flags, and occasional referrals to earlier donors.
pub fn generate_donors<R: Rng>(rng: &mut R, count: usize) -> Vec<Donor> {
    let mut donors = Vec::with_capacity(count);
    for i in 0..count {
        let verification = match rng.gen_range(0..100) {
            0..=14 => VerificationLevel::None,
            15..=59 => VerificationLevel::Email,
            60..=84 => VerificationLevel::Phone,
            _ => VerificationLevel::Id,
        };
        let referrer = if i > 0 && rng.gen_bool(0.15) {
            Some(format!("donor-{:03}", rng.gen_range(0..i)))
        } else {
            None
        };
        donors.push(Donor {
            id: format!("donor-{:03}", i),
            name: format!(
                "{} {}.",
                DONOR_NAMES[rng.gen_range(0..DONOR_NAMES.len())],
                (b'A' + rng.gen_range(0..26u8)) as char
            ),
            verification,
            first_time: rng.gen_bool(0.35),
            referrer,
        });
    }
    donors
}

/// Generate `count` donations spread across the given projects and
/// donors, with amounts drawn from the scenario's band mix and timestamps
/// spread over a [`ROUND_LENGTH_DAYS`]-day round.
pub fn generate_donations<R: Rng>(
    rng: &mut R,
    projects: &[Project],
    donors: &[Donor],
    count: usize,
    scenario: Scenario,
    round_start: DateTime<Utc>,
) -> Vec<Donation> {
    if projects.is_empty() || donors.is_empty() {
        return Vec::new();
    }

    let mut donations = Vec::with_capacity(count);
    for _ in 0..count {
        let project = &projects[rng.gen_range(0..projects.len())];
        let donor = &donors[rng.gen_range(0..donors.len())];
        let amount = draw_amount(rng, scenario.weights());
        let offset_minutes = rng.gen_range(0..ROUND_LENGTH_DAYS * 24 * 60);
        let timestamp = round_start + Duration::minutes(offset_minutes);
        donations.push(donation_at(
            rng,
            &project.id,
            &donor.id,
            amount,
            timestamp,
            round_start,
        ));
    }
    donations
}

/// Draw an amount from one of the three bands, weighted by `weights`,
/// rounded to whole cents.
fn draw_amount<R: Rng>(rng: &mut R, weights: BandWeights) -> f64 {
    let total = weights.small + weights.medium + weights.large;
    let roll = rng.gen_range(0.0..total.max(f64::MIN_POSITIVE));
    let (lo, hi) = if roll < weights.small {
        SMALL_BAND
    } else if roll < weights.small + weights.medium {
        MEDIUM_BAND
    } else {
        LARGE_BAND
    };
    let amount = rng.gen_range(lo..hi);
    (amount * 100.0).round() / 100.0
}

fn synth_ip<R: Rng>(rng: &mut R) -> String {
    format!(
        "10.{}.{}.{}",
        rng.gen_range(0..256),
        rng.gen_range(0..256),
        rng.gen_range(1..255)
    )
}

fn synth_device<R: Rng>(rng: &mut R) -> String {
    format!("device-{:06x}", rng.gen::<u32>() & 0xff_ffff)
}
