//! # Types
//!
//! Shared data structures used across all stages of the matching engine.
//!
//! ## Design decisions
//!
//! ### Reference data vs. derived data
//!
//! [`Project`], [`Donor`], and [`Donation`] are immutable reference data,
//! created outside the engine (forms, round flows, or the scenario
//! generators in [`crate::generator`]). The engine only reads them.
//!
//! [`DonorInfluence`], [`ProjectMatchingResult`], and [`SimulationResult`]
//! are derived data, recomputed from scratch on every
//! [`crate::simulate`] call. No stage mutates a previous stage's output;
//! each stage consumes a result and produces a new one.
//!
//! ### Formula as a sum type
//!
//! [`Formula`] carries each variant's parameters directly, so an invalid
//! combination (say, a cap on the two-tier formula) is unrepresentable.
//! Parameter validity (positivity, `beta` in `(0, 1)`) is checked once by
//! [`SimulationConfig::validate`] before any computation runs.
//!
//! All types serialize with camelCase field names, matching the wire
//! format the platform frontends already consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// A fundable project in the marketplace. Reference data; read-only to
/// the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Category label used by the categorical reallocation stage.
    pub category: String,
    /// Target funding amount in euros.
    pub target: f64,
}

/// Identity verification strength, ordered weakest to strongest.
///
/// A stronger level satisfies any weaker requirement: a `Phone`-verified
/// donor may make donations that only require `Email`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationLevel {
    None,
    Email,
    Phone,
    Id,
}

impl VerificationLevel {
    /// The verification level required for a donation of `amount` euros.
    ///
    /// Step function: below €10 nothing is required, below €100 an email,
    /// below €500 a phone number, and €500 or more a government id.
    pub fn required_for(amount: f64) -> Self {
        if amount < 10.0 {
            VerificationLevel::None
        } else if amount < 100.0 {
            VerificationLevel::Email
        } else if amount < 500.0 {
            VerificationLevel::Phone
        } else {
            VerificationLevel::Id
        }
    }
}

/// A contributor. Reference data; read-only to the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donor {
    pub id: String,
    pub name: String,
    /// Strongest verification the donor has completed.
    pub verification: VerificationLevel,
    /// True if this round is the donor's first contribution to the platform.
    pub first_time: bool,
    /// Id of the donor who referred this one, if any.
    pub referrer: Option<String>,
}

/// A single donation. Immutable fact once created; the engine filters and
/// reads donations but never mutates them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: String,
    pub project_id: String,
    pub donor_id: String,
    /// Amount in euros; must be positive.
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    /// Origin IP, when known. Donations without one cannot be flagged by
    /// the IP-grouping collusion detector.
    pub ip: Option<String>,
    /// Device identifier, when known.
    pub device: Option<String>,
    /// True if the donation was made within the round's first week.
    pub early_bird: bool,
}

/// Matching formula selector with per-variant parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Formula {
    /// Standard quadratic funding: `(Σ√c)² − Σc`.
    Standard,
    /// Per-donation amounts above `cap` count as `cap`: `(Σ√min(c,k))²`.
    Capped { cap: f64 },
    /// Different matching rates below and above `threshold`:
    /// `α1·(Σ√min(c,t))² + α2·(Σ max(0, √c−√t))²`.
    TwoTier {
        threshold: f64,
        alpha1: f64,
        alpha2: f64,
    },
    /// Declining marginal matching: `(Σc^β)^(1/β) − Σc` with `β` in `(0,1)`.
    Declining { beta: f64 },
}

impl Formula {
    /// Validate this variant's parameters.
    pub fn validate(&self) -> Result<(), EngineError> {
        fn positive(name: &'static str, value: f64) -> Result<(), EngineError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(EngineError::NonPositiveParameter { name, value })
            }
        }

        match *self {
            Formula::Standard => Ok(()),
            Formula::Capped { cap } => positive("cap", cap),
            Formula::TwoTier {
                threshold,
                alpha1,
                alpha2,
            } => {
                positive("threshold", threshold)?;
                positive("alpha1", alpha1)?;
                positive("alpha2", alpha2)
            }
            Formula::Declining { beta } => {
                if beta.is_finite() && beta > 0.0 && beta < 1.0 {
                    Ok(())
                } else {
                    Err(EngineError::ExponentOutOfRange(beta))
                }
            }
        }
    }
}

/// Group-size and timing limits for the collusion detectors.
///
/// `ip` and `device` are the largest group sizes that are still considered
/// organic; a group *exceeding* the limit is flagged whole. `time` controls
/// the sliding-window width: any `time + 1` consecutive donations (by
/// timestamp order) spanning less than five minutes are flagged whole.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollusionThresholds {
    pub ip: usize,
    pub time: usize,
    pub device: usize,
}

impl Default for CollusionThresholds {
    fn default() -> Self {
        CollusionThresholds {
            ip: 3,
            time: 5,
            device: 3,
        }
    }
}

/// Full configuration for one simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    /// Total subsidy to distribute this round; must be positive.
    pub matching_pool: f64,
    /// Matching formula and its parameters.
    pub formula: Formula,
    /// Fraction of the pool withheld from distribution, in `[0, 1)`.
    #[serde(default)]
    pub reserved_fraction: f64,
    /// Collusion detector limits; defaults apply when omitted.
    #[serde(default)]
    pub collusion: CollusionThresholds,
    /// Remove collusion-flagged donations before matching.
    #[serde(default)]
    pub enable_anti_collusion: bool,
    /// Remove donations whose donor is insufficiently verified.
    #[serde(default)]
    pub enable_verification: bool,
    /// Re-weight matching by first-time / early-bird / referral bonuses.
    #[serde(default)]
    pub enable_incentives: bool,
    /// Re-partition the pool evenly across project categories.
    #[serde(default)]
    pub categorical_allocation: bool,
}

impl SimulationConfig {
    /// Reject invalid configuration before any computation runs.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.matching_pool.is_finite() && self.matching_pool > 0.0) {
            return Err(EngineError::InvalidPool(self.matching_pool));
        }
        if !(self.reserved_fraction.is_finite()
            && (0.0..1.0).contains(&self.reserved_fraction))
        {
            return Err(EngineError::InvalidReservedFraction(self.reserved_fraction));
        }
        self.formula.validate()
    }

    /// Portion of the pool actually distributed across projects.
    pub fn effective_pool(&self) -> f64 {
        self.matching_pool * (1.0 - self.reserved_fraction)
    }

    /// Portion of the pool withheld from distribution.
    pub fn reserved_funds(&self) -> f64 {
        self.matching_pool * self.reserved_fraction
    }
}

/// One donation's share of a project's matching. Derived data,
/// recalculated on every formula run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorInfluence {
    pub donor_id: String,
    pub donation_id: String,
    /// The donation amount this entry corresponds to.
    pub contribution: f64,
    /// Matching attributable to this donation, after the stage's rescale.
    pub matching_generated: f64,
    /// `matching_generated / project matching × 100`; 0 when the project
    /// received no matching.
    pub influence_percentage: f64,
}

/// Per-project outcome of a simulation stage.
///
/// `total_funding == contributions + matching_amount` holds after every
/// stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMatchingResult {
    pub project_id: String,
    pub title: String,
    pub category: String,
    /// Sum of valid direct contributions.
    pub contributions: f64,
    /// Number of distinct donors behind those contributions.
    pub contributor_count: usize,
    /// Subsidy allocated to the project.
    pub matching_amount: f64,
    /// `contributions + matching_amount`.
    pub total_funding: f64,
    pub influences: Vec<DonorInfluence>,
}

/// The sole output type threaded through all four stages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub projects: Vec<ProjectMatchingResult>,
    /// Total matching distributed. Equals the effective pool whenever the
    /// raw matching sum is positive; may fall below it after categorical
    /// reallocation leaves a donation-less category's share undistributed.
    pub total_matching: f64,
    /// `matching_pool × reserved_fraction`, withheld from distribution.
    pub reserved_funds: f64,
    /// Donations flagged by the collusion detectors. Populated only when
    /// anti-collusion is enabled; empty otherwise.
    pub flagged_donations: Vec<Donation>,
}
