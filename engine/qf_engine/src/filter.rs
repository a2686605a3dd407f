//! # Donation filter stage
//!
//! Decides which donations count toward matching. Two independent,
//! purely subtractive filters:
//!
//! - **Anti-collusion** — [`detect_collusion`] flags donation groups that
//!   share an IP address or device identifier beyond the configured group
//!   size, and bursts of donations clustered in time.
//! - **Verification** — [`is_verified`] gates each donation on the donor
//!   holding at least the verification level its amount requires.
//!
//! A donation removed by either filter is excluded from all downstream
//! stages. Neither filter ever adds a donation back.

use std::collections::{HashMap, HashSet};

use chrono::Duration;

use crate::types::{CollusionThresholds, Donation, Donor, SimulationConfig, VerificationLevel};

/// Donations closer together than this many seconds, across a full
/// sliding window, are treated as a coordinated burst.
const BURST_WINDOW_SECS: i64 = 5 * 60;

/// Flag donations that look coordinated.
///
/// Three detectors run independently over the same input:
///
/// 1. Group by IP address; any group larger than `thresholds.ip` is
///    flagged whole. Donations without an IP are skipped by this detector.
/// 2. Group by device identifier against `thresholds.device`, same rule.
/// 3. Sort by timestamp ascending and slide a window of
///    `thresholds.time + 1` consecutive donations; whenever the window
///    spans less than five minutes, the whole window is flagged.
///
/// The result is the de-duplicated union, in input order: a donation
/// caught by several detectors appears exactly once. Deterministic and
/// idempotent for a given input.
pub fn detect_collusion(
    donations: &[Donation],
    thresholds: &CollusionThresholds,
) -> Vec<Donation> {
    let mut flagged: HashSet<&str> = HashSet::new();

    flag_shared_key(donations, thresholds.ip, &mut flagged, |d| d.ip.as_deref());
    flag_shared_key(donations, thresholds.device, &mut flagged, |d| {
        d.device.as_deref()
    });
    flag_bursts(donations, thresholds.time, &mut flagged);

    donations
        .iter()
        .filter(|d| flagged.contains(d.id.as_str()))
        .cloned()
        .collect()
}

/// Group donations by a shared key and flag every group exceeding
/// `max_group` members. Donations without the key cannot be flagged here.
fn flag_shared_key<'a>(
    donations: &'a [Donation],
    max_group: usize,
    flagged: &mut HashSet<&'a str>,
    key: impl Fn(&'a Donation) -> Option<&'a str>,
) {
    let mut groups: HashMap<&str, Vec<&'a Donation>> = HashMap::new();
    for donation in donations {
        if let Some(k) = key(donation) {
            groups.entry(k).or_default().push(donation);
        }
    }
    for group in groups.values() {
        if group.len() > max_group {
            for donation in group {
                flagged.insert(donation.id.as_str());
            }
        }
    }
}

/// Slide a window of `burst_len + 1` timestamp-ordered donations and flag
/// every window whose span is under [`BURST_WINDOW_SECS`].
fn flag_bursts<'a>(donations: &'a [Donation], burst_len: usize, flagged: &mut HashSet<&'a str>) {
    let window = burst_len + 1;
    if donations.len() < window {
        return;
    }

    let mut ordered: Vec<&Donation> = donations.iter().collect();
    ordered.sort_by_key(|d| d.timestamp);

    for start in 0..=(ordered.len() - window) {
        let span = ordered[start + window - 1].timestamp - ordered[start].timestamp;
        if span < Duration::seconds(BURST_WINDOW_SECS) {
            for donation in &ordered[start..start + window] {
                flagged.insert(donation.id.as_str());
            }
        }
    }
}

/// True when `donor` holds at least the verification level required for
/// the donation's amount.
pub fn is_verified(donation: &Donation, donor: &Donor) -> bool {
    donor.verification >= VerificationLevel::required_for(donation.amount)
}

/// Apply both filters per the config toggles, returning the donations
/// that count toward matching.
///
/// `flagged` must be the [`detect_collusion`] output for the same input
/// (empty when anti-collusion is disabled). `donors` must contain every
/// donor referenced by `donations`; dangling references are excluded
/// before this stage runs.
pub(crate) fn valid_donations(
    donations: &[Donation],
    donors: &HashMap<&str, &Donor>,
    flagged: &[Donation],
    config: &SimulationConfig,
) -> Vec<Donation> {
    let flagged_ids: HashSet<&str> = flagged.iter().map(|d| d.id.as_str()).collect();

    donations
        .iter()
        .filter(|d| !(config.enable_anti_collusion && flagged_ids.contains(d.id.as_str())))
        .filter(|d| {
            if !config.enable_verification {
                return true;
            }
            match donors.get(d.donor_id.as_str()) {
                Some(donor) => is_verified(d, donor),
                None => false,
            }
        })
        .cloned()
        .collect()
}
