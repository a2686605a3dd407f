use chrono::{Duration, TimeZone, Utc};

use crate::filter::{detect_collusion, is_verified};
use crate::types::*;
use crate::simulate;

// ── Fixture helpers ─────────────────────────────────────────────────

fn thresholds(ip: usize, time: usize, device: usize) -> CollusionThresholds {
    CollusionThresholds { ip, time, device }
}

fn donation(id: &str, minute: i64, ip: Option<&str>, device: Option<&str>) -> Donation {
    let base = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
    Donation {
        id: id.to_string(),
        project_id: "p".to_string(),
        donor_id: format!("donor-{id}"),
        amount: 10.0,
        timestamp: base + Duration::minutes(minute),
        ip: ip.map(str::to_string),
        device: device.map(str::to_string),
        early_bird: false,
    }
}

fn donor_with(verification: VerificationLevel) -> Donor {
    Donor {
        id: "d".to_string(),
        name: "Donor".to_string(),
        verification,
        first_time: false,
        referrer: None,
    }
}

fn amount_donation(amount: f64) -> Donation {
    Donation {
        id: "don".to_string(),
        project_id: "p".to_string(),
        donor_id: "d".to_string(),
        amount,
        timestamp: Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap(),
        ip: None,
        device: None,
        early_bird: false,
    }
}

fn ids(donations: &[Donation]) -> Vec<&str> {
    donations.iter().map(|d| d.id.as_str()).collect()
}

// ── Collusion: IP and device grouping ───────────────────────────────

#[test]
fn ip_group_over_threshold_is_flagged_whole() {
    // Four donations from one address against a limit of three.
    let donations: Vec<Donation> = (0..4)
        .map(|i| donation(&format!("d{i}"), i * 60, Some("10.0.0.1"), None))
        .collect();

    let flagged = detect_collusion(&donations, &thresholds(3, 5, 3));
    assert_eq!(ids(&flagged), vec!["d0", "d1", "d2", "d3"]);
}

#[test]
fn ip_group_at_threshold_is_organic() {
    let donations: Vec<Donation> = (0..3)
        .map(|i| donation(&format!("d{i}"), i * 60, Some("10.0.0.1"), None))
        .collect();

    assert!(detect_collusion(&donations, &thresholds(3, 5, 3)).is_empty());
}

#[test]
fn device_group_over_threshold_is_flagged() {
    let donations: Vec<Donation> = (0..3)
        .map(|i| donation(&format!("d{i}"), i * 60, None, Some("dev-1")))
        .collect();

    let flagged = detect_collusion(&donations, &thresholds(3, 5, 2));
    assert_eq!(flagged.len(), 3);
}

#[test]
fn missing_identifiers_cannot_be_grouped() {
    // No IPs, no devices, donations an hour apart: nothing to flag.
    let donations: Vec<Donation> = (0..10)
        .map(|i| donation(&format!("d{i}"), i * 60, None, None))
        .collect();

    assert!(detect_collusion(&donations, &thresholds(1, 5, 1)).is_empty());
}

// ── Collusion: burst window ─────────────────────────────────────────

#[test]
fn burst_inside_five_minutes_is_flagged() {
    // Window width time+1 = 3; three donations within two minutes.
    let donations = vec![
        donation("d0", 0, None, None),
        donation("d1", 1, None, None),
        donation("d2", 2, None, None),
        donation("later", 120, None, None),
    ];

    let flagged = detect_collusion(&donations, &thresholds(9, 2, 9));
    assert_eq!(ids(&flagged), vec!["d0", "d1", "d2"]);
}

#[test]
fn spread_out_donations_are_not_a_burst() {
    let donations: Vec<Donation> = (0..6)
        .map(|i| donation(&format!("d{i}"), i * 10, None, None))
        .collect();

    assert!(detect_collusion(&donations, &thresholds(9, 2, 9)).is_empty());
}

#[test]
fn overlapping_burst_windows_flag_the_union() {
    // Five donations a minute apart: every length-3 window spans two
    // minutes, so all five are flagged.
    let donations: Vec<Donation> = (0..5)
        .map(|i| donation(&format!("d{i}"), i, None, None))
        .collect();

    let flagged = detect_collusion(&donations, &thresholds(9, 2, 9));
    assert_eq!(flagged.len(), 5);
}

// ── Collusion: union semantics ──────────────────────────────────────

#[test]
fn donation_flagged_by_multiple_detectors_appears_once() {
    // Same four donations share an IP and a device; both group
    // detectors fire, the union still lists each donation once.
    let donations: Vec<Donation> = (0..4)
        .map(|i| donation(&format!("d{i}"), i * 60, Some("10.0.0.1"), Some("dev-1")))
        .collect();

    let flagged = detect_collusion(&donations, &thresholds(3, 5, 3));
    assert_eq!(ids(&flagged), vec!["d0", "d1", "d2", "d3"]);
}

#[test]
fn detection_is_idempotent() {
    let donations: Vec<Donation> = (0..6)
        .map(|i| {
            donation(
                &format!("d{i}"),
                i,
                Some(if i < 4 { "10.0.0.1" } else { "10.0.0.2" }),
                None,
            )
        })
        .collect();

    let first = detect_collusion(&donations, &thresholds(3, 2, 3));
    let second = detect_collusion(&donations, &thresholds(3, 2, 3));
    assert_eq!(first, second);
}

// ── Verification eligibility ────────────────────────────────────────

#[test]
fn verification_ladder() {
    let cases = [
        // (amount, donor level, eligible)
        (5.0, VerificationLevel::None, true),
        (10.0, VerificationLevel::None, false),
        (50.0, VerificationLevel::Email, true),
        (600.0, VerificationLevel::Email, false),
        (100.0, VerificationLevel::Email, false),
        (100.0, VerificationLevel::Phone, true),
        (499.99, VerificationLevel::Phone, true),
        (500.0, VerificationLevel::Phone, false),
        (500.0, VerificationLevel::Id, true),
        (5.0, VerificationLevel::Id, true),
    ];

    for (amount, level, expected) in cases {
        let eligible = is_verified(&amount_donation(amount), &donor_with(level));
        assert_eq!(
            eligible, expected,
            "amount {amount} with {level:?} should be eligible={expected}"
        );
    }
}

// ── Filters through the full pipeline ───────────────────────────────

fn pipeline_config(enable_anti_collusion: bool, enable_verification: bool) -> SimulationConfig {
    SimulationConfig {
        matching_pool: 1_000.0,
        formula: Formula::Standard,
        reserved_fraction: 0.0,
        collusion: CollusionThresholds::default(),
        enable_anti_collusion,
        enable_verification,
        enable_incentives: false,
        categorical_allocation: false,
    }
}

#[test]
fn verification_gates_large_donations() {
    let projects = vec![Project {
        id: "p".to_string(),
        title: "P".to_string(),
        category: "climate".to_string(),
        target: 1_000.0,
    }];
    let donors = vec![
        Donor {
            id: "email-donor".to_string(),
            name: "E".to_string(),
            verification: VerificationLevel::Email,
            first_time: false,
            referrer: None,
        },
        Donor {
            id: "id-donor".to_string(),
            name: "I".to_string(),
            verification: VerificationLevel::Id,
            first_time: false,
            referrer: None,
        },
    ];
    let mut big = donation("big", 0, None, None);
    big.donor_id = "email-donor".to_string();
    big.amount = 600.0;
    let mut small = donation("small", 60, None, None);
    small.donor_id = "email-donor".to_string();
    small.amount = 50.0;
    let mut other = donation("other", 120, None, None);
    other.donor_id = "id-donor".to_string();
    other.amount = 50.0;
    let donations = vec![big, small, other];

    let result = simulate(&projects, &donors, &donations, &pipeline_config(false, true)).unwrap();
    let p = &result.projects[0];
    // The €600 email-verified donation is gone; the two €50s remain.
    assert_eq!(p.influences.len(), 2);
    assert!(p.influences.iter().all(|e| e.donation_id != "big"));
    assert_eq!(p.contributions, 100.0);

    // With verification off the same donation counts.
    let relaxed =
        simulate(&projects, &donors, &donations, &pipeline_config(false, false)).unwrap();
    assert_eq!(relaxed.projects[0].influences.len(), 3);
}

#[test]
fn flagged_donations_reported_only_when_enforced() {
    let projects = vec![Project {
        id: "p".to_string(),
        title: "P".to_string(),
        category: "climate".to_string(),
        target: 1_000.0,
    }];
    let donors: Vec<Donor> = (0..4)
        .map(|i| Donor {
            id: format!("donor-d{i}"),
            name: format!("D{i}"),
            verification: VerificationLevel::Id,
            first_time: false,
            referrer: None,
        })
        .collect();
    let donations: Vec<Donation> = (0..4)
        .map(|i| donation(&format!("d{i}"), i * 60, Some("10.0.0.1"), None))
        .collect();

    let enforced =
        simulate(&projects, &donors, &donations, &pipeline_config(true, false)).unwrap();
    assert_eq!(enforced.flagged_donations.len(), 4);
    // All four were the project's only donations, so nothing matches.
    assert_eq!(enforced.projects[0].influences.len(), 0);
    assert_eq!(enforced.total_matching, 0.0);

    let relaxed =
        simulate(&projects, &donors, &donations, &pipeline_config(false, false)).unwrap();
    assert!(relaxed.flagged_donations.is_empty());
    assert_eq!(relaxed.projects[0].influences.len(), 4);
}
