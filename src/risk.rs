use tracing::debug;

use crate::models::{round_to, AcademicSignal, RiskAssessment, RiskLevel};

pub const HIGH_RISK_THRESHOLD: f64 = 0.6;
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.35;

/// Additive rule scoring over a student's academic and engagement signals.
///
/// Each signal contributes an independent non-negative penalty; the sum is
/// clamped to `[0, 1]` and rounded to three places. Out-of-domain inputs are
/// accepted as-is and this never fails. A trained classifier can replace the
/// body as long as it keeps the bounded score and the three-level bucket.
pub fn predict_drop_risk(
    cgpa: f64,
    attendance_pct: f64,
    assignments_missed: u32,
    engagement_score: f64,
) -> RiskAssessment {
    let raw = cgpa_penalty(cgpa)
        + attendance_penalty(attendance_pct)
        + missed_assignments_penalty(assignments_missed)
        + engagement_penalty(engagement_score);

    let risk_score = round_to(raw.clamp(0.0, 1.0), 3);
    let risk_level = level_for_score(risk_score);
    debug!(
        cgpa,
        attendance_pct,
        assignments_missed,
        engagement_score,
        risk_score,
        %risk_level,
        "scored drop risk"
    );

    RiskAssessment {
        risk_score,
        risk_level,
    }
}

pub fn assess(signal: &AcademicSignal) -> RiskAssessment {
    predict_drop_risk(
        signal.cgpa,
        signal.attendance_pct,
        signal.assignments_missed,
        signal.engagement_score,
    )
}

pub fn level_for_score(score: f64) -> RiskLevel {
    if score >= HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if score >= MEDIUM_RISK_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn cgpa_penalty(cgpa: f64) -> f64 {
    if cgpa < 6.0 {
        0.40
    } else if cgpa < 7.0 {
        0.20
    } else {
        0.0
    }
}

fn attendance_penalty(attendance_pct: f64) -> f64 {
    if attendance_pct < 65.0 {
        0.35
    } else if attendance_pct < 75.0 {
        0.20
    } else {
        0.0
    }
}

fn missed_assignments_penalty(assignments_missed: u32) -> f64 {
    match assignments_missed {
        0..=3 => 0.0,
        _ => 0.15,
    }
}

fn engagement_penalty(engagement_score: f64) -> f64 {
    if engagement_score < 0.3 {
        0.10
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strong_student_has_no_risk() {
        let assessment = predict_drop_risk(9.2, 95.0, 0, 0.9);
        assert_eq!(assessment.risk_score, 0.0);
        assert_eq!(assessment.risk_level, RiskLevel::Low);
    }

    #[test]
    fn every_penalty_clamps_to_one() {
        let assessment = predict_drop_risk(5.1, 40.0, 7, 0.1);
        assert_eq!(assessment.risk_score, 1.0);
        assert_eq!(assessment.risk_level, RiskLevel::High);
    }

    #[test]
    fn penalties_follow_expected_tiers() {
        assert_eq!(cgpa_penalty(5.99), 0.40);
        assert_eq!(cgpa_penalty(6.0), 0.20);
        assert_eq!(cgpa_penalty(7.0), 0.0);
        assert_eq!(attendance_penalty(64.9), 0.35);
        assert_eq!(attendance_penalty(65.0), 0.20);
        assert_eq!(attendance_penalty(75.0), 0.0);
        assert_eq!(missed_assignments_penalty(3), 0.0);
        assert_eq!(missed_assignments_penalty(4), 0.15);
        assert_eq!(engagement_penalty(0.29), 0.10);
        assert_eq!(engagement_penalty(0.3), 0.0);
    }

    #[test]
    fn mid_range_student_is_medium() {
        // 0.20 (cgpa) + 0.15 (missed work)
        let assessment = predict_drop_risk(6.5, 80.0, 5, 0.6);
        assert_eq!(assessment.risk_score, 0.35);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn cgpa_and_attendance_alone_reach_high() {
        let assessment = predict_drop_risk(5.5, 70.0, 0, 0.5);
        assert_eq!(assessment.risk_score, 0.6);
        assert_eq!(assessment.risk_level, RiskLevel::High);
    }

    #[test]
    fn out_of_domain_inputs_do_not_fail() {
        let assessment = predict_drop_risk(-3.0, 250.0, 0, f64::NAN);
        assert_eq!(assessment.risk_score, 0.4);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn assess_matches_scalar_form() {
        let signal = AcademicSignal {
            cgpa: 6.8,
            attendance_pct: 60.0,
            assignments_missed: 2,
            engagement_score: 0.2,
        };
        assert_eq!(assess(&signal), predict_drop_risk(6.8, 60.0, 2, 0.2));
    }

    #[test]
    fn thresholds_bucket_scores() {
        assert_eq!(level_for_score(0.0), RiskLevel::Low);
        assert_eq!(level_for_score(0.349), RiskLevel::Low);
        assert_eq!(level_for_score(0.35), RiskLevel::Medium);
        assert_eq!(level_for_score(0.599), RiskLevel::Medium);
        assert_eq!(level_for_score(0.6), RiskLevel::High);
        assert_eq!(level_for_score(1.0), RiskLevel::High);
    }

    proptest! {
        #[test]
        fn score_is_bounded_and_level_consistent(
            cgpa in 0.0f64..10.0,
            attendance in 0.0f64..100.0,
            missed in 0u32..20,
            engagement in 0.0f64..1.0,
        ) {
            let assessment = predict_drop_risk(cgpa, attendance, missed, engagement);
            prop_assert!((0.0..=1.0).contains(&assessment.risk_score));
            prop_assert_eq!(assessment.risk_level, level_for_score(assessment.risk_score));
        }

        #[test]
        fn strong_profiles_are_low_risk(
            cgpa in 9.0f64..10.0,
            attendance in 90.0f64..100.0,
            engagement in 0.8f64..1.0,
        ) {
            let assessment = predict_drop_risk(cgpa, attendance, 0, engagement);
            prop_assert_eq!(assessment.risk_score, 0.0);
            prop_assert_eq!(assessment.risk_level, RiskLevel::Low);
        }

        #[test]
        fn weak_profiles_are_high_risk(
            cgpa in 0.0f64..6.0,
            attendance in 0.0f64..65.0,
            missed in 4u32..50,
            engagement in 0.0f64..0.3,
        ) {
            let assessment = predict_drop_risk(cgpa, attendance, missed, engagement);
            prop_assert_eq!(assessment.risk_score, 1.0);
            prop_assert_eq!(assessment.risk_level, RiskLevel::High);
        }

        #[test]
        fn level_is_monotonic_in_score(a in 0.0f64..1.0, b in 0.0f64..1.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(level_for_score(low) <= level_for_score(high));
        }
    }
}
