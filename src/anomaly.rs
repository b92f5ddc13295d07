use tracing::debug;

use crate::models::{Anomaly, AnomalyKind, SemesterGrade, Severity};

pub const ANOMALY_DELTA: f64 = 1.5;
pub const HIGH_SEVERITY_DROP: f64 = 2.0;

/// Flags sudden GPA drops or spikes between consecutive semesters.
///
/// The sequence is taken in the caller's (chronological) order and anomalies
/// are returned in scan order. Sequences shorter than two yield nothing.
pub fn detect_grade_anomalies(student_id: &str, semester_grades: &[SemesterGrade]) -> Vec<Anomaly> {
    let anomalies: Vec<Anomaly> = semester_grades
        .windows(2)
        .filter_map(|pair| classify(&pair[0], &pair[1]))
        .collect();

    debug!(
        student_id,
        semesters = semester_grades.len(),
        anomalies = anomalies.len(),
        "scanned grade history"
    );
    anomalies
}

fn classify(prev: &SemesterGrade, curr: &SemesterGrade) -> Option<Anomaly> {
    let delta = curr.gpa - prev.gpa;

    let (kind, severity) = if delta < -ANOMALY_DELTA {
        let severity = if delta < -HIGH_SEVERITY_DROP {
            Severity::High
        } else {
            Severity::Medium
        };
        (AnomalyKind::Drop, severity)
    } else if delta > ANOMALY_DELTA {
        (AnomalyKind::Spike, Severity::Medium)
    } else {
        return None;
    };

    Some(Anomaly {
        kind,
        semester_label: curr.semester_label.clone(),
        delta,
        severity,
    })
}
