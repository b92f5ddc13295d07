use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Named grading criteria mapped to their maximum point value.
pub type Rubric = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcademicSignal {
    pub cgpa: f64,
    pub attendance_pct: f64,
    pub assignments_missed: u32,
    pub engagement_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemesterGrade {
    pub semester_label: String,
    pub gpa: f64,
}

impl SemesterGrade {
    pub fn new(semester_label: impl Into<String>, gpa: f64) -> Self {
        Self {
            semester_label: semester_label.into(),
            gpa,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyKind {
    Drop,
    Spike,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyKind::Drop => f.write_str("Sudden drop"),
            AnomalyKind::Spike => f.write_str("Sudden spike"),
        }
    }
}

/// Magnitude of an anomaly, independent of its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Medium => f.write_str("Medium"),
            Severity::High => f.write_str("High"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub semester_label: String,
    pub delta: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerPath {
    pub name: String,
    pub match_percentage: f64,
    pub skill_gaps: Vec<String>,
    pub recommended_courses: Vec<String>,
    pub salary_range: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    pub submission_id: Uuid,
    pub suggested_grade: f64,
    pub confidence: f64,
    pub feedback: String,
    pub rubric_scores: BTreeMap<String, f64>,
}

/// One row of a batch risk recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentSignal {
    pub student_id: String,
    pub name: String,
    pub signal: AcademicSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRisk {
    pub student_id: String,
    pub name: String,
    pub assessment: RiskAssessment,
}

/// Rounds to `places` decimal places on the exact binary value, ties to even.
pub fn round_to(value: f64, places: usize) -> f64 {
    format!("{value:.places$}").parse().unwrap_or(value)
}
