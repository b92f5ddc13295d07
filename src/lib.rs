//! Academic signal engine: drop-risk scoring, grade anomaly detection,
//! career path ranking, and a pluggable submission grading contract.
//!
//! The scoring functions are pure and hold no state between calls, so they
//! can be called from any number of threads at once.

pub mod anomaly;
pub mod career;
pub mod config;
pub mod grading;
pub mod input;
pub mod models;
pub mod report;
pub mod risk;

pub use anomaly::detect_grade_anomalies;
pub use career::generate_career_recommendations;
pub use config::{ConfigError, EngineConfig, Provider};
pub use grading::{build_backend, GradingBackend, GradingError, GradingRequest};
pub use models::{
    AcademicSignal, Anomaly, AnomalyKind, CareerPath, GradingResult, RiskAssessment, RiskLevel,
    Rubric, SemesterGrade, Severity,
};
pub use risk::predict_drop_risk;
