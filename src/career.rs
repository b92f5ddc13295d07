use once_cell::sync::Lazy;
use tracing::debug;

use crate::models::{round_to, CareerPath};

pub const MAX_MATCH_PERCENTAGE: f64 = 99.0;
const CGPA_FLOOR: f64 = 6.0;
const CGPA_SPAN: f64 = 4.0;
const CGPA_WEIGHT: f64 = 5.0;

fn path(
    name: &str,
    match_percentage: f64,
    skill_gaps: &[&str],
    recommended_courses: &[&str],
    salary_range: &str,
) -> CareerPath {
    CareerPath {
        name: name.to_string(),
        match_percentage,
        skill_gaps: skill_gaps.iter().map(|s| s.to_string()).collect(),
        recommended_courses: recommended_courses.iter().map(|s| s.to_string()).collect(),
        salary_range: salary_range.to_string(),
    }
}

/// Reference career paths with their base match. Built once, never mutated.
static CATALOG: Lazy<Vec<CareerPath>> = Lazy::new(|| {
    vec![
        path(
            "Machine Learning Engineer",
            88.0,
            &["Cloud Computing", "Deep Learning", "MLOps"],
            &["Advanced ML", "Cloud Architecture", "Data Engineering"],
            "₹18L – ₹35L",
        ),
        path(
            "Software Development Engineer",
            92.0,
            &["System Design", "Distributed Systems"],
            &["System Design", "Database Internals"],
            "₹14L – ₹28L",
        ),
        path(
            "Data Scientist",
            75.0,
            &["Statistical Modelling", "R Programming", "Business Analytics"],
            &["Applied Statistics", "R for Data Science"],
            "₹12L – ₹24L",
        ),
    ]
});

pub fn catalog() -> &'static [CareerPath] {
    &CATALOG
}

/// Linear normalization of `[6, 10]` onto `[0, 1]`. Not clamped.
pub fn cgpa_factor(cgpa: f64) -> f64 {
    (cgpa - CGPA_FLOOR) / CGPA_SPAN
}

/// Ranks the catalog against a student's profile, best match first.
///
/// Every path is an owned copy of the catalog entry. Ties keep catalog order.
/// `strong_subjects` and `weak_subjects` are part of the contract but do not
/// influence the ranking yet.
pub fn generate_career_recommendations(
    department: &str,
    cgpa: f64,
    strong_subjects: &[String],
    weak_subjects: &[String],
) -> Vec<CareerPath> {
    let factor = cgpa_factor(cgpa);

    let mut paths: Vec<CareerPath> = CATALOG
        .iter()
        .cloned()
        .map(|mut path| {
            let adjusted = (path.match_percentage + factor * CGPA_WEIGHT).min(MAX_MATCH_PERCENTAGE);
            path.match_percentage = round_to(adjusted, 1);
            path
        })
        .collect();

    paths.sort_by(|a, b| {
        b.match_percentage
            .partial_cmp(&a.match_percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    debug!(
        department,
        cgpa,
        strong = strong_subjects.len(),
        weak = weak_subjects.len(),
        top = paths.first().map(|p| p.name.as_str()).unwrap_or_default(),
        "ranked career paths"
    );
    paths
}
