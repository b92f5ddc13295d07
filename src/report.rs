use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{RiskLevel, StudentRisk, StudentSignal};
use crate::risk;

#[derive(Debug, Clone, PartialEq)]
pub struct LevelSummary {
    pub level: RiskLevel,
    pub count: usize,
    pub avg_score: f64,
}

/// Scores every student independently, highest risk first.
pub fn rank_students(students: &[StudentSignal]) -> Vec<StudentRisk> {
    let mut ranked: Vec<StudentRisk> = students
        .iter()
        .map(|student| StudentRisk {
            student_id: student.student_id.clone(),
            name: student.name.clone(),
            assessment: risk::assess(&student.signal),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.assessment
            .risk_score
            .partial_cmp(&a.assessment.risk_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

pub fn summarize_by_level(ranked: &[StudentRisk]) -> Vec<LevelSummary> {
    let mut map: std::collections::BTreeMap<RiskLevel, (usize, f64)> =
        std::collections::BTreeMap::new();

    for student in ranked {
        let entry = map.entry(student.assessment.risk_level).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += student.assessment.risk_score;
    }

    map.into_iter()
        .rev()
        .map(|(level, (count, total))| LevelSummary {
            level,
            count,
            avg_score: if count == 0 { 0.0 } else { total / count as f64 },
        })
        .collect()
}

pub fn build_report(
    source: &str,
    generated_at: DateTime<Utc>,
    ranked: &[StudentRisk],
    skipped: &[String],
) -> String {
    let summaries = summarize_by_level(ranked);
    let mut output = String::new();

    let _ = writeln!(output, "# Drop Risk Report");
    let _ = writeln!(
        output,
        "Generated from {} at {}",
        source,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No students scored.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} students (avg score {:.3})",
                summary.level, summary.count, summary.avg_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Students");

    let at_risk: Vec<&StudentRisk> = ranked
        .iter()
        .filter(|s| s.assessment.risk_level != RiskLevel::Low)
        .take(10)
        .collect();
    if at_risk.is_empty() {
        let _ = writeln!(output, "No students above low risk.");
    } else {
        for student in at_risk {
            let _ = writeln!(
                output,
                "- {} ({}) score {:.3} [{}]",
                student.name,
                student.student_id,
                student.assessment.risk_score,
                student.assessment.risk_level
            );
        }
    }

    if !skipped.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Skipped Rows");
        for note in skipped {
            let _ = writeln!(output, "- {note}");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AcademicSignal;
    use chrono::TimeZone;

    fn student(id: &str, cgpa: f64, attendance_pct: f64) -> StudentSignal {
        StudentSignal {
            student_id: id.to_string(),
            name: format!("Student {id}"),
            signal: AcademicSignal {
                cgpa,
                attendance_pct,
                assignments_missed: 0,
                engagement_score: 0.6,
            },
        }
    }

    #[test]
    fn ranks_highest_risk_first() {
        let ranked = rank_students(&[
            student("a", 9.0, 95.0),
            student("b", 5.0, 50.0),
            student("c", 6.5, 70.0),
        ]);
        let ids: Vec<&str> = ranked.iter().map(|s| s.student_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(ranked[0].assessment.risk_score, 0.75);
    }

    #[test]
    fn summarizes_levels_from_high_to_low() {
        let ranked = rank_students(&[
            student("a", 9.0, 95.0),
            student("b", 5.0, 50.0),
            student("c", 9.5, 99.0),
        ]);
        let summaries = summarize_by_level(&ranked);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].level, RiskLevel::High);
        assert_eq!(summaries[1].level, RiskLevel::Low);
        assert_eq!(summaries[1].count, 2);
        assert_eq!(summaries[1].avg_score, 0.0);
    }

    #[test]
    fn report_lists_at_risk_students_and_skips() {
        let ranked = rank_students(&[student("a", 9.0, 95.0), student("b", 5.0, 50.0)]);
        let generated_at = Utc.with_ymd_and_hms(2026, 2, 2, 9, 30, 0).unwrap();
        let report = build_report(
            "signals.csv",
            generated_at,
            &ranked,
            &["line 4: bad cgpa".to_string()],
        );

        assert!(report.starts_with("# Drop Risk Report"));
        assert!(report.contains("Generated from signals.csv at 2026-02-02 09:30 UTC"));
        assert!(report.contains("- Student b (b) score 0.750 [High]"));
        assert!(!report.contains("Student a (a)"));
        assert!(report.contains("## Skipped Rows\n- line 4: bad cgpa"));
    }

    #[test]
    fn empty_batch_still_renders() {
        let report = build_report("empty.csv", Utc::now(), &[], &[]);
        assert!(report.contains("No students scored."));
        assert!(report.contains("No students above low risk."));
    }
}
