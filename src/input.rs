use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

use crate::models::{AcademicSignal, SemesterGrade, StudentSignal};

/// Rows read from a CSV file plus a description of every row that was skipped.
#[derive(Debug)]
pub struct Loaded<T> {
    pub rows: Vec<T>,
    pub skipped: Vec<String>,
}

impl<T> Default for Loaded<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct SignalRow {
    student_id: String,
    name: String,
    cgpa: f64,
    attendance_pct: f64,
    assignments_missed: u32,
    engagement_score: f64,
}

#[derive(Deserialize)]
struct GradeRow {
    semester: String,
    gpa: f64,
}

/// Reads `student_id,name,cgpa,attendance_pct,assignments_missed,engagement_score`.
/// A malformed row is skipped without affecting the others.
pub fn read_signals_csv(csv_path: &Path) -> anyhow::Result<Loaded<StudentSignal>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut loaded = Loaded::default();

    for (idx, result) in reader.deserialize::<SignalRow>().enumerate() {
        match result {
            Ok(row) => loaded.rows.push(StudentSignal {
                student_id: row.student_id,
                name: row.name,
                signal: AcademicSignal {
                    cgpa: row.cgpa,
                    attendance_pct: row.attendance_pct,
                    assignments_missed: row.assignments_missed,
                    engagement_score: row.engagement_score,
                },
            }),
            Err(e) => {
                // +2: one for the header, one for 1-based numbering
                let line = idx + 2;
                warn!(line, error = %e, "skipping malformed signal row");
                loaded.skipped.push(format!("line {line}: {e}"));
            }
        }
    }

    Ok(loaded)
}

/// Reads `semester,gpa` rows in file order. Any malformed row fails the whole
/// file since a gap would fabricate a semester-to-semester delta.
pub fn read_grades_csv(csv_path: &Path) -> anyhow::Result<Vec<SemesterGrade>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut grades = Vec::new();

    for (idx, result) in reader.deserialize::<GradeRow>().enumerate() {
        let row = result.with_context(|| format!("invalid grade row on line {}", idx + 2))?;
        grades.push(SemesterGrade::new(row.semester, row.gpa));
    }

    Ok(grades)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_signals_and_skips_bad_rows() {
        let file = write_csv(
            "student_id,name,cgpa,attendance_pct,assignments_missed,engagement_score\n\
             s-1,Avery Lee,5.4,60,5,0.2\n\
             s-2,Jules Moreno,not-a-number,80,0,0.7\n\
             s-3,Kiara Patel,8.9,92,0,0.9\n",
        );

        let loaded = read_signals_csv(file.path()).unwrap();
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.rows[0].student_id, "s-1");
        assert_eq!(loaded.rows[0].signal.assignments_missed, 5);
        assert_eq!(loaded.rows[1].name, "Kiara Patel");
        assert_eq!(loaded.skipped.len(), 1);
        assert!(loaded.skipped[0].starts_with("line 3"));
    }

    #[test]
    fn reads_grades_in_file_order() {
        let file = write_csv("semester,gpa\nS1,8.0\nS2,7.5\nS3,9.0\n");
        let grades = read_grades_csv(file.path()).unwrap();
        let labels: Vec<&str> = grades.iter().map(|g| g.semester_label.as_str()).collect();
        assert_eq!(labels, vec!["S1", "S2", "S3"]);
        assert_eq!(grades[2].gpa, 9.0);
    }

    #[test]
    fn bad_grade_row_fails_the_file() {
        let file = write_csv("semester,gpa\nS1,8.0\nS2,high\n");
        let err = read_grades_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn header_only_file_loads_nothing() {
        let file = write_csv(
            "student_id,name,cgpa,attendance_pct,assignments_missed,engagement_score\n",
        );
        let loaded: Loaded<StudentSignal> = read_signals_csv(file.path()).unwrap();
        assert!(loaded.rows.is_empty());
        assert!(loaded.skipped.is_empty());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_signals_csv(Path::new("/nonexistent/signals.csv")).unwrap_err();
        assert!(err.to_string().contains("failed to open"));
    }
}
