use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use academic_signal_engine::grading::{build_backend, GradingError, GradingRequest};
use academic_signal_engine::models::Rubric;
use academic_signal_engine::{
    detect_grade_anomalies, generate_career_recommendations, input, predict_drop_risk, report,
    EngineConfig,
};

const GRADING_FALLBACK: &str = "AI grading temporarily unavailable, falling back to manual grading";

#[derive(Parser)]
#[command(name = "signal-engine")]
#[command(about = "Academic signal engine: drop risk, grade anomalies, careers and grading", long_about = None)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score drop risk for one student
    Risk {
        #[arg(long)]
        cgpa: f64,
        #[arg(long)]
        attendance: f64,
        #[arg(long, default_value_t = 0)]
        missed: u32,
        #[arg(long)]
        engagement: f64,
    },
    /// Score drop risk for every student in a CSV file
    RiskBatch {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Detect sudden GPA drops and spikes in a semester history
    Anomalies {
        #[arg(long)]
        student: String,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Rank career paths for a student profile
    Careers {
        #[arg(long)]
        department: String,
        #[arg(long)]
        cgpa: f64,
        #[arg(long)]
        strong: Vec<String>,
        #[arg(long)]
        weak: Vec<String>,
    },
    /// Grade a submission with the configured backend
    Grade {
        #[arg(long)]
        submission: PathBuf,
        /// Rubric criterion as name=max_points, repeatable
        #[arg(long, value_parser = parse_criterion)]
        rubric: Vec<(String, f64)>,
        #[arg(long, default_value_t = 100)]
        max_marks: u32,
    },
}

fn parse_criterion(raw: &str) -> Result<(String, f64), String> {
    let (name, points) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=points, got {raw:?}"))?;
    let points: f64 = points
        .trim()
        .parse()
        .map_err(|_| format!("invalid points in {raw:?}"))?;
    Ok((name.trim().to_string(), points))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "academic_signal_engine=info,signal_engine=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Risk {
            cgpa,
            attendance,
            missed,
            engagement,
        } => {
            let assessment = predict_drop_risk(cgpa, attendance, missed, engagement);
            if cli.json {
                print_json(&assessment)?;
            } else {
                println!(
                    "Drop risk {:.3} ({})",
                    assessment.risk_score, assessment.risk_level
                );
            }
        }
        Commands::RiskBatch { csv, out, limit } => {
            let loaded = input::read_signals_csv(&csv)?;
            let ranked = report::rank_students(&loaded.rows);

            if let Some(out) = out {
                let source = csv.display().to_string();
                let markdown =
                    report::build_report(&source, chrono::Utc::now(), &ranked, &loaded.skipped);
                std::fs::write(&out, markdown)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                eprintln!("Report written to {}.", out.display());
            }

            if cli.json {
                print_json(&ranked)?;
            } else if ranked.is_empty() {
                println!("No students found in {}.", csv.display());
            } else {
                println!("Top students by drop risk:");
                for student in ranked.iter().take(limit) {
                    println!(
                        "- {} ({}) score {:.3} [{}]",
                        student.name,
                        student.student_id,
                        student.assessment.risk_score,
                        student.assessment.risk_level
                    );
                }
            }

            if !loaded.skipped.is_empty() {
                eprintln!("Skipped {} malformed rows.", loaded.skipped.len());
            }
        }
        Commands::Anomalies { student, csv } => {
            let grades = input::read_grades_csv(&csv)?;
            let anomalies = detect_grade_anomalies(&student, &grades);

            if cli.json {
                print_json(&anomalies)?;
            } else if anomalies.is_empty() {
                println!("No grade anomalies across {} semesters.", grades.len());
            } else {
                for anomaly in &anomalies {
                    println!(
                        "- {} in {}: delta {:+.2} ({} severity)",
                        anomaly.kind, anomaly.semester_label, anomaly.delta, anomaly.severity
                    );
                }
            }
        }
        Commands::Careers {
            department,
            cgpa,
            strong,
            weak,
        } => {
            let paths = generate_career_recommendations(&department, cgpa, &strong, &weak);

            if cli.json {
                print_json(&paths)?;
            } else {
                for path in &paths {
                    println!(
                        "- {} {:.1}% ({}); gaps: {}; courses: {}",
                        path.name,
                        path.match_percentage,
                        path.salary_range,
                        path.skill_gaps.join(", "),
                        path.recommended_courses.join(", ")
                    );
                }
            }
        }
        Commands::Grade {
            submission,
            rubric,
            max_marks,
        } => {
            let config = EngineConfig::from_env().context("invalid grading configuration")?;
            let backend = build_backend(&config).context("failed to start grading backend")?;

            let text = std::fs::read_to_string(&submission)
                .with_context(|| format!("failed to read {}", submission.display()))?;
            let rubric: Rubric = rubric.into_iter().collect();
            let request = GradingRequest::new(text, rubric).with_max_marks(max_marks);

            let result = match backend.grade(&request).await {
                Ok(result) => result,
                Err(e @ GradingError::InvalidRubric { .. }) => return Err(e.into()),
                Err(e) => {
                    eprintln!("{GRADING_FALLBACK}.");
                    return Err(anyhow::Error::new(e).context(GRADING_FALLBACK));
                }
            };

            if cli.json {
                print_json(&result)?;
            } else {
                println!(
                    "Submission {} graded by {}: {:.1}/{} (confidence {:.2})",
                    result.submission_id,
                    backend.name(),
                    result.suggested_grade,
                    max_marks,
                    result.confidence
                );
                for (criterion, score) in &result.rubric_scores {
                    println!("- {criterion}: {score:.1}");
                }
                println!("{}", result.feedback);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rubric_criteria() {
        assert_eq!(
            parse_criterion("correctness=40").unwrap(),
            ("correctness".to_string(), 40.0)
        );
        assert_eq!(
            parse_criterion(" style = 12.5").unwrap(),
            ("style".to_string(), 12.5)
        );
        assert!(parse_criterion("correctness").is_err());
        assert!(parse_criterion("correctness=lots").is_err());
    }

    #[test]
    fn cli_accepts_repeated_rubric_flags() {
        let cli = Cli::try_parse_from([
            "signal-engine",
            "grade",
            "--submission",
            "answer.txt",
            "--rubric",
            "a=40",
            "--rubric",
            "b=60",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Grade {
                rubric, max_marks, ..
            } => {
                assert_eq!(rubric.len(), 2);
                assert_eq!(max_marks, 100);
            }
            _ => panic!("expected grade command"),
        }
    }

    #[test]
    fn cli_collects_subject_lists() {
        let cli = Cli::try_parse_from([
            "signal-engine",
            "careers",
            "--department",
            "Computer Science",
            "--cgpa",
            "7.5",
            "--strong",
            "Algorithms",
            "--strong",
            "Data Structures",
        ])
        .unwrap();
        match cli.command {
            Commands::Careers { strong, weak, .. } => {
                assert_eq!(strong.len(), 2);
                assert!(weak.is_empty());
            }
            _ => panic!("expected careers command"),
        }
    }
}
