use std::collections::BTreeMap;

use serde::Deserialize;
use uuid::Uuid;

use super::{GradingError, GradingRequest};
use crate::models::GradingResult;

pub const SYSTEM_PROMPT: &str = "You are a university teaching assistant grading a student \
submission against an instructor rubric. Reply with a single JSON object and nothing else, \
using exactly these fields: suggested_grade (number between 0 and max_marks), confidence \
(number between 0 and 1), feedback (string, two to four sentences), rubric_scores (object \
with exactly the rubric's criterion names as keys, each scored between 0 and that \
criterion's maximum points).";

/// What a model is asked to return. Validated before it becomes a result.
#[derive(Debug, Deserialize)]
pub struct ModelVerdict {
    pub suggested_grade: f64,
    pub confidence: f64,
    pub feedback: String,
    pub rubric_scores: BTreeMap<String, f64>,
}

pub fn user_prompt(request: &GradingRequest) -> String {
    let rubric = serde_json::to_string(&request.rubric).unwrap_or_else(|_| "{}".to_string());
    format!(
        "max_marks: {}\nrubric (criterion -> max points): {}\n\nSubmission:\n{}",
        request.max_marks, rubric, request.submission_text
    )
}

/// Parses a model reply and checks it against the grading contract.
pub fn parse_verdict(
    backend: &str,
    request: &GradingRequest,
    reply: &str,
) -> Result<GradingResult, GradingError> {
    let json = extract_json_object(reply)
        .ok_or_else(|| GradingError::unavailable(backend, "model reply contained no JSON object"))?;
    let verdict: ModelVerdict = serde_json::from_str(json)
        .map_err(|e| GradingError::unavailable(backend, format!("malformed model reply: {e}")))?;
    check_contract(backend, request, verdict)
}

fn check_contract(
    backend: &str,
    request: &GradingRequest,
    verdict: ModelVerdict,
) -> Result<GradingResult, GradingError> {
    let max_marks = f64::from(request.max_marks);
    if !(0.0..=max_marks).contains(&verdict.suggested_grade) {
        return Err(GradingError::unavailable(
            backend,
            format!(
                "model suggested {} outside 0..={max_marks}",
                verdict.suggested_grade
            ),
        ));
    }
    if !(0.0..=1.0).contains(&verdict.confidence) {
        return Err(GradingError::unavailable(
            backend,
            format!("model confidence {} outside 0..=1", verdict.confidence),
        ));
    }
    if verdict.feedback.trim().is_empty() {
        return Err(GradingError::unavailable(backend, "model returned empty feedback"));
    }
    if !verdict.rubric_scores.keys().eq(request.rubric.keys()) {
        return Err(GradingError::unavailable(
            backend,
            "model rubric scores do not match the rubric criteria",
        ));
    }
    for (key, score) in &verdict.rubric_scores {
        let max_points = request.rubric.get(key).copied().unwrap_or_default();
        if !(0.0..=max_points).contains(score) {
            return Err(GradingError::unavailable(
                backend,
                format!("model scored {key} at {score} outside 0..={max_points}"),
            ));
        }
    }

    Ok(GradingResult {
        submission_id: Uuid::new_v4(),
        suggested_grade: verdict.suggested_grade,
        confidence: verdict.confidence,
        feedback: verdict.feedback,
        rubric_scores: verdict.rubric_scores,
    })
}

/// Strips prose or code fences around the outermost JSON object.
fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (start < end).then(|| &reply[start..=end])
}
