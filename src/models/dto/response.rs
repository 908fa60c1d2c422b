use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::AttemptState;

#[derive(Debug, Clone, Serialize)]
pub struct StartAttemptResponse {
    pub attempt_id: String,
    /// True when an already-in-progress attempt was returned instead of a new one.
    pub resumed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerOptionView {
    pub id: String,
    pub text: String,
}

/// The current question as served to the student. Correctness flags withheld.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub question_id: String,
    pub text: String,
    pub options: Vec<AnswerOptionView>,
    pub time_limit_seconds: i64,
    pub deadline: DateTime<Utc>,
    pub question_order: i32,
    pub remaining_questions: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CurrentQuestionResponse {
    Question(QuestionView),
    AllAnswered { all_questions_answered: bool },
}

impl CurrentQuestionResponse {
    pub fn all_answered() -> Self {
        CurrentQuestionResponse::AllAnswered {
            all_questions_answered: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitAnswerResponse {
    pub all_questions_answered: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinishTestResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionResultView {
    pub question_id: String,
    pub question_text: String,
    pub selected_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub is_correct: bool,
    pub time_spent_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptResultResponse {
    pub attempt_id: String,
    pub test_id: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time_seconds: Option<i64>,
    pub per_question_breakdown: Vec<QuestionResultView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptSummary {
    pub attempt_id: String,
    pub test_id: String,
    pub state: AttemptState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}
