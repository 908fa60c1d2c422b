use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One student's pass through one test, from start to terminal state.
/// Never deleted; it is the permanent record of a testing event.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Attempt {
    pub id: String,
    pub student_id: String,
    pub test_id: String,
    pub state: AttemptState,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Append-only; insertion order equals question order, no gaps, no duplicates.
    pub recorded_answers: Vec<AnswerRecord>,
    /// At most one armed deadline, for the question the cursor points at.
    #[serde(default)]
    pub active_deadline: Option<QuestionDeadline>,
    /// Set exactly once, at the transition into Completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum AttemptState {
    InProgress,
    Completed,
    Abandoned,
}

impl AttemptState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptState::InProgress => "InProgress",
            AttemptState::Completed => "Completed",
            AttemptState::Abandoned => "Abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptState::InProgress)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnswerRecord {
    pub question_id: String,
    pub question_index: i32,
    /// None means the question was never answered (timeout or early finish).
    pub selected_answer_id: Option<String>,
    /// Frozen at recording time; later catalog edits never change it.
    pub is_correct: bool,
    pub time_spent_seconds: i64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionDeadline {
    pub question_index: i32,
    pub expires_at: DateTime<Utc>,
}

impl Attempt {
    pub fn new_in_progress(student_id: &str, test_id: &str, now: DateTime<Utc>) -> Self {
        Attempt {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            test_id: test_id.to_string(),
            state: AttemptState::InProgress,
            started_at: now,
            finished_at: None,
            recorded_answers: Vec::new(),
            active_deadline: None,
            score: None,
        }
    }

    /// The implicit cursor: index of the next unanswered question.
    pub fn current_index(&self) -> usize {
        self.recorded_answers.len()
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == AttemptState::InProgress
    }

    pub fn record_for(&self, question_id: &str) -> Option<&AnswerRecord> {
        self.recorded_answers
            .iter()
            .find(|r| r.question_id == question_id)
    }

    pub fn correct_count(&self) -> usize {
        self.recorded_answers.iter().filter(|r| r.is_correct).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_attempt_starts_at_question_zero() {
        let attempt = Attempt::new_in_progress("student-1", "test-1", Utc::now());

        assert_eq!(attempt.state, AttemptState::InProgress);
        assert_eq!(attempt.current_index(), 0);
        assert!(attempt.recorded_answers.is_empty());
        assert!(attempt.finished_at.is_none());
        assert!(attempt.score.is_none());
        assert!(attempt.active_deadline.is_none());
    }

    #[test]
    fn cursor_tracks_recorded_answer_count() {
        let mut attempt = Attempt::new_in_progress("student-1", "test-1", Utc::now());
        attempt.recorded_answers.push(AnswerRecord {
            question_id: "q1".to_string(),
            question_index: 0,
            selected_answer_id: Some("q1-a".to_string()),
            is_correct: true,
            time_spent_seconds: 5,
            recorded_at: Utc::now(),
        });

        assert_eq!(attempt.current_index(), 1);
        assert!(attempt.record_for("q1").is_some());
        assert!(attempt.record_for("q2").is_none());
        assert_eq!(attempt.correct_count(), 1);
    }

    #[test]
    fn terminal_states() {
        assert!(!AttemptState::InProgress.is_terminal());
        assert!(AttemptState::Completed.is_terminal());
        assert!(AttemptState::Abandoned.is_terminal());
    }

    #[test]
    fn attempt_round_trip_serialization() {
        let mut attempt = Attempt::new_in_progress("student-1", "test-1", Utc::now());
        attempt.recorded_answers.push(AnswerRecord {
            question_id: "q1".to_string(),
            question_index: 0,
            selected_answer_id: None,
            is_correct: false,
            time_spent_seconds: 10,
            recorded_at: Utc::now(),
        });

        let json = serde_json::to_string(&attempt).expect("attempt should serialize");
        let parsed: Attempt = serde_json::from_str(&json).expect("attempt should deserialize");

        assert_eq!(parsed, attempt);
        assert_eq!(parsed.recorded_answers[0].selected_answer_id, None);
        assert!(!parsed.recorded_answers[0].is_correct);
    }
}
