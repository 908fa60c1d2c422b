use chrono::{DateTime, Utc};

use crate::models::domain::{AnswerRecord, TestQuestion};

/// Pure grading and scoring. Invoked once per record at recording time and
/// once per attempt at finalization; results are frozen into the store.
pub struct Scorer;

impl Scorer {
    /// A selection is correct when it names the question's single correct
    /// option. No selection is always incorrect.
    pub fn grade_selection(question: &TestQuestion, selected_answer_id: Option<&str>) -> bool {
        match (question.correct_option_id(), selected_answer_id) {
            (Some(correct), Some(selected)) => correct == selected,
            _ => false,
        }
    }

    /// Client-reported time is advisory; clamp it into the question's budget.
    pub fn clamp_time_spent(reported: i64, time_limit_seconds: i64) -> i64 {
        reported.clamp(0, time_limit_seconds)
    }

    pub fn answered_record(
        question: &TestQuestion,
        index: usize,
        selected_answer_id: Option<&str>,
        reported_time_spent: i64,
        now: DateTime<Utc>,
    ) -> AnswerRecord {
        AnswerRecord {
            question_id: question.id.clone(),
            question_index: index as i32,
            selected_answer_id: selected_answer_id.map(|id| id.to_string()),
            is_correct: Self::grade_selection(question, selected_answer_id),
            time_spent_seconds: Self::clamp_time_spent(
                reported_time_spent,
                question.time_limit_seconds,
            ),
            recorded_at: now,
        }
    }

    /// The question's deadline elapsed without an answer: incorrect, with the
    /// whole time budget consumed.
    pub fn timed_out_record(
        question: &TestQuestion,
        index: usize,
        now: DateTime<Utc>,
    ) -> AnswerRecord {
        AnswerRecord {
            question_id: question.id.clone(),
            question_index: index as i32,
            selected_answer_id: None,
            is_correct: false,
            time_spent_seconds: question.time_limit_seconds,
            recorded_at: now,
        }
    }

    /// A question the student never reached (early finish or abandonment).
    pub fn unanswered_record(
        question: &TestQuestion,
        index: usize,
        now: DateTime<Utc>,
    ) -> AnswerRecord {
        AnswerRecord {
            question_id: question.id.clone(),
            question_index: index as i32,
            selected_answer_id: None,
            is_correct: false,
            time_spent_seconds: 0,
            recorded_at: now,
        }
    }

    /// Percentage in [0, 100].
    pub fn score_counts(correct: usize, question_count: usize) -> f64 {
        if question_count == 0 {
            return 0.0;
        }
        100.0 * correct as f64 / question_count as f64
    }

    pub fn score(records: &[AnswerRecord], question_count: usize) -> f64 {
        let correct = records.iter().filter(|r| r.is_correct).count();
        Self::score_counts(correct, question_count)
    }
}
