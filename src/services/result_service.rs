use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Attempt, AttemptState, TestDefinition},
    models::dto::response::{AttemptResultResponse, AttemptSummary, QuestionResultView},
    repositories::{AttemptRepository, TestRepository},
    services::deadline,
};

/// Read-only projections over finalized attempts. Nothing here can mutate
/// recorded answers or scores.
pub struct ResultService {
    tests: Arc<dyn TestRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl ResultService {
    pub fn new(tests: Arc<dyn TestRepository>, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { tests, attempts }
    }

    pub async fn get_result(&self, attempt_id: &str) -> AppResult<AttemptResultResponse> {
        self.get_result_at(attempt_id, Utc::now()).await
    }

    pub async fn get_result_at(
        &self,
        attempt_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<AttemptResultResponse> {
        let attempt = self
            .attempts
            .find_by_id(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt with id '{}' not found", attempt_id)))?;

        let test = self.load_test(&attempt).await?;

        // Fetching a result is a touch like any other: a lapsed deadline is
        // resolved here too, which may finalize the attempt.
        let attempt = deadline::resolve_expired(self.attempts.as_ref(), &test, attempt, now).await?;

        if attempt.is_in_progress() {
            return Err(AppError::AttemptNotInProgress(format!(
                "attempt '{}' is still in progress; fetch the current question instead",
                attempt_id
            )));
        }

        Ok(Self::project_result(&attempt, &test))
    }

    pub async fn attempt_history(
        &self,
        student_id: &str,
        completed: Option<bool>,
    ) -> AppResult<Vec<AttemptSummary>> {
        let attempts = self.attempts.find_by_student(student_id).await?;

        let mut summaries: Vec<AttemptSummary> = attempts
            .into_iter()
            .filter(|a| a.state.is_terminal())
            .filter(|a| match completed {
                Some(true) => a.state == AttemptState::Completed,
                Some(false) => a.state == AttemptState::Abandoned,
                None => true,
            })
            .map(|a| AttemptSummary {
                attempt_id: a.id.clone(),
                test_id: a.test_id.clone(),
                state: a.state,
                score: a.score,
                correct_answers: a.correct_count() as i32,
                total_questions: a.recorded_answers.len() as i32,
                started_at: a.started_at,
                finished_at: a.finished_at,
            })
            .collect();

        // grouped by test, oldest attempt first within each test
        summaries.sort_by(|a, b| {
            a.test_id
                .cmp(&b.test_id)
                .then(a.started_at.cmp(&b.started_at))
        });

        Ok(summaries)
    }

    fn project_result(attempt: &Attempt, test: &TestDefinition) -> AttemptResultResponse {
        let per_question_breakdown = attempt
            .recorded_answers
            .iter()
            .map(|record| {
                let question = test.question_by_id(&record.question_id);
                QuestionResultView {
                    question_id: record.question_id.clone(),
                    question_text: question.map(|q| q.text.clone()).unwrap_or_default(),
                    selected_answer: record.selected_answer_id.as_deref().and_then(|id| {
                        question.and_then(|q| q.option_text(id)).map(String::from)
                    }),
                    correct_answer: question
                        .and_then(|q| q.correct_option_id())
                        .and_then(|id| question.and_then(|q| q.option_text(id)))
                        .map(String::from),
                    is_correct: record.is_correct,
                    time_spent_seconds: record.time_spent_seconds,
                }
            })
            .collect();

        AttemptResultResponse {
            attempt_id: attempt.id.clone(),
            test_id: attempt.test_id.clone(),
            completed: attempt.state == AttemptState::Completed,
            score: attempt.score,
            correct_answers: attempt.correct_count() as i32,
            total_questions: test.question_count() as i32,
            started_at: attempt.started_at,
            finished_at: attempt.finished_at,
            total_time_seconds: attempt
                .finished_at
                .map(|finished| (finished - attempt.started_at).num_seconds()),
            per_question_breakdown,
        }
    }

    async fn load_test(&self, attempt: &Attempt) -> AppResult<TestDefinition> {
        self.tests
            .find_by_id(&attempt.test_id)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(format!(
                    "attempt '{}' references test '{}' missing from catalog",
                    attempt.id, attempt.test_id
                ))
            })
    }
}
