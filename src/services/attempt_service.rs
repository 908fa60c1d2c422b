use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{AnswerRecord, Attempt, AttemptState, TestDefinition},
    models::dto::response::{AnswerOptionView, CurrentQuestionResponse, QuestionView},
    repositories::{AttemptRepository, Finalization, TestRepository},
    services::{deadline, scoring::Scorer},
};

/// How many times a submit/finish re-validates after losing a conditional
/// update to a concurrent writer. One reload normally settles it (the retry
/// lands on the idempotent or out-of-order path).
const CONFLICT_RETRIES: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub all_answered: bool,
}

/// Drives one attempt through its lifecycle: question delivery with
/// deadlines, answer recording, early finish, and the abandonment sweep.
pub struct AttemptService {
    tests: Arc<dyn TestRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl AttemptService {
    pub fn new(tests: Arc<dyn TestRepository>, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { tests, attempts }
    }

    pub async fn current_question(&self, attempt_id: &str) -> AppResult<CurrentQuestionResponse> {
        self.current_question_at(attempt_id, Utc::now()).await
    }

    pub async fn current_question_at(
        &self,
        attempt_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<CurrentQuestionResponse> {
        let attempt = self.load_attempt(attempt_id).await?;
        let test = self.load_test(&attempt).await?;
        let attempt = deadline::resolve_expired(self.attempts.as_ref(), &test, attempt, now).await?;

        if !attempt.is_in_progress() {
            return Err(AppError::AttemptNotInProgress(format!(
                "attempt '{}' is {}; fetch its result instead",
                attempt_id,
                attempt.state.as_str()
            )));
        }

        let index = attempt.current_index();
        if index == test.question_count() {
            return Ok(CurrentQuestionResponse::all_answered());
        }

        let question = test.question_at(index).ok_or_else(|| {
            AppError::InternalError(format!(
                "test '{}' has no question at index {}",
                test.id, index
            ))
        })?;

        // Reuse an armed deadline so a page refresh never restarts the clock.
        let deadline = match attempt.active_deadline {
            Some(ref armed) if armed.question_index as usize == index => armed.clone(),
            _ => {
                let fresh = deadline::deadline_for(question, index, now);
                if self
                    .attempts
                    .arm_deadline(attempt_id, fresh.question_index, fresh.expires_at)
                    .await?
                {
                    fresh
                } else {
                    // a concurrent request armed it first; serve that one
                    let refreshed = self.load_attempt(attempt_id).await?;
                    refreshed
                        .active_deadline
                        .filter(|d| d.question_index as usize == index)
                        .unwrap_or(fresh)
                }
            }
        };

        Ok(CurrentQuestionResponse::Question(QuestionView {
            question_id: question.id.clone(),
            text: question.text.clone(),
            options: question
                .options
                .iter()
                .map(|opt| AnswerOptionView {
                    id: opt.id.clone(),
                    text: opt.text.clone(),
                })
                .collect(),
            time_limit_seconds: question.time_limit_seconds,
            deadline: deadline.expires_at,
            question_order: index as i32,
            remaining_questions: (test.question_count() - index) as i32,
        }))
    }

    pub async fn submit_answer(
        &self,
        attempt_id: &str,
        question_id: &str,
        selected_answer_id: Option<&str>,
        time_spent_seconds: i64,
    ) -> AppResult<SubmitOutcome> {
        self.submit_answer_at(
            attempt_id,
            question_id,
            selected_answer_id,
            time_spent_seconds,
            Utc::now(),
        )
        .await
    }

    pub async fn submit_answer_at(
        &self,
        attempt_id: &str,
        question_id: &str,
        selected_answer_id: Option<&str>,
        time_spent_seconds: i64,
        now: DateTime<Utc>,
    ) -> AppResult<SubmitOutcome> {
        for _ in 0..CONFLICT_RETRIES {
            let attempt = self.load_attempt(attempt_id).await?;
            let test = self.load_test(&attempt).await?;
            let attempt =
                deadline::resolve_expired(self.attempts.as_ref(), &test, attempt, now).await?;
            let question_count = test.question_count();

            // Idempotent retry: a question that already has a record is a
            // no-op success, even when the original submit finalized the
            // attempt. Timed-out questions land here too.
            if attempt.record_for(question_id).is_some() {
                return Ok(SubmitOutcome {
                    all_answered: attempt.recorded_answers.len() == question_count,
                });
            }

            if !attempt.is_in_progress() {
                return Err(AppError::AttemptNotInProgress(format!(
                    "attempt '{}' is {}",
                    attempt_id,
                    attempt.state.as_str()
                )));
            }

            let question = test.question_by_id(question_id).ok_or_else(|| {
                AppError::NotFound(format!(
                    "question '{}' does not belong to test '{}'",
                    question_id, test.id
                ))
            })?;

            let index = attempt.current_index();
            if question.order as usize != index {
                return Err(AppError::QuestionOutOfOrder(format!(
                    "question '{}' is at position {}, but the current question is at {}; \
                     refetch the current question",
                    question_id, question.order, index
                )));
            }

            if let Some(answer_id) = selected_answer_id {
                if !question.has_option(answer_id) {
                    return Err(AppError::InvalidAnswerOption(format!(
                        "option '{}' does not belong to question '{}'",
                        answer_id, question_id
                    )));
                }
            }

            let record =
                Scorer::answered_record(question, index, selected_answer_id, time_spent_seconds, now);
            let all_answered = index + 1 == question_count;
            let finalize = all_answered.then(|| Finalization {
                state: AttemptState::Completed,
                score: Some(Scorer::score_counts(
                    attempt.correct_count() + usize::from(record.is_correct),
                    question_count,
                )),
                finished_at: now,
            });

            if self
                .attempts
                .append_answer(attempt_id, index as i32, record, finalize)
                .await?
            {
                return Ok(SubmitOutcome { all_answered });
            }
            // lost the conditional update; reload and re-validate
        }

        Err(AppError::InternalError(format!(
            "attempt '{}' was concurrently modified too many times",
            attempt_id
        )))
    }

    pub async fn finish_test(&self, attempt_id: &str) -> AppResult<()> {
        self.finish_test_at(attempt_id, Utc::now()).await
    }

    /// Student-initiated early exit: every remaining question is recorded as
    /// unanswered so completion always means a full answer list.
    pub async fn finish_test_at(&self, attempt_id: &str, now: DateTime<Utc>) -> AppResult<()> {
        for _ in 0..CONFLICT_RETRIES {
            let attempt = self.load_attempt(attempt_id).await?;
            let test = self.load_test(&attempt).await?;
            let attempt =
                deadline::resolve_expired(self.attempts.as_ref(), &test, attempt, now).await?;

            if !attempt.is_in_progress() {
                return Err(AppError::AttemptNotInProgress(format!(
                    "attempt '{}' is already {}",
                    attempt_id,
                    attempt.state.as_str()
                )));
            }

            let len = attempt.current_index();
            let fill = self.fill_records(&test, len, now)?;
            let outcome = Finalization {
                state: AttemptState::Completed,
                score: Some(Scorer::score_counts(
                    attempt.correct_count(),
                    test.question_count(),
                )),
                finished_at: now,
            };

            if self
                .attempts
                .finalize(attempt_id, len as i32, fill, outcome)
                .await?
            {
                return Ok(());
            }
        }

        Err(AppError::InternalError(format!(
            "attempt '{}' was concurrently modified too many times",
            attempt_id
        )))
    }

    pub async fn abandon_stale(&self, older_than: Duration) -> AppResult<usize> {
        self.abandon_stale_at(older_than, Utc::now()).await
    }

    /// Maintenance sweep: InProgress attempts started before the retention
    /// cutoff become Abandoned. They keep no score but still count against
    /// the attempt budget.
    pub async fn abandon_stale_at(
        &self,
        older_than: Duration,
        now: DateTime<Utc>,
    ) -> AppResult<usize> {
        let cutoff = now - older_than;
        let stale = self.attempts.find_stale_in_progress(cutoff).await?;

        let mut swept = 0;
        for attempt in stale {
            let test = match self.tests.find_by_id(&attempt.test_id).await? {
                Some(test) => test,
                None => {
                    log::warn!(
                        "skipping stale attempt {}: test '{}' missing from catalog",
                        attempt.id,
                        attempt.test_id
                    );
                    continue;
                }
            };

            let len = attempt.current_index();
            let fill = self.fill_records(&test, len, now)?;
            let outcome = Finalization {
                state: AttemptState::Abandoned,
                score: None,
                finished_at: now,
            };

            if self
                .attempts
                .finalize(&attempt.id, len as i32, fill, outcome)
                .await?
            {
                swept += 1;
            }
        }

        Ok(swept)
    }

    fn fill_records(
        &self,
        test: &TestDefinition,
        from_index: usize,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<AnswerRecord>> {
        (from_index..test.question_count())
            .map(|index| {
                let question = test.question_at(index).ok_or_else(|| {
                    AppError::InternalError(format!(
                        "test '{}' has no question at index {}",
                        test.id, index
                    ))
                })?;
                Ok(Scorer::unanswered_record(question, index, now))
            })
            .collect()
    }

    async fn load_attempt(&self, attempt_id: &str) -> AppResult<Attempt> {
        self.attempts
            .find_by_id(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt with id '{}' not found", attempt_id)))
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
