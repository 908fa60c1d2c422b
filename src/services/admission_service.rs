use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Attempt, StudentContext},
    repositories::{AttemptRepository, TestRepository},
};

/// Gatekeeper for new attempts: test availability, group eligibility,
/// resume-if-in-progress, and the max-attempts budget.
pub struct AdmissionService {
    tests: Arc<dyn TestRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartAttemptOutcome {
    pub attempt_id: String,
    /// True when an existing InProgress attempt was returned instead of a new one.
    pub resumed: bool,
}

impl AdmissionService {
    pub fn new(tests: Arc<dyn TestRepository>, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { tests, attempts }
    }

    pub async fn start_attempt(
        &self,
        student: &StudentContext,
        test_id: &str,
    ) -> AppResult<StartAttemptOutcome> {
        self.start_attempt_at(student, test_id, Utc::now()).await
    }

    pub async fn start_attempt_at(
        &self,
        student: &StudentContext,
        test_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<StartAttemptOutcome> {
        let test = self
            .tests
            .find_by_id(test_id)
            .await?
            .ok_or_else(|| AppError::TestUnavailable(format!("test '{}' does not exist", test_id)))?;

        if !test.active {
            return Err(AppError::TestUnavailable(format!(
                "test '{}' is not active",
                test_id
            )));
        }

        if test.questions.is_empty() {
            return Err(AppError::TestUnavailable(format!(
                "test '{}' has no questions",
                test_id
            )));
        }

        if !test.is_group_eligible(&student.group) {
            return Err(AppError::NotEligible(format!(
                "group '{}' is not eligible for test '{}'",
                student.group, test_id
            )));
        }

        if let Some(existing) = self
            .attempts
            .find_in_progress(&student.student_id, test_id)
            .await?
        {
            return Ok(StartAttemptOutcome {
                attempt_id: existing.id,
                resumed: true,
            });
        }

        let settled = self
            .attempts
            .count_settled(&student.student_id, test_id)
            .await?;
        if settled >= test.max_attempts as usize {
            return Err(AppError::AttemptLimitExceeded(format!(
                "student '{}' has used {} of {} attempts for test '{}'",
                student.student_id, settled, test.max_attempts, test_id
            )));
        }

        let attempt = Attempt::new_in_progress(&student.student_id, test_id, now);
        match self.attempts.insert_in_progress(attempt).await {
            Ok(created) => {
                log::info!(
                    "started attempt {} for student {} on test {}",
                    created.id,
                    student.student_id,
                    test_id
                );
                Ok(StartAttemptOutcome {
                    attempt_id: created.id,
                    resumed: false,
                })
            }
            // Lost a concurrent-start race; the winner's attempt is the one to resume.
            Err(AppError::AlreadyExists(_)) => {
                let existing = self
                    .attempts
                    .find_in_progress(&student.student_id, test_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::DatabaseError(
                            "concurrent start detected but no InProgress attempt found".to_string(),
                        )
                    })?;
                Ok(StartAttemptOutcome {
                    attempt_id: existing.id,
                    resumed: true,
                })
            }
            Err(err) => Err(err),
        }
    }
}
