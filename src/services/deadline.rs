use chrono::{DateTime, Duration, Utc};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Attempt, AttemptState, QuestionDeadline, TestDefinition, TestQuestion},
    repositories::{AttemptRepository, Finalization},
    services::scoring::Scorer,
};

/// Computes the deadline armed when a question is first served.
pub fn deadline_for(question: &TestQuestion, index: usize, now: DateTime<Utc>) -> QuestionDeadline {
    QuestionDeadline {
        question_index: index as i32,
        expires_at: now + Duration::seconds(question.time_limit_seconds),
    }
}

pub fn is_expired(deadline: &QuestionDeadline, now: DateTime<Utc>) -> bool {
    now > deadline.expires_at
}

/// Lazily resolves a lapsed deadline: if the attempt's armed deadline has
/// passed and no record exists for its question yet, records a null answer
/// (finalizing inline when it was the last question) and returns the stored
/// attempt as it now stands. Called on every touch of an attempt, so timeout
/// enforcement does not depend on client liveness or in-process timers.
pub async fn resolve_expired(
    attempts: &dyn AttemptRepository,
    test: &TestDefinition,
    attempt: Attempt,
    now: DateTime<Utc>,
) -> AppResult<Attempt> {
    if !attempt.is_in_progress() {
        return Ok(attempt);
    }

    let Some(deadline) = attempt.active_deadline.clone() else {
        return Ok(attempt);
    };

    let index = attempt.current_index();
    if deadline.question_index as usize != index || !is_expired(&deadline, now) {
        return Ok(attempt);
    }

    let question = test.question_at(index).ok_or_else(|| {
        AppError::InternalError(format!(
            "test '{}' has no question at index {}",
            test.id, index
        ))
    })?;

    let record = Scorer::timed_out_record(question, index, now);
    let finalize = (index + 1 == test.question_count()).then(|| Finalization {
        state: AttemptState::Completed,
        // the timed-out record is incorrect, so the tally is unchanged
        score: Some(Scorer::score_counts(
            attempt.correct_count(),
            test.question_count(),
        )),
        finished_at: now,
    });

    // A concurrent request may resolve the same expiry first; either way the
    // stored attempt is the source of truth afterwards.
    attempts
        .append_answer(&attempt.id, index as i32, record, finalize)
        .await?;

    attempts
        .find_by_id(&attempt.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Attempt with id '{}' not found", attempt.id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_is_now_plus_time_limit() {
        let question = TestQuestion {
            id: "q1".to_string(),
            order: 0,
            text: "?".to_string(),
            time_limit_seconds: 30,
            options: vec![],
        };
        let now = Utc::now();

        let deadline = deadline_for(&question, 0, now);

        assert_eq!(deadline.question_index, 0);
        assert_eq!(deadline.expires_at, now + Duration::seconds(30));
    }

    #[test]
    fn expiry_is_strictly_after_the_deadline() {
        let now = Utc::now();
        let deadline = QuestionDeadline {
            question_index: 0,
            expires_at: now,
        };

        assert!(!is_expired(&deadline, now));
        assert!(is_expired(&deadline, now + Duration::seconds(1)));
        assert!(!is_expired(&deadline, now - Duration::seconds(1)));
    }
}
