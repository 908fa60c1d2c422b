use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use prova_server::{
    errors::{AppError, AppResult},
    models::domain::{
        AnswerOption, AnswerRecord, Attempt, AttemptState, QuestionDeadline, StudentContext,
        TestDefinition, TestQuestion,
    },
    repositories::{AttemptRepository, Finalization, TestRepository},
    services::{AdmissionService, AttemptService, ResultService},
};

pub struct InMemoryTestRepository {
    tests: RwLock<HashMap<String, TestDefinition>>,
}

impl InMemoryTestRepository {
    pub fn new() -> Self {
        Self {
            tests: RwLock::new(HashMap::new()),
        }
    }

    pub async fn upsert(&self, test: TestDefinition) {
        self.tests.write().await.insert(test.id.clone(), test);
    }
}

#[async_trait]
impl TestRepository for InMemoryTestRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestDefinition>> {
        let tests = self.tests.read().await;
        Ok(tests.get(id).cloned())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Mirrors the conditional-update semantics of the Mongo implementation:
/// every mutation checks its precondition and applies its effect under one
/// write-lock acquisition, so the gating behaves atomically under races.
pub struct InMemoryAttemptRepository {
    attempts: RwLock<HashMap<String, Attempt>>,
}

impl InMemoryAttemptRepository {
    pub fn new() -> Self {
        Self {
            attempts: RwLock::new(HashMap::new()),
        }
    }
}

fn apply_finalization(attempt: &mut Attempt, outcome: &Finalization) {
    attempt.state = outcome.state;
    attempt.finished_at = Some(outcome.finished_at);
    if let Some(score) = outcome.score {
        attempt.score = Some(score);
    }
}

#[async_trait]
impl AttemptRepository for InMemoryAttemptRepository {
    async fn insert_in_progress(&self, attempt: Attempt) -> AppResult<Attempt> {
        let mut attempts = self.attempts.write().await;

        let clash = attempts.values().any(|a| {
            a.student_id == attempt.student_id
                && a.test_id == attempt.test_id
                && a.state == AttemptState::InProgress
        });
        if clash {
            return Err(AppError::AlreadyExists(format!(
                "InProgress attempt for student '{}' on test '{}' already exists",
                attempt.student_id, attempt.test_id
            )));
        }

        attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Attempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts.get(id).cloned())
    }

    async fn find_in_progress(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> AppResult<Option<Attempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .find(|a| {
                a.student_id == student_id
                    && a.test_id == test_id
                    && a.state == AttemptState::InProgress
            })
            .cloned())
    }

    async fn count_settled(&self, student_id: &str, test_id: &str) -> AppResult<usize> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .filter(|a| {
                a.student_id == student_id
                    && a.test_id == test_id
                    && a.state != AttemptState::InProgress
            })
            .count())
    }

    async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<Attempt>> {
        let attempts = self.attempts.read().await;
        let mut items: Vec<_> = attempts
            .values()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            a.test_id
                .cmp(&b.test_id)
                .then(a.started_at.cmp(&b.started_at))
        });
        Ok(items)
    }

    async fn arm_deadline(
        &self,
        attempt_id: &str,
        question_index: i32,
        expires_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut attempts = self.attempts.write().await;
        let Some(attempt) = attempts.get_mut(attempt_id) else {
            return Ok(false);
        };

        let matches = attempt.state == AttemptState::InProgress
            && attempt.recorded_answers.len() == question_index as usize
            && attempt
                .active_deadline
                .as_ref()
                .map(|d| d.question_index != question_index)
                .unwrap_or(true);
        if !matches {
            return Ok(false);
        }

        attempt.active_deadline = Some(QuestionDeadline {
            question_index,
            expires_at,
        });
        Ok(true)
    }

    async fn append_answer(
        &self,
        attempt_id: &str,
        expected_index: i32,
        record: AnswerRecord,
        finalize: Option<Finalization>,
    ) -> AppResult<bool> {
        let mut attempts = self.attempts.write().await;
        let Some(attempt) = attempts.get_mut(attempt_id) else {
            return Ok(false);
        };

        if attempt.state != AttemptState::InProgress
            || attempt.recorded_answers.len() != expected_index as usize
        {
            return Ok(false);
        }

        attempt.recorded_answers.push(record);
        attempt.active_deadline = None;
        if let Some(outcome) = finalize {
            apply_finalization(attempt, &outcome);
        }
        Ok(true)
    }

    async fn finalize(
        &self,
        attempt_id: &str,
        expected_len: i32,
        fill: Vec<AnswerRecord>,
        outcome: Finalization,
    ) -> AppResult<bool> {
        let mut attempts = self.attempts.write().await;
        let Some(attempt) = attempts.get_mut(attempt_id) else {
            return Ok(false);
        };

        if attempt.state != AttemptState::InProgress
            || attempt.recorded_answers.len() != expected_len as usize
        {
            return Ok(false);
        }

        attempt.recorded_answers.extend(fill);
        attempt.active_deadline = None;
        apply_finalization(attempt, &outcome);
        Ok(true)
    }

    async fn find_stale_in_progress(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Attempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .filter(|a| a.state == AttemptState::InProgress && a.started_at < cutoff)
            .cloned()
            .collect())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

pub struct Harness {
    pub tests: Arc<InMemoryTestRepository>,
    pub attempts: Arc<InMemoryAttemptRepository>,
    pub admission: Arc<AdmissionService>,
    pub attempt_service: Arc<AttemptService>,
    pub results: Arc<ResultService>,
}

pub fn harness() -> Harness {
    let tests = Arc::new(InMemoryTestRepository::new());
    let attempts = Arc::new(InMemoryAttemptRepository::new());

    let test_repo: Arc<dyn TestRepository> = tests.clone();
    let attempt_repo: Arc<dyn AttemptRepository> = attempts.clone();

    Harness {
        tests,
        attempts,
        admission: Arc::new(AdmissionService::new(test_repo.clone(), attempt_repo.clone())),
        attempt_service: Arc::new(AttemptService::new(test_repo.clone(), attempt_repo.clone())),
        results: Arc::new(ResultService::new(test_repo, attempt_repo)),
    }
}

pub fn make_question(id: &str, order: i32, time_limit_seconds: i64) -> TestQuestion {
    TestQuestion {
        id: id.to_string(),
        order,
        text: format!("Question {}", id),
        time_limit_seconds,
        options: vec![
            AnswerOption {
                id: format!("{}-a", id),
                text: "Correct option".to_string(),
                is_correct: true,
            },
            AnswerOption {
                id: format!("{}-b", id),
                text: "First distractor".to_string(),
                is_correct: false,
            },
            AnswerOption {
                id: format!("{}-c", id),
                text: "Second distractor".to_string(),
                is_correct: false,
            },
        ],
    }
}

/// Active test with ten-second questions "q1".."qN", max_attempts 3,
/// eligible for group "CS-101".
pub fn make_test(id: &str, question_count: usize) -> TestDefinition {
    TestDefinition {
        id: id.to_string(),
        name: format!("Test {}", id),
        active: true,
        max_attempts: 3,
        eligible_groups: vec!["CS-101".to_string()],
        questions: (0..question_count)
            .map(|i| make_question(&format!("q{}", i + 1), i as i32, 10))
            .collect(),
        created_at: Some(Utc::now()),
        modified_at: Some(Utc::now()),
    }
}

pub fn student() -> StudentContext {
    StudentContext::new("student-1", "CS-101")
}
