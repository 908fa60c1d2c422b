use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, Bson, Document},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::{AnswerRecord, Attempt, AttemptState, QuestionDeadline},
};

/// Terminal outcome applied together with the write that fills the last slot,
/// so a full answer list is never visible on an InProgress attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct Finalization {
    pub state: AttemptState,
    pub score: Option<f64>,
    pub finished_at: DateTime<Utc>,
}

/// Durable store for attempts. All mutating operations are conditional
/// single-document updates: the filter carries the invariant (state still
/// InProgress, answer count still at the expected index), so concurrent
/// writers cannot both succeed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Fails with `AlreadyExists` when an InProgress attempt for the same
    /// (student, test) pair already exists.
    async fn insert_in_progress(&self, attempt: Attempt) -> AppResult<Attempt>;

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Attempt>>;

    async fn find_in_progress(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> AppResult<Option<Attempt>>;

    /// Count of terminal (Completed or Abandoned) attempts for the pair.
    async fn count_settled(&self, student_id: &str, test_id: &str) -> AppResult<usize>;

    async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<Attempt>>;

    /// Arms a deadline for the question at `question_index` unless one is
    /// already active for that index. Returns false when the filter did not
    /// match (deadline already armed, index advanced, or attempt terminal).
    async fn arm_deadline(
        &self,
        attempt_id: &str,
        question_index: i32,
        expires_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Appends one record at `expected_index` and clears the deadline,
    /// optionally finalizing in the same write. Returns false when the
    /// attempt is no longer InProgress or the cursor moved.
    async fn append_answer(
        &self,
        attempt_id: &str,
        expected_index: i32,
        record: AnswerRecord,
        finalize: Option<Finalization>,
    ) -> AppResult<bool>;

    /// Fills the remaining slots and transitions to a terminal state in one
    /// write, gated on the answer count still being `expected_len`.
    async fn finalize(
        &self,
        attempt_id: &str,
        expected_len: i32,
        fill: Vec<AnswerRecord>,
        outcome: Finalization,
    ) -> AppResult<bool>;

    async fn find_stale_in_progress(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Attempt>>;

    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoAttemptRepository {
    collection: Collection<Attempt>,
}

impl MongoAttemptRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("attempts");
        Self { collection }
    }

    fn finalization_sets(outcome: &Finalization, set_doc: &mut Document) -> AppResult<()> {
        set_doc.insert("state", outcome.state.as_str());
        set_doc.insert("finished_at", to_bson(&outcome.finished_at)?);
        if let Some(score) = outcome.score {
            set_doc.insert("score", score);
        }
        Ok(())
    }
}

fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write_error)) if write_error.code == 11000
    )
}

#[async_trait]
impl AttemptRepository for MongoAttemptRepository {
    async fn insert_in_progress(&self, attempt: Attempt) -> AppResult<Attempt> {
        match self.collection.insert_one(&attempt).await {
            Ok(_) => Ok(attempt),
            Err(err) if is_duplicate_key_error(&err) => Err(AppError::AlreadyExists(format!(
                "InProgress attempt for student '{}' on test '{}' already exists",
                attempt.student_id, attempt.test_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Attempt>> {
        let attempt = self.collection.find_one(doc! { "id": id }).await?;
        Ok(attempt)
    }

    async fn find_in_progress(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> AppResult<Option<Attempt>> {
        let attempt = self
            .collection
            .find_one(doc! {
                "student_id": student_id,
                "test_id": test_id,
                "state": AttemptState::InProgress.as_str(),
            })
            .await?;
        Ok(attempt)
    }

    async fn count_settled(&self, student_id: &str, test_id: &str) -> AppResult<usize> {
        let count = self
            .collection
            .count_documents(doc! {
                "student_id": student_id,
                "test_id": test_id,
                "state": { "$ne": AttemptState::InProgress.as_str() },
            })
            .await?;
        Ok(count as usize)
    }

    async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<Attempt>> {
        let attempts = self
            .collection
            .find(doc! { "student_id": student_id })
            .sort(doc! { "test_id": 1, "started_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn arm_deadline(
        &self,
        attempt_id: &str,
        question_index: i32,
        expires_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let deadline = QuestionDeadline {
            question_index,
            expires_at,
        };

        let result = self
            .collection
            .update_one(
                doc! {
                    "id": attempt_id,
                    "state": AttemptState::InProgress.as_str(),
                    "recorded_answers": { "$size": question_index },
                    "$or": [
                        { "active_deadline": Bson::Null },
                        { "active_deadline.question_index": { "$ne": question_index } },
                    ],
                },
                doc! { "$set": { "active_deadline": to_bson(&deadline)? } },
            )
            .await?;

        Ok(result.matched_count == 1)
    }

    async fn append_answer(
        &self,
        attempt_id: &str,
        expected_index: i32,
        record: AnswerRecord,
        finalize: Option<Finalization>,
    ) -> AppResult<bool> {
        let mut set_doc = doc! { "active_deadline": Bson::Null };
        if let Some(outcome) = &finalize {
            Self::finalization_sets(outcome, &mut set_doc)?;
        }

        let result = self
            .collection
            .update_one(
                doc! {
                    "id": attempt_id,
                    "state": AttemptState::InProgress.as_str(),
                    "recorded_answers": { "$size": expected_index },
                },
                doc! {
                    "$push": { "recorded_answers": to_bson(&record)? },
                    "$set": set_doc,
                },
            )
            .await?;

        Ok(result.matched_count == 1)
    }

    async fn finalize(
        &self,
        attempt_id: &str,
        expected_len: i32,
        fill: Vec<AnswerRecord>,
        outcome: Finalization,
    ) -> AppResult<bool> {
        let mut set_doc = doc! { "active_deadline": Bson::Null };
        Self::finalization_sets(&outcome, &mut set_doc)?;

        let mut update = doc! { "$set": set_doc };
        if !fill.is_empty() {
            update.insert("$push", doc! { "recorded_answers": { "$each": to_bson(&fill)? } });
        }

        let result = self
            .collection
            .update_one(
                doc! {
                    "id": attempt_id,
                    "state": AttemptState::InProgress.as_str(),
                    "recorded_answers": { "$size": expected_len },
                },
                update,
            )
            .await?;

        Ok(result.matched_count == 1)
    }

    async fn find_stale_in_progress(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Attempt>> {
        let attempts = self
            .collection
            .find(doc! {
                "state": AttemptState::InProgress.as_str(),
                "started_at": { "$lt": to_bson(&cutoff)? },
            })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        // Partial unique index: the at-most-one-InProgress-attempt invariant.
        // Concurrent StartAttempt calls collapse to a single winner here.
        let in_progress_index = IndexModel::builder()
            .keys(doc! { "student_id": 1, "test_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(
                        doc! { "state": AttemptState::InProgress.as_str() },
                    )
                    .name("one_in_progress_per_student_test".to_string())
                    .build(),
            )
            .build();

        let student_index = IndexModel::builder()
            .keys(doc! { "student_id": 1 })
            .options(IndexOptions::builder().name("student_id".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(in_progress_index).await?;
        self.collection.create_index(student_index).await?;

        log::info!("created indexes for attempts collection");
        Ok(())
    }
}
