use async_trait::async_trait;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::TestDefinition};

/// Read-only view of the test catalog. Authoring lives in another system.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestDefinition>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoTestRepository {
    collection: Collection<TestDefinition>,
}

impl MongoTestRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("tests");
        Self { collection }
    }
}

#[async_trait]
impl TestRepository for MongoTestRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<TestDefinition>> {
        let test = self.collection.find_one(doc! { "id": id }).await?;
        Ok(test)
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

        self.collection.create_index(id_index).await?;

        log::info!("created indexes for tests collection");
        Ok(())
    }
}
