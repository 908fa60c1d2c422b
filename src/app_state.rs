use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{AttemptRepository, MongoAttemptRepository, MongoTestRepository, TestRepository},
    services::{AdmissionService, AttemptService, ResultService},
};

#[derive(Clone)]
pub struct AppState {
    pub admission_service: Arc<AdmissionService>,
    pub attempt_service: Arc<AttemptService>,
    pub result_service: Arc<ResultService>,
    pub db: Database,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let test_repository: Arc<dyn TestRepository> = Arc::new(MongoTestRepository::new(&db));
        test_repository.ensure_indexes().await?;

        let attempt_repository: Arc<dyn AttemptRepository> =
            Arc::new(MongoAttemptRepository::new(&db));
        attempt_repository.ensure_indexes().await?;

        let admission_service = Arc::new(AdmissionService::new(
            test_repository.clone(),
            attempt_repository.clone(),
        ));
        let attempt_service = Arc::new(AttemptService::new(
            test_repository.clone(),
            attempt_repository.clone(),
        ));
        let result_service = Arc::new(ResultService::new(test_repository, attempt_repository));

        Ok(Self {
            admission_service,
            attempt_service,
            result_service,
            db,
            config: Arc::new(config),
        })
    }
}
