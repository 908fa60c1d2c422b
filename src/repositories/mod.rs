pub mod attempt_repository;
pub mod test_repository;

pub use attempt_repository::{AttemptRepository, Finalization, MongoAttemptRepository};
pub use test_repository::{MongoTestRepository, TestRepository};

#[cfg(test)]
pub use attempt_repository::MockAttemptRepository;
#[cfg(test)]
pub use test_repository::MockTestRepository;
