pub mod admission_service;
pub mod attempt_service;
pub mod deadline;
pub mod result_service;
pub mod scoring;

pub use admission_service::{AdmissionService, StartAttemptOutcome};
pub use attempt_service::{AttemptService, SubmitOutcome};
pub use result_service::ResultService;
pub use scoring::Scorer;
