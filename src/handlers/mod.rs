pub mod attempt_handler;
pub mod health_handler;
pub mod result_handler;

pub use attempt_handler::{finish_test, get_current_question, start_attempt, submit_answer};
pub use health_handler::{health_check, health_check_live, health_check_ready};
pub use result_handler::{get_attempt_history, get_result};
