use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartAttemptRequest {
    #[validate(length(min = 1, max = 64))]
    pub student_id: String,

    #[validate(length(min = 1, max = 64))]
    pub group: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1))]
    pub question_id: String,

    /// None means the client is reporting "no answer" for the question.
    pub selected_answer_id: Option<String>,

    /// Advisory only; the server clamps it to the question's time budget.
    #[validate(range(min = 0))]
    pub time_spent_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub completed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_attempt_request_rejects_empty_fields() {
        let request = StartAttemptRequest {
            student_id: "".to_string(),
            group: "CS-101".to_string(),
        };

        assert!(request.validate().is_err());
    }

    #[test]
    fn submit_answer_request_rejects_negative_time() {
        let request = SubmitAnswerRequest {
            question_id: "q1".to_string(),
            selected_answer_id: Some("q1-a".to_string()),
            time_spent_seconds: -5,
        };

        assert!(request.validate().is_err());
    }

    #[test]
    fn submit_answer_request_allows_null_answer() {
        let json = r#"{"question_id":"q1","selected_answer_id":null,"time_spent_seconds":3}"#;
        let request: SubmitAnswerRequest =
            serde_json::from_str(json).expect("request should deserialize");

        assert!(request.selected_answer_id.is_none());
        assert!(request.validate().is_ok());
    }
}
