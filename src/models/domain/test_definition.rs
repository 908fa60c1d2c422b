use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog entry for one test. Authored elsewhere; this engine only reads it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TestDefinition {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub max_attempts: i32,
    pub eligible_groups: Vec<String>,
    pub questions: Vec<TestQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TestQuestion {
    pub id: String,
    /// 0-based position in the test's fixed question order.
    pub order: i32,
    pub text: String,
    pub time_limit_seconds: i64,
    pub options: Vec<AnswerOption>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnswerOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

impl TestDefinition {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn question_at(&self, index: usize) -> Option<&TestQuestion> {
        self.questions.iter().find(|q| q.order == index as i32)
    }

    pub fn question_by_id(&self, question_id: &str) -> Option<&TestQuestion> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn is_group_eligible(&self, group: &str) -> bool {
        self.eligible_groups.iter().any(|g| g == group)
    }
}

impl TestQuestion {
    pub fn correct_option_id(&self) -> Option<&str> {
        self.options
            .iter()
            .find(|opt| opt.is_correct)
            .map(|opt| opt.id.as_str())
    }

    pub fn has_option(&self, option_id: &str) -> bool {
        self.options.iter().any(|opt| opt.id == option_id)
    }

    pub fn option_text(&self, option_id: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|opt| opt.id == option_id)
            .map(|opt| opt.text.as_str())
    }
}
