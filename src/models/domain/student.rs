use serde::{Deserialize, Serialize};

/// Caller identity, supplied explicitly on every operation that needs it.
/// Issued by the external identity/roster system; trusted as given.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct StudentContext {
    pub student_id: String,
    pub group: String,
}

impl StudentContext {
    pub fn new(student_id: &str, group: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            group: group.to_string(),
        }
    }
}
