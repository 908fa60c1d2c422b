use crate::models::domain::{AnswerOption, StudentContext, TestDefinition, TestQuestion};

#[cfg(test)]
pub mod fixtures {
    use super::*;
    use chrono::Utc;

    /// A question with three options; "<id>-a" is the correct one.
    pub fn test_question(id: &str, order: i32, time_limit_seconds: i64) -> TestQuestion {
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

    /// An active test with `question_count` ten-second questions ("q1"...),
    /// three attempts allowed, eligible for group "CS-101".
    pub fn test_definition(id: &str, question_count: usize) -> TestDefinition {
        TestDefinition {
            id: id.to_string(),
            name: format!("Test {}", id),
            active: true,
            max_attempts: 3,
            eligible_groups: vec!["CS-101".to_string()],
            questions: (0..question_count)
                .map(|i| test_question(&format!("q{}", i + 1), i as i32, 10))
                .collect(),
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    pub fn student() -> StudentContext {
        StudentContext::new("student-1", "CS-101")
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn test_fixture_definition_shape() {
        let test = test_definition("test-1", 4);

        assert_eq!(test.question_count(), 4);
        assert!(test.active);
        assert_eq!(test.question_at(0).map(|q| q.id.as_str()), Some("q1"));
        assert_eq!(test.question_at(3).map(|q| q.id.as_str()), Some("q4"));
    }

    #[test]
    fn test_fixture_questions_have_one_correct_option() {
        let question = test_question("q1", 0, 10);

        assert_eq!(question.options.iter().filter(|o| o.is_correct).count(), 1);
        assert_eq!(question.correct_option_id(), Some("q1-a"));
    }

    #[test]
    fn test_fixture_student_is_eligible() {
        let test = test_definition("test-1", 1);
        let student = student();

        assert!(test.is_group_eligible(&student.group));
    }
}
