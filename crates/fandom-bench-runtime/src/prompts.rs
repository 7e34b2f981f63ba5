//! Grader prompts.
//!
//! The system prompt is fixed; only the user message changes per record.

use crate::providers::ChatMessage;

/// Stand-in for records without an expected answer.
pub const NO_EXPECTED_PLACEHOLDER: &str = "(no expected answer provided)";

/// System prompt for the grading model.
///
/// Spells out the JSON shape so providers without native structured
/// output still answer in a decodable form.
pub const GRADER_SYSTEM_PROMPT: &str = r#"You are a strict grader. Score the candidate answer compared to the expected answer. Return a score between 0 and 1, set decision to one of correct/partial/incorrect, and include a short note. Be concise.

Respond with a single JSON object and nothing else:
{
  "score": 0.0-1.0,
  "decision": "correct" | "partial" | "incorrect",
  "notes": "short justification"
}"#;

/// Render the per-record user message.
pub fn grader_user_message(prompt: &str, expected: Option<&str>, candidate: &str) -> String {
    let expected = match expected {
        Some(text) if !text.is_empty() => text,
        _ => NO_EXPECTED_PLACEHOLDER,
    };
    format!(
        "Prompt: {}\nExpected answer: {}\nCandidate answer: {}\nProvide your evaluation.",
        prompt, expected, candidate
    )
}

/// The two-message conversation sent to the grader.
pub fn grader_messages(prompt: &str, expected: Option<&str>, candidate: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(GRADER_SYSTEM_PROMPT),
        ChatMessage::user(grader_user_message(prompt, expected, candidate)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_interpolates_fields() {
        let msg = grader_user_message("2+2?", Some("4"), "four");
        assert_eq!(
            msg,
            "Prompt: 2+2?\nExpected answer: 4\nCandidate answer: four\nProvide your evaluation."
        );
    }

    #[test]
    fn test_missing_expected_uses_placeholder() {
        assert!(grader_user_message("q", None, "a").contains(NO_EXPECTED_PLACEHOLDER));
        assert!(grader_user_message("q", Some(""), "a").contains(NO_EXPECTED_PLACEHOLDER));
    }

    #[test]
    fn test_system_prompt_names_every_decision() {
        for decision in ["correct", "partial", "incorrect"] {
            assert!(GRADER_SYSTEM_PROMPT.contains(decision));
        }
        assert!(GRADER_SYSTEM_PROMPT.contains("\"score\""));
    }

    #[test]
    fn test_grader_messages_roles() {
        let messages = grader_messages("q", Some("a"), "c");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
    }
}
