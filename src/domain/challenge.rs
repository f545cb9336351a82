//! Challenge policy and response parsing.
//!
//! The challenge is deliberately weak: a client passes by ticking the
//! confirmation checkbox or by typing the expected answer. It is an equality
//! test, not bot detection.

use crate::domain::decision::ChallengeOutcome;
use crate::domain::error::GateError;

/// Longest answer accepted before the response is considered malformed.
pub const MAX_ANSWER_LEN: usize = 32;

/// What the verification page asks and what it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengePolicy {
    /// Question shown to the client
    pub prompt: String,
    /// Answer that passes the challenge
    pub expected_answer: String,
    /// Whether ticking the confirmation checkbox alone passes
    pub accept_checkbox: bool,
}

impl Default for ChallengePolicy {
    fn default() -> Self {
        Self {
            prompt: "What is 3 + 3 ?".to_string(),
            expected_answer: "6".to_string(),
            accept_checkbox: true,
        }
    }
}

impl ChallengePolicy {
    /// Policy with a custom question and answer.
    pub fn new(prompt: impl Into<String>, expected_answer: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            expected_answer: expected_answer.into(),
            accept_checkbox: true,
        }
    }

    /// Enable or disable the checkbox shortcut.
    pub fn with_checkbox(mut self, accept: bool) -> Self {
        self.accept_checkbox = accept;
        self
    }

    /// Score a parsed response.
    pub fn evaluate(&self, response: &ChallengeResponse) -> ChallengeOutcome {
        if self.accept_checkbox && response.confirmed {
            return ChallengeOutcome::Correct;
        }

        match response.answer.as_deref() {
            Some(answer) if answers_match(answer, &self.expected_answer) => {
                ChallengeOutcome::Correct
            }
            _ => ChallengeOutcome::Incorrect,
        }
    }
}

/// Both sides are trimmed. Integers compare by value ("06" matches "6"),
/// anything else by exact text.
fn answers_match(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.trim(), expected.trim());
    match (given.parse::<i64>(), expected.parse::<i64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => given == expected,
    }
}

/// A client's submission to the verification route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChallengeResponse {
    /// Checkbox state
    pub confirmed: bool,
    /// Typed answer, trimmed; `None` when left blank
    pub answer: Option<String>,
}

impl ChallengeResponse {
    /// A checkbox-only response.
    pub fn checkbox(confirmed: bool) -> Self {
        Self {
            confirmed,
            answer: None,
        }
    }

    /// A typed-answer response.
    pub fn answer(answer: impl Into<String>) -> Self {
        Self {
            confirmed: false,
            answer: Some(answer.into()),
        }
    }

    /// Build a response from raw form fields.
    ///
    /// The checkbox accepts `on`, `true`, `1`, `yes` (ticked) and `off`,
    /// `false`, `0`, `no` or an empty value (unticked), case-insensitively.
    /// The answer is trimmed; blank means absent.
    ///
    /// # Errors
    /// Returns `GateError::ChallengeResponseMalformed` for an unrecognised
    /// checkbox value, an answer longer than [`MAX_ANSWER_LEN`] bytes, or an
    /// answer containing control characters.
    pub fn from_fields(confirmed: Option<&str>, answer: Option<&str>) -> Result<Self, GateError> {
        let confirmed = match confirmed.map(|v| v.trim().to_ascii_lowercase()) {
            None => false,
            Some(v) => match v.as_str() {
                "on" | "true" | "1" | "yes" => true,
                "" | "off" | "false" | "0" | "no" => false,
                _ => {
                    return Err(GateError::ChallengeResponseMalformed(format!(
                        "unrecognised checkbox value {:?}",
                        v
                    )))
                }
            },
        };

        let answer = match answer.map(str::trim) {
            None | Some("") => None,
            Some(a) if a.len() > MAX_ANSWER_LEN => {
                return Err(GateError::ChallengeResponseMalformed(format!(
                    "answer longer than {} bytes",
                    MAX_ANSWER_LEN
                )))
            }
            Some(a) if a.chars().any(char::is_control) => {
                return Err(GateError::ChallengeResponseMalformed(
                    "answer contains control characters".to_string(),
                ))
            }
            Some(a) => Some(a.to_string()),
        };

        Ok(Self { confirmed, answer })
    }
}
