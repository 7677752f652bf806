//! Keyword-driven instruction parsing.
//!
//! Turns "send an email to bob@example.com about the launch. saying 'ship it'"
//! into an [`EmailIntent`]. This is deliberately shallow pattern matching,
//! not language understanding.

use mailpilot_core_types::EmailIntent;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_SUBJECT: &str = "Automated Email";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntentError {
    #[error("instruction is empty")]
    EmptyInstruction,
    #[error("no recipient address found in instruction: {0}")]
    MissingRecipient(String),
}

pub trait InstructionParser: Send + Sync {
    fn parse(&self, instruction: &str) -> Result<EmailIntent, IntentError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordInstructionParser;

impl KeywordInstructionParser {
    pub fn new() -> Self {
        Self
    }
}

impl InstructionParser for KeywordInstructionParser {
    fn parse(&self, instruction: &str) -> Result<EmailIntent, IntentError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(IntentError::EmptyInstruction);
        }
        info!(instruction, "parsing instruction");

        let recipient = extract_recipient(instruction)
            .ok_or_else(|| IntentError::MissingRecipient(instruction.to_string()))?;
        let subject = extract_subject(instruction).unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
        let body = extract_body(instruction).unwrap_or_else(|| {
            format!("This email was sent automatically based on: {instruction}")
        });

        debug!(%recipient, %subject, "parsed instruction");
        Ok(EmailIntent::new(recipient, subject, body, instruction))
    }
}

/// First address-looking word directly after a standalone "to".
fn extract_recipient(instruction: &str) -> Option<String> {
    let words: Vec<&str> = instruction.split_whitespace().collect();
    words.windows(2).find_map(|pair| {
        if !pair[0].eq_ignore_ascii_case("to") {
            return None;
        }
        let candidate = pair[1]
            .trim_matches(|c: char| matches!(c, '<' | '>' | '"' | '\'' | '(' | ')'))
            .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?'));
        is_email_shaped(candidate).then(|| candidate.to_string())
    })
}

fn is_email_shaped(candidate: &str) -> bool {
    match candidate.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        }
        None => false,
    }
}

/// Text after "about" up to the first period, else text after "subject".
fn extract_subject(instruction: &str) -> Option<String> {
    if let Some(rest) = after_keyword(instruction, "about") {
        let subject = rest.split('.').next().unwrap_or_default().trim();
        return non_empty(subject);
    }
    after_keyword(instruction, "subject")
        .map(|rest| rest.trim_start_matches(':').trim())
        .and_then(non_empty)
}

fn extract_body(instruction: &str) -> Option<String> {
    after_keyword(instruction, "saying")
        .map(|rest| rest.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .and_then(non_empty)
}

fn after_keyword<'a>(instruction: &'a str, keyword: &str) -> Option<&'a str> {
    let lowered = instruction.to_ascii_lowercase();
    lowered
        .find(keyword)
        .map(|index| &instruction[index + keyword.len()..])
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(instruction: &str) -> Result<EmailIntent, IntentError> {
        KeywordInstructionParser::new().parse(instruction)
    }

    #[test]
    fn extracts_every_field() {
        let intent = parse(
            "Send an email to alice@example.com about the quarterly report. \
             saying 'Numbers are in'",
        )
        .unwrap();
        assert_eq!(intent.recipient, "alice@example.com");
        assert_eq!(intent.subject, "the quarterly report");
        assert_eq!(intent.body, "Numbers are in");
        assert!(intent.raw_instruction.starts_with("Send an email"));
    }

    #[test]
    fn falls_back_to_defaults() {
        let instruction = "write to bob@example.org";
        let intent = parse(instruction).unwrap();
        assert_eq!(intent.subject, DEFAULT_SUBJECT);
        assert_eq!(
            intent.body,
            format!("This email was sent automatically based on: {instruction}")
        );
    }

    #[test]
    fn subject_keyword_is_used_without_about() {
        let intent = parse("email to carol@example.net with subject: Dinner plans").unwrap();
        assert_eq!(intent.subject, "Dinner plans");
    }

    #[test]
    fn trailing_punctuation_is_not_part_of_the_address() {
        let intent = parse("Reply to dave@example.com, saying \"on my way\"").unwrap();
        assert_eq!(intent.recipient, "dave@example.com");
        assert_eq!(intent.body, "on my way");
    }

    #[test]
    fn missing_recipient_is_rejected() {
        assert!(matches!(
            parse("send a note about lunch"),
            Err(IntentError::MissingRecipient(_))
        ));
        assert!(matches!(
            parse("talk to the team about lunch"),
            Err(IntentError::MissingRecipient(_))
        ));
        assert_eq!(parse("   "), Err(IntentError::EmptyInstruction));
    }
}
