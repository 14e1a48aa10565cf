use serde::{Deserialize, Serialize};

use crate::core::errors::ChatError;

/// One exchange in a conversation.
///
/// A turn with no question carries system-rendered content (the citation
/// block); a turn with no answer is still waiting for generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: Option<String>,
    pub answer: Option<String>,
}

/// Ordered history of turns for one conversation.
///
/// Append-only: turns are never deleted or reordered, and only the most
/// recently appended turn's answer is ever mutated (token streaming).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Appends a turn holding the user's question, with no answer yet.
    pub fn append_question(&mut self, question: impl Into<String>) {
        self.turns.push(Turn {
            question: Some(question.into()),
            answer: None,
        });
    }

    /// Appends a fully-formed turn (citation turns have no question).
    pub fn append_turn(&mut self, question: Option<String>, answer: Option<String>) {
        self.turns.push(Turn { question, answer });
    }

    /// Concatenates `token` onto the last turn's answer, treating a missing
    /// answer as the empty string.
    pub fn append_token_to_last_answer(&mut self, token: &str) -> Result<(), ChatError> {
        let last = self.turns.last_mut().ok_or(ChatError::EmptyTranscript)?;
        last.answer.get_or_insert_with(String::new).push_str(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_question_adds_unanswered_turn() {
        let mut transcript = Transcript::new();
        transcript.append_question("How do I install it?");

        assert_eq!(transcript.len(), 1);
        let turn = transcript.last().expect("one turn");
        assert_eq!(turn.question.as_deref(), Some("How do I install it?"));
        assert!(turn.answer.is_none());
    }

    #[test]
    fn append_turn_grows_by_exactly_one() {
        let mut transcript = Transcript::new();
        transcript.append_turn(None, Some("sources".to_string()));
        assert_eq!(transcript.len(), 1);
        assert!(transcript.last().expect("turn").question.is_none());
    }

    #[test]
    fn token_append_on_empty_transcript_fails() {
        let mut transcript = Transcript::new();
        let err = transcript.append_token_to_last_answer("x").unwrap_err();
        assert!(matches!(err, ChatError::EmptyTranscript));
        assert!(transcript.is_empty());
    }

    #[test]
    fn token_appends_concatenate() {
        let mut one_at_a_time = Transcript::new();
        one_at_a_time.append_question("q");
        for token in ["a", "b", "c"] {
            one_at_a_time
                .append_token_to_last_answer(token)
                .expect("append");
        }

        let mut all_at_once = Transcript::new();
        all_at_once.append_question("q");
        all_at_once
            .append_token_to_last_answer("abc")
            .expect("append");

        assert_eq!(one_at_a_time, all_at_once);
        assert_eq!(
            one_at_a_time.last().and_then(|t| t.answer.as_deref()),
            Some("abc")
        );
    }

    #[test]
    fn token_append_only_touches_last_turn() {
        let mut transcript = Transcript::new();
        transcript.append_question("first");
        transcript
            .append_token_to_last_answer("done")
            .expect("append");
        transcript.append_question("second");
        transcript
            .append_token_to_last_answer("partial")
            .expect("append");

        assert_eq!(
            transcript.turns()[0].answer.as_deref(),
            Some("done"),
            "earlier turns must stay untouched"
        );
        assert_eq!(transcript.turns()[1].answer.as_deref(), Some("partial"));
    }
}
