//! The conversational turn pipeline.
//!
//! One user action drives three steps in strict sequence: append the
//! question, stream the generated answer token by token, then append the
//! formatted citations as a separate turn. The pipeline owns no transcript;
//! callers pass the session's transcript in and observe every intermediate
//! state through the `on_update` callback, which is the cooperative
//! suspension point the UI re-renders on.

use std::sync::Arc;

use crate::core::errors::ChatError;
use crate::engine::{AnswerEngine, Completion};
use crate::sources::format_sources;
use crate::transcript::Transcript;

pub struct TurnPipeline {
    engine: Arc<dyn AnswerEngine>,
}

impl TurnPipeline {
    pub fn new(engine: Arc<dyn AnswerEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &dyn AnswerEngine {
        self.engine.as_ref()
    }

    /// Step 1: appends the user's question as a new unanswered turn.
    ///
    /// Emptiness is not validated here; rejecting blank input is the UI
    /// layer's job.
    pub fn add_user_question(&self, transcript: &mut Transcript, question: &str) {
        transcript.append_question(question);
    }

    /// Step 2: generates the answer for the last appended question.
    ///
    /// Calls the engine, then pulls tokens in production order, appending
    /// each to the last turn's answer and invoking `on_update` with the
    /// updated transcript and the token just appended. On failure the
    /// transcript keeps everything appended so far; completed turns are
    /// never rolled back.
    pub async fn chat<F>(
        &self,
        transcript: &mut Transcript,
        mut on_update: F,
    ) -> Result<Completion, ChatError>
    where
        F: FnMut(&Transcript, &str),
    {
        let last = transcript.last().ok_or(ChatError::EmptyTranscript)?;
        let user_input = last.question.clone().ok_or(ChatError::MissingQuestion)?;

        let mut completion = self
            .engine
            .process_input(&user_input)
            .await
            .map_err(ChatError::Generation)?;

        // Generation is under way: the answer becomes empty text and grows
        // monotonically from here.
        transcript.append_token_to_last_answer("")?;

        while let Some(token) = completion.answer_generator.next().await {
            let token = token.map_err(ChatError::Generation)?;
            transcript.append_token_to_last_answer(&token)?;
            on_update(transcript, &token);
        }

        Ok(completion)
    }

    /// Step 3: appends the citation turn for a completed generation.
    ///
    /// No-op when the engine judged no document relevant, or when formatting
    /// produced no text. Returns whether a turn was appended.
    pub fn add_sources(&self, transcript: &mut Transcript, completion: &Completion) -> bool {
        if !completion.answer_relevant {
            return false;
        }

        let formatted = format_sources(&completion.matched_documents);
        if formatted.is_empty() {
            return false;
        }

        transcript.append_turn(None, Some(formatted));
        true
    }
}
