//! Answer-engine boundary.
//!
//! The engine (retrieval, prompting, generation, relevance scoring) is an
//! external collaborator; this module defines the contract the pipeline
//! consumes and the streaming types that carry its output.

pub mod remote;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::errors::ApiError;
use crate::sources::MatchedDocument;

pub use remote::RemoteAnswerEngine;

/// Finite, forward-only stream of answer tokens.
///
/// Consumed exactly once, in production order; `next` returning `None` means
/// the generator is exhausted. Dropping the stream hangs up on the producer,
/// which cancels generation.
pub struct TokenStream {
    rx: mpsc::Receiver<Result<String, ApiError>>,
}

impl TokenStream {
    pub fn new(rx: mpsc::Receiver<Result<String, ApiError>>) -> Self {
        Self { rx }
    }

    /// Builds an already-buffered stream from a fixed token sequence.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let (tx, rx) = mpsc::channel(tokens.len().max(1));
        for token in tokens {
            // Capacity covers every token, so try_send cannot fail here.
            let _ = tx.try_send(Ok(token));
        }
        Self { rx }
    }

    pub async fn next(&mut self) -> Option<Result<String, ApiError>> {
        self.rx.recv().await
    }
}

impl std::fmt::Debug for TokenStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStream").finish_non_exhaustive()
    }
}

/// Result bundle of one generation call.
///
/// Owned by the turn pipeline for the duration of one turn and discarded
/// after citations are appended.
#[derive(Debug)]
pub struct Completion {
    pub answer_generator: TokenStream,
    pub answer_relevant: bool,
    pub matched_documents: Vec<MatchedDocument>,
}

#[async_trait]
pub trait AnswerEngine: Send + Sync {
    /// Engine name for logs and status reporting.
    fn name(&self) -> &str;

    /// Whether the engine endpoint is reachable.
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// Runs retrieval + augmented generation for one question.
    async fn process_input(&self, question: &str) -> Result<Completion, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buffered_stream_preserves_order_and_ends() {
        let mut stream = TokenStream::from_tokens(["The", " ", "sky"]);
        let mut collected = Vec::new();
        while let Some(token) = stream.next().await {
            collected.push(token.expect("token"));
        }
        assert_eq!(collected, vec!["The", " ", "sky"]);
        assert!(stream.next().await.is_none(), "stream stays exhausted");
    }
}
