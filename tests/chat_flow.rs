//! End-to-end exercise of the conversational turn pipeline against a
//! scripted answer engine.

use std::sync::Arc;

use async_trait::async_trait;

use ragdocs_backend::core::errors::ApiError;
use ragdocs_backend::engine::{AnswerEngine, Completion, TokenStream};
use ragdocs_backend::pipeline::TurnPipeline;
use ragdocs_backend::sources::MatchedDocument;
use ragdocs_backend::transcript::Transcript;

/// Engine that answers every question the same way, optionally with
/// citable documents.
struct CannedEngine {
    tokens: Vec<&'static str>,
    answer_relevant: bool,
    matched_documents: Vec<MatchedDocument>,
}

#[async_trait]
impl AnswerEngine for CannedEngine {
    fn name(&self) -> &str {
        "canned"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn process_input(&self, _question: &str) -> Result<Completion, ApiError> {
        Ok(Completion {
            answer_generator: TokenStream::from_tokens(self.tokens.clone()),
            answer_relevant: self.answer_relevant,
            matched_documents: self.matched_documents.clone(),
        })
    }
}

fn doc(title: &str, score: f64) -> MatchedDocument {
    MatchedDocument {
        title: title.to_string(),
        url: format!("https://docs.example.com/{}", title.to_lowercase()),
        similarity_to_answer: score,
    }
}

async fn run_full_turn(pipeline: &TurnPipeline, transcript: &mut Transcript, question: &str) {
    pipeline.add_user_question(transcript, question);
    let completion = pipeline
        .chat(transcript, |_, _| {})
        .await
        .expect("generation succeeds");
    pipeline.add_sources(transcript, &completion);
}

#[tokio::test]
async fn cited_turns_produce_two_transcript_entries() {
    let engine = Arc::new(CannedEngine {
        tokens: vec!["See", " ", "the", " ", "docs."],
        answer_relevant: true,
        matched_documents: vec![doc("Install", 0.9), doc("Install", 0.4), doc("Usage", 0.7)],
    });
    let pipeline = TurnPipeline::new(engine);
    let mut transcript = Transcript::new();

    let turns = 3;
    for i in 0..turns {
        run_full_turn(&pipeline, &mut transcript, &format!("question {}", i)).await;
    }

    // Each full turn adds the question turn plus one citation turn.
    assert_eq!(transcript.len(), turns * 2);

    for (i, turn) in transcript.turns().iter().enumerate() {
        if i % 2 == 0 {
            assert!(turn.question.is_some());
            assert_eq!(turn.answer.as_deref(), Some("See the docs."));
        } else {
            assert!(turn.question.is_none());
            let citation = turn.answer.as_deref().expect("citation text");
            // Duplicate "Install" entries collapse to the highest score.
            assert_eq!(citation.matches("[🔗 Install]").count(), 1);
            assert!(citation.contains("90.0 %"));
            assert!(citation.contains("[🔗 Usage]"));
        }
    }
}

#[tokio::test]
async fn uncited_turns_produce_one_transcript_entry() {
    let engine = Arc::new(CannedEngine {
        tokens: vec!["No", " ", "idea."],
        answer_relevant: false,
        matched_documents: vec![doc("Unrelated", 0.2)],
    });
    let pipeline = TurnPipeline::new(engine);
    let mut transcript = Transcript::new();

    let turns = 4;
    for i in 0..turns {
        run_full_turn(&pipeline, &mut transcript, &format!("question {}", i)).await;
    }

    assert_eq!(transcript.len(), turns);
    assert!(transcript.turns().iter().all(|t| t.question.is_some()));
}

#[tokio::test]
async fn transcript_grows_by_turns_plus_citations() {
    let cited = Arc::new(CannedEngine {
        tokens: vec!["yes"],
        answer_relevant: true,
        matched_documents: vec![doc("Ref", 0.8)],
    });
    let uncited = Arc::new(CannedEngine {
        tokens: vec!["no"],
        answer_relevant: false,
        matched_documents: Vec::new(),
    });

    let mut transcript = Transcript::new();
    let cited_pipeline = TurnPipeline::new(cited);
    let uncited_pipeline = TurnPipeline::new(uncited);

    run_full_turn(&cited_pipeline, &mut transcript, "first").await;
    run_full_turn(&uncited_pipeline, &mut transcript, "second").await;
    run_full_turn(&cited_pipeline, &mut transcript, "third").await;

    // 3 question turns + 2 citation turns.
    assert_eq!(transcript.len(), 5);
}
