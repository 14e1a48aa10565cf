//! Citation formatting for retrieved documents.
//!
//! Turns the engine's ranked matches into the citation block appended to the
//! transcript after an answer: intro sentence, one line per unique source
//! (highest relevance first), disclaimer footnote.

use serde::{Deserialize, Serialize};

/// One retrieved source with its relevance to the generated answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedDocument {
    pub title: String,
    pub url: String,
    /// Fraction in [0, 1] reported by the answer engine.
    pub similarity_to_answer: f64,
}

const SOURCES_INTRO: &str = "📝 Here are the sources I used to answer your question:";
const SOURCES_FOOTNOTE: &str = "I'm a bot 🤖 and not always perfect.";

/// Formats matched documents as citation text.
///
/// Returns an empty string for empty input (the caller suppresses the
/// citation turn). Malformed records are dropped rather than failing the
/// turn: a blank title or a non-finite score excludes the record, and
/// out-of-range scores are clamped to [0, 1] before rescaling.
pub fn format_sources(matches: &[MatchedDocument]) -> String {
    if matches.is_empty() {
        return String::new();
    }

    struct Ranked<'a> {
        doc: &'a MatchedDocument,
        percent: f64,
    }

    let mut ranked: Vec<Ranked> = Vec::with_capacity(matches.len());
    for doc in matches {
        if doc.title.trim().is_empty() || !doc.similarity_to_answer.is_finite() {
            tracing::warn!(
                title = %doc.title,
                score = doc.similarity_to_answer,
                "Dropping malformed matched document from citations"
            );
            continue;
        }

        let mut score = doc.similarity_to_answer;
        if !(0.0..=1.0).contains(&score) {
            tracing::warn!(
                title = %doc.title,
                score,
                "Relevance score outside [0, 1]; clamping"
            );
            score = score.clamp(0.0, 1.0);
        }

        // Keep only the highest-scoring entry per title; ties keep the
        // first one encountered.
        let percent = score * 100.0;
        match ranked.iter_mut().find(|r| r.doc.title == doc.title) {
            Some(existing) if existing.percent < percent => {
                *existing = Ranked { doc, percent };
            }
            Some(_) => {}
            None => ranked.push(Ranked { doc, percent }),
        }
    }

    if ranked.is_empty() {
        return String::new();
    }

    ranked.sort_by(|a, b| b.percent.total_cmp(&a.percent));

    let documents = ranked
        .iter()
        .map(|r| {
            format!(
                "[🔗 {}]({}), relevance: {:2.1} %",
                r.doc.title, r.doc.url, r.percent
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("{SOURCES_INTRO}\n\n{documents}\n\n{SOURCES_FOOTNOTE}")
}
