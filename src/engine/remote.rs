//! HTTP client for a remote answer engine.
//!
//! Protocol: `POST {base}/v1/answer` with `{"question": ..., "stream": true}`
//! answered as an SSE body. The first `data:` event carries the retrieval
//! outcome (`answer_relevant`, `matched_documents`); each following event
//! carries a `delta` token; `data: [DONE]` terminates the stream.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use super::{AnswerEngine, Completion, TokenStream};
use crate::core::errors::ApiError;
use crate::sources::MatchedDocument;

#[derive(Clone)]
pub struct RemoteAnswerEngine {
    base_url: String,
    client: Client,
}

impl RemoteAnswerEngine {
    pub fn new(base_url: String, timeout_secs: u64) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AnswerHeader {
    #[serde(default)]
    answer_relevant: bool,
    #[serde(default)]
    matched_documents: Vec<MatchedDocument>,
}

#[derive(Debug, Deserialize)]
struct AnswerDelta {
    delta: String,
}

/// Removes and returns the first complete line from `buf`, if any.
fn take_line(buf: &mut String) -> Option<String> {
    let pos = buf.find('\n')?;
    let line: String = buf.drain(..=pos).collect();
    Some(line.trim().to_string())
}

#[async_trait]
impl AnswerEngine for RemoteAnswerEngine {
    fn name(&self) -> &str {
        "remote"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn process_input(&self, question: &str) -> Result<Completion, ApiError> {
        let url = format!("{}/v1/answer", self.base_url);
        let body = json!({ "question": question, "stream": true });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Answer engine error ({}): {}",
                status, text
            )));
        }

        let mut stream = res.bytes_stream();
        let mut buf = String::new();

        // The sources event arrives before any token; wait for it so the
        // caller holds the full retrieval outcome up front.
        let header: AnswerHeader = loop {
            if let Some(line) = take_line(&mut buf) {
                if line.is_empty() {
                    continue;
                }
                if line == "data: [DONE]" {
                    // Engine hung up without retrieval output; nothing to
                    // cite and nothing to stream.
                    break AnswerHeader {
                        answer_relevant: false,
                        matched_documents: Vec::new(),
                    };
                }
                if let Some(data) = line.strip_prefix("data: ") {
                    match serde_json::from_str::<AnswerHeader>(data) {
                        Ok(header) => break header,
                        Err(err) => {
                            return Err(ApiError::Internal(format!(
                                "Malformed sources event from engine: {}",
                                err
                            )));
                        }
                    }
                }
                continue;
            }

            match stream.next().await {
                Some(Ok(bytes)) => buf.push_str(&String::from_utf8_lossy(&bytes)),
                Some(Err(err)) => return Err(ApiError::internal(err)),
                None => {
                    return Err(ApiError::Internal(
                        "Engine stream ended before the sources event".to_string(),
                    ));
                }
            }
        };

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            loop {
                while let Some(line) = take_line(&mut buf) {
                    if line.is_empty() {
                        continue;
                    }
                    if line == "data: [DONE]" {
                        return;
                    }
                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if let Ok(event) = serde_json::from_str::<AnswerDelta>(data) {
                        if !event.delta.is_empty() && tx.send(Ok(event.delta)).await.is_err() {
                            // Receiver dropped: generation was abandoned.
                            return;
                        }
                    }
                }

                match stream.next().await {
                    Some(Ok(bytes)) => buf.push_str(&String::from_utf8_lossy(&bytes)),
                    Some(Err(err)) => {
                        let _ = tx.send(Err(ApiError::internal(err))).await;
                        return;
                    }
                    None => return,
                }
            }
        });

        Ok(Completion {
            answer_generator: TokenStream::new(rx),
            answer_relevant: header.answer_relevant,
            matched_documents: header.matched_documents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_line_drains_complete_lines_only() {
        let mut buf = "data: a\ndata: b\npartial".to_string();
        assert_eq!(take_line(&mut buf).as_deref(), Some("data: a"));
        assert_eq!(take_line(&mut buf).as_deref(), Some("data: b"));
        assert_eq!(take_line(&mut buf), None);
        assert_eq!(buf, "partial");
    }

    #[test]
    fn header_event_parses_documents() {
        let raw = r#"{"answer_relevant": true, "matched_documents": [
            {"title": "Install", "url": "https://d/install", "similarity_to_answer": 0.82}
        ]}"#;
        let header: AnswerHeader = serde_json::from_str(raw).expect("parse");
        assert!(header.answer_relevant);
        assert_eq!(header.matched_documents.len(), 1);
        assert_eq!(header.matched_documents[0].title, "Install");
    }
}
