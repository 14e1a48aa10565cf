//! The WebSocket presentation adapter.
//!
//! One `chat` message from the UI drives the three pipeline steps in strict
//! sequence: question turn, streamed answer, citation turn. Every
//! intermediate state goes back over the socket so the chat view re-renders
//! after each generated token.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::protocol::{WsIncomingMessage, WS_APP_PROTOCOL};
use crate::core::errors::ChatError;
use crate::sessions::GenerationRejected;
use crate::state::AppState;
use crate::transcript::Transcript;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.protocols([WS_APP_PROTOCOL])
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut incoming) = socket.split();

    // All outbound traffic funnels through one writer task, so the chat
    // loop can emit chunks without holding the sink across awaits.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Value>();
    let writer = tokio::spawn(async move {
        while let Some(payload) = out_rx.recv().await {
            let Ok(text) = serde_json::to_string(&payload) else {
                continue;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut current_session_id = "default".to_string();

    while let Some(Ok(msg)) = incoming.next().await {
        match msg {
            Message::Text(text) => {
                let Ok(data) = serde_json::from_str::<WsIncomingMessage>(&text) else {
                    let _ = out_tx.send(json!({
                        "type": "error",
                        "message": "Malformed message",
                    }));
                    continue;
                };
                handle_message(&state, &out_tx, &mut current_session_id, data).await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    drop(out_tx);
    let _ = writer.await;
}

async fn handle_message(
    state: &Arc<AppState>,
    out_tx: &mpsc::UnboundedSender<Value>,
    current_session_id: &mut String,
    data: WsIncomingMessage,
) {
    match data.msg_type.as_deref().unwrap_or("chat") {
        "set_session" => {
            if let Some(session_id) = data.session_id {
                *current_session_id = session_id;
                let session = state.sessions.get_or_create(current_session_id);
                let _ = out_tx.send(json!({
                    "type": "session_changed",
                    "sessionId": current_session_id,
                }));
                let snapshot = {
                    let transcript = session.transcript().await;
                    transcript_snapshot(&transcript, state.config.transcript_snapshot_limit())
                };
                let _ = out_tx.send(json!({"type": "transcript", "turns": snapshot}));
            }
        }
        "stop" => {
            // In-flight generations run to completion (reject policy); this
            // just acknowledges the UI.
            let _ = out_tx.send(json!({"type": "stopped"}));
        }
        "chat" => {
            let question = data.message.unwrap_or_default();
            if question.is_empty() {
                return;
            }
            let session_id = data
                .session_id
                .unwrap_or_else(|| current_session_id.clone());
            run_chat_turn(state, out_tx, &session_id, &question).await;
        }
        other => {
            tracing::debug!("Ignoring unknown WS message type: {}", other);
        }
    }
}

/// Runs one full conversational turn and streams every intermediate state
/// to the client.
async fn run_chat_turn(
    state: &Arc<AppState>,
    out_tx: &mpsc::UnboundedSender<Value>,
    session_id: &str,
    question: &str,
) {
    let session = state.sessions.get_or_create(session_id);

    let _guard = match state.sessions.begin_generation(&session) {
        Ok(guard) => guard,
        Err(GenerationRejected::SessionBusy) => {
            let _ = out_tx.send(json!({
                "type": "busy",
                "message": "An answer is still streaming for this session",
            }));
            return;
        }
        Err(GenerationRejected::NoFreeSlots) => {
            let _ = out_tx.send(json!({
                "type": "busy",
                "message": "The server is at capacity, try again shortly",
            }));
            return;
        }
    };

    let mut transcript = session.transcript().await;

    state.pipeline.add_user_question(&mut transcript, question);
    session.touch();
    let _ = out_tx.send(json!({
        "type": "question",
        "message": question,
        "sessionId": session.id,
    }));

    let completion = match state
        .pipeline
        .chat(&mut transcript, |_transcript, token| {
            let _ = out_tx.send(json!({"type": "chunk", "message": token}));
        })
        .await
    {
        Ok(completion) => completion,
        Err(err) => {
            // The transcript keeps the question and any partial answer; the
            // UI renders the error in place of the rest.
            match &err {
                ChatError::Generation(source) => {
                    tracing::error!("Generation failed for session {}: {}", session.id, source);
                }
                ChatError::EmptyTranscript | ChatError::MissingQuestion => {
                    tracing::error!("Pipeline sequencing bug: {}", err);
                }
            }
            let _ = out_tx.send(json!({"type": "error", "message": err.to_string()}));
            return;
        }
    };

    if state.pipeline.add_sources(&mut transcript, &completion) {
        if let Some(text) = transcript.last().and_then(|turn| turn.answer.clone()) {
            let _ = out_tx.send(json!({"type": "sources", "message": text}));
        }
    }

    session.touch();
    let _ = out_tx.send(json!({"type": "done"}));
}

fn transcript_snapshot(transcript: &Transcript, limit: usize) -> Vec<Value> {
    let turns = transcript.turns();
    let skip = turns.len().saturating_sub(limit);
    turns
        .iter()
        .skip(skip)
        .map(|turn| {
            json!({
                "question": turn.question,
                "answer": turn.answer,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_keeps_the_most_recent_turns() {
        let mut transcript = Transcript::new();
        for i in 0..5 {
            transcript.append_question(format!("q{}", i));
        }

        let snapshot = transcript_snapshot(&transcript, 2);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0]["question"], "q3");
        assert_eq!(snapshot[1]["question"], "q4");
    }

    #[test]
    fn snapshot_of_short_transcript_is_complete() {
        let mut transcript = Transcript::new();
        transcript.append_question("only");
        let snapshot = transcript_snapshot(&transcript, 100);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0]["answer"], Value::Null);
    }
}
