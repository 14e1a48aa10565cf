use serde::Deserialize;

pub const WS_APP_PROTOCOL: &str = "ragdocs.v1";

/// Message shape the chat UI sends over the WebSocket.
///
/// Both the send button and the input-submit event produce the same
/// `{"type": "chat"}` message; a missing type is treated as `chat`.
#[derive(Debug, Deserialize, Default)]
pub struct WsIncomingMessage {
    #[serde(rename = "type")]
    pub msg_type: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat_message() {
        let incoming: WsIncomingMessage = serde_json::from_str(
            r#"{"type": "chat", "message": "How do I install it?", "sessionId": "abc"}"#,
        )
        .expect("parse");
        assert_eq!(incoming.msg_type.as_deref(), Some("chat"));
        assert_eq!(incoming.message.as_deref(), Some("How do I install it?"));
        assert_eq!(incoming.session_id.as_deref(), Some("abc"));
    }

    #[test]
    fn missing_fields_default_to_none() {
        let incoming: WsIncomingMessage =
            serde_json::from_str(r#"{"message": "hi"}"#).expect("parse");
        assert!(incoming.msg_type.is_none());
        assert!(incoming.session_id.is_none());
    }
}
