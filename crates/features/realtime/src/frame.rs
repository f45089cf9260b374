//! JSON wire frames: `{ "type": "...", "payload": { ... } }`.

use crate::error::RealtimeError;
use bazaar_domain::model::Message;
use bazaar_domain::realtime::{NotificationPayload, Presence, ReadReceipt, TypingIndicator};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames the client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum OutboundFrame {
    SendMessage { conversation_id: String, message: String },
    MarkAsRead { message_id: String },
    Typing { conversation_id: String, is_typing: bool },
}

impl OutboundFrame {
    /// Encodes the frame as a JSON text frame.
    ///
    /// # Errors
    /// Returns [`RealtimeError::Serialization`] if encoding fails.
    pub fn encode(&self) -> Result<String, RealtimeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire name of the frame, for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SendMessage { .. } => "SEND_MESSAGE",
            Self::MarkAsRead { .. } => "MARK_AS_READ",
            Self::Typing { .. } => "TYPING",
        }
    }
}

/// Frames the server pushes.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    NewMessage(Message),
    MessageRead(ReadReceipt),
    UserTyping(TypingIndicator),
    UserOnline(Presence),
    UserOffline(Presence),
    Notification(NotificationPayload),
    /// A `type` this client does not know. Carries the wire name.
    Unknown(String),
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl InboundFrame {
    /// Decodes a text frame.
    ///
    /// Unknown types decode successfully as [`InboundFrame::Unknown`]; their payload is not inspected.
    ///
    /// # Errors
    /// Returns [`RealtimeError::Frame`] for invalid JSON, a missing `type`, or a payload
    /// that does not match the type.
    pub fn decode(text: &str) -> Result<Self, RealtimeError> {
        let raw: RawFrame = serde_json::from_str(text).map_err(|e| RealtimeError::Frame {
            message: e.to_string().into(),
            context: Some("Frame envelope".into()),
        })?;

        let frame = match raw.kind.as_str() {
            "NEW_MESSAGE" => Self::NewMessage(payload(&raw)?),
            "MESSAGE_READ" => Self::MessageRead(payload(&raw)?),
            "USER_TYPING" => Self::UserTyping(payload(&raw)?),
            "USER_ONLINE" => Self::UserOnline(payload(&raw)?),
            "USER_OFFLINE" => Self::UserOffline(payload(&raw)?),
            "NOTIFICATION" => Self::Notification(payload(&raw)?),
            _ => Self::Unknown(raw.kind),
        };
        Ok(frame)
    }
}

fn payload<T: DeserializeOwned>(raw: &RawFrame) -> Result<T, RealtimeError> {
    T::deserialize(&raw.payload).map_err(|e| RealtimeError::Frame {
        message: e.to_string().into(),
        context: Some(format!("{} payload", raw.kind).into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outbound_frames_match_the_wire_shape() {
        let send = OutboundFrame::SendMessage { conversation_id: "c-1".into(), message: "hi".into() };
        let typing = OutboundFrame::Typing { conversation_id: "c-1".into(), is_typing: true };
        let read = OutboundFrame::MarkAsRead { message_id: "m-7".into() };

        let as_json = |f: &OutboundFrame| serde_json::from_str::<Value>(&f.encode().unwrap()).unwrap();

        assert_eq!(
            as_json(&send),
            json!({ "type": "SEND_MESSAGE", "payload": { "conversationId": "c-1", "message": "hi" } })
        );
        assert_eq!(
            as_json(&typing),
            json!({ "type": "TYPING", "payload": { "conversationId": "c-1", "isTyping": true } })
        );
        assert_eq!(as_json(&read), json!({ "type": "MARK_AS_READ", "payload": { "messageId": "m-7" } }));
        assert_eq!(read.kind(), "MARK_AS_READ");
    }

    #[test]
    fn decodes_known_inbound_types() {
        let text = json!({
            "type": "NEW_MESSAGE",
            "payload": { "id": "m-1", "conversationId": "c-1", "senderId": "u-2", "content": "Hello" }
        })
        .to_string();

        let InboundFrame::NewMessage(message) = InboundFrame::decode(&text).unwrap() else {
            panic!("expected a new message");
        };
        assert_eq!(message.content, "Hello");

        let online = json!({ "type": "USER_ONLINE", "payload": { "userId": "u-2" } }).to_string();
        assert_eq!(
            InboundFrame::decode(&online).unwrap(),
            InboundFrame::UserOnline(Presence { user_id: "u-2".into(), last_seen: None })
        );
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        let text = json!({ "type": "AUCTION_ENDED", "payload": [1, 2, 3] }).to_string();
        assert_eq!(InboundFrame::decode(&text).unwrap(), InboundFrame::Unknown("AUCTION_ENDED".into()));
    }

    #[test]
    fn malformed_frames_are_rejected() {
        for text in [
            "not json",
            r#"{"payload":{}}"#,
            r#"{"type":"USER_TYPING","payload":{"isTyping":true}}"#,
            r#"{"type":"NEW_MESSAGE"}"#,
        ] {
            let err = InboundFrame::decode(text).expect_err(text);
            assert!(matches!(err, RealtimeError::Frame { .. }), "{text}: {err}");
        }
    }
}
