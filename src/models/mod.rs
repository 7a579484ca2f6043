use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Message payload type enumeration
///
/// Closed set; unrecognized wire values collapse into `Other`, which renders
/// through the text path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum MessageType {
    /// Plain UTF-8 text
    Text,
    /// Inline-displayable image
    Image,
    /// File delivered via download, no inline preview
    Document,
    /// Anything the server reports that we do not recognize
    Other,
}

impl From<String> for MessageType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text" => MessageType::Text,
            "image" => MessageType::Image,
            "document" => MessageType::Document,
            _ => MessageType::Other,
        }
    }
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Document => "document",
            MessageType::Other => "other",
        }
    }
}

/// Lifecycle state of a message
///
/// Advances forward only: `locked -> unlocked -> revealing -> revealed`, or
/// `* -> deleting -> deleted`. A failed reveal returns to `unlocked`, a
/// failed delete restores the prior status; neither is a backward move along
/// the happy path since `revealing`/`deleting` are in-flight markers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Unlock time not yet reached
    Locked,
    /// Countdown expired, content not yet fetched
    Unlocked,
    /// Reveal request in flight
    Revealing,
    /// Content fetched and stored
    Revealed,
    /// Delete request in flight
    Deleting,
    /// Removed from the live set
    Deleted,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Locked => "locked",
            MessageStatus::Unlocked => "unlocked",
            MessageStatus::Revealing => "revealing",
            MessageStatus::Revealed => "revealed",
            MessageStatus::Deleting => "deleting",
            MessageStatus::Deleted => "deleted",
        }
    }

    /// A terminal status accepts no further reveal or delete requests
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Revealed | MessageStatus::Deleted)
    }
}

/// Outstanding network operation for a message id
///
/// At most one of these exists per id at any time; it is the guard that
/// serializes reveal and delete requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PendingOperation {
    Reveal,
    Delete,
}

/// Revealed message content, tagged text or raw bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealedContent {
    Text(String),
    Binary(Vec<u8>),
}

impl RevealedContent {
    pub fn is_binary(&self) -> bool {
        matches!(self, RevealedContent::Binary(_))
    }

    pub fn len(&self) -> usize {
        match self {
            RevealedContent::Text(text) => text.len(),
            RevealedContent::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded gateway reveal response
///
/// The server is authoritative for the payload type; it may override the
/// type the client knew at tracking time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealPayload {
    pub message_type: MessageType,
    pub content: RevealedContent,
}

/// Raw bytes fetched from the download endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// A tracked time-locked message
///
/// The single source of truth for lifecycle state; rendering is a projection
/// of this record, never a source of state.
#[derive(Debug, Clone)]
pub struct Message {
    /// Opaque server-issued id, stable for the session
    pub id: String,
    /// Absolute unlock instant, immutable after creation
    pub unlock_time: DateTime<Utc>,
    pub message_type: MessageType,
    pub status: MessageStatus,
    /// Present only once revealed; immutable for the session afterwards
    pub content: Option<RevealedContent>,
    pub pending_operation: Option<PendingOperation>,
}

impl Message {
    pub fn new(id: impl Into<String>, unlock_time: DateTime<Utc>, message_type: MessageType) -> Self {
        Self {
            id: id.into(),
            unlock_time,
            message_type,
            status: MessageStatus::Locked,
            content: None,
            pending_operation: None,
        }
    }
}

/// Aggregate counts over the live message set
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct MessageStats {
    pub total: usize,
    pub locked: usize,
    pub unlocked: usize,
    pub revealed: usize,
}

/// One entry of the message listing endpoint
///
/// Shape of `GET /api/messages`: epoch-second timestamps, ids that may come
/// back as JSON integers or strings depending on the server's storage.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageSummary {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub message_type: MessageType,
    /// Unlock instant as epoch seconds
    pub unlock_time: i64,
    /// Creation instant as epoch seconds
    #[serde(default)]
    pub created_time: Option<i64>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub is_revealed: bool,
    #[serde(default)]
    pub can_reveal: bool,
}

impl MessageSummary {
    /// Build the in-memory record this summary describes
    ///
    /// The server already knows whether the message is past its unlock time
    /// (`can_reveal`), so the snapshot status trusts it over the local clock.
    pub fn into_message(self) -> Message {
        let status = if self.is_revealed {
            MessageStatus::Revealed
        } else if self.can_reveal {
            MessageStatus::Unlocked
        } else {
            MessageStatus::Locked
        };

        Message {
            id: self.id,
            unlock_time: Utc
                .timestamp_opt(self.unlock_time, 0)
                .single()
                .unwrap_or_else(Utc::now),
            message_type: self.message_type,
            status,
            content: None,
            pending_operation: None,
        }
    }
}

/// Accept a message id serialized as either a JSON integer or a string
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Num(i64),
        Str(String),
    }

    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Num(n) => n.to_string(),
        IdRepr::Str(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_wire_names() {
        let types = vec![
            MessageType::Text,
            MessageType::Image,
            MessageType::Document,
            MessageType::Other,
        ];

        for message_type in types {
            let json = serde_json::to_string(&message_type).unwrap();
            assert_eq!(json, format!("\"{}\"", message_type.as_str()));
            let deserialized: MessageType = serde_json::from_str(&json).unwrap();
            assert_eq!(message_type, deserialized);
        }
    }

    #[test]
    fn test_unknown_message_type_falls_back_to_other() {
        let deserialized: MessageType = serde_json::from_str("\"spreadsheet\"").unwrap();
        assert_eq!(deserialized, MessageType::Other);
    }

    #[test]
    fn test_message_status_wire_names() {
        let statuses = vec![
            MessageStatus::Locked,
            MessageStatus::Unlocked,
            MessageStatus::Revealing,
            MessageStatus::Revealed,
            MessageStatus::Deleting,
            MessageStatus::Deleted,
        ];

        for status in statuses {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let deserialized: MessageStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(status, deserialized);
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(MessageStatus::Revealed.is_terminal());
        assert!(MessageStatus::Deleted.is_terminal());
        assert!(!MessageStatus::Locked.is_terminal());
        assert!(!MessageStatus::Revealing.is_terminal());
        assert!(!MessageStatus::Deleting.is_terminal());
    }

    #[test]
    fn test_summary_id_accepts_integer_or_string() {
        let numeric: MessageSummary = serde_json::from_str(
            r#"{"id": 42, "message_type": "text", "unlock_time": 1700000000}"#,
        )
        .unwrap();
        assert_eq!(numeric.id, "42");

        let string: MessageSummary = serde_json::from_str(
            r#"{"id": "msg-7", "message_type": "image", "unlock_time": 1700000000}"#,
        )
        .unwrap();
        assert_eq!(string.id, "msg-7");
    }

    #[test]
    fn test_summary_status_mapping() {
        let base = r#"{"id": 1, "message_type": "text", "unlock_time": 1700000000"#;

        let revealed: MessageSummary =
            serde_json::from_str(&format!("{}, \"is_revealed\": true}}", base)).unwrap();
        assert_eq!(revealed.into_message().status, MessageStatus::Revealed);

        let unlocked: MessageSummary =
            serde_json::from_str(&format!("{}, \"can_reveal\": true}}", base)).unwrap();
        assert_eq!(unlocked.into_message().status, MessageStatus::Unlocked);

        let locked: MessageSummary = serde_json::from_str(&format!("{}}}", base)).unwrap();
        assert_eq!(locked.into_message().status, MessageStatus::Locked);
    }

    #[test]
    fn test_revealed_content_tags() {
        assert!(!RevealedContent::Text("hi".into()).is_binary());
        assert!(RevealedContent::Binary(vec![1, 2, 3]).is_binary());
        assert_eq!(RevealedContent::Binary(vec![1, 2, 3]).len(), 3);
        assert!(RevealedContent::Text(String::new()).is_empty());
    }
}
