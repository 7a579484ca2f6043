//! Content Renderer
//!
//! Pure dispatch from a revealed payload to a display representation or a
//! download trigger. Given the same payload this always chooses the same
//! rendering path; there is no hidden state, which is what makes it
//! testable without a display surface.

use crate::error::{AppError, Result};
use crate::models::{MessageType, RevealPayload, RevealedContent};
use base64::Engine;

/// What a revealed payload becomes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendering {
    /// HTML-escaped text, safe to place into markup
    Text { html: String },
    /// Inline-displayable image as a base64 data URI
    Image { data_uri: String },
    /// Placeholder acknowledgment; the actual bytes arrive out of band
    Download {
        message_id: String,
        note: String,
    },
}

/// Render a revealed payload
///
/// Text and any non-binary content take the escaped-text path; unrecognized
/// types fall back to it as well. Images become inline data URIs. Documents
/// never render inline; they produce a download trigger.
pub fn render(message_id: &str, payload: &RevealPayload) -> Result<Rendering> {
    match (payload.message_type, &payload.content) {
        (MessageType::Document, _) => Ok(Rendering::Download {
            message_id: message_id.to_string(),
            note: "Your document is ready. Download started automatically.".to_string(),
        }),
        (MessageType::Image, RevealedContent::Binary(bytes)) => Ok(Rendering::Image {
            data_uri: format!(
                "data:image/png;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(bytes)
            ),
        }),
        // An image the server sent as plain text still has to display.
        (MessageType::Image, RevealedContent::Text(text)) => Ok(Rendering::Image {
            data_uri: format!("data:image/png;base64,{}", text.trim()),
        }),
        (_, content) => {
            let text = content_as_text(content)?;
            Ok(Rendering::Text {
                html: escape_html(&text),
            })
        }
    }
}

fn content_as_text(content: &RevealedContent) -> Result<String> {
    match content {
        RevealedContent::Text(text) => Ok(text.clone()),
        RevealedContent::Binary(bytes) => String::from_utf8(bytes.clone())
            .map_err(|e| AppError::Decode(format!("payload is not valid UTF-8: {e}"))),
    }
}

/// Escape message content before it is placed into markup
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(message_type: MessageType, content: RevealedContent) -> RevealPayload {
        RevealPayload {
            message_type,
            content,
        }
    }

    #[test]
    fn test_text_renders_escaped() {
        let rendering = render(
            "m1",
            &payload(
                MessageType::Text,
                RevealedContent::Text("<b>hi</b> & 'bye'".to_string()),
            ),
        )
        .unwrap();
        assert_eq!(
            rendering,
            Rendering::Text {
                html: "&lt;b&gt;hi&lt;/b&gt; &amp; &#39;bye&#39;".to_string()
            }
        );
    }

    #[test]
    fn test_image_renders_inline_data_uri() {
        let rendering = render(
            "m1",
            &payload(MessageType::Image, RevealedContent::Binary(vec![1, 2, 3])),
        )
        .unwrap();
        assert_eq!(
            rendering,
            Rendering::Image {
                data_uri: "data:image/png;base64,AQID".to_string()
            }
        );
    }

    #[test]
    fn test_document_triggers_download_without_inline_content() {
        let rendering = render(
            "m42",
            &payload(
                MessageType::Document,
                RevealedContent::Binary(vec![0xde, 0xad]),
            ),
        )
        .unwrap();
        match rendering {
            Rendering::Download { message_id, note } => {
                assert_eq!(message_id, "m42");
                assert!(note.contains("Download started"));
            }
            other => panic!("expected download trigger, got {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_type_falls_back_to_text() {
        let rendering = render(
            "m1",
            &payload(MessageType::Other, RevealedContent::Text("plain".to_string())),
        )
        .unwrap();
        assert_eq!(
            rendering,
            Rendering::Text {
                html: "plain".to_string()
            }
        );
    }

    #[test]
    fn test_non_utf8_binary_on_text_path_is_a_decode_error() {
        let err = render(
            "m1",
            &payload(MessageType::Other, RevealedContent::Binary(vec![0xff, 0xfe])),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let p = payload(MessageType::Text, RevealedContent::Text("same".to_string()));
        assert_eq!(render("m1", &p).unwrap(), render("m1", &p).unwrap());
    }
}
