//! Attachment downloads
//!
//! File naming and saving for revealed documents fetched out of band from
//! the download endpoint.

use crate::error::Result;
use crate::models::Attachment;
use std::path::{Path, PathBuf};
use tracing::info;

/// File extension for a download, chosen from the response `Content-Type`
///
/// Unknown types get no extension.
pub fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type
        .parse::<mime::Mime>()
        .map(|m| m.essence_str().to_ascii_lowercase())
        .unwrap_or_default();

    match essence.as_str() {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "application/pdf" => ".pdf",
        "text/plain" => ".txt",
        "application/zip" => ".zip",
        _ => "",
    }
}

/// Name a saved attachment after the message it came from
pub fn attachment_filename(message_id: &str, content_type: Option<&str>) -> String {
    let extension = content_type.map(extension_for).unwrap_or("");
    format!("revealed_message_{message_id}{extension}")
}

/// Write the attachment bytes into the download directory
pub async fn save_attachment(
    dir: &Path,
    message_id: &str,
    attachment: &Attachment,
) -> Result<PathBuf> {
    let path = dir.join(attachment_filename(
        message_id,
        attachment.content_type.as_deref(),
    ));
    tokio::fs::write(&path, &attachment.bytes).await?;
    info!(message_id, path = %path.display(), bytes = attachment.bytes.len(), "attachment saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_mapping() {
        assert_eq!(extension_for("image/png"), ".png");
        assert_eq!(extension_for("image/jpeg"), ".jpg");
        assert_eq!(extension_for("application/pdf"), ".pdf");
        assert_eq!(extension_for("text/plain"), ".txt");
        assert_eq!(extension_for("application/zip"), ".zip");
        assert_eq!(extension_for("application/octet-stream"), "");
    }

    #[test]
    fn test_extension_ignores_parameters_and_case() {
        assert_eq!(extension_for("text/plain; charset=utf-8"), ".txt");
        assert_eq!(extension_for("Image/PNG"), ".png");
    }

    #[test]
    fn test_attachment_filename() {
        assert_eq!(
            attachment_filename("42", Some("application/pdf")),
            "revealed_message_42.pdf"
        );
        assert_eq!(attachment_filename("42", None), "revealed_message_42");
        assert_eq!(
            attachment_filename("42", Some("application/x-unknown")),
            "revealed_message_42"
        );
    }

    #[tokio::test]
    async fn test_save_attachment_writes_bytes() {
        let dir = std::env::temp_dir();
        let attachment = Attachment {
            bytes: vec![1, 2, 3, 4],
            content_type: Some("application/pdf".to_string()),
        };

        let path = save_attachment(&dir, "save-test", &attachment).await.unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "revealed_message_save-test.pdf"
        );
        assert_eq!(tokio::fs::read(&path).await.unwrap(), vec![1, 2, 3, 4]);

        let _ = tokio::fs::remove_file(&path).await;
    }
}
