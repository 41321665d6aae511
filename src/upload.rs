//! Local file upload into the asset system.
//!
//! Uploads are a two-step sequence: ensure the target folder exists, then
//! send the bytes as multipart form data. The file is read before any
//! network traffic so a missing path never creates a folder.

use std::path::Path;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::client::ClientInner;
use crate::errors::{ApiError, Error, Result};

/// Folder used when the caller does not pick one.
pub const DEFAULT_TARGET_FOLDER: &str = "upload";

/// Server-assigned record for an uploaded asset. Only the addressable
/// fields are modeled; the rest of the payload rides along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedAsset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Sub-client for asset uploads.
pub struct AssetsClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl AssetsClient {
    /// Upload a local file into `target_folder`, creating the folder when
    /// needed. The returned record carries the URL usable as a deployment
    /// input.
    pub async fn upload(&self, local_path: &str, target_folder: &str) -> Result<UploadedAsset> {
        let bytes = tokio::fs::read(local_path).await?;
        let file_name = Path::new(local_path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        let content_type = content_type_for(local_path);

        self.ensure_folder(target_folder).await?;

        tracing::debug!(file = %file_name, folder = %target_folder, "uploading asset");
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type)
            .map_err(|err| Error::Config(format!("invalid content type: {err}")))?;
        let form = Form::new().part("file", part);
        let request = self
            .inner
            .request(Method::POST, "file/upload")?
            .multipart(form);

        let raw: Value = self.inner.execute_json(request).await?;
        serde_json::from_value(raw).map_err(Error::Serialization)
    }

    /// Create the target folder at the root. A rejection that only says the
    /// folder is already there counts as success; any other failure aborts
    /// the upload.
    async fn ensure_folder(&self, name: &str) -> Result<()> {
        let request = self
            .inner
            .request(Method::POST, "assets/folder")?
            .json(&json!({ "name": name, "parent_path": "/" }));
        match self.inner.send(request).await {
            Ok(_) => Ok(()),
            Err(Error::Api(api)) if is_folder_exists_error(&api) => {
                tracing::warn!(folder = %name, "upload folder already exists, continuing");
                Ok(())
            }
            Err(err) => Err(Error::UploadFolder(Box::new(err))),
        }
    }
}

// Only the exact folder-conflict phrase is tolerated; other conflict
// rejections (including the generic 409 message) must abort the upload.
fn is_folder_exists_error(err: &ApiError) -> bool {
    err.message.contains("Folder already exists")
        || err
            .raw_body
            .as_deref()
            .is_some_and(|body| body.contains("Folder already exists"))
}

/// Content type inferred from the file extension, matched without regard
/// to case. Unknown extensions fall back to the generic byte stream type.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_cover_known_extensions() {
        assert_eq!(content_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("/tmp/out.png"), "image/png");
        assert_eq!(content_type_for("clip.mov"), "video/quicktime");
        assert_eq!(content_type_for("doc.pdf"), "application/pdf");
        assert_eq!(content_type_for("notes.txt"), "text/plain");
        assert_eq!(content_type_for("payload.json"), "application/json");
    }

    #[test]
    fn unknown_extensions_fall_back_to_octet_stream() {
        assert_eq!(content_type_for("archive.tar.zst"), "application/octet-stream");
        assert_eq!(content_type_for("no_extension"), "application/octet-stream");
    }

    #[test]
    fn folder_exists_rejections_are_tolerated() {
        let exists = ApiError {
            status: 400,
            message: "Folder already exists".into(),
            shape: None,
            raw_body: Some("{\"detail\":\"Folder already exists\"}".into()),
        };
        assert!(is_folder_exists_error(&exists));

        let other = ApiError {
            status: 500,
            message: "Internal Server Error".into(),
            shape: None,
            raw_body: None,
        };
        assert!(!is_folder_exists_error(&other));

        // A different resource's conflict is not a folder conflict.
        let foreign = ApiError {
            status: 400,
            message: "An asset with this name already exists".into(),
            shape: None,
            raw_body: Some("{\"detail\":\"An asset with this name already exists\"}".into()),
        };
        assert!(!is_folder_exists_error(&foreign));

        let generic_conflict = ApiError {
            status: 409,
            message: "This resource already exists.".into(),
            shape: None,
            raw_body: None,
        };
        assert!(!is_folder_exists_error(&generic_conflict));
    }

    #[test]
    fn uploaded_asset_keeps_unmodeled_fields() {
        let raw = serde_json::json!({
            "id": "asset_1",
            "file_url": "https://cdn.example.com/upload/photo.png",
            "size": 1024
        });
        let asset: UploadedAsset = serde_json::from_value(raw).unwrap();
        assert_eq!(asset.file_url.as_deref(), Some("https://cdn.example.com/upload/photo.png"));
        assert_eq!(asset.extra.get("size"), Some(&serde_json::json!(1024)));
    }
}
