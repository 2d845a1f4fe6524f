//! On-disk storage for attachment files.
//!
//! Uploads arrive base64-encoded inside JSON bodies. Each file is written
//! to the upload directory as `<uuid>-<sanitised name>` and exposed under
//! [`ATTACHMENT_URL_PREFIX`].

use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use knowspace_core::model::NewAttachment;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// URL path under which stored attachments are served.
pub const ATTACHMENT_URL_PREFIX: &str = "/user-attachments";

/// One uploaded file: `{ "fileName": "...", "content": "<base64>" }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBody {
  pub file_name: String,
  pub content:   String,
}

#[derive(Debug, Clone)]
pub struct FileStorage {
  dir:        PathBuf,
  url_prefix: String,
}

impl FileStorage {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into(), url_prefix: ATTACHMENT_URL_PREFIX.to_owned() }
  }

  pub fn dir(&self) -> &Path { &self.dir }

  /// Decode and write `upload`; returns the metadata to persist.
  pub async fn save(&self, upload: &UploadBody) -> Result<NewAttachment, ApiError> {
    let bytes = B64.decode(upload.content.trim()).map_err(|_| {
      ApiError::BadRequest(format!("content of {} is not valid base64", upload.file_name))
    })?;

    let name = sanitize_file_name(&upload.file_name);
    let stored = format!("{}-{name}", Uuid::new_v4().simple());

    tokio::fs::create_dir_all(&self.dir).await?;
    tokio::fs::write(self.dir.join(&stored), &bytes).await?;
    tracing::debug!(file = %stored, size = bytes.len(), "stored attachment");

    Ok(NewAttachment {
      file_type: extension_of(&name),
      file_name: upload.file_name.clone(),
      file_path: format!("{}/{stored}", self.url_prefix),
      file_size: bytes.len() as i64,
    })
  }

  /// Write every upload; on failure, files already written are removed.
  pub async fn save_all(&self, uploads: &[UploadBody]) -> Result<Vec<NewAttachment>, ApiError> {
    let mut saved = Vec::with_capacity(uploads.len());
    for upload in uploads {
      match self.save(upload).await {
        Ok(attachment) => saved.push(attachment),
        Err(e) => {
          self.remove_all(saved.into_iter().map(|a| a.file_path)).await;
          return Err(e);
        }
      }
    }
    Ok(saved)
  }

  /// Delete the file behind a public `file_path`. A missing file is not an
  /// error.
  pub async fn remove(&self, file_path: &str) -> Result<(), ApiError> {
    let Some(stored) = file_path.rsplit('/').next().filter(|s| !s.is_empty()) else {
      return Ok(());
    };
    match tokio::fs::remove_file(self.dir.join(stored)).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        tracing::warn!(file = %stored, "attachment file already gone");
        Ok(())
      }
      Err(e) => Err(e.into()),
    }
  }

  /// Best-effort removal; failures are logged.
  pub async fn remove_all(&self, file_paths: impl IntoIterator<Item = String>) {
    for path in file_paths {
      if let Err(e) = self.remove(&path).await {
        tracing::warn!(error = %e, file = %path, "failed to remove attachment file");
      }
    }
  }
}

/// Keep the last path component, replacing anything outside
/// `[A-Za-z0-9._-]` with `_`.
fn sanitize_file_name(name: &str) -> String {
  let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
  let clean: String = base
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' }
    })
    .collect();
  let clean = clean.trim_start_matches('.');
  if clean.is_empty() { "file".to_owned() } else { clean.to_owned() }
}

/// `.png` for `shot.png`; empty when there is no extension.
fn extension_of(name: &str) -> String {
  Path::new(name)
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| format!(".{e}"))
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn temp_storage() -> FileStorage {
    FileStorage::new(std::env::temp_dir().join(format!("knowspace-{}", Uuid::new_v4())))
  }

  #[test]
  fn sanitises_paths_and_odd_characters() {
    assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
    assert_eq!(sanitize_file_name("C:\\temp\\log file.txt"), "log_file.txt");
    assert_eq!(sanitize_file_name(".hidden"), "hidden");
    assert_eq!(sanitize_file_name(""), "file");
  }

  #[test]
  fn extension_keeps_the_dot() {
    assert_eq!(extension_of("shot.png"), ".png");
    assert_eq!(extension_of("README"), "");
  }

  #[tokio::test]
  async fn save_then_remove() {
    let files = temp_storage();
    let upload = UploadBody { file_name: "notes.txt".into(), content: B64.encode("hello") };

    let saved = files.save(&upload).await.unwrap();
    assert_eq!(saved.file_name, "notes.txt");
    assert_eq!(saved.file_size, 5);
    assert_eq!(saved.file_type, ".txt");
    assert!(saved.file_path.starts_with("/user-attachments/"));

    let stored = saved.file_path.rsplit('/').next().unwrap();
    let on_disk = files.dir().join(stored);
    assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), b"hello");

    files.remove(&saved.file_path).await.unwrap();
    assert!(!on_disk.exists());
    // Second removal is a no-op.
    files.remove(&saved.file_path).await.unwrap();
  }

  #[tokio::test]
  async fn failed_batch_leaves_no_files_behind() {
    let files = temp_storage();
    let uploads = [
      UploadBody { file_name: "a.txt".into(), content: B64.encode("first") },
      UploadBody { file_name: "b.txt".into(), content: "not base64!".into() },
    ];

    assert!(matches!(files.save_all(&uploads).await, Err(ApiError::BadRequest(_))));
    let mut entries = tokio::fs::read_dir(files.dir()).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
  }

  #[test]
  fn removal_future_is_send() {
    fn assert_send<T: Send>(_: &T) {}
    let files = temp_storage();
    let paths = vec!["/user-attachments/a.txt".to_owned()];
    assert_send(&files.remove_all(paths));
  }

  #[tokio::test]
  async fn rejects_invalid_base64() {
    let files = temp_storage();
    let upload = UploadBody { file_name: "x.bin".into(), content: "***".into() };
    assert!(matches!(files.save(&upload).await, Err(ApiError::BadRequest(_))));
  }
}
