//! Request-scoped staging of uploaded files
//!
//! Each upload is written under the upload directory as
//! `<uuid>_<sanitized filename>`, so concurrent uploads of the same file
//! never share a path and decoders still see the original extension.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const FALLBACK_NAME: &str = "upload";

/// A staged upload, removed when dropped
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    removed: bool,
}

impl TempUpload {
    /// Write `bytes` to a fresh path under `dir`
    pub async fn write(dir: &Path, filename: &str, bytes: &[u8]) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let path = dir.join(format!("{}_{}", Uuid::new_v4(), sanitize_filename(filename)));
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Staged upload");

        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the staged file
    ///
    /// A file that is already gone is not an error, and a failed removal
    /// is logged rather than returned.
    pub async fn remove(mut self) {
        self.removed = true;
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!(path = %self.path.display(), "Failed to remove temp upload: {}", e);
        }
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if self.removed || !self.path.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), "Failed to remove temp upload: {}", e);
        }
    }
}

/// Reduce a client-supplied filename to a safe single path component
///
/// Directory parts are dropped, characters outside `[A-Za-z0-9._-]`
/// become underscores, and leading dots are stripped.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches(['.', '_']).trim_end_matches('_');

    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\photo.JPG"), "photo.JPG");
        assert_eq!(sanitize_filename("my holiday video.mov"), "my_holiday_video.mov");
        assert_eq!(sanitize_filename(".hidden.wav"), "hidden.wav");
        assert_eq!(sanitize_filename("..."), FALLBACK_NAME);
        assert_eq!(sanitize_filename("???"), FALLBACK_NAME);
    }

    #[tokio::test]
    async fn test_same_name_gets_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let a = TempUpload::write(dir.path(), "face.png", b"a").await.unwrap();
        let b = TempUpload::write(dir.path(), "face.png", b"b").await.unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.path().to_string_lossy().ends_with("_face.png"));
        assert_eq!(std::fs::read(b.path()).unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("uploads/nested");
        let upload = TempUpload::write(&nested, "x.wav", b"x").await.unwrap();
        assert!(upload.path().starts_with(&nested));
    }

    #[tokio::test]
    async fn test_remove_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let upload = TempUpload::write(dir.path(), "x.wav", b"x").await.unwrap();
        let path = upload.path().to_path_buf();

        upload.remove().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_remove_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let upload = TempUpload::write(dir.path(), "x.wav", b"x").await.unwrap();
        std::fs::remove_file(upload.path()).unwrap();

        upload.remove().await;
    }

    #[tokio::test]
    async fn test_drop_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let upload = TempUpload::write(dir.path(), "x.wav", b"x").await.unwrap();
        let path = upload.path().to_path_buf();

        drop(upload);
        assert!(!path.exists());
    }
}
