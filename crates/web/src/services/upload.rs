//! Image uploads to the public storage bucket.
//!
//! A batch is validated as a whole before the first byte is sent: one bad
//! file rejects the batch and nothing is uploaded. Valid batches upload in
//! order, one file at a time, so a failure part way leaves the earlier
//! files uploaded and reports where it stopped.

use std::sync::Arc;

use chrono::Utc;
use rand::seq::IndexedRandom;
use thiserror::Error;
use tracing::instrument;

use crate::supabase::{Caller, ObjectStorage, StoreError};

/// MIME types accepted for upload.
pub const ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Folder used when a form names none.
pub const DEFAULT_FOLDER: &str = "uploads";

/// Largest accepted file, in bytes (5 MiB).
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Most files accepted in one batch.
pub const MAX_BATCH_FILES: usize = 10;

const KEY_SUFFIX_LEN: usize = 7;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Upload failures.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{name}: unsupported file type {content_type}")]
    UnsupportedType { name: String, content_type: String },

    #[error("{name}: file exceeds the 5MB limit")]
    TooLarge { name: String, size: usize },

    #[error("no files selected")]
    Empty,

    #[error("{count} files selected; at most {} per upload", MAX_BATCH_FILES)]
    TooMany { count: usize },

    #[error("upload failed: {0}")]
    Store(#[from] StoreError),
}

impl UploadError {
    /// Message shown in the error toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedType { name, .. } => {
                format!("{name} is not a supported image. Use JPEG, PNG, WebP or GIF.")
            }
            Self::TooLarge { name, .. } => format!("{name} is larger than 5MB."),
            Self::Empty => "Please choose at least one image.".to_string(),
            Self::TooMany { .. } => {
                format!("Please upload at most {MAX_BATCH_FILES} images at a time.")
            }
            Self::Store(StoreError::Unauthorized | StoreError::Forbidden(_)) => {
                "You do not have permission to upload images.".to_string()
            }
            Self::Store(_) => "Upload failed. Please try again.".to_string(),
        }
    }
}

/// One file taken from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Check type and size.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::UnsupportedType`] or [`UploadError::TooLarge`].
    pub fn validate(&self) -> Result<(), UploadError> {
        if !ALLOWED_TYPES.contains(&self.content_type.as_str()) {
            return Err(UploadError::UnsupportedType {
                name: self.name.clone(),
                content_type: self.content_type.clone(),
            });
        }
        if self.bytes.len() > MAX_FILE_SIZE {
            return Err(UploadError::TooLarge {
                name: self.name.clone(),
                size: self.bytes.len(),
            });
        }
        Ok(())
    }

    /// File extension from the name, falling back to the MIME subtype.
    #[must_use]
    pub fn extension(&self) -> String {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .or_else(|| self.content_type.split_once('/').map(|(_, sub)| sub))
            .unwrap_or("bin")
            .to_ascii_lowercase()
    }
}

/// How a batch finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Every file uploaded; public URLs in input order.
    Complete(Vec<String>),
    /// Files before `failed_at` uploaded; the rest were not attempted.
    Partial {
        uploaded: Vec<String>,
        failed_at: usize,
        error: String,
    },
}

impl UploadOutcome {
    /// URLs that were uploaded, complete or not.
    #[must_use]
    pub fn urls(&self) -> &[String] {
        match self {
            Self::Complete(urls) | Self::Partial { uploaded: urls, .. } => urls,
        }
    }
}

/// Uploads images into one bucket under per-screen folders.
#[derive(Clone)]
pub struct ImageUploader {
    storage: Arc<dyn ObjectStorage>,
    bucket: String,
}

impl std::fmt::Debug for ImageUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUploader")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl ImageUploader {
    #[must_use]
    pub fn new(storage: Arc<dyn ObjectStorage>, bucket: impl Into<String>) -> Self {
        Self {
            storage,
            bucket: bucket.into(),
        }
    }

    /// Validate the whole batch, then upload each file in order.
    ///
    /// # Errors
    ///
    /// Returns a validation error, with nothing uploaded, if any file is
    /// rejected. Backend failures after validation are reported through
    /// [`UploadOutcome::Partial`] instead, or as [`UploadError::Store`] when
    /// the first file fails.
    #[instrument(skip(self, caller, files), fields(bucket = %self.bucket, count = files.len()))]
    pub async fn upload_batch(
        &self,
        caller: &Caller,
        folder: &str,
        files: Vec<UploadFile>,
    ) -> Result<UploadOutcome, UploadError> {
        if files.is_empty() {
            return Err(UploadError::Empty);
        }
        if files.len() > MAX_BATCH_FILES {
            return Err(UploadError::TooMany { count: files.len() });
        }
        for file in &files {
            file.validate()?;
        }

        let mut uploaded = Vec::with_capacity(files.len());
        for (index, file) in files.into_iter().enumerate() {
            let key = object_key(folder, &file.extension());
            match self
                .storage
                .upload(caller, &self.bucket, &key, file.bytes, &file.content_type)
                .await
            {
                Ok(()) => uploaded.push(self.storage.public_url(&self.bucket, &key)),
                Err(e) if index == 0 => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(error = %e, failed_at = index, "Upload batch stopped");
                    return Ok(UploadOutcome::Partial {
                        uploaded,
                        failed_at: index,
                        error: UploadError::from(e).user_message(),
                    });
                }
            }
        }

        tracing::info!(count = uploaded.len(), "Uploaded images");
        Ok(UploadOutcome::Complete(uploaded))
    }
}

/// `{folder}/{unix_millis}-{random}.{ext}`
fn object_key(folder: &str, ext: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..KEY_SUFFIX_LEN)
        .filter_map(|_| BASE36.choose(&mut rng).copied().map(char::from))
        .collect();
    let folder = folder.trim_matches('/');
    format!("{folder}/{}-{suffix}.{ext}", Utc::now().timestamp_millis())
}

/// An image-holding form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageField {
    /// A single image; a new upload replaces it.
    Single(Option<String>),
    /// An ordered gallery; uploads append.
    Multiple(Vec<String>),
}

impl ImageField {
    /// Fold freshly uploaded URLs into the field.
    pub fn apply(&mut self, urls: &[String]) {
        match self {
            Self::Single(current) => {
                if let Some(last) = urls.last() {
                    *current = Some(last.clone());
                }
            }
            Self::Multiple(list) => list.extend(urls.iter().cloned()),
        }
    }

    /// Remove a URL from the field. The stored object is left in the bucket.
    pub fn remove(&mut self, url: &str) {
        match self {
            Self::Single(current) => {
                if current.as_deref() == Some(url) {
                    *current = None;
                }
            }
            Self::Multiple(list) => list.retain(|u| u != url),
        }
    }

    /// The field's URLs in order.
    #[must_use]
    pub fn into_urls(self) -> Vec<String> {
        match self {
            Self::Single(current) => current.into_iter().collect(),
            Self::Multiple(list) => list,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use siddha_clinic_core::AppRole;

    use super::*;
    use crate::supabase::{IdentityProvider, MemoryBackend, Operation};

    fn png(name: &str, size: usize) -> UploadFile {
        UploadFile {
            name: name.to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0; size],
        }
    }

    async fn admin(backend: &MemoryBackend) -> Caller {
        let id = backend.create_user("admin@clinic.in", "admin-pass").unwrap();
        backend.grant_role(id, AppRole::Admin).unwrap();
        let session = backend
            .sign_in_with_password("admin@clinic.in", "admin-pass")
            .await
            .unwrap();
        Caller::user(&session.access_token)
    }

    #[test]
    fn test_validate() {
        assert!(png("a.png", 10).validate().is_ok());
        assert!(png("a.png", MAX_FILE_SIZE).validate().is_ok());
        assert!(matches!(
            png("a.png", MAX_FILE_SIZE + 1).validate(),
            Err(UploadError::TooLarge { .. })
        ));
        let pdf = UploadFile {
            name: "a.pdf".into(),
            content_type: "application/pdf".into(),
            bytes: vec![1],
        };
        assert!(matches!(pdf.validate(), Err(UploadError::UnsupportedType { .. })));
    }

    #[test]
    fn test_extension() {
        assert_eq!(png("Photo.PNG", 1).extension(), "png");
        assert_eq!(png("photo", 1).extension(), "png");
        let webp = UploadFile {
            name: "x.".into(),
            content_type: "image/webp".into(),
            bytes: vec![],
        };
        assert_eq!(webp.extension(), "webp");
    }

    #[test]
    fn test_object_key_shape() {
        let key = object_key("/medicines/", "jpg");
        let (folder, file) = key.split_once('/').unwrap();
        assert_eq!(folder, "medicines");
        let (stamp, rest) = file.split_once('-').unwrap();
        assert!(stamp.parse::<i64>().is_ok());
        assert_eq!(rest.len(), KEY_SUFFIX_LEN + ".jpg".len());
        assert!(rest.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_invalid_file_rejects_whole_batch() {
        let backend = MemoryBackend::new();
        let caller = admin(&backend).await;
        let uploader = ImageUploader::new(Arc::new(backend.clone()), "images");

        let files = vec![png("a.png", 10), png("b.png", MAX_FILE_SIZE + 1)];
        let err = uploader.upload_batch(&caller, "medicines", files).await.unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { .. }));
        assert_eq!(backend.calls(Operation::Upload), 0);
        assert_eq!(backend.object_count("images"), 0);
    }

    #[tokio::test]
    async fn test_oversized_batch_uploads_nothing() {
        let backend = MemoryBackend::new();
        let caller = admin(&backend).await;
        let uploader = ImageUploader::new(Arc::new(backend.clone()), "images");

        let files = (0..=MAX_BATCH_FILES)
            .map(|i| png(&format!("{i}.png"), 10))
            .collect();
        let err = uploader.upload_batch(&caller, "medicines", files).await.unwrap_err();
        assert!(matches!(err, UploadError::TooMany { count } if count == MAX_BATCH_FILES + 1));
        assert_eq!(backend.calls(Operation::Upload), 0);
    }

    #[tokio::test]
    async fn test_batch_returns_urls_in_order() {
        let backend = MemoryBackend::new();
        let caller = admin(&backend).await;
        let uploader = ImageUploader::new(Arc::new(backend.clone()), "images");

        let outcome = uploader
            .upload_batch(&caller, "medicines", vec![png("a.png", 3), png("b.png", 5)])
            .await
            .unwrap();
        let urls = outcome.urls();
        assert_eq!(urls.len(), 2);
        assert!(urls.iter().all(|u| {
            u.starts_with("http://memory.local/storage/v1/object/public/images/medicines/")
        }));
        assert!(matches!(outcome, UploadOutcome::Complete(_)));
        assert_eq!(backend.object_count("images"), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_earlier_uploads() {
        let backend = MemoryBackend::new();
        let caller = admin(&backend).await;
        let uploader = ImageUploader::new(Arc::new(backend.clone()), "images");
        backend.fail_after(Operation::Upload, 1);

        let outcome = uploader
            .upload_batch(
                &caller,
                "medicines",
                vec![png("a.png", 1), png("b.png", 1), png("c.png", 1)],
            )
            .await
            .unwrap();
        match outcome {
            UploadOutcome::Partial {
                uploaded,
                failed_at,
                ..
            } => {
                assert_eq!(uploaded.len(), 1);
                assert_eq!(failed_at, 1);
            }
            UploadOutcome::Complete(_) => panic!("expected partial upload"),
        }
        assert_eq!(backend.object_count("images"), 1);
    }

    #[tokio::test]
    async fn test_anonymous_upload_is_refused() {
        let backend = MemoryBackend::new();
        let uploader = ImageUploader::new(Arc::new(backend.clone()), "images");
        let err = uploader
            .upload_batch(&Caller::Anonymous, "profile", vec![png("a.png", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Store(StoreError::Unauthorized)));
    }

    #[test]
    fn test_image_field() {
        let mut single = ImageField::Single(Some("old".into()));
        single.apply(&["a".into(), "b".into()]);
        assert_eq!(single, ImageField::Single(Some("b".into())));
        single.remove("b");
        assert_eq!(single, ImageField::Single(None));

        let mut gallery = ImageField::Multiple(vec!["a".into()]);
        gallery.apply(&["b".into(), "c".into()]);
        gallery.remove("a");
        assert_eq!(gallery, ImageField::Multiple(vec!["b".into(), "c".into()]));
    }
}
