use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use mime::Mime;

use super::lifecycle::ValidationErrors;
use crate::config::DEFAULT_MAX_IMAGE_BYTES;

/// Image attached to a submission, as received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "png", "gif"];

fn allowed_mime(candidate: &Mime) -> bool {
    let subtype = candidate.subtype();
    candidate.type_() == mime::IMAGE
        && (subtype == mime::JPEG || subtype == mime::PNG || subtype == mime::GIF)
}

/// Size ceiling and format allow-list for submitted images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePolicy {
    pub max_bytes: usize,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl ImagePolicy {
    /// Both the extension and the declared content type must name jpeg, png, or gif.
    pub fn validate(&self, upload: &ImageUpload) -> Result<(), ValidationErrors> {
        if upload.bytes.is_empty() {
            return Err(ValidationErrors::single("image", "file is empty"));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(ValidationErrors::single(
                "image",
                format!(
                    "file too large. Maximum size is {}MB.",
                    self.max_bytes / (1024 * 1024)
                ),
            ));
        }

        let extension = Path::new(&upload.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let extension_ok = ALLOWED_EXTENSIONS.contains(&extension.as_str())
            && mime_guess::from_ext(&extension)
                .iter()
                .any(|guess| allowed_mime(&guess));

        let declared_ok = match upload.content_type.as_deref() {
            Some(raw) => raw
                .parse::<Mime>()
                .map(|declared| allowed_mime(&declared))
                .unwrap_or(false),
            None => false,
        };

        if extension_ok && declared_ok {
            Ok(())
        } else {
            Err(ValidationErrors::single(
                "image",
                "only image files are allowed (jpeg, jpg, png, gif)",
            ))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageStoreError {
    #[error("image storage failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Where accepted images are persisted. Returns a reference recorded on the item.
pub trait ImageStore: Send + Sync {
    fn store(&self, upload: &ImageUpload) -> Result<String, ImageStoreError>;
    fn discard(&self, reference: &str) -> Result<(), ImageStoreError>;
    /// Bytes behind a reference, `None` when it does not resolve to a stored file.
    fn load(&self, reference: &str) -> Result<Option<Vec<u8>>, ImageStoreError>;
}

/// Writes images into a directory served under `public_prefix`.
#[derive(Debug, Clone)]
pub struct DiskImageStore {
    root: PathBuf,
    public_prefix: String,
}

impl DiskImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            public_prefix: "/uploads".to_string(),
        }
    }

    fn file_name_for(upload: &ImageUpload) -> String {
        let original: String = Path::new(&upload.file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image")
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        let unique = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            &unique[..8],
            original
        )
    }

    fn path_for_reference(&self, reference: &str) -> Option<PathBuf> {
        let name = reference
            .strip_prefix(&self.public_prefix)?
            .trim_start_matches('/');
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return None;
        }
        Some(self.root.join(name))
    }
}

impl ImageStore for DiskImageStore {
    fn store(&self, upload: &ImageUpload) -> Result<String, ImageStoreError> {
        fs::create_dir_all(&self.root)?;
        let name = Self::file_name_for(upload);
        fs::write(self.root.join(&name), &upload.bytes)?;
        Ok(format!("{}/{}", self.public_prefix, name))
    }

    fn discard(&self, reference: &str) -> Result<(), ImageStoreError> {
        match self.path_for_reference(reference) {
            Some(path) if path.exists() => Ok(fs::remove_file(path)?),
            _ => Ok(()),
        }
    }

    fn load(&self, reference: &str) -> Result<Option<Vec<u8>>, ImageStoreError> {
        match self.path_for_reference(reference) {
            Some(path) if path.is_file() => Ok(Some(fs::read(path)?)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: Option<&str>, len: usize) -> ImageUpload {
        ImageUpload {
            file_name: name.to_string(),
            content_type: content_type.map(str::to_string),
            bytes: vec![0xAB; len],
        }
    }

    #[test]
    fn accepts_supported_formats() {
        let policy = ImagePolicy::default();
        for (name, declared) in [
            ("photo.jpg", "image/jpeg"),
            ("photo.JPEG", "image/jpeg"),
            ("scan.png", "image/png"),
            ("anim.gif", "image/gif"),
        ] {
            assert!(
                policy.validate(&upload(name, Some(declared), 16)).is_ok(),
                "{name} should be accepted"
            );
        }
    }

    #[test]
    fn rejects_other_types_and_mismatched_declarations() {
        let policy = ImagePolicy::default();
        assert!(policy
            .validate(&upload("notes.pdf", Some("application/pdf"), 16))
            .is_err());
        assert!(policy
            .validate(&upload("photo.jpg", Some("text/plain"), 16))
            .is_err());
        assert!(policy
            .validate(&upload("photo.webp", Some("image/webp"), 16))
            .is_err());
        assert!(policy.validate(&upload("noextension", None, 16)).is_err());
    }

    #[test]
    fn rejects_uploads_without_a_declared_type() {
        let policy = ImagePolicy::default();
        let errors = policy
            .validate(&upload("payload.png", None, 16))
            .expect_err("typeless upload");
        assert!(errors.has_field("image"));
    }

    #[test]
    fn rejects_files_over_the_ceiling() {
        let policy = ImagePolicy { max_bytes: 1024 };
        let errors = policy
            .validate(&upload("photo.png", Some("image/png"), 1025))
            .expect_err("too large");
        assert!(errors.has_field("image"));
        assert!(policy
            .validate(&upload("photo.png", Some("image/png"), 1024))
            .is_ok());
    }

    #[test]
    fn disk_store_writes_and_discards() {
        let root =
            std::env::temp_dir().join(format!("lostfound-images-{}", uuid::Uuid::new_v4()));
        let store = DiskImageStore::new(&root);

        let reference = store
            .store(&upload("../../etc/My Photo.png", Some("image/png"), 8))
            .expect("stored");
        assert!(reference.starts_with("/uploads/"));
        assert!(reference.ends_with("My_Photo.png"));

        let path = store.path_for_reference(&reference).expect("resolves");
        assert!(path.starts_with(&root));
        assert_eq!(store.load(&reference).expect("load").map(|b| b.len()), Some(8));

        store.discard(&reference).expect("discarded");
        assert!(!path.exists());
        assert!(store.load(&reference).expect("load").is_none());
        assert!(store.path_for_reference("/uploads/../secret").is_none());

        fs::remove_dir_all(&root).ok();
    }
}
