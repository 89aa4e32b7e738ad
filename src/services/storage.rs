//! Object store for captured photos and generated code images

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};

use crate::{
    config::StorageConfig,
    error::{AppError, AppResult},
};

/// Persists bytes under a key and returns a retrievable URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn store(&self, bytes: Vec<u8>, key: &str) -> AppResult<String>;
}

/// Content-addressed key: `{prefix}/{sha256}.{ext}`
pub fn object_key(prefix: &str, bytes: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    format!("{}/{}.{}", prefix.trim_matches('/'), digest, image_extension(bytes))
}

/// File extension guessed from the leading magic bytes
pub fn image_extension(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "png",
        [0xFF, 0xD8, 0xFF, ..] => "jpg",
        [b'G', b'I', b'F', b'8', ..] => "gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "webp",
        _ => "bin",
    }
}

/// MIME type matching a file name's extension
pub fn content_type_for(name: &str) -> &'static str {
    match name.rsplit('.').next().map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Store backed by a local directory served under a public URL prefix
#[derive(Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.media_root),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::Storage(format!("Invalid object key '{}'", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn store(&self, bytes: Vec<u8>, key: &str) -> AppResult<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", path.display(), e)))?;

        tracing::debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(format!("{}/{}", self.public_base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn scratch_store() -> (LocalObjectStore, PathBuf) {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let root = std::env::temp_dir().join(format!("gatepass-store-{}-{}", std::process::id(), nanos));
        let store = LocalObjectStore::new(&StorageConfig {
            media_root: root.display().to_string(),
            public_base_url: "http://localhost:8080/media/".to_string(),
        });
        (store, root)
    }

    #[test]
    fn identical_content_maps_to_the_same_key() {
        let a = object_key("visitors", &PNG_HEADER);
        let b = object_key("/visitors/", &PNG_HEADER);
        assert_eq!(a, b);
        assert!(a.starts_with("visitors/"));
        assert!(a.ends_with(".png"));
        assert_ne!(a, object_key("visitors", b"other bytes"));
    }

    #[test]
    fn extension_and_content_type_agree() {
        assert_eq!(image_extension(&[0xFF, 0xD8, 0xFF, 0xE0]), "jpg");
        assert_eq!(content_type_for("pass.JPG"), "image/jpeg");
        assert_eq!(image_extension(b"plain"), "bin");
        assert_eq!(content_type_for("pass"), "application/octet-stream");
    }

    #[tokio::test]
    async fn stores_file_and_returns_public_url() {
        let (store, root) = scratch_store();
        let key = object_key("invites/pass", &PNG_HEADER);

        let url = store.store(PNG_HEADER.to_vec(), &key).await.unwrap();

        assert_eq!(url, format!("http://localhost:8080/media/{}", key));
        let written = tokio::fs::read(root.join(&key)).await.unwrap();
        assert_eq!(written, PNG_HEADER);
        let _ = tokio::fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn rejects_keys_escaping_the_media_root() {
        let (store, _) = scratch_store();
        for key in ["../etc/passwd", "/abs/path.png", ""] {
            let err = store.store(vec![1, 2, 3], key).await.unwrap_err();
            assert!(matches!(err, AppError::Storage(_)), "{} accepted", key);
        }
    }
}
