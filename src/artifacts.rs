// src/artifacts.rs
//
// Where generated images and audio end up: a local directory served by this
// service, or an S3-compatible bucket with public URLs.

use std::path::{Path, PathBuf};

use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::primitives::ByteStream;
use uuid::Uuid;

use crate::error::ArtifactError;

pub const IMAGE_ROUTE: &str = "/imagenes";
pub const MUSIC_ROUTE: &str = "/music";
const MUSIC_SUBDIR: &str = "music";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Music,
}

impl ArtifactKind {
    fn content_type(self) -> &'static str {
        match self {
            ArtifactKind::Image => "image/png",
            ArtifactKind::Music => "audio/mpeg",
        }
    }
}

/// Location of a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub file_name: String,
    /// Filesystem path or object key.
    pub path: String,
    /// URL clients fetch the artifact from.
    pub url: String,
}

pub enum ArtifactStore {
    Local {
        dir: PathBuf,
    },
    S3 {
        client: S3Client,
        bucket: String,
        public_base_url: String,
    },
}

/// `{record_id}_{8 hex}.png` for images, `music_{record_id}_{8 hex}.mp3` for audio.
pub fn artifact_name(kind: ArtifactKind, record_id: i32) -> String {
    let suffix = &Uuid::new_v4().simple().to_string()[..8];
    match kind {
        ArtifactKind::Image => format!("{record_id}_{suffix}.png"),
        ArtifactKind::Music => format!("music_{record_id}_{suffix}.mp3"),
    }
}

/// Keeps alphanumerics and `.`, `_`, `-`. Used for names taken from requests.
pub fn sanitize(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '.' || *c == '_' || *c == '-')
        .collect()
}

/// Public URL of an object key. `base` may carry `{bucket}`/`{key}` placeholders
/// or already include the bucket.
pub fn build_public_url(base: &str, bucket: &str, key: &str) -> String {
    let trimmed = base.trim_end_matches('/');

    if trimmed.contains("{bucket}") || trimmed.contains("{key}") {
        return trimmed.replace("{bucket}", bucket).replace("{key}", key);
    }

    if trimmed.contains(bucket) {
        format!("{trimmed}/{key}")
    } else {
        format!("{trimmed}/{bucket}/{key}")
    }
}

impl ArtifactStore {
    pub fn local(dir: impl Into<PathBuf>) -> Self {
        ArtifactStore::Local { dir: dir.into() }
    }

    /// Directory generated images are read from when served locally.
    pub fn image_dir(&self) -> Option<&Path> {
        match self {
            ArtifactStore::Local { dir } => Some(dir),
            ArtifactStore::S3 { .. } => None,
        }
    }

    pub fn music_dir(&self) -> Option<PathBuf> {
        self.image_dir().map(|d| d.join(MUSIC_SUBDIR))
    }

    pub async fn save(
        &self,
        kind: ArtifactKind,
        record_id: i32,
        bytes: Vec<u8>,
    ) -> Result<StoredArtifact, ArtifactError> {
        let file_name = artifact_name(kind, record_id);

        match self {
            ArtifactStore::Local { dir } => {
                let (dir, route) = match kind {
                    ArtifactKind::Image => (dir.clone(), IMAGE_ROUTE),
                    ArtifactKind::Music => (dir.join(MUSIC_SUBDIR), MUSIC_ROUTE),
                };
                tokio::fs::create_dir_all(&dir).await?;
                let path = dir.join(&file_name);
                tokio::fs::write(&path, &bytes).await?;

                Ok(StoredArtifact {
                    url: format!("{route}/{file_name}"),
                    path: path.to_string_lossy().into_owned(),
                    file_name,
                })
            }
            ArtifactStore::S3 {
                client,
                bucket,
                public_base_url,
            } => {
                let key = match kind {
                    ArtifactKind::Image => format!("generated/{file_name}"),
                    ArtifactKind::Music => format!("generated/{MUSIC_SUBDIR}/{file_name}"),
                };
                client
                    .put_object()
                    .bucket(bucket)
                    .key(&key)
                    .content_type(kind.content_type())
                    .body(ByteStream::from(bytes))
                    .send()
                    .await
                    .map_err(|e| ArtifactError::Upload(e.to_string()))?;

                Ok(StoredArtifact {
                    url: build_public_url(public_base_url, bucket, &key),
                    path: key,
                    file_name,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_kind_pattern() {
        let image = artifact_name(ArtifactKind::Image, 42);
        assert!(image.starts_with("42_") && image.ends_with(".png"));
        assert_eq!(image.len(), "42_".len() + 8 + ".png".len());

        let music = artifact_name(ArtifactKind::Music, 7);
        assert!(music.starts_with("music_7_") && music.ends_with(".mp3"));
    }

    #[test]
    fn sanitize_drops_path_segments() {
        assert_eq!(sanitize("../../etc/passwd"), "....etcpasswd");
        assert_eq!(sanitize("12_ab34cd56.png"), "12_ab34cd56.png");
    }

    #[test]
    fn public_urls() {
        assert_eq!(
            build_public_url("https://cdn.example.com/", "media", "generated/a.png"),
            "https://cdn.example.com/media/generated/a.png"
        );
        assert_eq!(
            build_public_url("https://media.s3.amazonaws.com", "media", "a.png"),
            "https://media.s3.amazonaws.com/a.png"
        );
        assert_eq!(
            build_public_url("https://s3.host/{bucket}/{key}", "media", "a.png"),
            "https://s3.host/media/a.png"
        );
    }

    #[tokio::test]
    async fn local_store_writes_under_kind_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::local(dir.path());

        let image = store.save(ArtifactKind::Image, 3, vec![1, 2, 3]).await.unwrap();
        assert!(image.url.starts_with("/imagenes/3_"));
        assert_eq!(std::fs::read(&image.path).unwrap(), vec![1, 2, 3]);

        let song = store.save(ArtifactKind::Music, 3, vec![9]).await.unwrap();
        assert!(song.url.starts_with("/music/music_3_"));
        assert!(dir.path().join("music").join(&song.file_name).exists());
    }
}
