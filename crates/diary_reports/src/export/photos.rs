//! Loading note photos for the PDF export.
//!
//! A photo reference is either an inline `data:` URI, an `http(s)` URL or a
//! path relative to the uploads directory. Failures are reported per photo;
//! the renderer decides how to fall back.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use futures_util::StreamExt;
use image::DynamicImage;
use thiserror::Error;

/// Upper bound on the encoded size of a single photo.
pub const DEFAULT_MAX_PHOTO_BYTES: usize = 15 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("photo larger than {0} bytes")]
    TooLarge(usize),
    #[error("unsupported photo reference: {0}")]
    Unsupported(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode failed: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for PhotoError {
    fn from(e: reqwest::Error) -> Self {
        PhotoError::Fetch(e.to_string())
    }
}

/// Resolves a photo reference to its encoded bytes.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PhotoError>;
}

/// Reads `data:` URIs inline, uploads from disk and everything else over HTTP.
#[derive(Clone, Debug)]
pub struct FsHttpPhotoSource {
    client: reqwest::Client,
    uploads_dir: PathBuf,
    max_bytes: usize,
}

impl FsHttpPhotoSource {
    pub fn new(uploads_dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self, PhotoError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            uploads_dir: uploads_dir.into(),
            max_bytes: DEFAULT_MAX_PHOTO_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn check_size(&self, len: usize) -> Result<(), PhotoError> {
        if len > self.max_bytes {
            return Err(PhotoError::TooLarge(self.max_bytes));
        }
        Ok(())
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>, PhotoError> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(PhotoError::Fetch(format!("status {}", resp.status().as_u16())));
        }
        if let Some(len) = resp.content_length() {
            self.check_size(len as usize)?;
        }

        let mut stream = resp.bytes_stream();
        let mut buf = Vec::new();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk?;
            self.check_size(buf.len() + bytes.len())?;
            buf.extend_from_slice(&bytes);
        }
        Ok(buf)
    }

    async fn read_upload(&self, reference: &str) -> Result<Vec<u8>, PhotoError> {
        let relative = upload_relative_path(reference)
            .ok_or_else(|| PhotoError::Unsupported(reference.to_string()))?;
        let path = self.uploads_dir.join(relative);
        let len = tokio::fs::metadata(&path).await?.len();
        self.check_size(len as usize)?;
        Ok(tokio::fs::read(&path).await?)
    }
}

#[async_trait]
impl PhotoSource for FsHttpPhotoSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PhotoError> {
        if url.starts_with("data:") {
            let bytes = decode_data_uri(url)?;
            self.check_size(bytes.len())?;
            Ok(bytes)
        } else if url.starts_with("http://") || url.starts_with("https://") {
            self.fetch_http(url).await
        } else {
            self.read_upload(url).await
        }
    }
}

/// Payload of a base64 `data:` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, PhotoError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| PhotoError::Unsupported("not a data uri".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| PhotoError::Unsupported("data uri without payload".into()))?;
    if !meta.ends_with(";base64") {
        return Err(PhotoError::Unsupported("data uri is not base64".into()));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| PhotoError::Decode(e.to_string()))
}

/// Path below the uploads directory for a stored reference such as
/// `/uploads/2025/a.jpg` or `2025/a.jpg`. Anything escaping the directory is
/// rejected.
fn upload_relative_path(reference: &str) -> Option<PathBuf> {
    let trimmed = reference.trim_start_matches('/');
    let trimmed = trimmed.strip_prefix("uploads/").unwrap_or(trimmed);
    let path = Path::new(trimmed);
    let clean = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    (clean && !trimmed.is_empty()).then(|| path.to_path_buf())
}

/// A decoded photo, downscaled to fit a `thumb` x `thumb` box.
#[derive(Clone, Debug)]
pub struct Thumbnail {
    pub image: DynamicImage,
    pub width: u32,
    pub height: u32,
}

pub fn decode_thumbnail(bytes: &[u8], thumb: u32) -> Result<Thumbnail, PhotoError> {
    let img = image::load_from_memory(bytes).map_err(|e| PhotoError::Decode(e.to_string()))?;
    let img = if img.width() > thumb || img.height() > thumb {
        img.thumbnail(thumb, thumb)
    } else {
        img
    };
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    Ok(Thumbnail {
        width: rgb.width(),
        height: rgb.height(),
        image: rgb,
    })
}

/// Fetch and decode one photo. Decoding runs on the blocking pool.
pub async fn load_thumbnail(
    source: &dyn PhotoSource,
    url: &str,
    thumb: u32,
) -> Result<Thumbnail, PhotoError> {
    let bytes = source.fetch(url).await?;
    tokio::task::spawn_blocking(move || decode_thumbnail(&bytes, thumb))
        .await
        .map_err(|e| PhotoError::Decode(e.to_string()))?
}
