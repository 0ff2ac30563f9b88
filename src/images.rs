//! Product image storage under the public upload directory.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const PUBLIC_PREFIX: &str = "/images/products/";
const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    /// `root` is the directory served at `/`; images land in `root/images/products`.
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn products_dir(&self) -> PathBuf {
        self.root.join("images").join("products")
    }

    pub fn validate(&self, upload: &UploadedImage) -> AppResult<()> {
        if upload.bytes.is_empty() {
            return Err(AppError::bad_request("Uploaded image is empty"));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(AppError::bad_request(format!(
                "Image must be at most {} KB",
                self.max_bytes / 1024
            )));
        }
        let extension = Path::new(&upload.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension {
            Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
            _ => Err(AppError::bad_request(
                "Only jpg, jpeg, png, gif and webp images are allowed",
            )),
        }
    }

    /// Writes the upload under a fresh unique name and returns its public URL.
    pub async fn save(&self, upload: &UploadedImage) -> AppResult<String> {
        self.validate(upload)?;
        let dir = self.products_dir();
        fs::create_dir_all(&dir).await?;

        let file_name = format!("{}_{}", Uuid::new_v4(), sanitize_file_name(&upload.file_name));
        fs::write(dir.join(&file_name), &upload.bytes).await?;
        tracing::debug!(file = %file_name, bytes = upload.bytes.len(), "stored product image");

        Ok(format!("{PUBLIC_PREFIX}{file_name}"))
    }

    /// Deletes the file behind a stored URL. Missing files and foreign URLs are ignored.
    pub async fn delete(&self, url: &str) -> AppResult<()> {
        let Some(path) = self.path_for_url(url) else {
            tracing::warn!(url, "refusing to delete image outside the upload directory");
            return Ok(());
        };
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let relative = url.trim_start_matches('~').strip_prefix(PUBLIC_PREFIX)?;
        let relative = Path::new(relative);
        let is_plain_file = relative.components().count() == 1
            && matches!(relative.components().next(), Some(Component::Normal(_)));
        is_plain_file.then(|| self.products_dir().join(relative))
    }
}

/// Keeps ASCII letters, digits, `.`, `-` and `_`; runs of anything else become one `-`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image");
    let mut cleaned = String::with_capacity(base.len());
    for c in base.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_') {
            cleaned.push(c.to_ascii_lowercase());
        } else if !cleaned.ends_with('-') {
            cleaned.push('-');
        }
    }
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '-');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}
