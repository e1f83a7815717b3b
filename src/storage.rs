//! Image storage: a directory of logo and shape images addressed by
//! relative filename only, so a copied or restored directory keeps every
//! reference valid.

use std::fs;
use std::io::{Cursor, ErrorKind};
use std::path::{Component, Path, PathBuf};

use image::imageops::FilterType;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::StorageError;

/// Accepted image file extensions.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Long side of generated thumbnails, in pixels.
pub const THUMBNAIL_SIZE: u32 = 80;

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Open (creating if needed) the storage directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a stored image. Rejects absolute paths, `..` and
    /// extensions outside [`ALLOWED_EXTENSIONS`].
    pub fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.resolve(name).map(|p| p.is_file()).unwrap_or(false)
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        Ok(fs::read(self.resolve(name)?)?)
    }

    /// Write `bytes` under `name` plus an 80px PNG thumbnail. Returns the
    /// relative name to persist.
    pub fn save_image(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let path = self.resolve(name)?;
        let thumbnail = make_thumbnail(bytes)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        fs::write(self.root.join(thumbnail_name(name)), thumbnail)?;

        info!("Saved image {} ({} bytes)", name, bytes.len());
        Ok(name.to_string())
    }

    /// Store an upload under a fresh unique name that keeps the upload's
    /// extension.
    pub fn save_new_image(&self, original_name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let ext = extension_of(original_name)
            .ok_or_else(|| StorageError::UnsupportedFormat(original_name.to_string()))?;
        let name = format!("img_{}.{}", Uuid::new_v4().simple(), ext);
        self.save_image(&name, bytes)
    }

    /// Remove an image and its thumbnail. Missing files are not an error.
    pub fn delete(&self, name: &str) -> Result<(), StorageError> {
        let path = self.resolve(name)?;
        for p in [path, self.root.join(thumbnail_name(name))] {
            match fs::remove_file(&p) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// `logo.jpg` → `logo_jpg_thumb.png`. The source extension stays in the
/// name so `logo.png` and `logo.jpg` never share a thumbnail.
pub fn thumbnail_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{}_{}_thumb.png", stem, ext.to_ascii_lowercase()),
        None => format!("{}_thumb.png", name),
    }
}

fn extension_of(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?.to_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn validate_name(name: &str) -> Result<(), StorageError> {
    let path = Path::new(name);
    let relative = !name.trim().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !relative {
        return Err(StorageError::InvalidPath(name.to_string()));
    }
    if extension_of(name).is_none() {
        return Err(StorageError::UnsupportedFormat(name.to_string()));
    }
    Ok(())
}

fn make_thumbnail(bytes: &[u8]) -> Result<Vec<u8>, StorageError> {
    let img = image::load_from_memory(bytes).map_err(|e| {
        warn!("Cannot decode image for thumbnail: {}", e);
        StorageError::Thumbnail(e.to_string())
    })?;
    let thumb = img.resize(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Lanczos3);
    let mut out = Cursor::new(Vec::new());
    thumb
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .map_err(|e| StorageError::Thumbnail(e.to_string()))?;
    Ok(out.into_inner())
}
