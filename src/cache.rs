//! Render-path caches owned by the renderer.
//!
//! Two caches: decoded (already size-bounded) images keyed by relative
//! path, and the last loaded settings + shapes snapshot. Both are dropped
//! together by [`RenderCache::invalidate`], which every settings or shape
//! save calls.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::SettingsError;
use crate::image_loader::{load_image_source, LoadedImage};
use crate::settings::{LayoutSettings, SettingsStore};
use crate::shapes::ShapeCollection;
use crate::storage::ImageStore;

/// Settings and shapes as loaded from the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsSnapshot {
    pub settings: LayoutSettings,
    pub shapes: ShapeCollection,
}

impl SettingsSnapshot {
    pub fn load(store: &dyn SettingsStore) -> Result<Self, SettingsError> {
        Ok(Self {
            settings: LayoutSettings::load(store)?,
            shapes: ShapeCollection::load(store)?,
        })
    }
}

#[derive(Debug, Default)]
pub struct RenderCache {
    images: HashMap<String, Arc<LoadedImage>>,
    snapshot: Option<Arc<SettingsSnapshot>>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached snapshot, loading it from `store` on a miss.
    pub fn snapshot(&mut self, store: &dyn SettingsStore) -> Result<Arc<SettingsSnapshot>, SettingsError> {
        if let Some(snapshot) = &self.snapshot {
            return Ok(Arc::clone(snapshot));
        }
        let snapshot = Arc::new(SettingsSnapshot::load(store)?);
        self.snapshot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// The decoded image at `name`. Failures are logged and not cached, so
    /// a fixed file is picked up on the next render.
    pub fn image(&mut self, name: &str, store: &ImageStore) -> Option<Arc<LoadedImage>> {
        if let Some(image) = self.images.get(name) {
            return Some(Arc::clone(image));
        }
        match load_image_source(name, store) {
            Ok(image) => {
                debug!("Cached image {} ({}x{})", name, image.width_px, image.height_px);
                let image = Arc::new(image);
                self.images.insert(name.to_string(), Arc::clone(&image));
                Some(image)
            }
            Err(e) => {
                warn!("Image {} unavailable, rendering without it: {}", name, e);
                None
            }
        }
    }

    /// Drop both caches.
    pub fn invalidate(&mut self) {
        debug!("Render cache invalidated");
        *self = Self::default();
    }

    pub fn cached_image_count(&self) -> usize {
        self.images.len()
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }
}
