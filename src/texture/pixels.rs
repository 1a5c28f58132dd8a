use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ahash::AHashMap;

use crate::error::{Error, Result};
use crate::texture::variants::PLACEHOLDER_STEM;

/// Quadrant source textures are 32x32, 3 bytes per pixel.
pub const TILE_SIZE: u32 = 32;
pub const TILE_BYTES: usize = (TILE_SIZE * TILE_SIZE * 3) as usize;

/// Decode a bitmap file to a raw 3-byte/pixel buffer, top-down row order.
pub fn decode_bitmap(path: &Path) -> Result<Vec<u8>> {
    let img = image::open(path)?;
    Ok(img.to_rgb8().into_raw())
}

/// Encode a raw 3-byte/pixel buffer to a bitmap file.
pub fn encode_bitmap(path: &Path, pixels: &[u8], width: u32, height: u32) -> Result<()> {
    let expected = (width * height * 3) as usize;
    let img = image::RgbImage::from_raw(width, height, pixels.to_vec()).ok_or_else(|| {
        Error::PixelSize {
            name: path.display().to_string(),
            len: pixels.len(),
            expected,
        }
    })?;
    img.save(path)?;
    Ok(())
}

/// Memoized bitmap decoder, shared across all maps of one coordinator.
/// Entries are immutable after insert and never evicted.
pub struct PixelCache {
    entries: Mutex<AHashMap<String, Arc<Vec<u8>>>>,
}

impl PixelCache {
    pub fn new() -> Self {
        Self { entries: Mutex::new(AHashMap::new()) }
    }

    /// Decoded pixels for a texture stem. A cache hit never touches storage.
    /// Concurrent misses on the same stem may decode twice; the first insert
    /// wins and both callers get the same buffer.
    pub fn get(&self, texture_dir: &Path, stem: &str) -> Result<Arc<Vec<u8>>> {
        if let Some(hit) = lock(&self.entries).get(stem) {
            return Ok(hit.clone());
        }
        let path = resolve_source_path(texture_dir, stem);
        let pixels = Arc::new(decode_bitmap(&path)?);
        let mut entries = lock(&self.entries);
        Ok(entries.entry(stem.to_string()).or_insert(pixels).clone())
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PixelCache {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// On-disk fallback chain for a resolved stem: a missing shoreline variant
/// falls back to the plain water texture, any other missing variant to its
/// un-suffixed base, and a total miss to the placeholder. Whatever this
/// returns still has to decode; an absent placeholder is a hard error there.
fn resolve_source_path(dir: &Path, stem: &str) -> PathBuf {
    let mut path = dir.join(format!("{stem}.bmp"));
    if !path.is_file() && stem.starts_with("c-1_") {
        path = dir.join("c-1.bmp");
    } else if !path.is_file() && stem.contains('_') {
        let base = stem.split('_').next().unwrap_or(stem);
        path = dir.join(format!("{base}.bmp"));
    }
    if !path.is_file() {
        path = dir.join(format!("{PLACEHOLDER_STEM}.bmp"));
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_texture_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("flatmaps-pixels-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_tile(dir: &Path, stem: &str, value: u8) {
        let pixels = vec![value; TILE_BYTES];
        encode_bitmap(&dir.join(format!("{stem}.bmp")), &pixels, TILE_SIZE, TILE_SIZE).unwrap();
    }

    #[test]
    fn test_decode_is_memoized() {
        let dir = temp_texture_dir("memo");
        write_tile(&dir, "c0", 10);

        let cache = PixelCache::new();
        let first = cache.get(&dir, "c0").unwrap();
        assert_eq!(first.len(), TILE_BYTES);
        assert_eq!(cache.len(), 1);

        // delete the file; the hit must come from the cache
        std::fs::remove_file(dir.join("c0.bmp")).unwrap();
        let second = cache.get(&dir, "c0").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_shoreline_fallback_to_plain_water() {
        let dir = temp_texture_dir("shore");
        write_tile(&dir, "c-1", 20);

        let cache = PixelCache::new();
        let pixels = cache.get(&dir, "c-1_13").unwrap();
        assert_eq!(pixels[0], 20);
    }

    #[test]
    fn test_variant_fallback_to_base() {
        let dir = temp_texture_dir("base");
        write_tile(&dir, "c2", 30);

        let cache = PixelCache::new();
        let pixels = cache.get(&dir, "c2_7").unwrap();
        assert_eq!(pixels[0], 30);
    }

    #[test]
    fn test_total_miss_falls_back_to_placeholder() {
        let dir = temp_texture_dir("placeholder");
        write_tile(&dir, "cx", 40);

        let cache = PixelCache::new();
        let pixels = cache.get(&dir, "c6").unwrap();
        assert_eq!(pixels[0], 40);
    }

    #[test]
    fn test_exhausted_chain_is_an_error() {
        let dir = temp_texture_dir("empty");
        let cache = PixelCache::new();
        assert!(cache.get(&dir, "c5").is_err());
    }
}
