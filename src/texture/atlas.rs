use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::texture::pixels::{PixelCache, TILE_BYTES, TILE_SIZE};

pub const ATLAS_SIZE: u32 = 64;
pub const ATLAS_BYTES: usize = (ATLAS_SIZE * ATLAS_SIZE * 3) as usize;

/// Quadrant origins in slot order [top, left, bottom, right].
const SLOT_ORIGINS: [(u32, u32); 4] = [(32, 0), (0, 0), (32, 32), (0, 32)];

/// Assembles 64x64 composite buffers from four 32x32 quadrant textures.
pub struct AtlasComposer<'a> {
    pixels: &'a PixelCache,
    texture_dir: &'a Path,
}

impl<'a> AtlasComposer<'a> {
    pub fn new(pixels: &'a PixelCache, texture_dir: &'a Path) -> Self {
        Self { pixels, texture_dir }
    }

    /// Compose the four resolved quadrant stems into one 12288-byte buffer.
    /// Plain rectangle copies, no blending or resampling.
    pub fn compose(&self, stems: &[String; 4]) -> Result<Vec<u8>> {
        let mut atlas = vec![0u8; ATLAS_BYTES];
        for (stem, origin) in stems.iter().zip(SLOT_ORIGINS) {
            let quadrant = self.pixels.get(self.texture_dir, stem)?;
            blit_quadrant(&mut atlas, &quadrant, stem, origin)?;
        }
        Ok(atlas)
    }
}

fn blit_quadrant(atlas: &mut [u8], quadrant: &Arc<Vec<u8>>, stem: &str, origin: (u32, u32)) -> Result<()> {
    if quadrant.len() != TILE_BYTES {
        return Err(Error::PixelSize {
            name: stem.to_string(),
            len: quadrant.len(),
            expected: TILE_BYTES,
        });
    }
    let row_bytes = (TILE_SIZE * 3) as usize;
    let stride = (ATLAS_SIZE * 3) as usize;
    let (ox, oy) = (origin.0 as usize, origin.1 as usize);
    for row in 0..TILE_SIZE as usize {
        let src = &quadrant[row * row_bytes..(row + 1) * row_bytes];
        let dst = (oy + row) * stride + ox * 3;
        atlas[dst..dst + row_bytes].copy_from_slice(src);
    }
    Ok(())
}
