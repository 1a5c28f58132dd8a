//! Terrain classification and composite texture synthesis.
//!
//! The pipeline per ground cube: `classify` names the four quadrant cells,
//! `variants` picks concrete texture files for them, `pixels` decodes and
//! caches the quadrant buffers, and `atlas` assembles the 64x64 composite.

pub mod atlas;
pub mod classify;
pub mod paths;
pub mod pixels;
pub mod variants;

pub use atlas::AtlasComposer;
pub use classify::CellClass;
pub use paths::GeneratedPaths;
pub use pixels::PixelCache;
pub use variants::{TextureDir, TextureStore, VariantResolver};
