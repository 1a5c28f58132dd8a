//! Load/save codecs for the three map descriptor formats.
//!
//! - `terrain` - collision/water grid (`.gat`)
//! - `ground` - renderable ground mesh (`.gnd`)
//! - `world` - lighting/water/object descriptor (`.rsw`)

pub mod ground;
pub mod terrain;
pub mod world;

pub use ground::{GroundCube, GroundMesh, GroundTile, TextureTable};
pub use terrain::{TerrainCell, TerrainGrid};
pub use world::WorldDescriptor;
