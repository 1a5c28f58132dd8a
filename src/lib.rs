//! Flat-map generator
//!
//! A Rust library for turning game maps into flattened variants: terrain
//! cells are classified, 64x64 composite ground textures are synthesized
//! from 32x32 quadrants, the ground mesh is rewritten to reference them,
//! and the resulting descriptors are compressed into a container stream.

pub mod codec;
pub mod config;
pub mod container;
pub mod coordinator;
pub mod error;
pub mod formats;
pub mod rewrite;
pub mod texture;

pub use error::{Error, Result};
pub use config::{load_options, GeneratorConfig, GeneratorOptions};
pub use container::{ContainerEntry, ContainerPackager};
pub use coordinator::GenerationCoordinator;
pub use formats::{GroundMesh, TerrainGrid, WorldDescriptor};
pub use rewrite::GroundRewriter;
