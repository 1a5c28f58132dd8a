use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Texture stems every source directory is expected to provide.
pub const SEED_TEXTURES: [&str; 12] = [
    "cw", "c-3", "c-2", "c-1", "cx", "c0", "c1", "c2", "c3", "c4", "c5", "c6",
];

/// Policy switches, fixed for a whole generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GeneratorOptions {
    /// Force uniform cube height and rebuild tiles from scratch. When off,
    /// existing tiles are rebound in place.
    pub flatten_ground: bool,
    pub remove_lighting: bool,
    pub use_custom_textures: bool,
    pub texture_walls: bool,
    pub show_gutter_lines: bool,
    pub reset_global_lighting: bool,
    pub remove_objects: bool,
    pub remove_water: bool,
    pub stick_terrain_to_ground: bool,
    /// Prefix prepended to every generated texture name.
    pub texture_id_prefix: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            flatten_ground: true,
            remove_lighting: false,
            use_custom_textures: true,
            texture_walls: false,
            show_gutter_lines: false,
            reset_global_lighting: false,
            remove_objects: false,
            remove_water: false,
            stick_terrain_to_ground: false,
            texture_id_prefix: String::new(),
        }
    }
}

/// Options plus the directories one run works against.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub options: GeneratorOptions,
    pub input_map_dir: PathBuf,
    pub input_texture_dir: PathBuf,
    pub output_texture_dir: PathBuf,
}

impl GeneratorConfig {
    pub fn new(
        input_map_dir: impl Into<PathBuf>,
        input_texture_dir: impl Into<PathBuf>,
        output_texture_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            options: GeneratorOptions::default(),
            input_map_dir: input_map_dir.into(),
            input_texture_dir: input_texture_dir.into(),
            output_texture_dir: output_texture_dir.into(),
        }
    }

    /// Create the working directories and warn about missing seed textures.
    /// Gaps are survivable; the variant resolver falls back to `cx`.
    pub fn prepare(&self) -> Result<()> {
        std::fs::create_dir_all(&self.input_map_dir)?;
        std::fs::create_dir_all(&self.input_texture_dir)?;
        std::fs::create_dir_all(&self.output_texture_dir)?;

        for stem in SEED_TEXTURES {
            if !self.seed_texture_path(stem).is_file() {
                warn!(stem, dir = %self.input_texture_dir.display(), "seed texture missing");
            }
        }
        Ok(())
    }

    fn seed_texture_path(&self, stem: &str) -> PathBuf {
        self.input_texture_dir.join(format!("{stem}.bmp"))
    }

    pub fn map_file(&self, map_name: &str, ext: &str) -> PathBuf {
        self.input_map_dir.join(format!("{map_name}.{ext}"))
    }

    pub fn wall_texture_name(&self) -> String {
        format!("{}cw.bmp", self.options.texture_id_prefix)
    }
}

/// Load options overrides from a JSON file.
pub fn load_options(path: &Path) -> Result<GeneratorOptions> {
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map_err(|e| crate::error::Error::format("options", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = GeneratorOptions::default();
        assert!(options.flatten_ground);
        assert!(options.use_custom_textures);
        assert!(!options.texture_walls);
        assert_eq!(options.texture_id_prefix, "");
    }

    #[test]
    fn test_options_from_json() {
        let parsed: GeneratorOptions = serde_json::from_str(
            r#"{"flatten-ground": false, "texture-walls": true, "texture-id-prefix": "f_"}"#,
        )
        .unwrap();
        assert!(!parsed.flatten_ground);
        assert!(parsed.texture_walls);
        assert_eq!(parsed.texture_id_prefix, "f_");
        // untouched fields keep their defaults
        assert!(parsed.use_custom_textures);
    }

    #[test]
    fn test_wall_texture_name_uses_prefix() {
        let mut config = GeneratorConfig::new("a", "b", "c");
        config.options.texture_id_prefix = "flat_".to_string();
        assert_eq!(config.wall_texture_name(), "flat_cw.bmp");
    }
}
