//! Drives classification and texture synthesis over every cube of a ground
//! mesh, rewriting its tile and texture bindings.

use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;
use tracing::{debug, warn};

use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::formats::{GroundMesh, GroundTile, TerrainGrid};
use crate::texture::atlas::{AtlasComposer, ATLAS_SIZE};
use crate::texture::classify::{classify_cell, quad_cell_indices, CellClass};
use crate::texture::paths::GeneratedPaths;
use crate::texture::pixels::{encode_bitmap, PixelCache};
use crate::texture::variants::{TextureStore, VariantResolver};

/// Per-map rewriter. The caches and the wall-seed flag are shared across
/// workers; the mesh and the generator handle are owned by this worker.
pub struct GroundRewriter<'a, S, R> {
    config: &'a GeneratorConfig,
    pixels: &'a PixelCache,
    generated: &'a GeneratedPaths,
    wall_seeded: &'a AtomicBool,
    resolver: VariantResolver<S>,
    rng: R,
}

impl<'a, S: TextureStore, R: Rng> GroundRewriter<'a, S, R> {
    pub fn new(
        config: &'a GeneratorConfig,
        pixels: &'a PixelCache,
        generated: &'a GeneratedPaths,
        wall_seeded: &'a AtomicBool,
        resolver: VariantResolver<S>,
        rng: R,
    ) -> Self {
        Self { config, pixels, generated, wall_seeded, resolver, rng }
    }

    pub fn rewrite(&mut self, mesh: &mut GroundMesh, grid: &TerrainGrid) -> Result<()> {
        if self.config.options.texture_walls {
            mesh.textures.add_or_lookup(&self.config.wall_texture_name());
            self.seed_wall_texture();
        }

        for y in 0..mesh.height {
            for x in 0..mesh.width {
                self.rewrite_cube(mesh, grid, x, y)?;
            }
        }
        Ok(())
    }

    fn rewrite_cube(&mut self, mesh: &mut GroundMesh, grid: &TerrainGrid, x: u32, y: u32) -> Result<()> {
        let indices = quad_cell_indices(x, y, mesh.width);

        let mut name = self.config.options.texture_id_prefix.clone();
        let mut stems: [String; 4] = Default::default();
        for (slot, &index) in indices.iter().enumerate() {
            let stem = self.resolve_cell(grid, index);
            name.push_str(&stem);
            stems[slot] = stem;
        }
        name.push_str(".bmp");

        let texture = match mesh.textures.index_of(&name) {
            Some(index) => index,
            None => {
                self.materialize_composite(&name, &stems)?;
                mesh.textures.add_or_lookup(&name)
            }
        } as i16;

        let cube_index = (y * mesh.width + x) as usize;
        if self.config.options.flatten_ground {
            // one fresh tile per cube, walls cleared
            mesh.tiles.push(GroundTile::new(texture));
            let tile_index = (mesh.tiles.len() - 1) as i32;
            let cube = &mut mesh.cubes[cube_index];
            cube.tile_up = tile_index;
            cube.tile_side = -1;
            cube.tile_front = -1;
        } else {
            let tile_up = mesh.cubes[cube_index].tile_up;
            if let Some(tile) = tile_slot(&mut mesh.tiles, tile_up) {
                tile.texture = texture;
                tile.reset_uv();
            }
            if self.config.options.texture_walls {
                if let Some(wall) = mesh.textures.index_of(&self.config.wall_texture_name()) {
                    let cube = &mesh.cubes[cube_index];
                    for slot in [cube.tile_side, cube.tile_front] {
                        if let Some(tile) = tile_slot(&mut mesh.tiles, slot) {
                            tile.texture = wall as i16;
                            tile.reset_uv();
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolved file stem for one terrain cell. A nonzero shoreline mask
    /// fixes the name outright; everything else goes through the weighted
    /// variant pick.
    fn resolve_cell(&mut self, grid: &TerrainGrid, index: usize) -> String {
        match classify_cell(grid, index) {
            CellClass::Water { shoreline } if shoreline != 0 => format!("c-1_{shoreline}"),
            other => self.resolver.resolve(&other.base_name(), &mut self.rng),
        }
    }

    /// Compose and write the composite atlas unless this run (or a previous
    /// run, via the seeded path listing) already produced that file.
    fn materialize_composite(&self, name: &str, stems: &[String; 4]) -> Result<()> {
        let out_dir = &self.config.output_texture_dir;
        let path = out_dir.join(name);
        if !self.generated.claim(out_dir, &path)? {
            return Ok(());
        }

        let composer = AtlasComposer::new(self.pixels, &self.config.input_texture_dir);
        let written = composer
            .compose(stems)
            .and_then(|atlas| encode_bitmap(&path, &atlas, ATLAS_SIZE, ATLAS_SIZE));
        if let Err(err) = written {
            self.generated.release(&path);
            return Err(err);
        }
        debug!(name, "composite texture written");
        Ok(())
    }

    /// Copy the wall source texture into the output directory, at most once
    /// per run. Best effort: a missing source is expected on bare setups,
    /// anything else is logged and generation continues.
    fn seed_wall_texture(&self) {
        if self.wall_seeded.swap(true, Ordering::SeqCst) {
            return;
        }
        let src = self.config.input_texture_dir.join("cw.bmp");
        let dst = self.config.output_texture_dir.join(self.config.wall_texture_name());
        let _ = std::fs::remove_file(&dst);
        match std::fs::copy(&src, &dst) {
            Ok(_) => debug!(dst = %dst.display(), "wall texture seeded"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("wall texture source missing");
            }
            Err(err) => warn!(error = %err, "wall texture copy failed"),
        }
    }
}

fn tile_slot(tiles: &mut [GroundTile], index: i32) -> Option<&mut GroundTile> {
    usize::try_from(index).ok().and_then(|i| tiles.get_mut(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::pixels::{TILE_BYTES, TILE_SIZE};
    use crate::texture::variants::TextureDir;
    use rand::rngs::mock::StepRng;
    use std::path::{Path, PathBuf};

    struct Fixture {
        config: GeneratorConfig,
        pixels: PixelCache,
        generated: GeneratedPaths,
        wall_seeded: AtomicBool,
    }

    impl Fixture {
        fn new(tag: &str) -> Self {
            let root = std::env::temp_dir().join(format!("flatmaps-rewrite-{tag}-{}", std::process::id()));
            let input_tex = root.join("in");
            let output_tex = root.join("out");
            std::fs::create_dir_all(&input_tex).unwrap();
            std::fs::create_dir_all(&output_tex).unwrap();
            for (stem, value) in [("c0", 1u8), ("c-1", 2), ("c-2", 3), ("c-3", 4), ("cx", 5), ("cw", 6)] {
                write_tile(&input_tex, stem, value);
            }
            Self {
                config: GeneratorConfig::new(root.join("maps"), input_tex, output_tex),
                pixels: PixelCache::new(),
                generated: GeneratedPaths::new(),
                wall_seeded: AtomicBool::new(false),
            }
        }

        fn rewriter(&self) -> GroundRewriter<'_, TextureDir, StepRng> {
            GroundRewriter::new(
                &self.config,
                &self.pixels,
                &self.generated,
                &self.wall_seeded,
                VariantResolver::new(TextureDir::new(&self.config.input_texture_dir)),
                StepRng::new(0, 0),
            )
        }
    }

    fn write_tile(dir: &Path, stem: &str, value: u8) {
        let pixels = vec![value; TILE_BYTES];
        crate::texture::pixels::encode_bitmap(
            &dir.join(format!("{stem}.bmp")),
            &pixels,
            TILE_SIZE,
            TILE_SIZE,
        )
        .unwrap();
    }

    /// 4x4 terrain grid over a 2x2 mesh, all plain walkable ground.
    fn land_grid() -> TerrainGrid {
        let mut grid = TerrainGrid::new(4, 4);
        for cell in &mut grid.cells {
            cell.is_water = Some(false);
        }
        grid
    }

    fn atlas_pixel(path: &PathBuf, x: u32, y: u32) -> u8 {
        let pixels = crate::texture::pixels::decode_bitmap(path).unwrap();
        pixels[((y * ATLAS_SIZE + x) * 3) as usize]
    }

    #[test]
    fn test_flatten_creates_one_tile_per_cube() {
        let fixture = Fixture::new("flatten");
        let grid = land_grid();
        let mut mesh = GroundMesh::new(2, 2);

        fixture.rewriter().rewrite(&mut mesh, &grid).unwrap();

        assert_eq!(mesh.tiles.len(), 4);
        assert_eq!(mesh.textures.len(), 1);
        assert_eq!(mesh.textures.index_of("c0c0c0c0.bmp"), Some(0));
        for cube in &mesh.cubes {
            assert!(cube.tile_up >= 0);
            assert_eq!(cube.tile_side, -1);
            assert_eq!(cube.tile_front, -1);
            assert_eq!(mesh.tiles[cube.tile_up as usize].texture, 0);
        }
        assert!(fixture.config.output_texture_dir.join("c0c0c0c0.bmp").is_file());
    }

    #[test]
    fn test_interior_water_cell_names_full_shoreline() {
        let fixture = Fixture::new("shore15");
        let mut grid = land_grid();
        // cell 5 = quadrant slot 3 of cube (0,0); all four neighbors in
        // range and dry -> mask 15
        grid.cells[5].is_water = Some(true);
        let mut mesh = GroundMesh::new(2, 2);

        fixture.rewriter().rewrite(&mut mesh, &grid).unwrap();

        assert!(mesh.textures.index_of("c0c0c0c-1_15.bmp").is_some());
        // the missing c-1_15 file falls back to c-1.bmp pixels in the
        // right quadrant slot (0,32)
        let atlas = fixture.config.output_texture_dir.join("c0c0c0c-1_15.bmp");
        assert_eq!(atlas_pixel(&atlas, 10, 40), 2);
        assert_eq!(atlas_pixel(&atlas, 10, 10), 1);
    }

    #[test]
    fn test_corner_water_cell_shoreline_excludes_out_of_range() {
        let fixture = Fixture::new("shore6");
        let mut grid = land_grid();
        // cell 0 at the grid corner: N and W out of range -> only E|S
        grid.cells[0].is_water = Some(true);
        let mut mesh = GroundMesh::new(2, 2);

        fixture.rewriter().rewrite(&mut mesh, &grid).unwrap();
        assert!(mesh.textures.index_of("c-1_6c0c0c0.bmp").is_some());
    }

    #[test]
    fn test_rebind_keeps_tiles_and_retargets_walls() {
        let fixture = Fixture::new("rebind");
        let mut config = fixture.config.clone();
        config.options.flatten_ground = false;
        config.options.texture_walls = true;

        let grid = land_grid();
        let mut mesh = GroundMesh::new(2, 2);
        mesh.textures.add_or_lookup("old.bmp");
        for i in 0..4 {
            mesh.tiles.push(GroundTile::new(0));
            mesh.cubes[i].tile_up = i as i32;
        }
        mesh.tiles.push(GroundTile::new(0));
        mesh.cubes[0].tile_side = 4;

        let mut rewriter = GroundRewriter::new(
            &config,
            &fixture.pixels,
            &fixture.generated,
            &fixture.wall_seeded,
            VariantResolver::new(TextureDir::new(&config.input_texture_dir)),
            StepRng::new(0, 0),
        );
        rewriter.rewrite(&mut mesh, &grid).unwrap();

        assert_eq!(mesh.tiles.len(), 5, "rebind never grows the tile list");
        let wall = mesh.textures.index_of(&config.wall_texture_name()).unwrap() as i16;
        let composite = mesh.textures.index_of("c0c0c0c0.bmp").unwrap() as i16;
        for i in 0..4 {
            assert_eq!(mesh.tiles[mesh.cubes[i].tile_up as usize].texture, composite);
        }
        assert_eq!(mesh.tiles[4].texture, wall);
        assert!(config.output_texture_dir.join(config.wall_texture_name()).is_file());
    }

    #[test]
    fn test_composite_write_is_idempotent() {
        let fixture = Fixture::new("idem");
        let grid = land_grid();

        let mut first = GroundMesh::new(2, 2);
        fixture.rewriter().rewrite(&mut first, &grid).unwrap();

        let composite = fixture.config.output_texture_dir.join("c0c0c0c0.bmp");
        assert!(composite.is_file());
        std::fs::remove_file(&composite).unwrap();

        // a second mesh through the same shared state skips the disk write
        let mut second = GroundMesh::new(2, 2);
        fixture.rewriter().rewrite(&mut second, &grid).unwrap();
        assert!(!composite.exists(), "already-claimed composite must not be rewritten");
        assert_eq!(second.textures.index_of("c0c0c0c0.bmp"), Some(0));
    }

    #[test]
    fn test_gutter_cells_use_gutter_textures() {
        let fixture = Fixture::new("gutter");
        let mut grid = land_grid();
        grid.cells[0].is_outer_gutter = Some(true);
        grid.cells[1].is_inner_gutter = Some(true);
        let mut mesh = GroundMesh::new(2, 2);

        fixture.rewriter().rewrite(&mut mesh, &grid).unwrap();
        assert!(mesh.textures.index_of("c-2c-3c0c0.bmp").is_some());
    }
}
