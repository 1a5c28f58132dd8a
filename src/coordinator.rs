//! Orchestrates one map generation end to end and owns the caches shared
//! by every concurrent map worker.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::config::GeneratorConfig;
use crate::container::ContainerPackager;
use crate::error::{Error, Result};
use crate::formats::world::{self, WATER_IN_GROUND_VERSION};
use crate::formats::{GroundMesh, TerrainGrid, WorldDescriptor};
use crate::rewrite::GroundRewriter;
use crate::texture::paths::GeneratedPaths;
use crate::texture::pixels::PixelCache;
use crate::texture::variants::{TextureDir, VariantResolver};

/// Shared entry point for generating flattened maps. One instance serves
/// any number of worker threads; per-map state never leaves its worker.
pub struct GenerationCoordinator {
    config: GeneratorConfig,
    pixels: PixelCache,
    generated: GeneratedPaths,
    wall_seeded: AtomicBool,
}

impl GenerationCoordinator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            pixels: PixelCache::new(),
            generated: GeneratedPaths::new(),
            wall_seeded: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate one map from the input map directory and pack its three
    /// descriptors into the container.
    pub fn generate<W: Write>(&self, map_name: &str, packager: &ContainerPackager<W>) -> Result<()> {
        let grid_bytes = std::fs::read(self.config.map_file(map_name, "gat"))?;
        let world_bytes = std::fs::read(self.config.map_file(map_name, "rsw"))?;
        let mesh_bytes = std::fs::read(self.config.map_file(map_name, "gnd"))?;
        self.generate_from_bytes(map_name, &grid_bytes, &world_bytes, &mesh_bytes, packager)
    }

    /// Same as [`generate`](Self::generate) with descriptor bytes already
    /// in hand.
    pub fn generate_from_bytes<W: Write>(
        &self,
        map_name: &str,
        grid_bytes: &[u8],
        world_bytes: &[u8],
        mesh_bytes: &[u8],
        packager: &ContainerPackager<W>,
    ) -> Result<()> {
        let options = &self.config.options;
        let world_version = world::peek_version(world_bytes)?;
        let water_level = world::peek_water_level(world_bytes)?;

        let mut grid = TerrainGrid::load(grid_bytes)?;
        if world_version < WATER_IN_GROUND_VERSION {
            grid.identify_water_cells(water_level);
        }
        if options.flatten_ground {
            grid.set_cell_heights(0.0);
        }
        if options.show_gutter_lines {
            grid.identify_gutter_lines();
        }

        let mut mesh = GroundMesh::load(mesh_bytes)?;
        if grid.width != 2 * mesh.width || grid.height != 2 * mesh.height {
            return Err(Error::format(
                "ground",
                format!(
                    "mesh {}x{} does not pair with terrain grid {}x{}",
                    mesh.width, mesh.height, grid.width, grid.height
                ),
            ));
        }
        mesh.clamp_version();
        if options.flatten_ground {
            mesh.set_cubes_height(0.0);
        }
        if options.remove_lighting {
            mesh.remove_lightmaps();
        }
        if options.use_custom_textures {
            mesh.reset_textures();
            if options.flatten_ground {
                mesh.remove_all_tiles();
            }
            let resolver = VariantResolver::new(TextureDir::new(&self.config.input_texture_dir));
            let mut rewriter = GroundRewriter::new(
                &self.config,
                &self.pixels,
                &self.generated,
                &self.wall_seeded,
                resolver,
                StdRng::from_entropy(),
            );
            rewriter.rewrite(&mut mesh, &grid)?;
            debug!(map = map_name, textures = mesh.textures.len(), "ground mesh rewritten");
        }

        let world = self.configure_world(world_bytes, map_name, &mesh)?;
        if options.stick_terrain_to_ground {
            grid.snap_to_mesh(&mesh);
        }

        // one map's three entries stay contiguous in the output
        let _commit = packager.commit_lock();
        packager.append(&format!("data\\{map_name}.gat"), &grid.save())?;
        packager.append(&format!("data\\{map_name}.rsw"), &world.save()?)?;
        packager.append(&format!("data\\{map_name}.gnd"), &mesh.save()?)?;
        info!(map = map_name, "map packed");
        Ok(())
    }

    fn configure_world(&self, world_bytes: &[u8], map_name: &str, mesh: &GroundMesh) -> Result<WorldDescriptor> {
        let options = &self.config.options;
        if options.flatten_ground {
            let mut world = WorldDescriptor::create_empty(map_name);
            if !options.reset_global_lighting {
                // keep the original sun, defaults cover the rest
                let original = WorldDescriptor::load(world_bytes)?;
                world.light.longitude = original.light.longitude;
                world.light.latitude = original.light.latitude;
                world.light.diffuse = original.light.diffuse;
                world.light.ambient = original.light.ambient;
            }
            return Ok(world);
        }

        let mut world = WorldDescriptor::load(world_bytes)?;
        if options.reset_global_lighting {
            world.reset_light();
        }
        if options.remove_objects {
            world.remove_objects();
        }
        if options.remove_water {
            world.water.reset();
            let floor = mesh.min_height();
            if floor.is_finite() {
                // push the surface well below the lowest cube
                world.water.level = -(floor - 100.0);
            }
        }
        Ok(world)
    }

    /// Generate a batch of maps on `jobs` blocking worker threads sharing
    /// this coordinator. A failing map is logged and skipped; it never
    /// aborts its siblings. Returns the number of failures.
    pub fn generate_all<W: Write + Send>(
        &self,
        maps: &[String],
        jobs: usize,
        packager: &ContainerPackager<W>,
    ) -> usize {
        let queue: Mutex<VecDeque<String>> = Mutex::new(maps.iter().cloned().collect());
        let failures = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..jobs.max(1) {
                scope.spawn(|| loop {
                    let next = queue
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .pop_front();
                    let Some(map_name) = next else { break };
                    if let Err(err) = self.generate(&map_name, packager) {
                        warn!(map = %map_name, error = %err, "map generation failed");
                        failures.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });

        failures.load(Ordering::Relaxed)
    }
}
