use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use flatmaps::{load_options, ContainerPackager, GenerationCoordinator, GeneratorConfig};

#[derive(Parser)]
#[command(name = "flatmaps")]
#[command(about = "Generates flattened maps and packs them into a container stream")]
struct Args {
    /// Map names to generate, without extension
    #[arg(required = true)]
    maps: Vec<String>,

    #[arg(long, default_value = "data")]
    input_maps: PathBuf,

    #[arg(long, default_value = "textures")]
    input_textures: PathBuf,

    #[arg(long, default_value = "output/textures")]
    output_textures: PathBuf,

    /// Container stream to write; entry placements land next to it as JSON
    #[arg(long, default_value = "output/flatmaps.pak")]
    output: PathBuf,

    /// Worker threads; defaults to the machine's parallelism
    #[arg(long)]
    jobs: Option<usize>,

    /// JSON file with generator option overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rebind existing tiles instead of flattening and rebuilding them
    #[arg(long)]
    rebind: bool,

    #[arg(long)]
    keep_original_textures: bool,

    #[arg(long)]
    texture_walls: bool,

    #[arg(long)]
    remove_lighting: bool,

    #[arg(long)]
    remove_objects: bool,

    #[arg(long)]
    remove_water: bool,

    #[arg(long)]
    show_gutter_lines: bool,

    #[arg(long)]
    reset_global_lighting: bool,

    #[arg(long)]
    stick_terrain_to_ground: bool,

    /// Prefix prepended to every generated texture name
    #[arg(long, default_value = "")]
    prefix: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut config = GeneratorConfig::new(&args.input_maps, &args.input_textures, &args.output_textures);
    if let Some(path) = &args.config {
        config.options = load_options(path)?;
    }
    if args.rebind {
        config.options.flatten_ground = false;
    }
    if args.keep_original_textures {
        config.options.use_custom_textures = false;
    }
    config.options.texture_walls |= args.texture_walls;
    config.options.remove_lighting |= args.remove_lighting;
    config.options.remove_objects |= args.remove_objects;
    config.options.remove_water |= args.remove_water;
    config.options.show_gutter_lines |= args.show_gutter_lines;
    config.options.reset_global_lighting |= args.reset_global_lighting;
    config.options.stick_terrain_to_ground |= args.stick_terrain_to_ground;
    if !args.prefix.is_empty() {
        config.options.texture_id_prefix = args.prefix.clone();
    }
    config.prepare()?;

    let jobs = args.jobs.unwrap_or_else(|| {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    });

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let packager = ContainerPackager::new(BufWriter::new(File::create(&args.output)?));
    let coordinator = GenerationCoordinator::new(config);
    let failures = coordinator.generate_all(&args.maps, jobs, &packager);

    let (_, entries) = packager.finish()?;
    let entries_path = args.output.with_extension("entries.json");
    std::fs::write(&entries_path, serde_json::to_vec_pretty(&entries)?)?;

    eprintln!(
        "{} of {} maps packed, placements in {}",
        args.maps.len() - failures,
        args.maps.len(),
        entries_path.display()
    );
    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}
