use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nimbus_raster::texture_height;
use nimbus_scene::ply::{import_ply, load_scene_file};
use nimbus_scene::PackedSplats;

#[derive(Parser)]
#[command(name = "nimbus")]
#[command(about = "Interactive 3D Gaussian Splatting viewer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a scene in the interactive viewer
    View {
        /// Scene file (.ply or .splat)
        file: PathBuf,

        /// Opacity-byte cutoff in [1, 255]; splats below it are culled
        #[arg(long, default_value_t = 1)]
        alpha_cutoff: u8,
    },

    /// Print a summary of a scene file
    Info {
        /// Scene file (.ply or .splat)
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::View { file, alpha_cutoff } => {
            let packed = load_scene_file(&file)
                .with_context(|| format!("loading scene from {}", file.display()))?;
            tracing::info!(splats = packed.count(), file = %file.display(), "scene packed");
            nimbus_render::run(packed, alpha_cutoff)
        }

        Commands::Info { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;

            match file.extension().and_then(|e| e.to_str()) {
                Some("splat") => {
                    let packed = PackedSplats::from_bytes(&bytes)?;
                    println!("{}: {} splats (packed)", file.display(), packed.count());
                    println!(
                        "covariance texture: 2048 x {}",
                        texture_height(packed.count())
                    );
                }
                _ => {
                    let cloud = import_ply(&bytes)
                        .with_context(|| format!("parsing {}", file.display()))?;
                    println!("{}: {} splats", file.display(), cloud.len());
                    if let Some((min, max, centroid)) = cloud.bounds() {
                        println!(
                            "bounds: [{:.3} {:.3} {:.3}] .. [{:.3} {:.3} {:.3}]",
                            min[0], min[1], min[2], max[0], max[1], max[2]
                        );
                        println!(
                            "centroid: [{:.3} {:.3} {:.3}]",
                            centroid[0], centroid[1], centroid[2]
                        );
                    }
                    println!(
                        "covariance texture: 2048 x {}",
                        texture_height(cloud.len())
                    );
                }
            }
            Ok(())
        }
    }
}
