//! nether-pose - glTF/GLB skeleton and animation inspector
//!
//! Loads a .gltf or .glb file (external buffers are read relative to it) and
//! reports its meshes, skeletons, animation clips, or a sampled pose.

use anyhow::Result;
use clap::{Parser, Subcommand};
use nether_gltf::{DEFAULT_MAX_CHUNKS, DEFAULT_MAX_JOINT_DEPTH, Limits};
use std::path::PathBuf;

mod loader;
mod report;

#[derive(Parser)]
#[command(name = "nether-pose")]
#[command(about = "Inspect glTF skeletons and sample animation poses")]
#[command(version)]
struct Cli {
    /// Maximum ancestors of any joint before the hierarchy is treated as cyclic
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_JOINT_DEPTH)]
    max_joint_depth: usize,

    /// Maximum chunks scanned in a GLB container
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_CHUNKS)]
    max_glb_chunks: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize buffers, meshes, skins and animations
    Info {
        /// Input glTF/GLB file
        input: PathBuf,
    },

    /// List a skin's joints in evaluation order
    Skeleton {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Skin index (default: first skin)
        #[arg(short, long, default_value_t = 0)]
        skin: usize,
    },

    /// List animation clips with track counts and durations
    Animations {
        /// Input glTF/GLB file
        input: PathBuf,
    },

    /// Print each joint's world position at one point of a clip
    Pose {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Animation name
        #[arg(short, long)]
        animation: String,

        /// Skin index (default: first skin)
        #[arg(short, long, default_value_t = 0)]
        skin: usize,

        /// Sample time in seconds
        #[arg(short, long, default_value_t = 0.0)]
        time: f32,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let limits = Limits {
        max_glb_chunks: cli.max_glb_chunks,
        max_joint_depth: cli.max_joint_depth,
    };

    match cli.command {
        Commands::Info { input } => {
            let document = loader::load_document(&input, &limits).await?;
            report::info(&input, &document)?;
        }

        Commands::Skeleton { input, skin } => {
            let document = loader::load_document(&input, &limits).await?;
            report::skeleton(&document, skin, &limits)?;
        }

        Commands::Animations { input } => {
            let document = loader::load_document(&input, &limits).await?;
            report::animations(&input, &document)?;
        }

        Commands::Pose {
            input,
            animation,
            skin,
            time,
        } => {
            let document = loader::load_document(&input, &limits).await?;
            report::pose(&document, &animation, skin, time, &limits)?;
        }
    }

    Ok(())
}
