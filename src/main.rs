// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use label_capture::config::Config;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "label-capture")]
#[command(about = "Auto-framing label capture for print inspection")]
#[command(version = label_capture::constants::app_info::version())]
struct Cli {
    /// Configuration file (default: ~/.config/label-capture/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Capture a label automatically once it is framed and in focus
    Capture {
        /// V4L2 device node (e.g. /dev/video0)
        #[arg(short, long, conflicts_with = "frames")]
        device: Option<String>,

        /// Replay image files instead of a camera
        #[arg(long, num_args = 1..)]
        frames: Vec<PathBuf>,

        /// Label width / height
        #[arg(short, long)]
        aspect: Option<f64>,

        /// Output file or directory (default: ~/Pictures/label-capture)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Give up after this many seconds
        #[arg(short, long, default_value = "60")]
        timeout: u64,

        /// Force a manual capture after this many seconds
        #[arg(long)]
        manual_after: Option<u64>,
    },

    /// Locate and normalize a label in a still image
    Normalize {
        /// Input image
        image: PathBuf,

        /// Label width / height
        #[arg(short, long)]
        aspect: Option<f64>,

        /// Output file or directory (default: ~/Pictures/label-capture)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Submit a master and a scan image to the comparison backend
    Compare {
        /// Reference label image
        #[arg(long)]
        master: PathBuf,

        /// Label image to verify
        #[arg(long)]
        scan: PathBuf,

        /// Backend URL (overrides the configuration)
        #[arg(long)]
        endpoint: Option<String>,

        #[arg(long)]
        operator: Option<String>,

        #[arg(long, default_value = "")]
        order: String,

        #[arg(long, default_value = "")]
        product: String,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control the log level, e.g. RUST_LOG=label_capture=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());

    match cli.command {
        Commands::List => cli::list_cameras(),
        Commands::Capture {
            device,
            frames,
            aspect,
            output,
            timeout,
            manual_after,
        } => cli::capture(
            config,
            cli::CaptureOptions {
                device,
                frames,
                aspect,
                output,
                timeout,
                manual_after,
            },
        ),
        Commands::Normalize {
            image,
            aspect,
            output,
        } => cli::normalize(config, image, aspect, output),
        Commands::Compare {
            master,
            scan,
            endpoint,
            operator,
            order,
            product,
            json,
        } => cli::compare(
            config,
            cli::CompareOptions {
                master,
                scan,
                endpoint,
                operator,
                order,
                product,
                json,
            },
        ),
    }
}
