mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parsecast_core::context::ServerConfigExt;
use parsecast_types::ServerConfig;

#[derive(Parser)]
#[command(version, about = "Live combat telemetry relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Receive telemetry over UDP and publish it to viewers
    Serve {
        #[arg(short = 'p', long)]
        udp_port: Option<u16>,
        /// Accept any upload key as its own owner
        #[arg(long)]
        dev: bool,
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        /// Read config from this file instead of the user config
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Summarize an archived encounter directory
    Replay {
        #[arg(short, long)]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            udp_port,
            dev,
            data_dir,
            config,
        } => {
            let overrides = commands::ServeOverrides {
                udp_port,
                dev,
                data_dir,
            };
            let config = commands::load_config(config.as_deref(), overrides)?;
            let _log_guard = logging::init(config.dev_mode, &config.data_dir());
            commands::serve(config).await
        }
        Commands::Replay { dir } => {
            let config = ServerConfig::load();
            let _log_guard = logging::init(false, &config.data_dir());
            commands::replay(&dir, &config)
        }
    }
}
