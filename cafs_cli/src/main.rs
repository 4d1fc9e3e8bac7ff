use crate::config::{CafsConfig, CmdConfig};
use anyhow::Context;
use cafs_fs::FileSystem;
use cafs_store_memory::MemoryStore;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::InfoLevel;
use directories::ProjectDirs;
use std::{io::Read, path::PathBuf};

mod config;
mod demo;
mod script;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// config file to use instead of the per-user default
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<InfoLevel>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the cafs config file
    Config {
        #[command(subcommand)]
        cmd: CmdConfig,
    },
    /// Execute a command script against a fresh in-memory file system
    Run {
        /// Script file, or `-` for stdin
        script: PathBuf,
    },
    /// Walk through the consistency guarantees on a fresh in-memory node
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config_file = match cli.config {
        Some(path) => path,
        None => ProjectDirs::from("", "", "cafs")
            .context("failed to determine config directory path")?
            .config_dir()
            .join("cafs.toml"),
    };

    match cli.cmd {
        Commands::Config { cmd } => cmd.run(&config_file),
        Commands::Run { script } => {
            let text = if script.as_os_str() == "-" {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .context("could not read script from stdin")?;
                text
            } else {
                std::fs::read_to_string(&script)
                    .with_context(|| format!("could not read script {}", script.display()))?
            };
            let fs = open_fs(&config_file)?;
            script::run_script(&fs, &text, &mut std::io::stdout()).await
        }
        Commands::Demo => {
            let fs = open_fs(&config_file)?;
            demo::run(&fs, &mut std::io::stdout()).await?;
            Ok(())
        }
    }
}

fn open_fs(config_file: &std::path::Path) -> anyhow::Result<FileSystem> {
    let config = CafsConfig::load(config_file)?;
    tracing::debug!(node = %config.node.node_id, term = config.node.term, "opening file system");
    let content = MemoryStore::create(config.store).to_content_store();
    Ok(FileSystem::open(&config.node, content))
}
