use std::{fs, path::Path};

use anyhow::Context;
use cafs_fs::FsConfig;
use cafs_store_memory::MemoryStoreConfig;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tracing::info;

/// On-disk configuration of the `cafs` binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CafsConfig {
    pub node: FsConfig,
    pub store: MemoryStoreConfig,
}

impl CafsConfig {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("could not parse config file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self).context("could not serialize config")?;
        fs::write(path, text)
            .with_context(|| format!("could not write config file {}", path.display()))
    }
}

#[derive(Subcommand)]
pub enum CmdConfig {
    /// Creates the config file with default settings if it doesn't exist
    Init,
    /// Prints the effective configuration
    Show,
}

impl CmdConfig {
    pub fn run(self, config_file: &Path) -> anyhow::Result<()> {
        match self {
            Self::Init => {
                if config_file.exists() {
                    info!("config already exists at {}", config_file.display());
                    return Ok(());
                }
                CafsConfig::default().save(config_file)?;
                info!("wrote default config to {}", config_file.display());
            }
            Self::Show => {
                let config = CafsConfig::load(config_file)?;
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafs_fs::DeletePolicy;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = CafsConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CafsConfig::default());
    }

    #[test]
    fn init_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cafs.toml");
        CmdConfig::Init.run(&path).unwrap();
        assert!(path.exists());
        assert_eq!(CafsConfig::load(&path).unwrap(), CafsConfig::default());
    }

    #[test]
    fn partial_file_is_merged_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cafs.toml");
        fs::write(
            &path,
            "[node]\nnode_id = \"edge\"\ndelete_policy = \"unchecked\"\n\n[store]\ncase_sensitive = false\n",
        )
        .unwrap();

        let config = CafsConfig::load(&path).unwrap();
        assert_eq!(config.node.node_id, "edge");
        assert_eq!(config.node.delete_policy, DeletePolicy::Unchecked);
        assert_eq!(config.node.term, 1);
        assert!(!config.store.case_sensitive);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cafs.toml");
        fs::write(&path, "[node\n").unwrap();
        assert!(CafsConfig::load(&path).is_err());
    }
}
