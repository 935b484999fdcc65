//! Command implementations.

mod broadcast;
mod list;
mod validate;

pub use broadcast::run_broadcast;
pub use list::run_list;
pub use validate::run_validate;

use std::path::{Path, PathBuf};

use config_loader::{ConfigLoader, FanoutConfig};
use dispatcher::DirectorySource;
use gateway::FileGateway;
use tracing::info;

use crate::error::{CliError, Result};

/// Load configuration (defaults when the file is absent) and apply `--store`
fn load_config(path: &Path, store: Option<&PathBuf>) -> Result<FanoutConfig> {
    let mut config = ConfigLoader::load_or_default(path)
        .map_err(|e| CliError::config_load(path, e.to_string()))?;

    if let Some(store) = store {
        info!(store = %store.display(), "Overriding store path from CLI");
        config.store.path = store.clone();
    }
    Ok(config)
}

/// Directory source and file gateway over the configured store
fn open_store(config: &FanoutConfig) -> (DirectorySource, FileGateway) {
    let source =
        DirectorySource::new(&config.store.path).with_dirs_only(config.store.dirs_only);
    let gateway = FileGateway::new(&config.store.path);
    (source, gateway)
}
