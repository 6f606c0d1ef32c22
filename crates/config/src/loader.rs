use std::{
    path::{Path, PathBuf},
    sync::RwLock,
};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env, error::Error, schema::LedgerlockConfig, validate::validate,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "ledgerlock.toml",
    "ledgerlock.yaml",
    "ledgerlock.yml",
    "ledgerlock.json",
];

const DATABASE_FILENAME: &str = "ledgerlock.db";

static DATA_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Load, substitute, parse and validate the config at `path` (any supported format).
pub fn load_config(path: &Path) -> Result<LedgerlockConfig, Error> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    let config = parse_config(&raw, path)?;
    validate(&config)?;
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./ledgerlock.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/ledgerlock/ledgerlock.{toml,yaml,yml,json}` (user-global)
///
/// Returns `LedgerlockConfig::default()` if no config file is found or the
/// file found cannot be used.
pub fn discover_and_load() -> LedgerlockConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    LedgerlockConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/ledgerlock/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "ledgerlock").map(|d| d.config_dir().to_path_buf())
}

/// Override the data directory for the rest of the process.
pub fn set_data_dir(dir: PathBuf) {
    *DATA_DIR_OVERRIDE
        .write()
        .unwrap_or_else(|e| e.into_inner()) = Some(dir);
}

pub fn clear_data_dir() {
    *DATA_DIR_OVERRIDE
        .write()
        .unwrap_or_else(|e| e.into_inner()) = None;
}

/// The data directory: the override if set, else the platform data dir
/// (`~/.local/share/ledgerlock/` on Linux), else `./.ledgerlock`.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = DATA_DIR_OVERRIDE
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
    {
        return dir;
    }
    directories::ProjectDirs::from("", "", "ledgerlock")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".ledgerlock"))
}

/// The SQLite file the vault lives in.
pub fn database_path(config: &LedgerlockConfig) -> PathBuf {
    config
        .vault
        .database_path
        .clone()
        .unwrap_or_else(|| data_dir().join(DATABASE_FILENAME))
}

fn parse_config(raw: &str, path: &Path) -> Result<LedgerlockConfig, Error> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    let parse_err = |message: String| Error::Parse {
        path: path.to_path_buf(),
        message,
    };

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "json" => serde_json::from_str(raw).map_err(|e| parse_err(e.to_string())),
        _ => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}
