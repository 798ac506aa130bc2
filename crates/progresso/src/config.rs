//! Runtime settings: CLI flags first, then environment / `.env`, then defaults.

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::path::PathBuf;

use crate::db::SqliteStore;
use crate::store::{DynStore, FileStore, MemoryStore};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "data";

/// File name of the SQLite database inside the data directory
pub const SQLITE_FILE: &str = "progresso.db";

/// Which backend holds the progress blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StoreKind {
    /// One JSON file per key in the data directory
    #[default]
    File,
    /// A SQLite database in the data directory
    Sqlite,
    /// Kept in memory only; progress is lost on exit
    Memory,
}

/// Values given explicitly on the command line
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub store: Option<StoreKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub store: StoreKind,
}

impl Settings {
    /// Resolve settings from CLI overrides and the process environment.
    ///
    /// Reads `PROGRESSO_DATA_DIR` and `PROGRESSO_STORE`, either from the
    /// environment or from a `.env` file.
    pub fn from_env(overrides: Overrides) -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    fn resolve(overrides: Overrides, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = match overrides.data_dir {
            Some(dir) => dir,
            None => lookup("PROGRESSO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        };

        let store = match overrides.store {
            Some(kind) => kind,
            None => match lookup("PROGRESSO_STORE") {
                Some(raw) => StoreKind::from_str(&raw, true)
                    .map_err(|e| anyhow::anyhow!(e))
                    .context("Invalid PROGRESSO_STORE")?,
                None => StoreKind::default(),
            },
        };

        Ok(Self { data_dir, store })
    }

    /// Open the configured backend
    pub fn open_store(&self) -> Result<DynStore> {
        let store: DynStore = match self.store {
            StoreKind::File => Box::new(FileStore::new(&self.data_dir)),
            StoreKind::Sqlite => {
                let path = self.data_dir.join(SQLITE_FILE);
                let store = SqliteStore::open(&path)
                    .with_context(|| format!("Failed to open database at {}", path.display()))?;
                Box::new(store)
            }
            StoreKind::Memory => Box::new(MemoryStore::new()),
        };
        Ok(store)
    }
}

/// Port for the web server: `--port`, then `PROGRESSO_PORT`, then [`DEFAULT_PORT`].
///
/// Only `serve` asks for it; other commands ignore `PROGRESSO_PORT`.
/// Call after [`Settings::from_env`] so `.env` has been loaded.
pub fn server_port(flag: Option<u16>) -> Result<u16> {
    resolve_port(flag, |key| std::env::var(key).ok())
}

fn resolve_port(flag: Option<u16>, lookup: impl Fn(&str) -> Option<String>) -> Result<u16> {
    if let Some(port) = flag {
        return Ok(port);
    }
    match lookup("PROGRESSO_PORT") {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid PROGRESSO_PORT: {}", raw)),
        None => Ok(DEFAULT_PORT),
    }
}
