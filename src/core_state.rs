//! Application state shared by every request handler.
//!
//! Built once in `run()`. Holds the resolved configuration and the model
//! manager; SQLite connections are opened per request from `db_path`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use thiserror::Error;

use crate::config::PortalConfig;
use crate::db::{self, DatabaseError};
use crate::inference::ModelManager;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Cannot prepare {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub struct CoreState {
    pub config: PortalConfig,
    pub models: Arc<ModelManager>,
}

impl CoreState {
    pub fn new(config: PortalConfig, models: Arc<ModelManager>) -> Self {
        Self { config, models }
    }

    /// Create the database (running migrations) and the upload directory.
    pub fn initialize(&self) -> Result<(), CoreError> {
        db::open_database(&self.config.db_path)?;
        let mri_dir = self.mri_dir();
        std::fs::create_dir_all(&mri_dir).map_err(|source| CoreError::Directory {
            path: mri_dir.clone(),
            source,
        })?;
        tracing::info!(
            db = %self.config.db_path.display(),
            uploads = %self.config.uploads_dir.display(),
            "Storage ready"
        );
        Ok(())
    }

    /// Fresh connection to the migrated database.
    pub fn open_db(&self) -> Result<Connection, CoreError> {
        Ok(db::connect(&self.config.db_path)?)
    }

    pub fn db_path(&self) -> &Path {
        &self.config.db_path
    }

    pub fn mri_dir(&self) -> PathBuf {
        self.config.uploads_dir.join("mri")
    }
}
