//! # Backup Module
//!
//! Copia gli originali in un albero di backup prima di modificarli.
//!
//! ## Responsabilità:
//! - Crea la root di backup all'inizio del run (errore fatale se impossibile)
//! - Specchia la struttura delle directory relativa alla working directory
//! - Verifica la copia con un digest SHA-256 dell'originale e del backup
//!
//! Un errore di copia o verifica fa fallire solo il file corrente.

use crate::error::OptimizeError;
use crate::optimizer::path_resolver::PathResolver;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Mirrors original files into a backup tree
#[derive(Debug, Clone)]
pub struct BackupManager {
    root: PathBuf,
    working_dir: PathBuf,
}

impl BackupManager {
    pub fn new(backup_root: &Path, working_dir: &Path) -> Self {
        Self {
            root: PathResolver::normalize(backup_root, working_dir),
            working_dir: working_dir.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the backup root. Failing here aborts the run.
    pub async fn prepare(&self) -> Result<(), OptimizeError> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            OptimizeError::Run(format!(
                "Failed to create backup directory {}: {}",
                self.root.display(),
                e
            ))
        })
    }

    /// Where `file` lands inside the backup tree
    pub fn backup_path_for(&self, file: &Path) -> PathBuf {
        PathResolver::backup_path(file, &self.working_dir, &self.root)
    }

    /// Copy `file` verbatim into the backup tree and verify the copy
    pub async fn backup_file(&self, file: &Path) -> Result<PathBuf, OptimizeError> {
        let target = self.backup_path_for(file);
        let backup_err = |e: std::io::Error| {
            OptimizeError::Backup(format!(
                "Failed to back up {} to {}: {}",
                file.display(),
                target.display(),
                e
            ))
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(backup_err)?;
        }
        fs::copy(file, &target).await.map_err(backup_err)?;

        let original_digest = Self::digest(file).await.map_err(backup_err)?;
        let backup_digest = Self::digest(&target).await.map_err(backup_err)?;
        if original_digest != backup_digest {
            return Err(OptimizeError::Backup(format!(
                "Backup of {} does not match the original (sha256 {} != {})",
                file.display(),
                backup_digest,
                original_digest
            )));
        }

        debug!("Backed up {} -> {} (sha256 {})", file.display(), target.display(), &original_digest[..16]);
        Ok(target)
    }

    async fn digest(path: &Path) -> std::io::Result<String> {
        let content = fs::read(path).await?;
        let mut hasher = Sha256::new();
        hasher.update(&content);
        Ok(hex::encode(hasher.finalize()))
    }
}
