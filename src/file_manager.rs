//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file e la discovery delle immagini.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva (depth-first) di immagini nelle search path
//! - Filtro per estensione (jpg, jpeg, png, gif - case-insensitive)
//! - Sostituzione atomica dei file (temp file + rename)
//! - Utilità per calcoli dimensioni e percentuali
//! - Formattazione human-readable delle dimensioni
//!
//! ## Politica di scansione:
//! - Search path inesistente: nessun risultato, nessun errore
//! - Entry non leggibile: warning e skip, la scansione continua
//! - Ordine deterministico (ordinamento per nome dentro ogni directory)
//! - La root di backup viene esclusa dalla discovery
//!
//! ## Sicurezza operazioni:
//! - I byte ottimizzati vengono scritti in un file temporaneo nella stessa directory
//! - Il rename sovrascrive l'originale solo a scrittura completata
//! - In caso di errore l'originale resta intatto e il temporaneo viene rimosso
//!
//! ## Esempio:
//! ```rust,ignore
//! let scanner = PathScanner::new(&working_dir);
//! for image in scanner.scan(Path::new("./assets")) {
//!     println!("{} in {}", image.name, image.directory.display());
//! }
//! ```

use crate::error::OptimizeError;
use crate::optimizer::path_resolver::PathResolver;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extensions picked up by the scanner (compared lowercase)
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// An image discovered under a search path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageFileRef {
    /// Normalized absolute path of the file
    pub path: PathBuf,
    /// Base file name
    pub name: String,
    /// Normalized absolute path of the containing directory
    pub directory: PathBuf,
}

impl ImageFileRef {
    fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().into_owned();
        let directory = path.parent()?.to_path_buf();
        Some(Self {
            path: path.to_path_buf(),
            name,
            directory,
        })
    }
}

/// Recursively enumerates images below a search path
#[derive(Debug, Clone)]
pub struct PathScanner {
    working_dir: PathBuf,
    excluded: Vec<PathBuf>,
}

impl PathScanner {
    pub fn new(working_dir: &Path) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
            excluded: Vec::new(),
        }
    }

    /// Skip everything below `dir` (used for the backup root)
    pub fn exclude(mut self, dir: &Path) -> Self {
        self.excluded.push(PathResolver::normalize(dir, &self.working_dir));
        self
    }

    /// Find all supported images below `root`, depth-first, sorted by name
    /// within each directory. A missing root yields nothing.
    pub fn scan(&self, root: &Path) -> Vec<ImageFileRef> {
        let root = PathResolver::normalize(root, &self.working_dir);

        if !root.exists() {
            debug!("Search path does not exist, skipping: {}", root.display());
            return Vec::new();
        }
        if !root.is_dir() {
            warn!("Search path is not a directory, skipping: {}", root.display());
            return Vec::new();
        }

        let mut images = Vec::new();
        let walker = WalkDir::new(&root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let err = OptimizeError::Scan(e.to_string());
                    warn!("Skipping unreadable entry: {}", err);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !FileManager::is_supported_image(entry.path()) {
                continue;
            }

            match ImageFileRef::from_path(entry.path()) {
                Some(image) => images.push(image),
                None => warn!("Skipping entry without a file name: {}", entry.path().display()),
            }
        }

        debug!("Found {} images under {}", images.len(), root.display());
        images
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded.iter().any(|excluded| path.starts_with(excluded))
    }
}

/// Manages file operations and size bookkeeping
pub struct FileManager;

impl FileManager {
    /// Get the size of a file in bytes
    pub async fn get_file_size(path: &Path) -> io::Result<u64> {
        Ok(tokio::fs::metadata(path).await?.len())
    }

    /// Check if a file has one of the supported image extensions
    pub fn is_supported_image(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext_lower.as_str())
        } else {
            false
        }
    }

    /// Atomically replace `original` with `contents`.
    ///
    /// The bytes go to a temp file next to the original, which then gets
    /// renamed over it. The original is untouched if anything fails.
    pub fn replace_file(original: &Path, contents: &[u8]) -> Result<(), OptimizeError> {
        Self::replace_file_with(original, contents, |from, to| fs::rename(from, to))
    }

    /// `replace_file` with a pluggable rename step
    pub fn replace_file_with<F>(
        original: &Path,
        contents: &[u8],
        rename: F,
    ) -> Result<(), OptimizeError>
    where
        F: FnOnce(&Path, &Path) -> io::Result<()>,
    {
        let parent = match original.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = original
            .file_name()
            .ok_or_else(|| OptimizeError::Replace(format!("Invalid file name: {}", original.display())))?
            .to_string_lossy();

        let replace_err = |e: io::Error| {
            OptimizeError::Replace(format!("Failed to replace {}: {}", original.display(), e))
        };

        let mut temp = tempfile::Builder::new()
            .prefix(&format!(".{}.", file_name))
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(replace_err)?;

        temp.write_all(contents).map_err(replace_err)?;
        temp.as_file().sync_all().map_err(replace_err)?;

        // Temp files are created 0600, keep the original's mode instead
        let permissions = fs::metadata(original).map_err(replace_err)?.permissions();
        fs::set_permissions(temp.path(), permissions).map_err(replace_err)?;

        // Dropping the temp path removes the temp file if the rename fails
        let temp_path = temp.into_temp_path();
        rename(&temp_path, original).map_err(replace_err)?;
        temp_path
            .keep()
            .map_err(|e| OptimizeError::Replace(e.to_string()))?;

        debug!("Replaced {} ({} bytes)", original.display(), contents.len());
        Ok(())
    }

    /// Human-readable byte count: largest power of 1024 not above the value,
    /// at most two decimals, "0 Byte" for zero
    pub fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];
        if bytes == 0 {
            return "0 Byte".to_string();
        }

        let mut unit_index = 0;
        let mut divisor = 1u64;
        while unit_index < UNITS.len() - 1 && bytes / divisor >= 1024 {
            divisor *= 1024;
            unit_index += 1;
        }

        let value = ((bytes as f64 / divisor as f64) * 100.0).round() / 100.0;
        format!("{} {}", value, UNITS[unit_index])
    }

    /// Percentage reduction rounded to two decimals. Negative when the file
    /// grew, 0 for a zero-byte original.
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            return 0.0;
        }
        let reduction = (original_size as f64 - new_size as f64) / original_size as f64 * 100.0;
        round2(reduction)
    }
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
