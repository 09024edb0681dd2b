//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di ottimizzazione
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `search_paths`: Directory in cui cercare immagini (default: percorsi asset comuni)
//! - `quality`: Qualità di re-encoding (1-100, default: 80)
//! - `format`: Formato intermedio di re-encoding (default: webp)
//! - `report_path`: File HTML del report (default: ./optimization-report.html)
//! - `backup_dir`: Directory di backup (default: ./images-backup, None = backup disabilitato)
//! - `json_output`: Eventi JSON su stdout (default: false)
//!
//! ## Precedenza:
//! default < file di configurazione < flag CLI
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     quality: 70,
//!     backup_dir: None,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Search paths used when neither the config file nor the CLI names any
pub const DEFAULT_SEARCH_PATHS: &[&str] = &[
    "./src/assets",
    "./src/assets/images",
    "./src/img",
    "./assets",
    "./assets/images",
    "./public/images",
    "./public/assets",
    "./app/assets",
    "./resources/images",
];

pub const DEFAULT_QUALITY: u8 = 80;
pub const DEFAULT_REPORT_PATH: &str = "./optimization-report.html";
pub const DEFAULT_BACKUP_DIR: &str = "./images-backup";

/// Intermediate encoding used for the lossy pass before converting back
/// to the original container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IntermediateFormat {
    #[default]
    Webp,
    Jpeg,
}

impl fmt::Display for IntermediateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Webp => write!(f, "webp"),
            Self::Jpeg => write!(f, "jpeg"),
        }
    }
}

/// Configuration for image optimization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories scanned recursively, in order
    pub search_paths: Vec<PathBuf>,
    /// Re-encode quality (1-100)
    pub quality: u8,
    /// Intermediate re-encode format
    pub format: IntermediateFormat,
    /// Where the HTML report is written
    pub report_path: PathBuf,
    /// Backup root (None = no backup)
    pub backup_dir: Option<PathBuf>,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_paths: DEFAULT_SEARCH_PATHS.iter().map(PathBuf::from).collect(),
            quality: DEFAULT_QUALITY,
            format: IntermediateFormat::default(),
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            backup_dir: Some(PathBuf::from(DEFAULT_BACKUP_DIR)),
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.quality == 0 || self.quality > 100 {
            return Err(anyhow::anyhow!("Quality must be between 1 and 100"));
        }

        if self.search_paths.is_empty() {
            return Err(anyhow::anyhow!("At least one search path is required"));
        }

        if self.report_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("Report path must not be empty"));
        }

        if let Some(ref backup_dir) = self.backup_dir {
            if backup_dir.as_os_str().is_empty() {
                return Err(anyhow::anyhow!("Backup directory must not be empty"));
            }
        }

        Ok(())
    }

    /// Default location of the user config file, if the platform has one
    pub fn default_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("image-optimizer").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
