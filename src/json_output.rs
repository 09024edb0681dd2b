//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso programmatico
//! (script di build, CI).
//!
//! ## Responsabilità:
//! - Emette un oggetto JSON per riga su stdout per ogni evento del run
//! - Riusa le strutture di `results` per non duplicare i dati
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio processo, immagini trovate e configurazione
//! - `file_complete`: Immagine ottimizzata con successo
//! - `file_error`: Immagine fallita (il run continua)
//! - `complete`: Fine processo con statistiche finali
//! - `error`: Errore fatale del run

use crate::config::Config;
use crate::results::{OptimizationResult, OptimizationResults};
use serde::Serialize;
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio del processo di ottimizzazione
    #[serde(rename = "start")]
    Start {
        search_paths: Vec<PathBuf>,
        total_images: usize,
        source_directories: usize,
        config: JsonConfig,
    },

    /// Immagine ottimizzata
    #[serde(rename = "file_complete")]
    FileComplete {
        path: PathBuf,
        original_size: u64,
        optimized_size: u64,
        original_dimensions: String,
        reduction_percent: f64,
    },

    /// Immagine fallita
    #[serde(rename = "file_error")]
    FileError { path: PathBuf, error: String },

    /// Processo completato
    #[serde(rename = "complete")]
    Complete {
        total_images: usize,
        images_optimized: usize,
        errors: usize,
        total_size_before: u64,
        total_size_after: u64,
        reduction_percent: f64,
        report_path: Option<PathBuf>,
        duration_seconds: f64,
    },

    /// Errore generale
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize)]
pub struct JsonConfig {
    pub quality: u8,
    pub format: String,
    pub backup_dir: Option<PathBuf>,
    pub report_path: PathBuf,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    /// Crea un messaggio di inizio
    pub fn start(config: &Config, total_images: usize, source_directories: usize) -> Self {
        Self::Start {
            search_paths: config.search_paths.clone(),
            total_images,
            source_directories,
            config: JsonConfig::from(config),
        }
    }

    /// Crea un messaggio di completamento file
    pub fn file_complete(path: PathBuf, result: &OptimizationResult) -> Self {
        Self::FileComplete {
            path,
            original_size: result.original_size,
            optimized_size: result.optimized_size,
            original_dimensions: result.original_dimensions.clone(),
            reduction_percent: result.reduction_percent,
        }
    }

    /// Crea un messaggio di errore per file
    pub fn file_error(path: PathBuf, error: String) -> Self {
        Self::FileError { path, error }
    }

    /// Crea un messaggio di completamento generale
    pub fn complete(
        results: &OptimizationResults,
        report_path: Option<PathBuf>,
        duration_seconds: f64,
    ) -> Self {
        Self::Complete {
            total_images: results.total_images,
            images_optimized: results.optimized_count(),
            errors: results.failed_count(),
            total_size_before: results.total_size_before,
            total_size_after: results.total_size_after,
            reduction_percent: results.overall_reduction_percent(),
            report_path,
            duration_seconds,
        }
    }

    /// Crea un messaggio di errore
    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

/// Converti Config esistente in JsonConfig
impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            quality: config.quality,
            format: config.format.to_string(),
            backup_dir: config.backup_dir.clone(),
            report_path: config.report_path.clone(),
        }
    }
}
