//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` enum per categorizzare tutti gli errori possibili
//! - Separa gli errori per-file (recuperabili) da quelli di run (fatali)
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Scan`: Entry di directory non leggibile (skip e continua)
//! - `Backup`: Copia di backup fallita o non verificata
//! - `Metadata`: Il decoder non riesce a determinare formato o dimensioni
//! - `Transform`: Errore del codec durante re-encode/convert
//! - `Replace`: Sostituzione atomica del file fallita (originale intatto)
//! - `Run`: Errore di setup/teardown (backup root, report) - fatale
//! - `Config`: Configurazione non valida - fatale
//!
//! ## Esempio:
//! ```rust,ignore
//! if metadata.width == 0 {
//!     return Err(OptimizeError::Metadata("missing width".to_string()));
//! }
//! ```

/// Custom error types for image optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scan error: {0}")]
    Scan(String),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("Invalid image metadata: {0}")]
    Metadata(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Replace error: {0}")]
    Replace(String),

    #[error("Run error: {0}")]
    Run(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OptimizeError {
    /// Run-level errors abort the whole optimization; everything else only
    /// fails the file being processed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Run(_) | Self::Config(_))
    }
}
