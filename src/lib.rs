//! # Image Optimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom per diverse operazioni
//! - `file_manager`: Discovery immagini, formattazione dimensioni, sostituzione atomica
//! - `backup`: Backup degli originali prima della modifica
//! - `image_processor`: Probe e re-encoding delle immagini (JPEG/PNG/GIF/WebP)
//! - `results`: Aggregazione dei risultati e statistiche per directory
//! - `report`: Report HTML finale
//! - `optimizer`: Orchestratore principale del processo
//! - `progress`: Progress bar
//! - `json_output`: Eventi JSON per uso programmatico
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use image_optimizer::{Config, ImageOptimizer};
//!
//! let config = Config::default();
//! let optimizer = ImageOptimizer::new(config)?;
//! let results = optimizer.run().await?;
//! ```

pub mod backup;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod optimizer;
pub mod progress;
pub mod report;
pub mod results;

pub use config::{Config, IntermediateFormat};
pub use error::OptimizeError;
pub use file_manager::{FileManager, ImageFileRef, PathScanner};
pub use image_processor::{CodecTransform, ImageTransform};
pub use optimizer::ImageOptimizer;
pub use results::{OptimizationResult, OptimizationResults};
