//! # Optimizer Module
//!
//! Modulo che separa le responsabilità in sottomoduli:
//! - `image_optimizer`: Orchestratore principale
//! - `task_optimizer`: Pipeline per singoli file
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod image_optimizer;
pub mod path_resolver;
pub mod task_optimizer;

pub use image_optimizer::ImageOptimizer;
pub use path_resolver::PathResolver;
pub use task_optimizer::{FileFailure, FileStage, TaskOptimizer};
