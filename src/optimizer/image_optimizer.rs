//! # Image Optimizer Main Orchestrator
//!
//! Orchestratore principale che delega responsabilità ai moduli specializzati:
//! scan → backup → transform (file per file) → aggregazione → report.
//!
//! I file vengono elaborati in sequenza, nell'ordine di scansione. Solo gli
//! errori di setup/teardown (root di backup, scrittura del report) fermano il
//! run; gli errori dei singoli file vengono loggati e il run continua.

use crate::{
    backup::BackupManager,
    config::Config,
    file_manager::{FileManager, ImageFileRef, PathScanner},
    image_processor::{CodecTransform, ImageTransform},
    json_output::JsonMessage,
    optimizer::{path_resolver::PathResolver, task_optimizer::TaskOptimizer},
    progress::ProgressManager,
    report::ReportRenderer,
    results::OptimizationResults,
};
use anyhow::Result;
use chrono::Local;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Orchestratore principale
pub struct ImageOptimizer {
    config: Config,
    working_dir: PathBuf,
    transform: Arc<dyn ImageTransform>,
}

impl ImageOptimizer {
    /// Crea nuova istanza dell'ottimizzatore nella directory corrente
    pub fn new(config: Config) -> Result<Self> {
        let working_dir = std::env::current_dir()?;
        Self::with_working_dir(config, &working_dir)
    }

    /// Crea nuova istanza con una working directory esplicita: search path,
    /// backup e report relativi vengono risolti rispetto a questa
    pub fn with_working_dir(config: Config, working_dir: &Path) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            working_dir: PathResolver::normalize(working_dir, working_dir),
            transform: Arc::new(CodecTransform::new()),
        })
    }

    /// Sostituisce il codec (usato nei test)
    pub fn with_transform(mut self, transform: Arc<dyn ImageTransform>) -> Self {
        self.transform = transform;
        self
    }

    pub fn report_path(&self) -> PathBuf {
        PathResolver::normalize(&self.config.report_path, &self.working_dir)
    }

    /// Trova tutte le immagini in tutte le search path, senza duplicati
    pub fn discover(&self) -> Vec<ImageFileRef> {
        let mut scanner = PathScanner::new(&self.working_dir);
        if let Some(ref backup_dir) = self.config.backup_dir {
            scanner = scanner.exclude(backup_dir);
        }

        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for search_path in &self.config.search_paths {
            for image in scanner.scan(search_path) {
                // Symlinked search paths can reach the same file twice
                let key = std::fs::canonicalize(&image.path).unwrap_or_else(|_| image.path.clone());
                if seen.insert(key) {
                    files.push(image);
                } else {
                    debug!("Already discovered through another search path: {}", image.path.display());
                }
            }
        }
        files
    }

    /// Esegue il processo di ottimizzazione
    pub async fn run(&self) -> Result<OptimizationResults> {
        let start_time = Instant::now();

        info!("🔍 Searching for images...");
        let files = self.discover();

        let mut results = OptimizationResults::new();
        for file in &files {
            results.add_discovered(file);
        }

        self.emit_start_message(&results);

        if files.is_empty() {
            self.handle_no_images(start_time);
            return Ok(results);
        }

        let backup = match self.config.backup_dir {
            Some(ref backup_dir) => {
                let manager = BackupManager::new(backup_dir, &self.working_dir);
                manager.prepare().await?;
                debug!("Backup root ready: {}", manager.root().display());
                Some(manager)
            }
            None => None,
        };

        let task_optimizer = TaskOptimizer::new(
            Arc::clone(&self.transform),
            backup,
            self.config.format,
            self.config.quality,
        );

        self.process_files(&task_optimizer, &files, &mut results).await;

        let report_path = self.report_path();
        ReportRenderer::new(&self.working_dir)
            .write(&results, &report_path, &Local::now())
            .await?;

        self.print_final_stats(&results, &report_path, start_time.elapsed().as_secs_f64());

        Ok(results)
    }

    /// Processa i file uno alla volta, nell'ordine di scansione
    async fn process_files(
        &self,
        task_optimizer: &TaskOptimizer,
        files: &[ImageFileRef],
        results: &mut OptimizationResults,
    ) {
        let progress = if self.config.json_output {
            ProgressManager::hidden()
        } else {
            ProgressManager::new(files.len() as u64)
        };

        for file in files {
            let shown = PathResolver::display_path(&file.path, &self.working_dir);
            progress.set_message(&format!("Optimizing {}", file.name));

            match task_optimizer.process_single_file(file).await {
                Ok(result) => {
                    info!(
                        "✓ {} {} → {} ({:.2}%)",
                        shown,
                        FileManager::format_bytes(result.original_size),
                        FileManager::format_bytes(result.optimized_size),
                        result.reduction_percent
                    );
                    if result.reduction_percent < 0.0 {
                        warn!("{} grew after re-encoding", shown);
                    }
                    if self.config.json_output {
                        JsonMessage::file_complete(file.path.clone(), &result).emit();
                    }
                    progress.update(&format!("✓ {}: {:.2}%", file.name, result.reduction_percent));
                    results.add_result(result);
                }
                Err(failure) => {
                    error!("❌ Failed to optimize {}: {}", shown, failure);
                    if self.config.json_output {
                        JsonMessage::file_error(file.path.clone(), failure.to_string()).emit();
                    }
                    progress.update(&format!("✗ {}", file.name));
                }
            }
        }

        progress.finish(&format!(
            "Optimized {}/{} images",
            results.optimized_count(),
            results.total_images
        ));
    }

    /// Invia messaggio di inizio
    fn emit_start_message(&self, results: &OptimizationResults) {
        if self.config.json_output {
            JsonMessage::start(
                &self.config,
                results.total_images,
                results.source_directories.len(),
            )
            .emit();
        }

        info!("📁 Directories: {}", results.source_directories.len());
        info!("🖼️ Images: {}", results.total_images);
        info!(
            "Mode: re-encode through {} at quality {}",
            self.config.format, self.config.quality
        );
        match self.config.backup_dir {
            Some(ref backup_dir) => info!("Backup: {}", backup_dir.display()),
            None => info!("Backup: disabled"),
        }
    }

    /// Gestisce nessuna immagine trovata
    fn handle_no_images(&self, start_time: Instant) {
        warn!("⚠️ No images found in the configured search paths");
        if self.config.json_output {
            JsonMessage::complete(
                &OptimizationResults::new(),
                None,
                start_time.elapsed().as_secs_f64(),
            )
            .emit();
        }
    }

    /// Stampa statistiche finali
    fn print_final_stats(&self, results: &OptimizationResults, report_path: &Path, duration: f64) {
        if self.config.json_output {
            JsonMessage::complete(results, Some(report_path.to_path_buf()), duration).emit();
        }

        info!("✨ Optimization complete");
        info!("Images optimized: {}/{}", results.optimized_count(), results.total_images);
        if results.failed_count() > 0 {
            warn!("Images failed: {}", results.failed_count());
        }
        info!(
            "Total reduction: {:.2}% ({} → {})",
            results.overall_reduction_percent(),
            FileManager::format_bytes(results.total_size_before),
            FileManager::format_bytes(results.total_size_after)
        );
        let saved = results.bytes_saved();
        if saved >= 0 {
            info!("Space saved: {}", FileManager::format_bytes(saved.unsigned_abs()));
        } else {
            warn!("Images grew by {} in total", FileManager::format_bytes(saved.unsigned_abs()));
        }
        if let Some(ref backup_dir) = self.config.backup_dir {
            info!("Backup saved to: {}", backup_dir.display());
        }
        info!("Report: {}", report_path.display());
        debug!("Run took {:.2}s", duration);
    }
}
