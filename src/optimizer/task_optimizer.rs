//! # Task Optimizer Module
//!
//! Worker per l'ottimizzazione di singoli file.
//! Separato dall'orchestratore principale per maggiore modularità.
//!
//! ## Stati di un file:
//! `Discovered → BackedUp | BackupSkipped → Decoded → Reencoded → Replaced`
//!
//! Da qualsiasi stato si può passare a `Failed`: l'errore porta con sé
//! l'ultimo stato raggiunto. Nessun rollback del backup, nessun retry.

use crate::{
    backup::BackupManager,
    config::IntermediateFormat,
    error::OptimizeError,
    file_manager::{FileManager, ImageFileRef},
    image_processor::{ContainerFormat, ImageTransform},
    results::OptimizationResult,
};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Last stage a file reached in the per-file pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStage {
    Discovered,
    BackedUp,
    BackupSkipped,
    Decoded,
    Reencoded,
    Replaced,
}

impl fmt::Display for FileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Discovered => "discovered",
            Self::BackedUp => "backed up",
            Self::BackupSkipped => "backup skipped",
            Self::Decoded => "decoded",
            Self::Reencoded => "re-encoded",
            Self::Replaced => "replaced",
        };
        f.write_str(name)
    }
}

/// A file that dropped out of the pipeline
#[derive(Debug)]
pub struct FileFailure {
    /// Last stage completed before the error
    pub stage: FileStage,
    pub error: OptimizeError,
}

impl FileFailure {
    fn at(stage: FileStage) -> impl FnOnce(OptimizeError) -> Self {
        move |error| Self { stage, error }
    }
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after: {})", self.error, self.stage)
    }
}

impl std::error::Error for FileFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Worker per elaborazione singoli file
pub struct TaskOptimizer {
    transform: Arc<dyn ImageTransform>,
    backup: Option<BackupManager>,
    format: IntermediateFormat,
    quality: u8,
}

impl TaskOptimizer {
    /// Crea nuovo task optimizer
    pub fn new(
        transform: Arc<dyn ImageTransform>,
        backup: Option<BackupManager>,
        format: IntermediateFormat,
        quality: u8,
    ) -> Self {
        Self {
            transform,
            backup,
            format,
            quality,
        }
    }

    /// Processa un singolo file
    pub async fn process_single_file(
        &self,
        image: &ImageFileRef,
    ) -> Result<OptimizationResult, FileFailure> {
        let path = &image.path;
        let mut stage = FileStage::Discovered;

        // Backup prima di qualsiasi modifica
        stage = match self.backup {
            Some(ref backup) => {
                let target = backup.backup_file(path).await.map_err(FileFailure::at(stage))?;
                debug!("Backup ready: {}", target.display());
                FileStage::BackedUp
            }
            None => FileStage::BackupSkipped,
        };

        let original_size = FileManager::get_file_size(path)
            .await
            .map_err(|e| FileFailure::at(stage)(e.into()))?;
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| FileFailure::at(stage)(e.into()))?;

        let metadata = self.transform.probe(&data).map_err(FileFailure::at(stage))?;
        stage = FileStage::Decoded;
        debug!("{}: {} {}", image.name, metadata.format, metadata.dimensions());

        let optimized = self
            .reencode(data, metadata.format)
            .await
            .map_err(FileFailure::at(stage))?;
        stage = FileStage::Reencoded;

        Self::replace(path.clone(), optimized)
            .await
            .map_err(FileFailure::at(stage))?;
        stage = FileStage::Replaced;

        let optimized_size = FileManager::get_file_size(path)
            .await
            .map_err(|e| FileFailure::at(stage)(e.into()))?;

        Ok(OptimizationResult::new(
            image,
            original_size,
            metadata.dimensions(),
            optimized_size,
        ))
    }

    /// Atomic temp-file-then-rename replace, off the async runtime
    async fn replace(path: PathBuf, contents: Vec<u8>) -> Result<(), OptimizeError> {
        tokio::task::spawn_blocking(move || FileManager::replace_file(&path, &contents))
            .await
            .map_err(|e| OptimizeError::Replace(format!("replace task failed: {}", e)))?
    }

    /// Lossy pass into the intermediate format, then back to `container`.
    /// Runs on the blocking pool; the caller awaits it before moving on.
    async fn reencode(
        &self,
        data: Vec<u8>,
        container: ContainerFormat,
    ) -> Result<Vec<u8>, OptimizeError> {
        let transform = Arc::clone(&self.transform);
        let (format, quality) = (self.format, self.quality);

        tokio::task::spawn_blocking(move || {
            let intermediate = transform.reencode(&data, format, quality)?;
            transform.convert(&intermediate, container, quality)
        })
        .await
        .map_err(|e| OptimizeError::Transform(format!("codec task failed: {}", e)))?
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::image_processor::ImageMetadata;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Fake codec: files starting with "BAD" fail the probe, "FAIL" fails
    /// the re-encode, "GROW" doubles in size, everything else is halved
    #[derive(Default)]
    pub(crate) struct FakeTransform {
        pub reencodes: AtomicUsize,
    }

    impl ImageTransform for FakeTransform {
        fn probe(&self, data: &[u8]) -> Result<ImageMetadata, OptimizeError> {
            if data.starts_with(b"BAD") {
                return Err(OptimizeError::Metadata("image has no width".to_string()));
            }
            Ok(ImageMetadata {
                width: 10,
                height: if data.starts_with(b"NOH") { None } else { Some(20) },
                format: ContainerFormat::Png,
            })
        }

        fn reencode(
            &self,
            data: &[u8],
            _target: IntermediateFormat,
            _quality: u8,
        ) -> Result<Vec<u8>, OptimizeError> {
            self.reencodes.fetch_add(1, Ordering::SeqCst);
            if data.starts_with(b"FAIL") {
                return Err(OptimizeError::Transform("codec exploded".to_string()));
            }
            if data.starts_with(b"GROW") {
                return Ok([data, data].concat());
            }
            Ok(data[..data.len() / 2].to_vec())
        }

        fn convert(
            &self,
            data: &[u8],
            _container: ContainerFormat,
            _quality: u8,
        ) -> Result<Vec<u8>, OptimizeError> {
            Ok(data.to_vec())
        }
    }

    fn write_image(dir: &Path, name: &str, content: &[u8]) -> ImageFileRef {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        ImageFileRef {
            path,
            name: name.to_string(),
            directory: dir.to_path_buf(),
        }
    }

    fn optimizer(backup: Option<BackupManager>) -> TaskOptimizer {
        TaskOptimizer::new(
            Arc::new(FakeTransform::default()),
            backup,
            IntermediateFormat::Webp,
            80,
        )
    }

    #[tokio::test]
    async fn test_successful_file() {
        let temp_dir = TempDir::new().unwrap();
        let image = write_image(temp_dir.path(), "a.png", &[7u8; 1000]);

        let result = optimizer(None).process_single_file(&image).await.unwrap();

        assert_eq!(result.name, "a.png");
        assert_eq!(result.source_directory, temp_dir.path());
        assert_eq!(result.original_size, 1000);
        assert_eq!(result.optimized_size, 500);
        assert_eq!(result.original_dimensions, "10x20");
        assert_eq!(result.reduction_percent, 50.0);
        assert_eq!(std::fs::read(&image.path).unwrap().len(), 500);
    }

    #[tokio::test]
    async fn test_grown_file_reports_negative_reduction() {
        let temp_dir = TempDir::new().unwrap();
        let image = write_image(temp_dir.path(), "g.gif", b"GROW-0123456789");

        let result = optimizer(None).process_single_file(&image).await.unwrap();
        assert_eq!(result.reduction_percent, -100.0);
    }

    #[tokio::test]
    async fn test_unknown_height_is_question_mark() {
        let temp_dir = TempDir::new().unwrap();
        let image = write_image(temp_dir.path(), "n.jpg", b"NOH-abcdef");

        let result = optimizer(None).process_single_file(&image).await.unwrap();
        assert_eq!(result.original_dimensions, "10x?");
    }

    #[tokio::test]
    async fn test_metadata_failure_keeps_original() {
        let temp_dir = TempDir::new().unwrap();
        let image = write_image(temp_dir.path(), "bad.png", b"BAD bytes");

        let failure = optimizer(None).process_single_file(&image).await.unwrap_err();

        assert_eq!(failure.stage, FileStage::BackupSkipped);
        assert!(matches!(failure.error, OptimizeError::Metadata(_)));
        assert_eq!(std::fs::read(&image.path).unwrap(), b"BAD bytes");
    }

    #[tokio::test]
    async fn test_transform_failure_after_backup() {
        let temp_dir = TempDir::new().unwrap();
        let image = write_image(temp_dir.path(), "f.jpg", b"FAIL please");
        let backup = BackupManager::new(Path::new("bk"), temp_dir.path());
        backup.prepare().await.unwrap();

        let failure = optimizer(Some(backup.clone()))
            .process_single_file(&image)
            .await
            .unwrap_err();

        assert_eq!(failure.stage, FileStage::Decoded);
        assert!(matches!(failure.error, OptimizeError::Transform(_)));
        // the backup is not rolled back
        assert!(backup.backup_path_for(&image.path).exists());
        assert_eq!(std::fs::read(&image.path).unwrap(), b"FAIL please");
    }

    #[tokio::test]
    async fn test_backup_failure_stops_before_transform() {
        let temp_dir = TempDir::new().unwrap();
        let image = write_image(temp_dir.path(), "a.png", &[1u8; 64]);
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let transform = Arc::new(FakeTransform::default());
        let task = TaskOptimizer::new(
            transform.clone(),
            Some(BackupManager::new(&blocker, temp_dir.path())),
            IntermediateFormat::Webp,
            80,
        );

        let failure = task.process_single_file(&image).await.unwrap_err();
        assert_eq!(failure.stage, FileStage::Discovered);
        assert!(matches!(failure.error, OptimizeError::Backup(_)));
        assert_eq!(transform.reencodes.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read(&image.path).unwrap(), vec![1u8; 64]);
    }

    #[tokio::test]
    async fn test_replace_step_errors_and_success() {
        let temp_dir = TempDir::new().unwrap();
        let image = write_image(temp_dir.path(), "a.png", &[3u8; 40]);
        // No parent directory to put the temp file in
        let missing = ImageFileRef {
            path: temp_dir.path().join("gone").join("a.png"),
            ..image.clone()
        };

        let failure = TaskOptimizer::replace(missing.path.clone(), vec![0u8; 4]).await.unwrap_err();
        assert!(matches!(failure, OptimizeError::Replace(_)));

        TaskOptimizer::replace(image.path.clone(), vec![5u8; 4]).await.unwrap();
        assert_eq!(std::fs::read(&image.path).unwrap(), vec![5u8; 4]);
    }

    #[test]
    fn test_failure_display() {
        let failure = FileFailure {
            stage: FileStage::Reencoded,
            error: OptimizeError::Replace("rename refused".to_string()),
        };
        assert_eq!(failure.to_string(), "Replace error: rename refused (after: re-encoded)");
    }
}
