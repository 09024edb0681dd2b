//! # Optimization Results Module
//!
//! Questo modulo accumula i risultati di ottimizzazione di un run.
//!
//! ## Responsabilità:
//! - `OptimizationResult`: risultato immutabile di un singolo file ottimizzato
//! - `OptimizationResults`: aggregato append-only (totali, immagini, directory sorgente)
//! - `DirectoryStats`: statistiche per directory calcolate per il report
//!
//! ## Invarianti:
//! - `total_images` conta tutti i file trovati, anche quelli falliti
//! - `images.len() <= total_images`
//! - i totali before/after sommano solo i file ottimizzati con successo
//! - la riduzione può essere negativa (file cresciuto), mai NaN: una base
//!   di zero byte vale 0%

use crate::file_manager::{round2, FileManager, ImageFileRef};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Outcome of one successfully optimized image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub name: String,
    pub source_directory: PathBuf,
    pub original_size: u64,
    /// "WxH", height may be "?"
    pub original_dimensions: String,
    pub optimized_size: u64,
    /// Signed, rounded to two decimals
    pub reduction_percent: f64,
}

impl OptimizationResult {
    pub fn new(
        image: &ImageFileRef,
        original_size: u64,
        original_dimensions: String,
        optimized_size: u64,
    ) -> Self {
        Self {
            name: image.name.clone(),
            source_directory: image.directory.clone(),
            original_size,
            original_dimensions,
            optimized_size,
            reduction_percent: FileManager::calculate_reduction(original_size, optimized_size),
        }
    }
}

/// Per-directory statistics shown in the report
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryStats<'a> {
    pub directory: &'a Path,
    pub image_count: usize,
    pub size_before: u64,
    pub size_after: u64,
    pub reduction_percent: f64,
    pub images: Vec<&'a OptimizationResult>,
}

/// Aggregate of a whole optimization run
#[derive(Debug, Clone, Default, Serialize)]
pub struct OptimizationResults {
    pub total_images: usize,
    pub total_size_before: u64,
    pub total_size_after: u64,
    pub images: Vec<OptimizationResult>,
    pub source_directories: BTreeSet<PathBuf>,
}

impl OptimizationResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a discovered image and remember its directory
    pub fn add_discovered(&mut self, image: &ImageFileRef) {
        self.total_images += 1;
        self.source_directories.insert(image.directory.clone());
    }

    /// Append a successful result and update the running totals
    pub fn add_result(&mut self, result: OptimizationResult) {
        self.total_size_before += result.original_size;
        self.total_size_after += result.optimized_size;
        self.source_directories.insert(result.source_directory.clone());
        self.images.push(result);
    }

    pub fn optimized_count(&self) -> usize {
        self.images.len()
    }

    pub fn failed_count(&self) -> usize {
        self.total_images.saturating_sub(self.images.len())
    }

    pub fn bytes_saved(&self) -> i64 {
        self.total_size_before as i64 - self.total_size_after as i64
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        group_reduction(self.total_size_before, self.total_size_after)
    }

    /// Group results by source directory, in directory order. Directories
    /// whose files all failed still get an (empty) entry.
    pub fn by_directory(&self) -> Vec<DirectoryStats<'_>> {
        self.source_directories
            .iter()
            .map(|directory| {
                let images: Vec<&OptimizationResult> = self
                    .images
                    .iter()
                    .filter(|image| image.source_directory == *directory)
                    .collect();
                let size_before = images.iter().map(|image| image.original_size).sum();
                let size_after = images.iter().map(|image| image.optimized_size).sum();

                DirectoryStats {
                    directory: directory.as_path(),
                    image_count: images.len(),
                    size_before,
                    size_after,
                    reduction_percent: group_reduction(size_before, size_after),
                    images,
                }
            })
            .collect()
    }
}

/// `(before - after) / before * 100`, two decimals, 0 when `before` is 0
fn group_reduction(size_before: u64, size_after: u64) -> f64 {
    if size_before == 0 {
        return 0.0;
    }
    round2((size_before as f64 - size_after as f64) / size_before as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(dir: &str, name: &str) -> ImageFileRef {
        ImageFileRef {
            path: Path::new(dir).join(name),
            name: name.to_string(),
            directory: PathBuf::from(dir),
        }
    }

    fn sample() -> OptimizationResults {
        let mut results = OptimizationResults::new();
        let a = image("/p/assets", "a.png");
        let b = image("/p/assets", "b.jpg");
        let c = image("/p/public", "c.gif");
        let failed = image("/p/broken", "d.png");
        for img in [&a, &b, &c, &failed] {
            results.add_discovered(img);
        }
        results.add_result(OptimizationResult::new(&a, 1000, "10x10".into(), 600));
        results.add_result(OptimizationResult::new(&b, 3000, "20x20".into(), 1000));
        results.add_result(OptimizationResult::new(&c, 1000, "5x?".into(), 1100));
        results
    }

    #[test]
    fn test_result_reduction() {
        let a = image("/p", "a.png");
        assert_eq!(OptimizationResult::new(&a, 1000, "1x1".into(), 600).reduction_percent, 40.0);
        assert_eq!(OptimizationResult::new(&a, 1000, "1x1".into(), 1100).reduction_percent, -10.0);
    }

    #[test]
    fn test_totals_and_counts() {
        let results = sample();
        assert_eq!(results.total_images, 4);
        assert_eq!(results.optimized_count(), 3);
        assert_eq!(results.failed_count(), 1);
        assert_eq!(results.total_size_before, 5000);
        assert_eq!(results.total_size_after, 2700);
        assert_eq!(results.bytes_saved(), 2300);
        assert_eq!(results.overall_reduction_percent(), 46.0);
        assert_eq!(results.source_directories.len(), 3);
    }

    #[test]
    fn test_group_by_directory() {
        let results = sample();
        let groups = results.by_directory();

        let dirs: Vec<_> = groups.iter().map(|g| g.directory).collect();
        assert_eq!(dirs, vec![Path::new("/p/assets"), Path::new("/p/broken"), Path::new("/p/public")]);

        let assets = &groups[0];
        assert_eq!(assets.image_count, 2);
        assert_eq!(assets.size_before, 4000);
        assert_eq!(assets.size_after, 1600);
        assert_eq!(assets.reduction_percent, 60.0);

        let public = &groups[2];
        assert_eq!(public.reduction_percent, -10.0);
    }

    #[test]
    fn test_empty_group_is_zero_percent() {
        let results = sample();
        let groups = results.by_directory();
        let broken = &groups[1];
        assert_eq!(broken.image_count, 0);
        assert_eq!(broken.size_before, 0);
        assert_eq!(broken.reduction_percent, 0.0);
        assert!(!broken.reduction_percent.is_nan());
    }

    #[test]
    fn test_zero_byte_originals() {
        let mut results = OptimizationResults::new();
        let empty = image("/p/empty", "zero.png");
        results.add_discovered(&empty);
        results.add_result(OptimizationResult::new(&empty, 0, "0x0".into(), 0));

        assert_eq!(results.overall_reduction_percent(), 0.0);
        assert_eq!(results.by_directory()[0].reduction_percent, 0.0);
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let results = sample();
        let first = results.by_directory();
        let second = results.by_directory();
        assert_eq!(first, second);
        assert_eq!(results.total_size_after, 2700);
    }

    #[test]
    fn test_empty_results() {
        let results = OptimizationResults::new();
        assert_eq!(results.failed_count(), 0);
        assert_eq!(results.overall_reduction_percent(), 0.0);
        assert!(results.by_directory().is_empty());
    }
}
