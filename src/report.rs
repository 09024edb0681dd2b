//! # Report Module
//!
//! Genera il report HTML statico di fine run con `maud`.
//!
//! ## Struttura del report:
//! - Header con numero di immagini, directory e timestamp del run
//! - Pannello riassuntivo (immagini, dimensione originale, ottimizzata, riduzione)
//! - Una sezione per ogni directory sorgente con statistiche di gruppo
//!   e lista delle immagini (nome, dimensioni, byte prima/dopo, riduzione)
//!
//! La riduzione per immagine è classificata in tre livelli solo a scopo
//! visivo: >70% `high`, >40% `medium`, altrimenti `low`.
//!
//! Il rendering è una funzione pura dei risultati e del timestamp; la
//! scrittura su disco avviene una sola volta e sovrascrive il file esistente.

use crate::error::OptimizeError;
use crate::file_manager::FileManager;
use crate::optimizer::path_resolver::PathResolver;
use crate::results::{DirectoryStats, OptimizationResults};
use chrono::{DateTime, Local};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::path::{Path, PathBuf};
use tracing::debug;

const STYLE: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 0; padding: 2rem; background: #f5f6f8; color: #1f2328; }
header h1 { margin: 0 0 .25rem; }
header .meta { color: #656d76; margin: 0 0 1.5rem; }
.summary { display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 1rem; margin-bottom: 2rem; }
.card { background: #fff; border-radius: 8px; padding: 1rem; box-shadow: 0 1px 3px rgba(0,0,0,.08); }
.card .label { display: block; color: #656d76; font-size: .85rem; }
.card .value { display: block; font-size: 1.4rem; font-weight: 600; margin-top: .25rem; }
.directory { background: #fff; border-radius: 8px; padding: 1rem 1.25rem; margin-bottom: 1.5rem; box-shadow: 0 1px 3px rgba(0,0,0,.08); }
.directory h2 { font-size: 1.1rem; margin: 0 0 .5rem; word-break: break-all; }
.directory .stats { color: #656d76; margin: 0 0 1rem; }
table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: .4rem .5rem; border-bottom: 1px solid #eaeef2; }
th { font-size: .85rem; color: #656d76; }
td.empty { color: #656d76; font-style: italic; }
.reduction { font-weight: 600; padding: .1rem .4rem; border-radius: 4px; }
.reduction.high { background: #dafbe1; color: #116329; }
.reduction.medium { background: #fff8c5; color: #7d4e00; }
.reduction.low { background: #ffebe9; color: #a40e26; }
"#;

/// Visual classification of a per-image reduction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionTier {
    High,
    Medium,
    Low,
}

impl ReductionTier {
    pub fn classify(reduction_percent: f64) -> Self {
        if reduction_percent > 70.0 {
            Self::High
        } else if reduction_percent > 40.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Renders [`OptimizationResults`] as a self-contained HTML page
pub struct ReportRenderer {
    working_dir: PathBuf,
}

impl ReportRenderer {
    /// `working_dir` is only used to shorten directory names in headings
    pub fn new(working_dir: &Path) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
        }
    }

    pub fn render(&self, results: &OptimizationResults, generated_at: &DateTime<Local>) -> String {
        let groups = results.by_directory();
        let timestamp = generated_at.format("%Y-%m-%d %H:%M:%S").to_string();

        let page = html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    meta name="viewport" content="width=device-width, initial-scale=1";
                    title { "Image Optimization Report" }
                    style { (PreEscaped(STYLE)) }
                }
                body {
                    header {
                        h1 { "Image Optimization Report" }
                        p.meta {
                            (results.total_images.to_string()) " images in "
                            (groups.len().to_string()) " directories · generated "
                            time datetime=(generated_at.to_rfc3339()) { (timestamp) }
                        }
                    }
                    (self.summary(results))
                    @for group in &groups {
                        (self.directory_section(group))
                    }
                }
            }
        };

        page.into_string()
    }

    fn summary(&self, results: &OptimizationResults) -> Markup {
        html! {
            section.summary {
                (card("Total images", &results.total_images.to_string()))
                (card("Optimized", &results.optimized_count().to_string()))
                (card("Failed", &results.failed_count().to_string()))
                (card("Original size", &FileManager::format_bytes(results.total_size_before)))
                (card("Optimized size", &FileManager::format_bytes(results.total_size_after)))
                (card("Total reduction", &percent(results.overall_reduction_percent())))
            }
        }
    }

    fn directory_section(&self, group: &DirectoryStats<'_>) -> Markup {
        html! {
            section.directory {
                h2 { (PathResolver::display_path(group.directory, &self.working_dir)) }
                p.stats {
                    (group.image_count.to_string()) " images · "
                    (FileManager::format_bytes(group.size_before)) " → "
                    (FileManager::format_bytes(group.size_after)) " · "
                    (percent(group.reduction_percent)) " reduction"
                }
                table {
                    thead {
                        tr {
                            th { "Image" }
                            th { "Dimensions" }
                            th { "Original" }
                            th { "Optimized" }
                            th { "Reduction" }
                        }
                    }
                    tbody {
                        @if group.images.is_empty() {
                            tr { td.empty colspan="5" { "No images optimized in this directory" } }
                        }
                        @for image in &group.images {
                            tr.image {
                                td { (image.name) }
                                td { (image.original_dimensions) }
                                td { (FileManager::format_bytes(image.original_size)) }
                                td { (FileManager::format_bytes(image.optimized_size)) }
                                td {
                                    span class=(format!("reduction {}", ReductionTier::classify(image.reduction_percent).css_class())) {
                                        (percent(image.reduction_percent))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Render and write the report, overwriting any existing file.
    /// Failing here aborts the run.
    pub async fn write(
        &self,
        results: &OptimizationResults,
        report_path: &Path,
        generated_at: &DateTime<Local>,
    ) -> Result<(), OptimizeError> {
        let report = self.render(results, generated_at);
        let run_err = |e: std::io::Error| {
            OptimizeError::Run(format!("Failed to write report {}: {}", report_path.display(), e))
        };

        if let Some(parent) = report_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(run_err)?;
            }
        }
        tokio::fs::write(report_path, report.as_bytes()).await.map_err(run_err)?;

        debug!("Report written to {} ({} bytes)", report_path.display(), report.len());
        Ok(())
    }
}

fn card(label: &str, value: &str) -> Markup {
    html! {
        div.card {
            span.label { (label) }
            span.value { (value) }
        }
    }
}

fn percent(value: f64) -> String {
    format!("{:.2}%", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_manager::ImageFileRef;
    use crate::results::OptimizationResult;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn image(dir: &str, name: &str) -> ImageFileRef {
        ImageFileRef {
            path: Path::new(dir).join(name),
            name: name.to_string(),
            directory: PathBuf::from(dir),
        }
    }

    fn timestamp() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()
    }

    fn sample() -> OptimizationResults {
        let mut results = OptimizationResults::new();
        let hero = image("/site/assets", "hero.jpg");
        let icon = image("/site/assets", "<icon>.png");
        let logo = image("/site/public/img", "logo.gif");
        for img in [&hero, &icon, &logo] {
            results.add_discovered(img);
        }
        results.add_result(OptimizationResult::new(&hero, 10_000, "1920x1080".into(), 2_000));
        results.add_result(OptimizationResult::new(&icon, 1_000, "64x?".into(), 500));
        results.add_result(OptimizationResult::new(&logo, 2_048, "120x40".into(), 2_100));
        results
    }

    #[test]
    fn test_reduction_tiers() {
        assert_eq!(ReductionTier::classify(80.0), ReductionTier::High);
        assert_eq!(ReductionTier::classify(70.0), ReductionTier::Medium);
        assert_eq!(ReductionTier::classify(40.01), ReductionTier::Medium);
        assert_eq!(ReductionTier::classify(40.0), ReductionTier::Low);
        assert_eq!(ReductionTier::classify(-12.5), ReductionTier::Low);
    }

    #[test]
    fn test_report_sections() {
        let renderer = ReportRenderer::new(Path::new("/site"));
        let html = renderer.render(&sample(), &timestamp());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("2024-03-09 14:05:00"));
        assert_eq!(html.matches("<section class=\"directory\">").count(), 2);
        assert_eq!(html.matches("<tr class=\"image\">").count(), 3);
        assert!(html.contains("<h2>assets</h2>"));
        assert!(html.contains("<h2>public/img</h2>"));
        assert!(html.contains("1920x1080"));
        assert!(html.contains("64x?"));
    }

    #[test]
    fn test_report_summary_values() {
        let renderer = ReportRenderer::new(Path::new("/site"));
        let html = renderer.render(&sample(), &timestamp());

        // 13048 -> 4600 bytes
        assert!(html.contains("12.74 KB"));
        assert!(html.contains("4.49 KB"));
        assert!(html.contains("64.75%"));
        assert!(html.contains("<span class=\"reduction high\">80.00%</span>"));
        assert!(html.contains("<span class=\"reduction medium\">50.00%</span>"));
        assert!(html.contains("<span class=\"reduction low\">-2.54%</span>"));
    }

    #[test]
    fn test_report_escapes_names() {
        let renderer = ReportRenderer::new(Path::new("/site"));
        let html = renderer.render(&sample(), &timestamp());

        assert!(html.contains("&lt;icon&gt;.png"));
        assert!(!html.contains("<icon>"));
    }

    #[test]
    fn test_empty_directory_section() {
        let mut results = OptimizationResults::new();
        results.add_discovered(&image("/site/broken", "bad.png"));

        let html = ReportRenderer::new(Path::new("/site")).render(&results, &timestamp());
        assert_eq!(html.matches("<section class=\"directory\">").count(), 1);
        assert!(html.contains("No images optimized in this directory"));
        assert!(html.contains("0.00% reduction"));
    }

    #[test]
    fn test_render_is_pure() {
        let renderer = ReportRenderer::new(Path::new("/site"));
        let results = sample();
        assert_eq!(
            renderer.render(&results, &timestamp()),
            renderer.render(&results, &timestamp())
        );
    }

    #[tokio::test]
    async fn test_write_overwrites_existing_report() {
        let temp_dir = TempDir::new().unwrap();
        let report_path = temp_dir.path().join("reports").join("report.html");
        std::fs::create_dir_all(report_path.parent().unwrap()).unwrap();
        std::fs::write(&report_path, "stale").unwrap();

        let renderer = ReportRenderer::new(temp_dir.path());
        renderer.write(&sample(), &report_path, &timestamp()).await.unwrap();

        let written = std::fs::read_to_string(&report_path).unwrap();
        assert!(written.contains("Image Optimization Report"));
        assert!(!written.contains("stale"));
    }

    #[tokio::test]
    async fn test_write_failure_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let renderer = ReportRenderer::new(temp_dir.path());
        let err = renderer
            .write(&sample(), &blocker.join("report.html"), &timestamp())
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
