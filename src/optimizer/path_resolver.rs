//! # Path Resolution Module
//!
//! Centralizza tutta la logica di calcolo dei path.
//! Evita duplicazione tra scanner, backup e aggregazione dei risultati.

use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Utility per normalizzare i path e calcolare i path di backup
pub struct PathResolver;

impl PathResolver {
    /// Rende un path assoluto rispetto a `base` e rimuove `.` e `..` in modo
    /// lessicale (nessun accesso al filesystem, i symlink non vengono risolti)
    pub fn normalize(path: &Path, base: &Path) -> PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        };

        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    // Il pop sulla root non fa nulla, come `cd ..` in `/`
                    normalized.pop();
                }
                other => normalized.push(other.as_os_str()),
            }
        }
        normalized
    }

    /// Path relativo con cui un file viene specchiato nell'albero di backup.
    ///
    /// I file sotto la working directory mantengono il loro path relativo;
    /// quelli fuori vengono appesi con i soli componenti normali del path
    /// assoluto, così il backup non esce mai dalla root.
    pub fn mirror_relative_path(file: &Path, working_dir: &Path) -> PathBuf {
        let file = Self::normalize(file, working_dir);
        let working_dir = Self::normalize(working_dir, working_dir);

        let relative: PathBuf = match file.strip_prefix(&working_dir) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => {
                debug!(
                    "{} is outside the working directory, mirroring absolute layout",
                    file.display()
                );
                file.components()
                    .filter(|c| matches!(c, Component::Normal(_)))
                    .collect()
            }
        };
        relative
    }

    /// Path di backup per un file dato
    pub fn backup_path(file: &Path, working_dir: &Path, backup_root: &Path) -> PathBuf {
        let root = Self::normalize(backup_root, working_dir);
        root.join(Self::mirror_relative_path(file, working_dir))
    }

    /// Path da mostrare all'utente: relativo alla working directory quando possibile
    pub fn display_path(path: &Path, working_dir: &Path) -> String {
        match path.strip_prefix(working_dir) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => path.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_relative() {
        let base = Path::new("/work/project");
        assert_eq!(
            PathResolver::normalize(Path::new("./assets/images"), base),
            PathBuf::from("/work/project/assets/images")
        );
        assert_eq!(
            PathResolver::normalize(Path::new("assets/../public/./img"), base),
            PathBuf::from("/work/project/public/img")
        );
    }

    #[test]
    fn test_normalize_equivalent_paths_match() {
        let base = Path::new("/work/project");
        let a = PathResolver::normalize(Path::new("./src/assets"), base);
        let b = PathResolver::normalize(Path::new("/work/project/src/./assets/"), base);
        assert_eq!(a, b);
    }

    #[test]
    fn test_normalize_parent_at_root() {
        assert_eq!(
            PathResolver::normalize(Path::new("/../../etc"), Path::new("/")),
            PathBuf::from("/etc")
        );
    }

    #[test]
    fn test_backup_path_mirrors_structure() {
        let working_dir = Path::new("/work/project");
        let backup = PathResolver::backup_path(
            Path::new("/work/project/src/assets/logo.png"),
            working_dir,
            Path::new("./images-backup"),
        );
        assert_eq!(backup, PathBuf::from("/work/project/images-backup/src/assets/logo.png"));
    }

    #[test]
    fn test_backup_path_outside_working_dir_stays_in_root() {
        let backup = PathResolver::backup_path(
            Path::new("/srv/shared/../media/photo.jpg"),
            Path::new("/work/project"),
            Path::new("/backups"),
        );
        assert_eq!(backup, PathBuf::from("/backups/srv/media/photo.jpg"));
    }

    #[test]
    fn test_display_path() {
        let working_dir = Path::new("/work/project");
        assert_eq!(
            PathResolver::display_path(Path::new("/work/project/assets"), working_dir),
            "assets"
        );
        assert_eq!(PathResolver::display_path(working_dir, working_dir), ".");
        assert_eq!(
            PathResolver::display_path(Path::new("/elsewhere/img"), working_dir),
            "/elsewhere/img"
        );
    }
}
