//! On-disk layout for scan artifacts: a per-run directory holding the
//! screenshots and the final `report.json`. The engine only ever asks for
//! paths and hands over finished bytes; rendering is someone else's job.

use crate::error::Result;
use crate::results::Report;
use crate::utils::sanitize_filename;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    run_dir: PathBuf,
    screenshots_dir: PathBuf,
}

impl ArtifactStore {
    /// Create the run directory under `output_dir`, named after the target.
    pub fn init(output_dir: &str, target_url: &str) -> Result<Self> {
        let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let run_dir = Path::new(output_dir).join(format!(
            "{}_{}",
            sanitize_filename(target_url),
            stamp
        ));
        let screenshots_dir = run_dir.join("screenshots");
        std::fs::create_dir_all(&screenshots_dir)?;
        ::log::info!("Artifacts directory: {}", run_dir.display());
        Ok(Self {
            run_dir,
            screenshots_dir,
        })
    }

    /// Allocate the path a screenshot with the given name should be written to.
    pub fn screenshot_path(&self, name: &str) -> PathBuf {
        self.screenshots_dir
            .join(format!("{}.png", sanitize_filename(name)))
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Serialize the report as `report.json` inside the run directory.
    pub fn write_report(&self, report: &Report) -> Result<PathBuf> {
        let path = self.run_dir.join("report.json");
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;
        ::log::info!("Report written to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let store =
            ArtifactStore::init(tmp.path().to_str().unwrap(), "https://example.com/shop").unwrap();
        assert!(store.run_dir().exists());
        assert!(store.run_dir().join("screenshots").exists());
        // Directory name carries a sanitized target
        assert!(
            store
                .run_dir()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("example.com_shop")
        );
    }

    #[test]
    fn test_screenshot_path_is_sanitized() {
        let tmp = tempfile::tempdir().unwrap();
        let store =
            ArtifactStore::init(tmp.path().to_str().unwrap(), "https://example.com").unwrap();
        let path = store.screenshot_path("001_initial/_root");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with(".png"));
        assert!(!name.contains('/'));
    }
}
