//! Template loading and ordering

use image::GrayImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A reference image of a UI element to search for on screen.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub path: PathBuf,
    pub image: GrayImage,
}

impl Template {
    /// Decode a template from disk as 8-bit grayscale.
    pub fn open(path: &Path) -> Result<Self, String> {
        let image = image::open(path)
            .map_err(|e| format!("Failed to load template {}: {}", path.display(), e))?
            .to_luma8();

        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self::from_image(name, path.to_path_buf(), image))
    }

    pub fn from_image(name: String, path: PathBuf, image: GrayImage) -> Self {
        Self { name, path, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Click target for a match whose top-left corner is at `location`.
    pub fn center_at(&self, location: (i32, i32)) -> (i32, i32) {
        (
            location.0 + (self.width() / 2) as i32,
            location.1 + (self.height() / 2) as i32,
        )
    }
}

/// List the `*.png` files of a directory, sorted by file name.
pub fn scan_png_files(directory: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        let path = entry.path();
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            files.push(path);
        }
    }

    // Sort by file name: config authors sequence multi-step flows by naming
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Owns the templates loaded from one directory.
///
/// Runs take a cheap `Arc` snapshot, so a reload never disturbs a search
/// that is already in flight.
pub struct TemplateStore {
    directory: PathBuf,
    templates: Arc<[Template]>,
}

impl TemplateStore {
    /// Load every PNG in `directory`. Never fails: a missing or empty
    /// directory yields an empty store, unreadable files are skipped.
    pub fn load(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let templates = Self::read_directory(&directory);
        Self {
            directory,
            templates: templates.into(),
        }
    }

    pub fn from_templates(directory: impl Into<PathBuf>, templates: Vec<Template>) -> Self {
        Self {
            directory: directory.into(),
            templates: templates.into(),
        }
    }

    fn read_directory(directory: &Path) -> Vec<Template> {
        if !directory.exists() {
            log::warn!("⚠️ Template directory not found: {}", directory.display());
            return Vec::new();
        }

        let files = match scan_png_files(directory) {
            Ok(files) => files,
            Err(e) => {
                log::warn!(
                    "⚠️ Failed to read template directory {}: {}",
                    directory.display(),
                    e
                );
                return Vec::new();
            }
        };

        if files.is_empty() {
            log::warn!("⚠️ No PNG templates in {}", directory.display());
            return Vec::new();
        }

        let mut templates = Vec::with_capacity(files.len());
        for path in files {
            match Template::open(&path) {
                Ok(template) => templates.push(template),
                Err(e) => log::warn!("⚠️ Skipping unreadable template: {}", e),
            }
        }

        log::info!(
            "🖼️ Loaded {} templates from {}",
            templates.len(),
            directory.display()
        );
        templates
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Snapshot handed to a run.
    pub fn snapshot(&self) -> Arc<[Template]> {
        Arc::clone(&self.templates)
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn names(&self) -> Vec<String> {
        self.templates.iter().map(|t| t.name.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Re-read the current directory.
    pub fn reload(&mut self) -> usize {
        self.templates = Self::read_directory(&self.directory).into();
        self.count()
    }

    /// Switch to another directory and load it.
    pub fn set_directory(&mut self, directory: impl Into<PathBuf>) -> usize {
        self.directory = directory.into();
        self.reload()
    }
}
