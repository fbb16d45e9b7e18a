//! Runtime settings
//!
//! Everything is derived from a base directory (`SORTDESK_HOME`, defaulting
//! to the working directory) plus a handful of environment overrides. A
//! `.env` file is loaded by [`crate::run`] before this is read.

use crate::error::{Result, SortError};
use crate::models::{dotted_extension, Category, FileKind, QueuedFile};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TEXT_EXTENSIONS: &[&str] = &[".pdf", ".txt", ".docx"];
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg"];

/// Nominal wait before a new file is considered written
pub const DEFAULT_GRACE: Duration = Duration::from_millis(200);

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct Settings {
    pub home: PathBuf,
    pub watch_dirs: Vec<PathBuf>,
    pub category_folders: HashMap<Category, PathBuf>,
    pub text_extensions: Vec<String>,
    pub image_extensions: Vec<String>,
    pub model_path: PathBuf,
    pub static_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub grace: Duration,
    /// `None` keeps the work queue unbounded
    pub queue_capacity: Option<usize>,
}

/// Read-only view served by `GET /api/config`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub watched_directories: Vec<String>,
    pub category_folders: BTreeMap<String, String>,
    pub text_extensions: Vec<String>,
    pub image_extensions: Vec<String>,
}

impl Settings {
    /// Default layout rooted at `home`
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let sorted = home.join("sorted");
        let category_folders = Category::ALL
            .into_iter()
            .map(|c| (c, sorted.join(c.as_str())))
            .collect();

        Self {
            watch_dirs: vec![home.join("watched")],
            category_folders,
            text_extensions: DEFAULT_TEXT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            image_extensions: DEFAULT_IMAGE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            model_path: home.join("models").join("text_classifier.json"),
            static_dir: home.join("static"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            grace: DEFAULT_GRACE,
            queue_capacity: None,
            home,
        }
    }

    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        let home = match std::env::var_os("SORTDESK_HOME") {
            Some(h) => PathBuf::from(h),
            None => std::env::current_dir()
                .map_err(|e| SortError::io("cannot resolve working directory", e))?,
        };
        let mut settings = Self::with_home(home);

        if let Some(dirs) = std::env::var_os("SORTDESK_WATCH") {
            let parsed: Vec<PathBuf> = std::env::split_paths(&dirs)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !parsed.is_empty() {
                settings.watch_dirs = parsed;
            }
        }

        if let Ok(bind) = std::env::var("SORTDESK_BIND") {
            settings.bind_addr = bind
                .parse()
                .map_err(|e| SortError::Config(format!("SORTDESK_BIND={bind}: {e}")))?;
        }

        if let Ok(ms) = std::env::var("SORTDESK_GRACE_MS") {
            let ms: u64 = ms
                .parse()
                .map_err(|e| SortError::Config(format!("SORTDESK_GRACE_MS={ms}: {e}")))?;
            settings.grace = Duration::from_millis(ms);
        }

        if let Ok(cap) = std::env::var("SORTDESK_QUEUE_CAPACITY") {
            let cap: usize = cap
                .parse()
                .map_err(|e| SortError::Config(format!("SORTDESK_QUEUE_CAPACITY={cap}: {e}")))?;
            settings.queue_capacity = (cap > 0).then_some(cap);
        }

        settings.make_absolute()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Resolve relative paths against the working directory so suggestions
    /// and move destinations always carry absolute paths
    pub fn make_absolute(&mut self) -> Result<()> {
        let absolute = |p: &Path| {
            std::path::absolute(p)
                .map_err(|e| SortError::io(format!("cannot resolve {}", p.display()), e))
        };

        self.home = absolute(self.home.as_path())?;
        for dir in &mut self.watch_dirs {
            *dir = absolute(dir.as_path())?;
        }
        for folder in self.category_folders.values_mut() {
            *folder = absolute(folder.as_path())?;
        }
        self.model_path = absolute(self.model_path.as_path())?;
        self.static_dir = absolute(self.static_dir.as_path())?;
        Ok(())
    }

    /// Text and image extension sets must not overlap
    pub fn validate(&self) -> Result<()> {
        if let Some(ext) = self
            .text_extensions
            .iter()
            .find(|e| self.image_extensions.contains(e))
        {
            return Err(SortError::Config(format!(
                "extension {ext} is configured as both text and image"
            )));
        }
        if self.watch_dirs.is_empty() {
            return Err(SortError::Config("no directories to watch".to_string()));
        }
        Ok(())
    }

    /// Create watched and category directories
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in self.watch_dirs.iter().chain(self.category_folders.values()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| SortError::io(format!("cannot create {}", dir.display()), e))?;
        }
        Ok(())
    }

    pub fn kind_of(&self, path: &Path) -> Option<FileKind> {
        let ext = dotted_extension(path)?;
        if self.text_extensions.contains(&ext) {
            Some(FileKind::Text)
        } else if self.image_extensions.contains(&ext) {
            Some(FileKind::Image)
        } else {
            None
        }
    }

    /// Wrap `path` for the work queue if its extension is recognized
    pub fn recognize(&self, path: &Path) -> Option<QueuedFile> {
        self.kind_of(path)
            .map(|kind| QueuedFile::new(path.to_path_buf(), kind))
    }

    /// Destination folder for a category, falling back to `Others`
    pub fn folder_for(&self, category: Category) -> PathBuf {
        self.category_folders
            .get(&category)
            .or_else(|| self.category_folders.get(&Category::Others))
            .cloned()
            .unwrap_or_else(|| self.home.join("sorted").join(Category::Others.as_str()))
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            watched_directories: self
                .watch_dirs
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect(),
            category_folders: self
                .category_folders
                .iter()
                .map(|(c, p)| (c.to_string(), p.to_string_lossy().to_string()))
                .collect(),
            text_extensions: self.text_extensions.clone(),
            image_extensions: self.image_extensions.clone(),
        }
    }
}
