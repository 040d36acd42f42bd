//! Platform capabilities the conversation client is handed instead of reaching
//! for global storage, the system clipboard or the filesystem directly.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Anything that is not exactly `"dark"` loads as light.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait ThemeStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, value: &str) -> Result<()>;
}

pub trait Clipboard: Send + Sync {
    fn set_text(&self, text: &str) -> Result<()>;
}

pub trait Downloader: Send + Sync {
    fn save(&self, file_name: &str, contents: &str) -> Result<()>;
}

/// The bundle of capabilities injected into a client.
#[derive(Clone)]
pub struct Platform {
    pub theme_store: Arc<dyn ThemeStore>,
    pub clipboard: Arc<dyn Clipboard>,
    pub downloader: Arc<dyn Downloader>,
}

impl Platform {
    /// Everything kept in memory, nothing written anywhere.
    pub fn in_memory() -> Self {
        Self {
            theme_store: Arc::new(MemoryThemeStore::default()),
            clipboard: Arc::new(MemoryClipboard::default()),
            downloader: Arc::new(MemoryDownloader::default()),
        }
    }
}

#[derive(Default)]
pub struct MemoryThemeStore {
    value: Mutex<Option<String>>,
}

impl ThemeStore for MemoryThemeStore {
    fn load(&self) -> Option<String> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn save(&self, value: &str) -> Result<()> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.to_string());
        Ok(())
    }
}

/// Keeps the theme in a single small text file.
pub struct FileThemeStore {
    path: PathBuf,
}

impl FileThemeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ThemeStore for FileThemeStore {
    fn load(&self) -> Option<String> {
        fs::read_to_string(&self.path).ok().map(|s| s.trim().to_string())
    }

    fn save(&self, value: &str) -> Result<()> {
        fs::write(&self.path, value)
            .with_context(|| format!("failed to write theme to {}", self.path.display()))
    }
}

#[derive(Default)]
pub struct MemoryClipboard {
    text: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn text(&self) -> Option<String> {
        self.text.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn set_text(&self, text: &str) -> Result<()> {
        *self.text.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.to_string());
        Ok(())
    }
}

/// The system clipboard. One handle stays open for the life of the value; on
/// X11 the copied text disappears when the last handle drops.
pub struct SystemClipboard {
    inner: Mutex<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let inner = arboard::Clipboard::new().context("system clipboard is unavailable")?;
        Ok(Self {
            inner: Mutex::new(inner),
        })
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<()> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_text(text.to_string())?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDownloader {
    files: Mutex<Vec<(String, String)>>,
}

impl MemoryDownloader {
    pub fn files(&self) -> Vec<(String, String)> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Downloader for MemoryDownloader {
    fn save(&self, file_name: &str, contents: &str) -> Result<()> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((file_name.to_string(), contents.to_string()));
        Ok(())
    }
}

/// Writes downloads into a directory, overwriting files of the same name.
pub struct DirDownloader {
    dir: PathBuf,
}

impl DirDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Downloader for DirDownloader {
    fn save(&self, file_name: &str, contents: &str) -> Result<()> {
        let path = self.dir.join(file_name);
        fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
    }
}
