use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SearchError};

/// Tunables read from `.blogfind.toml`. Every key is optional.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Shortest trimmed query, in characters, that triggers a search.
    pub min_query_chars: usize,
    pub debounce_ms: u64,
    /// Characters of context on each side of a match in previews.
    pub context_chars: usize,
    /// Class of the element whose text the highlighter scans.
    pub content_class: String,
    /// Delay between page load and the highlight scan.
    pub content_wait_ms: u64,
    pub scroll_settle_ms: u64,
    pub recenter_ms: u64,
    pub recenter_tolerance_px: f64,
    pub highlight_animation_ms: u64,
    pub heading_highlight_ms: u64,
    pub posts_prefix: String,
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            min_query_chars: 2,
            debounce_ms: 200,
            context_chars: 50,
            content_class: "content-wrapper".to_string(),
            content_wait_ms: 500,
            scroll_settle_ms: 800,
            recenter_ms: 500,
            recenter_tolerance_px: 10.0,
            highlight_animation_ms: 2000,
            heading_highlight_ms: 1500,
            posts_prefix: "/posts/".to_string(),
            data_path: PathBuf::from("assets/data/search-data.json"),
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Config> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(SearchError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Config::from_toml(&raw).map_err(|message| SearchError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml(raw: &str) -> std::result::Result<Config, String> {
        let config: Config = toml::from_str(raw).map_err(|e| e.to_string())?;
        if config.min_query_chars == 0 {
            return Err("min_query_chars must be at least 1".to_string());
        }
        Ok(config)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn content_wait(&self) -> Duration {
        Duration::from_millis(self.content_wait_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub fn recenter(&self) -> Duration {
        Duration::from_millis(self.recenter_ms)
    }

    pub fn highlight_animation(&self) -> Duration {
        Duration::from_millis(self.highlight_animation_ms)
    }

    pub fn heading_highlight(&self) -> Duration {
        Duration::from_millis(self.heading_highlight_ms)
    }
}
