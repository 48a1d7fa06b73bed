use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::codec::{ViewportCenter, WindowPosition, DEFAULT_LANGUAGE};

const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize config {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Repairs out-of-range values after deserialization.
pub trait Sanitize {
    fn sanitize(&mut self);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default)]
    pub default_window_position: WindowPosition,
    #[serde(default)]
    pub default_viewport: ViewportCenter,
    #[serde(default)]
    pub write_expire_days: Option<u32>,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            default_language: default_language(),
            default_window_position: WindowPosition::default(),
            default_viewport: ViewportCenter::default(),
            write_expire_days: None,
        }
    }
}

impl Sanitize for SessionConfig {
    fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = CONFIG_VERSION;
        }
        if self.default_language.trim().is_empty() {
            self.default_language = default_language();
        }
        let position = self.default_window_position;
        if !position.is_finite() || position.x == 0.0 || position.y == 0.0 {
            self.default_window_position = WindowPosition::default();
        }
        let viewport = self.default_viewport;
        if !viewport.lat.is_finite() || !viewport.lon.is_finite() || !viewport.is_set() {
            self.default_viewport = ViewportCenter::default();
        }
        if self.write_expire_days == Some(0) {
            self.write_expire_days = None;
        }
    }
}

impl SessionConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load(path)
    }
}

/// 載入 JSON 設定；檔案不存在時使用預設值。 / Loads a JSON config, using defaults when the file is missing.
pub fn load<T>(path: impl AsRef<Path>) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default + Sanitize,
{
    let path = path.as_ref().to_path_buf();
    if !path.exists() {
        let mut data = T::default();
        data.sanitize();
        return Ok(data);
    }

    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let mut data: T = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    data.sanitize();
    Ok(data)
}

/// 以原子方式寫出 JSON 設定。 / Writes a JSON config atomically.
pub fn save<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<(), ConfigError> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let payload = serde_json::to_string_pretty(value).map_err(|source| ConfigError::Serialize {
        path: path.clone(),
        source,
    })?;

    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, payload.as_bytes()).map_err(|source| ConfigError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, &path).map_err(|source| ConfigError::Write { path, source })
}
