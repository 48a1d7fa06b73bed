//! Typed codecs for the composite values kept in the client store.
//! 客戶端儲存區中複合值的型別化編解碼。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cookie::FIELD_DELIMITER;
use crate::store::{self, StateStore, StoreError};

pub const LANGUAGE_KEY: &str = "language";
pub const WINDOW_SHOW_KEY: &str = "toolsWindowShow";
pub const WINDOW_XY_KEY: &str = "toolsWindowXY";
pub const MAP_CENTER_KEY: &str = "mapCenter";

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_WINDOW_X: f64 = 60.0;
pub const DEFAULT_WINDOW_Y: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("no value stored under {0}")]
    Missing(&'static str),
    #[error("value stored under {0} is empty")]
    Empty(&'static str),
    #[error("expected {expected} fields separated by '|', found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("field {index} ({raw:?}) is not a number")]
    InvalidNumber { index: usize, raw: String },
    #[error("field {index} ({raw:?}) is not a finite number")]
    NonFinite { index: usize, raw: String },
}

/// 單一儲存鍵的編解碼規則。 / Encoding rules for a value stored under one fixed key.
pub trait StateCodec: Sized {
    const KEY: &'static str;

    fn encode(&self) -> String;

    fn decode(raw: &str) -> Result<Self, DecodeError>;

    /// 從儲存區讀取並解碼。 / Reads and decodes the value from `store`.
    fn load<S: StateStore + ?Sized>(store: &S) -> Result<Self, DecodeError> {
        let raw = store::read(store, Self::KEY).ok_or(DecodeError::Missing(Self::KEY))?;
        Self::decode(&raw)
    }

    /// 編碼並寫入儲存區。 / Encodes and writes the value to `store`.
    fn save<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        expire_days: Option<u32>,
    ) -> Result<(), StoreError> {
        store::write(store, Self::KEY, &self.encode(), expire_days)
    }
}

/// Display language preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language(pub String);

impl Default for Language {
    fn default() -> Self {
        Self(DEFAULT_LANGUAGE.to_string())
    }
}

impl StateCodec for Language {
    const KEY: &'static str = LANGUAGE_KEY;

    fn encode(&self) -> String {
        self.0.clone()
    }

    fn decode(raw: &str) -> Result<Self, DecodeError> {
        if raw.is_empty() {
            return Err(DecodeError::Empty(Self::KEY));
        }
        Ok(Self(raw.to_string()))
    }
}

/// 工具視窗是否顯示。 / Whether the tools window is shown.
///
/// Only the exact string `"false"` hides the window; anything else, absence
/// included, means shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowVisibility {
    pub visible: bool,
}

impl WindowVisibility {
    pub fn from_stored(raw: Option<&str>) -> Self {
        Self {
            visible: raw != Some("false"),
        }
    }
}

impl Default for WindowVisibility {
    fn default() -> Self {
        Self { visible: true }
    }
}

impl StateCodec for WindowVisibility {
    const KEY: &'static str = WINDOW_SHOW_KEY;

    fn encode(&self) -> String {
        self.visible.to_string()
    }

    fn decode(raw: &str) -> Result<Self, DecodeError> {
        Ok(Self::from_stored(Some(raw)))
    }
}

/// 工具視窗左上角座標，編碼為 `x|y`。 / Tools window position, encoded as `x|y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowPosition {
    pub x: f64,
    pub y: f64,
}

impl WindowPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Default for WindowPosition {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_X, DEFAULT_WINDOW_Y)
    }
}

impl StateCodec for WindowPosition {
    const KEY: &'static str = WINDOW_XY_KEY;

    fn encode(&self) -> String {
        format!("{}{FIELD_DELIMITER}{}", self.x, self.y)
    }

    fn decode(raw: &str) -> Result<Self, DecodeError> {
        let fields = split_fields(raw, 2)?;
        Ok(Self {
            x: parse_float(0, fields[0])?,
            y: parse_float(1, fields[1])?,
        })
    }
}

/// 地圖中心與縮放等級，編碼為 `lat|lon|zoom`。 / Map center and zoom, encoded as `lat|lon|zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportCenter {
    pub lat: f64,
    pub lon: f64,
    pub zoom: i32,
}

impl ViewportCenter {
    pub fn new(lat: f64, lon: f64, zoom: i32) -> Self {
        Self { lat, lon, zoom }
    }

    /// 所有欄位皆非零時才視為已設定。 / `true` only when every field is non-zero.
    ///
    /// A stored zero in any field reads as "not set", so a center on the
    /// equator, on the prime meridian, or at zoom 0 is never restored.
    pub fn is_set(&self) -> bool {
        self.lat != 0.0 && self.lon != 0.0 && self.zoom != 0
    }
}

impl Default for ViewportCenter {
    fn default() -> Self {
        Self::new(37.59, -96.70, 3)
    }
}

impl StateCodec for ViewportCenter {
    const KEY: &'static str = MAP_CENTER_KEY;

    fn encode(&self) -> String {
        format!(
            "{}{FIELD_DELIMITER}{}{FIELD_DELIMITER}{}",
            self.lat, self.lon, self.zoom
        )
    }

    fn decode(raw: &str) -> Result<Self, DecodeError> {
        let fields = split_fields(raw, 3)?;
        let zoom = fields[2]
            .trim()
            .parse::<i32>()
            .map_err(|_| DecodeError::InvalidNumber {
                index: 2,
                raw: fields[2].to_string(),
            })?;
        Ok(Self {
            lat: parse_float(0, fields[0])?,
            lon: parse_float(1, fields[1])?,
            zoom,
        })
    }
}

fn split_fields(raw: &str, expected: usize) -> Result<Vec<&str>, DecodeError> {
    let fields: Vec<&str> = raw.split(FIELD_DELIMITER).collect();
    if fields.len() != expected {
        return Err(DecodeError::FieldCount {
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn parse_float(index: usize, raw: &str) -> Result<f64, DecodeError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| DecodeError::InvalidNumber {
            index,
            raw: raw.to_string(),
        })?;
    if !value.is_finite() {
        return Err(DecodeError::NonFinite {
            index,
            raw: raw.to_string(),
        });
    }
    Ok(value)
}
