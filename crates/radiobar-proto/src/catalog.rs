//! Station list, loaded once at startup and read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    /// Display name; unique within a catalog.
    pub title: String,
    #[serde(rename = "url")]
    pub stream_url: String,
}

impl Station {
    pub fn new(title: impl Into<String>, stream_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            stream_url: stream_url.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read station file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed station file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("unsupported station file type {0} (expected .json or .toml)")]
    UnsupportedFormat(PathBuf),
    #[error("no stations defined")]
    Empty,
    #[error("station #{index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },
    #[error("duplicate station title {0:?}")]
    DuplicateTitle(String),
}

#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    stations: Vec<Station>,
}

impl StationCatalog {
    /// Validate and wrap a station list. Order is preserved; it is the order
    /// the numeric remote commands refer to.
    pub fn new(stations: Vec<Station>) -> Result<Self, CatalogError> {
        if stations.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for (i, s) in stations.iter().enumerate() {
            if s.title.trim().is_empty() {
                return Err(CatalogError::EmptyField {
                    index: i + 1,
                    field: "title",
                });
            }
            if s.stream_url.trim().is_empty() {
                return Err(CatalogError::EmptyField {
                    index: i + 1,
                    field: "url",
                });
            }
            if !seen.insert(s.title.as_str()) {
                return Err(CatalogError::DuplicateTitle(s.title.clone()));
            }
        }

        Ok(Self { stations })
    }

    /// A catalog with no stations, used when the station file could not be loaded.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let stations = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => parse_stations_from_json_str(&content),
            Some("toml") => parse_stations_from_toml_str(&content),
            _ => return Err(CatalogError::UnsupportedFormat(path.to_path_buf())),
        }
        .map_err(|message| CatalogError::Parse {
            path: path.to_path_buf(),
            message,
        })?;

        Self::new(stations)
    }

    pub fn get(&self, title: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.title == title)
    }

    /// 1-based lookup, as used by the numeric remote command.
    pub fn by_number(&self, n: usize) -> Option<&Station> {
        n.checked_sub(1).and_then(|i| self.stations.get(i))
    }

    pub fn as_slice(&self) -> &[Station] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

// ── JSON loader ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct JsonStationFile {
    channels: Vec<Station>,
}

pub fn parse_stations_from_json_str(content: &str) -> Result<Vec<Station>, String> {
    let file: JsonStationFile = serde_json::from_str(content).map_err(|e| e.to_string())?;
    Ok(file.channels)
}

// ── TOML loader ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TomlStationFile {
    station: Vec<TomlStation>,
}

#[derive(Debug, Deserialize)]
struct TomlStation {
    title: String,
    url: String,
}

pub fn parse_stations_from_toml_str(content: &str) -> Result<Vec<Station>, String> {
    let file: TomlStationFile = toml::from_str(content).map_err(|e| e.to_string())?;
    Ok(file
        .station
        .into_iter()
        .map(|s| Station::new(s.title, s.url))
        .collect())
}
