//! Loading configuration sources from disk
//!
//! A source is one file in JSON, TOML or YAML. Each loaded source records
//! its path and a SHA-256 digest of the raw bytes for provenance.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// File format of a configuration source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Json,
    Toml,
    Yaml,
}

impl SourceFormat {
    /// Detect the format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Toml => "toml",
            Self::Yaml => "yaml",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigSource {
    /// File path as given
    pub path: String,

    /// Detected file format
    pub format: SourceFormat,

    /// SHA-256 digest of raw file bytes
    pub digest: String,
}

impl ConfigSource {
    /// Read and parse a source file, returning its provenance and value
    pub fn load(path: &Path) -> Result<(Self, Value), SourceError> {
        let shown = path.display().to_string();

        let format = SourceFormat::from_path(path)
            .ok_or_else(|| SourceError::UnsupportedFormat(shown.clone()))?;

        let bytes = fs::read(path).map_err(|source| SourceError::Io {
            path: shown.clone(),
            source,
        })?;
        let digest = sha256_hex(&bytes);

        let contents =
            String::from_utf8(bytes).map_err(|_| SourceError::InvalidUtf8(shown.clone()))?;
        let value = parse(&contents, format, &shown)?;

        debug!(path = %shown, %format, %digest, "loaded config source");

        Ok((
            Self {
                path: shown,
                format,
                digest,
            },
            value,
        ))
    }
}

/// Parse source text in the given format
pub fn parse(contents: &str, format: SourceFormat, path: &str) -> Result<Value, SourceError> {
    match format {
        SourceFormat::Json => serde_json::from_str(contents).map_err(|source| SourceError::Json {
            path: path.to_string(),
            source,
        }),
        SourceFormat::Toml => {
            let table: toml::Table =
                toml::from_str(contents).map_err(|source| SourceError::Toml {
                    path: path.to_string(),
                    source,
                })?;
            Ok(toml_to_json(toml::Value::Table(table)))
        }
        SourceFormat::Yaml => serde_yaml::from_str(contents).map_err(|source| SourceError::Yaml {
            path: path.to_string(),
            source,
        }),
    }
}

/// Hex-encoded SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Convert TOML Value to JSON Value
///
/// Datetimes become their string form; non-finite floats become `null`.
pub fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Source loading errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("unsupported source format: {0} (expected .json, .toml, .yaml or .yml)")]
    UnsupportedFormat(String),

    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(String),

    #[error("JSON parse error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("TOML parse error in {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("YAML parse error in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
