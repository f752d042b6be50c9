//! Search sync configuration
//!
//! Loaded from host settings (flat `elasticsearch.*` keys) or from a JSON
//! file. Only `host_name` and `index_spec` are required.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::dispatch::DispatchMode;
use crate::error::{Result, SearchSyncError};

pub const SETTING_HOST_NAME: &str = "elasticsearch.host_name";
pub const SETTING_INDEX_SPEC: &str = "elasticsearch.index_spec";
pub const SETTING_INDEX_ALL: &str = "elasticsearch.index_all";
pub const SETTING_INCLUDE_ID_FIELD: &str = "elasticsearch.include_id_field";
pub const SETTING_INCLUDE_LABELS_FIELD: &str = "elasticsearch.include_labels_field";
pub const SETTING_INCLUDE_TYPE: &str = "elasticsearch.include_type";
pub const SETTING_ASYNC_DISPATCH: &str = "elasticsearch.async_dispatch";
pub const SETTING_READ_TIMEOUT_MS: &str = "elasticsearch.read_timeout_ms";

const DEFAULT_READ_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSyncConfig {
  /// Search cluster base URL, e.g. `http://localhost:9200`
  pub host_name: String,
  /// `index:Label(prop,...);...`
  pub index_spec: String,
  /// Catch-all index receiving every participating node
  #[serde(default)]
  pub index_all: Option<String>,
  #[serde(default = "default_true")]
  pub include_id_field: bool,
  #[serde(default = "default_true")]
  pub include_labels_field: bool,
  #[serde(default = "default_true")]
  pub include_type: bool,
  #[serde(default = "default_true")]
  pub async_dispatch: bool,
  #[serde(default = "default_read_timeout_ms")]
  pub read_timeout_ms: u64,
}

fn default_true() -> bool {
  true
}

fn default_read_timeout_ms() -> u64 {
  DEFAULT_READ_TIMEOUT_MS
}

impl SearchSyncConfig {
  pub fn new(host_name: impl Into<String>, index_spec: impl Into<String>) -> Self {
    Self {
      host_name: host_name.into(),
      index_spec: index_spec.into(),
      index_all: None,
      include_id_field: true,
      include_labels_field: true,
      include_type: true,
      async_dispatch: true,
      read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
    }
  }

  pub fn index_all(mut self, index: impl Into<String>) -> Self {
    self.index_all = Some(index.into());
    self
  }

  pub fn include_id_field(mut self, include: bool) -> Self {
    self.include_id_field = include;
    self
  }

  pub fn include_labels_field(mut self, include: bool) -> Self {
    self.include_labels_field = include;
    self
  }

  pub fn dispatch_mode(mut self, mode: DispatchMode) -> Self {
    self.async_dispatch = mode == DispatchMode::Async;
    self
  }

  pub fn mode(&self) -> DispatchMode {
    if self.async_dispatch {
      DispatchMode::Async
    } else {
      DispatchMode::Sync
    }
  }

  /// Catch-all index, with blank names treated as unset
  pub fn catch_all_index(&self) -> Option<&str> {
    self
      .index_all
      .as_deref()
      .map(str::trim)
      .filter(|name| !name.is_empty())
  }

  /// Build from flat host settings
  pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self> {
    let required = |key: &str| {
      settings
        .get(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SearchSyncError::InvalidConfig(format!("missing setting {key}")))
    };

    let mut config = Self::new(required(SETTING_HOST_NAME)?, required(SETTING_INDEX_SPEC)?);
    config.index_all = settings
      .get(SETTING_INDEX_ALL)
      .map(|value| value.trim().to_string())
      .filter(|value| !value.is_empty());
    config.include_id_field = parse_bool(settings, SETTING_INCLUDE_ID_FIELD, true)?;
    config.include_labels_field = parse_bool(settings, SETTING_INCLUDE_LABELS_FIELD, true)?;
    config.include_type = parse_bool(settings, SETTING_INCLUDE_TYPE, true)?;
    config.async_dispatch = parse_bool(settings, SETTING_ASYNC_DISPATCH, true)?;
    config.read_timeout_ms = match settings.get(SETTING_READ_TIMEOUT_MS) {
      Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
        SearchSyncError::InvalidConfig(format!("invalid {SETTING_READ_TIMEOUT_MS}: {raw}"))
      })?,
      None => DEFAULT_READ_TIMEOUT_MS,
    };
    config.validate()?;
    Ok(config)
  }

  /// Load from a JSON file
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let bytes = fs::read(path.as_ref())?;
    let config: Self = serde_json::from_slice(&bytes).map_err(|error| {
      SearchSyncError::InvalidConfig(format!(
        "decode {}: {error}",
        path.as_ref().display()
      ))
    })?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    if self.host_name.trim().is_empty() {
      return Err(SearchSyncError::InvalidConfig(
        "host_name must not be empty".to_string(),
      ));
    }
    if self.index_spec.trim().is_empty() {
      return Err(SearchSyncError::InvalidConfig(
        "index_spec must not be empty".to_string(),
      ));
    }
    if self.read_timeout_ms == 0 {
      return Err(SearchSyncError::InvalidConfig(
        "read_timeout_ms must be positive".to_string(),
      ));
    }
    Ok(())
  }
}

fn parse_bool(settings: &HashMap<String, String>, key: &str, default: bool) -> Result<bool> {
  match settings.get(key).map(|value| value.trim()) {
    None | Some("") => Ok(default),
    Some(raw) if raw.eq_ignore_ascii_case("true") => Ok(true),
    Some(raw) if raw.eq_ignore_ascii_case("false") => Ok(false),
    Some(raw) => Err(SearchSyncError::InvalidConfig(format!(
      "invalid {key}: {raw}"
    ))),
  }
}
