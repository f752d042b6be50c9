//! Host lifecycle for the search sync handler
//!
//! Parses configuration once, then registers (`init`) or unregisters
//! (`shutdown`) a [`SearchSyncHandler`] with a host. A configuration that does
//! not parse leaves the extension disabled: it logs the problem once and never
//! registers anything.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::SearchSyncConfig;
use crate::error::{Result, SearchSyncError};
use crate::handler::{HandlerId, HandlerRegistry, SearchSyncHandler};
use crate::index_spec::IndexSpecTable;
use crate::transport::{HttpTransport, SearchTransport};

#[derive(Debug)]
struct Registration {
  id: HandlerId,
  handler: Arc<SearchSyncHandler>,
}

#[derive(Debug)]
pub struct SearchSyncExtension {
  config: SearchSyncConfig,
  table: Option<Arc<IndexSpecTable>>,
  registration: Mutex<Option<Registration>>,
}

impl SearchSyncExtension {
  pub fn new(config: SearchSyncConfig) -> Self {
    let table = match Self::build_table(&config) {
      Ok(table) => {
        tracing::info!(
          host = %config.host_name,
          index_spec = %config.index_spec,
          index_all = config.catch_all_index().unwrap_or(""),
          "search sync configured"
        );
        Some(Arc::new(table))
      }
      Err(error) => {
        tracing::error!(
          error = %error,
          index_spec = %config.index_spec,
          "search sync disabled"
        );
        None
      }
    };

    Self {
      config,
      table,
      registration: Mutex::new(None),
    }
  }

  fn build_table(config: &SearchSyncConfig) -> Result<IndexSpecTable> {
    config.validate()?;
    IndexSpecTable::parse(
      &config.index_spec,
      config.catch_all_index(),
      config.include_id_field,
      config.include_labels_field,
    )
  }

  pub fn config(&self) -> &SearchSyncConfig {
    &self.config
  }

  /// False when configuration failed to parse
  pub fn is_enabled(&self) -> bool {
    self.table.is_some()
  }

  pub fn is_registered(&self) -> bool {
    self.registration.lock().is_some()
  }

  pub fn table(&self) -> Option<&Arc<IndexSpecTable>> {
    self.table.as_ref()
  }

  /// The registered handler, if any
  pub fn handler(&self) -> Option<Arc<SearchSyncHandler>> {
    self
      .registration
      .lock()
      .as_ref()
      .map(|registration| registration.handler.clone())
  }

  /// Register with `registry` using an HTTP transport built from config.
  ///
  /// Returns `Ok(false)` without touching the registry when disabled.
  pub fn init(&self, registry: &dyn HandlerRegistry) -> Result<bool> {
    if !self.is_enabled() {
      return Ok(false);
    }
    let transport = HttpTransport::from_config(&self.config)?;
    self.init_with_transport(registry, Arc::new(transport))
  }

  /// Register with `registry`, shipping bulk requests through `transport`
  pub fn init_with_transport(
    &self,
    registry: &dyn HandlerRegistry,
    transport: Arc<dyn SearchTransport>,
  ) -> Result<bool> {
    let Some(table) = self.table.clone() else {
      return Ok(false);
    };

    let mut registration = self.registration.lock();
    if registration.is_some() {
      return Err(SearchSyncError::AlreadyRegistered);
    }

    let handler = Arc::new(SearchSyncHandler::new(table, transport, self.config.mode()));
    let id = registry.register_handler(handler.clone());
    tracing::info!(
      handler = %id,
      host = %self.config.host_name,
      mode = %self.config.mode(),
      "search sync handler registered"
    );
    *registration = Some(Registration { id, handler });
    Ok(true)
  }

  /// Unregister and release the transport. Returns false if not registered.
  pub fn shutdown(&self, registry: &dyn HandlerRegistry) -> bool {
    let Some(registration) = self.registration.lock().take() else {
      return false;
    };

    if !registry.unregister_handler(registration.id) {
      tracing::warn!(handler = %registration.id, "handler was already unregistered");
    }
    registration.handler.dispatcher().transport().shutdown();
    tracing::info!(handler = %registration.id, "search sync handler unregistered");
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::MemoryGraph;
  use crate::transport::MemoryTransport;

  #[test]
  fn invalid_spec_disables_extension() {
    let graph = MemoryGraph::new();
    let extension = SearchSyncExtension::new(SearchSyncConfig::new(
      "http://localhost:9200",
      "idx:Person;idx:Person",
    ));
    assert!(!extension.is_enabled());
    assert!(!extension.init(&graph).expect("init"));
    assert!(!extension.is_registered());
  }

  #[test]
  fn registers_once_and_shuts_down() {
    let graph = MemoryGraph::new();
    let extension = SearchSyncExtension::new(
      SearchSyncConfig::new("http://localhost:9200", "idx:Person").index_all("all"),
    );
    let transport = Arc::new(MemoryTransport::new());

    assert!(extension
      .init_with_transport(&graph, transport.clone())
      .expect("init"));
    assert!(matches!(
      extension.init_with_transport(&graph, transport.clone()),
      Err(SearchSyncError::AlreadyRegistered)
    ));
    assert_eq!(
      extension.table().and_then(|table| table.catch_all_index()),
      Some("all")
    );

    assert!(extension.shutdown(&graph));
    assert!(!extension.shutdown(&graph));
    assert!(extension.handler().is_none());
  }
}
