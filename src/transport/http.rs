//! Elasticsearch-compatible HTTP `_bulk` transport.

use parking_lot::Mutex;
use std::io::Read;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

use super::{BulkCompletion, SearchTransport};
use crate::bulk::{decode_bulk_response, BulkRequest, BulkResponse, BULK_CONTENT_TYPE};
use crate::config::SearchSyncConfig;
use crate::error::{Result, SearchSyncError};

/// HTTP transport options
#[derive(Debug, Clone)]
pub struct HttpTransportOptions {
  /// Socket read timeout per request
  pub read_timeout: Duration,
  /// Emit `_type` in bulk action lines
  pub include_type: bool,
  /// Runtime worker threads for asynchronous submissions
  pub worker_threads: usize,
}

impl Default for HttpTransportOptions {
  fn default() -> Self {
    Self {
      read_timeout: Duration::from_secs(60),
      include_type: true,
      worker_threads: 2,
    }
  }
}

/// Posts NDJSON bulk bodies to `{host}/_bulk`.
///
/// Synchronous calls run on the caller's thread. Asynchronous calls run on a
/// runtime owned by the transport, which lives until [`SearchTransport::shutdown`].
#[derive(Debug)]
pub struct HttpTransport {
  bulk_url: String,
  agent: ureq::Agent,
  include_type: bool,
  runtime: Mutex<Option<Runtime>>,
}

impl HttpTransport {
  pub fn new(host: &str, options: HttpTransportOptions) -> Result<Self> {
    let host = host.trim().trim_end_matches('/');
    if !(host.starts_with("http://") || host.starts_with("https://")) {
      return Err(SearchSyncError::InvalidConfig(format!(
        "search host must be an http(s) URL: {host:?}"
      )));
    }

    let agent = ureq::AgentBuilder::new()
      .timeout_read(options.read_timeout)
      .build();
    let runtime = Builder::new_multi_thread()
      .worker_threads(options.worker_threads.max(1))
      .thread_name("kitedb-search-bulk")
      .enable_time()
      .build()?;

    Ok(Self {
      bulk_url: format!("{host}/_bulk"),
      agent,
      include_type: options.include_type,
      runtime: Mutex::new(Some(runtime)),
    })
  }

  pub fn from_config(config: &SearchSyncConfig) -> Result<Self> {
    Self::new(
      &config.host_name,
      HttpTransportOptions {
        read_timeout: Duration::from_millis(config.read_timeout_ms),
        include_type: config.include_type,
        ..HttpTransportOptions::default()
      },
    )
  }

  pub fn bulk_url(&self) -> &str {
    &self.bulk_url
  }
}

impl SearchTransport for HttpTransport {
  fn execute(&self, request: &BulkRequest) -> Result<BulkResponse> {
    let body = request.to_ndjson(self.include_type)?;
    post_bulk(&self.agent, &self.bulk_url, &body)
  }

  fn execute_async(&self, request: BulkRequest, on_complete: BulkCompletion) {
    let body = match request.to_ndjson(self.include_type) {
      Ok(body) => body,
      Err(error) => {
        on_complete(Err(error));
        return;
      }
    };

    let runtime = self.runtime.lock();
    match runtime.as_ref() {
      Some(runtime) => {
        let agent = self.agent.clone();
        let url = self.bulk_url.clone();
        runtime.spawn_blocking(move || on_complete(post_bulk(&agent, &url, &body)));
      }
      None => on_complete(Err(SearchSyncError::Transport(
        "transport is shut down".to_string(),
      ))),
    }
  }

  fn shutdown(&self) {
    if let Some(runtime) = self.runtime.lock().take() {
      runtime.shutdown_background();
    }
  }
}

fn post_bulk(agent: &ureq::Agent, url: &str, body: &str) -> Result<BulkResponse> {
  match agent
    .post(url)
    .set("Content-Type", BULK_CONTENT_TYPE)
    .send_string(body)
  {
    Ok(response) => {
      // `into_string` caps bodies at 10 MB; large bulk answers must still decode.
      let mut body = Vec::new();
      response.into_reader().read_to_end(&mut body)?;
      decode_bulk_response(&body)
    }
    Err(ureq::Error::Status(status, response)) => Err(SearchSyncError::TransportStatus {
      status,
      body: response.into_string().unwrap_or_default(),
    }),
    Err(ureq::Error::Transport(transport)) => Err(SearchSyncError::Transport(transport.to_string())),
  }
}
