//! The capture ingestion service.
//!
//! Uploads arrive over HTTP, are spooled to temp files, and flow through a
//! bounded job queue into a fixed pool of decoder workers. The HTTP layer
//! never decodes; workers own their decoders outright.
//!
//! ```no_run
//! use trunkdec_crypto::KeyTable;
//! use trunkdec_service::{IngestService, ServiceConfig};
//!
//! let config = ServiceConfig::default();
//! let mut service = IngestService::start(config, KeyTable::new()).unwrap();
//! // ... serve until shutdown ...
//! service.stop();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod hook;
pub mod http;
pub mod jobs;
pub mod multipart;
pub mod paths;
pub mod tls;
pub mod worker;

mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use trunkdec_crypto::KeyTable;

pub use config::{ServiceConfig, TlsConfig};
pub use error::ServiceError;
pub use jobs::{Job, JobStatus};
pub use worker::{JobSpec, WorkerPool};

/// The running service: worker pool plus HTTP listener.
pub struct IngestService {
    pool: Arc<WorkerPool>,
    http: http::HttpServer,
}

impl IngestService {
    /// Start workers and the HTTP listener.
    ///
    /// Returns only once the listening socket is accepting connections;
    /// a successful return is the readiness signal.
    pub fn start(config: ServiceConfig, keys: KeyTable) -> Result<IngestService, ServiceError> {
        config.validate()?;
        std::fs::create_dir_all(&config.output_dir)?;

        let tls = match &config.tls {
            Some(tls_config) => Some(tls::load(tls_config)?),
            None => None,
        };

        let config = Arc::new(config);
        let pool = Arc::new(WorkerPool::new(Arc::clone(&config), Arc::new(keys)));
        pool.start();

        let state = Arc::new(api::AppState {
            config: Arc::clone(&config),
            pool: Arc::clone(&pool),
        });
        let router = Arc::new(api::build_router(state));

        let addr = format!("{}:{}", config.bind_addr, config.port);
        let http = http::HttpServer::start(&addr, router, tls)?;

        info!(
            addr = %http.local_addr(),
            workers = config.max_workers,
            queue = config.max_queue_size,
            "ingestion service ready"
        );

        Ok(IngestService { pool, http })
    }

    /// Address the HTTP listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.http.local_addr()
    }

    /// The worker pool, for status queries.
    #[must_use]
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Graceful shutdown: stop accepting connections, then drain and join
    /// the workers.
    pub fn stop(&mut self) {
        self.http.stop();
        self.pool.stop();
    }
}

impl Drop for IngestService {
    fn drop(&mut self) {
        self.stop();
    }
}
