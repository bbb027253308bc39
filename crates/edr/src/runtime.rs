// EDB - Ethereum Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The EDR runtime: lifecycle of the HTTP listener and the gated operations.
//!
//! [`Edr`] owns the listener and the stopped flag. The chain collaborator and
//! the [`CloseApp`] callback are supplied by the owner at construction.
//!
//! ```no_run
//! # use std::{sync::Arc, time::Duration};
//! # use edr::{ChainConfig, CloseApp, Edr, RpcChain};
//! # async fn example() -> eyre::Result<()> {
//! let config = ChainConfig { tracer_enabled: true, ..Default::default() };
//! let chain = Arc::new(RpcChain::new(config.clone())?);
//! let (close_app, mut fatal) = CloseApp::channel();
//!
//! let edr = Edr::new(None, close_app, config, chain);
//! edr.start().await?;
//!
//! if let Some(cause) = fatal.recv().await {
//!     tracing::error!("EDR failed: {cause}");
//! }
//! edr.stop(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

use alloy_primitives::TxHash;
use edr_common::TraceResult;
use std::{
    fmt,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    chain::Chain, client::EthClient, config::ChainConfig, debug::DebugRequest, error::EdrError,
    health::HealthService, routes,
};

/// Callback that asks the owning process to shut down, carrying the cause.
#[derive(Clone)]
pub struct CloseApp(Arc<dyn Fn(eyre::Report) + Send + Sync>);

impl CloseApp {
    /// Wrap a callback
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(eyre::Report) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// A callback that forwards every cause into a channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<eyre::Report>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let close_app = Self::new(move |cause| {
            // The owner may already be gone
            let _ = tx.send(cause);
        });
        (close_app, rx)
    }

    /// A callback that only logs
    pub fn noop() -> Self {
        Self::new(|cause| debug!("Close requested without a listener: {cause}"))
    }

    /// Ask the owner to shut down
    pub fn close(&self, cause: eyre::Report) {
        (self.0)(cause)
    }
}

impl fmt::Debug for CloseApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloseApp").finish_non_exhaustive()
    }
}

/// Live listener owned by a running [`Edr`]
#[derive(Debug)]
struct ServerHandle {
    /// Address the listener is bound to
    addr: SocketAddr,
    /// Triggers graceful shutdown
    shutdown_tx: oneshot::Sender<()>,
    /// The serving task
    task: JoinHandle<()>,
}

/// Ethereum Debugging Runtime.
///
/// Cheap to clone: clones share the listener, the stopped flag and the chain.
pub struct Edr<C: Chain> {
    /// Configuration supplied by the owner, read-only
    cfg: Arc<ChainConfig>,
    /// External chain collaborator
    chain: Arc<C>,
    /// File the logging layer writes to, if any
    log_file_path: Option<PathBuf>,
    /// Tells the owning process to terminate
    close_app: CloseApp,
    /// Uptime and status reporting
    health: Arc<HealthService>,
    /// Listener slot, empty until `start`
    server: Arc<Mutex<Option<ServerHandle>>>,
    /// One-way running -> stopped transition
    stopped: Arc<AtomicBool>,
}

impl<C: Chain> Clone for Edr<C> {
    fn clone(&self) -> Self {
        Self {
            cfg: Arc::clone(&self.cfg),
            chain: Arc::clone(&self.chain),
            log_file_path: self.log_file_path.clone(),
            close_app: self.close_app.clone(),
            health: Arc::clone(&self.health),
            server: Arc::clone(&self.server),
            stopped: Arc::clone(&self.stopped),
        }
    }
}

impl<C: Chain> fmt::Debug for Edr<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edr")
            .field("cfg", &self.cfg)
            .field("log_file_path", &self.log_file_path)
            .field("stopped", &self.stopped.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<C: Chain> Edr<C> {
    /// Create a runtime. Performs no I/O.
    ///
    /// # Arguments
    /// * `log_file_path` - File the logging layer writes to, reported by [`Edr::log_path`]
    /// * `close_app` - Called with the cause when the listener fails fatally
    /// * `cfg` - Listener settings and feature gates
    /// * `chain` - Collaborator all operations are delegated to
    pub fn new(
        log_file_path: Option<PathBuf>,
        close_app: CloseApp,
        cfg: ChainConfig,
        chain: Arc<C>,
    ) -> Self {
        Self {
            cfg: Arc::new(cfg),
            chain,
            log_file_path,
            close_app,
            health: Arc::new(HealthService::new()),
            server: Arc::new(Mutex::new(None)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Bind the listener and start serving in the background.
    ///
    /// Returns once the listener is bound. A bind failure is returned and also
    /// handed to [`CloseApp`]; so is any error the server hits later on.
    pub async fn start(&self) -> Result<(), EdrError> {
        let mut server = self.server.lock().await;
        if self.stopped.load(Ordering::SeqCst) {
            return Err(EdrError::AlreadyStopped);
        }
        if server.is_some() {
            return Err(EdrError::AlreadyStarted);
        }

        let addr = self.cfg.listen_addr();
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                error!(%addr, err = %source, "Failed to bind EDR listener");
                self.close_app
                    .close(eyre::eyre!("failed to bind EDR listener on {addr}: {source}"));
                return Err(EdrError::Bind { addr, source });
            }
        };
        let local_addr = listener.local_addr().map_err(|source| EdrError::Bind { addr, source })?;

        let app = routes::router(self.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let close_app = self.close_app.clone();

        info!(port = self.cfg.port, addr = %local_addr, "Starting EDR server");

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_rx.await.ok();
                })
                .await;

            if let Err(err) = result {
                error!(%err, "EDR server error");
                close_app.close(eyre::Report::new(err).wrap_err("EDR server error"));
            }
        });

        *server = Some(ServerHandle { addr: local_addr, shutdown_tx, task });
        Ok(())
    }

    /// Gracefully shut the listener down, waiting up to `timeout` for in-flight requests.
    ///
    /// Only the first call does anything; every later or concurrent call fails
    /// with [`EdrError::AlreadyStopped`].
    pub async fn stop(&self, timeout: Duration) -> Result<(), EdrError> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Err(EdrError::AlreadyStopped);
        }

        let Some(ServerHandle { addr, shutdown_tx, task }) = self.server.lock().await.take() else {
            debug!("EDR stopped before it was started");
            return Ok(());
        };

        info!(%addr, "Stopping EDR server");

        // The task may already have exited on a serve error
        let _ = shutdown_tx.send(());

        let abort = task.abort_handle();
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(())) => {
                info!("EDR server stopped");
                Ok(())
            }
            Ok(Err(err)) => Err(EdrError::Server(err.to_string())),
            Err(_) => {
                warn!(?timeout, "EDR server did not drain in time, aborting");
                abort.abort();
                Err(EdrError::ShutdownTimeout(timeout))
            }
        }
    }

    /// Whether the listener is currently bound and not stopped
    pub async fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst) && self.server.lock().await.is_some()
    }

    /// Address the listener is actually bound to, once started
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.server.lock().await.as_ref().map(|server| server.addr)
    }

    /// Trace a transaction through the chain, if tracing is enabled
    pub async fn trace_transaction(&self, hash: TxHash) -> Result<TraceResult, EdrError> {
        if !self.cfg.tracer_enabled {
            return Err(EdrError::TracingDisabled);
        }

        debug!(%hash, "Tracing transaction");
        self.chain.trace_transaction(hash).await.map_err(EdrError::Chain)
    }

    /// Generic debugging entry point. Always answers [`EdrError::NotImplemented`].
    pub async fn debug(&self, request: Option<DebugRequest>) -> Result<TraceResult, EdrError> {
        debug!(?request, "Debug requested");
        Err(EdrError::NotImplemented)
    }

    /// Fix the next block's timestamp, if hardhat mode is enabled
    pub async fn set_next_block_timestamp(&self, timestamp: u64) -> Result<(), EdrError> {
        if !self.cfg.hardhat_mode {
            return Err(EdrError::HardhatModeDisabled);
        }

        debug!(timestamp, "Setting next block timestamp");
        self.chain.set_next_block_timestamp(timestamp).await.map_err(EdrError::Chain)
    }

    /// Mine `blocks` blocks, if hardhat mode is enabled
    pub async fn mine(&self, blocks: u64) -> Result<(), EdrError> {
        if !self.cfg.hardhat_mode {
            return Err(EdrError::HardhatModeDisabled);
        }

        debug!(blocks, "Mining blocks");
        self.chain.mine(blocks).await.map_err(EdrError::Chain)
    }

    /// Local URL of the configured port
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.cfg.port)
    }

    /// File the logging layer writes to
    pub fn log_path(&self) -> Option<&Path> {
        self.log_file_path.as_deref()
    }

    /// Configuration held by the chain collaborator
    pub fn config(&self) -> &ChainConfig {
        self.chain.config()
    }

    /// Ethereum client held by the chain collaborator
    pub fn eth_client(&self) -> &EthClient {
        self.chain.eth_client()
    }

    pub(crate) fn settings(&self) -> &ChainConfig {
        &self.cfg
    }

    pub(crate) fn health(&self) -> &HealthService {
        &self.health
    }
}
