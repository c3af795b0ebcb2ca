//! `WavecastServer`: both generator families, each on its own listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};
use wavecast_core::{Ramp, Signal, Sine};

use crate::config::ServerConfig;
use crate::endpoint::SignalEndpoint;
use crate::errors::ServerError;
use crate::shutdown::ShutdownCoordinator;

/// Addresses the listeners actually bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundAddrs {
    /// Ramp listener.
    pub ramp: SocketAddr,
    /// Sine listener.
    pub sine: SocketAddr,
}

/// The wavecast server.
pub struct WavecastServer {
    config: ServerConfig,
    ramp: Arc<SignalEndpoint<Ramp>>,
    sine: Arc<SignalEndpoint<Sine>>,
    shutdown: ShutdownCoordinator,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl WavecastServer {
    /// Create a new server. Nothing runs until [`listen`](Self::listen).
    pub fn new(
        config: ServerConfig,
        ramp: Ramp,
        sine: Sine,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let shutdown = ShutdownCoordinator::new();
        let ramp = Arc::new(SignalEndpoint::new(
            ramp,
            &config.ramp,
            config.queue_capacity,
            shutdown.child_token(),
            metrics.clone(),
        ));
        let sine = Arc::new(SignalEndpoint::new(
            sine,
            &config.sine,
            config.queue_capacity,
            shutdown.child_token(),
            metrics,
        ));
        Self {
            config,
            ramp,
            sine,
            shutdown,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// The ramp and sine endpoints.
    pub fn endpoints(&self) -> (&Arc<SignalEndpoint<Ramp>>, &Arc<SignalEndpoint<Sine>>) {
        (&self.ramp, &self.sine)
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shutdown coordinator.
    pub fn shutdown_coordinator(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Bind both listeners, start serving and start both broadcast loops.
    ///
    /// A bind failure is the only fatal error; nothing is left running if
    /// the second bind fails.
    pub async fn listen(&self) -> Result<BoundAddrs, ServerError> {
        let ramp_listener = bind(&self.config.host, self.config.ramp.port).await?;
        let sine_listener = bind(&self.config.host, self.config.sine.port).await?;

        let addrs = BoundAddrs {
            ramp: ramp_listener.local_addr()?,
            sine: sine_listener.local_addr()?,
        };

        let mut tasks = self.tasks.lock();
        tasks.push(serve(&self.ramp, ramp_listener));
        tasks.push(serve(&self.sine, sine_listener));
        tasks.push(self.ramp.spawn_broadcast());
        tasks.push(self.sine.spawn_broadcast());
        drop(tasks);

        info!(ramp = %addrs.ramp, sine = %addrs.sine, "wavecast server listening");
        Ok(addrs)
    }

    /// Stop everything, bounded by the configured timeout.
    ///
    /// 1. Cancel every endpoint, so listeners stop accepting and every loop
    ///    and socket starts winding down
    /// 2. Await listeners, broadcast loops and every open socket; each
    ///    socket's close handler removes and joins its own session
    /// 3. Drain and await any session whose socket never reached its close
    ///    handler
    ///
    /// Returns `true` if every task finished before the timeout.
    pub async fn shutdown(&self) -> bool {
        self.shutdown.shutdown();
        let timeout = self.config.shutdown_timeout();
        let started = Instant::now();

        let mut handles = std::mem::take(&mut *self.tasks.lock());
        handles.push(close_sockets(&self.ramp));
        handles.push(close_sockets(&self.sine));
        let mut clean = self.shutdown.graceful_shutdown(handles, timeout).await;

        let mut leftovers = self.ramp.sessions().drain_tasks();
        leftovers.extend(self.sine.sessions().drain_tasks());
        if !leftovers.is_empty() {
            let remaining = timeout.saturating_sub(started.elapsed());
            clean &= self.shutdown.graceful_shutdown(leftovers, remaining).await;
        }

        info!(clean, "wavecast server stopped");
        clean
    }
}

fn close_sockets<S: Signal>(endpoint: &Arc<SignalEndpoint<S>>) -> JoinHandle<()> {
    let endpoint = endpoint.clone();
    tokio::spawn(async move { endpoint.close_sockets().await })
}

async fn bind(host: &str, port: u16) -> Result<TcpListener, ServerError> {
    TcpListener::bind((host, port))
        .await
        .map_err(|source| ServerError::Bind {
            addr: format!("{host}:{port}"),
            source,
        })
}

fn serve<S: Signal>(endpoint: &Arc<SignalEndpoint<S>>, listener: TcpListener) -> JoinHandle<()> {
    let router = endpoint.router();
    let cancel = endpoint.cancel_token().clone();
    let signal = endpoint.signal().name();
    tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(cancel.cancelled_owned())
            .await;
        if let Err(e) = result {
            error!(signal, error = %e, "listener failed");
        }
    })
}
