//! `StrifeServer` builder and server loop.
//!
//! This is the entry point for running a Strife server. It ties together
//! the layers: transport → frame decoder → dispatch table → rooms.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use strife_protocol::{MessageType, Packet};
use strife_room::RoomRegistry;
use strife_transport::{TcpTransport, Transport, DEFAULT_READ_BUFFER_SIZE};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::ServerConfig;
use crate::connection::handle_connection;
use crate::context::ServerContext;
use crate::dispatch::HandlerTable;
use crate::StrifeError;

/// Builder for configuring and starting a Strife server.
///
/// # Example
///
/// ```rust,ignore
/// use strife::prelude::*;
///
/// let server = StrifeServer::builder()
///     .config(config)
///     .rooms(rooms)
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct StrifeServerBuilder {
    config: ServerConfig,
    rooms: RoomRegistry,
    handlers: Option<HandlerTable>,
    bind_addr: Option<String>,
    read_buffer_size: usize,
}

impl StrifeServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            rooms: RoomRegistry::new(),
            handlers: None,
            bind_addr: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the rooms the server starts with.
    pub fn rooms(mut self, rooms: RoomRegistry) -> Self {
        self.rooms = rooms;
        self
    }

    /// Replaces the default dispatch table.
    pub fn handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// Overrides the listen address from the config.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = Some(addr.to_string());
        self
    }

    /// Sets the per-connection read buffer size.
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Binds the listener and builds the shared context.
    pub async fn build(self) -> Result<StrifeServer, StrifeError> {
        let addr = self
            .bind_addr
            .unwrap_or_else(|| self.config.listen_addr());
        let transport = TcpTransport::bind(&addr)
            .await?
            .read_buffer_size(self.read_buffer_size);

        let handlers = self.handlers.unwrap_or_else(HandlerTable::with_defaults);
        let context = ServerContext::new(self.config, self.rooms, handlers);

        Ok(StrifeServer { transport, context })
    }
}

impl Default for StrifeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Strife server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct StrifeServer {
    transport: TcpTransport,
    context: Arc<ServerContext>,
}

impl StrifeServer {
    /// Creates a new builder.
    pub fn builder() -> StrifeServerBuilder {
        StrifeServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The shared state handed to every connection.
    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.context)
    }

    /// Runs the server accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), StrifeError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Connection tasks already running are left to finish on their own.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), StrifeError> {
        let addr = self.local_addr()?;
        let rooms = self.context.rooms.lock().await.len();
        tracing::info!(
            name = %self.context.config().server_name,
            %addr,
            rooms,
            "strife server running"
        );

        let keep_alive = self
            .context
            .config()
            .ping_connections
            .then(|| spawn_keep_alive(Arc::clone(&self.context)));

        tokio::pin!(shutdown);
        let mut failures = 0u32;
        loop {
            let accepted = tokio::select! {
                accepted = self.transport.accept() => accepted,
                () = &mut shutdown => break,
            };
            match accepted {
                Ok(conn) => {
                    failures = 0;
                    let ctx = Arc::clone(&self.context);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, ctx).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    // Errors like EMFILE persist until a connection closes,
                    // so retrying immediately would spin.
                    failures = failures.saturating_add(1);
                    let delay = accept_backoff(failures);
                    tracing::error!(error = %e, ?delay, "accept failed");
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = &mut shutdown => break,
                    }
                }
            }
        }
        tracing::info!("shutting down");

        if let Some(task) = keep_alive {
            task.abort();
        }
        Ok(())
    }
}

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Delay before the next accept after `failures` consecutive errors.
fn accept_backoff(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_BASE
        .saturating_mul(1 << shift)
        .min(ACCEPT_BACKOFF_MAX)
}

/// Sends a ping request to every registered connection on a fixed interval.
fn spawn_keep_alive(ctx: Arc<ServerContext>) -> JoinHandle<()> {
    let period = ctx.config().ping_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nobody is connected yet.
        ticker.tick().await;

        let ping = Packet::new(MessageType::PingRequest);
        loop {
            ticker.tick().await;
            match ctx.broadcast(&ping).await {
                Ok(sent) => tracing::trace!(sent, "keep-alive ping"),
                Err(e) => tracing::warn!(error = %e, "keep-alive ping failed"),
            }
        }
    })
}
