//! Harness process lifecycle: bind, restore, serve, drain.

use crate::config::SystemConfig;
use crate::dispatcher::Dispatcher;
use crate::error::HarnessError;
use crate::extension::{Extension, ExtensionContext};
use crate::lifecycle::{HarnessState, Lifecycle};
use crate::routes::create_router;
use crate::state::AppState;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use gofer_core::ids::SubscriptionKey;
use gofer_core::ports::HostApi;
use gofer_core::subscription::SubscriptionParams;
use gofer_core::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How long in-flight handlers and firings get after shutdown begins.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

enum Listener {
    Plain(TcpListener),
    Tls(SocketAddr, RustlsConfig),
}

/// Hosts one [`Extension`] behind the lifecycle API.
pub struct Harness {
    config: Arc<SystemConfig>,
    extension: Arc<dyn Extension>,
    host: Arc<dyn HostApi>,
    lifecycle: Lifecycle,
    shutdown: CancellationToken,
    abort: CancellationToken,
    drain_timeout: Duration,
    handle_signals: bool,
}

impl Harness {
    pub fn new(config: SystemConfig, extension: Arc<dyn Extension>, host: Arc<dyn HostApi>) -> Self {
        Self {
            config: Arc::new(config),
            extension,
            host,
            lifecycle: Lifecycle::new(),
            shutdown: CancellationToken::new(),
            abort: CancellationToken::new(),
            drain_timeout: DRAIN_TIMEOUT,
            handle_signals: true,
        }
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Whether SIGTERM and Ctrl-C start a graceful shutdown.
    pub fn with_signal_handlers(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.clone()
    }

    /// Cancelling this token has the same effect as `POST /shutdown`.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn context(&self) -> ExtensionContext {
        ExtensionContext {
            dispatcher: Arc::new(Dispatcher::new(self.host.clone(), self.abort.clone())),
            host: self.host.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    pub fn router(&self) -> Router {
        create_router(Arc::new(AppState::new(
            self.config.clone(),
            self.extension.clone(),
            self.context(),
            self.lifecycle.clone(),
        )))
    }

    /// Bind `bind_address` (with TLS when configured) and run until shutdown.
    pub async fn run(self) -> std::result::Result<(), HarnessError> {
        let address = self.config.bind_address;
        let listener = match (&self.config.use_tls, &self.config.tls) {
            (true, Some(material)) => {
                let server_config = material.server_config().map_err(HarnessError::Tls)?;
                Listener::Tls(address, RustlsConfig::from_config(server_config))
            }
            (true, None) => {
                return Err(HarnessError::Tls("TLS enabled without certificate material".into()));
            }
            (false, _) => {
                let listener = TcpListener::bind(address)
                    .await
                    .map_err(|source| HarnessError::Bind {
                        address: address.to_string(),
                        source,
                    })?;
                Listener::Plain(listener)
            }
        };

        self.serve_on(listener).await
    }

    /// Run on an already-bound plaintext listener.
    pub async fn serve(self, listener: TcpListener) -> std::result::Result<(), HarnessError> {
        self.serve_on(Listener::Plain(listener)).await
    }

    async fn serve_on(self, listener: Listener) -> std::result::Result<(), HarnessError> {
        if self.handle_signals {
            spawn_signal_watcher(self.shutdown.clone());
        }

        let server = self.spawn_server(listener).await?;
        let server_abort = server.abort_handle();

        self.lifecycle.advance(HarnessState::Restoring);
        match self.restore().await {
            Ok(count) => info!(count, "Restored subscriptions"),
            Err(Error::Cancelled) => {
                info!("Shutdown requested during restore");
            }
            Err(e) => {
                error!(error = %e, "Could not restore subscriptions");
                self.shutdown.cancel();
                self.abort.cancel();
                server_abort.abort();
                self.lifecycle.advance(HarnessState::Exited);
                return Err(HarnessError::Restore(e));
            }
        }

        let source = if self.shutdown.is_cancelled() {
            None
        } else {
            self.lifecycle.advance(HarnessState::Serving);
            let extension = self.extension.clone();
            let ctx = self.context();
            Some(tokio::spawn(async move { extension.run(ctx).await }))
        };

        self.drain(server, source).await
    }

    async fn spawn_server(
        &self,
        listener: Listener,
    ) -> std::result::Result<JoinHandle<std::io::Result<()>>, HarnessError> {
        let router = self.router();
        let shutdown = self.shutdown.clone();

        match listener {
            Listener::Plain(listener) => {
                let address = listener.local_addr()?;
                info!(%address, tls = false, "Extension listening");
                let server = axum::serve(listener, router)
                    .with_graceful_shutdown(shutdown.cancelled_owned());
                Ok(tokio::spawn(async move { server.await }))
            }
            Listener::Tls(address, tls) => {
                let handle = axum_server::Handle::new();
                let server = tokio::spawn(
                    axum_server::bind_rustls(address, tls)
                        .handle(handle.clone())
                        .serve(router.into_make_service()),
                );

                let drain_timeout = self.drain_timeout;
                let watcher = handle.clone();
                tokio::spawn(async move {
                    shutdown.cancelled().await;
                    watcher.graceful_shutdown(Some(drain_timeout));
                });

                match handle.listening().await {
                    Some(address) => {
                        info!(%address, tls = true, "Extension listening");
                        Ok(server)
                    }
                    None => match server.await {
                        Ok(Err(source)) => Err(HarnessError::Bind {
                            address: address.to_string(),
                            source,
                        }),
                        _ => Err(HarnessError::Bind {
                            address: address.to_string(),
                            source: std::io::Error::other("listener closed before binding"),
                        }),
                    },
                }
            }
        }
    }

    /// Replay the host's subscription set through the normal subscribe path.
    async fn restore(&self) -> Result<usize> {
        let records = tokio::select! {
            _ = self.shutdown.cancelled() => return Err(Error::Cancelled),
            records = self.host.list_subscriptions(&self.config.extension_id) => records?,
        };

        for record in &records {
            let key = SubscriptionKey::parse(
                &record.namespace_id,
                &record.pipeline_id,
                &record.subscription_id,
            )?;
            let params = SubscriptionParams::new(record.settings.clone());

            match self.extension.subscribe(key.clone(), params).await {
                Ok(()) | Err(Error::SubscriptionExists(_)) => {
                    info!(
                        namespace_id = %key.namespace_id,
                        pipeline_id = %key.pipeline_id,
                        subscription_id = %key.subscription_id,
                        "Restored subscription"
                    );
                }
                Err(e) => {
                    error!(
                        namespace_id = %key.namespace_id,
                        pipeline_id = %key.pipeline_id,
                        subscription_id = %key.subscription_id,
                        error = %e,
                        "Could not restore subscription"
                    );
                    return Err(e);
                }
            }
        }

        Ok(records.len())
    }

    /// Wait for shutdown (or a source failure), then drain within the deadline.
    async fn drain(
        &self,
        server: JoinHandle<std::io::Result<()>>,
        source: Option<JoinHandle<Result<()>>>,
    ) -> std::result::Result<(), HarnessError> {
        let server_abort = server.abort_handle();
        let source_abort = source.as_ref().map(JoinHandle::abort_handle);

        let mut source = source;
        let mut early = None;
        match source.as_mut() {
            Some(handle) => {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {}
                    joined = handle => early = Some(flatten(joined)),
                }
            }
            None => self.shutdown.cancelled().await,
        }
        let source = if early.is_some() { None } else { source };

        if let Some(Err(e)) = &early {
            error!(error = %e, "Event source stopped unexpectedly");
        }

        self.lifecycle.advance(HarnessState::Draining);
        self.shutdown.cancel();

        let drained = tokio::time::timeout(self.drain_timeout, async move {
            let source_result = match source {
                Some(handle) => flatten(handle.await),
                None => early.unwrap_or(Ok(())),
            };
            let server_result = match server.await {
                Ok(result) => result,
                Err(e) => Err(std::io::Error::other(e.to_string())),
            };
            (source_result, server_result)
        })
        .await;

        self.abort.cancel();
        self.lifecycle.advance(HarnessState::Exited);

        match drained {
            Ok((source_result, server_result)) => {
                source_result.map_err(HarnessError::Source)?;
                server_result?;
                info!("Extension stopped");
                Ok(())
            }
            Err(_) => {
                warn!(
                    drain_secs = self.drain_timeout.as_secs(),
                    "Drain deadline passed, abandoning in-flight work"
                );
                server_abort.abort();
                if let Some(handle) = source_abort {
                    handle.abort();
                }
                Ok(())
            }
        }
    }
}

fn flatten(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    joined.map_err(|e| Error::Internal(format!("event source task failed: {}", e)))?
}

fn spawn_signal_watcher(shutdown: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal() => {
                info!("Shutdown signal received");
                shutdown.cancel();
            }
            _ = shutdown.cancelled() => {}
        }
    });
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Could not install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Could not install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
