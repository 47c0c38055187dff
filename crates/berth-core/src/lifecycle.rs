use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::DiscoveryConfig;
use crate::errors::LifecycleError;
use crate::instance::ServiceInstance;
use crate::registry::RegistryClient;

/// Bound on the shutdown-path deregistration attempt; past this the process
/// exits and registry TTL eviction reclaims the entry.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unregistered,
    CleaningStale,
    Registering,
    Registered,
    Deregistering,
    Deregistered,
}

/// Drives one process's registration with the discovery registry: sweep
/// registrations left behind by crashed predecessors, register a fresh
/// instance, deregister on shutdown.
///
/// Cloning hands out another handle onto the same lifecycle; the shutdown
/// hook and an explicit `stop` call share one idempotency guard.
#[derive(Clone)]
pub struct LifecycleManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: DiscoveryConfig,
    registry: Arc<dyn RegistryClient>,
    /// Assigned exactly once by `start`; `stop` takes it, which is the whole
    /// idempotency guard — a second stop finds nothing to deregister.
    instance_id: Mutex<Option<String>>,
    state: Mutex<LifecycleState>,
}

impl LifecycleManager {
    pub fn new(config: DiscoveryConfig, registry: Arc<dyn RegistryClient>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                registry,
                instance_id: Mutex::new(None),
                state: Mutex::new(LifecycleState::Unregistered),
            }),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.lock().unwrap()
    }

    /// Runs once, before the process starts serving traffic.
    ///
    /// Stale-sweep failures are absorbed; a registration failure is fatal —
    /// a service must never keep running believing itself discoverable when
    /// it is not. On success a one-shot hook is installed that deregisters
    /// when the process receives a shutdown signal.
    pub async fn start(&self) -> Result<String, LifecycleError> {
        self.inner.config.validate()?;

        self.inner.set_state(LifecycleState::CleaningStale);
        self.inner.sweep_stale().await;

        self.inner.set_state(LifecycleState::Registering);
        let instance = ServiceInstance::new(
            &self.inner.config.service_name,
            advertised_address(),
            self.inner.config.service_port,
            self.inner.config.tags.clone(),
            &self.inner.config.health_check_url,
        );
        self.inner
            .registry
            .register(&instance)
            .await
            .map_err(LifecycleError::Registration)?;

        *self.inner.instance_id.lock().unwrap() = Some(instance.instance_id.clone());
        self.inner.set_state(LifecycleState::Registered);
        tracing::info!(
            service = %self.inner.config.service_name,
            instance = %instance.instance_id,
            "registered with service registry"
        );

        self.spawn_shutdown_hook();
        Ok(instance.instance_id)
    }

    /// Deregisters this instance's own id. Idempotent: invoking it again, or
    /// without a prior successful `start`, is a no-op. A failed
    /// deregistration is logged but never raised — the process is already
    /// exiting and TTL eviction covers the leftover entry.
    pub async fn stop(&self) {
        self.inner.stop().await;
    }

    fn spawn_shutdown_hook(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            shutdown_signal().await;
            if tokio::time::timeout(SHUTDOWN_GRACE, inner.stop())
                .await
                .is_err()
            {
                tracing::warn!("deregistration did not finish within the shutdown grace period");
            }
        });
    }
}

impl Inner {
    fn set_state(&self, state: LifecycleState) {
        *self.state.lock().unwrap() = state;
    }

    /// Best-effort removal of registrations left by crashed prior instances
    /// of this logical service. Runs to completion before registration so a
    /// fresh entry is never swept by its own startup. Failures are logged
    /// and counted, never raised: stale entries also self-heal through
    /// registry TTL eviction.
    async fn sweep_stale(&self) {
        let stale = match self.registry.list_by_name(&self.config.service_name).await {
            Ok(ids) => ids,
            Err(err) => {
                metrics::counter!("berth_cleanup_failures_total").increment(1);
                tracing::warn!(
                    service = %self.config.service_name,
                    error = %err,
                    "stale registration sweep failed"
                );
                return;
            }
        };

        for id in stale {
            match self.registry.deregister(&id).await {
                Ok(()) => tracing::info!(instance = %id, "deregistered stale instance"),
                Err(err) => {
                    metrics::counter!("berth_cleanup_failures_total").increment(1);
                    tracing::warn!(
                        instance = %id,
                        error = %err,
                        "failed to deregister stale instance"
                    );
                }
            }
        }
    }

    async fn stop(&self) {
        let Some(id) = self.instance_id.lock().unwrap().take() else {
            return;
        };

        self.set_state(LifecycleState::Deregistering);
        match self.registry.deregister(&id).await {
            Ok(()) => tracing::info!(instance = %id, "deregistered from service registry"),
            Err(err) => {
                metrics::counter!("berth_deregister_failures_total").increment(1);
                tracing::warn!(
                    instance = %id,
                    error = %err,
                    "failed to deregister; registry TTL eviction will reclaim the entry"
                );
            }
        }
        self.set_state(LifecycleState::Deregistered);
    }
}

/// The address other services reach this instance at.
fn advertised_address() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Resolves when the process receives ctrl-c or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
}
