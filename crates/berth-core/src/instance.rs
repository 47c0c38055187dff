use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registry polling cadence for the instance health check.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// How long the registry waits without a passing check before evicting the
/// instance on its own, whether or not deregistration ever ran.
pub const DEREGISTER_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// URL polled by the registry.
    pub http: String,
    pub interval: Duration,
    pub deregister_after: Duration,
}

/// One running process of a logical service, as advertised to the registry.
///
/// The id embeds a fresh random token and is regenerated on every process
/// start; an id is never reused across restarts. Many instances may share a
/// `service_name` concurrently — that is horizontal scaling, not staleness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub instance_id: String,
    pub service_name: String,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
    pub check: HealthCheck,
}

impl ServiceInstance {
    pub fn new(
        service_name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
        tags: Vec<String>,
        health_check_url: impl Into<String>,
    ) -> Self {
        let service_name = service_name.into();
        Self {
            instance_id: format!("{}-{}", service_name, Uuid::new_v4()),
            service_name,
            address: address.into(),
            port,
            tags,
            check: HealthCheck {
                http: health_check_url.into(),
                interval: CHECK_INTERVAL,
                deregister_after: DEREGISTER_AFTER,
            },
        }
    }
}
