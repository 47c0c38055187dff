use crate::errors::LifecycleError;

/// Discovery settings consumed at process start.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Logical identity shared by every instance of this service.
    pub service_name: String,
    pub service_port: u16,
    /// URL the registry polls to decide instance health.
    pub health_check_url: String,
    pub tags: Vec<String>,
    pub registry_address: String,
}

impl DiscoveryConfig {
    /// Reads the discovery surface from the environment. Missing required
    /// fields are left blank so `validate` can reject them before any
    /// registry call is attempted.
    pub fn from_env() -> Self {
        Self {
            service_name: std::env::var("SERVICE_NAME").unwrap_or_default(),
            service_port: std::env::var("SERVICE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            health_check_url: std::env::var("HEALTH_CHECK_URL").unwrap_or_default(),
            tags: std::env::var("SERVICE_TAGS")
                .map(|raw| parse_tags(&raw))
                .unwrap_or_default(),
            registry_address: std::env::var("REGISTRY_ADDR")
                .unwrap_or_else(|_| "http://localhost:8500".to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), LifecycleError> {
        if self.service_name.trim().is_empty() {
            return Err(LifecycleError::Configuration("service name must be configured"));
        }
        if self.health_check_url.trim().is_empty() {
            return Err(LifecycleError::Configuration("health check URL must be configured"));
        }
        Ok(())
    }
}

fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}
