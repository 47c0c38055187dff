use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use berth_core::instance::HealthCheck;
use berth_core::{RegistryClient, RegistryError, ServiceInstance};

/// Registry client speaking the agent API of a Consul-style discovery
/// registry.
pub struct HttpRegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: crate::http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
struct RegisterServicePayload<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Address")]
    address: &'a str,
    #[serde(rename = "Port")]
    port: u16,
    #[serde(rename = "Tags")]
    tags: &'a [String],
    #[serde(rename = "Check")]
    check: CheckPayload,
}

#[derive(Serialize)]
struct CheckPayload {
    #[serde(rename = "HTTP")]
    http: String,
    #[serde(rename = "Interval")]
    interval: String,
    #[serde(rename = "DeregisterCriticalServiceAfter")]
    deregister_critical_service_after: String,
}

impl CheckPayload {
    fn from_check(check: &HealthCheck) -> Self {
        Self {
            http: check.http.clone(),
            interval: format!("{}s", check.interval.as_secs()),
            deregister_critical_service_after: format!("{}s", check.deregister_after.as_secs()),
        }
    }
}

/// One entry of the agent's service map; only the fields the sweep needs.
#[derive(Deserialize)]
struct AgentService {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Service")]
    service: String,
}

fn transport(err: reqwest::Error) -> RegistryError {
    RegistryError::Transport(err.to_string())
}

fn check_status(response: &reqwest::Response) -> Result<(), RegistryError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(RegistryError::Rejected(response.status().as_u16()))
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn register(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        let payload = RegisterServicePayload {
            id: &instance.instance_id,
            name: &instance.service_name,
            address: &instance.address,
            port: instance.port,
            tags: &instance.tags,
            check: CheckPayload::from_check(&instance.check),
        };
        let url = format!("{}/v1/agent/service/register", self.base_url);
        let response = self
            .client
            .put(&url)
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;
        check_status(&response)
    }

    async fn list_by_name(&self, service_name: &str) -> Result<Vec<String>, RegistryError> {
        let url = format!("{}/v1/agent/services", self.base_url);
        let response = self.client.get(&url).send().await.map_err(transport)?;
        check_status(&response)?;

        // The agent returns every service it knows; filtering by logical
        // name happens client-side.
        let services: HashMap<String, AgentService> =
            response.json().await.map_err(transport)?;
        Ok(services
            .into_values()
            .filter(|descriptor| descriptor.service == service_name)
            .map(|descriptor| descriptor.id)
            .collect())
    }

    async fn deregister(&self, instance_id: &str) -> Result<(), RegistryError> {
        let url = format!(
            "{}/v1/agent/service/deregister/{}",
            self.base_url, instance_id
        );
        let response = self.client.put(&url).send().await.map_err(transport)?;
        check_status(&response)
    }
}
