use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::errors::RegistryError;
use crate::instance::ServiceInstance;

/// Thin abstraction over the shared discovery registry.
///
/// The registry is external, multi-writer state with its own consistency
/// guarantees; implementations only move records in and out of it and must
/// bound every call with a request timeout.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn register(&self, instance: &ServiceInstance) -> Result<(), RegistryError>;

    /// Ids of every currently-registered instance of the logical service.
    async fn list_by_name(&self, service_name: &str) -> Result<Vec<String>, RegistryError>;

    async fn deregister(&self, instance_id: &str) -> Result<(), RegistryError>;
}

/// In-memory registry for tests and local development. Counts deregister
/// calls so idempotency properties are observable from the outside.
#[derive(Default)]
pub struct MemoryRegistry {
    instances: Mutex<HashMap<String, ServiceInstance>>,
    deregister_calls: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plants a registration as if a prior process had left it behind.
    pub fn seed(&self, instance: ServiceInstance) {
        self.instances
            .lock()
            .unwrap()
            .insert(instance.instance_id.clone(), instance);
    }

    pub fn deregister_calls(&self) -> usize {
        self.deregister_calls.load(Ordering::SeqCst)
    }

    pub fn registered(&self) -> usize {
        self.instances.lock().unwrap().len()
    }
}

#[async_trait]
impl RegistryClient for MemoryRegistry {
    async fn register(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        self.instances
            .lock()
            .unwrap()
            .insert(instance.instance_id.clone(), instance.clone());
        Ok(())
    }

    async fn list_by_name(&self, service_name: &str) -> Result<Vec<String>, RegistryError> {
        Ok(self
            .instances
            .lock()
            .unwrap()
            .values()
            .filter(|instance| instance.service_name == service_name)
            .map(|instance| instance.instance_id.clone())
            .collect())
    }

    async fn deregister(&self, instance_id: &str) -> Result<(), RegistryError> {
        self.deregister_calls.fetch_add(1, Ordering::SeqCst);
        self.instances.lock().unwrap().remove(instance_id);
        Ok(())
    }
}
