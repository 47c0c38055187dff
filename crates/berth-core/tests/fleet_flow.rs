//! End-to-end flows over the in-memory fakes: credential validation from
//! tenant registration through verdicts, and the discovery lifecycle from
//! startup sweep through shutdown deregistration.

use std::sync::Arc;

use berth_core::{
    AuthVerdict, Company, DiscoveryConfig, IdentityStore, LifecycleManager, LocalAuthority,
    MemoryIdentityStore, MemoryRegistry, RegistryClient, RequestValidator, ServiceInstance,
};

fn orders_config() -> DiscoveryConfig {
    DiscoveryConfig {
        service_name: "orders".into(),
        service_port: 8082,
        health_check_url: "http://localhost:8082/health".into(),
        tags: vec!["fleet".into()],
        registry_address: "http://localhost:8500".into(),
    }
}

#[tokio::test]
async fn credential_validation_end_to_end() {
    let store = Arc::new(MemoryIdentityStore::new());
    let mut company = Company::new("Acme Freight");
    company.api_key = "k1".into();
    company.api_secret = "s1".into();
    store.insert(&company).unwrap();

    let validator = RequestValidator::new(Arc::new(LocalAuthority::new(store)));

    assert_eq!(
        validator.validate_request("k1", "s1").await,
        AuthVerdict::Authorized { company_id: company.id }
    );
    assert_eq!(
        validator.validate_request("k1", "wrong").await,
        AuthVerdict::Unauthorized
    );
    assert_eq!(
        validator.validate_request("missing", "s1").await,
        AuthVerdict::Unauthorized
    );
}

#[tokio::test]
async fn lifecycle_from_startup_to_shutdown() {
    let registry = Arc::new(MemoryRegistry::new());
    let manager = LifecycleManager::new(orders_config(), registry.clone());

    manager.start().await.unwrap();
    assert_eq!(registry.list_by_name("orders").await.unwrap().len(), 1);

    manager.stop().await;
    assert!(registry.list_by_name("orders").await.unwrap().is_empty());
}

#[tokio::test]
async fn restart_after_crash_leaves_a_single_listing() {
    let registry = Arc::new(MemoryRegistry::new());
    registry.seed(ServiceInstance::new("orders", "crashed-1", 8082, vec![], "/health"));
    registry.seed(ServiceInstance::new("orders", "crashed-2", 8082, vec![], "/health"));

    let manager = LifecycleManager::new(orders_config(), registry.clone());
    let id = manager.start().await.unwrap();

    assert_eq!(registry.list_by_name("orders").await.unwrap(), vec![id]);
}

#[tokio::test]
async fn authenticated_tenant_cannot_touch_anothers_records() {
    let store = Arc::new(MemoryIdentityStore::new());
    let acme = Company::new("Acme");
    let globex = Company::new("Globex");
    store.insert(&acme).unwrap();
    store.insert(&globex).unwrap();

    let validator = RequestValidator::new(Arc::new(LocalAuthority::new(store)));
    let verdict = validator.validate_request(&acme.api_key, &acme.api_secret).await;

    assert!(verdict.permits(acme.id));
    assert!(!verdict.permits(globex.id));
}
