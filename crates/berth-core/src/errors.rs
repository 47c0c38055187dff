use thiserror::Error;

/// Failures talking to the discovery registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry unreachable: {0}")]
    Transport(String),

    #[error("registry rejected the request with status {0}")]
    Rejected(u16),
}

/// Fatal lifecycle failures. Cleanup and shutdown deregistration failures
/// are deliberately absent here: they are logged and absorbed, with the
/// registry's TTL eviction as the safety net.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("configuration error: {0}")]
    Configuration(&'static str),

    #[error("service registration failed")]
    Registration(#[source] RegistryError),
}

/// Failures of the identity store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("identity store failure: {0}")]
    Backend(String),

    #[error("api key already registered")]
    DuplicateKey,
}

/// The credential authority could not be consulted at all. Distinct from an
/// Unauthorized outcome, which is an ordinary result value.
#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("credential authority unreachable: {0}")]
    Unreachable(String),
}
