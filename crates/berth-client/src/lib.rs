//! HTTP consumers of the fleet's two external interfaces: the discovery
//! registry's agent API and the identity service's credential validation
//! endpoint. Every request is bounded by a client-wide timeout so a slow
//! registry can never hang process startup or shutdown indefinitely.

use std::time::Duration;

pub mod authority;
pub mod registry;

pub use authority::RemoteAuthority;
pub use registry::HttpRegistryClient;

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("failed to build HTTP client")
}
