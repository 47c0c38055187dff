use std::sync::Arc;

use uuid::Uuid;

use crate::authority::{CredentialAuthority, CredentialOutcome};

/// Authentication verdict handed to the business operation guarding a
/// request. Bad credentials and missing credentials share one shape;
/// an unreachable authority is reported distinctly so the caller can retry
/// or degrade instead of blaming the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthVerdict {
    Authorized { company_id: Uuid },
    Unauthorized,
    AuthorityUnavailable,
}

impl AuthVerdict {
    pub fn company_id(&self) -> Option<Uuid> {
        match self {
            AuthVerdict::Authorized { company_id } => Some(*company_id),
            _ => None,
        }
    }

    /// Tenant-context guard: valid credentials still do not permit acting on
    /// another tenant's records.
    pub fn permits(&self, owner: Uuid) -> bool {
        matches!(self, AuthVerdict::Authorized { company_id } if *company_id == owner)
    }
}

/// Runs inside every dependent service; turns inbound credentials into an
/// `AuthVerdict` by consulting the credential authority.
pub struct RequestValidator {
    authority: Arc<dyn CredentialAuthority>,
}

impl RequestValidator {
    pub fn new(authority: Arc<dyn CredentialAuthority>) -> Self {
        Self { authority }
    }

    pub async fn validate_request(&self, api_key: &str, api_secret: &str) -> AuthVerdict {
        // Blank credentials never reach the authority and share the verdict
        // shape of a failed validation.
        if api_key.trim().is_empty() || api_secret.trim().is_empty() {
            return AuthVerdict::Unauthorized;
        }

        match self.authority.validate(api_key, api_secret).await {
            Ok(CredentialOutcome::Authorized { company_id }) => {
                AuthVerdict::Authorized { company_id }
            }
            Ok(CredentialOutcome::Unauthorized) => AuthVerdict::Unauthorized,
            Err(err) => {
                tracing::warn!(error = %err, "credential authority unreachable");
                AuthVerdict::AuthorityUnavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::errors::AuthorityError;

    /// Authority double returning a fixed response.
    struct ScriptedAuthority {
        response: Result<CredentialOutcome, ()>,
    }

    #[async_trait]
    impl CredentialAuthority for ScriptedAuthority {
        async fn validate(
            &self,
            _api_key: &str,
            _api_secret: &str,
        ) -> Result<CredentialOutcome, AuthorityError> {
            self.response
                .map_err(|_| AuthorityError::Unreachable("connection refused".into()))
        }
    }

    fn validator(response: Result<CredentialOutcome, ()>) -> RequestValidator {
        RequestValidator::new(Arc::new(ScriptedAuthority { response }))
    }

    #[tokio::test]
    async fn blank_credentials_short_circuit_to_unauthorized() {
        let id = Uuid::new_v4();
        let validator = validator(Ok(CredentialOutcome::Authorized { company_id: id }));

        assert_eq!(validator.validate_request("", "secret").await, AuthVerdict::Unauthorized);
        assert_eq!(validator.validate_request("key", "  ").await, AuthVerdict::Unauthorized);
    }

    #[tokio::test]
    async fn authority_outcomes_map_onto_verdicts() {
        let id = Uuid::new_v4();

        let ok = validator(Ok(CredentialOutcome::Authorized { company_id: id }));
        assert_eq!(
            ok.validate_request("key", "secret").await,
            AuthVerdict::Authorized { company_id: id }
        );

        let denied = validator(Ok(CredentialOutcome::Unauthorized));
        assert_eq!(
            denied.validate_request("key", "secret").await,
            AuthVerdict::Unauthorized
        );

        let down = validator(Err(()));
        assert_eq!(
            down.validate_request("key", "secret").await,
            AuthVerdict::AuthorityUnavailable
        );
    }

    #[tokio::test]
    async fn permits_only_the_authenticated_tenant() {
        let owner = Uuid::new_v4();
        let verdict = AuthVerdict::Authorized { company_id: owner };

        assert!(verdict.permits(owner));
        assert!(!verdict.permits(Uuid::new_v4()));
        assert!(!AuthVerdict::Unauthorized.permits(owner));
        assert!(!AuthVerdict::AuthorityUnavailable.permits(owner));
    }
}
