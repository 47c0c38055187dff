use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::company::Company;
use crate::errors::{AuthorityError, StoreError};

/// Holds tenant identity records keyed by API key. Read-mostly; records are
/// immutable once written.
pub trait IdentityStore: Send + Sync {
    fn insert(&self, company: &Company) -> Result<(), StoreError>;
    fn find_by_api_key(&self, api_key: &str) -> Result<Option<Company>, StoreError>;
    fn find_by_id(&self, id: &Uuid) -> Result<Option<Company>, StoreError>;
    fn list(&self) -> Result<Vec<Company>, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialOutcome {
    Authorized { company_id: Uuid },
    Unauthorized,
}

/// Validates an API key/secret pair against the identity records, either
/// in-process or across the wire.
#[async_trait]
pub trait CredentialAuthority: Send + Sync {
    async fn validate(
        &self,
        api_key: &str,
        api_secret: &str,
    ) -> Result<CredentialOutcome, AuthorityError>;
}

/// In-process authority over an injected identity store.
pub struct LocalAuthority {
    store: Arc<dyn IdentityStore>,
}

impl LocalAuthority {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Pure read, no secret comparison.
    pub fn lookup(&self, api_key: &str) -> Result<Option<Company>, StoreError> {
        self.store.find_by_api_key(api_key)
    }
}

#[async_trait]
impl CredentialAuthority for LocalAuthority {
    async fn validate(
        &self,
        api_key: &str,
        api_secret: &str,
    ) -> Result<CredentialOutcome, AuthorityError> {
        let company = self
            .store
            .find_by_api_key(api_key)
            .map_err(|err| AuthorityError::Unreachable(err.to_string()))?;

        // An unknown key and a wrong secret collapse into the same outcome;
        // callers must not be able to probe which keys exist.
        match company {
            Some(company) if secure_eq(&company.api_secret, api_secret) => {
                Ok(CredentialOutcome::Authorized { company_id: company.id })
            }
            _ => Ok(CredentialOutcome::Unauthorized),
        }
    }
}

/// Constant-time string equality.
///
/// Both operands are digested first, so the comparison always runs over the
/// same fixed width: its cost does not depend on where the inputs first
/// differ, nor on whether their lengths match.
pub fn secure_eq(left: &str, right: &str) -> bool {
    let left = Sha256::digest(left.as_bytes());
    let right = Sha256::digest(right.as_bytes());
    left.as_slice().ct_eq(right.as_slice()).into()
}

/// In-memory identity store for tests and the local development loop.
#[derive(Default)]
pub struct MemoryIdentityStore {
    companies: Mutex<Vec<Company>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn insert(&self, company: &Company) -> Result<(), StoreError> {
        let mut companies = self.companies.lock().unwrap();
        if companies.iter().any(|c| c.api_key == company.api_key) {
            return Err(StoreError::DuplicateKey);
        }
        companies.push(company.clone());
        Ok(())
    }

    fn find_by_api_key(&self, api_key: &str) -> Result<Option<Company>, StoreError> {
        Ok(self
            .companies
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.api_key == api_key)
            .cloned())
    }

    fn find_by_id(&self, id: &Uuid) -> Result<Option<Company>, StoreError> {
        Ok(self
            .companies
            .lock()
            .unwrap()
            .iter()
            .find(|c| &c.id == id)
            .cloned())
    }

    fn list(&self) -> Result<Vec<Company>, StoreError> {
        Ok(self.companies.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_eq_matches_only_identical_strings() {
        assert!(secure_eq("s3cret", "s3cret"));
        // First-byte and last-byte mismatches take the same fixed-width path.
        assert!(!secure_eq("s3cret", "t3cret"));
        assert!(!secure_eq("s3cret", "s3creu"));
        assert!(!secure_eq("s3cret", "s3cret-longer"));
        assert!(!secure_eq("s3cret", ""));
    }

    fn store_with(company: &Company) -> Arc<MemoryIdentityStore> {
        let store = Arc::new(MemoryIdentityStore::new());
        store.insert(company).unwrap();
        store
    }

    #[tokio::test]
    async fn valid_credentials_yield_the_company_id() {
        let company = Company::new("Acme");
        let authority = LocalAuthority::new(store_with(&company));

        let outcome = authority
            .validate(&company.api_key, &company.api_secret)
            .await
            .unwrap();
        assert_eq!(outcome, CredentialOutcome::Authorized { company_id: company.id });
    }

    #[tokio::test]
    async fn unknown_key_and_wrong_secret_are_indistinguishable() {
        let company = Company::new("Acme");
        let authority = LocalAuthority::new(store_with(&company));

        let wrong_secret = authority
            .validate(&company.api_key, "not-the-secret")
            .await
            .unwrap();
        let unknown_key = authority
            .validate("no-such-key", &company.api_secret)
            .await
            .unwrap();

        assert_eq!(wrong_secret, CredentialOutcome::Unauthorized);
        assert_eq!(unknown_key, CredentialOutcome::Unauthorized);
    }

    #[test]
    fn lookup_is_a_pure_read() {
        let company = Company::new("Acme");
        let authority = LocalAuthority::new(store_with(&company));

        let found = authority.lookup(&company.api_key).unwrap().unwrap();
        assert_eq!(found.id, company.id);
        assert!(authority.lookup("missing").unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_api_key_is_rejected_by_the_store() {
        let company = Company::new("Acme");
        let store = store_with(&company);
        assert!(matches!(store.insert(&company), Err(StoreError::DuplicateKey)));
    }
}
