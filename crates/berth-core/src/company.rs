use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A tenant of the platform, authenticated by an opaque API key/secret pair.
///
/// Credentials are generated once at registration and are immutable
/// afterwards; there is no rotation or revocation flow.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    /// Public lookup key, unique across all tenants.
    pub api_key: String,
    /// Private value, only ever read by the validation path.
    pub api_secret: String,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            api_key: Uuid::new_v4().simple().to_string(),
            api_secret: format!(
                "{}{}",
                Uuid::new_v4().simple(),
                Uuid::new_v4().simple()
            ),
        }
    }
}

// The secret must never reach logs through a derived Debug.
impl std::fmt::Debug for Company {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Company")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_distinct_credentials() {
        let a = Company::new("Acme");
        let b = Company::new("Acme");
        assert_ne!(a.api_key, b.api_key);
        assert_ne!(a.api_secret, b.api_secret);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn debug_redacts_the_secret() {
        let company = Company::new("Acme");
        let rendered = format!("{:?}", company);
        assert!(rendered.contains(&company.api_key));
        assert!(!rendered.contains(&company.api_secret));
    }
}
