use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use berth_core::{AuthorityError, CredentialAuthority, CredentialOutcome};

/// Credential authority reached over HTTP — the path dependent services use
/// when the identity store lives in another process.
pub struct RemoteAuthority {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteAuthority {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: crate::http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateCredentialsPayload<'a> {
    api_key: &'a str,
    api_secret: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateCredentialsReply {
    company_id: Uuid,
}

#[async_trait]
impl CredentialAuthority for RemoteAuthority {
    async fn validate(
        &self,
        api_key: &str,
        api_secret: &str,
    ) -> Result<CredentialOutcome, AuthorityError> {
        let url = format!("{}/api/companies/validate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ValidateCredentialsPayload { api_key, api_secret })
            .send()
            .await
            .map_err(|err| AuthorityError::Unreachable(err.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(CredentialOutcome::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(AuthorityError::Unreachable(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let reply: ValidateCredentialsReply = response
            .json()
            .await
            .map_err(|err| AuthorityError::Unreachable(err.to_string()))?;
        Ok(CredentialOutcome::Authorized { company_id: reply.company_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_and_reply_use_the_camel_case_wire_names() {
        let payload = ValidateCredentialsPayload {
            api_key: "k1",
            api_secret: "s1",
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["apiKey"], "k1");
        assert_eq!(value["apiSecret"], "s1");

        let id = Uuid::new_v4();
        let reply: ValidateCredentialsReply =
            serde_json::from_value(serde_json::json!({ "companyId": id })).unwrap();
        assert_eq!(reply.company_id, id);
    }
}
