use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Authenticator that validates a shared API key.
///
/// Accepts the key either as `Authorization: Bearer <key>` or in the
/// `X-API-Key` header. The derived user id is a short digest of the key so
/// task records never contain the key itself.
pub struct ApiKeyAuthenticator {
    api_key: String,
    user_id: String,
}

impl ApiKeyAuthenticator {
    pub fn new(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let digest = Sha256::digest(api_key.as_bytes());
        let user_id = format!("key-{:x}", digest)[..16].to_string();
        Self { api_key, user_id }
    }

    fn extract_key(headers: &HashMap<String, String>) -> Option<&str> {
        if let Some(auth) = headers.get("authorization") {
            if let Some(key) = auth.strip_prefix("Bearer ") {
                return Some(key);
            }
        }
        headers.get("x-api-key").map(|s| s.as_str())
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let key = Self::extract_key(&request.headers).ok_or(AuthError::NotAuthenticated)?;

        if key != self.api_key {
            return Err(AuthError::InvalidCredentials(
                "API key does not match".to_string(),
            ));
        }

        Ok(Identity {
            user_id: self.user_id.clone(),
            method: "api_key".to_string(),
            claims: HashMap::new(),
        })
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}
