// Caller identity.
//
// Authentication is delegated to an external identity provider; this module
// resolves bearer tokens to identities and mirrors them into the users table.
// Token issuance, refresh, and revocation all belong to the provider.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use snipstash_core::db::models::UserRecord;

use crate::store::{Store, StoreError};

/// The authenticated caller, as asserted by the external identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-issued user id.
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Resolves a bearer token to a caller identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token. Returns `None` for invalid or unknown tokens.
    async fn resolve(&self, token: &str) -> Option<Identity>;
}

/// Fixed token table, for tests and local development.
#[derive(Debug, Default)]
pub struct StaticTokens {
    tokens: HashMap<String, Identity>,
}

impl StaticTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for an identity.
    pub fn token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticTokens {
    async fn resolve(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).cloned()
    }
}

/// Verifies signed identity tokens of the form `payload.signature`: base64url
/// JSON signed with HMAC-SHA256 under a secret shared with the provider.
pub struct SignedTokenProvider {
    secret: String,
}

impl SignedTokenProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Sign an identity into a token. The inverse of `resolve`, used by tests
    /// and provisioning tools.
    pub fn mint(&self, identity: &Identity) -> String {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let payload_b64 =
            URL_SAFE_NO_PAD.encode(serde_json::to_string(identity).unwrap().as_bytes());

        type HmacSha256 = Hmac<Sha256>;
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC key can be any length");
        mac.update(payload_b64.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", payload_b64, signature)
    }
}

// Manual Debug: never print the secret
impl std::fmt::Debug for SignedTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedTokenProvider")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl IdentityProvider for SignedTokenProvider {
    async fn resolve(&self, token: &str) -> Option<Identity> {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let (payload_b64, signature_b64) = token.split_once('.')?;

        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(payload_b64.as_bytes());
        let signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;
        mac.verify_slice(&signature).ok()?;

        let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        serde_json::from_slice(&payload).ok()
    }
}

/// Mirror an authenticated identity into the users table.
///
/// Creates the row on first sight; refreshes email and name when the provider
/// reports new values. The provider's id is the row id.
pub async fn ensure_user(store: &dyn Store, identity: &Identity) -> Result<UserRecord, StoreError> {
    match store.find_user(&identity.id).await? {
        Some(user) => {
            let email = identity.email.to_lowercase();
            if user.email == email && user.name == identity.name {
                return Ok(user);
            }
            store
                .update_user(
                    &identity.id,
                    json!({
                        "email": email,
                        "name": identity.name,
                        "updatedAt": chrono::Utc::now().to_rfc3339(),
                    }),
                )
                .await
        }
        None => {
            let user = UserRecord::new(
                identity.id.clone(),
                identity.email.clone(),
                identity.name.clone(),
            );
            store.create_user(&user).await
        }
    }
}
