use async_trait::async_trait;
use serde::Serialize;
use sha2::{ Digest, Sha256 };
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Authenticated-user handle as exposed by the identity boundary.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub email_verified: bool,
}

/// Boundary to the identity/session service. Only the operations the
/// application consumes; the real provider lives outside this codebase.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str
    ) -> Result<AuthUser, Box<dyn Error + Send + Sync>>;

    /// Returns the user and a fresh session token.
    async fn sign_in(
        &self,
        email: &str,
        password: &str
    ) -> Result<(AuthUser, String), Box<dyn Error + Send + Sync>>;

    async fn sign_out(&self, token: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn resolve(&self, token: &str) -> Option<AuthUser>;
}

/// Session-context object built once at startup and handed to the
/// server state, instead of a module-level singleton.
#[derive(Clone)]
pub struct SessionContext {
    provider: Arc<dyn IdentityProvider>,
}

impl SessionContext {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    pub async fn resolve(&self, token: &str) -> Option<AuthUser> {
        self.provider.resolve(token).await
    }
}

struct StoredUser {
    user: AuthUser,
    password_digest: String,
}

/// In-process identity provider: SHA-256 password digests, uuid session
/// tokens. Stands in for the managed identity service in development
/// and tests.
pub struct MemoryIdentityProvider {
    users: RwLock<HashMap<String, StoredUser>>,
    sessions: RwLock<HashMap<String, String>>,
}

fn digest_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str
    ) -> Result<AuthUser, Box<dyn Error + Send + Sync>> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err("El email no es válido".into());
        }
        if password.trim().is_empty() {
            return Err("La contraseña es requerida".into());
        }

        let mut users = self.users.write().await;
        if users.contains_key(&email) {
            return Err("El email ya está registrado".into());
        }

        let user = AuthUser {
            uid: Uuid::new_v4().to_string(),
            email: email.clone(),
            display_name: display_name.to_string(),
            email_verified: false,
        };
        users.insert(email, StoredUser {
            user: user.clone(),
            password_digest: digest_password(password),
        });
        Ok(user)
    }

    async fn sign_in(
        &self,
        email: &str,
        password: &str
    ) -> Result<(AuthUser, String), Box<dyn Error + Send + Sync>> {
        let email = email.trim().to_lowercase();
        let users = self.users.read().await;
        let stored = users.get(&email).ok_or("Credenciales inválidas")?;
        if stored.password_digest != digest_password(password) {
            return Err("Credenciales inválidas".into());
        }

        let token = Uuid::new_v4().to_string();
        let user = stored.user.clone();
        drop(users);

        self.sessions.write().await.insert(token.clone(), user.uid.clone());
        Ok((user, token))
    }

    async fn sign_out(&self, token: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.sessions.write().await.remove(token);
        Ok(())
    }

    async fn resolve(&self, token: &str) -> Option<AuthUser> {
        let uid = self.sessions.read().await.get(token).cloned()?;
        let users = self.users.read().await;
        users.values().find(|stored| stored.user.uid == uid).map(|stored| stored.user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_up_then_sign_in_round_trips() {
        let provider = MemoryIdentityProvider::new();
        let user = provider.sign_up("Ana@Example.com", "secreta", "Ana").await.unwrap();
        assert_eq!(user.email, "ana@example.com");

        let (signed_in, token) = provider.sign_in("ana@example.com", "secreta").await.unwrap();
        assert_eq!(signed_in.uid, user.uid);
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let provider = MemoryIdentityProvider::new();
        provider.sign_up("ana@example.com", "secreta", "Ana").await.unwrap();
        assert!(provider.sign_in("ana@example.com", "otra").await.is_err());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let provider = MemoryIdentityProvider::new();
        provider.sign_up("ana@example.com", "secreta", "Ana").await.unwrap();
        assert!(provider.sign_up("ana@example.com", "otra", "Ana 2").await.is_err());
    }

    #[tokio::test]
    async fn sign_out_invalidates_session() {
        let provider = MemoryIdentityProvider::new();
        provider.sign_up("ana@example.com", "secreta", "Ana").await.unwrap();
        let (_, token) = provider.sign_in("ana@example.com", "secreta").await.unwrap();

        assert!(provider.resolve(&token).await.is_some());
        provider.sign_out(&token).await.unwrap();
        assert!(provider.resolve(&token).await.is_none());
    }

    #[tokio::test]
    async fn session_context_delegates_to_provider() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        provider.sign_up("ana@example.com", "secreta", "Ana").await.unwrap();
        let (_, token) = provider.sign_in("ana@example.com", "secreta").await.unwrap();

        let ctx = SessionContext::new(provider);
        assert_eq!(ctx.resolve(&token).await.unwrap().email, "ana@example.com");
        assert!(ctx.resolve("bogus").await.is_none());
    }
}
