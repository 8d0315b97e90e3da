// Auth engine - accounts, credential checks and bearer tokens.
//
// The gate itself is stateless: a bearer token resolves to a user id by
// signature alone, no storage round-trip. Registration and login are the
// only operations that touch the user table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{FieldError, GameError};

// ============================================================================
// DOMAIN MODELS
// ============================================================================

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Token payload. `sub` is the user id, `exp` a unix timestamp.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

/// What register and login hand back to the boundary.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub token: String,
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account; `Conflict` when the username or email is taken.
    async fn insert(&self, user: User) -> Result<User, GameError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, GameError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct AuthService<S: UserStore> {
    store: S,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_secs: i64,
}

impl<S: UserStore> AuthService<S> {
    pub fn new(store: S, jwt_secret: &str, token_ttl_secs: i64) -> Self {
        Self {
            store,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_ttl_secs,
        }
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, GameError> {
        let username = username.trim();
        let email = email.trim();
        validate_credentials(username, email, password)?;

        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(GameError::internal)?;
        let now = Utc::now();
        let user = self
            .store
            .insert(User {
                id: Uuid::new_v4(),
                username: username.to_string(),
                email: email.to_lowercase(),
                password_hash,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(user_id = %user.id, "account registered");
        self.issue(user.id)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthSession, GameError> {
        let Some(user) = self.store.find_by_username(username.trim()).await? else {
            return Err(GameError::Unauthorized);
        };
        let matches =
            bcrypt::verify(password, &user.password_hash).map_err(GameError::internal)?;
        if !matches {
            return Err(GameError::Unauthorized);
        }
        self.issue(user.id)
    }

    /// The auth-gate capability: bearer credential in, user id out.
    pub fn resolve_principal(&self, token: &str) -> Result<Uuid, GameError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims.sub)
            .map_err(|_| GameError::Unauthorized)
    }

    fn issue(&self, user_id: Uuid) -> Result<AuthSession, GameError> {
        let claims = Claims {
            sub: user_id,
            exp: (Utc::now().timestamp() + self.token_ttl_secs) as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(GameError::internal)?;
        Ok(AuthSession { user_id, token })
    }
}

fn validate_credentials(username: &str, email: &str, password: &str) -> Result<(), GameError> {
    let mut errors = Vec::new();
    let name_len = username.chars().count();
    if !(3..=50).contains(&name_len) {
        errors.push(FieldError::new(
            "username",
            "username must be 3-50 characters",
        ));
    }
    if !looks_like_email(email) {
        errors.push(FieldError::new("email", "email address is not valid"));
    }
    if password.chars().count() < 8 {
        errors.push(FieldError::new(
            "password",
            "password must be at least 8 characters",
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(GameError::ValidationFailed(errors))
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    pub(crate) struct InMemoryUserStore {
        pub users: Arc<Mutex<Vec<User>>>,
    }

    impl InMemoryUserStore {
        pub fn new() -> Self {
            Self {
                users: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl UserStore for InMemoryUserStore {
        async fn insert(&self, user: User) -> Result<User, GameError> {
            let mut users = self.users.lock().unwrap();
            if users
                .iter()
                .any(|u| u.username == user.username || u.email == user.email)
            {
                return Err(GameError::Conflict(
                    "username or email already taken".to_string(),
                ));
            }
            users.push(user.clone());
            Ok(user)
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<User>, GameError> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.username == username).cloned())
        }
    }

    fn service() -> AuthService<InMemoryUserStore> {
        AuthService::new(InMemoryUserStore::new(), "test-secret", 3600)
    }

    #[tokio::test]
    async fn register_login_and_resolve_round_trip() {
        let service = service();
        let session = service
            .register("kid", "k@example.com", "Secret123")
            .await
            .unwrap();
        assert_eq!(service.resolve_principal(&session.token).unwrap(), session.user_id);

        let login = service.login("kid", "Secret123").await.unwrap();
        assert_eq!(login.user_id, session.user_id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_unauthorized() {
        let service = service();
        service
            .register("kid", "k@example.com", "Secret123")
            .await
            .unwrap();

        assert!(matches!(
            service.login("kid", "wrong-pass").await.unwrap_err(),
            GameError::Unauthorized
        ));
        assert!(matches!(
            service.login("nobody", "Secret123").await.unwrap_err(),
            GameError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let service = service();
        service
            .register("kid", "k@example.com", "Secret123")
            .await
            .unwrap();
        let err = service
            .register("kid", "other@example.com", "Secret123")
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::Conflict(_)));
    }

    #[tokio::test]
    async fn registration_validates_all_fields_at_once() {
        let service = service();
        let err = service.register("ab", "not-an-email", "short").await.unwrap_err();
        let GameError::ValidationFailed(fields) = err else {
            panic!("expected validation failure");
        };
        let named: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(named, vec!["username", "email", "password"]);
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let service = AuthService::new(InMemoryUserStore::new(), "secret-a", 3600);
        let other = AuthService::new(InMemoryUserStore::new(), "secret-b", 3600);
        let session = service.issue(Uuid::new_v4()).unwrap();

        assert!(matches!(
            other.resolve_principal(&session.token).unwrap_err(),
            GameError::Unauthorized
        ));
        assert!(matches!(
            service.resolve_principal("garbage").unwrap_err(),
            GameError::Unauthorized
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let service = AuthService::new(InMemoryUserStore::new(), "secret", -120);
        let session = service.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(
            service.resolve_principal(&session.token).unwrap_err(),
            GameError::Unauthorized
        ));
    }
}
