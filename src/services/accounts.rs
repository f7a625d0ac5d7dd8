//! User accounts: registration and credential checks.
//!
//! Passwords are stored as argon2 PHC strings. Hashing runs on the blocking
//! pool since it is deliberately slow.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{ServiceError, ServiceResult};
use crate::models::User;
use crate::repository::util::is_unique_violation;
use crate::repository::DbContext;

const MAX_USERNAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;

const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

pub fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())
        .map_err(|e| ServiceError::upstream("Failed to hash password", e))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::upstream("Failed to hash password", e))
}

/// Check a password against a stored PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

fn validate_username(raw: &str) -> ServiceResult<String> {
    let username = User::normalize_username(raw);
    if username.is_empty() {
        return Err(ServiceError::validation("Username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ServiceError::validation(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(ServiceError::validation(
            "Username may contain only letters, digits and @/./+/-/_",
        ));
    }
    Ok(username)
}

async fn blocking<T: Send + 'static>(
    work: impl FnOnce() -> ServiceResult<T> + Send + 'static,
) -> ServiceResult<T> {
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServiceError::upstream("Password hashing failed", e))?
}

#[derive(Clone)]
pub struct AccountService {
    db: DbContext,
}

impl AccountService {
    pub fn new(db: DbContext) -> Self {
        Self { db }
    }

    /// Register a new account. Taken usernames fail with `Conflict`.
    pub async fn create(&self, username: &str, password: &str) -> ServiceResult<User> {
        let username = validate_username(username)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let password = password.to_string();
        let hash = blocking(move || hash_password(&password)).await?;
        match self.db.users().create(&username, &hash).await {
            Ok(user) => {
                tracing::info!("Created user {} ({})", user.username, user.id);
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => Err(ServiceError::Conflict(
                "A user with that username already exists.".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a user by name and check the password.
    pub async fn authenticate(&self, username: &str, password: &str) -> ServiceResult<User> {
        let username = User::normalize_username(username);
        let Some(user) = self.db.users().get_by_username(&username).await? else {
            return Err(ServiceError::Unauthorized(BAD_CREDENTIALS.into()));
        };

        let password = password.to_string();
        let stored = user.password_hash.clone();
        if !blocking(move || Ok(verify_password(&password, &stored))).await? {
            tracing::debug!("Failed login for {}", username);
            return Err(ServiceError::Unauthorized(BAD_CREDENTIALS.into()));
        }
        Ok(user)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<User> {
        self.db
            .users()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }

    /// The account a token was issued to. Tokens outlive deleted accounts,
    /// so a missing user is `Unauthorized` rather than `NotFound`.
    pub async fn active_user(&self, id: i64) -> ServiceResult<User> {
        match self.get(id).await {
            Err(ServiceError::NotFound(_)) => {
                Err(ServiceError::Unauthorized("User not found".into()))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn service() -> (tempfile::TempDir, AccountService) {
        let dir = tempdir().unwrap();
        let db = DbContext::new(&dir.path().join("test.db"));
        db.migrate().await.unwrap();
        (dir, AccountService::new(db))
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret-pass", "not-a-hash"));
    }

    #[test]
    fn test_username_rules() {
        assert_eq!(validate_username("  Alice ").unwrap(), "alice");
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username(&"x".repeat(151)).is_err());
        assert_eq!(validate_username("a.b+c@d").unwrap(), "a.b+c@d");
    }

    #[tokio::test]
    async fn test_create_and_authenticate() {
        let (_dir, accounts) = service().await;
        let user = accounts.create("Alice", "correct horse").await.unwrap();
        assert_eq!(user.username, "alice");

        let found = accounts.authenticate("ALICE", "correct horse").await.unwrap();
        assert_eq!(found.id, user.id);
        assert!(matches!(
            accounts.authenticate("alice", "wrong password").await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            accounts.authenticate("nobody", "correct horse").await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_active_user_requires_existing_account() {
        let (_dir, accounts) = service().await;
        let user = accounts.create("dave", "password-1").await.unwrap();
        assert_eq!(accounts.active_user(user.id).await.unwrap().username, "dave");
        assert!(matches!(
            accounts.active_user(user.id + 100).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            accounts.get(user.id + 100).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let (_dir, accounts) = service().await;
        accounts.create("bob", "password-1").await.unwrap();
        assert!(matches!(
            accounts.create(" BOB ", "password-2").await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            accounts.create("carol", "short").await,
            Err(ServiceError::Validation(_))
        ));
    }
}
