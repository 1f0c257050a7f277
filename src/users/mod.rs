//! User registration, login and admin management.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::models::User;
use crate::storage::{Storage, StorageError};

/// One-shot flag: the very first registered user is promoted to admin, and
/// only ever once. Deleting that account later must not re-trigger the
/// promotion, so the decision is persisted rather than derived from the
/// user count alone.
const FIRST_ADMIN_SETTING: &str = "first_admin_created";

#[derive(Clone)]
pub struct UserService {
    storage: Arc<dyn Storage>,
}

impl UserService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Register a new user. Returns `None` when the username or email is
    /// already taken (the store's unique constraints decide, so concurrent
    /// registrations cannot both win).
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<User>> {
        let password_hash = hash_password(password)?;

        let is_first_user = self.storage.count_users().await? == 0;
        let first_admin_created = self
            .storage
            .get_setting(FIRST_ADMIN_SETTING)
            .await?
            .as_deref()
            == Some("true");
        let is_admin = is_first_user && !first_admin_created;

        let user = match self
            .storage
            .insert_user(username, email, &password_hash, is_admin)
            .await
        {
            Ok(user) => user,
            Err(StorageError::Conflict) => return Ok(None),
            Err(StorageError::Other(err)) => return Err(err),
        };

        if is_admin {
            self.storage
                .set_setting(FIRST_ADMIN_SETTING, "true")
                .await?;
            tracing::info!(user_id = user.id, username = %user.username, "first registered user promoted to admin");
        }

        Ok(Some(user))
    }

    /// Verify credentials. `None` covers both unknown username and wrong
    /// password.
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.storage.find_user_by_username(username).await? else {
            return Ok(None);
        };

        if verify_password(password, &user.password_hash) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<User>> {
        self.storage.find_user_by_id(user_id).await
    }

    pub async fn set_admin(&self, user_id: i64, is_admin: bool) -> Result<bool> {
        self.storage.set_user_admin(user_id, is_admin).await
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        self.storage.list_users().await
    }

    /// Hard delete; the schema detaches the user's links and drops their
    /// API keys.
    pub async fn delete(&self, user_id: i64) -> Result<bool> {
        self.storage.delete_user(user_id).await
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
