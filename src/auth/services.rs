use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::password::Hasher;
use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, User};
use crate::error::AuthError;

/// Plaintext signup data, after field checks.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub image: Option<String>,
}

/// Credential rules on top of a [`UserStore`].
#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn UserStore>,
    hasher: Hasher,
}

impl CredentialService {
    pub fn new(store: Arc<dyn UserStore>, hasher: Hasher) -> Self {
        Self { store, hasher }
    }

    pub async fn check_email_exists(&self, email: &str) -> Result<bool, AuthError> {
        Ok(self.store.find_by_email(email).await?.is_some())
    }

    /// Hashes the password and persists the user. A concurrent signup that
    /// slipped past [`check_email_exists`](Self::check_email_exists) still
    /// fails here with [`AuthError::EmailTaken`].
    pub async fn register_user(&self, reg: Registration) -> Result<(), AuthError> {
        let password_hash = self.hasher.hash_password(&reg.password)?;
        let user = self
            .store
            .save(NewUser {
                name: reg.name,
                email: reg.email,
                password_hash,
                image: reg.image,
            })
            .await?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(())
    }

    /// Returns the user only when the email exists and the password matches.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, AuthError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            // Same Argon2 work as a wrong password, so timing does not reveal the account.
            self.hasher.verify_decoy(password);
            debug!(%email, "login unknown email");
            return Ok(None);
        };
        if self.hasher.verify_password(password, &user.password_hash)? {
            info!(user_id = %user.id, "user logged in");
            Ok(Some(user))
        } else {
            debug!(user_id = %user.id, "login invalid password");
            Ok(None)
        }
    }
}
