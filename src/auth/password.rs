use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::error;

use crate::config::HashConfig;

/// Argon2id hasher with configurable cost. Every hash gets a fresh random salt.
#[derive(Clone, Debug)]
pub struct Hasher {
    params: Params,
    // Hash of a random secret at the configured cost, checked when no account matches.
    decoy: Arc<str>,
}

impl Hasher {
    pub fn new(cfg: &HashConfig) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 parameters: {e}"))?;
        let mut hasher = Self {
            params,
            decoy: Arc::from(""),
        };
        let secret = SaltString::generate(&mut OsRng);
        hasher.decoy = hasher.hash_password(secret.as_str())?.into();
        Ok(hasher)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash_password(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// Cost parameters come from the stored hash, not from `self`.
    pub fn verify_password(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        Ok(self
            .argon2()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }

    /// Spends the same verification work as a real login, against a hash no
    /// password matches. Always false.
    pub fn verify_decoy(&self, plain: &str) -> bool {
        let _ = self.verify_password(plain, &self.decoy);
        false
    }
}
