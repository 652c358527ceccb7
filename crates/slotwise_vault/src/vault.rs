// --- File: crates/slotwise_vault/src/vault.rs ---
use base64::{engine::general_purpose, Engine as _};
use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, NONCE_LEN};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use slotwise_common::SlotwiseError;
use slotwise_config::VaultConfig;
use std::num::NonZeroU32;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::token::OAuthToken;

pub const SALT_LEN: usize = 64;
pub const KEY_LEN: usize = 32;
pub const TAG_LEN: usize = 16;
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Used outside production when no master secret is configured. Not safe.
pub const INSECURE_DEV_SECRET: &str = "slotwise-insecure-development-secret-change-me";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VaultError {
    #[error("Vault configuration error: {0}")]
    Configuration(String),
    #[error("Encryption failed: {0}")]
    Encryption(String),
    /// Malformed blob or authentication tag mismatch.
    #[error("Decryption failed: {0}")]
    Decryption(String),
}

impl From<VaultError> for SlotwiseError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::Configuration(msg) => SlotwiseError::Configuration(msg),
            VaultError::Encryption(msg) => SlotwiseError::Internal(msg),
            VaultError::Decryption(msg) => SlotwiseError::Decryption(msg),
        }
    }
}

/// Encrypts short secrets with a key derived per call from the master secret.
///
/// Blob layout: `base64(salt[64] ‖ nonce[12] ‖ ciphertext ‖ tag[16])`.
/// Every call draws a fresh salt and nonce, so equal plaintexts never share a blob.
#[derive(Clone)]
pub struct TokenVault {
    master_secret: Arc<Vec<u8>>,
    rng: SystemRandom,
}

impl std::fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVault").finish_non_exhaustive()
    }
}

impl TokenVault {
    pub fn new(master_secret: impl AsRef<[u8]>) -> Self {
        Self {
            master_secret: Arc::new(master_secret.as_ref().to_vec()),
            rng: SystemRandom::new(),
        }
    }

    /// Builds the vault from config. A missing secret is an error in production
    /// and falls back to [`INSECURE_DEV_SECRET`] with a warning otherwise.
    pub fn from_config(config: &VaultConfig, production: bool) -> Result<Self, VaultError> {
        match config.master_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => Ok(Self::new(secret)),
            None if production => Err(VaultError::Configuration(
                "vault.master_secret must be set in production".to_string(),
            )),
            None => {
                warn!("vault.master_secret is not set; using the insecure development secret");
                Ok(Self::new(INSECURE_DEV_SECRET))
            }
        }
    }

    fn derive_key(&self, salt: &[u8]) -> Result<LessSafeKey, ring::error::Unspecified> {
        let mut key = [0u8; KEY_LEN];
        let iterations = NonZeroU32::new(PBKDF2_ITERATIONS).ok_or(ring::error::Unspecified)?;
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA512,
            iterations,
            salt,
            self.master_secret.as_slice(),
            &mut key,
        );
        let unbound = UnboundKey::new(&aead::AES_256_GCM, &key)?;
        Ok(LessSafeKey::new(unbound))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut salt)
            .and_then(|_| self.rng.fill(&mut nonce_bytes))
            .map_err(|_| VaultError::Encryption("random source unavailable".to_string()))?;

        let key = self
            .derive_key(&salt)
            .map_err(|_| VaultError::Encryption("failed to derive key".to_string()))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| VaultError::Encryption("failed to seal plaintext".to_string()))?;

        let mut blob = Vec::with_capacity(SALT_LEN + NONCE_LEN + in_out.len());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&in_out);
        Ok(general_purpose::STANDARD.encode(blob))
    }

    pub fn decrypt(&self, blob: &str) -> Result<String, VaultError> {
        let raw = general_purpose::STANDARD
            .decode(blob.trim())
            .map_err(|e| VaultError::Decryption(format!("invalid base64: {e}")))?;

        if raw.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
            return Err(VaultError::Decryption("blob too short".to_string()));
        }

        let (salt, rest) = raw.split_at(SALT_LEN);
        let (nonce_bytes, sealed) = rest.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| VaultError::Decryption("invalid nonce".to_string()))?;

        let key = self
            .derive_key(salt)
            .map_err(|_| VaultError::Decryption("failed to derive key".to_string()))?;

        let mut in_out = sealed.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| VaultError::Decryption("authentication tag mismatch".to_string()))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| VaultError::Decryption("plaintext is not UTF-8".to_string()))
    }

    pub fn encrypt_oauth_token(&self, token: &OAuthToken) -> Result<String, VaultError> {
        let json = serde_json::to_string(token)
            .map_err(|e| VaultError::Encryption(format!("token serialization: {e}")))?;
        self.encrypt(&json)
    }

    pub fn decrypt_oauth_token(&self, blob: &str) -> Result<OAuthToken, VaultError> {
        let json = self.decrypt(blob)?;
        serde_json::from_str(&json)
            .map_err(|e| VaultError::Decryption(format!("token payload: {e}")))
    }

    /// [`Self::encrypt_oauth_token`] on the blocking pool.
    pub async fn seal_token(&self, token: OAuthToken) -> Result<String, VaultError> {
        let vault = self.clone();
        tokio::task::spawn_blocking(move || vault.encrypt_oauth_token(&token))
            .await
            .map_err(|e| VaultError::Encryption(format!("worker failed: {e}")))?
    }

    /// [`Self::decrypt_oauth_token`] on the blocking pool.
    pub async fn open_token(&self, blob: &str) -> Result<OAuthToken, VaultError> {
        let vault = self.clone();
        let blob = blob.to_string();
        tokio::task::spawn_blocking(move || vault.decrypt_oauth_token(&blob))
            .await
            .map_err(|e| VaultError::Decryption(format!("worker failed: {e}")))?
    }
}
