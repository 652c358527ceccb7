// --- File: crates/slotwise_vault/src/lib.rs ---
//! Token Vault: encryption at rest for tenant OAuth credentials.

pub mod token;
pub mod vault;

pub use token::OAuthToken;
pub use vault::{TokenVault, VaultError, INSECURE_DEV_SECRET, PBKDF2_ITERATIONS};
