//! Environment variable naming for configuration overrides and secrets.
//!
//! Plain settings are overridden with `SLOTWISE__SECTION__KEY`. Values written as
//! `"secret_from_env"` in a config file are resolved from `SLOTWISE_SECRET_SECTION_KEY`,
//! falling back to the shorter `SECTION_KEY` form.

use std::env;
use tracing::warn;

/// The default prefix for configuration environment variables
pub const DEFAULT_PREFIX: &str = "SLOTWISE";

/// The prefix for secret environment variables
pub const SECRET_PREFIX: &str = "SLOTWISE_SECRET";

pub const CONFIG_SEPARATOR: &str = "__";

pub const SECRET_SEPARATOR: &str = "_";

/// Marker string replaced by an environment lookup at load time.
pub const SECRET_MARKER: &str = "secret_from_env";

pub fn get_config_prefix() -> String {
    env::var("PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string())
}

/// `"vault.master_secret"` becomes `"SLOTWISE__VAULT__MASTER_SECRET"`.
pub fn config_path_to_env_var(path: &str) -> String {
    let prefix = get_config_prefix();
    let path = path.replace('.', CONFIG_SEPARATOR);
    format!("{}{}{}", prefix, CONFIG_SEPARATOR, path).to_uppercase()
}

/// `"gcal.client_secret"` becomes `"SLOTWISE_SECRET_GCAL_CLIENT_SECRET"`.
pub fn secret_path_to_env_var(path: &str) -> String {
    let path = path.replace('.', SECRET_SEPARATOR);
    format!("{}{}{}", SECRET_PREFIX, SECRET_SEPARATOR, path).to_uppercase()
}

/// `"gcal.client_secret"` becomes `"GCAL_CLIENT_SECRET"`.
pub fn legacy_secret_path_to_env_var(path: &str) -> String {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.len() < 2 {
        return path.to_uppercase();
    }

    let service = parts[0];
    let key = parts[1..].join(SECRET_SEPARATOR);
    format!("{}_{}", service, key).to_uppercase()
}

pub fn get_config_env_var(path: &str) -> Option<String> {
    env::var(config_path_to_env_var(path)).ok()
}

pub fn get_secret_env_var(path: &str) -> Option<String> {
    if let Ok(value) = env::var(secret_path_to_env_var(path)) {
        return Some(value);
    }
    env::var(legacy_secret_path_to_env_var(path)).ok()
}

/// Paths containing "secret", "key", "password" or "token" are treated as secrets.
pub fn is_secret_path(path: &str) -> bool {
    let path_lower = path.to_lowercase();
    path_lower.contains("secret")
        || path_lower.contains("key")
        || path_lower.contains("password")
        || path_lower.contains("token")
}

pub fn get_env_var(path: &str) -> Option<String> {
    if is_secret_path(path) {
        get_secret_env_var(path)
    } else {
        get_config_env_var(path)
    }
}

/// Replaces every `"secret_from_env"` marker in `value` with its environment value.
///
/// A marker with no matching variable becomes `null`, so optional secrets
/// deserialize as `None` instead of carrying the marker text.
/// Returns the dotted paths that stayed unresolved.
pub fn inject_env_vars(value: &mut serde_json::Value) -> Vec<String> {
    use serde_json::Value;

    fn walk(path: &mut Vec<String>, obj: &mut Value, missing: &mut Vec<String>) {
        match obj {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    path.push(k.to_string());
                    walk(path, v, missing);
                    path.pop();
                }
            }
            Value::Array(arr) => {
                for (i, v) in arr.iter_mut().enumerate() {
                    path.push(i.to_string());
                    walk(path, v, missing);
                    path.pop();
                }
            }
            Value::String(s) if s == SECRET_MARKER => {
                let path_str = path.join(".");
                match get_env_var(&path_str) {
                    Some(env_val) => *obj = Value::String(env_val),
                    None => {
                        warn!("env var for {} not found", path_str);
                        missing.push(path_str);
                        *obj = Value::Null;
                    }
                }
            }
            _ => {}
        }
    }

    let mut missing = Vec::new();
    walk(&mut Vec::new(), value, &mut missing);
    missing
}
