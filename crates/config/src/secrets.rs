// Secrets lookup
//
// Credentials are read from:
// 1. System keychain (with the `keychain` feature)
// 2. Environment variables (CI/cron)
// 3. A token file named in the settings (sheets token only)
//
// Secrets are NEVER stored in config.toml

use std::env;
use std::fs;
use std::path::Path;

/// Service name for keychain storage
#[cfg(feature = "keychain")]
const KEYCHAIN_SERVICE: &str = "wrsync";

/// A credential the sync needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secret {
    WikiPassword,
    SheetsToken,
}

impl Secret {
    pub fn env_var(&self) -> &'static str {
        match self {
            Secret::WikiPassword => "WRSYNC_WIKI_PASSWORD",
            Secret::SheetsToken => "WRSYNC_SHEETS_TOKEN",
        }
    }

    #[cfg(feature = "keychain")]
    fn keychain_account(&self) -> &'static str {
        match self {
            Secret::WikiPassword => "wiki/password",
            Secret::SheetsToken => "sheets/token",
        }
    }
}

/// Where a secret came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Keychain,
    Environment,
    File,
    None,
}

impl SecretSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretSource::Keychain => "keychain",
            SecretSource::Environment => "environment",
            SecretSource::File => "file",
            SecretSource::None => "none",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecretLookup {
    pub value: Option<String>,
    pub source: SecretSource,
}

impl SecretLookup {
    fn found(value: String, source: SecretSource) -> Self {
        Self { value: Some(value), source }
    }

    fn none() -> Self {
        Self { value: None, source: SecretSource::None }
    }
}

/// Look up a secret in the keychain, then the environment.
pub fn get_secret(secret: Secret) -> SecretLookup {
    #[cfg(feature = "keychain")]
    {
        if let Ok(entry) = keyring::Entry::new(KEYCHAIN_SERVICE, secret.keychain_account()) {
            if let Ok(value) = entry.get_password() {
                return SecretLookup::found(value, SecretSource::Keychain);
            }
        }
    }

    if let Ok(value) = env::var(secret.env_var()) {
        if !value.is_empty() {
            return SecretLookup::found(value, SecretSource::Environment);
        }
    }

    SecretLookup::none()
}

/// Like [`get_secret`], falling back to the first line of `file`.
pub fn get_secret_or_file(secret: Secret, file: Option<&Path>) -> SecretLookup {
    let lookup = get_secret(secret);
    if lookup.value.is_some() {
        return lookup;
    }
    let Some(path) = file else {
        return lookup;
    };
    match fs::read_to_string(path) {
        Ok(contents) => match contents.lines().next().map(str::trim) {
            Some(line) if !line.is_empty() => SecretLookup::found(line.to_string(), SecretSource::File),
            _ => {
                log::warn!("token file {} is empty", path.display());
                SecretLookup::none()
            }
        },
        Err(e) => {
            log::warn!("cannot read token file {}: {e}", path.display());
            SecretLookup::none()
        }
    }
}

/// Store a secret in the system keychain
#[cfg(feature = "keychain")]
pub fn set_secret(secret: Secret, value: &str) -> Result<(), String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, secret.keychain_account())
        .map_err(|e| format!("Failed to create keychain entry: {}", e))?;

    entry
        .set_password(value)
        .map_err(|e| format!("Failed to store secret in keychain: {}", e))
}

#[cfg(not(feature = "keychain"))]
pub fn set_secret(secret: Secret, _value: &str) -> Result<(), String> {
    Err(format!(
        "Keychain support not enabled. Set {} instead.",
        secret.env_var()
    ))
}
