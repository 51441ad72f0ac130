//! PIN lock
//!
//! The PIN is stored as a blake3 hash keyed with a random per-install salt
//! in a [`CredentialStore`]. With only 10^4 possible codes the hash does not
//! hold up against offline guessing; the credential file being readable by
//! its owner only is what keeps it private. Whether the lock is active lives
//! in the preferences.

use crate::preferences::PreferencesStore;
use crate::storage::{JsonDocument, PersistenceError};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

/// Number of digits of a PIN
pub const PIN_LENGTH: usize = 4;

/// Credential key under which the PIN hash is stored
const PIN_KEY: &str = "pin";

/// Credential key under which the salt of the PIN hash is stored
const PIN_SALT_KEY: &str = "pin_salt";

/// blake3 key derivation context for PIN hashes
const PIN_HASH_CONTEXT: &str = "showshelf pin lock v1";

/// Hashes `code` keyed with `salt`
fn pin_hash(salt: &[u8], code: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new_derive_key(PIN_HASH_CONTEXT);
    hasher.update(salt);
    hasher.update(code.as_bytes());
    hasher.finalize()
}

/// Fresh random salt
fn new_salt() -> Vec<u8> {
    [ulid::Ulid::new(), ulid::Ulid::new()]
        .iter()
        .flat_map(|id| id.to_bytes())
        .collect()
}

/// Errors that can occur during lock operations
#[derive(Debug, Error)]
pub enum LockError {
    /// The code is not a valid PIN
    #[error("A PIN must consist of exactly 4 digits")]
    InvalidPin,

    /// The lock cannot be enabled before a PIN was saved
    #[error("No PIN has been set")]
    NoPinSet,

    /// Reading or writing credentials or preferences failed
    #[error("Storage error: {0}")]
    Storage(#[from] PersistenceError),
}

/// Secret storage addressed by key
///
/// Saving under an existing key replaces the previous value.
pub trait CredentialStore: Send + Sync {
    /// Stores `data` under `key`
    fn save(&self, key: &str, data: &[u8]) -> Result<(), PersistenceError>;

    /// Reads the data stored under `key`, if any
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;
}

/// Credentials kept in an owner-only `credentials.json`
pub struct FileCredentialStore {
    document: JsonDocument<BTreeMap<String, Vec<u8>>>,
    // Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Opens the credential file inside the given data directory
    pub fn open(data_dir: &Path) -> Result<Self, PersistenceError> {
        Ok(Self {
            document: JsonDocument::open_private(data_dir, "credentials")?,
            write_lock: Mutex::new(()),
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, key: &str, data: &[u8]) -> Result<(), PersistenceError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut entries = self.document.load()?.unwrap_or_default();
        entries.insert(key.to_string(), data.to_vec());
        self.document.store(&entries)
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self
            .document
            .load()?
            .and_then(|mut entries| entries.remove(key)))
    }
}

/// PIN lock gating access to the application
pub struct PinLock<S> {
    credentials: S,
    preferences: PreferencesStore,
}

impl<S> PinLock<S>
where
    S: CredentialStore,
{
    pub fn new(credentials: S, preferences: PreferencesStore) -> Self {
        Self {
            credentials,
            preferences,
        }
    }

    /// Whether `code` has the shape of a PIN: exactly four ASCII digits
    pub fn is_valid_pin(code: &str) -> bool {
        code.len() == PIN_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
    }

    /// Saves a new PIN, replacing any previous one
    pub fn save_pin(&self, code: &str) -> Result<(), LockError> {
        if !Self::is_valid_pin(code) {
            return Err(LockError::InvalidPin);
        }
        let salt = new_salt();
        self.credentials.save(PIN_SALT_KEY, &salt)?;
        self.credentials.save(PIN_KEY, pin_hash(&salt, code).as_bytes())?;
        Ok(())
    }

    /// Whether a PIN has been saved
    pub fn has_pin(&self) -> Result<bool, LockError> {
        Ok(self.credentials.read(PIN_KEY)?.is_some())
    }

    /// Whether `code` matches the saved PIN
    ///
    /// Without a saved PIN nothing matches.
    pub fn pin_matches(&self, code: &str) -> Result<bool, LockError> {
        let Some(stored) = self.credentials.read(PIN_KEY)? else {
            return Ok(false);
        };
        let Some(salt) = self.credentials.read(PIN_SALT_KEY)? else {
            return Ok(false);
        };
        let Ok(stored) = <[u8; blake3::OUT_LEN]>::try_from(stored.as_slice()) else {
            return Ok(false);
        };

        // Hash equality is constant-time
        Ok(blake3::Hash::from_bytes(stored) == pin_hash(&salt, code))
    }

    /// Whether the PIN lock is active
    ///
    /// If the preferences cannot be read the lock counts as active as long
    /// as a PIN is set, or its presence cannot be checked either.
    pub fn is_pin_enabled(&self) -> bool {
        match self.preferences.try_load() {
            Ok(preferences) => preferences.pin_enabled,
            Err(e) => {
                warn!(error = %e, "Failed to read preferences, keeping the PIN lock active");
                self.has_pin().unwrap_or(true)
            }
        }
    }

    /// Turns the PIN lock on or off
    ///
    /// Turning it on requires a saved PIN.
    pub fn set_pin_enabled(&self, enabled: bool) -> Result<(), LockError> {
        if enabled && !self.has_pin()? {
            return Err(LockError::NoPinSet);
        }
        self.preferences.update(|p| p.pin_enabled = enabled)?;
        Ok(())
    }

    /// Whether biometric unlock is allowed
    pub fn is_biometric_enabled(&self) -> bool {
        self.preferences.load().biometric_enabled
    }

    /// Allows or forbids biometric unlock
    pub fn set_biometric_enabled(&self, enabled: bool) -> Result<(), LockError> {
        self.preferences.update(|p| p.biometric_enabled = enabled)?;
        Ok(())
    }
}
