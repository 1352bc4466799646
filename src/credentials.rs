//! API key rotation.
//!
//! [`CredentialRotator`] owns the ordered key set for the life of the process.
//! Selection and exhaustion share a single mutex so concurrent dispatches
//! observe a consistent cursor: a key that one dispatch exhausted is never
//! handed to another, and two dispatches reporting the same exhausted key
//! advance the cursor only once.

use std::fmt;
use std::sync::Mutex;

use tracing::warn;

use crate::error::{DispatchError, Result};

/// An opaque API key. `Debug` and `Display` only reveal a short prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First 8 characters followed by `...`, safe for logs.
    pub fn masked(&self) -> String {
        let prefix: String = self.0.chars().take(8).collect();
        format!("{}...", prefix)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

#[derive(Debug)]
pub struct CredentialRotator {
    credentials: Vec<Credential>,
    // Index of the active credential; `credentials.len()` once all are spent.
    cursor: Mutex<usize>,
}

impl CredentialRotator {
    /// Fails with [`DispatchError::NoCredentialsConfigured`] for an empty set.
    pub fn new(tokens: Vec<String>) -> Result<Self> {
        if tokens.is_empty() {
            return Err(DispatchError::NoCredentialsConfigured);
        }
        Ok(Self {
            credentials: tokens.into_iter().map(Credential::new).collect(),
            cursor: Mutex::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn select_active(&self) -> Result<Credential> {
        let cursor = self.lock();
        self.credentials
            .get(*cursor)
            .cloned()
            .ok_or(DispatchError::AllCredentialsExhausted)
    }

    /// Mark `credential` exhausted. The cursor only moves when `credential`
    /// is still the active one, so stale reports from concurrent callers
    /// cannot skip a fresh key.
    pub fn mark_exhausted(&self, credential: &Credential) {
        let mut cursor = self.lock();
        if self.credentials.get(*cursor) == Some(credential) {
            *cursor += 1;
            warn!(
                key = %credential,
                remaining = self.credentials.len() - *cursor,
                "API key quota exhausted, rotating to next key"
            );
        }
    }

    /// Number of credentials not yet exhausted.
    pub fn remaining(&self) -> usize {
        self.credentials.len() - *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, usize> {
        // The guarded value is a plain index; a poisoned lock still holds a valid one.
        self.cursor.lock().unwrap_or_else(|e| e.into_inner())
    }
}
