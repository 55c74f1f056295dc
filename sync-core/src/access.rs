//! Access resolution for encrypted events.
//!
//! Given a stored event and an ordered set of candidate keys, find the key
//! that opens it. The cryptographic primitive is supplied by the caller
//! through [`Decryptor`]; this module only sequences attempts and classifies
//! the result.
//!
//! Keys are tried broadest first: an operator key that can read any staff
//! submission is tried before a user's own recipient or sender key, since a
//! success with the broad key is unambiguous and narrower keys are expected
//! to fail for most events.
//!
//! Resolution never fails: an event nobody can read resolves to
//! [`Access::Locked`] so its metadata can still be shown.

use std::fmt;
use std::sync::Arc;
use sync_types::{Event, KIND_ENCRYPTED_DIRECT_MESSAGE};
use thiserror::Error;
use zeroize::Zeroizing;

/// How a candidate key relates to an encrypted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyRole {
    /// Privileged key able to read every submission addressed to it.
    Operator,
    /// The holder is the intended recipient; the counterparty is the author.
    Recipient,
    /// The holder wrote the event; the counterparty is the `p`-tagged recipient.
    Sender,
}

impl KeyRole {
    /// Attempt order, lowest first.
    pub fn priority(self) -> u8 {
        match self {
            KeyRole::Operator => 0,
            KeyRole::Recipient => 1,
            KeyRole::Sender => 2,
        }
    }
}

/// A private key offered for decryption.
///
/// Secret bytes are zeroized when the key is dropped.
#[derive(Clone)]
pub struct CandidateKey {
    role: KeyRole,
    label: String,
    secret: Zeroizing<Vec<u8>>,
}

impl CandidateKey {
    /// Create a candidate key.
    pub fn new(role: KeyRole, label: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            role,
            label: label.into(),
            secret: Zeroizing::new(secret.into()),
        }
    }

    /// The key's role.
    pub fn role(&self) -> KeyRole {
        self.role
    }

    /// Human-readable label (never the secret).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Raw secret bytes.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Public key of the other party in the shared secret, per role.
    pub fn counterparty<'e>(&self, event: &'e Event) -> Option<&'e str> {
        match self.role {
            KeyRole::Operator | KeyRole::Recipient => Some(event.author.as_str()),
            KeyRole::Sender => event.tag_values("p").next(),
        }
    }
}

impl fmt::Debug for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateKey")
            .field("role", &self.role)
            .field("label", &self.label)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Why a single decryption attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptError {
    /// The ciphertext is well-formed but this key does not open it.
    #[error("key does not open this event")]
    WrongKey,
    /// The content is not ciphertext in the expected format.
    #[error("malformed ciphertext: {0}")]
    Malformed(String),
}

/// Decryption primitive supplied by the embedding application.
pub trait Decryptor: Send + Sync {
    /// Attempt to decrypt `event.content` with `key`.
    fn decrypt(&self, key: &CandidateKey, event: &Event) -> Result<String, DecryptError>;
}

/// Result of resolving an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Readable content.
    Plaintext(String),
    /// No candidate key opened the event.
    Locked,
    /// Every attempt reported the content as garbage.
    Malformed {
        /// Reason from the last attempt.
        reason: String,
    },
}

impl Access {
    /// Plaintext, if the event could be read.
    pub fn plaintext(&self) -> Option<&str> {
        match self {
            Access::Plaintext(text) => Some(text),
            _ => None,
        }
    }

    /// Whether the event stayed locked.
    pub fn is_locked(&self) -> bool {
        matches!(self, Access::Locked)
    }
}

/// An event paired with its resolved access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedEvent {
    /// The stored event, untouched.
    pub event: Event,
    /// What the candidate keys could make of it.
    pub access: Access,
}

/// Sequences candidate keys against a [`Decryptor`].
#[derive(Clone)]
pub struct AccessResolver {
    decryptor: Arc<dyn Decryptor>,
    encrypted_kinds: Vec<u32>,
    legacy_plaintext: bool,
}

impl AccessResolver {
    /// Create a resolver treating kind 4 as encrypted.
    pub fn new(decryptor: Arc<dyn Decryptor>) -> Self {
        Self {
            decryptor,
            encrypted_kinds: vec![KIND_ENCRYPTED_DIRECT_MESSAGE],
            legacy_plaintext: true,
        }
    }

    /// Set which kinds carry ciphertext.
    pub fn with_encrypted_kinds(mut self, kinds: impl IntoIterator<Item = u32>) -> Self {
        self.encrypted_kinds = kinds.into_iter().collect();
        self
    }

    /// Accept unencrypted JSON objects stored under an encrypted kind.
    ///
    /// Older clients published plaintext submissions with the encrypted kind.
    pub fn with_legacy_plaintext(mut self, enabled: bool) -> Self {
        self.legacy_plaintext = enabled;
        self
    }

    /// Resolve one event against the candidate keys.
    pub fn resolve(&self, event: &Event, keys: &[CandidateKey]) -> Access {
        if !self.encrypted_kinds.contains(&event.kind) {
            return Access::Plaintext(event.content.clone());
        }

        let mut ordered: Vec<&CandidateKey> = keys.iter().collect();
        ordered.sort_by_key(|key| key.role.priority());

        let mut wrong_key = false;
        let mut malformed = None;
        for key in ordered {
            match self.decryptor.decrypt(key, event) {
                Ok(plaintext) => return Access::Plaintext(plaintext),
                Err(DecryptError::WrongKey) => wrong_key = true,
                Err(DecryptError::Malformed(reason)) => malformed = Some(reason),
            }
        }

        if self.legacy_plaintext && is_json_object(&event.content) {
            return Access::Plaintext(event.content.clone());
        }

        match malformed {
            Some(reason) if !wrong_key => Access::Malformed { reason },
            _ => Access::Locked,
        }
    }

    /// Resolve every event, preserving order.
    pub fn resolve_all(&self, events: Vec<Event>, keys: &[CandidateKey]) -> Vec<DecryptedEvent> {
        events
            .into_iter()
            .map(|event| {
                let access = self.resolve(&event, keys);
                DecryptedEvent { event, access }
            })
            .collect()
    }
}

impl fmt::Debug for AccessResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessResolver")
            .field("encrypted_kinds", &self.encrypted_kinds)
            .field("legacy_plaintext", &self.legacy_plaintext)
            .finish_non_exhaustive()
    }
}

fn is_json_object(content: &str) -> bool {
    matches!(
        serde_json::from_str::<serde_json::Value>(content),
        Ok(serde_json::Value::Object(_))
    )
}
