//! The replicated event record.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::SyncError;

/// Profile metadata.
pub const KIND_METADATA: u32 = 0;

/// Encrypted direct message (ciphertext content addressed with a `p` tag).
pub const KIND_ENCRYPTED_DIRECT_MESSAGE: u32 = 4;

/// Generic application-specific record.
pub const KIND_APPLICATION_DATA: u32 = 30078;

/// Length of a hex-encoded event id or public key.
const HEX_ID_LEN: usize = 64;

/// An immutable, signed record replicated through relays.
///
/// Field names on the wire follow NIP-01 (`pubkey` for the author). The
/// signature is carried opaquely; verification happens before events reach
/// the replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Content-derived identifier (64 lowercase hex chars).
    pub id: String,
    /// Public key of the signer (64 lowercase hex chars).
    #[serde(rename = "pubkey")]
    pub author: String,
    /// Signer-asserted Unix timestamp in seconds.
    pub created_at: u64,
    /// Semantic type discriminator.
    pub kind: u32,
    /// Ordered tag lists, e.g. `["p", "<pubkey>"]`.
    #[serde(default)]
    pub tags: Vec<Vec<String>>,
    /// Plaintext or ciphertext payload.
    #[serde(default)]
    pub content: String,
    /// Schnorr signature (not checked here).
    #[serde(default)]
    pub sig: String,
}

impl Event {
    /// Build an unsigned event and derive its id from the content.
    pub fn new(
        author: impl Into<String>,
        created_at: u64,
        kind: u32,
        tags: Vec<Vec<String>>,
        content: impl Into<String>,
    ) -> Self {
        let mut event = Self {
            id: String::new(),
            author: author.into(),
            created_at,
            kind,
            tags,
            content: content.into(),
            sig: String::new(),
        };
        event.id = event.compute_id();
        event
    }

    /// Compute the NIP-01 id: sha256 over `[0, pubkey, created_at, kind, tags, content]`.
    pub fn compute_id(&self) -> String {
        let canonical = serde_json::json!([
            0,
            self.author,
            self.created_at,
            self.kind,
            self.tags,
            self.content
        ]);
        let digest = Sha256::digest(canonical.to_string().as_bytes());
        hex::encode(digest)
    }

    /// Structural validation.
    ///
    /// Checks shapes only. Neither the id hash nor the signature is verified.
    pub fn validate(&self) -> Result<(), SyncError> {
        if !is_hex_id(&self.id) {
            return Err(self.invalid("id is not 64 lowercase hex chars"));
        }
        if !is_hex_id(&self.author) {
            return Err(self.invalid("pubkey is not 64 lowercase hex chars"));
        }
        if self.tags.iter().any(|tag| tag.is_empty()) {
            return Err(self.invalid("empty tag"));
        }
        Ok(())
    }

    /// Values of every tag with the given name (second element of each tag).
    pub fn tag_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |tag| tag.first().map(String::as_str) == Some(name))
            .filter_map(|tag| tag.get(1).map(String::as_str))
    }

    /// Whether a `p` tag addresses the given public key.
    pub fn is_addressed_to(&self, pubkey: &str) -> bool {
        self.tag_values("p").any(|value| value == pubkey)
    }

    fn invalid(&self, reason: &str) -> SyncError {
        SyncError::InvalidEvent {
            id: self.id.clone(),
            reason: reason.to_string(),
        }
    }
}

fn is_hex_id(value: &str) -> bool {
    value.len() == HEX_ID_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
