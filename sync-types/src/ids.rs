//! Subscription identifiers.

use std::fmt;

/// Number of random bytes in a subscription id.
const SUBSCRIPTION_ID_BYTES: usize = 8;

/// Identifier tying relay responses to the request that asked for them.
///
/// A fresh one is generated for every fetch, so late frames from an earlier
/// subscription on a reused relay can never be mistaken for current results.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Create a new random SubscriptionId (16 hex chars).
    pub fn random() -> Self {
        let mut bytes = [0u8; SUBSCRIPTION_ID_BYTES];
        // Time-derived fallback if the OS RNG is unavailable.
        if getrandom::getrandom(&mut bytes).is_err() {
            let nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default();
            bytes = nanos.to_le_bytes();
        }
        Self(hex::encode(bytes))
    }

    /// Wrap an existing id (e.g. one parsed from a relay frame).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_hex_and_distinct() {
        let a = SubscriptionId::random();
        let b = SubscriptionId::random();
        assert_eq!(a.as_str().len(), SUBSCRIPTION_ID_BYTES * 2);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_raw_id() {
        let id = SubscriptionId::new("sub1");
        assert_eq!(id.to_string(), "sub1");
        assert_eq!(format!("{:?}", id), "SubscriptionId(sub1)");
    }
}
