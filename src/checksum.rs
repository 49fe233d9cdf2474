//! Checksum utilities for table determinism
//!
//! Two analyses of the same registry must serialize to byte-identical JSON.
//! `TableDigest` fingerprints that serialization so runs can be compared
//! without keeping both outputs around.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::Result;

/// SHA256 digest of serialized tables
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableDigest(String);

impl TableDigest {
    /// Compute digest from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Digest of the compact JSON serialization of any table.
    ///
    /// Ordered tables serialize in insertion order, so equal digests mean
    /// equal content and equal order.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let canonical = serde_json::to_vec(value)?;
        Ok(Self::from_bytes(&canonical))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines and summaries
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }

    /// Verify that a table matches this digest
    pub fn verify<T: Serialize + ?Sized>(&self, value: &T) -> Result<bool> {
        Ok(Self::of(value)? == *self)
    }
}

impl fmt::Display for TableDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TableDigest {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordered::OrderedSet;

    #[test]
    fn test_digest_consistency() {
        let a: OrderedSet<&str> = ["vkCreateDevice", "vkDestroyDevice"].into_iter().collect();
        let b: OrderedSet<&str> = ["vkCreateDevice", "vkDestroyDevice"].into_iter().collect();
        assert_eq!(TableDigest::of(&a).unwrap(), TableDigest::of(&b).unwrap());
    }

    #[test]
    fn test_digest_is_order_sensitive() {
        let a: OrderedSet<&str> = ["vkCreateDevice", "vkDestroyDevice"].into_iter().collect();
        let b: OrderedSet<&str> = ["vkDestroyDevice", "vkCreateDevice"].into_iter().collect();
        assert_ne!(TableDigest::of(&a).unwrap(), TableDigest::of(&b).unwrap());
    }

    #[test]
    fn test_digest_format() {
        let digest = TableDigest::from_bytes(b"registry");
        assert_eq!(digest.as_str().len(), 64);
        assert_eq!(digest.short().len(), 12);
        assert!(digest.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_verify() {
        let tables = vec!["VkInstance", "VkDevice"];
        let digest = TableDigest::of(&tables).unwrap();
        assert!(digest.verify(&tables).unwrap());
        assert!(!digest.verify(&vec!["VkDevice"]).unwrap());
    }
}
