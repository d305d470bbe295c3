//! Content fingerprints using blake3.
//!
//! Pipeline declarations are fingerprinted so that a reload can tell a
//! touched-but-identical pipeline from one whose transformer configuration
//! actually changed.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a hash representing "no content" (all zeros).
    #[inline]
    pub const fn empty() -> Self {
        Self([0; 32])
    }

    /// Check whether this is the "no content" hash.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    /// Convert to hex string.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Create from hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 16 hex chars are plenty for log lines
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).ok_or_else(|| serde::de::Error::custom("invalid content hash"))
    }
}

/// Hash raw bytes.
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    ContentHash::new(*blake3::hash(bytes).as_bytes())
}

/// Fingerprint any serializable value via its JSON encoding.
///
/// Object keys keep their declaration order, so reordering keys in a
/// pipeline file yields a different fingerprint.
pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> ContentHash {
    match serde_json::to_vec(value) {
        Ok(bytes) => hash_bytes(&bytes),
        Err(_) => ContentHash::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_hash_display() {
        let hash = ContentHash::new([0xab; 32]);
        assert_eq!(format!("{}", hash), "abababababababab");
    }

    #[test]
    fn test_content_hash_from_hex_rejects_bad_input() {
        assert!(ContentHash::from_hex("zz").is_none());
        assert!(ContentHash::from_hex("abcd").is_none());
    }

    #[test]
    fn test_content_hash_serde_as_hex() {
        let hash = ContentHash::new([0x12; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "12".repeat(32)));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = fingerprint(&json!({ "type": "Texture", "config": { "max_size": 512 } }));
        let b = fingerprint(&json!({ "type": "Texture", "config": { "max_size": 512 } }));
        let c = fingerprint(&json!({ "type": "Texture", "config": { "max_size": 1024 } }));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_empty());
    }
}
