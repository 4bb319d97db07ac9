use hex;
use sha2::{Digest, Sha256};

/// Validates cached questionnaire text integrity using SHA-256 checksums
///
/// Survey schemas are parsed on every export; the raw questionnaire text is
/// cached per survey id to skip the database round trip. This module
/// protects that cache:
/// 1. A checksum is generated when the text is cached
/// 2. The checksum is validated when the text is retrieved
/// 3. Corrupted entries are rejected and the survey is refetched
///
/// # Security Model
///
/// - Uses SHA-256 for cryptographic hash generation
/// - Stores checksum alongside cached data
/// - Validates on retrieval to detect tampering
/// - Falls back to fresh fetch if validation fails

/// Wrapper for cached data with integrity validation
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ValidatedCacheEntry {
    /// The actual cached data (questionnaire JSON text)
    pub data: String,
    /// SHA-256 checksum of the data (hex encoded)
    pub checksum: String,
}

impl ValidatedCacheEntry {
    /// Creates a new validated cache entry with computed checksum
    ///
    /// # Example
    ///
    /// ```ignore
    /// let entry = ValidatedCacheEntry::new(questionnaire_text);
    /// cache.insert(survey_id, entry.serialize()).await;
    /// ```
    pub fn new(data: String) -> Self {
        let checksum = Self::compute_checksum(&data);
        Self { data, checksum }
    }

    /// Computes SHA-256 checksum of the data
    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Validates the integrity of the cached data
    ///
    /// Returns true if the checksum matches, false if tampered
    pub fn is_valid(&self) -> bool {
        let computed = Self::compute_checksum(&self.data);
        computed == self.checksum
    }

    /// Serializes the entry for storage in cache
    ///
    /// Returns JSON string with both data and checksum
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Deserializes and validates a cache entry
    ///
    /// Returns Some(data) if valid, None if corrupted or invalid JSON
    pub fn deserialize_and_validate(serialized: &str) -> Option<String> {
        let entry: ValidatedCacheEntry = serde_json::from_str(serialized).ok()?;

        if entry.is_valid() {
            Some(entry.data)
        } else {
            // Checksum mismatch - cache poisoned
            tracing::warn!(
                "Cache validation failed: checksum mismatch. Expected: {}, Data length: {}",
                entry.checksum,
                entry.data.len()
            );
            None
        }
    }
}
