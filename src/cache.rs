use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

use tokio::sync::RwLock;

use crate::models::{PreferenceProfile, Recommendation};

/// Key for one user's cached recommendation list
///
/// Derived from the user ID and a stable hash of the serialized preference
/// profile. Interaction history is deliberately excluded, so a cached entry
/// may lag behind new history within the same profile until it is
/// invalidated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    user_id: String,
    profile_hash: u64,
}

impl CacheKey {
    pub fn new(user_id: &str, profile: &PreferenceProfile) -> Self {
        Self {
            user_id: user_id.to_string(),
            profile_hash: stable_profile_hash(profile),
        }
    }

    pub fn belongs_to(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rec:{}:{:016x}", self.user_id, self.profile_hash)
    }
}

/// Hashes the canonical serialization of a profile. The typed struct fixes
/// the field order, so the JSON key order of the inbound request cannot
/// affect the key.
fn stable_profile_hash(profile: &PreferenceProfile) -> u64 {
    let canonical = serde_json::to_string(profile).unwrap_or_default();
    let mut hasher = DefaultHasher::new();
    canonical.hash(&mut hasher);
    hasher.finish()
}

/// In-memory recommendation cache shared across requests
///
/// Entries live for the lifetime of the process; there is no expiry. The
/// only way entries leave the map is an explicit invalidation call, either
/// per user or for the whole cache.
#[derive(Default)]
pub struct RecommendationCache {
    entries: RwLock<HashMap<CacheKey, Vec<Recommendation>>>,
}

impl RecommendationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Vec<Recommendation>> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn put(&self, key: CacheKey, recommendations: Vec<Recommendation>) {
        self.entries.write().await.insert(key, recommendations);
    }

    /// Removes one user's entries, or every entry when no user is given.
    /// Clearing an already-empty cache is a silent no-op.
    pub async fn invalidate(&self, user_id: Option<&str>) {
        let mut entries = self.entries.write().await;
        match user_id {
            Some(user_id) => entries.retain(|key, _| !key.belongs_to(user_id)),
            None => entries.clear(),
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
