//! Last-analysis cache
//!
//! Holds the most recent analysis keyed by upload identity, so a presentation
//! layer can re-render without recomputing. A new upload replaces the entry.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::GammaResult;
use crate::gamma::ChainAnalysis;

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum age before recompute (in minutes); None keeps entries forever
    pub max_age_minutes: Option<i64>,
    /// Whether to use cache
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: None,
            enabled: true,
        }
    }
}

/// Identity of one uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadId(u64);

impl UploadId {
    /// Identity derived from the uploaded bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Identity supplied by the upload layer (file name, request id, ...)
    pub fn from_name(name: &str) -> Self {
        Self::from_bytes(name.as_bytes())
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    id: UploadId,
    computed_at: DateTime<Utc>,
    analysis: Arc<ChainAnalysis>,
}

/// Single-entry analysis cache
#[derive(Debug, Default)]
pub struct AnalysisCache {
    config: CacheConfig,
    entry: Option<CacheEntry>,
}

impl AnalysisCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entry: None,
        }
    }

    /// Check if the cached entry belongs to `id` and has not expired
    pub fn is_valid(&self, id: UploadId) -> bool {
        if !self.config.enabled {
            return false;
        }

        match &self.entry {
            Some(entry) if entry.id == id => match self.config.max_age_minutes {
                Some(max_age) => Utc::now() - entry.computed_at < Duration::minutes(max_age),
                None => true,
            },
            _ => false,
        }
    }

    /// Cached analysis for `id`, if still valid
    pub fn get(&self, id: UploadId) -> Option<Arc<ChainAnalysis>> {
        if self.is_valid(id) {
            self.entry.as_ref().map(|e| Arc::clone(&e.analysis))
        } else {
            None
        }
    }

    /// Store an analysis, discarding whatever was cached before
    pub fn store(&mut self, id: UploadId, analysis: ChainAnalysis) -> Arc<ChainAnalysis> {
        self.store_at(id, analysis, Utc::now())
    }

    fn store_at(
        &mut self,
        id: UploadId,
        analysis: ChainAnalysis,
        computed_at: DateTime<Utc>,
    ) -> Arc<ChainAnalysis> {
        let analysis = Arc::new(analysis);
        if self.config.enabled {
            self.entry = Some(CacheEntry {
                id,
                computed_at,
                analysis: Arc::clone(&analysis),
            });
        }
        analysis
    }

    /// Return the cached analysis or compute, cache and return a fresh one
    pub fn get_or_compute<F>(&mut self, id: UploadId, compute: F) -> GammaResult<Arc<ChainAnalysis>>
    where
        F: FnOnce() -> GammaResult<ChainAnalysis>,
    {
        if let Some(analysis) = self.get(id) {
            debug!(upload = id.value(), "analysis cache hit");
            return Ok(analysis);
        }

        debug!(upload = id.value(), "analysis cache miss");
        let analysis = compute()?;
        Ok(self.store(id, analysis))
    }

    /// Drop the cached entry
    pub fn clear(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RawTable;
    use crate::gamma::GammaPipeline;

    fn analysis() -> ChainAnalysis {
        let table = RawTable::from_strings(vec![
            vec!["Strike", "Gamma", "Type"],
            vec!["95", "0.02", "P"],
            vec!["100", "0.03", "C"],
        ]);
        GammaPipeline::new().analyze(&table).unwrap()
    }

    #[test]
    fn test_upload_identity() {
        assert_eq!(UploadId::from_bytes(b"abc"), UploadId::from_bytes(b"abc"));
        assert_ne!(UploadId::from_bytes(b"abc"), UploadId::from_bytes(b"abd"));
        assert_eq!(UploadId::from_name("chain.csv"), UploadId::from_bytes(b"chain.csv"));
    }

    #[test]
    fn test_get_or_compute_reuses_entry() {
        let mut cache = AnalysisCache::new(CacheConfig::default());
        let id = UploadId::from_name("chain.csv");

        let first = cache.get_or_compute(id, || Ok(analysis())).unwrap();
        let second = cache
            .get_or_compute(id, || panic!("should be served from cache"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_new_upload_replaces_entry() {
        let mut cache = AnalysisCache::new(CacheConfig::default());
        let a = UploadId::from_name("a.csv");
        let b = UploadId::from_name("b.csv");

        cache.store(a, analysis());
        cache.store(b, analysis());

        assert!(cache.get(a).is_none());
        assert!(cache.get(b).is_some());

        cache.clear();
        assert!(cache.get(b).is_none());
    }

    #[test]
    fn test_expired_entry() {
        let mut cache = AnalysisCache::new(CacheConfig {
            max_age_minutes: Some(5),
            enabled: true,
        });
        let id = UploadId::from_name("chain.csv");

        cache.store_at(id, analysis(), Utc::now() - Duration::minutes(10));
        assert!(!cache.is_valid(id));

        cache.store(id, analysis());
        assert!(cache.is_valid(id));
    }

    #[test]
    fn test_disabled_cache_always_computes() {
        let mut cache = AnalysisCache::new(CacheConfig {
            max_age_minutes: None,
            enabled: false,
        });
        let id = UploadId::from_name("chain.csv");

        cache.store(id, analysis());
        assert!(cache.get(id).is_none());
    }

    #[test]
    fn test_compute_error_is_not_cached() {
        let mut cache = AnalysisCache::new(CacheConfig::default());
        let id = UploadId::from_name("broken.csv");

        let table = RawTable::from_strings(vec![vec!["Strike"], vec!["100"]]);
        let result = cache.get_or_compute(id, || GammaPipeline::new().analyze(&table));
        assert!(result.is_err());
        assert!(!cache.is_valid(id));
    }
}
