//! Runtime configuration for opening a dex.

use crate::fetch::FetchPolicy;
use log::warn;
use pokeapi::{Endpoint, DEFAULT_API_BASE};
use std::path::PathBuf;

/// Directory holding snapshots, the team file and preferences.
pub const DEFAULT_CACHE_DIR: &str = "data";

/// How many records of each collection to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub types: u32,
    pub moves: u32,
    pub abilities: u32,
    pub species: u32,
}

impl Default for Counts {
    fn default() -> Self {
        Self {
            types: 18,
            moves: 796,
            abilities: 267,
            species: 898,
        }
    }
}

/// Configuration for [`Pokedex::open`](crate::Pokedex::open).
#[derive(Debug, Clone)]
pub struct DexConfig {
    /// Where snapshots live.
    pub cache_dir: PathBuf,

    /// API root used for numbered requests.
    pub api_base: String,

    /// Collection sizes.
    pub counts: Counts,

    /// Retry and concurrency policy for the fetcher.
    pub policy: FetchPolicy,
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            api_base: DEFAULT_API_BASE.to_string(),
            counts: Counts::default(),
            policy: FetchPolicy::default(),
        }
    }
}

impl DexConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `POKEDEX_CACHE_DIR`, `POKEAPI_BASE_URL` and
    /// `POKEDEX_FAILURE_THRESHOLD`.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    ///
    /// Blank values are ignored, as are thresholds that are not positive
    /// integers.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = lookup("POKEDEX_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(base) = lookup("POKEAPI_BASE_URL") {
            self.api_base = base;
        }
        if let Some(raw) = lookup("POKEDEX_FAILURE_THRESHOLD") {
            match raw.trim().parse::<u32>() {
                Ok(threshold) if threshold > 0 => {
                    self.policy = self.policy.with_failure_threshold(threshold);
                }
                _ => warn!("Ignoring POKEDEX_FAILURE_THRESHOLD={raw:?}, expected a positive integer"),
            }
        }
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn with_counts(mut self, counts: Counts) -> Self {
        self.counts = counts;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.policy = self.policy.with_failure_threshold(threshold);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.policy = self.policy.with_workers(workers);
        self
    }

    /// Replace the skip list of one collection.
    pub fn with_skipped(mut self, endpoint: Endpoint, ids: impl IntoIterator<Item = u32>) -> Self {
        self.policy = self.policy.with_skipped(endpoint, ids);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DexConfig::new();
        assert_eq!(config.cache_dir, PathBuf::from("data"));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.counts.species, 898);
        assert_eq!(config.counts.moves, 796);
        assert_eq!(config.policy.failure_threshold, 10);
    }

    #[test]
    fn test_overrides() {
        let env = HashMap::from([
            ("POKEDEX_CACHE_DIR", "/tmp/dex"),
            ("POKEAPI_BASE_URL", "http://localhost:8000/api/v2/"),
            ("POKEDEX_FAILURE_THRESHOLD", "3"),
        ]);
        let config = DexConfig::new().with_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/dex"));
        assert_eq!(config.api_base, "http://localhost:8000/api/v2/");
        assert_eq!(config.policy.failure_threshold, 3);
    }

    #[test]
    fn test_bad_overrides_are_ignored() {
        let env = HashMap::from([("POKEDEX_CACHE_DIR", "  "), ("POKEDEX_FAILURE_THRESHOLD", "0")]);
        let config = DexConfig::new().with_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
        assert_eq!(config.policy.failure_threshold, 10);
    }

    #[test]
    fn test_builder() {
        let config = DexConfig::new()
            .with_cache_dir("cache")
            .with_counts(Counts {
                types: 1,
                moves: 2,
                abilities: 3,
                species: 4,
            })
            .with_workers(4)
            .with_skipped(Endpoint::Move, []);

        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.counts.abilities, 3);
        assert_eq!(config.policy.workers, 4);
        assert!(!config.policy.is_skipped(Endpoint::Move, 785));
    }
}
