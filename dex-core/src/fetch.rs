//! Bulk acquisition of the numbered API collections.
//!
//! A fetch call splits `1..=count` into contiguous ranges, one per worker,
//! and walks them concurrently. All workers of one call share a single lock
//! guarding the result list, the consecutive-failure counter and a halt flag:
//!
//! - success appends the record and resets the counter
//! - a failing status bumps the counter and retries the same ID, unless the
//!   ID is on the skip list
//! - the counter reaching the threshold, a transport failure or an
//!   undecodable record halts the whole call with an error; partial results
//!   are never returned
//!
//! Results come back in completion order, not ID order.

use futures::future::join_all;
use log::{debug, warn};
use pokeapi::{Endpoint, PokemonResource, SpeciesResource, Transport};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Consecutive failing responses that abort a fetch call.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 10;

/// Concurrent workers per fetch call.
pub const DEFAULT_WORKERS: usize = 2;

/// Move ids whose upstream records are empty.
pub const SKIPPED_MOVES: [u32; 1] = [785];

/// Errors that abort a fetch call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to connect with the server ({threshold} requests failed in a row)")]
    ResourceExhausted { threshold: u32 },

    #[error("Cannot reach the API: {0}")]
    Connectivity(String),

    #[error("Malformed record at {url}: {message}")]
    Decode { url: String, message: String },
}

/// Human label for log lines.
pub fn endpoint_label(endpoint: Endpoint) -> &'static str {
    match endpoint {
        Endpoint::Type => "type",
        Endpoint::Move => "move",
        Endpoint::Ability => "ability",
        Endpoint::PokemonSpecies => "creature",
    }
}

/// Retry and concurrency settings for a fetcher.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Consecutive failures (shared across workers) that abort the call.
    pub failure_threshold: u32,

    /// Number of contiguous ranges walked concurrently.
    pub workers: usize,

    /// IDs that are given up on after one failure instead of retried.
    pub skipped: HashMap<Endpoint, HashSet<u32>>,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            workers: DEFAULT_WORKERS,
            skipped: HashMap::from([(Endpoint::Move, HashSet::from(SKIPPED_MOVES))]),
        }
    }
}

impl FetchPolicy {
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Replace the skip list of `endpoint`.
    pub fn with_skipped(mut self, endpoint: Endpoint, ids: impl IntoIterator<Item = u32>) -> Self {
        self.skipped.insert(endpoint, ids.into_iter().collect());
        self
    }

    pub fn is_skipped(&self, endpoint: Endpoint, id: u32) -> bool {
        self.skipped
            .get(&endpoint)
            .map(|ids| ids.contains(&id))
            .unwrap_or(false)
    }
}

/// One creature form: its species' dex number and data plus the form record.
#[derive(Debug, Clone)]
pub struct CreatureBundle {
    pub dex_number: u32,
    pub species: Arc<SpeciesResource>,
    pub variety: PokemonResource,
}

/// Split `1..=count` into at most `workers` contiguous, non-empty ranges
/// whose lengths differ by at most one.
pub fn partition(count: u32, workers: usize) -> Vec<RangeInclusive<u32>> {
    if count == 0 {
        return Vec::new();
    }

    let workers = u32::try_from(workers.max(1)).unwrap_or(u32::MAX).min(count);
    let base = count / workers;
    let extra = count % workers;

    let mut ranges = Vec::with_capacity(workers as usize);
    let mut start = 1;
    for worker in 0..workers {
        let len = base + u32::from(worker < extra);
        let end = start + (len - 1);
        ranges.push(start..=end);
        // The last range may end at u32::MAX.
        match end.checked_add(1) {
            Some(next) => start = next,
            None => break,
        }
    }
    ranges
}

/// State shared by all workers of one fetch call.
struct Shared<T> {
    records: Vec<T>,
    consecutive_failures: u32,
    halted: bool,
}

impl<T> Shared<T> {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            consecutive_failures: 0,
            halted: false,
        }
    }
}

/// Outcome of requesting one URL until it settles.
enum Attempt {
    Fetched(serde_json::Value),
    Skipped,
    Halted,
}

/// Fetches whole collections through a [`Transport`].
pub struct ResourceFetcher<S> {
    source: Arc<S>,
    base_url: String,
    policy: FetchPolicy,
}

impl<S: Transport> ResourceFetcher<S> {
    pub fn new(source: Arc<S>, base_url: impl Into<String>, policy: FetchPolicy) -> Self {
        Self {
            source,
            base_url: base_url.into(),
            policy,
        }
    }

    /// Fetch IDs `1..=count` of `endpoint`, decoding each into `T`.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        count: u32,
    ) -> Result<Vec<T>, FetchError> {
        let shared = Mutex::new(Shared::new());
        let workers = partition(count, self.policy.workers)
            .into_iter()
            .map(|ids| self.walk_range(endpoint, ids, count, &shared));

        settle(join_all(workers).await)?;
        Ok(shared.into_inner().records)
    }

    /// Fetch species `1..=count` and every variety each one lists.
    ///
    /// Variety requests share the call's failure counter and halt rules.
    pub async fn fetch_creatures(&self, count: u32) -> Result<Vec<CreatureBundle>, FetchError> {
        let shared = Mutex::new(Shared::new());
        let workers = partition(count, self.policy.workers)
            .into_iter()
            .map(|ids| self.walk_species(ids, count, &shared));

        settle(join_all(workers).await)?;
        Ok(shared.into_inner().records)
    }

    async fn walk_range<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        ids: RangeInclusive<u32>,
        count: u32,
        shared: &Mutex<Shared<T>>,
    ) -> Result<(), FetchError> {
        for id in ids {
            let url = endpoint.url(&self.base_url, id);
            let skippable = self.policy.is_skipped(endpoint, id);

            let value = match self.attempt(&url, skippable, shared).await? {
                Attempt::Fetched(value) => value,
                Attempt::Skipped => continue,
                Attempt::Halted => return Ok(()),
            };
            let record = decode(&url, value, shared).await?;

            let mut state = shared.lock().await;
            state.consecutive_failures = 0;
            state.records.push(record);
            debug!(
                "Fetched {} {id} ({}%)",
                endpoint_label(endpoint),
                progress(id, count)
            );
        }
        Ok(())
    }

    async fn walk_species(
        &self,
        ids: RangeInclusive<u32>,
        count: u32,
        shared: &Mutex<Shared<CreatureBundle>>,
    ) -> Result<(), FetchError> {
        let endpoint = Endpoint::PokemonSpecies;

        for id in ids {
            let url = endpoint.url(&self.base_url, id);
            let skippable = self.policy.is_skipped(endpoint, id);

            let value = match self.attempt(&url, skippable, shared).await? {
                Attempt::Fetched(value) => value,
                Attempt::Skipped => continue,
                Attempt::Halted => return Ok(()),
            };
            let species: SpeciesResource = decode(&url, value, shared).await?;
            shared.lock().await.consecutive_failures = 0;

            let species = Arc::new(species);
            for (form, variety) in species.varieties.iter().enumerate() {
                let variety_url = variety.pokemon.url.as_str();
                let value = match self.attempt(variety_url, false, shared).await? {
                    Attempt::Fetched(value) => value,
                    Attempt::Skipped => continue,
                    Attempt::Halted => return Ok(()),
                };
                let pokemon: PokemonResource = decode(variety_url, value, shared).await?;

                let mut state = shared.lock().await;
                state.consecutive_failures = 0;
                state.records.push(CreatureBundle {
                    dex_number: id,
                    species: Arc::clone(&species),
                    variety: pokemon,
                });
                debug!("Fetched creature {id}-{form} ({}%)", progress(id, count));
            }
        }
        Ok(())
    }

    /// Request `url` until it succeeds, is given up on, or the call halts.
    async fn attempt<T>(
        &self,
        url: &str,
        skippable: bool,
        shared: &Mutex<Shared<T>>,
    ) -> Result<Attempt, FetchError> {
        loop {
            if shared.lock().await.halted {
                return Ok(Attempt::Halted);
            }

            let err = match self.source.get_json(url).await {
                Ok(value) => return Ok(Attempt::Fetched(value)),
                Err(err) => err,
            };

            let mut state = shared.lock().await;
            match err {
                pokeapi::Error::Api { status, .. } => {
                    state.consecutive_failures += 1;
                    if state.consecutive_failures >= self.policy.failure_threshold {
                        state.halted = true;
                        warn!("Giving up after {} failed requests in a row", state.consecutive_failures);
                        return Err(FetchError::ResourceExhausted {
                            threshold: self.policy.failure_threshold,
                        });
                    }

                    if skippable {
                        warn!("Failed {url} (status {status}), skipping");
                        return Ok(Attempt::Skipped);
                    }
                    warn!("Failed {url} (status {status}), retrying");
                }
                pokeapi::Error::Network(message) => {
                    state.halted = true;
                    return Err(FetchError::Connectivity(message));
                }
                other => {
                    state.halted = true;
                    return Err(FetchError::Decode {
                        url: url.to_string(),
                        message: other.to_string(),
                    });
                }
            }
        }
    }
}

/// Decode a fetched document, halting the call when it does not fit `R`.
async fn decode<R: DeserializeOwned, T>(
    url: &str,
    value: serde_json::Value,
    shared: &Mutex<Shared<T>>,
) -> Result<R, FetchError> {
    match serde_json::from_value(value) {
        Ok(record) => Ok(record),
        Err(err) => {
            shared.lock().await.halted = true;
            Err(FetchError::Decode {
                url: url.to_string(),
                message: err.to_string(),
            })
        }
    }
}

/// First worker error in worker order, if any.
fn settle(outcomes: Vec<Result<(), FetchError>>) -> Result<(), FetchError> {
    outcomes.into_iter().collect()
}

fn progress(id: u32, count: u32) -> u64 {
    u64::from(id) * 100 / u64::from(count.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_halves() {
        assert_eq!(partition(898, 2), vec![1..=449, 450..=898]);
        assert_eq!(partition(267, 2), vec![1..=134, 135..=267]);
    }

    #[test]
    fn test_partition_edge_cases() {
        assert!(partition(0, 2).is_empty());
        assert_eq!(partition(1, 2), vec![1..=1]);
        assert_eq!(partition(5, 0), vec![1..=5]);
        assert_eq!(partition(7, 3), vec![1..=3, 4..=5, 6..=7]);
    }

    #[test]
    fn test_partition_up_to_largest_id() {
        assert_eq!(partition(u32::MAX, 2), vec![1..=2_147_483_648, 2_147_483_649..=u32::MAX]);
        assert_eq!(partition(u32::MAX, 1), vec![1..=u32::MAX]);
        assert_eq!(partition(u32::MAX - 1, 2), vec![1..=2_147_483_647, 2_147_483_648..=u32::MAX - 1]);
    }

    #[test]
    fn test_partition_covers_every_id_once() {
        for count in 0..40 {
            for workers in 1..6 {
                let ids: Vec<u32> = partition(count, workers).into_iter().flatten().collect();
                assert_eq!(ids, (1..=count).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = FetchPolicy::default();
        assert_eq!(policy.failure_threshold, 10);
        assert_eq!(policy.workers, 2);
        assert!(policy.is_skipped(Endpoint::Move, 785));
        assert!(!policy.is_skipped(Endpoint::Move, 784));
        assert!(!policy.is_skipped(Endpoint::Ability, 785));
    }

    #[test]
    fn test_policy_builders_clamp() {
        let policy = FetchPolicy::default()
            .with_failure_threshold(0)
            .with_workers(0)
            .with_skipped(Endpoint::Ability, [3]);
        assert_eq!(policy.failure_threshold, 1);
        assert_eq!(policy.workers, 1);
        assert!(policy.is_skipped(Endpoint::Ability, 3));
    }

    #[test]
    fn test_settle_reports_first_error() {
        let outcome = settle(vec![
            Ok(()),
            Err(FetchError::Connectivity("down".into())),
            Err(FetchError::ResourceExhausted { threshold: 10 }),
        ]);
        assert!(matches!(outcome, Err(FetchError::Connectivity(_))));
        assert!(settle(vec![Ok(()), Ok(())]).is_ok());
    }
}
