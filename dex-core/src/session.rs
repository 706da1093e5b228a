//! The loaded dex and its startup sequence.

use crate::assemble::{
    build_abilities, build_creatures, build_moves, build_types, check_creature_links,
    check_move_links,
};
use crate::config::DexConfig;
use crate::effectiveness::{classify, Direction, Effectiveness};
use crate::fetch::{FetchError, ResourceFetcher};
use crate::model::{
    AbilityRecord, AbilitySlot, Abilities, CreatureRecord, Creatures, MissingReference, MoveId,
    MoveRecord, Moves, TypeRecord, Types,
};
use crate::names::{roman_value, split_then_proper_word};
use crate::persist::{EntityKind, PersistError, SnapshotStore};
use crate::prefs::Preferences;
use crate::search::CreatureFilter;
use crate::team::{Team, TeamReport};
use log::info;
use pokeapi::{
    AbilityResource, Endpoint, MoveResource, PokeApi, Transport, TypeResource,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    MissingReference(#[from] MissingReference),

    #[error("Local data error: {0}")]
    Persist(#[from] PersistError),

    #[error("Could not create the API client: {0}")]
    Client(#[from] pokeapi::Error),
}

impl StartupError {
    /// Whether the API could not be used at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            StartupError::Fetch(FetchError::Connectivity(_))
                | StartupError::Fetch(FetchError::ResourceExhausted { .. })
        )
    }

    /// One line suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            StartupError::Fetch(FetchError::Connectivity(_)) => {
                "Cannot reach the API. Check your connection and try again.".to_string()
            }
            StartupError::Fetch(FetchError::ResourceExhausted { .. }) => {
                "Failed to connect with the server. Check your connection and try again.".to_string()
            }
            StartupError::Fetch(err @ FetchError::Decode { .. }) => {
                format!("The API returned unexpected data. {err}")
            }
            StartupError::MissingReference(err) => err.to_string(),
            StartupError::Persist(err) => format!("Cannot use the local data directory. {err}"),
            StartupError::Client(err) => err.to_string(),
        }
    }
}

/// Every assembled collection, owned in one place.
///
/// Built once at startup and then only read.
#[derive(Debug, Clone, Default)]
pub struct Pokedex {
    types: Types,
    moves: Moves,
    abilities: Abilities,
    creatures: Creatures,
}

impl Pokedex {
    /// Assemble from already built registries.
    pub fn from_parts(types: Types, moves: Moves, abilities: Abilities, creatures: Creatures) -> Self {
        Self {
            types,
            moves,
            abilities,
            creatures,
        }
    }

    /// Load the dex from the cache, fetching from the API what is missing.
    pub async fn open(config: &DexConfig) -> Result<Self, StartupError> {
        let api = PokeApi::new()?.with_base_url(config.api_base.clone());
        Self::open_with(config, Arc::new(api)).await
    }

    /// Like [`open`](Self::open) over any transport.
    ///
    /// Collections load in dependency order. A snapshot is used only if no
    /// collection it depends on was rebuilt in this run; otherwise it is
    /// fetched, assembled and saved again.
    pub async fn open_with<S: Transport>(
        config: &DexConfig,
        source: Arc<S>,
    ) -> Result<Self, StartupError> {
        let store = SnapshotStore::new(&config.cache_dir);
        let fetcher = ResourceFetcher::new(source, config.api_base.clone(), config.policy.clone());
        let counts = config.counts;

        let started = Instant::now();
        let (types, types_rebuilt) = match cached::<Types>(&store, EntityKind::Types, false).await? {
            Some(types) => (types, false),
            None => {
                let raw: Vec<TypeResource> = fetcher.fetch(Endpoint::Type, counts.types).await?;
                let types = build_types(raw)?;
                save_rebuilt(&store, EntityKind::Types, &types).await?;
                (types, true)
            }
        };
        report(EntityKind::Types, types_rebuilt, started);

        let started = Instant::now();
        let (moves, moves_rebuilt) = match cached::<Moves>(&store, EntityKind::Moves, types_rebuilt).await? {
            Some(moves) => {
                check_move_links(&moves, &types)?;
                (moves, false)
            }
            None => {
                let raw: Vec<MoveResource> = fetcher.fetch(Endpoint::Move, counts.moves).await?;
                let moves = build_moves(raw, &types)?;
                save_rebuilt(&store, EntityKind::Moves, &moves).await?;
                (moves, true)
            }
        };
        report(EntityKind::Moves, moves_rebuilt, started);

        let started = Instant::now();
        let (abilities, abilities_rebuilt) =
            match cached::<Abilities>(&store, EntityKind::Abilities, false).await? {
                Some(abilities) => (abilities, false),
                None => {
                    let raw: Vec<AbilityResource> =
                        fetcher.fetch(Endpoint::Ability, counts.abilities).await?;
                    let abilities = build_abilities(raw);
                    save_rebuilt(&store, EntityKind::Abilities, &abilities).await?;
                    (abilities, true)
                }
            };
        report(EntityKind::Abilities, abilities_rebuilt, started);

        let started = Instant::now();
        let stale = types_rebuilt || moves_rebuilt || abilities_rebuilt;
        let (creatures, creatures_rebuilt) =
            match cached::<Creatures>(&store, EntityKind::Creatures, stale).await? {
                Some(creatures) => {
                    check_creature_links(&creatures, &types, &moves, &abilities)?;
                    (creatures, false)
                }
                None => {
                    let bundles = fetcher.fetch_creatures(counts.species).await?;
                    let creatures = build_creatures(bundles, &types, &moves, &abilities)?;
                    save_rebuilt(&store, EntityKind::Creatures, &creatures).await?;
                    (creatures, true)
                }
            };
        report(EntityKind::Creatures, creatures_rebuilt, started);

        Ok(Self::from_parts(types, moves, abilities, creatures))
    }

    /// Drop every snapshot and start cold from the API.
    pub async fn refresh(config: &DexConfig) -> Result<Self, StartupError> {
        let api = PokeApi::new()?.with_base_url(config.api_base.clone());
        Self::refresh_with(config, Arc::new(api)).await
    }

    pub async fn refresh_with<S: Transport>(
        config: &DexConfig,
        source: Arc<S>,
    ) -> Result<Self, StartupError> {
        SnapshotStore::new(&config.cache_dir).clear().await?;
        info!("Cleared snapshots in {}", config.cache_dir.display());
        Self::open_with(config, source).await
    }

    pub fn types(&self) -> &Types {
        &self.types
    }

    pub fn moves(&self) -> &Moves {
        &self.moves
    }

    pub fn abilities(&self) -> &Abilities {
        &self.abilities
    }

    pub fn creatures(&self) -> &Creatures {
        &self.creatures
    }

    /// Type names, alphabetically.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.names().collect();
        names.sort_unstable();
        names
    }

    /// Generation tags present among creatures, oldest first.
    pub fn generations(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.creatures.iter().map(|c| c.generation.as_str()).collect();
        tags.sort_by_key(|tag| (roman_value(tag).unwrap_or(u32::MAX), *tag));
        tags.dedup();
        tags
    }

    /// Find a creature by display name or API slug.
    pub fn creature(&self, name: &str) -> Option<&CreatureRecord> {
        let name = name.trim();
        self.creatures.lookup(name).or_else(|| {
            let slug = name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-");
            self.creatures.lookup(&split_then_proper_word(&slug))
        })
    }

    pub fn type_of(&self, record: &MoveRecord) -> Option<&TypeRecord> {
        self.types.get(record.move_type)
    }

    pub fn move_of(&self, id: MoveId) -> Option<&MoveRecord> {
        self.moves.get(id)
    }

    pub fn ability_of(&self, slot: &AbilitySlot) -> Option<&AbilityRecord> {
        self.abilities.get(slot.ability)
    }

    /// A creature's types, primary first.
    pub fn creature_types(&self, creature: &CreatureRecord) -> Vec<&TypeRecord> {
        creature.types.iter().filter_map(|id| self.types.get(*id)).collect()
    }

    /// A creature's moves, sorted by name.
    pub fn creature_moves(&self, creature: &CreatureRecord) -> Vec<&MoveRecord> {
        let mut moves: Vec<&MoveRecord> =
            creature.moves.iter().filter_map(|id| self.move_of(*id)).collect();
        moves.sort_by(|a, b| a.name.cmp(&b.name));
        moves
    }

    /// A creature's abilities with their hidden flags.
    pub fn creature_abilities(&self, creature: &CreatureRecord) -> Vec<(&AbilityRecord, bool)> {
        creature
            .abilities
            .iter()
            .filter_map(|slot| self.ability_of(slot).map(|a| (a, slot.hidden)))
            .collect()
    }

    pub fn filter_creatures(&self, filter: &CreatureFilter) -> Vec<&CreatureRecord> {
        filter.apply(&self.creatures, &self.types)
    }

    pub fn classify<I, S>(&self, names: I, direction: Direction) -> Effectiveness
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        classify(&self.types, names, direction)
    }

    /// Defense and offense of `team`, `None` if it names no type.
    pub fn team_report(&self, team: &Team) -> Option<TeamReport> {
        TeamReport::compute(&self.types, team)
    }

    /// Drop saved filters this dex cannot satisfy.
    pub fn sanitize(&self, prefs: Preferences) -> Preferences {
        prefs.sanitize(&self.type_names(), self.generations())
    }
}

/// The snapshot of `kind`, unless it is missing or `stale`.
async fn cached<T: DeserializeOwned>(
    store: &SnapshotStore,
    kind: EntityKind,
    stale: bool,
) -> Result<Option<T>, PersistError> {
    if stale {
        info!("Rebuilding {kind}: a collection it depends on changed");
        return Ok(None);
    }
    if !store.has_snapshot(kind).await? {
        info!("No {kind} snapshot, fetching from the API");
        return Ok(None);
    }
    store.load(kind).await.map(Some)
}

/// Save a rebuilt collection after removing the snapshots of its dependents.
///
/// No snapshot on disk may hold handles into an older version of a
/// collection, even when the run fails before the dependents are rebuilt.
async fn save_rebuilt<T: Serialize>(
    store: &SnapshotStore,
    kind: EntityKind,
    entries: &T,
) -> Result<(), PersistError> {
    for dependent in kind.dependents() {
        store.remove(*dependent).await?;
    }
    store.save(kind, entries).await
}

fn report(kind: EntityKind, rebuilt: bool, started: Instant) {
    let action = if rebuilt { "fetched" } else { "loaded" };
    info!("{kind} {action} in {:.2?}", started.elapsed());
}
