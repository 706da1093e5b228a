//! Creature dex engine.
//!
//! This crate provides:
//! - Bulk fetching of the API collections with a shared retry budget
//! - Assembly of raw resources into linked, name-indexed registries
//! - A local snapshot cache so only the first start hits the network
//! - The type effectiveness calculator, creature search and team files
//!
//! # Quick Start
//!
//! ```ignore
//! use dex_core::{DexConfig, Direction, Pokedex};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dex = Pokedex::open(&DexConfig::from_env()).await?;
//!
//!     let weak = dex.classify(["Grass", "Poison"], Direction::Defense);
//!     println!("Weak to: {:?}", weak.bad);
//!     Ok(())
//! }
//! ```

pub mod assemble;
pub mod config;
pub mod effectiveness;
pub mod fetch;
pub mod model;
pub mod names;
pub mod persist;
pub mod prefs;
pub mod search;
pub mod session;
pub mod team;
pub mod testing;

// Primary public API
pub use config::{Counts, DexConfig};
pub use effectiveness::{classify, Direction, Effectiveness};
pub use fetch::{CreatureBundle, FetchError, FetchPolicy, ResourceFetcher};
pub use model::{
    AbilityId, AbilityRecord, Abilities, CreatureId, CreatureRecord, Creatures, DamageClass,
    MissingReference, MoveId, MoveRecord, Moves, ReferenceKind, Registry, TypeId, TypeRecord,
    Types,
};
pub use persist::{EntityKind, PersistError, SnapshotStore};
pub use prefs::{Mode, Preferences};
pub use search::{CreatureFilter, SortOrder};
pub use session::{Pokedex, StartupError};
pub use team::{Team, TeamReport, TeamSlot};
pub use testing::{MockFailure, MockTransport};
