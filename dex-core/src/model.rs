//! Assembled dex entities and the registries that own them.
//!
//! Each collection owns its entities exclusively. Cross-entity references
//! are typed handles into the owning [`Registry`], resolved once at assembly
//! time, so nothing is looked up by string after construction.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Defines a newtype handle indexing into a [`Registry`].
macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl Handle for $name {
            #[inline]
            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            #[inline]
            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

/// Position of an entity inside its registry.
pub trait Handle: Copy + fmt::Display {
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

define_handle!(
    /// Handle to a [`TypeRecord`]
    TypeId
);

define_handle!(
    /// Handle to a [`MoveRecord`]
    MoveId
);

define_handle!(
    /// Handle to an [`AbilityRecord`]
    AbilityId
);

define_handle!(
    /// Handle to a [`CreatureRecord`]
    CreatureId
);

// ============================================================================
// Reference errors
// ============================================================================

/// The kinds of entity one record can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Type,
    Move,
    Ability,
    Creature,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReferenceKind::Type => "type",
            ReferenceKind::Move => "move",
            ReferenceKind::Ability => "ability",
            ReferenceKind::Creature => "creature",
        };
        f.write_str(label)
    }
}

/// A record referenced a name (or handle) its dependency collection lacks.
///
/// This signals an inconsistency between the remote collections, not a
/// local bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Given {kind} '{name}' doesn't exist. The local data is incomplete or the API has inconsistent data.")]
pub struct MissingReference {
    pub kind: ReferenceKind,
    pub name: String,
}

impl MissingReference {
    pub fn new(kind: ReferenceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// An entity stored in a [`Registry`].
pub trait Record {
    type Id: Handle;

    const KIND: ReferenceKind;

    /// Canonical display name, the registry's lookup key.
    fn name(&self) -> &str;
}

/// An ordered, owning collection with a name index built once.
///
/// When names collide the first entry wins lookups, the rest stay reachable
/// by handle and iteration.
#[derive(Debug, Clone)]
pub struct Registry<T: Record> {
    entries: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Record> Registry<T> {
    /// Take ownership of `entries` and index them by name.
    pub fn from_entries(entries: Vec<T>) -> Self {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            index.entry(entry.name().to_string()).or_insert(position);
        }
        Self { entries, index }
    }

    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.entries.get(id.index())
    }

    /// Handle of the entry named exactly `name`.
    pub fn resolve(&self, name: &str) -> Result<T::Id, MissingReference> {
        self.index
            .get(name)
            .map(|&position| T::Id::from_index(position))
            .ok_or_else(|| MissingReference::new(T::KIND, name))
    }

    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&position| &self.entries[position])
    }

    /// Whether `id` points inside this registry.
    pub fn contains(&self, id: T::Id) -> bool {
        id.index() < self.entries.len()
    }

    /// Fail with a [`MissingReference`] naming the handle if it dangles.
    pub fn check(&self, id: T::Id) -> Result<(), MissingReference> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(MissingReference::new(T::KIND, id.to_string()))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(Record::name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }
}

impl<T: Record> Default for Registry<T> {
    fn default() -> Self {
        Self::from_entries(Vec::new())
    }
}

impl<T: Record + PartialEq> PartialEq for Registry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

// Serialized as the bare entry list; the index is rebuilt on load.
impl<T: Record + Serialize> Serialize for Registry<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de, T: Record + Deserialize<'de>> Deserialize<'de> for Registry<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::from_entries)
    }
}

pub type Types = Registry<TypeRecord>;
pub type Moves = Registry<MoveRecord>;
pub type Abilities = Registry<AbilityRecord>;
pub type Creatures = Registry<CreatureRecord>;

// ============================================================================
// Types
// ============================================================================

/// An elemental type and its damage relations to other types, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRecord {
    pub name: String,
    pub double_damage_from: Vec<String>,
    pub half_damage_from: Vec<String>,
    pub no_damage_from: Vec<String>,
    pub double_damage_to: Vec<String>,
    pub half_damage_to: Vec<String>,
    pub no_damage_to: Vec<String>,
}

impl TypeRecord {
    /// Every type name this record points at, across all six relations.
    pub fn related_names(&self) -> impl Iterator<Item = &str> {
        [
            &self.double_damage_from,
            &self.half_damage_from,
            &self.no_damage_from,
            &self.double_damage_to,
            &self.half_damage_to,
            &self.no_damage_to,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
    }
}

impl Record for TypeRecord {
    type Id = TypeId;
    const KIND: ReferenceKind = ReferenceKind::Type;

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Moves
// ============================================================================

/// How a move deals damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageClass {
    Physical,
    Special,
    Status,
    /// Z-moves (one power point) and max moves (no class upstream).
    Ultimate,
}

impl DamageClass {
    /// Parse an API damage-class slug.
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "physical" => Some(DamageClass::Physical),
            "special" => Some(DamageClass::Special),
            "status" => Some(DamageClass::Status),
            _ => None,
        }
    }
}

impl fmt::Display for DamageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Upstream resource id.
    pub id: u32,
    pub name: String,
    /// `None` for moves that never miss.
    pub accuracy: Option<u32>,
    /// `None` when power depends on circumstances.
    pub power: Option<u32>,
    pub pp: Option<u32>,
    pub class: DamageClass,
    pub move_type: TypeId,
    pub description: String,
    pub effect_chance: u32,
    pub priority: i32,
}

impl Record for MoveRecord {
    type Id = MoveId;
    const KIND: ReferenceKind = ReferenceKind::Move;

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Abilities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityRecord {
    pub name: String,
    pub description: String,
}

impl Record for AbilityRecord {
    type Id = AbilityId;
    const KIND: ReferenceKind = ReferenceKind::Ability;

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Creatures
// ============================================================================

/// A base stat, e.g. `("speed", 90)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub name: String,
    pub value: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySlot {
    pub ability: AbilityId,
    pub hidden: bool,
}

/// Sprite URL bundle, passed through from the API untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sprites(pub serde_json::Value);

impl Sprites {
    pub fn front_default(&self) -> Option<&str> {
        self.0.get("front_default").and_then(|v| v.as_str())
    }

    pub fn front_shiny(&self) -> Option<&str> {
        self.0.get("front_shiny").and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureRecord {
    pub name: String,
    /// Shared by every form of a species.
    pub dex_number: u32,
    /// Unique upstream id of this form.
    pub order: u32,
    /// Roman numeral, e.g. `VII`.
    pub generation: String,
    pub legendary: bool,
    pub mythical: bool,
    pub description: String,
    pub genus: String,
    pub height: u32,
    pub weight: u32,
    pub sprites: Sprites,
    pub stats: Vec<Stat>,
    pub abilities: Vec<AbilitySlot>,
    pub moves: Vec<MoveId>,
    /// Primary type first, optional secondary after.
    pub types: Vec<TypeId>,
}

impl CreatureRecord {
    pub fn primary_type(&self) -> Option<TypeId> {
        self.types.first().copied()
    }

    pub fn secondary_type(&self) -> Option<TypeId> {
        self.types.get(1).copied()
    }

    /// Sum of all base stats.
    pub fn stat_total(&self) -> i32 {
        self.stats.iter().map(|s| s.value).sum()
    }
}

impl Record for CreatureRecord {
    type Id = CreatureId;
    const KIND: ReferenceKind = ReferenceKind::Creature;

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ability(name: &str) -> AbilityRecord {
        AbilityRecord {
            name: name.to_string(),
            description: format!("{name} text"),
        }
    }

    #[test]
    fn test_registry_resolves_by_exact_name() {
        let abilities = Abilities::from_entries(vec![ability("Overgrow"), ability("Blaze")]);

        let id = abilities.resolve("Blaze").unwrap();
        assert_eq!(abilities.get(id).unwrap().name, "Blaze");
        assert!(abilities.lookup("blaze").is_none());

        let err = abilities.resolve("Torrent").unwrap_err();
        assert_eq!(err.kind, ReferenceKind::Ability);
        assert_eq!(err.name, "Torrent");
    }

    #[test]
    fn test_registry_first_entry_wins() {
        let mut second = ability("Blaze");
        second.description = "second".to_string();
        let abilities = Abilities::from_entries(vec![ability("Blaze"), second]);

        assert_eq!(abilities.len(), 2);
        assert_eq!(abilities.lookup("Blaze").unwrap().description, "Blaze text");
    }

    #[test]
    fn test_registry_check_dangling_handle() {
        let abilities = Abilities::from_entries(vec![ability("Blaze")]);
        assert!(abilities.check(AbilityId::from_index(0)).is_ok());

        let err = abilities.check(AbilityId::from_index(3)).unwrap_err();
        assert_eq!(err.name, "#3");
    }

    #[test]
    fn test_registry_index_survives_serde() {
        let abilities = Abilities::from_entries(vec![ability("Overgrow"), ability("Blaze")]);
        let json = serde_json::to_string(&abilities).unwrap();
        assert!(json.starts_with('['));

        let loaded: Abilities = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, abilities);
        assert_eq!(loaded.resolve("Blaze").unwrap(), AbilityId::from_index(1));
    }

    #[test]
    fn test_missing_reference_message() {
        let err = MissingReference::new(ReferenceKind::Type, "Shadow");
        assert!(err.to_string().starts_with("Given type 'Shadow' doesn't exist"));
    }

    #[test]
    fn test_sprites_accessors() {
        let sprites = Sprites(serde_json::json!({ "front_default": "a.png", "front_shiny": null }));
        assert_eq!(sprites.front_default(), Some("a.png"));
        assert_eq!(sprites.front_shiny(), None);
    }
}
