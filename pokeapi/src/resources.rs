//! Resource shapes returned by the API.
//!
//! Only the fields the dex reads are declared; everything else in the
//! payload is ignored. Lists that upstream sometimes omits default to empty.

use serde::{Deserialize, Serialize};

/// A `{ name, url }` pointer to another resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl NamedResource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A localized flavor text entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlavorText {
    pub flavor_text: String,
    pub language: NamedResource,
}

/// A localized effect description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectEntry {
    pub effect: String,
    pub language: NamedResource,
}

/// Newest entry of `entries` written in `language`.
///
/// The API lists entries oldest game first.
pub fn latest_flavor_text<'a>(entries: &'a [FlavorText], language: &str) -> Option<&'a str> {
    entries
        .iter()
        .rev()
        .find(|entry| entry.language.name == language)
        .map(|entry| entry.flavor_text.as_str())
}

// ============================================================================
// type/{id}
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeResource {
    pub id: u32,
    pub name: String,
    pub damage_relations: DamageRelations,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DamageRelations {
    #[serde(default)]
    pub double_damage_from: Vec<NamedResource>,
    #[serde(default)]
    pub double_damage_to: Vec<NamedResource>,
    #[serde(default)]
    pub half_damage_from: Vec<NamedResource>,
    #[serde(default)]
    pub half_damage_to: Vec<NamedResource>,
    #[serde(default)]
    pub no_damage_from: Vec<NamedResource>,
    #[serde(default)]
    pub no_damage_to: Vec<NamedResource>,
}

// ============================================================================
// move/{id}
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveResource {
    pub id: u32,
    pub name: String,
    pub accuracy: Option<u32>,
    pub power: Option<u32>,
    pub pp: Option<u32>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub effect_chance: Option<u32>,
    /// Absent for max moves.
    #[serde(default)]
    pub damage_class: Option<NamedResource>,
    #[serde(rename = "type")]
    pub move_type: NamedResource,
    #[serde(default)]
    pub flavor_text_entries: Vec<FlavorText>,
}

// ============================================================================
// ability/{id}
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityResource {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub effect_entries: Vec<EffectEntry>,
    #[serde(default)]
    pub flavor_text_entries: Vec<FlavorText>,
}

// ============================================================================
// pokemon-species/{id}
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesResource {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub is_legendary: bool,
    #[serde(default)]
    pub is_mythical: bool,
    pub generation: NamedResource,
    #[serde(default)]
    pub flavor_text_entries: Vec<FlavorText>,
    #[serde(default)]
    pub genera: Vec<Genus>,
    #[serde(default)]
    pub varieties: Vec<Variety>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genus {
    pub genus: String,
    pub language: NamedResource,
}

/// An alternate form of a species; `pokemon.url` points at its full record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variety {
    pub pokemon: NamedResource,
}

// ============================================================================
// pokemon/{id} (reached through species varieties)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PokemonResource {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub sprites: serde_json::Value,
    #[serde(default)]
    pub stats: Vec<StatEntry>,
    #[serde(default)]
    pub abilities: Vec<AbilitySlot>,
    #[serde(default)]
    pub moves: Vec<MoveSlot>,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatEntry {
    pub base_stat: i32,
    pub stat: NamedResource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilitySlot {
    pub ability: NamedResource,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub slot: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveSlot {
    #[serde(rename = "move")]
    pub move_ref: NamedResource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSlot {
    #[serde(default)]
    pub slot: u8,
    #[serde(rename = "type")]
    pub type_ref: NamedResource,
}
