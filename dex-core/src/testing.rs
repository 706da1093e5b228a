//! Testing utilities for the dex.
//!
//! This module provides tools for integration testing:
//! - `MockTransport` serving canned JSON documents with scripted failures
//! - The full 18-type damage chart as API documents
//! - Builders for move, ability, species and form documents
//! - `sample_api`, a tiny consistent dataset for startup tests

use crate::assemble::build_types;
use crate::config::Counts;
use crate::model::{MissingReference, Types};
use async_trait::async_trait;
use pokeapi::{DamageRelations, Endpoint, NamedResource, Transport, TypeResource};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// API root used by every fixture URL.
pub const MOCK_API: &str = "mock://api/";

/// URL of resource `id` of `endpoint` under [`MOCK_API`].
pub fn resource_url(endpoint: Endpoint, id: u32) -> String {
    endpoint.url(MOCK_API, id)
}

/// URL of a form record, as listed in a species' varieties.
pub fn pokemon_url(id: u32) -> String {
    format!("{MOCK_API}pokemon/{id}/")
}

/// A scripted failure returned instead of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Non-success HTTP status.
    Status(u16),
    /// No answer at all.
    Offline,
}

impl MockFailure {
    fn into_error(self, url: &str) -> pokeapi::Error {
        match self {
            MockFailure::Status(status) => pokeapi::Error::Api {
                status,
                url: url.to_string(),
            },
            MockFailure::Offline => pokeapi::Error::Network(format!("{url}: connection refused")),
        }
    }
}

/// A transport serving canned documents.
///
/// Unknown URLs answer 404. Scripted failures are consumed before the
/// document is served; permanent failures never clear.
#[derive(Default)]
pub struct MockTransport {
    documents: HashMap<String, Value>,
    permanent: HashMap<String, MockFailure>,
    scripted: Mutex<HashMap<String, VecDeque<MockFailure>>>,
    calls: Mutex<HashMap<String, usize>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `document` at `url`.
    pub fn with_document(mut self, url: impl Into<String>, document: Value) -> Self {
        self.documents.insert(url.into(), document);
        self
    }

    /// Serve `document` as resource `id` of `endpoint`.
    pub fn with_resource(self, endpoint: Endpoint, id: u32, document: Value) -> Self {
        self.with_document(resource_url(endpoint, id), document)
    }

    /// Fail the next `times` requests for `url` before serving it.
    pub fn fail_times(self, url: impl Into<String>, failure: MockFailure, times: usize) -> Self {
        locked(&self.scripted)
            .entry(url.into())
            .or_default()
            .extend(std::iter::repeat(failure).take(times));
        self
    }

    pub fn fail_once(self, url: impl Into<String>, failure: MockFailure) -> Self {
        self.fail_times(url, failure, 1)
    }

    /// Fail every request for `url`.
    pub fn fail_always(mut self, url: impl Into<String>, failure: MockFailure) -> Self {
        self.permanent.insert(url.into(), failure);
        self
    }

    /// Number of requests issued for `url`.
    pub fn calls(&self, url: &str) -> usize {
        locked(&self.calls).get(url).copied().unwrap_or(0)
    }

    /// Number of requests issued overall.
    pub fn total_calls(&self) -> usize {
        locked(&self.calls).values().sum()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_json(&self, url: &str) -> Result<Value, pokeapi::Error> {
        *locked(&self.calls).entry(url.to_string()).or_default() += 1;

        if let Some(failure) = self.permanent.get(url) {
            return Err(failure.into_error(url));
        }
        if let Some(failure) = locked(&self.scripted).get_mut(url).and_then(VecDeque::pop_front) {
            return Err(failure.into_error(url));
        }

        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| MockFailure::Status(404).into_error(url))
    }
}

// ============================================================================
// Type chart
// ============================================================================

/// Type slugs in API id order (`normal` is 1).
pub const TYPE_SLUGS: [&str; 18] = [
    "normal", "fighting", "flying", "poison", "ground", "rock", "bug", "ghost", "steel", "fire",
    "water", "grass", "electric", "psychic", "ice", "dragon", "dark", "fairy",
];

/// Offensive chart: (attacker, double damage to, half damage to, no damage to).
const ATTACK_CHART: [ChartRow; 18] = [
    ("normal", &[], &["rock", "steel"], &["ghost"]),
    (
        "fighting",
        &["normal", "rock", "steel", "ice", "dark"],
        &["flying", "poison", "bug", "psychic", "fairy"],
        &["ghost"],
    ),
    (
        "flying",
        &["fighting", "bug", "grass"],
        &["rock", "steel", "electric"],
        &[],
    ),
    (
        "poison",
        &["grass", "fairy"],
        &["poison", "ground", "rock", "ghost"],
        &["steel"],
    ),
    (
        "ground",
        &["poison", "rock", "steel", "fire", "electric"],
        &["bug", "grass"],
        &["flying"],
    ),
    (
        "rock",
        &["flying", "bug", "fire", "ice"],
        &["fighting", "ground", "steel"],
        &[],
    ),
    (
        "bug",
        &["grass", "psychic", "dark"],
        &["fighting", "flying", "poison", "ghost", "steel", "fire", "fairy"],
        &[],
    ),
    ("ghost", &["ghost", "psychic"], &["dark"], &["normal"]),
    (
        "steel",
        &["rock", "ice", "fairy"],
        &["steel", "fire", "water", "electric"],
        &[],
    ),
    (
        "fire",
        &["bug", "steel", "grass", "ice"],
        &["rock", "fire", "water", "dragon"],
        &[],
    ),
    (
        "water",
        &["ground", "rock", "fire"],
        &["water", "grass", "dragon"],
        &[],
    ),
    (
        "grass",
        &["ground", "rock", "water"],
        &["flying", "poison", "bug", "steel", "fire", "grass", "dragon"],
        &[],
    ),
    (
        "electric",
        &["flying", "water"],
        &["grass", "electric", "dragon"],
        &["ground"],
    ),
    (
        "psychic",
        &["fighting", "poison"],
        &["steel", "psychic"],
        &["dark"],
    ),
    (
        "ice",
        &["flying", "ground", "grass", "dragon"],
        &["steel", "fire", "water", "ice"],
        &[],
    ),
    ("dragon", &["dragon"], &["steel"], &["fairy"]),
    (
        "dark",
        &["ghost", "psychic"],
        &["fighting", "dark", "fairy"],
        &[],
    ),
    (
        "fairy",
        &["fighting", "dragon", "dark"],
        &["poison", "steel", "fire"],
        &[],
    ),
];

fn type_ref(name: &str) -> NamedResource {
    let id = TYPE_SLUGS.iter().position(|slug| *slug == name).unwrap_or(0) as u32 + 1;
    NamedResource::new(name, resource_url(Endpoint::Type, id))
}

fn type_refs(names: &[&str]) -> Vec<NamedResource> {
    names.iter().map(|name| type_ref(name)).collect()
}

/// Attackers listing `defender` under `pick` (one of the chart columns).
fn attackers_of(
    defender: &str,
    pick: fn(&ChartRow) -> &'static [&'static str],
) -> Vec<&'static str> {
    ATTACK_CHART
        .iter()
        .filter(|row| pick(row).contains(&defender))
        .map(|row| row.0)
        .collect()
}

type ChartRow = (&'static str, &'static [&'static str], &'static [&'static str], &'static [&'static str]);

/// Raw resource of type `id` (1-based, see [`TYPE_SLUGS`]).
///
/// The `from` relations are derived from the offensive chart so the two
/// directions always agree.
pub fn type_resource(id: u32) -> TypeResource {
    let index = (id.max(1) as usize - 1).min(TYPE_SLUGS.len() - 1);
    let (name, double_to, half_to, none_to) = ATTACK_CHART[index];

    TypeResource {
        id: index as u32 + 1,
        name: name.to_string(),
        damage_relations: DamageRelations {
            double_damage_to: type_refs(double_to),
            half_damage_to: type_refs(half_to),
            no_damage_to: type_refs(none_to),
            double_damage_from: type_refs(&attackers_of(name, |row| row.1)),
            half_damage_from: type_refs(&attackers_of(name, |row| row.2)),
            no_damage_from: type_refs(&attackers_of(name, |row| row.3)),
        },
    }
}

/// API document of type `id`.
pub fn type_json(id: u32) -> Value {
    let resource = type_resource(id);
    let relations = &resource.damage_relations;
    let names = |list: &[NamedResource]| -> Vec<Value> {
        list.iter()
            .map(|t| json!({ "name": t.name, "url": t.url }))
            .collect()
    };

    json!({
        "id": resource.id,
        "name": resource.name,
        "damage_relations": {
            "double_damage_to": names(&relations.double_damage_to),
            "half_damage_to": names(&relations.half_damage_to),
            "no_damage_to": names(&relations.no_damage_to),
            "double_damage_from": names(&relations.double_damage_from),
            "half_damage_from": names(&relations.half_damage_from),
            "no_damage_from": names(&relations.no_damage_from),
        },
        "names": [],
    })
}

/// The whole chart as raw resources, in id order.
pub fn type_chart_resources() -> Vec<TypeResource> {
    (1..=TYPE_SLUGS.len() as u32).map(type_resource).collect()
}

/// The whole chart, assembled.
pub fn type_chart() -> Result<Types, MissingReference> {
    build_types(type_chart_resources())
}

// ============================================================================
// Record documents
// ============================================================================

/// A move document. `class` of `None` mimics max moves.
pub fn move_json(
    id: u32,
    slug: &str,
    type_slug: &str,
    pp: Option<u32>,
    class: Option<&str>,
    flavor: &str,
) -> Value {
    json!({
        "id": id,
        "name": slug,
        "accuracy": 100,
        "power": 40,
        "pp": pp,
        "priority": 0,
        "effect_chance": null,
        "damage_class": class.map(|c| json!({ "name": c, "url": "" })),
        "type": { "name": type_slug, "url": "" },
        "flavor_text_entries": [
            { "flavor_text": format!("{flavor} (old)"), "language": { "name": "en", "url": "" } },
            { "flavor_text": flavor, "language": { "name": "en", "url": "" } },
            { "flavor_text": "Auf Deutsch.", "language": { "name": "de", "url": "" } },
        ],
    })
}

/// An ability document with an optional English effect and flavor text.
pub fn ability_json(id: u32, slug: &str, effect: Option<&str>, flavor: Option<&str>) -> Value {
    let effects: Vec<Value> = effect
        .map(|text| json!({ "effect": text, "short_effect": "", "language": { "name": "en", "url": "" } }))
        .into_iter()
        .collect();
    let flavors: Vec<Value> = flavor
        .map(|text| json!({ "flavor_text": text, "language": { "name": "en", "url": "" } }))
        .into_iter()
        .collect();

    json!({
        "id": id,
        "name": slug,
        "effect_entries": effects,
        "flavor_text_entries": flavors,
    })
}

/// A species document listing `forms` (form record ids) as varieties.
pub fn species_json(id: u32, slug: &str, generation: &str, forms: &[u32], legendary: bool) -> Value {
    let varieties: Vec<Value> = forms
        .iter()
        .enumerate()
        .map(|(i, form)| {
            json!({ "is_default": i == 0, "pokemon": { "name": slug, "url": pokemon_url(*form) } })
        })
        .collect();

    json!({
        "id": id,
        "name": slug,
        "is_legendary": legendary,
        "is_mythical": false,
        "generation": { "name": generation, "url": "" },
        "flavor_text_entries": [
            { "flavor_text": format!("{slug} flavor"), "language": { "name": "en", "url": "" } },
        ],
        "genera": [
            { "genus": "Tiny Pokémon", "language": { "name": "en", "url": "" } },
            { "genus": "Minipokémon", "language": { "name": "de", "url": "" } },
        ],
        "varieties": varieties,
    })
}

/// A form document. The first listed ability is visible, the rest hidden.
pub fn pokemon_json(id: u32, slug: &str, types: &[&str], abilities: &[&str], moves: &[&str]) -> Value {
    let types: Vec<Value> = types
        .iter()
        .enumerate()
        .map(|(i, t)| json!({ "slot": i + 1, "type": { "name": t, "url": "" } }))
        .collect();
    let abilities: Vec<Value> = abilities
        .iter()
        .enumerate()
        .map(|(i, a)| json!({ "ability": { "name": a, "url": "" }, "is_hidden": i > 0, "slot": i + 1 }))
        .collect();
    let moves: Vec<Value> = moves
        .iter()
        .map(|m| json!({ "move": { "name": m, "url": "" }, "version_group_details": [] }))
        .collect();

    json!({
        "id": id,
        "name": slug,
        "height": 7,
        "weight": 69,
        "sprites": { "front_default": format!("https://img/{id}.png"), "front_shiny": null },
        "stats": [
            { "base_stat": 45, "effort": 0, "stat": { "name": "hp", "url": "" } },
            { "base_stat": 49, "effort": 0, "stat": { "name": "attack", "url": "" } },
            { "base_stat": 65, "effort": 1, "stat": { "name": "special-attack", "url": "" } },
        ],
        "abilities": abilities,
        "moves": moves,
        "types": types,
    })
}

// ============================================================================
// Sample dataset
// ============================================================================

/// Collection sizes of [`sample_api`].
pub fn sample_counts() -> Counts {
    Counts {
        types: 18,
        moves: 4,
        abilities: 3,
        species: 3,
    }
}

/// A small, internally consistent API:
///
/// - the full type chart
/// - moves Tackle, Ember, Vine Whip, Growl
/// - abilities Overgrow, Blaze, Chlorophyll
/// - Bulbasaur, Charmander and Rattata (with its Alolan form)
pub fn sample_api() -> MockTransport {
    let mut api = MockTransport::new();
    for id in 1..=TYPE_SLUGS.len() as u32 {
        api = api.with_resource(Endpoint::Type, id, type_json(id));
    }

    api.with_resource(
        Endpoint::Move,
        1,
        move_json(1, "tackle", "normal", Some(35), Some("physical"), "A full-body charge."),
    )
    .with_resource(
        Endpoint::Move,
        2,
        move_json(2, "ember", "fire", Some(25), Some("special"), "Small flames."),
    )
    .with_resource(
        Endpoint::Move,
        3,
        move_json(3, "vine-whip", "grass", Some(25), Some("physical"), "Vines strike."),
    )
    .with_resource(
        Endpoint::Move,
        4,
        move_json(4, "growl", "normal", Some(40), Some("status"), "A cute growl."),
    )
    .with_resource(
        Endpoint::Ability,
        1,
        ability_json(1, "overgrow", Some("Powers up Grass moves."), None),
    )
    .with_resource(
        Endpoint::Ability,
        2,
        ability_json(2, "blaze", Some("Powers up Fire moves."), None),
    )
    .with_resource(
        Endpoint::Ability,
        3,
        ability_json(3, "chlorophyll", None, Some("Faster in sunshine.")),
    )
    .with_resource(
        Endpoint::PokemonSpecies,
        1,
        species_json(1, "bulbasaur", "generation-i", &[1], false),
    )
    .with_resource(
        Endpoint::PokemonSpecies,
        2,
        species_json(2, "charmander", "generation-i", &[4], false),
    )
    .with_resource(
        Endpoint::PokemonSpecies,
        3,
        species_json(3, "rattata", "generation-i", &[19, 10091], false),
    )
    .with_document(
        pokemon_url(1),
        pokemon_json(
            1,
            "bulbasaur",
            &["grass", "poison"],
            &["overgrow", "chlorophyll"],
            &["tackle", "vine-whip", "growl"],
        ),
    )
    .with_document(
        pokemon_url(4),
        pokemon_json(4, "charmander", &["fire"], &["blaze"], &["tackle", "ember", "growl"]),
    )
    .with_document(
        pokemon_url(19),
        pokemon_json(19, "rattata", &["normal"], &["overgrow"], &["tackle"]),
    )
    .with_document(
        pokemon_url(10091),
        pokemon_json(10091, "rattata-alola", &["dark", "normal"], &["blaze"], &["tackle"]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_scripts_failures() {
        let url = resource_url(Endpoint::Type, 1);
        let api = MockTransport::new()
            .with_document(url.clone(), json!({ "ok": true }))
            .fail_once(url.clone(), MockFailure::Status(503));

        assert!(matches!(
            api.get_json(&url).await,
            Err(pokeapi::Error::Api { status: 503, .. })
        ));
        assert_eq!(api.get_json(&url).await.unwrap()["ok"], true);
        assert!(matches!(
            api.get_json("mock://api/nothing").await,
            Err(pokeapi::Error::Api { status: 404, .. })
        ));
        assert_eq!(api.calls(&url), 2);
        assert_eq!(api.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_transport_offline() {
        let api = MockTransport::new().fail_always("mock://api/x", MockFailure::Offline);
        let err = api.get_json("mock://api/x").await.unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_chart_directions_agree() {
        let fire = type_json(10);
        let grass = type_json(12);
        assert_eq!(fire["name"], "fire");

        let fire_beats: Vec<&str> = fire["damage_relations"]["double_damage_to"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(fire_beats, vec!["bug", "steel", "grass", "ice"]);

        let grass_fears: Vec<&str> = grass["damage_relations"]["double_damage_from"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(grass_fears, vec!["flying", "poison", "bug", "fire", "ice"]);
    }

    #[test]
    fn test_type_chart_assembles() {
        let types = type_chart().unwrap();
        assert_eq!(types.len(), 18);
        assert_eq!(types.lookup("Ghost").unwrap().no_damage_from, vec!["Normal", "Fighting"]);
    }
}
