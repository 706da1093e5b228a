//! Turning raw API resources into registries.
//!
//! Assembly runs in dependency order: types, then moves (which need types),
//! abilities, and finally creatures (which need all three). Every cross
//! reference is resolved through the dependency registry by canonical name;
//! a name that does not resolve aborts the build with [`MissingReference`].
//!
//! Inputs are sorted by upstream id first, so the result does not depend on
//! the order the fetcher delivered them in.

use crate::fetch::CreatureBundle;
use crate::model::{
    AbilityRecord, AbilitySlot, Abilities, CreatureRecord, Creatures, DamageClass,
    MissingReference, MoveRecord, Moves, ReferenceKind, Sprites, Stat, TypeRecord, Types,
};
use crate::names::{generation_tag, normalize_whitespace, proper_word, split_then_proper_word};
use log::debug;
use pokeapi::{
    latest_flavor_text, AbilityResource, MoveResource, NamedResource, TypeResource,
};
use std::collections::{HashMap, HashSet};

/// Placeholder for records without English text.
pub const NO_DESCRIPTION: &str = "No description found.";

/// Genus used when a species has no English one.
pub const DEFAULT_GENUS: &str = "Pokemon";

/// Separator between descriptions of same-named abilities.
pub const ABILITY_SEPARATOR: &str = "/\n";

const LANGUAGE: &str = "en";

// ============================================================================
// Types
// ============================================================================

fn type_names(list: &[NamedResource]) -> Vec<String> {
    list.iter().map(|t| proper_word(&t.name)).collect()
}

/// Build the type registry, checking that every relation names a type of
/// the same batch.
pub fn build_types(mut raw: Vec<TypeResource>) -> Result<Types, MissingReference> {
    raw.sort_by_key(|t| t.id);

    let records: Vec<TypeRecord> = raw
        .into_iter()
        .map(|t| {
            let relations = t.damage_relations;
            TypeRecord {
                name: proper_word(&t.name),
                double_damage_from: type_names(&relations.double_damage_from),
                half_damage_from: type_names(&relations.half_damage_from),
                no_damage_from: type_names(&relations.no_damage_from),
                double_damage_to: type_names(&relations.double_damage_to),
                half_damage_to: type_names(&relations.half_damage_to),
                no_damage_to: type_names(&relations.no_damage_to),
            }
        })
        .collect();

    let known: HashSet<&str> = records.iter().map(|t| t.name.as_str()).collect();
    if let Some(dangling) = records
        .iter()
        .flat_map(TypeRecord::related_names)
        .find(|name| !known.contains(name))
    {
        return Err(MissingReference::new(ReferenceKind::Type, dangling));
    }

    Ok(Types::from_entries(records))
}

// ============================================================================
// Moves
// ============================================================================

/// Build the move registry against an assembled type registry.
pub fn build_moves(mut raw: Vec<MoveResource>, types: &Types) -> Result<Moves, MissingReference> {
    raw.sort_by_key(|m| m.id);

    let mut records = raw
        .into_iter()
        .map(|m| move_record(m, types))
        .collect::<Result<Vec<_>, _>>()?;
    retag_z_moves(&mut records);

    Ok(Moves::from_entries(records))
}

fn move_record(raw: MoveResource, types: &Types) -> Result<MoveRecord, MissingReference> {
    let name = split_then_proper_word(&raw.name);
    let class = match raw
        .damage_class
        .as_ref()
        .and_then(|class| DamageClass::from_slug(&class.name))
    {
        Some(class) => class,
        None => {
            debug!("{name} has no damage class, treating it as ultimate");
            DamageClass::Ultimate
        }
    };

    Ok(MoveRecord {
        id: raw.id,
        move_type: types.resolve(&proper_word(&raw.move_type.name))?,
        description: latest_flavor_text(&raw.flavor_text_entries, LANGUAGE)
            .unwrap_or(NO_DESCRIPTION)
            .to_string(),
        accuracy: raw.accuracy,
        power: raw.power,
        pp: raw.pp,
        class,
        effect_chance: raw.effect_chance.unwrap_or(0),
        priority: raw.priority,
        name,
    })
}

/// Z-moves have exactly one power point.
///
/// Damaging Z-moves come upstream as a physical/special pair named
/// `<Name> Physical` and `<Name> Special`. Counting only those, the first of
/// each pair survives under the bare name and the second is dropped.
fn retag_z_moves(records: &mut Vec<MoveRecord>) {
    let mut paired = 0usize;

    records.retain_mut(|record| {
        if record.pp != Some(1) {
            return true;
        }
        record.class = DamageClass::Ultimate;

        let Some(stem) = strip_class_suffix(&record.name) else {
            return true;
        };
        let first_of_pair = paired % 2 == 0;
        paired += 1;
        if first_of_pair {
            record.name = stem;
        } else {
            debug!("Dropping duplicate z-move {}", record.name);
        }
        first_of_pair
    });
}

/// `Breakneck Blitz  Physical` becomes `Breakneck Blitz`.
fn strip_class_suffix(name: &str) -> Option<String> {
    let (stem, last) = name.rsplit_once(char::is_whitespace)?;
    matches!(last, "Physical" | "Special").then(|| normalize_whitespace(stem))
}

// ============================================================================
// Abilities
// ============================================================================

/// Build the ability registry.
///
/// Upstream carries a few abilities twice under one name. Those merge into a
/// single record whose description joins both with [`ABILITY_SEPARATOR`].
pub fn build_abilities(mut raw: Vec<AbilityResource>) -> Abilities {
    raw.sort_by_key(|a| a.id);

    let mut records: Vec<AbilityRecord> = Vec::with_capacity(raw.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for ability in raw {
        let record = AbilityRecord {
            name: split_then_proper_word(&ability.name),
            description: ability_description(&ability),
        };

        match positions.get(&record.name) {
            Some(&position) => {
                let merged = &mut records[position].description;
                merged.push_str(ABILITY_SEPARATOR);
                merged.push_str(&record.description);
            }
            None => {
                positions.insert(record.name.clone(), records.len());
                records.push(record);
            }
        }
    }

    Abilities::from_entries(records)
}

fn ability_description(ability: &AbilityResource) -> String {
    ability
        .effect_entries
        .iter()
        .find(|entry| entry.language.name == LANGUAGE)
        .map(|entry| entry.effect.as_str())
        .or_else(|| latest_flavor_text(&ability.flavor_text_entries, LANGUAGE))
        .unwrap_or(NO_DESCRIPTION)
        .to_string()
}

// ============================================================================
// Creatures
// ============================================================================

/// Build the creature registry, one record per fetched form, ordered by
/// dex number then form id.
pub fn build_creatures(
    mut bundles: Vec<CreatureBundle>,
    types: &Types,
    moves: &Moves,
    abilities: &Abilities,
) -> Result<Creatures, MissingReference> {
    bundles.sort_by_key(|b| (b.dex_number, b.variety.id));

    bundles
        .into_iter()
        .map(|bundle| creature_record(bundle, types, moves, abilities))
        .collect::<Result<Vec<_>, _>>()
        .map(Creatures::from_entries)
}

fn creature_record(
    bundle: CreatureBundle,
    types: &Types,
    moves: &Moves,
    abilities: &Abilities,
) -> Result<CreatureRecord, MissingReference> {
    let CreatureBundle {
        dex_number,
        species,
        variety,
    } = bundle;

    let genus = species
        .genera
        .iter()
        .filter(|g| g.language.name == LANGUAGE)
        .last()
        .map(|g| g.genus.clone())
        .unwrap_or_else(|| DEFAULT_GENUS.to_string());

    let ability_slots = variety
        .abilities
        .iter()
        .map(|slot| {
            Ok(AbilitySlot {
                ability: abilities.resolve(&split_then_proper_word(&slot.ability.name))?,
                hidden: slot.is_hidden,
            })
        })
        .collect::<Result<Vec<_>, MissingReference>>()?;

    let move_ids = variety
        .moves
        .iter()
        .map(|slot| moves.resolve(&split_then_proper_word(&slot.move_ref.name)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut type_slots: Vec<_> = variety.types.iter().collect();
    type_slots.sort_by_key(|slot| slot.slot);
    let type_ids = type_slots
        .into_iter()
        .map(|slot| types.resolve(&proper_word(&slot.type_ref.name)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CreatureRecord {
        name: split_then_proper_word(&variety.name),
        dex_number,
        order: variety.id,
        generation: generation_tag(&species.generation.name),
        legendary: species.is_legendary,
        mythical: species.is_mythical,
        description: latest_flavor_text(&species.flavor_text_entries, LANGUAGE)
            .unwrap_or(NO_DESCRIPTION)
            .to_string(),
        genus,
        height: variety.height,
        weight: variety.weight,
        sprites: Sprites(variety.sprites),
        stats: variety
            .stats
            .iter()
            .map(|s| Stat {
                name: s.stat.name.clone(),
                value: s.base_stat,
            })
            .collect(),
        abilities: ability_slots,
        moves: move_ids,
        types: type_ids,
    })
}

/// Verify that every handle in a loaded creature snapshot points inside the
/// loaded dependency registries.
pub fn check_creature_links(
    creatures: &Creatures,
    types: &Types,
    moves: &Moves,
    abilities: &Abilities,
) -> Result<(), MissingReference> {
    for creature in creatures.iter() {
        for id in &creature.types {
            types.check(*id)?;
        }
        for id in &creature.moves {
            moves.check(*id)?;
        }
        for slot in &creature.abilities {
            abilities.check(slot.ability)?;
        }
    }
    Ok(())
}

/// Verify that every move's type handle is in range of `types`.
pub fn check_move_links(moves: &Moves, types: &Types) -> Result<(), MissingReference> {
    moves.iter().try_for_each(|m| types.check(m.move_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ability_json, move_json, pokemon_json, species_json, type_chart};
    use pokeapi::{PokemonResource, SpeciesResource};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn raw_move(id: u32, slug: &str, pp: Option<u32>, class: Option<&str>) -> MoveResource {
        serde_json::from_value(move_json(id, slug, "normal", pp, class, "Text.")).unwrap()
    }

    fn raw_ability(id: u32, slug: &str, effect: Option<&str>, flavor: Option<&str>) -> AbilityResource {
        serde_json::from_value(ability_json(id, slug, effect, flavor)).unwrap()
    }

    #[test]
    fn test_types_reject_unknown_relation() {
        let mut raw = crate::testing::type_chart_resources();
        raw.retain(|t| t.name != "fairy");

        let err = build_types(raw).unwrap_err();
        assert_eq!(err.kind, ReferenceKind::Type);
        assert_eq!(err.name, "Fairy");
    }

    #[test]
    fn test_types_sorted_by_id() {
        let mut raw = crate::testing::type_chart_resources();
        raw.reverse();
        let types = build_types(raw).unwrap();
        assert_eq!(types.as_slice()[0].name, "Normal");
        assert_eq!(types.as_slice()[17].name, "Fairy");
    }

    #[test]
    fn test_move_fields() {
        let types = type_chart().unwrap();
        let moves = build_moves(
            vec![
                raw_move(2, "growl", Some(40), Some("status")),
                raw_move(1, "tackle", Some(35), Some("physical")),
            ],
            &types,
        )
        .unwrap();

        let tackle = moves.lookup("Tackle").unwrap();
        assert_eq!(tackle.class, DamageClass::Physical);
        assert_eq!(tackle.description, "Text.");
        assert_eq!(tackle.effect_chance, 0);
        assert_eq!(types.get(tackle.move_type).unwrap().name, "Normal");
        assert_eq!(moves.as_slice()[0].name, "Tackle");
    }

    #[test]
    fn test_move_without_english_text() {
        let types = type_chart().unwrap();
        let mut raw = raw_move(1, "tackle", Some(35), Some("physical"));
        raw.flavor_text_entries.retain(|e| e.language.name != "en");

        let moves = build_moves(vec![raw], &types).unwrap();
        assert_eq!(moves.as_slice()[0].description, NO_DESCRIPTION);
    }

    #[test]
    fn test_move_unknown_type() {
        let types = type_chart().unwrap();
        let mut raw = raw_move(1, "shadow-rush", Some(10), Some("physical"));
        raw.move_type.name = "shadow".to_string();

        let err = build_moves(vec![raw], &types).unwrap_err();
        assert_eq!(err, MissingReference::new(ReferenceKind::Type, "Shadow"));
    }

    #[test]
    fn test_max_moves_are_ultimate() {
        let types = type_chart().unwrap();
        let moves = build_moves(vec![raw_move(743, "max-flare", Some(10), None)], &types).unwrap();
        assert_eq!(moves.lookup("Max Flare").unwrap().class, DamageClass::Ultimate);
    }

    #[test]
    fn test_z_move_pairs_collapse() {
        let types = type_chart().unwrap();
        let moves = build_moves(
            vec![
                raw_move(622, "breakneck-blitz--physical", Some(1), Some("physical")),
                raw_move(623, "breakneck-blitz--special", Some(1), Some("special")),
                raw_move(624, "all-out-pummeling--physical", Some(1), Some("physical")),
                raw_move(625, "all-out-pummeling--special", Some(1), Some("special")),
                raw_move(658, "catastropika", Some(1), Some("physical")),
            ],
            &types,
        )
        .unwrap();

        let names: Vec<&str> = moves.names().collect();
        assert_eq!(names, vec!["Breakneck Blitz", "All Out Pummeling", "Catastropika"]);
        assert!(moves.iter().all(|m| m.class == DamageClass::Ultimate));
    }

    #[test]
    fn test_strip_class_suffix() {
        assert_eq!(strip_class_suffix("Breakneck Blitz  Physical"), Some("Breakneck Blitz".into()));
        assert_eq!(strip_class_suffix("Catastropika"), None);
        assert_eq!(strip_class_suffix("Psychic"), None);
        assert_eq!(strip_class_suffix("Physical Special"), Some("Physical".into()));
    }

    #[test]
    fn test_ability_description_priority() {
        let abilities = build_abilities(vec![
            raw_ability(1, "overgrow", Some("Effect."), Some("Flavor.")),
            raw_ability(2, "chlorophyll", None, Some("Flavor.")),
            raw_ability(3, "stench", None, None),
        ]);

        assert_eq!(abilities.lookup("Overgrow").unwrap().description, "Effect.");
        assert_eq!(abilities.lookup("Chlorophyll").unwrap().description, "Flavor.");
        assert_eq!(abilities.lookup("Stench").unwrap().description, NO_DESCRIPTION);
    }

    #[test]
    fn test_same_name_abilities_merge() {
        let abilities = build_abilities(vec![
            raw_ability(2, "sheer-will", Some("B"), None),
            raw_ability(1, "sheer-will", Some("A"), None),
        ]);

        assert_eq!(abilities.len(), 1);
        assert_eq!(abilities.lookup("Sheer Will").unwrap().description, "A/\nB");
    }

    fn bundle(dex_number: u32, species: &Arc<SpeciesResource>, variety: serde_json::Value) -> CreatureBundle {
        let variety: PokemonResource = serde_json::from_value(variety).unwrap();
        CreatureBundle {
            dex_number,
            species: Arc::clone(species),
            variety,
        }
    }

    fn creature_fixtures() -> (Types, Moves, Abilities) {
        let types = type_chart().unwrap();
        let moves = build_moves(
            vec![
                raw_move(1, "tackle", Some(35), Some("physical")),
                raw_move(2, "growl", Some(40), Some("status")),
            ],
            &types,
        )
        .unwrap();
        let abilities = build_abilities(vec![
            raw_ability(1, "overgrow", Some("Effect."), None),
            raw_ability(2, "chlorophyll", Some("Sun."), None),
        ]);
        (types, moves, abilities)
    }

    #[test]
    fn test_creature_record() {
        let (types, moves, abilities) = creature_fixtures();
        let species: Arc<SpeciesResource> =
            Arc::new(serde_json::from_value(species_json(1, "bulbasaur", "generation-i", &[1], false)).unwrap());
        let raw = pokemon_json(
            1,
            "bulbasaur",
            &["grass", "poison"],
            &["overgrow", "chlorophyll"],
            &["tackle", "growl"],
        );

        let creatures =
            build_creatures(vec![bundle(1, &species, raw)], &types, &moves, &abilities).unwrap();
        let bulbasaur = creatures.lookup("Bulbasaur").unwrap();

        assert_eq!(bulbasaur.generation, "I");
        assert_eq!(bulbasaur.genus, "Tiny Pokémon");
        assert_eq!(bulbasaur.description, "bulbasaur flavor");
        assert_eq!(bulbasaur.order, 1);
        assert_eq!(bulbasaur.stat_total(), 159);
        assert_eq!(bulbasaur.stats[2].name, "special-attack");

        let type_names: Vec<&str> = bulbasaur
            .types
            .iter()
            .map(|id| types.get(*id).unwrap().name.as_str())
            .collect();
        assert_eq!(type_names, vec!["Grass", "Poison"]);

        let hidden: Vec<bool> = bulbasaur.abilities.iter().map(|a| a.hidden).collect();
        assert_eq!(hidden, vec![false, true]);
        assert_eq!(bulbasaur.moves.len(), 2);
    }

    #[test]
    fn test_creature_defaults_without_english() {
        let (types, moves, abilities) = creature_fixtures();
        let mut species: SpeciesResource =
            serde_json::from_value(species_json(1, "bulbasaur", "generation-i", &[1], false)).unwrap();
        species.genera.retain(|g| g.language.name != "en");
        species.flavor_text_entries.clear();
        let species = Arc::new(species);

        let raw = pokemon_json(1, "bulbasaur", &["grass"], &["overgrow"], &[]);
        let creatures =
            build_creatures(vec![bundle(1, &species, raw)], &types, &moves, &abilities).unwrap();

        let bulbasaur = creatures.lookup("Bulbasaur").unwrap();
        assert_eq!(bulbasaur.genus, DEFAULT_GENUS);
        assert_eq!(bulbasaur.description, NO_DESCRIPTION);
    }

    #[test]
    fn test_creature_unknown_ability() {
        let (types, moves, abilities) = creature_fixtures();
        let species: Arc<SpeciesResource> =
            Arc::new(serde_json::from_value(species_json(1, "bulbasaur", "generation-i", &[1], false)).unwrap());
        let raw = pokemon_json(1, "bulbasaur", &["grass"], &["sheer-will"], &[]);

        let err = build_creatures(vec![bundle(1, &species, raw)], &types, &moves, &abilities)
            .unwrap_err();
        assert_eq!(err, MissingReference::new(ReferenceKind::Ability, "Sheer Will"));
    }

    #[test]
    fn test_creatures_sorted_by_dex_then_form() {
        let (types, moves, abilities) = creature_fixtures();
        let rattata: Arc<SpeciesResource> =
            Arc::new(serde_json::from_value(species_json(19, "rattata", "generation-i", &[19, 10091], false)).unwrap());
        let bulbasaur: Arc<SpeciesResource> =
            Arc::new(serde_json::from_value(species_json(1, "bulbasaur", "generation-i", &[1], false)).unwrap());

        let creatures = build_creatures(
            vec![
                bundle(19, &rattata, pokemon_json(10091, "rattata-alola", &["dark", "normal"], &[], &[])),
                bundle(19, &rattata, pokemon_json(19, "rattata", &["normal"], &[], &[])),
                bundle(1, &bulbasaur, pokemon_json(1, "bulbasaur", &["grass"], &[], &[])),
            ],
            &types,
            &moves,
            &abilities,
        )
        .unwrap();

        let names: Vec<&str> = creatures.names().collect();
        assert_eq!(names, vec!["Bulbasaur", "Rattata", "Rattata Alola"]);
    }

    #[test]
    fn test_check_creature_links() {
        let (types, moves, abilities) = creature_fixtures();
        let species: Arc<SpeciesResource> =
            Arc::new(serde_json::from_value(species_json(1, "bulbasaur", "generation-i", &[1], false)).unwrap());
        let raw = pokemon_json(1, "bulbasaur", &["grass"], &["overgrow"], &["growl"]);
        let creatures =
            build_creatures(vec![bundle(1, &species, raw)], &types, &moves, &abilities).unwrap();

        assert!(check_creature_links(&creatures, &types, &moves, &abilities).is_ok());

        let fewer_moves = Moves::from_entries(vec![moves.as_slice()[0].clone()]);
        let err = check_creature_links(&creatures, &types, &fewer_moves, &abilities).unwrap_err();
        assert_eq!(err.kind, ReferenceKind::Move);
    }
}
