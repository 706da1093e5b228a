//! Creature browser queries.

use crate::model::{CreatureRecord, Creatures, TypeId, Types};
use crate::names::proper_word;
use serde::{Deserialize, Serialize};

/// Edit distance below which a name counts as a fuzzy match.
pub const DEFAULT_FUZZY_THRESHOLD: usize = 4;

fn default_fuzzy_threshold() -> usize {
    DEFAULT_FUZZY_THRESHOLD
}

/// Result ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Dex number, then form id.
    #[default]
    Dex,
    /// Display name.
    Name,
}

/// Optional filters over the creature list. Unset filters match everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureFilter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub primary: Option<String>,
    #[serde(default)]
    pub secondary: Option<String>,
    /// Roman generation tag, e.g. `IV`.
    #[serde(default)]
    pub generation: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: usize,
}

impl Default for CreatureFilter {
    fn default() -> Self {
        Self {
            name: None,
            primary: None,
            secondary: None,
            generation: None,
            order: SortOrder::Dex,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

fn non_blank(value: impl AsRef<str>) -> Option<String> {
    let value = value.as_ref().trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl CreatureFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match names containing `name` or close to it. Blank clears the filter.
    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.name = non_blank(name);
        self
    }

    pub fn with_primary(mut self, type_name: impl AsRef<str>) -> Self {
        self.primary = non_blank(type_name).map(|t| proper_word(&t));
        self
    }

    pub fn with_secondary(mut self, type_name: impl AsRef<str>) -> Self {
        self.secondary = non_blank(type_name).map(|t| proper_word(&t));
        self
    }

    pub fn with_generation(mut self, tag: impl AsRef<str>) -> Self {
        self.generation = non_blank(tag).map(|t| t.to_uppercase());
        self
    }

    pub fn sorted_by(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_fuzzy_threshold(mut self, threshold: usize) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    /// Whether `creature` passes every set filter.
    pub fn matches(&self, creature: &CreatureRecord, types: &Types) -> bool {
        let type_is = |slot: Option<TypeId>, wanted: &str| {
            slot.and_then(|id| types.get(id))
                .map(|t| t.name == wanted)
                .unwrap_or(false)
        };

        if let Some(query) = &self.name {
            if !name_matches(query, &creature.name, self.fuzzy_threshold) {
                return false;
            }
        }
        if let Some(primary) = &self.primary {
            if !type_is(creature.primary_type(), primary) {
                return false;
            }
        }
        if let Some(secondary) = &self.secondary {
            if !type_is(creature.secondary_type(), secondary) {
                return false;
            }
        }
        if let Some(generation) = &self.generation {
            if &creature.generation != generation {
                return false;
            }
        }
        true
    }

    /// Matching creatures in the requested order.
    pub fn apply<'a>(&self, creatures: &'a Creatures, types: &Types) -> Vec<&'a CreatureRecord> {
        let mut found: Vec<&CreatureRecord> = creatures
            .iter()
            .filter(|creature| self.matches(creature, types))
            .collect();

        match self.order {
            SortOrder::Dex => found.sort_by_key(|c| (c.dex_number, c.order)),
            SortOrder::Name => found.sort_by(|a, b| a.name.cmp(&b.name)),
        }
        found
    }
}

/// Case-insensitive substring match, or edit distance below `threshold`.
pub fn name_matches(query: &str, name: &str, threshold: usize) -> bool {
    let query = query.to_lowercase();
    let name = name.to_lowercase();
    name.contains(&query) || strsim::levenshtein(&query, &name) < threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Sprites, Handle};
    use crate::testing::type_chart;
    use pretty_assertions::assert_eq;

    fn creature(types: &Types, name: &str, dex: u32, order: u32, generation: &str, kinds: &[&str]) -> CreatureRecord {
        CreatureRecord {
            name: name.to_string(),
            dex_number: dex,
            order,
            generation: generation.to_string(),
            legendary: false,
            mythical: false,
            description: String::new(),
            genus: "Pokemon".to_string(),
            height: 1,
            weight: 1,
            sprites: Sprites::default(),
            stats: Vec::new(),
            abilities: Vec::new(),
            moves: Vec::new(),
            types: kinds.iter().map(|k| types.resolve(k).unwrap()).collect(),
        }
    }

    fn sample(types: &Types) -> Creatures {
        Creatures::from_entries(vec![
            creature(types, "Rattata Alola", 19, 10091, "VII", &["Dark", "Normal"]),
            creature(types, "Charmander", 4, 4, "I", &["Fire"]),
            creature(types, "Bulbasaur", 1, 1, "I", &["Grass", "Poison"]),
            creature(types, "Rattata", 19, 19, "I", &["Normal"]),
            creature(types, "Torchic", 255, 255, "III", &["Fire"]),
            creature(types, "Abomasnow", 460, 460, "IV", &["Grass", "Ice"]),
        ])
    }

    fn names<'a>(found: &[&'a CreatureRecord]) -> Vec<&'a str> {
        found.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_default_sort_is_dex_then_form() {
        let types = type_chart().unwrap();
        let creatures = sample(&types);

        let found = CreatureFilter::new().apply(&creatures, &types);
        assert_eq!(
            names(&found),
            vec!["Bulbasaur", "Charmander", "Rattata", "Rattata Alola", "Torchic", "Abomasnow"]
        );
    }

    #[test]
    fn test_sort_by_name() {
        let types = type_chart().unwrap();
        let creatures = sample(&types);

        let found = CreatureFilter::new().sorted_by(SortOrder::Name).apply(&creatures, &types);
        assert_eq!(
            names(&found),
            vec!["Abomasnow", "Bulbasaur", "Charmander", "Rattata", "Rattata Alola", "Torchic"]
        );
        let found = CreatureFilter::new()
            .with_primary("fire")
            .sorted_by(SortOrder::Name)
            .apply(&creatures, &types);
        assert_eq!(names(&found), vec!["Charmander", "Torchic"]);
    }

    #[test]
    fn test_name_substring_and_fuzzy() {
        let types = type_chart().unwrap();
        let creatures = sample(&types);

        let found = CreatureFilter::new().with_name("RATT").apply(&creatures, &types);
        assert_eq!(names(&found), vec!["Rattata", "Rattata Alola"]);

        let found = CreatureFilter::new().with_name("charmandr").apply(&creatures, &types);
        assert_eq!(names(&found), vec!["Charmander"]);

        let found = CreatureFilter::new()
            .with_name("charmandr")
            .with_fuzzy_threshold(1)
            .apply(&creatures, &types);
        assert!(found.is_empty());
    }

    #[test]
    fn test_type_filters() {
        let types = type_chart().unwrap();
        let creatures = sample(&types);

        let found = CreatureFilter::new().with_secondary("Normal").apply(&creatures, &types);
        assert_eq!(names(&found), vec!["Rattata Alola"]);

        let found = CreatureFilter::new().with_primary("Normal").apply(&creatures, &types);
        assert_eq!(names(&found), vec!["Rattata"]);

        let found = CreatureFilter::new()
            .with_primary("Grass")
            .with_secondary("Poison")
            .apply(&creatures, &types);
        assert_eq!(names(&found), vec!["Bulbasaur"]);
    }

    #[test]
    fn test_generation_filter() {
        let types = type_chart().unwrap();
        let creatures = sample(&types);

        let found = CreatureFilter::new().with_generation("iii").apply(&creatures, &types);
        assert_eq!(names(&found), vec!["Torchic"]);
    }

    #[test]
    fn test_blank_values_clear_filters() {
        let filter = CreatureFilter::new()
            .with_name("  ")
            .with_primary("")
            .with_generation("");
        assert_eq!(filter, CreatureFilter::default());
    }

    #[test]
    fn test_dangling_type_handle_never_matches() {
        let types = type_chart().unwrap();
        let mut odd = creature(&types, "Missingno", 0, 0, "I", &[]);
        odd.types.push(TypeId::from_index(99));
        let creatures = Creatures::from_entries(vec![odd]);

        assert!(CreatureFilter::new().with_primary("Normal").apply(&creatures, &types).is_empty());
    }

    #[test]
    fn test_name_matches() {
        assert!(name_matches("pika", "Pikachu", 4));
        assert!(name_matches("pikachoo", "Pikachu", 4));
        assert!(!name_matches("bulbasaur", "Pikachu", 4));
    }

    #[test]
    fn test_filter_serde_defaults() {
        let filter: CreatureFilter = serde_json::from_str(r#"{"name": "pika"}"#).unwrap();
        assert_eq!(filter.fuzzy_threshold, DEFAULT_FUZZY_THRESHOLD);
        assert_eq!(filter.order, SortOrder::Dex);
    }
}
