//! Plain-text rendering of dex records and matchups.

use dex_core::{CreatureRecord, Direction, Effectiveness, Pokedex, TeamReport};

fn or_dash(value: Option<u32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn type_label(dex: &Pokedex, creature: &CreatureRecord) -> String {
    dex.creature_types(creature)
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

/// One line per creature, then a count.
pub fn creature_table(dex: &Pokedex, creatures: &[&CreatureRecord]) -> String {
    let mut out = String::new();
    for creature in creatures {
        out.push_str(&format!(
            "#{:04} {:<24} {:<18} {}\n",
            creature.dex_number,
            creature.name,
            type_label(dex, creature),
            creature.generation
        ));
    }
    out.push_str(&format!("{} found\n", creatures.len()));
    out
}

pub fn creature_detail(dex: &Pokedex, creature: &CreatureRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} #{:04}\n", creature.name, creature.dex_number));
    out.push_str(&format!("{}\n", creature.genus));

    let mut tags = vec![format!("Generation {}", creature.generation)];
    if creature.legendary {
        tags.push("Legendary".to_string());
    }
    if creature.mythical {
        tags.push("Mythical".to_string());
    }
    out.push_str(&format!("{} | {}\n", type_label(dex, creature), tags.join(" | ")));

    // Heights are in decimetres, weights in hectograms.
    out.push_str(&format!(
        "Height {:.1} m, weight {:.1} kg\n",
        f64::from(creature.height) / 10.0,
        f64::from(creature.weight) / 10.0
    ));
    out.push_str(&format!("\n{}\n", creature.description));

    out.push_str("\nStats\n");
    for stat in &creature.stats {
        out.push_str(&format!("  {:<16} {:>3}\n", stat.name, stat.value));
    }
    out.push_str(&format!("  {:<16} {:>3}\n", "total", creature.stat_total()));

    out.push_str("\nAbilities\n");
    for (ability, hidden) in dex.creature_abilities(creature) {
        let marker = if hidden { " (hidden)" } else { "" };
        out.push_str(&format!("  {}{marker}: {}\n", ability.name, ability.description));
    }

    out.push_str("\nMoves\n");
    for record in dex.creature_moves(creature) {
        let move_type = dex.type_of(record).map_or("?", |t| t.name.as_str());
        out.push_str(&format!(
            "  {:<20} {:<10} {:<9} pow {:>3} acc {:>3} pp {:>2}\n",
            record.name,
            move_type,
            record.class,
            or_dash(record.power),
            or_dash(record.accuracy),
            or_dash(record.pp)
        ));
    }
    out
}

fn bucket_title(direction: Direction, bucket: &str) -> &'static str {
    match (direction, bucket) {
        (Direction::Defense, "terrible") => "Very weak to",
        (Direction::Defense, "bad") => "Weak to",
        (Direction::Defense, "good") => "Resists",
        (Direction::Defense, _) => "Strongly resists",
        (Direction::Offense, "terrible") => "Barely hits",
        (Direction::Offense, "bad") => "Not very effective on",
        (Direction::Offense, "good") => "Effective on",
        (Direction::Offense, _) => "Very effective on",
    }
}

/// The non-empty buckets of `result`, worst first.
pub fn matchups(direction: Direction, result: &Effectiveness) -> String {
    if result.is_neutral() {
        return "Neutral against every type\n".to_string();
    }
    let mut out = String::new();
    for (bucket, names) in result.buckets() {
        if !names.is_empty() {
            out.push_str(&format!("{}: {}\n", bucket_title(direction, bucket), names.join(", ")));
        }
    }
    out
}

pub fn team_report(report: &TeamReport) -> String {
    format!(
        "Defense\n{}\nOffense\n{}",
        matchups(Direction::Defense, &report.defense),
        matchups(Direction::Offense, &report.offense)
    )
}
