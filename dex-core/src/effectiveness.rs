//! Type effectiveness buckets for a set of types.
//!
//! Every known type starts at a score of zero. Each input type then nudges
//! the scores of the types it relates to, and the totals are bucketed:
//!
//! | score      | bucket     |
//! |------------|------------|
//! | `<= -2`    | `terrible` |
//! | `-1`       | `bad`      |
//! | `0`        | (omitted)  |
//! | `1`        | `good`     |
//! | `>= 2`     | `great`    |

use crate::model::{TypeRecord, Types};
use crate::names::proper_word;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which side of the damage relations to score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// How well the input types hold up against each attacking type.
    Defense,
    /// How well the input types hit each defending type.
    Offense,
}

/// Type names bucketed by score, each bucket sorted alphabetically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effectiveness {
    pub terrible: Vec<String>,
    pub bad: Vec<String>,
    pub good: Vec<String>,
    pub great: Vec<String>,
    /// Input names that matched no known type.
    pub unknown: Vec<String>,
}

impl Effectiveness {
    /// Whether no type landed in any bucket.
    pub fn is_neutral(&self) -> bool {
        self.terrible.is_empty() && self.bad.is_empty() && self.good.is_empty() && self.great.is_empty()
    }

    /// The four buckets with their labels, worst first.
    pub fn buckets(&self) -> [(&'static str, &[String]); 4] {
        [
            ("terrible", &self.terrible),
            ("bad", &self.bad),
            ("good", &self.good),
            ("great", &self.great),
        ]
    }
}

fn nudge(scores: &mut HashMap<String, i32>, names: &[String], delta: i32) {
    for name in names {
        if let Some(score) = scores.get_mut(name) {
            *score += delta;
        }
    }
}

fn score(scores: &mut HashMap<String, i32>, record: &TypeRecord, direction: Direction) {
    match direction {
        Direction::Defense => {
            nudge(scores, &record.double_damage_from, -1);
            nudge(scores, &record.half_damage_from, 1);
            nudge(scores, &record.no_damage_from, 2);
        }
        Direction::Offense => {
            nudge(scores, &record.double_damage_to, 1);
            nudge(scores, &record.half_damage_to, -1);
            nudge(scores, &record.no_damage_to, -2);
        }
    }
}

/// Score and bucket every type in `types` against `names`.
///
/// Names are canonicalized before lookup. Repeated names count once per
/// occurrence, so two members of the same type stack. Names that match no
/// type are reported in [`Effectiveness::unknown`] instead of failing the
/// call.
pub fn classify<I, S>(types: &Types, names: I, direction: Direction) -> Effectiveness
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut scores: HashMap<String, i32> = types.names().map(|name| (name.to_string(), 0)).collect();
    let mut result = Effectiveness::default();

    for raw in names {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            continue;
        }

        match types.resolve(&proper_word(raw)) {
            Ok(id) => {
                if let Some(record) = types.get(id) {
                    score(&mut scores, record, direction);
                }
            }
            Err(_) => {
                warn!("Skipping unknown type '{raw}'");
                result.unknown.push(raw.to_string());
            }
        }
    }

    for (name, total) in scores {
        let bucket = match total {
            s if s <= -2 => &mut result.terrible,
            -1 => &mut result.bad,
            0 => continue,
            1 => &mut result.good,
            _ => &mut result.great,
        };
        bucket.push(name);
    }

    for bucket in [
        &mut result.terrible,
        &mut result.bad,
        &mut result.good,
        &mut result.great,
    ] {
        bucket.sort();
    }
    result
}
