//! Teams for the weakness calculator.
//!
//! A team is six slots of (primary, secondary) type names. On disk it is the
//! twelve names joined by `:`, empty names included, on a single line.

use crate::effectiveness::{classify, Direction, Effectiveness};
use crate::model::Types;
use crate::persist::{write_atomic, PersistError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Members per team.
pub const TEAM_SIZE: usize = 6;

const FIELD_SEPARATOR: char = ':';

/// One team member's types. Empty strings mean "not chosen".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSlot {
    pub primary: String,
    pub secondary: String,
}

impl TeamSlot {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.secondary.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    slots: Vec<TeamSlot>,
}

impl Default for Team {
    fn default() -> Self {
        Self {
            slots: vec![TeamSlot::default(); TEAM_SIZE],
        }
    }
}

impl Team {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a team from up to [`TEAM_SIZE`] slots; missing slots stay empty.
    pub fn from_slots(slots: impl IntoIterator<Item = TeamSlot>) -> Self {
        let mut team = Self::new();
        for (index, slot) in slots.into_iter().take(TEAM_SIZE).enumerate() {
            team.slots[index] = slot;
        }
        team
    }

    pub fn slots(&self) -> &[TeamSlot] {
        &self.slots
    }

    /// Replace slot `index`. Returns `false` when it is out of range.
    pub fn set(&mut self, index: usize, slot: TeamSlot) -> bool {
        match self.slots.get_mut(index) {
            Some(existing) => {
                *existing = slot;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = TeamSlot::default());
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(TeamSlot::is_empty)
    }

    /// Every member's types, in slot order.
    ///
    /// Empty names are skipped, and a primary equal to its secondary is
    /// listed once. The same type on two members is listed twice.
    pub fn types(&self) -> Vec<&str> {
        let mut types = Vec::new();
        for slot in &self.slots {
            if !slot.primary.is_empty() && slot.primary != slot.secondary {
                types.push(slot.primary.as_str());
            }
            if !slot.secondary.is_empty() {
                types.push(slot.secondary.as_str());
            }
        }
        types
    }

    /// Parse the on-disk form.
    pub fn parse(text: &str) -> Result<Self, PersistError> {
        let line = text.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();

        if fields.len() != TEAM_SIZE * 2 {
            return Err(PersistError::InvalidFormat(format!(
                "expected {} team fields, found {}",
                TEAM_SIZE * 2,
                fields.len()
            )));
        }

        Ok(Self::from_slots(
            fields
                .chunks(2)
                .map(|pair| TeamSlot::new(pair[0], pair[1])),
        ))
    }

    /// The on-disk form.
    pub fn format(&self) -> String {
        self.slots
            .iter()
            .flat_map(|slot| [slot.primary.as_str(), slot.secondary.as_str()])
            .map(|name| name.replace(FIELD_SEPARATOR, ""))
            .collect::<Vec<_>>()
            .join(":")
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        write_atomic(path.as_ref(), self.format().as_bytes()).await
    }
}

/// Both sides of a team's matchups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamReport {
    pub defense: Effectiveness,
    pub offense: Effectiveness,
}

impl TeamReport {
    /// Score `team` against `types`. `None` when the team names no type.
    pub fn compute(types: &Types, team: &Team) -> Option<Self> {
        let members = team.types();
        if members.is_empty() {
            return None;
        }

        Some(Self {
            defense: classify(types, &members, Direction::Defense),
            offense: classify(types, &members, Direction::Offense),
        })
    }
}
