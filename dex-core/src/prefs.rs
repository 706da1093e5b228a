//! Last-used browser state, restored on the next start.

use crate::persist::{write_atomic, PersistError};
use crate::search::CreatureFilter;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// File name of the preferences inside the cache directory.
pub const PREFS_FILE: &str = "startup.json";

/// Which view was open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Creatures,
    Weakness,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub filter: CreatureFilter,
}

impl Preferences {
    pub fn new(mode: Mode, filter: CreatureFilter) -> Self {
        Self { mode, filter }
    }

    /// Load saved preferences.
    ///
    /// A missing or unreadable file yields `None`; preferences are never
    /// worth failing startup over.
    pub async fn load(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Could not read {}: {e}", path.display());
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(prefs) => {
                info!("Loaded previous filters from {}", path.display());
                Some(prefs)
            }
            Err(e) => {
                warn!("Ignoring malformed {}: {e}", path.display());
                None
            }
        }
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        write_atomic(path, content.as_bytes()).await
    }

    /// Drop filter values that name no known type or generation.
    pub fn sanitize<'a>(
        mut self,
        type_names: &[&str],
        generations: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let generations: Vec<&str> = generations.into_iter().collect();
        let filter = &mut self.filter;

        for slot in [&mut filter.primary, &mut filter.secondary] {
            if slot.as_deref().is_some_and(|t| !type_names.contains(&t)) {
                warn!("Dropping saved type filter {:?}", slot);
                *slot = None;
            }
        }
        if filter
            .generation
            .as_deref()
            .is_some_and(|g| !generations.contains(&g))
        {
            warn!("Dropping saved generation filter {:?}", filter.generation);
            filter.generation = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SortOrder;
    use tempfile::tempdir;

    fn saved() -> Preferences {
        Preferences::new(
            Mode::Weakness,
            CreatureFilter::new()
                .with_name("char")
                .with_primary("Fire")
                .with_generation("I")
                .sorted_by(SortOrder::Name),
        )
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(PREFS_FILE);

        saved().save(&path).await.unwrap();
        assert_eq!(Preferences::load(&path).await, Some(saved()));
    }

    #[tokio::test]
    async fn test_missing_or_malformed_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(PREFS_FILE);
        assert_eq!(Preferences::load(&path).await, None);

        std::fs::write(&path, "mode:name:primary").unwrap();
        assert_eq!(Preferences::load(&path).await, None);
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(PREFS_FILE);
        std::fs::write(&path, r#"{"mode": "weakness"}"#).unwrap();

        let prefs = Preferences::load(&path).await.unwrap();
        assert_eq!(prefs.mode, Mode::Weakness);
        assert_eq!(prefs.filter, CreatureFilter::default());
    }

    #[test]
    fn test_sanitize() {
        let mut prefs = saved();
        prefs.filter.secondary = Some("Shadow".to_string());

        let clean = prefs.sanitize(&["Fire", "Water"], ["II"]);
        assert_eq!(clean.filter.primary.as_deref(), Some("Fire"));
        assert_eq!(clean.filter.secondary, None);
        assert_eq!(clean.filter.generation, None);
        assert_eq!(clean.filter.name.as_deref(), Some("char"));
        assert_eq!(clean.mode, Mode::Weakness);
    }
}
