//! Preset registry
//!
//! Names are unique under case-insensitive comparison with dashes read as
//! spaces, so "giving-tuesday" finds "Giving Tuesday". The stored name keeps
//! the casing it was last written with.

use super::redirect::validate_url;
use super::RedirectState;
use crate::error::{Error, Result};
use crate::models::{CuePayload, Preset};

/// Canonical form used to compare preset names
pub fn normalize_name(name: &str) -> String {
    name.trim().replace('-', " ").to_lowercase()
}

fn position(presets: &[Preset], name: &str) -> Option<usize> {
    let wanted = normalize_name(name);
    presets.iter().position(|p| normalize_name(&p.name) == wanted)
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::missing("name"));
    }
    Ok(trimmed.to_string())
}

impl RedirectState {
    /// All presets in insertion order
    pub fn presets(&self) -> Vec<Preset> {
        self.lock().presets.clone()
    }

    /// Look up a preset by display name or slug
    pub fn preset(&self, name: &str) -> Option<Preset> {
        let inner = self.lock();
        position(&inner.presets, name).map(|i| inner.presets[i].clone())
    }

    /// Insert a preset, or overwrite the one with an equivalent name
    ///
    /// An overwritten preset keeps its position but takes the new spelling.
    pub fn upsert_preset(&self, name: &str, url: &str, cue: Option<CuePayload>) -> Result<()> {
        let name = validate_name(name)?;
        let url = validate_url(url)?;

        let mut inner = self.lock();
        let mut draft = inner.presets.clone();
        let index = match position(&draft, &name) {
            Some(index) => {
                draft[index] = Preset::new(name, url, cue);
                index
            }
            None => {
                draft.push(Preset::new(name, url, cue));
                draft.len() - 1
            }
        };
        let replaced = index < inner.presets.len();
        self.commit_presets(&mut inner, draft)?;

        tracing::info!(preset = %inner.presets[index].name, replaced, "Preset saved");
        Ok(())
    }

    /// Remove a preset; returns false when no such preset exists
    pub fn delete_preset(&self, name: &str) -> Result<bool> {
        let mut inner = self.lock();
        let Some(index) = position(&inner.presets, name) else {
            return Ok(false);
        };

        let mut draft = inner.presets.clone();
        let removed = draft.remove(index);
        self.commit_presets(&mut inner, draft)?;

        tracing::info!(preset = %removed.name, "Preset deleted");
        Ok(true)
    }

    /// Give a preset a new display name, keeping its URL, cue and position
    ///
    /// Returns false when `old_name` does not exist. Renaming onto the name
    /// of a different preset is rejected.
    pub fn rename_preset(&self, old_name: &str, new_name: &str) -> Result<bool> {
        let new_name = validate_name(new_name)?;

        let mut inner = self.lock();
        let Some(index) = position(&inner.presets, old_name) else {
            return Ok(false);
        };
        if let Some(other) = position(&inner.presets, &new_name) {
            if other != index {
                return Err(Error::validation(format!(
                    "Preset '{}' already exists",
                    inner.presets[other].name
                )));
            }
        }

        let mut draft = inner.presets.clone();
        let previous = std::mem::replace(&mut draft[index].name, new_name);
        self.commit_presets(&mut inner, draft)?;

        tracing::info!(from = %previous, to = %inner.presets[index].name, "Preset renamed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::temp_state;
    use crate::storage::DocumentStore;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Giving Tuesday"), "giving tuesday");
        assert_eq!(normalize_name("giving-tuesday"), "giving tuesday");
        assert_eq!(normalize_name(" GIVING-Tuesday "), "giving tuesday");
    }

    #[test]
    fn test_lookup_by_slug() {
        let (_dir, _clock, state) = temp_state();
        state
            .upsert_preset("Giving Tuesday", "https://give.example", None)
            .unwrap();

        let found = state.preset("giving-tuesday").unwrap();
        assert_eq!(found.name, "Giving Tuesday");
        assert_eq!(found.url, "https://give.example");
        assert!(state.preset("easter").is_none());
    }

    #[test]
    fn test_upsert_overwrites_in_place() {
        let (_dir, _clock, state) = temp_state();
        state.upsert_preset("One", "https://1.example", None).unwrap();
        state.upsert_preset("Two", "https://2.example", None).unwrap();
        state.upsert_preset("one", "https://uno.example", None).unwrap();

        let presets = state.presets();
        assert_eq!(presets.len(), 2);
        assert_eq!(presets[0].name, "one");
        assert_eq!(presets[0].url, "https://uno.example");
        assert_eq!(presets[1].name, "Two");
    }

    #[test]
    fn test_upsert_validates() {
        let (_dir, _clock, state) = temp_state();
        assert!(matches!(
            state.upsert_preset("", "https://x.example", None),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            state.upsert_preset("X", "", None),
            Err(Error::Validation(_))
        ));
        assert!(state.presets().is_empty());
    }

    #[test]
    fn test_delete_missing_returns_false() {
        let (_dir, _clock, state) = temp_state();
        assert!(!state.delete_preset("ghost").unwrap());

        state.upsert_preset("Ghost", "https://g.example", None).unwrap();
        assert!(state.delete_preset("ghost").unwrap());
        assert!(state.presets().is_empty());
    }

    #[test]
    fn test_rename_keeps_url_cue_and_position() {
        let (dir, _clock, state) = temp_state();
        let cue = CuePayload {
            headline: "Welcome".to_string(),
            ..Default::default()
        };
        state.upsert_preset("A", "https://a.example", None).unwrap();
        state
            .upsert_preset("B", "https://b.example", Some(cue.clone()))
            .unwrap();
        state.upsert_preset("C", "https://c.example", None).unwrap();

        assert!(state.rename_preset("b", "Bee").unwrap());

        let names: Vec<_> = state.presets().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["A", "Bee", "C"]);
        let renamed = state.preset("bee").unwrap();
        assert_eq!(renamed.url, "https://b.example");
        assert_eq!(renamed.cue, Some(cue));

        let on_disk = DocumentStore::new(dir.path()).load_presets();
        assert_eq!(on_disk.presets, state.presets());
    }

    #[test]
    fn test_rename_collision_and_missing() {
        let (_dir, _clock, state) = temp_state();
        state.upsert_preset("A", "https://a.example", None).unwrap();
        state.upsert_preset("B", "https://b.example", None).unwrap();

        assert!(!state.rename_preset("Z", "Y").unwrap());
        assert!(matches!(
            state.rename_preset("A", "b"),
            Err(Error::Validation(_))
        ));
        // Changing only the casing of a name is allowed
        assert!(state.rename_preset("A", "a").unwrap());
        assert_eq!(state.presets()[0].name, "a");
    }

    proptest! {
        #[test]
        fn prop_names_stay_unique(names in proptest::collection::vec("[A-Za-z -]{1,8}", 1..12)) {
            let (_dir, _clock, state) = temp_state();
            for name in &names {
                if name.trim().is_empty() {
                    continue;
                }
                state.upsert_preset(name, "https://p.example", None).unwrap();
            }

            let normalized: Vec<_> = state
                .presets()
                .iter()
                .map(|p| normalize_name(&p.name))
                .collect();
            let mut deduped = normalized.clone();
            deduped.sort();
            deduped.dedup();
            prop_assert_eq!(deduped.len(), normalized.len());
        }
    }
}
