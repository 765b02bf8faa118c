//! Preset document decoding
//!
//! The preset document is a JSON object mapping display names to records, in
//! insertion order. Older installs stored a bare URL string per name; those
//! entries are upgraded here, at the persistence boundary, so the rest of the
//! crate only ever sees [`Preset`] values.
//!
//! Accepted record shapes:
//!
//! | Shape | Result |
//! |-------|--------|
//! | `"https://..."` | `{url, cue: null}` (legacy upgrade) |
//! | `{"url": "...", "cue": {...} \| null}` | kept |
//! | anything else | dropped |
//!
//! A record whose name normalizes to an earlier one is dropped as well.

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::models::{CuePayload, Preset};
use crate::state::normalize_name;

/// Outcome of decoding a preset document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedPresets {
    /// Valid presets in document order
    pub presets: Vec<Preset>,

    /// Legacy string records upgraded to objects
    pub upgraded: usize,

    /// Records dropped because they carried no URL or repeated a name
    pub dropped: usize,
}

impl DecodedPresets {
    /// Whether the decoded set differs from what is on disk
    pub fn needs_rewrite(&self) -> bool {
        self.upgraded > 0 || self.dropped > 0
    }
}

/// Decode a parsed preset document
pub fn decode(document: Value) -> DecodedPresets {
    let mut decoded = DecodedPresets::default();

    let Value::Object(entries) = document else {
        tracing::warn!("Preset document is not a JSON object, ignoring it");
        return decoded;
    };

    let mut seen = HashSet::new();
    for (name, record) in entries {
        let preset = match record {
            Value::String(url) => {
                decoded.upgraded += 1;
                Preset::new(name, url, None)
            }
            Value::Object(mut fields) => match fields.remove("url") {
                Some(Value::String(url)) => {
                    let cue = decode_cue(&name, fields.remove("cue"));
                    Preset::new(name, url, cue)
                }
                _ => {
                    tracing::warn!(preset = %name, "Dropping preset without a 'url' field");
                    decoded.dropped += 1;
                    continue;
                }
            },
            _ => {
                tracing::warn!(preset = %name, "Dropping malformed preset record");
                decoded.dropped += 1;
                continue;
            }
        };

        // Names that only differ by case or dashes collide; the first one wins
        if !seen.insert(normalize_name(&preset.name)) {
            tracing::warn!(preset = %preset.name, "Dropping preset with a duplicate name");
            decoded.dropped += 1;
            continue;
        }
        decoded.presets.push(preset);
    }

    decoded
}

fn decode_cue(name: &str, cue: Option<Value>) -> Option<CuePayload> {
    match cue {
        None | Some(Value::Null) => None,
        Some(value) => match serde_json::from_value(value) {
            Ok(cue) => Some(cue),
            Err(e) => {
                tracing::warn!(preset = %name, error = %e, "Ignoring unreadable cue");
                None
            }
        },
    }
}

/// Encode presets as an ordered `name -> {url, cue}` object
pub fn encode(presets: &[Preset]) -> Value {
    let mut map = Map::with_capacity(presets.len());
    for preset in presets {
        let record = serde_json::json!({
            "url": preset.url,
            "cue": preset.cue,
        });
        map.insert(preset.name.clone(), record);
    }
    Value::Object(map)
}
