//! Redirect state persistence tests
//!
//! Every mutation must be on disk before it is visible, and a restart must
//! see exactly what the previous process saw.

mod common;

use chrono::Duration;
use serde_json::{json, Value};
use std::fs;

use common::Harness;
use ez_redirect::error::Error;
use ez_redirect::models::{CuePayload, DEFAULT_URL};
use ez_redirect::storage::{CONFIG_FILE, PRESETS_FILE};

fn read_json(h: &Harness, file: &str) -> Value {
    let text = fs::read_to_string(h.dir.path().join(file)).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn test_fresh_install_writes_config_document() {
    let h = Harness::new();
    let doc = read_json(&h, CONFIG_FILE);

    assert_eq!(doc["default_url"], DEFAULT_URL);
    assert_eq!(doc["current_url"], DEFAULT_URL);
    assert_eq!(doc["port"], 8000);
    assert_eq!(doc["api_key_enabled"], false);
    assert_eq!(doc["api_key"].as_str().unwrap().len(), 32);
    assert_eq!(doc["scheduled_events"], json!([]));
}

#[test]
fn test_state_survives_restart() {
    let mut h = Harness::new();
    h.state.set_default_url("https://home.example").unwrap();
    h.state.set_temporary_url("https://event.example", 3600).unwrap();
    h.state.set_api_key("K1").unwrap();
    h.state.set_api_key_enabled(true).unwrap();
    h.state
        .set_remote_config("https://proj.supabase.co", "secret")
        .unwrap();
    h.state.add_scheduled_event("sunday", "10:00", true).unwrap();
    h.state
        .upsert_preset("Welcome", "https://w.example", None)
        .unwrap();
    let cue = CuePayload {
        headline: "Give".to_string(),
        ..Default::default()
    };
    h.state
        .upsert_preset("Giving", "https://give.example", Some(cue.clone()))
        .unwrap();

    h.restart();

    let info = h.state.info().unwrap();
    assert_eq!(info.current_url, "https://event.example");
    assert!(info.is_temporary);
    assert!(h.state.authorize(Some("K1")).is_ok());
    assert!(h.state.remote_config().is_configured());
    assert_eq!(h.state.scheduled_events().len(), 1);

    let presets = h.state.presets();
    assert_eq!(presets.len(), 2);
    assert_eq!(presets[0].name, "Welcome");
    assert_eq!(presets[1].cue, Some(cue));
}

#[test]
fn test_expiry_applies_after_restart() {
    let mut h = Harness::new();
    h.state.set_temporary_url("https://event.example", 60).unwrap();
    h.clock.advance(Duration::minutes(5));

    h.restart();
    assert_eq!(h.state.current_url().unwrap(), DEFAULT_URL);

    let doc = read_json(&h, CONFIG_FILE);
    assert_eq!(doc["current_url"], DEFAULT_URL);
    assert_eq!(doc["expires_at"], Value::Null);
}

#[test]
fn test_legacy_presets_are_upgraded_on_load() {
    let mut h = Harness::new();
    fs::write(
        h.dir.path().join(PRESETS_FILE),
        r#"{"Sunday": "https://sunday.example", "Broken": 7, "Give": {"url": "https://give.example", "cue": null}}"#,
    )
    .unwrap();

    h.restart();

    let names: Vec<String> = h.state.presets().into_iter().map(|p| p.name).collect();
    assert_eq!(names, ["Sunday", "Give"]);

    let doc = read_json(&h, PRESETS_FILE);
    assert_eq!(
        doc,
        json!({
            "Sunday": {"url": "https://sunday.example", "cue": null},
            "Give": {"url": "https://give.example", "cue": null},
        })
    );
}

#[test]
fn test_duplicate_preset_names_collapse_on_load() {
    let mut h = Harness::new();
    fs::write(
        h.dir.path().join(PRESETS_FILE),
        r#"{"Sunday": {"url": "https://first.example", "cue": null}, "sunday": {"url": "https://second.example", "cue": null}}"#,
    )
    .unwrap();

    h.restart();

    let presets = h.state.presets();
    assert_eq!(presets.len(), 1);
    assert_eq!(presets[0].url, "https://first.example");
    assert_eq!(
        read_json(&h, PRESETS_FILE),
        json!({"Sunday": {"url": "https://first.example", "cue": null}})
    );

    // Deleting by name leaves nothing behind to resurface on the next load
    assert!(h.state.delete_preset("SUNDAY").unwrap());
    h.restart();
    assert!(h.state.presets().is_empty());
    assert!(h.state.preset("sunday").is_none());
}

#[test]
fn test_corrupt_config_falls_back_to_defaults() {
    let mut h = Harness::new();
    fs::write(h.dir.path().join(CONFIG_FILE), "{not json").unwrap();

    h.restart();
    assert_eq!(h.state.current_url().unwrap(), DEFAULT_URL);
    assert_eq!(h.state.port(), 8000);
}

#[test]
fn test_preset_lookup_ignores_case_and_dashes() {
    let h = Harness::new();
    h.state
        .upsert_preset("Giving Tuesday", "https://give.example", None)
        .unwrap();

    assert!(h.state.preset("giving-tuesday").is_some());
    assert!(h.state.preset("  GIVING TUESDAY ").is_some());
    assert!(h.state.preset("giving").is_none());

    h.state
        .upsert_preset("Other", "https://other.example", None)
        .unwrap();
    let err = h.state.rename_preset("other", "giving-tuesday").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}
