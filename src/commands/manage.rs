use anyhow::{Context, Result};

use ez_redirect::config::Config;

use super::open_service;

/// Print the current redirect, security and schedule state
pub fn status(config: Config) -> Result<()> {
    let service = open_service(&config)?;
    let state = service.state();
    let info = state.info()?;
    let security = state.security_info();
    let remote = state.remote_config();

    println!("Redirect Status");
    println!("===============");
    println!("  Current URL: {}", info.current_url);
    println!("  Default URL: {}", info.default_url);
    if let Some(expires) = state.expires_at() {
        println!("  Temporary until: {}", expires.to_rfc3339());
    }
    println!("  Port: {}", state.port());
    println!();

    let presets = state.presets();
    println!("Presets ({}):", presets.len());
    for preset in &presets {
        let cue = if preset.cue.is_some() { " [cue]" } else { "" };
        println!("  {:<24} {}{}", preset.name, preset.url, cue);
    }
    println!();

    println!(
        "API key: {}",
        if security.api_key_enabled {
            "required"
        } else {
            "not required"
        }
    );
    println!(
        "Remote API: {}",
        if remote.is_configured() {
            remote.url.as_str()
        } else {
            "not configured"
        }
    );
    println!();

    let schedule = state.schedule_snapshot();
    println!("Recurring events ({}):", schedule.recurring.len());
    for event in &schedule.recurring {
        let enabled = if event.enabled { "" } else { " (disabled)" };
        println!("  {} {}{}", event.day, event.time, enabled);
    }
    println!("Manual events ({}):", schedule.manual.len());
    for event in &schedule.manual {
        let created = if event.created { " (created)" } else { "" };
        println!("  {} {}{}", event.date, event.time, created);
    }

    Ok(())
}

/// Replace the API key with a fresh random one and print it
pub fn rotate_key(config: Config) -> Result<()> {
    let service = open_service(&config)?;
    let key = service
        .state()
        .regenerate_api_key()
        .context("Failed to store new API key")?;

    tracing::info!("API key regenerated");
    println!("New API key: {key}");
    println!("Update every NFC tag that uses /preset/<name>?key=...");
    Ok(())
}

/// Activate a preset and post its cue
pub async fn activate(config: Config, name: String) -> Result<()> {
    let service = open_service(&config)?;
    let activation = service
        .activate_preset(&name)
        .await
        .with_context(|| format!("Failed to activate preset '{name}'"))?;

    println!("Active preset: {}", activation.active_preset);
    println!("Redirecting to: {}", activation.active_url);
    match activation.cue_outcome.error() {
        None => println!("Cue posted for event {}", activation.cue_outcome.event_id()),
        Some(e) => println!("Cue not posted: {e}"),
    }
    Ok(())
}

/// Create today's remote event immediately
pub async fn create_event(config: Config) -> Result<()> {
    let service = open_service(&config)?;
    let event_id = service
        .create_event_now()
        .await
        .context("Failed to create event")?;

    println!("Created event {event_id}");
    Ok(())
}
