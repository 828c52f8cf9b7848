// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand handlers. Each prints plain text, or JSON with `--json`.

use cadenza_core::{ActionContext, CadenzaError, PluginManifest, Track, TrackAction};
use serde::Serialize;
use serde_json::json;

use crate::runtime::Runtime;

fn print_json<T: Serialize>(value: &T) -> Result<(), CadenzaError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CadenzaError::Internal(format!("failed to encode output: {e}")))?;
    println!("{text}");
    Ok(())
}

fn describe_track(track: &Track) -> String {
    match (&track.artist, &track.album) {
        (Some(artist), Some(album)) => format!("{}  {} / {}", track.title, artist, album),
        (Some(artist), None) => format!("{}  {}", track.title, artist),
        _ => track.title.clone(),
    }
}

/// Installable plugins with their registry status, if loaded.
pub async fn list_plugins(runtime: &Runtime, json: bool) -> Result<(), CadenzaError> {
    let mut rows = Vec::new();
    for entry in runtime.loader.manifests().list_all() {
        let loaded = runtime.registry.entry(entry.id()).await;
        rows.push(json!({
            "id": entry.manifest.id,
            "name": entry.manifest.name,
            "version": entry.manifest.version,
            "category": entry.manifest.category,
            "builtIn": entry.is_built_in,
            "status": loaded.as_ref().map(|e| e.status),
            "priority": loaded.as_ref().map(|e| e.priority),
        }));
    }

    if json {
        return print_json(&rows);
    }
    for row in &rows {
        let status = row["status"].as_str().unwrap_or("not loaded");
        println!(
            "{:<20} {:<10} {:<18} {}",
            row["id"].as_str().unwrap_or_default(),
            row["version"].as_str().unwrap_or_default(),
            row["category"].as_str().unwrap_or_default(),
            status
        );
    }
    Ok(())
}

pub fn search_plugins(runtime: &Runtime, query: &str, json: bool) -> Result<(), CadenzaError> {
    let found: Vec<&PluginManifest> = runtime
        .loader
        .manifests()
        .search(query)
        .into_iter()
        .map(|entry| &entry.manifest)
        .collect();

    if json {
        return print_json(&found);
    }
    if found.is_empty() {
        println!("no plugins match \"{query}\"");
    }
    for manifest in found {
        println!("{:<20} {}", manifest.id, manifest.description);
    }
    Ok(())
}

pub async fn load_plugin(runtime: &mut Runtime, id: &str, json: bool) -> Result<(), CadenzaError> {
    let result = runtime.loader.load_plugin(id, Default::default()).await;
    if let Some(error) = result.error {
        return Err(error);
    }
    runtime.rebind_actions().await;

    let status = runtime.registry.status(id).await;
    if json {
        return print_json(&json!({ "id": id, "status": status }));
    }
    match status {
        Some(status) => println!("{id}: {status}"),
        None => println!("{id}: not loaded"),
    }
    Ok(())
}

pub async fn search_tracks(
    runtime: &Runtime,
    query: &str,
    limit: usize,
    json: bool,
) -> Result<(), CadenzaError> {
    let tracks = runtime.search_tracks(query, limit).await?;
    if json {
        return print_json(&tracks);
    }
    for track in &tracks {
        println!("{:<40} {}", track.id, describe_track(track));
    }
    Ok(())
}

pub async fn resolve(runtime: &Runtime, track_id: &str, json: bool) -> Result<(), CadenzaError> {
    let track = runtime.lookup_track(track_id).await;
    let stream = runtime.playback.resolve_stream(&track).await?;
    if json {
        return print_json(&json!({ "track": track, "stream": stream }));
    }
    println!("{}", describe_track(&track));
    println!("  url:     {}", stream.url);
    println!("  format:  {}", stream.format);
    println!("  quality: {}", stream.quality);
    if let Some(expires_at) = stream.expires_at {
        println!("  expires: {expires_at}");
    }
    Ok(())
}

pub async fn list_actions(runtime: &Runtime, track_id: &str, json: bool) -> Result<(), CadenzaError> {
    let track = runtime.lookup_track(track_id).await;
    let actions = runtime.actions.get_actions(&track, ActionContext::Track).await?;
    if json {
        return print_json(&actions);
    }
    if actions.is_empty() {
        println!("no actions for {}", track.id);
    }
    for action in &actions {
        println!("{:<16} {:<16} {}", action.plugin_id, action.id, action.label);
    }
    Ok(())
}

pub async fn run_action(
    runtime: &Runtime,
    track_id: &str,
    action_id: &str,
    plugin_id: &str,
    json: bool,
) -> Result<(), CadenzaError> {
    let track = runtime.lookup_track(track_id).await;
    let offered = runtime.actions.get_actions(&track, ActionContext::Track).await?;
    let action = offered
        .into_iter()
        .find(|a| a.id == action_id && a.plugin_id == plugin_id)
        .unwrap_or_else(|| TrackAction::new(action_id, plugin_id, action_id));

    let outcome = runtime.actions.execute_action(&action, &track).await?;
    if json {
        return print_json(&json!({
            "handled": outcome.handled,
            "pluginId": outcome.plugin_id,
            "notice": outcome.notice.as_ref().map(|n| &n.message),
        }));
    }
    match (&outcome.plugin_id, &outcome.notice) {
        (Some(plugin_id), _) => println!("{} handled \"{}\"", plugin_id, action.label),
        (None, Some(notice)) => println!("{}", notice.message),
        (None, None) => println!("\"{}\" was not handled", action.label),
    }
    Ok(())
}
