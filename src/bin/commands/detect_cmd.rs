use anyhow::Result;
use devicematch::Detection;
use serde_json::{json, Map, Value as JsonValue};
use std::path::PathBuf;

use super::{open_provider, opener, parse_header, MatchArgs};

pub fn cmd_detect(
    dataset: PathBuf,
    user_agent: Option<String>,
    headers: Vec<String>,
    properties: Vec<String>,
    json_output: bool,
    matching: MatchArgs,
) -> Result<()> {
    let headers = headers
        .iter()
        .map(|raw| parse_header(raw))
        .collect::<Result<Vec<_>>>()?;

    let provider = open_provider(
        opener(&dataset, &properties).config(matching.config()),
        &dataset,
    )?;
    let detection = provider.detect_with_headers(user_agent.as_deref(), &headers);

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&detection_json(&detection)?)?
        );
    } else {
        print_detection(&detection, user_agent.as_deref());
    }
    Ok(())
}

/// Full JSON rendering of a detection
pub fn detection_json(detection: &Detection) -> Result<JsonValue> {
    let dataset = detection.dataset();
    let matched = detection.matched();

    let components: Vec<JsonValue> = matched
        .components()
        .iter()
        .map(|c| {
            let component = dataset.component(c.component);
            json!({
                "component": component.map(|comp| dataset.component_name(comp)),
                "profile_id": matched.profile(dataset, c.component).map(|p| p.profile_id),
                "method": c.method,
                "rank": c.rank,
                "distance": c.distance,
                "candidates": c.candidates,
            })
        })
        .collect();

    Ok(json!({
        "user_agent": matched.user_agent(),
        "method": detection.method(),
        "device_class": detection.device_class(),
        "device_id": detection.device_id(),
        "stable_device_id": detection.stable_device_id(),
        "distance": matched.distance(),
        "candidates": matched.candidates(),
        "components": components,
        "properties": properties_json(detection)?,
    }))
}

/// Property name -> value map; unavailable properties become null
pub fn properties_json(detection: &Detection) -> Result<JsonValue> {
    let mut map = Map::new();
    for (name, value) in detection.values() {
        map.insert(name.to_string(), serde_json::to_value(&value)?);
    }
    Ok(JsonValue::Object(map))
}

fn print_detection(detection: &Detection, user_agent: Option<&str>) {
    let dataset = detection.dataset();
    let matched = detection.matched();

    println!("User-Agent: {}", user_agent.unwrap_or("(none)"));
    println!("Method:     {}", detection.method());
    println!("Class:      {}", detection.device_class());
    println!("Device id:  {}", detection.device_id());
    println!("Stable id:  {}", detection.stable_device_id());
    println!(
        "Distance:   {} ({} candidates)",
        matched.distance(),
        matched.candidates()
    );
    println!();

    println!("Components:");
    for c in matched.components() {
        let name = dataset
            .component(c.component)
            .map_or("?", |comp| dataset.component_name(comp));
        let profile_id = matched
            .profile(dataset, c.component)
            .map_or(0, |p| p.profile_id);
        println!(
            "  {:<20} profile {:<8} {} (rank {})",
            name, profile_id, c.method, c.rank
        );
    }
    println!();

    println!("Properties:");
    for (name, value) in detection.values() {
        println!("  {:<20} {}", name, value);
    }
}
