use anyhow::{Context, Result};
use devicematch::Provider;
use serde_json::json;
use std::path::PathBuf;

use super::detect_cmd::properties_json;
use super::open_provider;

pub fn cmd_device_id(dataset: PathBuf, id: String, stable: bool, json_output: bool) -> Result<()> {
    let provider = open_provider(Provider::from(&dataset), &dataset)?;
    let decoded = if stable {
        provider.decode_stable_device_id(&id)
    } else {
        provider.decode_device_id(&id)
    };
    let detection = decoded.with_context(|| format!("Cannot decode device id '{}'", id))?;

    if json_output {
        let output = json!({
            "device_id": detection.device_id(),
            "stable_device_id": detection.stable_device_id(),
            "device_class": detection.device_class(),
            "properties": properties_json(&detection)?,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Device id:  {}", detection.device_id());
    println!("Stable id:  {}", detection.stable_device_id());
    println!("Class:      {}", detection.device_class());
    println!();
    println!("Properties:");
    for (name, value) in detection.values() {
        println!("  {:<20} {}", name, value);
    }
    Ok(())
}
