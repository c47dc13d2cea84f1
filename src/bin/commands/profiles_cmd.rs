use anyhow::{Context, Result};
use devicematch::{find_profiles, narrow_profiles, Dataset};
use serde_json::json;
use std::path::PathBuf;

pub fn cmd_profiles(
    dataset_path: PathBuf,
    property: String,
    value: String,
    and: Vec<String>,
    json_output: bool,
) -> Result<()> {
    let dataset = Dataset::open(&dataset_path)
        .with_context(|| format!("Failed to load dataset: {}", dataset_path.display()))?;

    let mut profiles = find_profiles(&dataset, &property, &value)?;
    for filter in &and {
        let (name, wanted) = filter
            .split_once('=')
            .with_context(|| format!("Invalid filter '{}': expected PROPERTY=VALUE", filter))?;
        profiles = narrow_profiles(&dataset, &profiles, name.trim(), wanted.trim())?;
    }

    if json_output {
        let entries: Vec<_> = profiles
            .iter()
            .map(|p| {
                let component = dataset
                    .component(p.component)
                    .map(|c| dataset.component_name(c));
                json!({
                    "profile_id": p.profile_id,
                    "index": p.index,
                    "component": component,
                })
            })
            .collect();
        let output = json!({
            "property": property,
            "value": value,
            "filters": and,
            "count": entries.len(),
            "profiles": entries,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if profiles.is_empty() {
        println!("No profiles with {} = {}", property, value);
        return Ok(());
    }
    println!("{} profile(s) with {} = {}:", profiles.len(), property, value);
    for p in &profiles {
        let component = dataset
            .component(p.component)
            .map_or("?", |c| dataset.component_name(c));
        println!("  {:<8} {} (index {})", p.profile_id, component, p.index);
    }
    Ok(())
}
