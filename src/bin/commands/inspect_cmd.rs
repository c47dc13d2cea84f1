use anyhow::{Context, Result};
use devicematch::Dataset;
use serde_json::json;
use std::path::PathBuf;

pub fn cmd_inspect(dataset_path: PathBuf, json_output: bool, show_properties: bool) -> Result<()> {
    let dataset = Dataset::open(&dataset_path)
        .with_context(|| format!("Failed to load dataset: {}", dataset_path.display()))?;
    let info = dataset.info();
    let stats = dataset.stats();

    let components: Vec<_> = dataset
        .components()
        .iter()
        .map(|c| {
            let default_profile = dataset
                .profile(c.id, c.default_profile)
                .map_or(0, |p| p.profile_id);
            json!({
                "name": dataset.component_name(c),
                "headers": dataset.component_headers(c).collect::<Vec<_>>(),
                "min_length": c.min_length,
                "max_length": c.max_length,
                "default_profile": default_profile,
                "profiles": dataset.profiles(c).len(),
                "signatures": dataset.component_signatures(c).len(),
            })
        })
        .collect();

    if json_output {
        let mut output = json!({
            "file": dataset_path.display().to_string(),
            "info": info,
            "stats": stats,
            "http_headers": dataset.http_headers(),
            "components": components,
        });
        if show_properties {
            output["properties"] = serde_json::to_value(dataset.property_catalog())?;
        }
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Dataset:    {}", dataset_path.display());
    println!("Name:       {}", info.name);
    if !info.published.is_empty() {
        println!("Published:  {}", info.published);
    }
    println!("Format:     v{}", info.format_version);
    println!("Checksum:   {:016x}", info.checksum);
    println!();

    println!("Statistics:");
    println!("  Strings:     {}", stats.strings);
    println!("  Properties:  {}", stats.properties);
    println!("  Values:      {}", stats.values);
    println!("  Profiles:    {}", stats.profiles);
    println!("  Signatures:  {}", stats.signatures);
    println!("  Trie nodes:  {}", stats.nodes);
    println!();

    println!("Components:");
    for c in dataset.components() {
        let headers: Vec<&str> = dataset.component_headers(c).collect();
        println!("  {}", dataset.component_name(c));
        println!("    Headers:     {}", headers.join(", "));
        println!("    Length:      {}..{}", c.min_length, c.max_length);
        println!(
            "    Profiles:    {} ({} signatures)",
            dataset.profiles(c).len(),
            dataset.component_signatures(c).len()
        );
    }

    if show_properties {
        println!();
        println!("Properties:");
        for p in dataset.property_catalog() {
            let kind = if p.is_list {
                format!("{:?} list", p.value_type)
            } else {
                format!("{:?}", p.value_type)
            };
            print!("  {:<20} {:<18} {:<12}", p.name, p.component, kind);
            if let Some(default) = &p.default_value {
                print!(" default={}", default);
            }
            println!();
            if let Some(description) = &p.description {
                println!("    {}", description);
            }
        }
    }

    Ok(())
}
