use anyhow::Result;
use devicematch::{Dataset, Error};
use serde_json::json;
use std::path::PathBuf;
use std::time::Instant;

/// Non-fatal oddities in a dataset that loaded cleanly
fn warnings(dataset: &Dataset) -> Vec<String> {
    let mut warnings = Vec::new();
    for component in dataset.components() {
        let name = dataset.component_name(component);
        if dataset.component_signatures(component).is_empty() {
            warnings.push(format!(
                "component {} has no signatures; it always matches its default profile",
                name
            ));
        }
        if dataset.profiles(component).len() <= 1 {
            warnings.push(format!("component {} has no profiles", name));
        }
    }
    for property in dataset.properties() {
        if dataset.property_values(property).is_empty() && property.default_value.is_none() {
            warnings.push(format!(
                "property {} has no values and no default",
                dataset.property_name(property)
            ));
        }
    }
    warnings
}

pub fn cmd_validate(dataset_path: PathBuf, json_output: bool) -> Result<()> {
    let start = Instant::now();
    let loaded = match Dataset::open(&dataset_path) {
        Ok(dataset) => Ok(dataset),
        Err(e) if e.is_format() => Err(e),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to read dataset: {}", dataset_path.display())))
        }
    };
    let duration = start.elapsed();

    let (error, warnings, stats): (Option<Error>, Vec<String>, _) = match loaded {
        Ok(dataset) => (None, warnings(&dataset), Some(dataset.stats())),
        Err(e) => (Some(e), Vec::new(), None),
    };
    let valid = error.is_none();

    if json_output {
        let output = json!({
            "dataset": dataset_path.display().to_string(),
            "is_valid": valid,
            "duration_ms": duration.as_millis(),
            "error": error.as_ref().map(|e| e.to_string()),
            "warnings": warnings,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Validating: {}", dataset_path.display());
        println!("  Load time: {:.2}ms", duration.as_secs_f64() * 1000.0);
        if let Some(stats) = &stats {
            println!(
                "  {} components, {} properties, {} profiles, {} signatures, {} nodes",
                stats.components, stats.properties, stats.profiles, stats.signatures, stats.nodes
            );
        }
        println!();

        if !warnings.is_empty() {
            println!("⚠️  WARNINGS ({}):", warnings.len());
            for warning in &warnings {
                println!("  • {}", warning);
            }
            println!();
        }

        match &error {
            None => {
                println!("✅ VALIDATION PASSED");
                println!("   Dataset is safe to use.");
            }
            Some(e) => {
                println!("❌ VALIDATION FAILED");
                println!("   {}", e);
            }
        }
    }

    if valid {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
