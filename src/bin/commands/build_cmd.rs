use anyhow::{Context, Result};
use devicematch::{Dataset, Source};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

pub fn cmd_build(source: PathBuf, output: PathBuf, gzip: bool, json_output: bool) -> Result<()> {
    let start = Instant::now();

    let description = Source::from_file(&source)
        .with_context(|| format!("Failed to read source: {}", source.display()))?;
    let builder = description
        .to_builder()
        .with_context(|| format!("Invalid source: {}", source.display()))?;
    let stats = builder.stats();
    let snapshot = builder.build().context("Failed to build snapshot")?;

    // Load what was just built so a bad snapshot never reaches disk
    let dataset = Dataset::from_bytes(&snapshot).context("Built snapshot failed validation")?;

    let bytes = if gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&snapshot)?;
        encoder.finish().context("Failed to compress snapshot")?
    } else {
        snapshot
    };
    fs::write(&output, &bytes)
        .with_context(|| format!("Failed to write snapshot: {}", output.display()))?;

    let counts = dataset.stats();
    let duration = start.elapsed();

    if json_output {
        let summary = json!({
            "source": source.display().to_string(),
            "output": output.display().to_string(),
            "name": dataset.info().name,
            "checksum": format!("{:016x}", dataset.info().checksum),
            "gzip": gzip,
            "size": bytes.len(),
            "duration_ms": duration.as_millis(),
            "input": {
                "components": stats.components,
                "properties": stats.properties,
                "profiles": stats.profiles,
                "signatures": stats.signatures,
            },
            "dataset": counts,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("✓ Snapshot built successfully!");
        println!("  Output:      {}", output.display());
        println!("  Name:        {}", dataset.info().name);
        println!("  Components:  {}", counts.components);
        println!("  Properties:  {}", counts.properties);
        println!("  Profiles:    {}", stats.profiles);
        println!(
            "  Signatures:  {} ({} after dedup)",
            stats.signatures, counts.signatures
        );
        println!("  Trie nodes:  {}", counts.nodes);
        println!(
            "  Size:        {} bytes{}",
            bytes.len(),
            if gzip { " (gzip)" } else { "" }
        );
        println!("  Checksum:    {:016x}", dataset.info().checksum);
        println!("  Time:        {:.2}ms", duration.as_secs_f64() * 1000.0);
    }

    Ok(())
}
