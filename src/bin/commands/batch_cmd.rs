use anyhow::{Context, Result};
use devicematch::Detection;
use flate2::read::GzDecoder;
use rayon::prelude::*;
use serde_json::json;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::detect_cmd::properties_json;
use super::{open_provider, opener, MatchArgs};

/// Open the input, transparently decompressing `.gz` files
fn open_input(input: &Path) -> Result<Box<dyn BufRead>> {
    if input.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file =
        File::open(input).with_context(|| format!("Failed to open input: {}", input.display()))?;
    let reader: Box<dyn Read> = if input.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(reader)))
}

fn read_user_agents(input: &Path) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for line in open_input(input)?.lines() {
        let line = line.with_context(|| format!("Failed to read input: {}", input.display()))?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }
    Ok(lines)
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_batch(
    dataset: PathBuf,
    input: PathBuf,
    format: String,
    properties: Vec<String>,
    threads: Option<usize>,
    cache_size: usize,
    show_stats: bool,
    matching: MatchArgs,
) -> Result<()> {
    let csv_output = match format.to_lowercase().as_str() {
        "json" => false,
        "csv" => true,
        _ => anyhow::bail!("Invalid format: '{}'. Must be: json or csv", format),
    };

    let provider = open_provider(
        opener(&dataset, &properties)
            .config(matching.config())
            .cache_capacity(cache_size),
        &dataset,
    )?;
    let user_agents = read_user_agents(&input)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.unwrap_or(0))
        .build()
        .context("Failed to start worker threads")?;

    let start = Instant::now();
    let detections: Vec<Detection> =
        pool.install(|| user_agents.par_iter().map(|ua| provider.detect(ua)).collect());
    let duration = start.elapsed();

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    if csv_output {
        let columns: Vec<String> = if properties.is_empty() {
            provider
                .snapshot()
                .property_names()
                .map(str::to_string)
                .collect()
        } else {
            properties
        };

        let mut writer = csv::Writer::from_writer(out);
        let mut header = vec!["user_agent", "method", "device_class", "device_id"];
        header.extend(columns.iter().map(String::as_str));
        writer.write_record(&header)?;

        for (ua, detection) in user_agents.iter().zip(&detections) {
            let mut record = vec![
                ua.clone(),
                detection.method().to_string(),
                detection.device_class().to_string(),
                detection.device_id(),
            ];
            for name in &columns {
                record.push(
                    detection
                        .value(name)
                        .map(|v| v.to_string())
                        .with_context(|| format!("Unknown property: {}", name))?,
                );
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
    } else {
        for (ua, detection) in user_agents.iter().zip(&detections) {
            let line = json!({
                "user_agent": ua,
                "method": detection.method(),
                "device_class": detection.device_class(),
                "device_id": detection.device_id(),
                "properties": properties_json(detection)?,
            });
            writeln!(out, "{}", serde_json::to_string(&line)?)?;
        }
        out.flush()?;
    }

    if show_stats {
        let stats = provider.stats();
        let secs = duration.as_secs_f64();
        eprintln!("[INFO] Detections:    {}", stats.detections);
        eprintln!(
            "[INFO] Exact/nearest/default: {}/{}/{}",
            stats.exact, stats.nearest, stats.default
        );
        eprintln!(
            "[INFO] Cache hit rate: {:.1}%",
            stats.cache_hit_rate() * 100.0
        );
        eprintln!("[INFO] Time:          {:.2}ms", secs * 1000.0);
        if secs > 0.0 {
            eprintln!(
                "[INFO] Throughput:    {:.0} UA/s",
                stats.detections as f64 / secs
            );
        }
    }

    Ok(())
}
