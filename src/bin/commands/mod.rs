pub mod batch_cmd;
pub mod build_cmd;
pub mod detect_cmd;
pub mod device_id_cmd;
pub mod inspect_cmd;
pub mod profiles_cmd;
pub mod validate_cmd;

pub use batch_cmd::cmd_batch;
pub use build_cmd::cmd_build;
pub use detect_cmd::cmd_detect;
pub use device_id_cmd::cmd_device_id;
pub use inspect_cmd::cmd_inspect;
pub use profiles_cmd::cmd_profiles;
pub use validate_cmd::cmd_validate;

use anyhow::{Context, Result};
use clap::Args;
use devicematch::{MatchConfig, Provider, ProviderOpener, StrategyKind, TieBreak};
use std::path::Path;

/// Matcher tuning shared by detect and batch
#[derive(Args, Debug, Clone)]
pub struct MatchArgs {
    /// Matching strategy: trie or scan
    #[arg(long, default_value = "trie")]
    pub strategy: StrategyKind,

    /// Rule for equal-rank results: input-order or header-priority
    #[arg(long, default_value = "input-order")]
    pub tie_break: TieBreak,

    /// Maximum signatures scored per component
    #[arg(long, default_value = "200")]
    pub max_candidates: usize,

    /// Bytes a pattern may drift and still count half
    #[arg(long, default_value = "8")]
    pub shift_window: usize,
}

impl MatchArgs {
    pub fn config(&self) -> MatchConfig {
        MatchConfig {
            max_candidates: self.max_candidates,
            shift_window: self.shift_window,
            strategy: self.strategy,
            tie_break: self.tie_break,
        }
    }
}

/// Provider opener for a dataset file with an optional property subset
pub fn opener(dataset: &Path, properties: &[String]) -> ProviderOpener {
    let opener = Provider::from(dataset);
    if properties.is_empty() {
        opener
    } else {
        opener.properties(properties.iter().cloned())
    }
}

pub fn open_provider(opener: ProviderOpener, dataset: &Path) -> Result<Provider> {
    opener
        .open()
        .with_context(|| format!("Failed to load dataset: {}", dataset.display()))
}

/// Split "Name: Value" into its parts
pub fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("Invalid header '{}': expected \"Name: Value\"", raw))?;
    let name = name.trim();
    anyhow::ensure!(!name.is_empty(), "Invalid header '{}': empty name", raw);
    Ok((name, value.trim()))
}
