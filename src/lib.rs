//! devicematch - Device Detection from HTTP User-Agents
//!
//! devicematch classifies an HTTP `User-Agent` (and related headers) into a
//! structured device, platform and browser profile by matching it against an
//! immutable, precomputed signature dataset. Every request returns within a
//! bounded number of steps, even for input never seen before.
//!
//! # Quick Start
//!
//! ```rust
//! use devicematch::{resolve, DatasetBuilder, Dataset, Matcher, MatchMethod, PropertyDef, ValueType};
//!
//! // Compile a tiny dataset
//! let mut builder = DatasetBuilder::new("Quick start");
//! builder.add_component("HardwarePlatform", &["User-Agent"], 0, 256)?;
//! builder.add_property(
//!     PropertyDef::new("IsMobile", "HardwarePlatform", ValueType::Bool).with_default("False"),
//! )?;
//! builder.add_profile("HardwarePlatform", 17, &[("IsMobile", "True")])?;
//! builder.add_signature(
//!     "Mozilla/5.0 (iPhone; CPU iPhone OS 7_1 like Mac OS X)",
//!     10,
//!     &[17],
//!     &[("HardwarePlatform", &["iPhone"])],
//! )?;
//! let dataset = Dataset::from_bytes(&builder.build()?)?;
//!
//! // Match a request
//! let matcher = Matcher::default();
//! let m = matcher.detect(&dataset, Some("Mozilla/5.0 (iPhone; CPU iPhone OS 9_0 like Mac OS X)"));
//! assert_eq!(m.method(), MatchMethod::Exact);
//! assert_eq!(resolve(&dataset, &m, "IsMobile")?.as_bool(), Some(true));
//!
//! // Unknown input degrades to the default profile, never to an error
//! let m = matcher.detect(&dataset, Some(""));
//! assert_eq!(m.method(), MatchMethod::Default);
//! assert_eq!(resolve(&dataset, &m, "IsMobile")?.as_bool(), Some(false));
//! # Ok::<(), devicematch::Error>(())
//! ```
//!
//! # Key Features
//!
//! - **Trie Matching**: one trie per component over ranked substring positions
//! - **Graceful Degradation**: exact, nearest or default, never an error
//! - **Reversible Device Ids**: compact `12-0-7-1` identifiers decode in O(1)
//! - **Reverse Index**: find every profile holding a property value
//! - **Hot Reload**: swap datasets under load without blocking readers
//! - **Validated Snapshots**: corrupt files are rejected before use
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │  Snapshot (.dmt, optionally gzip)    │
//! ├──────────────────────────────────────┤
//! │  1. Strings (interned)               │
//! │  2. Components / Properties / Values │
//! │  3. Profiles + Reverse Index         │
//! │  4. Node Tries + Signature Table     │
//! └──────────────────────────────────────┘
//!          ↓ load + validate (once)
//! ┌──────────────────────────────────────┐
//! │  Arc<Dataset> (immutable, shared)    │
//! │  Matcher / DeviceId / Resolver       │
//! └──────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Builds snapshots from entity definitions
pub mod builder;
/// Immutable dataset and entity types
pub mod dataset;
/// Device identifier codec
pub mod device_id;
/// Error types for devicematch operations
pub mod error;
pub mod format;
/// Matching strategies and match results
pub mod matcher;
pub mod profiles;
/// Hot-reloadable provider
pub mod provider;
pub mod resolver;
pub mod scratch;
/// JSON source description
pub mod source;
pub mod strings;
pub mod trie;

// Re-exports for Rust consumers

/// Dataset handle and entity types
pub use crate::dataset::{
    Component, ComponentId, Dataset, DatasetInfo, DatasetStats, Node, NodeId, Profile,
    ProfileIndex, Property, PropertyId, PropertyInfo, Signature, SignatureId, Value, ValueId,
    ValueType,
};

/// Error type and result alias
pub use crate::error::{Error, Result};

/// Matching API
pub use crate::matcher::{
    ComponentMatch, Match, MatchConfig, MatchMethod, MatchStrategy, Matcher, ScanStrategy,
    StrategyKind, TieBreak, TrieStrategy,
};

/// Reverse lookups
pub use crate::profiles::{find_profiles, narrow_profiles};

/// Property resolution
pub use crate::resolver::{resolve, PropertyValue};

/// Building datasets
pub use crate::builder::{BuilderStats, DatasetBuilder, PropertyDef};
pub use crate::source::Source;

/// Provider API
pub use crate::provider::{
    Detection, DeviceClass, Provider, ProviderOpener, ProviderOptions, ReloadEvent, StatsSnapshot,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::{Dataset, Source};

    pub(crate) const SAMPLE_JSON: &str = include_str!("../tests/data/sample.json");

    pub(crate) fn sample_bytes() -> Vec<u8> {
        Source::from_json(SAMPLE_JSON)
            .and_then(|source| source.build())
            .expect("sample source builds")
    }

    pub(crate) fn sample_dataset() -> Dataset {
        Dataset::from_bytes(&sample_bytes()).expect("sample dataset loads")
    }
}
