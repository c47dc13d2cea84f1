//! Hot-reloadable detection provider
//!
//! A [`Provider`] owns the active [`Dataset`] behind an `ArcSwap`. Every
//! detection captures an `Arc<Dataset>` when it starts, so a reload never
//! disturbs requests already in flight: they finish on the snapshot they
//! captured and the old snapshot is freed when its last user drops it.
//!
//! ```no_run
//! use devicematch::Provider;
//!
//! let provider = Provider::from("devices.dmt")
//!     .cache_capacity(10_000)
//!     .properties(["IsMobile", "IsTablet", "DeviceType"])
//!     .open()?;
//!
//! let detection = provider.detect("Mozilla/5.0 (iPhone; CPU iPhone OS 7_1 like Mac OS X)");
//! println!("{} {}", detection.device_class(), detection.device_id());
//!
//! // Pick up a new dataset file; on failure the old one keeps serving
//! provider.reload()?;
//! # Ok::<(), devicematch::Error>(())
//! ```

use crate::dataset::Dataset;
use crate::device_id;
use crate::error::{Error, Result};
use crate::matcher::{Match, MatchConfig, MatchMethod, Matcher, StrategyKind, TieBreak};
use crate::resolver::{self, PropertyValue};
use arc_swap::ArcSwap;
use lru::LruCache;
use serde::Serialize;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

/// Match and cache counters, updated atomically
#[derive(Debug, Default)]
pub struct ProviderStats {
    /// Detections served
    pub detections: AtomicU64,
    /// Detections whose weakest component was exact
    pub exact: AtomicU64,
    /// Detections whose weakest component was nearest
    pub nearest: AtomicU64,
    /// Detections whose weakest component was default
    pub default: AtomicU64,
    /// Detections served from the cache
    pub cache_hits: AtomicU64,
    /// Cache lookups that missed
    pub cache_misses: AtomicU64,
    /// Successful reloads
    pub reloads: AtomicU64,
    /// Failed reloads
    pub failed_reloads: AtomicU64,
}

/// Point-in-time copy of [`ProviderStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Detections served
    pub detections: u64,
    /// Exact detections
    pub exact: u64,
    /// Nearest detections
    pub nearest: u64,
    /// Default detections
    pub default: u64,
    /// Cache hits
    pub cache_hits: u64,
    /// Cache misses
    pub cache_misses: u64,
    /// Successful reloads
    pub reloads: u64,
    /// Failed reloads
    pub failed_reloads: u64,
}

impl ProviderStats {
    /// Take a snapshot of the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            detections: self.detections.load(Ordering::Relaxed),
            exact: self.exact.load(Ordering::Relaxed),
            nearest: self.nearest.load(Ordering::Relaxed),
            default: self.default.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            reloads: self.reloads.load(Ordering::Relaxed),
            failed_reloads: self.failed_reloads.load(Ordering::Relaxed),
        }
    }

    fn record(&self, method: MatchMethod) {
        self.detections.fetch_add(1, Ordering::Relaxed);
        let counter = match method {
            MatchMethod::Exact | MatchMethod::DeviceId => &self.exact,
            MatchMethod::Nearest => &self.nearest,
            MatchMethod::Default => &self.default,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl StatsSnapshot {
    /// Cache hit rate (0.0 to 1.0)
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Share of detections that were exact (0.0 to 1.0)
    pub fn exact_rate(&self) -> f64 {
        if self.detections == 0 {
            0.0
        } else {
            self.exact as f64 / self.detections as f64
        }
    }
}

/// Event fired after every reload attempt
#[derive(Debug, Clone)]
pub struct ReloadEvent {
    /// File reloaded from, `None` for in-memory reloads
    pub path: Option<PathBuf>,
    /// Whether the new snapshot was installed
    pub success: bool,
    /// Error message when the reload failed
    pub error: Option<String>,
    /// Generation after the attempt
    pub generation: u64,
}

/// Callback type for reload notifications
pub type ReloadCallback = Arc<dyn Fn(ReloadEvent) + Send + Sync>;

/// Coarse device classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Nothing conclusive
    Unknown,
    /// `DeviceType` is `Desktop`
    Desktop,
    /// `IsMobile` is true
    Mobile,
    /// `IsTablet` is true
    Tablet,
}

impl DeviceClass {
    /// Classify from `IsTablet`, `IsMobile` and `DeviceType`, in that order
    pub fn classify(dataset: &Dataset, matched: &Match) -> Self {
        let lookup = |name: &str| {
            dataset
                .property_by_name(name)
                .map(|p| resolver::resolve_property(dataset, matched, p))
        };
        if lookup("IsTablet").and_then(|v| v.as_bool()) == Some(true) {
            DeviceClass::Tablet
        } else if lookup("IsMobile").and_then(|v| v.as_bool()) == Some(true) {
            DeviceClass::Mobile
        } else if lookup("DeviceType").and_then(|v| v.as_str()) == Some("Desktop") {
            DeviceClass::Desktop
        } else {
            DeviceClass::Unknown
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceClass::Unknown => "unknown",
            DeviceClass::Desktop => "desktop",
            DeviceClass::Mobile => "mobile",
            DeviceClass::Tablet => "tablet",
        };
        f.write_str(name)
    }
}

/// Result of [`Provider::detect`], bound to the snapshot it was made on
#[derive(Debug, Clone)]
pub struct Detection {
    dataset: Arc<Dataset>,
    matched: Arc<Match>,
    properties: Option<Arc<[String]>>,
}

impl Detection {
    /// Snapshot the detection was made against
    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// Underlying match
    pub fn matched(&self) -> &Match {
        &self.matched
    }

    /// Weakest method across components
    pub fn method(&self) -> MatchMethod {
        self.matched.method()
    }

    fn allowed(&self, name: &str) -> bool {
        self.properties
            .as_ref()
            .map_or(true, |names| names.iter().any(|n| n == name))
    }

    /// Value of a property
    ///
    /// When the provider was opened with a property subset, names outside it
    /// fail with [`Error::UnknownProperty`] like undefined names do.
    pub fn value(&self, name: &str) -> Result<PropertyValue<'_>> {
        if !self.allowed(name) {
            return Err(Error::UnknownProperty(name.to_string()));
        }
        resolver::resolve(&self.dataset, &self.matched, name)
    }

    /// Every available property and its value
    pub fn values(&self) -> Vec<(&str, PropertyValue<'_>)> {
        resolver::resolve_all(&self.dataset, &self.matched)
            .into_iter()
            .filter(|(name, _)| self.allowed(name))
            .collect()
    }

    /// Profile-index device id
    pub fn device_id(&self) -> String {
        device_id::encode(&self.dataset, &self.matched)
    }

    /// Profile-id device id, stable across reloads
    pub fn stable_device_id(&self) -> String {
        device_id::encode_stable(&self.dataset, &self.matched)
    }

    /// Coarse device class
    pub fn device_class(&self) -> DeviceClass {
        DeviceClass::classify(&self.dataset, &self.matched)
    }
}

/// Options for opening a provider
#[derive(Clone, Default)]
pub struct ProviderOptions {
    /// Dataset file, also used by [`Provider::reload`]
    pub path: Option<PathBuf>,
    /// In-memory snapshot (takes precedence over `path` for the first load)
    pub bytes: Option<Vec<u8>>,
    /// Matcher configuration
    pub config: MatchConfig,
    /// LRU cache capacity; 0 disables the cache
    pub cache_capacity: usize,
    /// Restrict detections to these properties
    pub properties: Option<Vec<String>>,
    /// Reload notifications
    pub reload_callback: Option<ReloadCallback>,
}

/// Fluent configuration created by [`Provider::from`] or
/// [`Provider::from_bytes_builder`]
pub struct ProviderOpener {
    options: ProviderOptions,
}

impl ProviderOpener {
    /// Limit signatures examined per component
    pub fn max_candidates(mut self, max: usize) -> Self {
        self.options.config.max_candidates = max;
        self
    }

    /// Bytes a node may shift and still count as near
    pub fn shift_window(mut self, bytes: usize) -> Self {
        self.options.config.shift_window = bytes;
        self
    }

    /// Matching algorithm
    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.options.config.strategy = strategy;
        self
    }

    /// Composite tie-break rule
    pub fn tie_break(mut self, tie_break: TieBreak) -> Self {
        self.options.config.tie_break = tie_break;
        self
    }

    /// Replace the whole matcher configuration
    pub fn config(mut self, config: MatchConfig) -> Self {
        self.options.config = config;
        self
    }

    /// Enable an LRU cache of `capacity` user agents (0 disables it)
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.options.cache_capacity = capacity;
        self
    }

    /// Only expose these properties
    pub fn properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.properties = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Called after every reload attempt
    ///
    /// The callback runs before the reload returns and must not reload the
    /// same provider.
    pub fn on_reload<F>(mut self, callback: F) -> Self
    where
        F: Fn(ReloadEvent) + Send + Sync + 'static,
    {
        self.options.reload_callback = Some(Arc::new(callback));
        self
    }

    /// Load the dataset and create the provider
    pub fn open(self) -> Result<Provider> {
        Provider::open_with_options(self.options)
    }
}

/// A published snapshot and the generation it was installed as
#[derive(Debug)]
struct Active {
    dataset: Arc<Dataset>,
    generation: u64,
}

/// Owns the active dataset and serves detections
pub struct Provider {
    current: ArcSwap<Active>,
    matcher: Matcher,
    /// Reload source; held for the whole of a reload so reloads serialize
    path: Mutex<Option<PathBuf>>,
    properties: Option<Arc<[String]>>,
    cache: Option<Mutex<LruCache<String, (u64, Arc<Match>)>>>,
    stats: ProviderStats,
    reload_callback: Option<ReloadCallback>,
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("path", &self.path())
            .field("generation", &self.generation())
            .field("config", self.matcher.config())
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

impl Provider {
    /// Start configuring a provider for a dataset file
    #[allow(clippy::should_implement_trait)]
    pub fn from(path: impl Into<PathBuf>) -> ProviderOpener {
        ProviderOpener {
            options: ProviderOptions {
                path: Some(path.into()),
                ..Default::default()
            },
        }
    }

    /// Start configuring a provider for an in-memory snapshot
    pub fn from_bytes_builder(bytes: Vec<u8>) -> ProviderOpener {
        ProviderOpener {
            options: ProviderOptions {
                bytes: Some(bytes),
                ..Default::default()
            },
        }
    }

    /// Open with explicit options
    pub fn open_with_options(options: ProviderOptions) -> Result<Self> {
        let dataset = match (&options.bytes, &options.path) {
            (Some(bytes), _) => Dataset::from_bytes(bytes)?,
            (None, Some(path)) => Dataset::open(path)?,
            (None, None) => return Err(Error::NoReloadSource),
        };
        if let Some(names) = &options.properties {
            check_properties(&dataset, names)?;
        }

        let cache = NonZeroUsize::new(options.cache_capacity).map(|cap| Mutex::new(LruCache::new(cap)));
        let matcher = Matcher::new(options.config);
        info!(
            dataset = %dataset.info().name,
            strategy = matcher.strategy_name(),
            cache_capacity = options.cache_capacity,
            "provider ready"
        );

        Ok(Self {
            current: ArcSwap::from_pointee(Active {
                dataset: Arc::new(dataset),
                generation: 0,
            }),
            matcher,
            path: Mutex::new(options.path),
            properties: options.properties.map(Into::into),
            cache,
            stats: ProviderStats::default(),
            reload_callback: options.reload_callback,
        })
    }

    /// The active snapshot
    pub fn snapshot(&self) -> Arc<Dataset> {
        Arc::clone(&self.current.load().dataset)
    }

    /// Number of successful reloads so far
    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Dataset file used by [`Provider::reload`]
    ///
    /// `None` once a snapshot has been installed from memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.lock_path().clone()
    }

    fn lock_path(&self) -> MutexGuard<'_, Option<PathBuf>> {
        self.path.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The matcher in use
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Match and cache statistics
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn lock_cache<'a>(
        cache: &'a Mutex<LruCache<String, (u64, Arc<Match>)>>,
    ) -> MutexGuard<'a, LruCache<String, (u64, Arc<Match>)>> {
        cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn detection(&self, dataset: Arc<Dataset>, matched: Arc<Match>) -> Detection {
        Detection {
            dataset,
            matched,
            properties: self.properties.clone(),
        }
    }

    /// Classify a User-Agent
    pub fn detect(&self, user_agent: &str) -> Detection {
        // One load: the generation always names the dataset beside it
        let active = self.current.load_full();
        let generation = active.generation;
        let dataset = Arc::clone(&active.dataset);

        if let Some(cache) = &self.cache {
            let hit = Self::lock_cache(cache)
                .get(user_agent)
                .filter(|(entry_generation, _)| *entry_generation == generation)
                .map(|(_, matched)| Arc::clone(matched));
            if let Some(matched) = hit {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                self.stats.record(matched.method());
                return self.detection(dataset, matched);
            }
            self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        }

        let matched = Arc::new(self.matcher.detect(&dataset, Some(user_agent)));
        self.stats.record(matched.method());
        if let Some(cache) = &self.cache {
            Self::lock_cache(cache).put(user_agent.to_string(), (generation, Arc::clone(&matched)));
        }
        self.detection(dataset, matched)
    }

    /// Classify a request from its headers (uncached)
    pub fn detect_with_headers(&self, user_agent: Option<&str>, headers: &[(&str, &str)]) -> Detection {
        let dataset = self.snapshot();
        let matched = Arc::new(self.matcher.detect_with_headers(&dataset, user_agent, headers));
        self.stats.record(matched.method());
        self.detection(dataset, matched)
    }

    /// Rebuild a match from a profile-index device id
    pub fn decode_device_id(&self, id: &str) -> Result<Detection> {
        let dataset = self.snapshot();
        let matched = Arc::new(device_id::decode(&dataset, id)?);
        Ok(self.detection(dataset, matched))
    }

    /// Rebuild a match from a profile-id device id
    pub fn decode_stable_device_id(&self, id: &str) -> Result<Detection> {
        let dataset = self.snapshot();
        let matched = Arc::new(device_id::decode_stable(&dataset, id)?);
        Ok(self.detection(dataset, matched))
    }

    /// Reload from the file the provider was opened with
    ///
    /// On failure the current snapshot stays in service and the error is
    /// returned.
    ///
    /// Fails with [`Error::NoReloadSource`] when the provider was opened from
    /// memory or a snapshot was since installed with
    /// [`Provider::reload_from_bytes`].
    pub fn reload(&self) -> Result<()> {
        let guard = self.lock_path();
        let path = guard.as_ref().ok_or(Error::NoReloadSource)?;
        let result = Dataset::open(path);
        self.install(result, Some(path))
    }

    /// Reload from caller-supplied snapshot bytes
    ///
    /// A successful install detaches the provider from its file, so later
    /// [`Provider::reload`] calls fail instead of reverting to the file.
    pub fn reload_from_bytes(&self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.lock_path();
        self.install(Dataset::from_bytes(bytes), None)?;
        *guard = None;
        Ok(())
    }

    /// Publish a loaded dataset; callers hold the path lock
    fn install(&self, result: Result<Dataset>, path: Option<&PathBuf>) -> Result<()> {
        let checked = result.and_then(|dataset| {
            if let Some(names) = &self.properties {
                check_properties(&dataset, names)?;
            }
            Ok(dataset)
        });

        let outcome = match checked {
            Ok(dataset) => {
                let name = dataset.info().name.clone();
                let generation = self.current.load().generation + 1;
                self.current.store(Arc::new(Active {
                    dataset: Arc::new(dataset),
                    generation,
                }));
                if let Some(cache) = &self.cache {
                    Self::lock_cache(cache).clear();
                }
                self.stats.reloads.fetch_add(1, Ordering::Relaxed);
                info!(dataset = %name, generation, "dataset reloaded");
                Ok(())
            }
            Err(e) => {
                self.stats.failed_reloads.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "dataset reload failed, keeping current snapshot");
                Err(e)
            }
        };

        if let Some(callback) = &self.reload_callback {
            callback(ReloadEvent {
                path: path.cloned(),
                success: outcome.is_ok(),
                error: outcome.as_ref().err().map(|e| e.to_string()),
                generation: self.generation(),
            });
        }
        outcome
    }
}

fn check_properties(dataset: &Dataset, names: &[String]) -> Result<()> {
    for name in names {
        dataset.require_property(name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_bytes;
    use std::sync::atomic::AtomicUsize;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 7_1 like Mac OS X) AppleWebKit/537.51.2 (KHTML, like Gecko) 'Version/7.0 Mobile/11D167 Safari/9537.53";
    const IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 12_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148";
    const FIREFOX: &str = "Mozilla/5.0 (Windows NT 6.3; WOW64; rv:41.0) Gecko/20100101 Firefox/41.0";

    #[test]
    fn test_device_classes() {
        let provider = Provider::from_bytes_builder(sample_bytes()).open().unwrap();
        assert_eq!(provider.detect(IPHONE).device_class(), DeviceClass::Mobile);
        assert_eq!(provider.detect(IPAD).device_class(), DeviceClass::Tablet);
        assert_eq!(provider.detect(FIREFOX).device_class(), DeviceClass::Desktop);
        assert_eq!(provider.detect("").device_class(), DeviceClass::Unknown);
    }

    #[test]
    fn test_property_subset() {
        let provider = Provider::from_bytes_builder(sample_bytes())
            .properties(["IsMobile", "IsTablet", "DeviceType"])
            .open()
            .unwrap();
        let detection = provider.detect(IPHONE);
        assert_eq!(detection.value("IsMobile").unwrap().as_bool(), Some(true));
        assert!(matches!(
            detection.value("BrowserName"),
            Err(Error::UnknownProperty(_))
        ));
        assert_eq!(detection.values().len(), 3);
        // Classification still works with a restricted subset
        assert_eq!(detection.device_class(), DeviceClass::Mobile);

        let err = Provider::from_bytes_builder(sample_bytes())
            .properties(["NoSuchProperty"])
            .open()
            .unwrap_err();
        assert!(matches!(err, Error::UnknownProperty(_)));
    }

    #[test]
    fn test_cache_hits_and_invalidation() {
        let provider = Provider::from_bytes_builder(sample_bytes())
            .cache_capacity(16)
            .open()
            .unwrap();
        let first = provider.detect(IPHONE);
        let second = provider.detect(IPHONE);
        assert_eq!(first.matched(), second.matched());
        let stats = provider.stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.detections, 2);
        assert!((stats.cache_hit_rate() - 0.5).abs() < f64::EPSILON);

        provider.reload_from_bytes(&sample_bytes()).unwrap();
        provider.detect(IPHONE);
        assert_eq!(provider.stats().cache_misses, 2);
    }

    #[test]
    fn test_no_cache_by_default() {
        let provider = Provider::from_bytes_builder(sample_bytes()).open().unwrap();
        provider.detect(IPHONE);
        provider.detect(IPHONE);
        let stats = provider.stats();
        assert_eq!(stats.cache_hits + stats.cache_misses, 0);
        assert_eq!(stats.detections, 2);
        assert_eq!(stats.exact + stats.nearest + stats.default, 2);
    }

    #[test]
    fn test_reload_without_file() {
        let provider = Provider::from_bytes_builder(sample_bytes()).open().unwrap();
        assert!(matches!(provider.reload(), Err(Error::NoReloadSource)));
        assert_eq!(provider.generation(), 0);
    }

    #[test]
    fn test_cached_match_follows_snapshot() {
        let provider = Provider::from_bytes_builder(sample_bytes())
            .cache_capacity(16)
            .open()
            .unwrap();
        provider.detect(IPHONE);
        provider.reload_from_bytes(&sample_bytes()).unwrap();

        let detection = provider.detect(IPHONE);
        assert!(Arc::ptr_eq(detection.dataset(), &provider.snapshot()));
        assert_eq!(provider.stats().cache_hits, 0);
        let again = provider.detect(IPHONE);
        assert!(Arc::ptr_eq(detection.dataset(), again.dataset()));
        assert_eq!(provider.stats().cache_hits, 1);
    }

    #[test]
    fn test_failed_reload_keeps_snapshot_and_notifies() {
        let events = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));
        let (e, f) = (Arc::clone(&events), Arc::clone(&failures));
        let provider = Provider::from_bytes_builder(sample_bytes())
            .on_reload(move |event| {
                e.fetch_add(1, Ordering::SeqCst);
                if !event.success {
                    assert!(event.error.is_some());
                    f.fetch_add(1, Ordering::SeqCst);
                }
            })
            .open()
            .unwrap();

        let before = provider.snapshot();
        let err = provider.reload_from_bytes(b"not a dataset").unwrap_err();
        assert!(err.is_format());
        assert!(Arc::ptr_eq(&before, &provider.snapshot()));
        assert_eq!(provider.generation(), 0);

        provider.reload_from_bytes(&sample_bytes()).unwrap();
        assert!(!Arc::ptr_eq(&before, &provider.snapshot()));
        assert_eq!(provider.generation(), 1);

        assert_eq!(events.load(Ordering::SeqCst), 2);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        let stats = provider.stats();
        assert_eq!((stats.reloads, stats.failed_reloads), (1, 1));
    }

    #[test]
    fn test_detection_outlives_reload() {
        let provider = Provider::from_bytes_builder(sample_bytes()).open().unwrap();
        let detection = provider.detect(FIREFOX);
        provider.reload_from_bytes(&sample_bytes()).unwrap();
        assert_eq!(
            detection.value("BrowserName").unwrap().as_str(),
            Some("Firefox")
        );
        assert!(!Arc::ptr_eq(detection.dataset(), &provider.snapshot()));
    }

    #[test]
    fn test_device_id_roundtrip_through_provider() {
        let provider = Provider::from_bytes_builder(sample_bytes()).open().unwrap();
        let detection = provider.detect(IPHONE);
        let decoded = provider.decode_device_id(&detection.device_id()).unwrap();
        assert_eq!(decoded.matched().profiles(), detection.matched().profiles());
        assert_eq!(decoded.device_class(), DeviceClass::Mobile);
        assert_eq!(decoded.method(), MatchMethod::DeviceId);

        let stable = provider
            .decode_stable_device_id(&detection.stable_device_id())
            .unwrap();
        assert_eq!(stable.device_id(), detection.device_id());
        assert!(provider.decode_stable_device_id("1-2-3").is_err());
    }
}
