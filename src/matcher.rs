//! User-Agent matching
//!
//! [`Matcher`] classifies one primary input (the `User-Agent`) plus any
//! number of secondary headers into a [`Match`] holding one profile per
//! component. For every component the inputs it reads are normalised to the
//! component's length range and handed to a [`MatchStrategy`]:
//!
//! - [`TrieStrategy`] descends the component trie. A fully matched path ending
//!   in a signature is `Exact`; a partial path falls back to the nearest
//!   signature below the deepest node reached; no progress at all is
//!   `Default`.
//! - [`ScanStrategy`] scores the component's signature table directly.
//!
//! Matching never fails. Missing, empty or unrecognisable input degrades to
//! the component's default profile.

use crate::dataset::{Component, ComponentId, Dataset, Profile, ProfileIndex, SignatureId};
use crate::scratch::with_scratch;
use crate::trie;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// Name of the header the primary input stands in for
pub const USER_AGENT: &str = "User-Agent";

/// How a component's profile was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    /// A signature path matched the input completely
    Exact,
    /// Closest signature by node distance
    Nearest,
    /// Nothing matched; the component's default profile
    Default,
    /// Decoded from a device id, no matching involved
    DeviceId,
}

impl MatchMethod {
    /// 0 for exact results, growing as the result gets weaker
    fn weakness(self) -> u8 {
        match self {
            MatchMethod::Exact | MatchMethod::DeviceId => 0,
            MatchMethod::Nearest => 1,
            MatchMethod::Default => 2,
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchMethod::Exact => "exact",
            MatchMethod::Nearest => "nearest",
            MatchMethod::Default => "default",
            MatchMethod::DeviceId => "device-id",
        };
        f.write_str(name)
    }
}

/// Result for one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentMatch {
    /// Component id
    pub component: ComponentId,
    /// Chosen profile (index within the component)
    pub profile: ProfileIndex,
    /// How the profile was chosen
    pub method: MatchMethod,
    /// Signature the profile came from
    pub signature: Option<SignatureId>,
    /// Rank of that signature, 0 without one
    pub rank: u32,
    /// Node distance of that signature, 0 for exact results
    pub distance: u32,
    /// Signatures examined while choosing
    pub candidates: u32,
}

impl ComponentMatch {
    /// The component's default profile
    pub fn default_for(component: &Component) -> Self {
        Self {
            component: component.id,
            profile: component.default_profile,
            method: MatchMethod::Default,
            signature: None,
            rank: 0,
            distance: 0,
            candidates: 0,
        }
    }

    fn from_signature(
        dataset: &Dataset,
        component: &Component,
        signature: SignatureId,
        method: MatchMethod,
        distance: u32,
        candidates: u32,
    ) -> Self {
        let sig = dataset.signature(signature);
        Self {
            component: component.id,
            profile: dataset.signature_profiles(sig)[component.id as usize],
            method,
            signature: Some(signature),
            rank: sig.rank,
            distance,
            candidates,
        }
    }
}

/// Outcome of classifying one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    user_agent: Option<String>,
    components: Vec<ComponentMatch>,
}

impl Match {
    pub(crate) fn new(user_agent: Option<String>, components: Vec<ComponentMatch>) -> Self {
        Self {
            user_agent,
            components,
        }
    }

    /// The primary input this match was made for
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Per-component results in dataset component order
    pub fn components(&self) -> &[ComponentMatch] {
        &self.components
    }

    /// Result for one component
    pub fn component(&self, id: ComponentId) -> Option<&ComponentMatch> {
        self.components.get(id as usize)
    }

    /// Profile index per component
    pub fn profiles(&self) -> Vec<ProfileIndex> {
        self.components.iter().map(|c| c.profile).collect()
    }

    /// Resolved profile of one component
    pub fn profile<'a>(&self, dataset: &'a Dataset, component: ComponentId) -> Option<&'a Profile> {
        let result = self.component(component)?;
        dataset.profile(component, result.profile)
    }

    /// Weakest method across all components
    pub fn method(&self) -> MatchMethod {
        self.components
            .iter()
            .map(|c| c.method)
            .max_by_key(|m| m.weakness())
            .unwrap_or(MatchMethod::Default)
    }

    /// Sum of node distances across components
    pub fn distance(&self) -> u32 {
        self.components.iter().map(|c| c.distance).sum()
    }

    /// Total signatures examined across components
    pub fn candidates(&self) -> u32 {
        self.components.iter().map(|c| c.candidates).sum()
    }
}

/// Matching algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Trie descent with nearest fallback
    #[default]
    Trie,
    /// Score the signature table directly
    Scan,
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trie" => Ok(StrategyKind::Trie),
            "scan" => Ok(StrategyKind::Scan),
            other => Err(format!("unknown strategy '{}' (expected trie or scan)", other)),
        }
    }
}

/// Which input wins when two results for a component have equal rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The input supplied first
    #[default]
    InputOrder,
    /// The input whose header the component lists first
    HeaderPriority,
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "input_order" => Ok(TieBreak::InputOrder),
            "header_priority" => Ok(TieBreak::HeaderPriority),
            other => Err(format!(
                "unknown tie break '{}' (expected input-order or header-priority)",
                other
            )),
        }
    }
}

/// Matcher configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Upper bound on signatures scored per component and input
    pub max_candidates: usize,
    /// Bytes a node may drift from its offset and still count half
    pub shift_window: usize,
    /// Matching algorithm
    pub strategy: StrategyKind,
    /// Composite tie-break rule
    pub tie_break: TieBreak,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_candidates: 200,
            shift_window: 8,
            strategy: StrategyKind::Trie,
            tie_break: TieBreak::InputOrder,
        }
    }
}

/// A way of choosing one component's profile for one normalised input
pub trait MatchStrategy: Send + Sync + fmt::Debug {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Choose a profile; `input` is already truncated and padded
    fn match_component(
        &self,
        dataset: &Dataset,
        component: &Component,
        input: &[u8],
        config: &MatchConfig,
    ) -> ComponentMatch;
}

/// Trie descent with nearest and default fallback
#[derive(Debug, Default, Clone, Copy)]
pub struct TrieStrategy;

impl MatchStrategy for TrieStrategy {
    fn name(&self) -> &'static str {
        "trie"
    }

    fn match_component(
        &self,
        dataset: &Dataset,
        component: &Component,
        input: &[u8],
        config: &MatchConfig,
    ) -> ComponentMatch {
        let descent = trie::descend(dataset, component.root, input);
        let node = dataset.node(descent.deepest);

        // A signature on the path has every node matched, even when descent
        // continued below it
        if let Some(signature) = descent.signature {
            return ComponentMatch::from_signature(
                dataset,
                component,
                signature,
                MatchMethod::Exact,
                0,
                1,
            );
        }
        if descent.depth == 0 {
            return ComponentMatch::default_for(component);
        }

        // Candidates arrive highest rank first, so a later candidate only
        // wins on strictly lower distance
        let mut best: Option<(SignatureId, u32)> = None;
        let mut examined = 0u32;
        for id in dataset
            .ranked_signatures(node)
            .iter()
            .take(config.max_candidates)
        {
            examined += 1;
            let score = trie::score(dataset, dataset.signature(*id), input, config.shift_window);
            if best.map_or(true, |(_, distance)| score.distance < distance) {
                best = Some((*id, score.distance));
                if score.distance == 0 {
                    break;
                }
            }
        }

        match best {
            Some((signature, distance)) => ComponentMatch::from_signature(
                dataset,
                component,
                signature,
                MatchMethod::Nearest,
                distance,
                examined,
            ),
            None => ComponentMatch::default_for(component),
        }
    }
}

/// Scores the component's signature range without walking the trie
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanStrategy;

impl MatchStrategy for ScanStrategy {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn match_component(
        &self,
        dataset: &Dataset,
        component: &Component,
        input: &[u8],
        config: &MatchConfig,
    ) -> ComponentMatch {
        // (signature, weight, rank) of the heaviest exact hit
        let mut exact: Option<(SignatureId, u32, u32)> = None;
        // (signature, distance, rank) of the closest partial hit
        let mut nearest: Option<(SignatureId, u32, u32)> = None;
        let mut examined = 0u32;

        for id in dataset
            .component_signatures(component)
            .take(config.max_candidates)
        {
            examined += 1;
            let sig = dataset.signature(id);
            let score = trie::score(dataset, sig, input, config.shift_window);
            if score.distance == 0 {
                let better = exact.map_or(true, |(_, weight, rank)| {
                    (score.weight, sig.rank) > (weight, rank)
                });
                if better {
                    exact = Some((id, score.weight, sig.rank));
                }
            } else if score.matched > 0 {
                let better = nearest.map_or(true, |(_, distance, rank)| {
                    score.distance < distance || (score.distance == distance && sig.rank > rank)
                });
                if better {
                    nearest = Some((id, score.distance, sig.rank));
                }
            }
        }

        if let Some((id, _, _)) = exact {
            ComponentMatch::from_signature(dataset, component, id, MatchMethod::Exact, 0, examined)
        } else if let Some((id, distance, _)) = nearest {
            ComponentMatch::from_signature(
                dataset,
                component,
                id,
                MatchMethod::Nearest,
                distance,
                examined,
            )
        } else {
            let mut result = ComponentMatch::default_for(component);
            result.candidates = examined;
            result
        }
    }
}

/// Classifies requests against a [`Dataset`]
#[derive(Debug)]
pub struct Matcher {
    config: MatchConfig,
    strategy: Box<dyn MatchStrategy>,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

impl Matcher {
    /// Create a matcher using the strategy named in `config`
    pub fn new(config: MatchConfig) -> Self {
        let strategy: Box<dyn MatchStrategy> = match config.strategy {
            StrategyKind::Trie => Box::new(TrieStrategy),
            StrategyKind::Scan => Box::new(ScanStrategy),
        };
        Self { config, strategy }
    }

    /// Create a matcher with a caller-supplied strategy
    pub fn with_strategy(config: MatchConfig, strategy: Box<dyn MatchStrategy>) -> Self {
        Self { config, strategy }
    }

    /// Active configuration
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Name of the active strategy
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Classify a single User-Agent
    pub fn detect(&self, dataset: &Dataset, user_agent: Option<&str>) -> Match {
        self.detect_with_headers(dataset, user_agent, &[])
    }

    /// Classify a User-Agent together with secondary headers
    ///
    /// `headers` are `(name, value)` pairs; names compare case-insensitively.
    /// The primary input, when present, counts as the first `User-Agent`
    /// input.
    pub fn detect_with_headers(
        &self,
        dataset: &Dataset,
        user_agent: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Match {
        let inputs: Vec<(&str, &str)> = user_agent
            .map(|ua| (USER_AGENT, ua))
            .into_iter()
            .chain(headers.iter().copied())
            .collect();

        let components = dataset
            .components()
            .iter()
            .map(|component| self.match_inputs(dataset, component, &inputs))
            .collect();

        Match::new(user_agent.map(str::to_string), components)
    }

    fn match_inputs(
        &self,
        dataset: &Dataset,
        component: &Component,
        inputs: &[(&str, &str)],
    ) -> ComponentMatch {
        // (result, header priority) of the current winner
        let mut best: Option<(ComponentMatch, usize)> = None;

        for (header, value) in inputs {
            let Some(priority) = dataset.header_priority(component, header) else {
                continue;
            };
            let result = self.match_one(dataset, component, value.as_bytes());
            let replace = match &best {
                None => true,
                Some((current, current_priority)) => {
                    let key = (result.method != MatchMethod::Default, result.rank);
                    let current_key = (current.method != MatchMethod::Default, current.rank);
                    key > current_key
                        || (key == current_key
                            && self.config.tie_break == TieBreak::HeaderPriority
                            && priority < *current_priority)
                }
            };
            if replace {
                best = Some((result, priority));
            }
        }

        let result = best
            .map(|(result, _)| result)
            .unwrap_or_else(|| ComponentMatch::default_for(component));
        trace!(
            component = dataset.component_name(component),
            method = %result.method,
            profile = result.profile,
            distance = result.distance,
            candidates = result.candidates,
            "component matched"
        );
        result
    }

    fn match_one(&self, dataset: &Dataset, component: &Component, input: &[u8]) -> ComponentMatch {
        let max = component.max_length as usize;
        let min = component.min_length as usize;
        let input = &input[..input.len().min(max)];

        if input.len() >= min {
            self.strategy
                .match_component(dataset, component, input, &self.config)
        } else {
            with_scratch(|buf| {
                buf.extend_from_slice(input);
                buf.resize(min, 0);
                self.strategy
                    .match_component(dataset, component, buf, &self.config)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DatasetBuilder, PropertyDef};
    use crate::dataset::ValueType;
    use crate::fixtures::sample_dataset;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 7_1 like Mac OS X) AppleWebKit/537.51.2 (KHTML, like Gecko) 'Version/7.0 Mobile/11D167 Safari/9537.53";
    const FIREFOX: &str = "Mozilla/5.0 (Windows NT 6.3; WOW64; rv:41.0) Gecko/20100101 Firefox/41.0";

    fn hardware(ds: &Dataset) -> ComponentId {
        ds.component_by_name("HardwarePlatform").unwrap().id
    }

    #[test]
    fn test_empty_and_absent_input_default_everywhere() {
        let ds = sample_dataset();
        let matcher = Matcher::default();
        for input in [None, Some("")] {
            let m = matcher.detect(&ds, input);
            assert_eq!(m.components().len(), ds.components().len());
            for (c, component) in m.components().iter().zip(ds.components()) {
                assert_eq!(c.method, MatchMethod::Default);
                assert_eq!(c.profile, component.default_profile);
                assert_eq!(c.candidates, 0);
            }
            assert_eq!(m.method(), MatchMethod::Default);
        }
    }

    #[test]
    fn test_exact_iphone() {
        let ds = sample_dataset();
        let m = Matcher::default().detect(&ds, Some(IPHONE));
        let hw = m.component(hardware(&ds)).unwrap();
        assert_eq!(hw.method, MatchMethod::Exact);
        assert_eq!(hw.distance, 0);
        assert!(hw.signature.is_some());
        assert_ne!(hw.profile, 0);
        assert_eq!(m.user_agent(), Some(IPHONE));
    }

    #[test]
    fn test_nearest_when_path_breaks() {
        let ds = sample_dataset();
        // Same device, unseen OS version: descent stalls below the root
        let ua = IPHONE.replace("OS 7_1", "OS 9_9");
        let m = Matcher::default().detect(&ds, Some(&ua));
        let hw = m.component(hardware(&ds)).unwrap();
        assert_eq!(hw.method, MatchMethod::Nearest);
        assert!(hw.distance > 0);
        assert!(hw.candidates >= 1);

        let exact = Matcher::default().detect(&ds, Some(IPHONE));
        assert_eq!(hw.profile, exact.component(hardware(&ds)).unwrap().profile);
    }

    #[test]
    fn test_candidates_bounded() {
        let ds = sample_dataset();
        let config = MatchConfig {
            max_candidates: 1,
            ..MatchConfig::default()
        };
        let ua = IPHONE.replace("OS 7_1", "OS 9_9");
        let m = Matcher::new(config).detect(&ds, Some(&ua));
        assert!(m.components().iter().all(|c| c.candidates <= 1));

        let scan = Matcher::new(MatchConfig {
            strategy: StrategyKind::Scan,
            ..config
        });
        let m = scan.detect(&ds, Some(&"x".repeat(10_000)));
        assert!(m.components().iter().all(|c| c.candidates <= 1));
    }

    #[test]
    fn test_deterministic() {
        let ds = sample_dataset();
        let matcher = Matcher::default();
        assert_eq!(matcher.detect(&ds, Some(FIREFOX)), matcher.detect(&ds, Some(FIREFOX)));
    }

    #[test]
    fn test_scan_agrees_on_exact_inputs() {
        let ds = sample_dataset();
        let trie = Matcher::default();
        let scan = Matcher::new(MatchConfig {
            strategy: StrategyKind::Scan,
            ..MatchConfig::default()
        });
        assert_eq!(scan.strategy_name(), "scan");
        for ua in [IPHONE, FIREFOX] {
            let a = trie.detect(&ds, Some(ua));
            let b = scan.detect(&ds, Some(ua));
            let hw = hardware(&ds);
            assert_eq!(a.component(hw).unwrap().profile, b.component(hw).unwrap().profile);
            assert_eq!(b.component(hw).unwrap().method, MatchMethod::Exact);
        }
    }

    #[test]
    fn test_secondary_header_overrides_weaker_primary() {
        let ds = sample_dataset();
        let matcher = Matcher::default();
        // Opera Mini style: the device UA travels in a secondary header
        let m = matcher.detect_with_headers(
            &ds,
            Some("Opera/9.80 (J2ME/MIDP; Opera Mini/9.80)"),
            &[("x-device-user-agent", IPHONE)],
        );
        let hw = m.component(hardware(&ds)).unwrap();
        assert_eq!(hw.method, MatchMethod::Exact);

        let direct = matcher.detect(&ds, Some(IPHONE));
        assert_eq!(hw.profile, direct.component(hardware(&ds)).unwrap().profile);
    }

    #[test]
    fn test_tie_break_rules() {
        let ds = sample_dataset();
        let ipad = "Mozilla/5.0 (iPad; CPU OS 12_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148";
        let hw = hardware(&ds);
        let iphone_profile = Matcher::default()
            .detect(&ds, Some(IPHONE))
            .component(hw)
            .unwrap()
            .profile;
        let ipad_profile = Matcher::default()
            .detect(&ds, Some(ipad))
            .component(hw)
            .unwrap()
            .profile;

        // Both signatures carry the same rank in the sample data
        let headers = [("X-Device-User-Agent", IPHONE), ("User-Agent", ipad)];
        let by_order = Matcher::default().detect_with_headers(&ds, None, &headers);
        assert_eq!(by_order.component(hw).unwrap().profile, iphone_profile);

        let by_priority = Matcher::new(MatchConfig {
            tie_break: TieBreak::HeaderPriority,
            ..MatchConfig::default()
        })
        .detect_with_headers(&ds, None, &headers);
        assert_eq!(by_priority.component(hw).unwrap().profile, ipad_profile);
    }

    const TRAINING: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 7_1 like Mac OS X) Mobile/11D167";
    const GALAXY: &str = "Mozilla/5.0 (Linux; Android 10; SM-G973F) Mobile";

    /// One signature whose path is a prefix of another, plus an unrelated
    /// lower-rank signature
    fn nested_dataset() -> Dataset {
        let mut builder = DatasetBuilder::new("Nested");
        builder
            .add_component("HardwarePlatform", &["User-Agent", "X-Device-User-Agent"], 0, 256)
            .unwrap();
        builder
            .add_property(PropertyDef::new("HardwareModel", "HardwarePlatform", ValueType::String))
            .unwrap();
        builder
            .add_profile("HardwarePlatform", 1, &[("HardwareModel", "iPhone")])
            .unwrap();
        builder
            .add_profile("HardwarePlatform", 2, &[("HardwareModel", "iPhone 5s")])
            .unwrap();
        builder
            .add_profile("HardwarePlatform", 3, &[("HardwareModel", "Galaxy S10")])
            .unwrap();
        builder
            .add_signature(TRAINING, 12, &[1], &[("HardwarePlatform", &["iPhone"])])
            .unwrap();
        builder
            .add_signature(
                TRAINING,
                10,
                &[2],
                &[("HardwarePlatform", &["iPhone", "OS 7_1", "Mobile/11D167"])],
            )
            .unwrap();
        builder
            .add_signature(GALAXY, 8, &[3], &[("HardwarePlatform", &["Linux; Android", "SM-G973F"])])
            .unwrap();
        Dataset::from_bytes(&builder.build().unwrap()).unwrap()
    }

    fn profile_id(ds: &Dataset, m: &Match) -> u32 {
        let hw = hardware(ds);
        ds.profile(hw, m.component(hw).unwrap().profile)
            .unwrap()
            .profile_id
    }

    #[test]
    fn test_signature_on_path_wins_when_descent_goes_deeper() {
        let ds = nested_dataset();
        let ua = TRAINING.replace("Mobile/11D167", "Mobile/99Z999");

        let trie = Matcher::default().detect(&ds, Some(&ua));
        let hw = trie.component(hardware(&ds)).unwrap();
        assert_eq!(hw.method, MatchMethod::Exact);
        assert_eq!(hw.distance, 0);
        assert_eq!(profile_id(&ds, &trie), 1);

        let scan = Matcher::new(MatchConfig {
            strategy: StrategyKind::Scan,
            ..MatchConfig::default()
        })
        .detect(&ds, Some(&ua));
        assert_eq!(scan.component(hardware(&ds)).unwrap().method, MatchMethod::Exact);
        assert_eq!(profile_id(&ds, &scan), 1);

        // The full path still reaches the deeper signature
        let full = Matcher::default().detect(&ds, Some(TRAINING));
        assert_eq!(profile_id(&ds, &full), 2);
    }

    #[test]
    fn test_higher_rank_beats_earlier_input() {
        let ds = nested_dataset();
        let iphone = TRAINING.replace("Mobile/11D167", "Mobile/99Z999");

        for tie_break in [TieBreak::InputOrder, TieBreak::HeaderPriority] {
            let matcher = Matcher::new(MatchConfig {
                tie_break,
                ..MatchConfig::default()
            });
            // Rank 8 first, rank 12 second
            let m = matcher.detect_with_headers(
                &ds,
                Some(GALAXY),
                &[("X-Device-User-Agent", iphone.as_str())],
            );
            let hw = m.component(hardware(&ds)).unwrap();
            assert_eq!(hw.method, MatchMethod::Exact);
            assert_eq!(hw.rank, 12);
            assert_eq!(profile_id(&ds, &m), 1, "{:?}", tie_break);

            // And the same when the stronger input comes first
            let m = matcher.detect_with_headers(
                &ds,
                Some(iphone.as_str()),
                &[("X-Device-User-Agent", GALAXY)],
            );
            assert_eq!(profile_id(&ds, &m), 1, "{:?}", tie_break);
        }
    }

    #[test]
    fn test_unread_headers_ignored() {
        let ds = sample_dataset();
        let m = Matcher::default().detect_with_headers(&ds, None, &[("Accept", IPHONE)]);
        assert_eq!(m.method(), MatchMethod::Default);
    }

    #[test]
    fn test_config_parsing() {
        assert_eq!("Scan".parse::<StrategyKind>(), Ok(StrategyKind::Scan));
        assert!("regex".parse::<StrategyKind>().is_err());
        assert_eq!(
            "header-priority".parse::<TieBreak>(),
            Ok(TieBreak::HeaderPriority)
        );
        let config: MatchConfig = serde_json::from_str(r#"{"max_candidates": 5}"#).unwrap();
        assert_eq!(config.max_candidates, 5);
        assert_eq!(config.shift_window, 8);
        assert_eq!(config.strategy, StrategyKind::Trie);
    }
}
