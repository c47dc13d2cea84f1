#![no_main]
use devicematch::{Dataset, MatchConfig, Matcher, Source, StrategyKind};
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

fn dataset() -> &'static Dataset {
    static DATASET: OnceLock<Dataset> = OnceLock::new();
    DATASET.get_or_init(|| {
        let source = Source::from_json(include_str!("../../tests/data/sample.json")).unwrap();
        Dataset::from_bytes(&source.build().unwrap()).unwrap()
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(ua) = std::str::from_utf8(data) else {
        return;
    };
    let ds = dataset();
    for strategy in [StrategyKind::Trie, StrategyKind::Scan] {
        let matcher = Matcher::new(MatchConfig {
            max_candidates: 4,
            strategy,
            ..MatchConfig::default()
        });
        let m = matcher.detect_with_headers(ds, Some(ua), &[("X-Device-User-Agent", ua)]);
        for c in m.components() {
            assert!(ds.profile(c.component, c.profile).is_some());
            assert!(c.candidates <= 4);
        }
        let id = devicematch::device_id::encode(ds, &m);
        let back = devicematch::device_id::decode(ds, &id).unwrap();
        assert_eq!(back.profiles(), m.profiles());
    }
});
