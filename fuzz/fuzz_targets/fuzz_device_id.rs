#![no_main]
use devicematch::{Dataset, Source};
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

fn dataset() -> &'static Dataset {
    static DATASET: OnceLock<Dataset> = OnceLock::new();
    DATASET.get_or_init(|| {
        let source = Source::from_json(include_str!("../../tests/data/sample.json")).unwrap();
        Dataset::from_bytes(&source.build().unwrap()).unwrap()
    })
}

fuzz_target!(|id: &str| {
    let ds = dataset();
    for decoded in [
        devicematch::device_id::decode(ds, id),
        devicematch::device_id::decode_stable(ds, id),
    ] {
        if let Ok(m) = decoded {
            for c in m.components() {
                assert!(ds.profile(c.component, c.profile).is_some());
            }
        }
    }
});
