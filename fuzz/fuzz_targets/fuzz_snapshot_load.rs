#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Garbage must be rejected with an error, never a panic
    if let Ok(dataset) = devicematch::Dataset::from_bytes(data) {
        let matcher = devicematch::Matcher::default();
        let m = matcher.detect(&dataset, Some("Mozilla/5.0 (iPhone; CPU iPhone OS 7_1)"));
        let _ = devicematch::resolver::resolve_all(&dataset, &m);
    }
});
