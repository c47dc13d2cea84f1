//! Snapshot building, loading and corruption handling

use devicematch::format::{MAGIC, VERSION};
use devicematch::{Dataset, DatasetBuilder, Error, PropertyDef, Source, ValueType};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use tempfile::TempDir;

const SAMPLE: &str = include_str!("data/sample.json");

fn sample_bytes() -> Vec<u8> {
    Source::from_json(SAMPLE).unwrap().build().unwrap()
}

fn expect_format_error(bytes: &[u8], what: &str) {
    match Dataset::from_bytes(bytes) {
        Ok(_) => panic!("{} loaded successfully", what),
        Err(e) => assert!(e.is_format(), "{}: expected format error, got {}", what, e),
    }
}

#[test]
fn test_build_is_reproducible() {
    let first = sample_bytes();
    let second = sample_bytes();
    assert_eq!(first, second);
    assert_eq!(&first[..MAGIC.len()], MAGIC);

    let ds = Dataset::from_bytes(&first).unwrap();
    assert_eq!(ds.info().format_version, VERSION);
    assert_eq!(ds.info().name, "Sample");
}

#[test]
fn test_bad_magic_and_version() {
    let mut bytes = sample_bytes();
    bytes[0] = b'X';
    expect_format_error(&bytes, "bad magic");

    let mut bytes = sample_bytes();
    bytes[MAGIC.len()..MAGIC.len() + 4].copy_from_slice(&(VERSION + 1).to_le_bytes());
    expect_format_error(&bytes, "future version");
}

#[test]
fn test_every_truncation_rejected() {
    let bytes = sample_bytes();
    for len in (0..bytes.len()).step_by(7) {
        expect_format_error(&bytes[..len], &format!("truncated to {}", len));
    }
    expect_format_error(&bytes[..bytes.len() - 1], "one byte short");
}

#[test]
fn test_flipped_body_bytes_rejected() {
    let bytes = sample_bytes();
    for at in (32..bytes.len()).step_by(bytes.len() / 40 + 1) {
        let mut corrupt = bytes.clone();
        corrupt[at] ^= 0x5a;
        expect_format_error(&corrupt, &format!("flipped byte {}", at));
    }
}

#[test]
fn test_trailing_garbage_rejected() {
    let mut bytes = sample_bytes();
    bytes.extend_from_slice(b"extra");
    expect_format_error(&bytes, "trailing bytes");
}

#[test]
fn test_open_plain_and_gzip_files() {
    let dir = TempDir::new().unwrap();
    let bytes = sample_bytes();

    let plain = dir.path().join("sample.dmt");
    std::fs::write(&plain, &bytes).unwrap();

    let packed = dir.path().join("sample.dmt.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&bytes).unwrap();
    std::fs::write(&packed, encoder.finish().unwrap()).unwrap();

    let a = Dataset::open(&plain).unwrap();
    let b = Dataset::open(&packed).unwrap();
    assert_eq!(a.info().checksum, b.info().checksum);
    assert_eq!(a.stats().signatures, b.stats().signatures);
    assert_eq!(a.stats().profiles, b.stats().profiles);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = Dataset::open(dir.path().join("absent.dmt")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(!err.is_format());
}

#[test]
fn test_corrupt_gzip_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.dmt.gz");
    // gzip magic followed by junk
    std::fs::write(&path, [0x1f, 0x8b, 0x08, 0x00, 0xde, 0xad, 0xbe, 0xef]).unwrap();
    assert!(Dataset::open(&path).is_err());
}

#[test]
fn test_builder_rejects_inconsistent_input() {
    let mut builder = DatasetBuilder::new("Errors");
    builder
        .add_component("HardwarePlatform", &["User-Agent"], 0, 64)
        .unwrap();
    assert!(builder
        .add_component("HardwarePlatform", &["User-Agent"], 0, 64)
        .is_err());
    assert!(builder.add_component("Empty", &[], 0, 64).is_err());
    assert!(builder.add_component("Inverted", &["User-Agent"], 9, 3).is_err());

    builder
        .add_property(PropertyDef::new("ScreenPixelsWidth", "HardwarePlatform", ValueType::Int))
        .unwrap();
    assert!(builder
        .add_property(PropertyDef::new("Orphan", "NoSuchComponent", ValueType::String))
        .is_err());

    assert!(builder.add_profile("HardwarePlatform", 0, &[]).is_err());
    assert!(builder
        .add_profile("HardwarePlatform", 5, &[("ScreenPixelsWidth", "wide")])
        .is_err());
    assert!(builder
        .add_profile("HardwarePlatform", 5, &[("Colour", "Red")])
        .is_err());
    builder
        .add_profile("HardwarePlatform", 5, &[("ScreenPixelsWidth", "640")])
        .unwrap();
    assert!(builder.add_profile("HardwarePlatform", 5, &[]).is_err());

    // Pattern must occur in the training agent
    assert!(builder
        .add_signature("Mozilla/5.0 (Nokia)", 1, &[5], &[("HardwarePlatform", &["iPhone"])])
        .is_err());
    assert!(builder
        .add_signature("Mozilla/5.0 (Nokia)", 1, &[5], &[])
        .is_err());

    let stats = builder.stats();
    assert_eq!(stats.components, 1);
    assert_eq!(stats.profiles, 1);
    assert_eq!(stats.signatures, 0);
}

#[test]
fn test_signature_with_unknown_profile_fails_build() {
    let mut builder = DatasetBuilder::new("Errors");
    builder
        .add_component("HardwarePlatform", &["User-Agent"], 0, 64)
        .unwrap();
    builder
        .add_signature("Mozilla/5.0 (Nokia)", 1, &[77], &[("HardwarePlatform", &["Nokia"])])
        .unwrap();
    assert!(matches!(builder.build(), Err(Error::Build(_))));
}
