//! Device identifiers
//!
//! A device id is the profile of every component joined by `-`, in dataset
//! component order:
//!
//! ```text
//! 12-0-7-0        profile indices (encode / decode)
//! 17779-17470-18092-18056   profile ids (encode_stable / decode_stable)
//! ```
//!
//! Index form is positional within one dataset. The stable form uses the
//! external profile ids and survives a dataset reload.

use crate::dataset::{Dataset, ProfileIndex};
use crate::error::{Error, Result};
use crate::matcher::{ComponentMatch, Match, MatchMethod};

/// Segment separator
pub const SEPARATOR: char = '-';

/// Encode a match as profile indices
pub fn encode(_dataset: &Dataset, matched: &Match) -> String {
    join(matched.components().iter().map(|c| c.profile))
}

/// Encode a match as stable profile ids
pub fn encode_stable(dataset: &Dataset, matched: &Match) -> String {
    join(matched.components().iter().map(|c| {
        dataset
            .profile(c.component, c.profile)
            .map_or(0, |p| p.profile_id)
    }))
}

fn join(parts: impl Iterator<Item = u32>) -> String {
    parts
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(&SEPARATOR.to_string())
}

/// Split and parse an id into exactly one number per component
fn segments(dataset: &Dataset, id: &str) -> Result<Vec<u32>> {
    let parts: Vec<&str> = id.split(SEPARATOR).collect();
    let expected = dataset.components().len();
    if parts.len() != expected {
        return Err(Error::invalid_device_id(
            id,
            format!("expected {} segments, found {}", expected, parts.len()),
        ));
    }
    parts
        .iter()
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::invalid_device_id(
                    id,
                    format!("segment '{}' is not a number", part),
                ));
            }
            part.parse::<u32>().map_err(|_| {
                Error::invalid_device_id(id, format!("segment '{}' is out of range", part))
            })
        })
        .collect()
}

fn decoded(dataset: &Dataset, indices: impl Iterator<Item = ProfileIndex>) -> Match {
    let components = dataset
        .components()
        .iter()
        .zip(indices)
        .map(|(component, profile)| ComponentMatch {
            component: component.id,
            profile,
            method: MatchMethod::DeviceId,
            signature: None,
            rank: 0,
            distance: 0,
            candidates: 0,
        })
        .collect();
    Match::new(None, components)
}

/// Decode a profile-index device id
///
/// Fails with [`Error::InvalidDeviceId`] on a wrong segment count, a
/// non-numeric segment or an index outside its component.
pub fn decode(dataset: &Dataset, id: &str) -> Result<Match> {
    let indices = segments(dataset, id)?;
    for (component, index) in dataset.components().iter().zip(&indices) {
        if dataset.profile(component.id, *index).is_none() {
            return Err(Error::invalid_device_id(
                id,
                format!(
                    "profile index {} out of bounds for component {}",
                    index,
                    dataset.component_name(component)
                ),
            ));
        }
    }
    Ok(decoded(dataset, indices.into_iter()))
}

/// Decode a profile-id device id
pub fn decode_stable(dataset: &Dataset, id: &str) -> Result<Match> {
    let ids = segments(dataset, id)?;
    let mut indices = Vec::with_capacity(ids.len());
    for (component, profile_id) in dataset.components().iter().zip(&ids) {
        let profile = dataset
            .profile_by_id(component.id, *profile_id)
            .ok_or_else(|| {
                Error::invalid_device_id(
                    id,
                    format!(
                        "no profile {} in component {}",
                        profile_id,
                        dataset.component_name(component)
                    ),
                )
            })?;
        indices.push(profile.index);
    }
    Ok(decoded(dataset, indices.into_iter()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_dataset;
    use crate::matcher::Matcher;

    const FIREFOX: &str = "Mozilla/5.0 (Windows NT 6.3; WOW64; rv:41.0) Gecko/20100101 Firefox/41.0";

    #[test]
    fn test_roundtrip() {
        let ds = sample_dataset();
        let m = Matcher::default().detect(&ds, Some(FIREFOX));
        let id = encode(&ds, &m);
        assert_eq!(id.split('-').count(), ds.components().len());

        let back = decode(&ds, &id).unwrap();
        assert_eq!(back.profiles(), m.profiles());
        assert_eq!(back.method(), MatchMethod::DeviceId);
        assert_eq!(encode(&ds, &back), id);
    }

    #[test]
    fn test_stable_roundtrip() {
        let ds = sample_dataset();
        let m = Matcher::default().detect(&ds, Some(FIREFOX));
        let id = encode_stable(&ds, &m);
        let back = decode_stable(&ds, &id).unwrap();
        assert_eq!(back.profiles(), m.profiles());
        // Index 0 is the sentinel with profile id 0 in every component
        let unknown = vec!["0"; ds.components().len()].join("-");
        assert_eq!(decode_stable(&ds, &unknown).unwrap().profiles(), vec![0; 4]);
    }

    #[test]
    fn test_wrong_segment_count() {
        let ds = sample_dataset();
        let err = decode(&ds, "12-5").unwrap_err();
        assert!(matches!(err, Error::InvalidDeviceId { .. }));
        assert!(err.to_string().contains("expected 4 segments, found 2"));
        assert!(decode(&ds, "").is_err());
    }

    #[test]
    fn test_non_numeric_and_out_of_bounds() {
        let ds = sample_dataset();
        for id in ["1-a-0-0", "1--0-0", "+1-0-0-0", "0-0-0-99999999999", "0-0-0-4000"] {
            assert!(
                matches!(decode(&ds, id), Err(Error::InvalidDeviceId { .. })),
                "{} should be rejected",
                id
            );
        }
        assert!(decode_stable(&ds, "0-0-0-424242").is_err());
    }
}
