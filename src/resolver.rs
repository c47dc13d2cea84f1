//! Property resolution
//!
//! Reads a property's value from the profile a [`Match`] chose for the
//! property's component, falling back to the property's default value.

use crate::dataset::{Dataset, Property};
use crate::error::Result;
use crate::matcher::Match;
use serde::Serialize;
use std::fmt;

/// Value of one property for one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue<'a> {
    /// Single-valued property
    Single(&'a str),
    /// List-valued property (possibly empty)
    List(Vec<&'a str>),
    /// No assignment and no default
    NotAvailable,
}

impl<'a> PropertyValue<'a> {
    /// True unless [`PropertyValue::NotAvailable`]
    pub fn is_available(&self) -> bool {
        !matches!(self, PropertyValue::NotAvailable)
    }

    /// The single value, or the first value of a list
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            PropertyValue::Single(v) => Some(v),
            PropertyValue::List(values) => values.first().copied(),
            PropertyValue::NotAvailable => None,
        }
    }

    /// Every value as a list
    pub fn values(&self) -> Vec<&'a str> {
        match self {
            PropertyValue::Single(v) => vec![*v],
            PropertyValue::List(values) => values.clone(),
            PropertyValue::NotAvailable => Vec::new(),
        }
    }

    /// Parse as a boolean (`True`/`False`, any case)
    pub fn as_bool(&self) -> Option<bool> {
        self.as_str().and_then(parse_bool)
    }

    /// Parse as a signed integer
    pub fn as_i64(&self) -> Option<i64> {
        self.as_str().and_then(|v| v.trim().parse().ok())
    }

    /// Parse as a floating point number
    pub fn as_f64(&self) -> Option<f64> {
        self.as_str().and_then(|v| v.trim().parse().ok())
    }
}

impl fmt::Display for PropertyValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Single(v) => f.write_str(v),
            PropertyValue::List(values) => f.write_str(&values.join("|")),
            PropertyValue::NotAvailable => f.write_str("N/A"),
        }
    }
}

/// Parse `True`/`False` in any case
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Resolve a property by name
///
/// Fails with [`crate::Error::UnknownProperty`] when the dataset does not
/// define `name`.
pub fn resolve<'a>(dataset: &'a Dataset, matched: &Match, name: &str) -> Result<PropertyValue<'a>> {
    let property = dataset.require_property(name)?;
    Ok(resolve_property(dataset, matched, property))
}

/// Resolve a property the caller has already looked up
pub fn resolve_property<'a>(
    dataset: &'a Dataset,
    matched: &Match,
    property: &Property,
) -> PropertyValue<'a> {
    let assigned = matched
        .profile(dataset, property.component)
        .map(|profile| dataset.values_for(profile, property.id))
        .unwrap_or_default();

    if !assigned.is_empty() {
        let values = assigned.iter().map(|v| dataset.value_name(*v));
        return if property.is_list {
            PropertyValue::List(values.collect())
        } else {
            values
                .map(PropertyValue::Single)
                .next()
                .unwrap_or(PropertyValue::NotAvailable)
        };
    }

    match property.default_value {
        Some(default) if property.is_list => PropertyValue::List(vec![dataset.value_name(default)]),
        Some(default) => PropertyValue::Single(dataset.value_name(default)),
        None => PropertyValue::NotAvailable,
    }
}

/// Resolve every property, in property id order
pub fn resolve_all<'a>(dataset: &'a Dataset, matched: &Match) -> Vec<(&'a str, PropertyValue<'a>)> {
    dataset
        .properties()
        .iter()
        .map(|p| (dataset.property_name(p), resolve_property(dataset, matched, p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_dataset;
    use crate::matcher::Matcher;
    use crate::Error;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 7_1 like Mac OS X) AppleWebKit/537.51.2 (KHTML, like Gecko) 'Version/7.0 Mobile/11D167 Safari/9537.53";
    const ANDROID: &str = "Mozilla/5.0 (Linux; Android 10; SM-G973F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/83.0.4103.106 Mobile Safari/537.36";

    #[test]
    fn test_iphone_properties() {
        let ds = sample_dataset();
        let m = Matcher::default().detect(&ds, Some(IPHONE));
        assert_eq!(resolve(&ds, &m, "IsMobile").unwrap().as_bool(), Some(true));
        assert_eq!(resolve(&ds, &m, "HardwareVendor").unwrap().as_str(), Some("Apple"));
        assert_eq!(resolve(&ds, &m, "PlatformName").unwrap().as_str(), Some("iOS"));
        assert_eq!(
            resolve(&ds, &m, "ScreenPixelsWidth").unwrap().as_i64(),
            Some(640)
        );
    }

    #[test]
    fn test_empty_input_falls_back_to_defaults() {
        let ds = sample_dataset();
        let m = Matcher::default().detect(&ds, Some(""));
        assert_eq!(resolve(&ds, &m, "IsMobile").unwrap().as_bool(), Some(false));
        assert_eq!(
            resolve(&ds, &m, "HardwareModel").unwrap(),
            PropertyValue::NotAvailable
        );
    }

    #[test]
    fn test_list_property() {
        let ds = sample_dataset();
        let m = Matcher::default().detect(&ds, Some(ANDROID));
        let bearers = resolve(&ds, &m, "Bearers").unwrap();
        assert!(matches!(bearers, PropertyValue::List(_)));
        assert_eq!(bearers.values().len(), 3);
        assert!(bearers.values().contains(&"LTE"));
        assert_eq!(bearers.to_string().split('|').count(), 3);
    }

    #[test]
    fn test_unknown_property() {
        let ds = sample_dataset();
        let m = Matcher::default().detect(&ds, Some(IPHONE));
        let err = resolve(&ds, &m, "NoSuchProperty").unwrap_err();
        assert!(matches!(err, Error::UnknownProperty(name) if name == "NoSuchProperty"));
    }

    #[test]
    fn test_resolve_all_covers_catalog() {
        let ds = sample_dataset();
        let m = Matcher::default().detect(&ds, Some(IPHONE));
        let all = resolve_all(&ds, &m);
        assert_eq!(all.len(), ds.properties().len());
        let json = serde_json::to_value(&all).unwrap();
        assert!(json.is_array());
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_bool(" TRUE "), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(PropertyValue::Single("2.5").as_f64(), Some(2.5));
        assert_eq!(PropertyValue::NotAvailable.as_i64(), None);
        assert_eq!(PropertyValue::NotAvailable.to_string(), "N/A");
    }
}
