//! Reverse lookups: which profiles hold a property value
//!
//! Backed by the reverse-index sections, which list for every value the
//! ascending profile indices assigned it. Profiles reaching a value through
//! the property default are found by scanning the owning component.

use crate::dataset::{Dataset, Profile, ProfileIndex, Property, ValueType};
use crate::error::Result;
use crate::resolver::parse_bool;

/// Typed form of a query value
enum Query<'q> {
    Text(&'q str),
    Bool(bool),
    Int(i64),
    Double(f64),
}

impl<'q> Query<'q> {
    /// Parse `value` for `value_type`; `None` when it cannot match anything
    fn parse(value_type: ValueType, value: &'q str) -> Option<Self> {
        match value_type {
            ValueType::String => Some(Query::Text(value)),
            ValueType::Bool => parse_bool(value).map(Query::Bool),
            ValueType::Int => value.trim().parse().ok().map(Query::Int),
            ValueType::Double => value.trim().parse().ok().map(Query::Double),
        }
    }

    fn matches(&self, stored: &str) -> bool {
        match self {
            Query::Text(q) => eq_ignore_case(q, stored),
            Query::Bool(q) => parse_bool(stored) == Some(*q),
            Query::Int(q) => stored.trim().parse::<i64>().ok() == Some(*q),
            Query::Double(q) => stored.trim().parse::<f64>().ok() == Some(*q),
        }
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
        || a
            .chars()
            .flat_map(char::to_lowercase)
            .eq(b.chars().flat_map(char::to_lowercase))
}

/// Profile indices resolving `property` to `value`, ascending
///
/// Profiles with no assignment for the property resolve to its default, so
/// they are included whenever the query equals that default.
fn matching_indices(dataset: &Dataset, property: &Property, value: &str) -> Vec<ProfileIndex> {
    let Some(query) = Query::parse(property.value_type, value) else {
        return Vec::new();
    };

    let component = dataset.component(property.component);
    let unassigned: Vec<ProfileIndex> = match (property.default_value, component) {
        (Some(default), Some(component)) if query.matches(dataset.value_name(default)) => dataset
            .profiles(component)
            .iter()
            .filter(|p| dataset.values_for(p, property.id).is_empty())
            .map(|p| p.index)
            .collect(),
        _ => Vec::new(),
    };

    let mut hits: Vec<&[ProfileIndex]> = dataset
        .property_values(property)
        .iter()
        .filter(|v| query.matches(dataset.string(v.name)))
        .map(|v| dataset.profiles_with_value(v.id))
        .collect();

    if !unassigned.is_empty() {
        hits.push(&unassigned);
    }

    match hits.len() {
        0 => Vec::new(),
        1 => hits.pop().map(<[ProfileIndex]>::to_vec).unwrap_or_default(),
        _ => {
            let mut merged: Vec<ProfileIndex> = hits.concat();
            merged.sort_unstable();
            merged.dedup();
            merged
        }
    }
}

/// Every profile holding `value` for the property called `name`, ordered
/// by profile index
///
/// String properties compare case-insensitively; boolean and numeric
/// properties compare typed, so `"true"` finds `True` and `"1.0"` finds `1`.
/// Fails with [`crate::Error::UnknownProperty`] for undefined names.
pub fn find_profiles<'a>(dataset: &'a Dataset, name: &str, value: &str) -> Result<Vec<&'a Profile>> {
    let property = dataset.require_property(name)?;
    let Some(component) = dataset.component(property.component) else {
        return Ok(Vec::new());
    };
    let profiles = dataset.profiles(component);
    Ok(matching_indices(dataset, property, value)
        .into_iter()
        .filter_map(|index| profiles.get(index as usize))
        .collect())
}

/// Narrow an earlier result to the profiles that also hold `value`
///
/// Profiles from other components than the property's are dropped.
pub fn narrow_profiles<'a>(
    dataset: &'a Dataset,
    profiles: &[&'a Profile],
    name: &str,
    value: &str,
) -> Result<Vec<&'a Profile>> {
    let property = dataset.require_property(name)?;
    let indices = matching_indices(dataset, property, value);
    Ok(profiles
        .iter()
        .copied()
        .filter(|p| p.component == property.component && indices.binary_search(&p.index).is_ok())
        .collect())
}
