//! Dataset builder
//!
//! Compiles components, properties, profiles and training user agents into
//! a binary snapshot that [`Dataset::from_bytes`](crate::Dataset::from_bytes)
//! accepts.
//!
//! A signature is described by the user agent it was trained on plus, per
//! component, the substrings that identify it. Substrings are located left
//! to right in the user agent; each becomes a trie node at the offset where
//! it was found, weighted by its length.
//!
//! ```
//! use devicematch::{DatasetBuilder, PropertyDef, ValueType};
//!
//! let mut builder = DatasetBuilder::new("Example");
//! builder.add_component("HardwarePlatform", &["User-Agent"], 0, 256)?;
//! builder.add_property(PropertyDef::new("IsMobile", "HardwarePlatform", ValueType::Bool))?;
//! builder.add_profile("HardwarePlatform", 17, &[("IsMobile", "True")])?;
//! builder.add_signature(
//!     "Mozilla/5.0 (iPhone; CPU iPhone OS 7_1 like Mac OS X)",
//!     10,
//!     &[17],
//!     &[("HardwarePlatform", &["iPhone"])],
//! )?;
//! let bytes = builder.build()?;
//! assert!(!bytes.is_empty());
//! # Ok::<(), devicematch::Error>(())
//! ```

use crate::dataset::{ComponentId, PropertyId, ValueType};
use crate::error::{Error, Result};
use crate::format::{
    to_u32, ComponentRecord, InfoRecord, NodeRecord, ProfileRecord, PropertyRecord,
    ReverseRecord, SectionKind, SignatureRecord, SnapshotWriter, ValueRecord,
    MAX_MIN_LENGTH, NONE, PROPERTY_FLAG_LIST,
};
use crate::resolver::parse_bool;
use crate::strings::StringTable;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use tracing::debug;
use zerocopy::byteorder::little_endian::U32;

/// Property definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    /// Unique property name
    pub name: String,
    /// Name of the owning component
    pub component: String,
    /// Declared value type
    pub value_type: ValueType,
    /// Profiles may hold several values
    pub is_list: bool,
    /// Value reported when a profile has none
    pub default_value: Option<String>,
    /// Free text description
    pub description: Option<String>,
}

impl PropertyDef {
    /// Single-valued property without default or description
    pub fn new(name: impl Into<String>, component: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            component: component.into(),
            value_type,
            is_list: false,
            default_value: None,
            description: None,
        }
    }

    /// Mark as list-valued
    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    /// Set the default value
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

#[derive(Debug, Clone)]
struct ComponentDef {
    name: String,
    headers: Vec<String>,
    min_length: u32,
    max_length: u32,
    default_profile: Option<u32>,
}

#[derive(Debug, Clone)]
struct ProfileDef {
    component: usize,
    profile_id: u32,
    values: Vec<(usize, String)>,
}

#[derive(Debug, Clone)]
struct SignatureDef {
    rank: u32,
    profile_ids: Vec<u32>,
    /// (component, [(offset, characters)])
    paths: Vec<(usize, Vec<(u32, String)>)>,
}

/// Builder statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuilderStats {
    /// Components defined
    pub components: usize,
    /// Properties defined
    pub properties: usize,
    /// Profiles added (excluding the per-component unknown profile)
    pub profiles: usize,
    /// Signatures added, before deduplication
    pub signatures: usize,
}

/// Compiles entity definitions into a snapshot
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    name: String,
    published: String,
    components: Vec<ComponentDef>,
    properties: Vec<PropertyDef>,
    property_index: FxHashMap<String, usize>,
    profiles: Vec<ProfileDef>,
    /// profile id -> component
    profile_owner: FxHashMap<u32, usize>,
    signatures: Vec<SignatureDef>,
}

/// Trie node under construction
struct NodeDraft {
    component: usize,
    parent: Option<u32>,
    offset: u32,
    characters: Option<String>,
    children: Vec<u32>,
    signature: Option<u32>,
    ranked: Vec<u32>,
}

/// Signature under construction
struct SignatureDraft {
    component: usize,
    rank: u32,
    nodes: Vec<u32>,
    profiles: Vec<u32>,
}

impl DatasetBuilder {
    /// Create an empty builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            published: String::new(),
            components: Vec::new(),
            properties: Vec::new(),
            property_index: FxHashMap::default(),
            profiles: Vec::new(),
            profile_owner: FxHashMap::default(),
            signatures: Vec::new(),
        }
    }

    /// Set the publication date recorded in the snapshot
    pub fn with_published(mut self, date: impl Into<String>) -> Self {
        self.published = date.into();
        self
    }

    fn component_index(&self, name: &str) -> Result<usize> {
        self.components
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| Error::build(format!("unknown component '{}'", name)))
    }

    /// Define a component reading `headers` (in priority order)
    pub fn add_component(
        &mut self,
        name: &str,
        headers: &[&str],
        min_length: u32,
        max_length: u32,
    ) -> Result<ComponentId> {
        if self.components.iter().any(|c| c.name == name) {
            return Err(Error::build(format!("duplicate component '{}'", name)));
        }
        if headers.is_empty() {
            return Err(Error::build(format!("component '{}' reads no headers", name)));
        }
        if min_length > max_length {
            return Err(Error::build(format!(
                "component '{}' min length {} exceeds max length {}",
                name, min_length, max_length
            )));
        }
        if min_length > MAX_MIN_LENGTH {
            return Err(Error::build(format!(
                "component '{}' min length {} exceeds {}",
                name, min_length, MAX_MIN_LENGTH
            )));
        }
        self.components.push(ComponentDef {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            min_length,
            max_length,
            default_profile: None,
        });
        to_u32(self.components.len() - 1, "component count")
    }

    /// Use the profile with `profile_id` when nothing matches
    pub fn set_default_profile(&mut self, component: &str, profile_id: u32) -> Result<()> {
        let index = self.component_index(component)?;
        self.components[index].default_profile = Some(profile_id);
        Ok(())
    }

    /// Define a property
    pub fn add_property(&mut self, def: PropertyDef) -> Result<PropertyId> {
        if self.property_index.contains_key(&def.name) {
            return Err(Error::build(format!("duplicate property '{}'", def.name)));
        }
        self.component_index(&def.component)?;
        if let Some(default) = &def.default_value {
            check_typed(&def, default)?;
        }
        let id = self.properties.len();
        self.property_index.insert(def.name.clone(), id);
        self.properties.push(def);
        to_u32(id, "property count")
    }

    /// Add a profile with `(property, value)` assignments
    ///
    /// List-valued properties take one pair per value. Profile id 0 is
    /// reserved for the per-component unknown profile, and ids are unique
    /// across components.
    pub fn add_profile(
        &mut self,
        component: &str,
        profile_id: u32,
        values: &[(&str, &str)],
    ) -> Result<()> {
        let component_index = self.component_index(component)?;
        if profile_id == 0 {
            return Err(Error::build("profile id 0 is reserved"));
        }
        if self.profile_owner.contains_key(&profile_id) {
            return Err(Error::build(format!("duplicate profile id {}", profile_id)));
        }

        let mut assigned: Vec<(usize, String)> = Vec::with_capacity(values.len());
        for (name, value) in values {
            let property = *self
                .property_index
                .get(*name)
                .ok_or_else(|| Error::build(format!("unknown property '{}'", name)))?;
            let def = &self.properties[property];
            if def.component != component {
                return Err(Error::build(format!(
                    "property '{}' belongs to component '{}', not '{}'",
                    name, def.component, component
                )));
            }
            check_typed(def, value)?;
            if !def.is_list && assigned.iter().any(|(p, _)| *p == property) {
                return Err(Error::build(format!(
                    "profile {} assigns several values to single-valued property '{}'",
                    profile_id, name
                )));
            }
            assigned.push((property, value.to_string()));
        }

        self.profile_owner.insert(profile_id, component_index);
        self.profiles.push(ProfileDef {
            component: component_index,
            profile_id,
            values: assigned,
        });
        Ok(())
    }

    /// Add a signature trained on `user_agent`
    ///
    /// `profile_ids` lists at most one profile per component; components
    /// without one get their unknown profile. `patterns` gives, per
    /// component, the substrings forming that component's trie path.
    pub fn add_signature(
        &mut self,
        user_agent: &str,
        rank: u32,
        profile_ids: &[u32],
        patterns: &[(&str, &[&str])],
    ) -> Result<()> {
        if patterns.is_empty() {
            return Err(Error::build(format!(
                "signature '{}' defines no patterns",
                user_agent
            )));
        }
        let mut paths = Vec::with_capacity(patterns.len());
        for (component, substrings) in patterns {
            let component_index = self.component_index(component)?;
            if paths.iter().any(|(c, _)| *c == component_index) {
                return Err(Error::build(format!(
                    "signature '{}' lists component '{}' twice",
                    user_agent, component
                )));
            }
            let path = locate(user_agent, substrings, &self.components[component_index])?;
            paths.push((component_index, path));
        }
        self.signatures.push(SignatureDef {
            rank,
            profile_ids: profile_ids.to_vec(),
            paths,
        });
        Ok(())
    }

    /// Counts of what has been added so far
    pub fn stats(&self) -> BuilderStats {
        BuilderStats {
            components: self.components.len(),
            properties: self.properties.len(),
            profiles: self.profiles.len(),
            signatures: self.signatures.len(),
        }
    }

    /// Compile everything into a snapshot
    pub fn build(&self) -> Result<Vec<u8>> {
        if self.components.is_empty() {
            return Err(Error::build("dataset defines no components"));
        }
        let mut strings = StringTable::new();
        let info = InfoRecord {
            name: U32::new(strings.intern(&self.name)),
            published: U32::new(strings.intern(&self.published)),
        };

        // Profiles per component, ascending profile id; index 0 is unknown
        let mut grouped: Vec<Vec<&ProfileDef>> = vec![Vec::new(); self.components.len()];
        for profile in &self.profiles {
            grouped[profile.component].push(profile);
        }
        for group in &mut grouped {
            group.sort_by_key(|p| p.profile_id);
        }
        let mut profile_index: FxHashMap<u32, (usize, u32)> = FxHashMap::default();
        for (component, group) in grouped.iter().enumerate() {
            for (position, profile) in group.iter().enumerate() {
                profile_index.insert(profile.profile_id, (component, to_u32(position + 1, "profile index")?));
            }
        }

        // Values: grouped by property, sorted within a property
        let mut distinct: Vec<BTreeSet<&str>> = vec![BTreeSet::new(); self.properties.len()];
        for profile in &self.profiles {
            for (property, value) in &profile.values {
                distinct[*property].insert(value);
            }
        }
        for (property, def) in self.properties.iter().enumerate() {
            if let Some(default) = &def.default_value {
                distinct[property].insert(default);
            }
        }
        let mut value_records = Vec::new();
        let mut value_ids: FxHashMap<(usize, &str), u32> = FxHashMap::default();
        for (property, values) in distinct.iter().enumerate() {
            for value in values {
                let id = to_u32(value_records.len(), "value count")?;
                value_records.push(ValueRecord {
                    property: U32::new(to_u32(property, "property id")?),
                    name: U32::new(strings.intern(value)),
                });
                value_ids.insert((property, *value), id);
            }
        }

        // Profile records and the reverse index
        let mut profile_records = Vec::new();
        let mut profile_values: Vec<u32> = Vec::new();
        let mut holders: Vec<Vec<u32>> = vec![Vec::new(); value_records.len()];
        for (component, group) in grouped.iter().enumerate() {
            profile_records.push(ProfileRecord {
                component: U32::new(to_u32(component, "component id")?),
                profile_id: U32::new(0),
                values_start: U32::new(to_u32(profile_values.len(), "profile values")?),
                values_count: U32::new(0),
            });
            for (position, profile) in group.iter().enumerate() {
                let mut ids: Vec<u32> = profile
                    .values
                    .iter()
                    .filter_map(|(property, value)| value_ids.get(&(*property, value.as_str())).copied())
                    .collect();
                ids.sort_unstable();
                ids.dedup();
                for id in &ids {
                    holders[*id as usize].push(to_u32(position + 1, "profile index")?);
                }
                profile_records.push(ProfileRecord {
                    component: U32::new(to_u32(component, "component id")?),
                    profile_id: U32::new(profile.profile_id),
                    values_start: U32::new(to_u32(profile_values.len(), "profile values")?),
                    values_count: U32::new(to_u32(ids.len(), "profile values")?),
                });
                profile_values.extend(ids);
            }
        }

        let (nodes, signatures) = self.build_tries(&profile_index)?;

        // Flatten nodes
        let mut node_children = Vec::new();
        let mut node_ranked = Vec::new();
        let mut node_records = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let characters = match &node.characters {
                Some(chars) => strings.intern(chars),
                None => NONE,
            };
            let length = node.characters.as_ref().map_or(0, |c| c.len());
            node_records.push(NodeRecord {
                component: U32::new(to_u32(node.component, "component id")?),
                parent: U32::new(node.parent.unwrap_or(NONE)),
                offset: U32::new(node.offset),
                length: U32::new(to_u32(length, "node length")?),
                characters: U32::new(characters),
                weight: U32::new(to_u32(length, "node weight")?),
                children_start: U32::new(to_u32(node_children.len(), "node children")?),
                children_count: U32::new(to_u32(node.children.len(), "node children")?),
                signature: U32::new(node.signature.unwrap_or(NONE)),
                ranked_start: U32::new(to_u32(node_ranked.len(), "node signatures")?),
                ranked_count: U32::new(to_u32(node.ranked.len(), "node signatures")?),
            });
            node_children.extend_from_slice(&node.children);
            node_ranked.extend_from_slice(&node.ranked);
        }

        // Flatten signatures
        let mut signature_nodes = Vec::new();
        let mut signature_profiles = Vec::new();
        let mut signature_records = Vec::with_capacity(signatures.len());
        for sig in &signatures {
            signature_records.push(SignatureRecord {
                component: U32::new(to_u32(sig.component, "component id")?),
                rank: U32::new(sig.rank),
                nodes_start: U32::new(to_u32(signature_nodes.len(), "signature nodes")?),
                nodes_count: U32::new(to_u32(sig.nodes.len(), "signature nodes")?),
                profiles_start: U32::new(to_u32(signature_profiles.len(), "signature profiles")?),
            });
            signature_nodes.extend_from_slice(&sig.nodes);
            signature_profiles.extend_from_slice(&sig.profiles);
        }

        // Components
        let mut component_headers = Vec::new();
        let mut component_records = Vec::with_capacity(self.components.len());
        for (id, def) in self.components.iter().enumerate() {
            let default_profile = match def.default_profile {
                None => 0,
                Some(profile_id) => match profile_index.get(&profile_id) {
                    Some((owner, index)) if *owner == id => *index,
                    _ => {
                        return Err(Error::build(format!(
                            "default profile {} of component '{}' is not one of its profiles",
                            profile_id, def.name
                        )))
                    }
                },
            };
            component_records.push(ComponentRecord {
                name: U32::new(strings.intern(&def.name)),
                default_profile: U32::new(default_profile),
                min_length: U32::new(def.min_length),
                max_length: U32::new(def.max_length),
                root_node: U32::new(to_u32(id, "root node")?),
                headers_start: U32::new(to_u32(component_headers.len(), "component headers")?),
                headers_count: U32::new(to_u32(def.headers.len(), "component headers")?),
            });
            for header in &def.headers {
                component_headers.push(strings.intern(header));
            }
        }

        // Properties
        let mut property_records = Vec::with_capacity(self.properties.len());
        for (id, def) in self.properties.iter().enumerate() {
            let component = self.component_index(&def.component)?;
            let default_value = match &def.default_value {
                Some(value) => value_ids.get(&(id, value.as_str())).copied().unwrap_or(NONE),
                None => NONE,
            };
            property_records.push(PropertyRecord {
                name: U32::new(strings.intern(&def.name)),
                description: U32::new(
                    def.description
                        .as_deref()
                        .map_or(NONE, |d| strings.intern(d)),
                ),
                component: U32::new(to_u32(component, "component id")?),
                value_type: U32::new(def.value_type.as_u32()),
                flags: U32::new(if def.is_list { PROPERTY_FLAG_LIST } else { 0 }),
                default_value: U32::new(default_value),
            });
        }

        let mut reverse_records = Vec::with_capacity(holders.len());
        let mut reverse_profiles = Vec::new();
        for list in &holders {
            reverse_records.push(ReverseRecord {
                start: U32::new(to_u32(reverse_profiles.len(), "reverse index")?),
                count: U32::new(to_u32(list.len(), "reverse index")?),
            });
            reverse_profiles.extend_from_slice(list);
        }

        let (string_count, string_bytes) = strings.to_section()?;
        let mut writer = SnapshotWriter::new();
        writer.raw(SectionKind::Strings, string_count, string_bytes);
        writer.records(SectionKind::Info, &[info]);
        writer.records(SectionKind::Components, &component_records);
        writer.u32s(SectionKind::ComponentHeaders, &component_headers);
        writer.records(SectionKind::Properties, &property_records);
        writer.records(SectionKind::Values, &value_records);
        writer.records(SectionKind::Profiles, &profile_records);
        writer.u32s(SectionKind::ProfileValues, &profile_values);
        writer.records(SectionKind::Nodes, &node_records);
        writer.u32s(SectionKind::NodeChildren, &node_children);
        writer.u32s(SectionKind::NodeRanked, &node_ranked);
        writer.records(SectionKind::Signatures, &signature_records);
        writer.u32s(SectionKind::SignatureNodes, &signature_nodes);
        writer.u32s(SectionKind::SignatureProfiles, &signature_profiles);
        writer.records(SectionKind::ReverseIndex, &reverse_records);
        writer.u32s(SectionKind::ReverseProfiles, &reverse_profiles);
        let bytes = writer.finish()?;

        debug!(
            name = %self.name,
            components = component_records.len(),
            profiles = profile_records.len(),
            values = value_records.len(),
            nodes = node_records.len(),
            signatures = signature_records.len(),
            strings = string_count,
            size = bytes.len(),
            "dataset built"
        );
        Ok(bytes)
    }

    /// Insert every signature path into the component tries, deduplicate,
    /// sort the signature table and derive ranked subtree lists
    fn build_tries(
        &self,
        profile_index: &FxHashMap<u32, (usize, u32)>,
    ) -> Result<(Vec<NodeDraft>, Vec<SignatureDraft>)> {
        let mut nodes: Vec<NodeDraft> = (0..self.components.len())
            .map(|component| NodeDraft {
                component,
                parent: None,
                offset: 0,
                characters: None,
                children: Vec::new(),
                signature: None,
                ranked: Vec::new(),
            })
            .collect();
        let mut lookup: FxHashMap<(u32, u32, &str), u32> = FxHashMap::default();
        let mut drafts: Vec<SignatureDraft> = Vec::new();
        let mut by_path: FxHashMap<(usize, Vec<u32>), usize> = FxHashMap::default();

        for def in &self.signatures {
            let mut profiles = vec![0u32; self.components.len()];
            for profile_id in &def.profile_ids {
                let (component, index) = profile_index
                    .get(profile_id)
                    .copied()
                    .ok_or_else(|| Error::build(format!("unknown profile id {}", profile_id)))?;
                if profiles[component] != 0 {
                    return Err(Error::build(format!(
                        "signature lists two profiles for component '{}'",
                        self.components[component].name
                    )));
                }
                profiles[component] = index;
            }

            for (component, path) in &def.paths {
                let mut parent = to_u32(*component, "root node")?;
                let mut ids = Vec::with_capacity(path.len());
                for (offset, chars) in path {
                    let key = (parent, *offset, chars.as_str());
                    let id = match lookup.get(&key) {
                        Some(id) => *id,
                        None => {
                            let id = to_u32(nodes.len(), "node count")?;
                            nodes.push(NodeDraft {
                                component: *component,
                                parent: Some(parent),
                                offset: *offset,
                                characters: Some(chars.clone()),
                                children: Vec::new(),
                                signature: None,
                                ranked: Vec::new(),
                            });
                            nodes[parent as usize].children.push(id);
                            lookup.insert(key, id);
                            id
                        }
                    };
                    ids.push(id);
                    parent = id;
                }

                // Duplicate paths keep the higher rank, else the first seen
                match by_path.get(&(*component, ids.clone())) {
                    Some(existing) => {
                        let existing = &mut drafts[*existing];
                        if def.rank > existing.rank {
                            existing.rank = def.rank;
                            existing.profiles = profiles.clone();
                        }
                    }
                    None => {
                        by_path.insert((*component, ids.clone()), drafts.len());
                        drafts.push(SignatureDraft {
                            component: *component,
                            rank: def.rank,
                            nodes: ids,
                            profiles: profiles.clone(),
                        });
                    }
                }
            }
        }

        drafts.par_sort_unstable_by(|a, b| (a.component, &a.nodes).cmp(&(b.component, &b.nodes)));

        for (id, sig) in drafts.iter().enumerate() {
            let id = to_u32(id, "signature count")?;
            if let Some(last) = sig.nodes.last() {
                nodes[*last as usize].signature = Some(id);
            }
            nodes[sig.component].ranked.push(id);
            for node in &sig.nodes {
                nodes[*node as usize].ranked.push(id);
            }
        }

        let ranks: Vec<u32> = drafts.iter().map(|s| s.rank).collect();
        nodes.par_iter_mut().for_each(|node| {
            node.ranked
                .sort_by_key(|id| (Reverse(ranks[*id as usize]), *id));
        });

        // Children ordered by (offset, length, characters)
        let keys: Vec<(u32, usize, Vec<u8>)> = nodes
            .iter()
            .map(|n| {
                let chars = n.characters.as_deref().unwrap_or_default().as_bytes();
                (n.offset, chars.len(), chars.to_vec())
            })
            .collect();
        for node in &mut nodes {
            node.children.sort_by(|a, b| keys[*a as usize].cmp(&keys[*b as usize]));
        }

        Ok((nodes, drafts))
    }
}

/// Reject values that do not parse as the property's type
fn check_typed(def: &PropertyDef, value: &str) -> Result<()> {
    let ok = match def.value_type {
        ValueType::String => true,
        ValueType::Bool => parse_bool(value).is_some(),
        ValueType::Int => value.trim().parse::<i64>().is_ok(),
        ValueType::Double => value.trim().parse::<f64>().is_ok(),
    };
    if ok {
        Ok(())
    } else {
        Err(Error::build(format!(
            "value '{}' of property '{}' is not a valid {:?}",
            value, def.name, def.value_type
        )))
    }
}

/// Locate `substrings` left to right in `user_agent`
fn locate(user_agent: &str, substrings: &[&str], component: &ComponentDef) -> Result<Vec<(u32, String)>> {
    if substrings.is_empty() {
        return Err(Error::build(format!(
            "no patterns for component '{}' in '{}'",
            component.name, user_agent
        )));
    }
    let mut cursor = 0usize;
    let mut path = Vec::with_capacity(substrings.len());
    for sub in substrings {
        if sub.is_empty() || sub.contains('\0') {
            return Err(Error::build(format!(
                "pattern {:?} must be non-empty and free of NUL",
                sub
            )));
        }
        let found = user_agent
            .get(cursor..)
            .and_then(|rest| rest.find(sub))
            .ok_or_else(|| {
                Error::build(format!(
                    "pattern '{}' not found in '{}' after byte {}",
                    sub, user_agent, cursor
                ))
            })?;
        let offset = cursor + found;
        let end = offset + sub.len();
        if end > component.max_length as usize {
            return Err(Error::build(format!(
                "pattern '{}' ends at byte {}, beyond max length {} of component '{}'",
                sub, end, component.max_length, component.name
            )));
        }
        path.push((to_u32(offset, "pattern offset")?, sub.to_string()));
        cursor = end;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::matcher::{MatchMethod, Matcher};

    const UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 7_1 like Mac OS X)";

    fn base() -> DatasetBuilder {
        let mut b = DatasetBuilder::new("Test").with_published("2026-01-01");
        b.add_component("HardwarePlatform", &["User-Agent"], 0, 256)
            .unwrap();
        b.add_component("BrowserUA", &["User-Agent"], 0, 256).unwrap();
        b.add_property(
            PropertyDef::new("IsMobile", "HardwarePlatform", ValueType::Bool).with_default("False"),
        )
        .unwrap();
        b.add_property(PropertyDef::new("BrowserName", "BrowserUA", ValueType::String))
            .unwrap();
        b
    }

    #[test]
    fn test_locate_left_to_right() {
        let b = base();
        let path = locate(UA, &["iPhone", "iPhone"], &b.components[0]).unwrap();
        assert_eq!(path, vec![(13, "iPhone".to_string()), (25, "iPhone".to_string())]);
        assert!(locate(UA, &["Android"], &b.components[0]).is_err());
        assert!(locate(UA, &[""], &b.components[0]).is_err());
        assert!(locate(UA, &["a\0b"], &b.components[0]).is_err());
    }

    #[test]
    fn test_pattern_beyond_max_length_rejected() {
        let mut b = DatasetBuilder::new("Test");
        b.add_component("HardwarePlatform", &["User-Agent"], 0, 16)
            .unwrap();
        let err = b
            .add_signature(UA, 1, &[], &[("HardwarePlatform", &["OS 7_1"])])
            .unwrap_err();
        assert!(matches!(err, Error::Build(_)));
    }

    #[test]
    fn test_definition_errors() {
        let mut b = base();
        assert!(b.add_component("BrowserUA", &["User-Agent"], 0, 1).is_err());
        assert!(b.add_component("Empty", &[], 0, 1).is_err());
        assert!(b.add_component("Inverted", &["User-Agent"], 5, 1).is_err());
        assert!(b
            .add_property(PropertyDef::new("IsMobile", "HardwarePlatform", ValueType::Bool))
            .is_err());
        assert!(b
            .add_property(PropertyDef::new("X", "Nowhere", ValueType::String))
            .is_err());
        assert!(b.add_profile("HardwarePlatform", 0, &[]).is_err());
        assert!(b
            .add_profile("HardwarePlatform", 5, &[("IsMobile", "perhaps")])
            .is_err());
        assert!(b
            .add_profile("HardwarePlatform", 5, &[("BrowserName", "Safari")])
            .is_err());
        assert!(b
            .add_profile("HardwarePlatform", 5, &[("IsMobile", "True"), ("IsMobile", "False")])
            .is_err());
        b.add_profile("HardwarePlatform", 5, &[("IsMobile", "True")])
            .unwrap();
        assert!(b.add_profile("BrowserUA", 5, &[]).is_err());
    }

    #[test]
    fn test_unknown_signature_profile_fails_build() {
        let mut b = base();
        b.add_signature(UA, 1, &[99], &[("HardwarePlatform", &["iPhone"])])
            .unwrap();
        assert!(matches!(b.build(), Err(Error::Build(_))));
    }

    #[test]
    fn test_build_and_match() {
        let mut b = base();
        b.add_profile("HardwarePlatform", 10, &[("IsMobile", "True")])
            .unwrap();
        b.add_profile("BrowserUA", 20, &[("BrowserName", "Safari")])
            .unwrap();
        b.add_signature(
            UA,
            5,
            &[10, 20],
            &[("HardwarePlatform", &["iPhone"]), ("BrowserUA", &["Mozilla"])],
        )
        .unwrap();
        assert_eq!(b.stats().signatures, 1);

        let ds = Dataset::from_bytes(&b.build().unwrap()).unwrap();
        assert_eq!(ds.info().published, "2026-01-01");
        assert_eq!(ds.signatures().len(), 2);

        let m = Matcher::default().detect(&ds, Some(UA));
        assert_eq!(m.method(), MatchMethod::Exact);
        assert_eq!(m.profiles(), vec![1, 1]);
    }

    #[test]
    fn test_duplicate_paths_keep_higher_rank() {
        let mut b = base();
        b.add_profile("HardwarePlatform", 10, &[]).unwrap();
        b.add_profile("HardwarePlatform", 11, &[]).unwrap();
        let patterns: &[(&str, &[&str])] = &[("HardwarePlatform", &["iPhone"])];
        b.add_signature(UA, 1, &[10], patterns).unwrap();
        b.add_signature(UA, 7, &[11], patterns).unwrap();
        b.add_signature(UA, 3, &[10], patterns).unwrap();

        let ds = Dataset::from_bytes(&b.build().unwrap()).unwrap();
        assert_eq!(ds.signatures().len(), 1);
        assert_eq!(ds.signatures()[0].rank, 7);
        let m = Matcher::default().detect(&ds, Some(UA));
        assert_eq!(m.profiles()[0], 2);
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut b = base();
        b.add_profile("HardwarePlatform", 10, &[("IsMobile", "True")])
            .unwrap();
        b.add_signature(UA, 5, &[10], &[("HardwarePlatform", &["iPhone", "OS 7_1"])])
            .unwrap();
        assert_eq!(b.build().unwrap(), b.build().unwrap());
    }

    #[test]
    fn test_default_profile_must_belong_to_component() {
        let mut b = base();
        b.add_profile("BrowserUA", 20, &[]).unwrap();
        b.set_default_profile("HardwarePlatform", 20).unwrap();
        assert!(b.build().is_err());
        assert!(b.set_default_profile("Nowhere", 20).is_err());
    }
}
