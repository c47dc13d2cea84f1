//! Immutable dataset snapshot
//!
//! A [`Dataset`] is built once from a binary snapshot and never changes
//! afterwards. Every entity is addressed by a dense integer id, so all
//! lookups on the matching path are plain array indexing or binary search
//! over sorted ranges. Loading performs full structural validation: a
//! snapshot that loads successfully cannot send the matcher out of bounds.
//!
//! Reloading means building a new `Dataset`; see [`crate::provider`].

use crate::error::{Error, Result};
use crate::format::{
    self, ComponentRecord, InfoRecord, NodeRecord, ProfileRecord, PropertyRecord, ReverseRecord,
    SectionKind, SignatureRecord, ValueRecord, MAX_MIN_LENGTH, NONE, PROPERTY_FLAG_LIST,
};
use crate::strings::{StringId, StringPool};
use flate2::read::GzDecoder;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, info};
use zerocopy::byteorder::little_endian::U32;

/// Component id (position in the component table)
pub type ComponentId = u32;
/// Property id
pub type PropertyId = u32;
/// Value id
pub type ValueId = u32;
/// Dense profile position within its component
pub type ProfileIndex = u32;
/// Trie node id
pub type NodeId = u32;
/// Signature id (position in the sorted signature table)
pub type SignatureId = u32;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Declared type of a property's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Free text, compared case-insensitively
    String,
    /// `True` / `False`
    Bool,
    /// Signed integer
    Int,
    /// Floating point number
    Double,
}

impl ValueType {
    /// Convert from the on-disk discriminant
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(ValueType::String),
            1 => Some(ValueType::Bool),
            2 => Some(ValueType::Int),
            3 => Some(ValueType::Double),
            _ => None,
        }
    }

    /// On-disk discriminant
    pub fn as_u32(self) -> u32 {
        match self {
            ValueType::String => 0,
            ValueType::Bool => 1,
            ValueType::Int => 2,
            ValueType::Double => 3,
        }
    }
}

/// A detection dimension (hardware, browser, platform, crawler...)
#[derive(Debug, Clone)]
pub struct Component {
    /// Component id
    pub id: ComponentId,
    /// Name (string id)
    pub name: StringId,
    /// Profile used when nothing matches
    pub default_profile: ProfileIndex,
    /// Inputs shorter than this are padded
    pub min_length: u32,
    /// Inputs longer than this are truncated
    pub max_length: u32,
    /// Root of this component's trie
    pub root: NodeId,
    pub(crate) headers: Range<u32>,
    pub(crate) profiles: Range<u32>,
    pub(crate) signatures: Range<u32>,
}

/// A named, typed attribute of a profile
#[derive(Debug, Clone)]
pub struct Property {
    /// Property id
    pub id: PropertyId,
    /// Name (string id)
    pub name: StringId,
    /// Optional description (string id)
    pub description: Option<StringId>,
    /// Component whose profiles carry this property
    pub component: ComponentId,
    /// Declared value type
    pub value_type: ValueType,
    /// Whether a profile may hold several values
    pub is_list: bool,
    /// Value reported when a profile has no assignment
    pub default_value: Option<ValueId>,
    pub(crate) values: Range<u32>,
}

/// An interned property value
#[derive(Debug, Clone, Copy)]
pub struct Value {
    /// Value id
    pub id: ValueId,
    /// Owning property
    pub property: PropertyId,
    /// Payload (string id)
    pub name: StringId,
}

/// A device or software definition within one component
#[derive(Debug, Clone)]
pub struct Profile {
    /// Owning component
    pub component: ComponentId,
    /// Dense position within the component
    pub index: ProfileIndex,
    /// External stable id
    pub profile_id: u32,
    pub(crate) values: Range<u32>,
}

/// Trie node for one ranked character position
#[derive(Debug, Clone)]
pub struct Node {
    /// Component whose trie holds the node
    pub component: ComponentId,
    /// Parent node, `None` for a root
    pub parent: Option<NodeId>,
    /// Byte offset of the expected characters in the input
    pub offset: u32,
    /// Number of expected bytes
    pub length: u32,
    /// Expected characters (string id), `None` for a root
    pub characters: Option<StringId>,
    /// Rank weight used for distance scoring
    pub weight: u32,
    /// Signature whose path ends here
    pub signature: Option<SignatureId>,
    pub(crate) children: Range<u32>,
    pub(crate) ranked: Range<u32>,
}

/// A stored pattern: node path plus one profile per component
#[derive(Debug, Clone)]
pub struct Signature {
    /// Component whose trie holds the path
    pub component: ComponentId,
    /// Specificity rank, higher wins ties
    pub rank: u32,
    pub(crate) nodes: Range<u32>,
    pub(crate) profiles_start: u32,
}

/// Descriptive information about a dataset
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    /// Dataset name
    pub name: String,
    /// Publication date as recorded by the builder
    pub published: String,
    /// Snapshot format version
    pub format_version: u32,
    /// Snapshot checksum (XXH64)
    pub checksum: u64,
}

/// Catalog entry describing one property
#[derive(Debug, Clone, Serialize)]
pub struct PropertyInfo {
    /// Property name
    pub name: String,
    /// Owning component name
    pub component: String,
    /// Declared value type
    pub value_type: ValueType,
    /// List-valued flag
    pub is_list: bool,
    /// Description, when the dataset has one
    pub description: Option<String>,
    /// Default value, when the dataset has one
    pub default_value: Option<String>,
}

/// Entity counts
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DatasetStats {
    /// Number of interned strings
    pub strings: usize,
    /// Number of components
    pub components: usize,
    /// Number of properties
    pub properties: usize,
    /// Number of values
    pub values: usize,
    /// Number of profiles across all components
    pub profiles: usize,
    /// Number of trie nodes across all components
    pub nodes: usize,
    /// Number of signatures
    pub signatures: usize,
}

/// Immutable, validated dataset snapshot
///
/// `Dataset` is `Send + Sync` and is shared between threads through `Arc`.
#[derive(Debug)]
pub struct Dataset {
    info: DatasetInfo,
    pub(crate) strings: StringPool,
    pub(crate) components: Vec<Component>,
    pub(crate) component_headers: Vec<StringId>,
    pub(crate) properties: Vec<Property>,
    /// Property ids sorted by name
    properties_by_name: Vec<PropertyId>,
    pub(crate) values: Vec<Value>,
    pub(crate) profiles: Vec<Profile>,
    pub(crate) profile_values: Vec<ValueId>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) node_children: Vec<NodeId>,
    pub(crate) node_ranked: Vec<SignatureId>,
    pub(crate) signatures: Vec<Signature>,
    pub(crate) signature_nodes: Vec<NodeId>,
    pub(crate) signature_profiles: Vec<ProfileIndex>,
    reverse: Vec<Range<u32>>,
    reverse_profiles: Vec<ProfileIndex>,
    /// Distinct header names in first-seen order
    http_headers: Vec<StringId>,
}

impl Dataset {
    /// Open a snapshot file
    ///
    /// The file is memory-mapped for reading; gzip-compressed snapshots are
    /// detected by their magic bytes and decompressed first. The mapping is
    /// released once the in-memory structures are built.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to open {}: {}", path.display(), e),
            ))
        })?;

        // SAFETY: the mapping is only read while this function runs and is
        // dropped before returning; no reference into it escapes.
        let mmap = unsafe { Mmap::map(&file) }?;

        let dataset = if mmap.starts_with(&GZIP_MAGIC) {
            let mut decompressed = Vec::new();
            GzDecoder::new(&mmap[..])
                .read_to_end(&mut decompressed)
                .map_err(|e| Error::format(format!("gzip stream is corrupt: {}", e)))?;
            debug!(
                compressed = mmap.len(),
                size = decompressed.len(),
                "decompressed gzip snapshot"
            );
            Self::from_bytes(&decompressed)?
        } else {
            Self::from_bytes(&mmap)?
        };

        info!(
            path = %path.display(),
            name = %dataset.info.name,
            checksum = format_args!("{:016x}", dataset.info.checksum),
            "dataset opened"
        );
        Ok(dataset)
    }

    /// Parse and validate a snapshot held in memory
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let dataset = Loader::new(data)?.load()?;
        let stats = dataset.stats();
        debug!(
            components = stats.components,
            properties = stats.properties,
            profiles = stats.profiles,
            nodes = stats.nodes,
            signatures = stats.signatures,
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Dataset information
    pub fn info(&self) -> &DatasetInfo {
        &self.info
    }

    /// Entity counts
    pub fn stats(&self) -> DatasetStats {
        DatasetStats {
            strings: self.strings.len(),
            components: self.components.len(),
            properties: self.properties.len(),
            values: self.values.len(),
            profiles: self.profiles.len(),
            nodes: self.nodes.len(),
            signatures: self.signatures.len(),
        }
    }

    /// Resolve an interned string
    #[inline]
    pub fn string(&self, id: StringId) -> &str {
        self.strings.resolve(id)
    }

    // ----- components -----

    /// All components in dataset order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Component by id
    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(id as usize)
    }

    /// Component by name (exact)
    pub fn component_by_name(&self, name: &str) -> Option<&Component> {
        self.components
            .iter()
            .find(|c| self.string(c.name) == name)
    }

    /// Component name
    pub fn component_name(&self, component: &Component) -> &str {
        self.string(component.name)
    }

    /// Header names a component reads, in priority order
    pub fn component_headers(&self, component: &Component) -> impl Iterator<Item = &str> + '_ {
        self.component_headers[component.headers.start as usize..component.headers.end as usize]
            .iter()
            .map(move |id| self.string(*id))
    }

    /// Position of `header` in the component's header list (case-insensitive)
    pub fn header_priority(&self, component: &Component, header: &str) -> Option<usize> {
        self.component_headers(component)
            .position(|name| name.eq_ignore_ascii_case(header))
    }

    /// Every header name any component reads, in first-seen order
    pub fn http_headers(&self) -> Vec<&str> {
        self.http_headers.iter().map(|id| self.string(*id)).collect()
    }

    // ----- properties and values -----

    /// All properties
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Property by id
    pub fn property(&self, id: PropertyId) -> Option<&Property> {
        self.properties.get(id as usize)
    }

    /// Property by name (exact), using the sorted name index
    pub fn property_by_name(&self, name: &str) -> Option<&Property> {
        self.properties_by_name
            .binary_search_by(|id| self.string(self.properties[*id as usize].name).cmp(name))
            .ok()
            .map(|pos| &self.properties[self.properties_by_name[pos] as usize])
    }

    /// Property by name or [`Error::UnknownProperty`]
    pub fn require_property(&self, name: &str) -> Result<&Property> {
        self.property_by_name(name)
            .ok_or_else(|| Error::UnknownProperty(name.to_string()))
    }

    /// Property name
    pub fn property_name(&self, property: &Property) -> &str {
        self.string(property.name)
    }

    /// Names of every property, in id order
    pub fn property_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.properties.iter().map(move |p| self.string(p.name))
    }

    /// Property catalog for discovery
    pub fn property_catalog(&self) -> Vec<PropertyInfo> {
        self.properties
            .iter()
            .map(|p| PropertyInfo {
                name: self.string(p.name).to_string(),
                component: self
                    .string(self.components[p.component as usize].name)
                    .to_string(),
                value_type: p.value_type,
                is_list: p.is_list,
                description: p.description.map(|id| self.string(id).to_string()),
                default_value: p.default_value.map(|id| self.value_name(id).to_string()),
            })
            .collect()
    }

    /// Every value defined for a property, in id order
    pub fn property_values(&self, property: &Property) -> &[Value] {
        &self.values[property.values.start as usize..property.values.end as usize]
    }

    /// Value by id
    pub fn value(&self, id: ValueId) -> Option<&Value> {
        self.values.get(id as usize)
    }

    /// Value payload by id
    #[inline]
    pub fn value_name(&self, id: ValueId) -> &str {
        self.values
            .get(id as usize)
            .map(|v| self.string(v.name))
            .unwrap_or_default()
    }

    // ----- profiles -----

    /// Profiles of a component, indexed by [`ProfileIndex`]
    pub fn profiles(&self, component: &Component) -> &[Profile] {
        &self.profiles[component.profiles.start as usize..component.profiles.end as usize]
    }

    /// Profile by component and index
    pub fn profile(&self, component: ComponentId, index: ProfileIndex) -> Option<&Profile> {
        let component = self.component(component)?;
        self.profiles(component).get(index as usize)
    }

    /// Profile by component and external profile id
    pub fn profile_by_id(&self, component: ComponentId, profile_id: u32) -> Option<&Profile> {
        let profiles = self.profiles(self.component(component)?);
        profiles
            .binary_search_by_key(&profile_id, |p| p.profile_id)
            .ok()
            .map(|pos| &profiles[pos])
    }

    /// Every value id assigned to a profile, sorted
    pub fn profile_values(&self, profile: &Profile) -> &[ValueId] {
        &self.profile_values[profile.values.start as usize..profile.values.end as usize]
    }

    /// Value ids a profile assigns to one property
    pub fn values_for(&self, profile: &Profile, property: PropertyId) -> &[ValueId] {
        let all = self.profile_values(profile);
        let start = all.partition_point(|v| self.values[*v as usize].property < property);
        let end = all.partition_point(|v| self.values[*v as usize].property <= property);
        &all[start..end]
    }

    /// Profile indices holding a value, ascending
    pub fn profiles_with_value(&self, value: ValueId) -> &[ProfileIndex] {
        match self.reverse.get(value as usize) {
            Some(range) => &self.reverse_profiles[range.start as usize..range.end as usize],
            None => &[],
        }
    }

    // ----- trie and signatures -----

    /// Node by id
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    /// Children of a node, sorted by (offset, length, characters)
    #[inline]
    pub fn children(&self, node: &Node) -> &[NodeId] {
        &self.node_children[node.children.start as usize..node.children.end as usize]
    }

    /// Signatures in a node's subtree, highest rank first
    #[inline]
    pub fn ranked_signatures(&self, node: &Node) -> &[SignatureId] {
        &self.node_ranked[node.ranked.start as usize..node.ranked.end as usize]
    }

    /// Expected characters of a node (empty for a root)
    #[inline]
    pub fn node_characters(&self, node: &Node) -> &[u8] {
        node.characters
            .map(|id| self.string(id).as_bytes())
            .unwrap_or_default()
    }

    /// Signature by id
    #[inline]
    pub fn signature(&self, id: SignatureId) -> &Signature {
        &self.signatures[id as usize]
    }

    /// All signatures, sorted by (component, node path)
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Node path of a signature
    #[inline]
    pub fn signature_nodes(&self, signature: &Signature) -> &[NodeId] {
        &self.signature_nodes[signature.nodes.start as usize..signature.nodes.end as usize]
    }

    /// One profile index per component
    #[inline]
    pub fn signature_profiles(&self, signature: &Signature) -> &[ProfileIndex] {
        let start = signature.profiles_start as usize;
        &self.signature_profiles[start..start + self.components.len()]
    }

    /// Signature ids belonging to a component
    pub fn component_signatures(&self, component: &Component) -> Range<SignatureId> {
        component.signatures.clone()
    }

    /// Binary search the signature table for an exact node path
    pub fn find_signature(&self, component: ComponentId, path: &[NodeId]) -> Option<SignatureId> {
        self.signatures
            .binary_search_by(|sig| {
                sig.component
                    .cmp(&component)
                    .then_with(|| self.signature_nodes(sig).cmp(path))
            })
            .ok()
            .map(|pos| pos as SignatureId)
    }
}

/// Section lookup built from the directory
struct Sections<'a> {
    data: &'a [u8],
    map: BTreeMap<SectionKind, (usize, usize, usize)>,
}

impl<'a> Sections<'a> {
    fn new(data: &'a [u8]) -> Result<(Self, u64)> {
        let (header, entries) = format::read_directory(data)?;
        let mut map = BTreeMap::new();
        for entry in &entries {
            let kind = SectionKind::from_u32(entry.kind.get()).ok_or_else(|| {
                Error::format(format!("unknown section kind {}", entry.kind.get()))
            })?;
            let offset = entry.offset.get() as usize;
            let length = entry.length.get() as usize;
            if offset.checked_add(length).map_or(true, |end| end > data.len()) {
                return Err(Error::format(format!(
                    "{:?} section ({}+{}) extends beyond snapshot of {} bytes",
                    kind,
                    offset,
                    length,
                    data.len()
                )));
            }
            if map
                .insert(kind, (offset, length, entry.count.get() as usize))
                .is_some()
            {
                return Err(Error::format(format!("duplicate {:?} section", kind)));
            }
        }
        for kind in SectionKind::ALL {
            if !map.contains_key(&kind) {
                return Err(Error::format(format!("missing {:?} section", kind)));
            }
        }
        Ok((Self { data, map }, header.checksum.get()))
    }

    fn raw(&self, kind: SectionKind) -> (&'a [u8], usize) {
        // Presence of every kind is checked in new()
        let (offset, length, count) = self.map.get(&kind).copied().unwrap_or_default();
        (&self.data[offset..offset + length], count)
    }

    fn records<T>(&self, kind: SectionKind) -> Result<&'a [T]>
    where
        T: zerocopy::FromBytes + zerocopy::Immutable + zerocopy::KnownLayout + zerocopy::Unaligned,
    {
        let (bytes, count) = self.raw(kind);
        format::read_records::<T>(bytes, count, &format!("{:?}", kind))
    }

    fn u32s(&self, kind: SectionKind) -> Result<Vec<u32>> {
        Ok(self.records::<U32>(kind)?.iter().map(|v| v.get()).collect())
    }
}

/// Check `start..start+count` against `len` and return it as a range
fn checked_range(start: u32, count: u32, len: usize, what: &str) -> Result<Range<u32>> {
    match start.checked_add(count) {
        Some(end) if end as usize <= len => Ok(start..end),
        _ => Err(Error::format(format!(
            "{} range {}+{} exceeds {} entries",
            what, start, count, len
        ))),
    }
}

fn optional(value: u32) -> Option<u32> {
    (value != NONE).then_some(value)
}

/// Builds a [`Dataset`] from snapshot bytes, validating as it goes
struct Loader<'a> {
    sections: Sections<'a>,
    checksum: u64,
}

impl<'a> Loader<'a> {
    fn new(data: &'a [u8]) -> Result<Self> {
        let (sections, checksum) = Sections::new(data)?;
        Ok(Self { sections, checksum })
    }

    fn load(self) -> Result<Dataset> {
        let (bytes, count) = self.sections.raw(SectionKind::Strings);
        let strings = StringPool::from_section(bytes, count)?;

        let info = self.load_info(&strings)?;
        let component_headers = self.sections.u32s(SectionKind::ComponentHeaders)?;
        for id in &component_headers {
            strings.check(*id, "component header")?;
        }
        let mut components = self.load_components(&strings, &component_headers)?;
        let (mut properties, values) = self.load_properties(&strings, components.len())?;
        let profile_values = self.sections.u32s(SectionKind::ProfileValues)?;
        let profiles = self.load_profiles(
            &mut components,
            &properties,
            &values,
            &profile_values,
        )?;

        // Default values must belong to their property
        for property in &mut properties {
            if let Some(value) = property.default_value {
                if !property.values.contains(&value) {
                    return Err(Error::format(format!(
                        "property {} default value {} belongs to another property",
                        property.id, value
                    )));
                }
            }
        }

        let node_children = self.sections.u32s(SectionKind::NodeChildren)?;
        let node_ranked = self.sections.u32s(SectionKind::NodeRanked)?;
        let signature_nodes = self.sections.u32s(SectionKind::SignatureNodes)?;
        let signature_profiles = self.sections.u32s(SectionKind::SignatureProfiles)?;

        let nodes = self.load_nodes(&strings, &components, &node_children, &node_ranked)?;
        let signatures = self.load_signatures(
            &mut components,
            &nodes,
            &signature_nodes,
            &signature_profiles,
        )?;

        let reverse_profiles = self.sections.u32s(SectionKind::ReverseProfiles)?;
        let reverse = self.load_reverse(&values, &reverse_profiles)?;

        let mut properties_by_name: Vec<PropertyId> = (0..properties.len() as u32).collect();
        properties_by_name.sort_by(|a, b| {
            strings
                .resolve(properties[*a as usize].name)
                .cmp(strings.resolve(properties[*b as usize].name))
        });
        for pair in properties_by_name.windows(2) {
            let a = strings.resolve(properties[pair[0] as usize].name);
            let b = strings.resolve(properties[pair[1] as usize].name);
            if a == b {
                return Err(Error::format(format!("duplicate property name '{}'", a)));
            }
        }

        let mut http_headers: Vec<StringId> = Vec::new();
        for id in &component_headers {
            let name = strings.resolve(*id);
            if !http_headers
                .iter()
                .any(|seen| strings.resolve(*seen).eq_ignore_ascii_case(name))
            {
                http_headers.push(*id);
            }
        }

        let dataset = Dataset {
            info,
            strings,
            components,
            component_headers,
            properties,
            properties_by_name,
            values,
            profiles,
            profile_values,
            nodes,
            node_children,
            node_ranked,
            signatures,
            signature_nodes,
            signature_profiles,
            reverse,
            reverse_profiles,
            http_headers,
        };
        dataset.check_tries()?;
        dataset.check_reverse_index()?;
        Ok(dataset)
    }

    fn load_info(&self, strings: &StringPool) -> Result<DatasetInfo> {
        let records = self.sections.records::<InfoRecord>(SectionKind::Info)?;
        let [record] = records else {
            return Err(Error::format(format!(
                "expected one info record, found {}",
                records.len()
            )));
        };
        strings.check(record.name.get(), "dataset name")?;
        strings.check(record.published.get(), "dataset published date")?;
        Ok(DatasetInfo {
            name: strings.resolve(record.name.get()).to_string(),
            published: strings.resolve(record.published.get()).to_string(),
            format_version: format::VERSION,
            checksum: self.checksum,
        })
    }

    fn load_components(
        &self,
        strings: &StringPool,
        headers: &[StringId],
    ) -> Result<Vec<Component>> {
        let records = self.sections.records::<ComponentRecord>(SectionKind::Components)?;
        if records.is_empty() {
            return Err(Error::format("dataset defines no components"));
        }
        let mut components = Vec::with_capacity(records.len());
        for (id, record) in records.iter().enumerate() {
            strings.check(record.name.get(), "component name")?;
            let min_length = record.min_length.get();
            let max_length = record.max_length.get();
            if min_length > max_length {
                return Err(Error::format(format!(
                    "component {} length range {}..{} is empty",
                    id, min_length, max_length
                )));
            }
            if min_length > MAX_MIN_LENGTH {
                return Err(Error::format(format!(
                    "component {} minimum length {} exceeds {}",
                    id, min_length, MAX_MIN_LENGTH
                )));
            }
            components.push(Component {
                id: id as ComponentId,
                name: record.name.get(),
                default_profile: record.default_profile.get(),
                min_length,
                max_length,
                root: record.root_node.get(),
                headers: checked_range(
                    record.headers_start.get(),
                    record.headers_count.get(),
                    headers.len(),
                    "component headers",
                )?,
                profiles: 0..0,
                signatures: 0..0,
            });
        }
        Ok(components)
    }

    fn load_properties(
        &self,
        strings: &StringPool,
        component_count: usize,
    ) -> Result<(Vec<Property>, Vec<Value>)> {
        let value_records = self.sections.records::<ValueRecord>(SectionKind::Values)?;
        let property_records = self.sections.records::<PropertyRecord>(SectionKind::Properties)?;

        let mut values = Vec::with_capacity(value_records.len());
        for (id, record) in value_records.iter().enumerate() {
            let property = record.property.get();
            if property as usize >= property_records.len() {
                return Err(Error::format(format!(
                    "value {} refers to missing property {}",
                    id, property
                )));
            }
            if let Some(prev) = values.last().map(|v: &Value| v.property) {
                if property < prev {
                    return Err(Error::format("values are not grouped by property"));
                }
            }
            strings.check(record.name.get(), "value")?;
            values.push(Value {
                id: id as ValueId,
                property,
                name: record.name.get(),
            });
        }

        let mut properties = Vec::with_capacity(property_records.len());
        for (id, record) in property_records.iter().enumerate() {
            let id = id as PropertyId;
            strings.check(record.name.get(), "property name")?;
            let description = optional(record.description.get());
            if let Some(desc) = description {
                strings.check(desc, "property description")?;
            }
            let component = record.component.get();
            if component as usize >= component_count {
                return Err(Error::format(format!(
                    "property {} refers to missing component {}",
                    id, component
                )));
            }
            let value_type = ValueType::from_u32(record.value_type.get()).ok_or_else(|| {
                Error::format(format!(
                    "property {} has unknown value type {}",
                    id,
                    record.value_type.get()
                ))
            })?;
            let start = values.partition_point(|v| v.property < id) as u32;
            let end = values.partition_point(|v| v.property <= id) as u32;
            properties.push(Property {
                id,
                name: record.name.get(),
                description,
                component,
                value_type,
                is_list: record.flags.get() & PROPERTY_FLAG_LIST != 0,
                default_value: optional(record.default_value.get()),
                values: start..end,
            });
        }
        Ok((properties, values))
    }

    fn load_profiles(
        &self,
        components: &mut [Component],
        properties: &[Property],
        values: &[Value],
        profile_values: &[ValueId],
    ) -> Result<Vec<Profile>> {
        let records = self.sections.records::<ProfileRecord>(SectionKind::Profiles)?;
        let mut profiles: Vec<Profile> = Vec::with_capacity(records.len());

        for (position, record) in records.iter().enumerate() {
            let component = record.component.get();
            if component as usize >= components.len() {
                return Err(Error::format(format!(
                    "profile {} refers to missing component {}",
                    position, component
                )));
            }
            let index = match profiles.last() {
                Some(prev) if prev.component == component => {
                    if record.profile_id.get() <= prev.profile_id {
                        return Err(Error::format(format!(
                            "profile ids of component {} are not strictly ascending",
                            component
                        )));
                    }
                    prev.index + 1
                }
                Some(prev) if prev.component > component => {
                    return Err(Error::format("profiles are not grouped by component"));
                }
                _ => 0,
            };
            if index == 0 && (record.profile_id.get() != 0 || record.values_count.get() != 0) {
                return Err(Error::format(format!(
                    "component {} does not start with the unknown profile",
                    component
                )));
            }

            let range = checked_range(
                record.values_start.get(),
                record.values_count.get(),
                profile_values.len(),
                "profile values",
            )?;
            let assigned = &profile_values[range.start as usize..range.end as usize];
            let mut last_property = None;
            for (i, value) in assigned.iter().enumerate() {
                let value = values.get(*value as usize).ok_or_else(|| {
                    Error::format(format!("profile {} refers to missing value", position))
                })?;
                if i > 0 && assigned[i - 1] >= value.id {
                    return Err(Error::format(format!(
                        "values of profile {} are not strictly ascending",
                        position
                    )));
                }
                let property = &properties[value.property as usize];
                if property.component != component {
                    return Err(Error::format(format!(
                        "profile {} holds a value of another component's property",
                        position
                    )));
                }
                if !property.is_list && last_property == Some(property.id) {
                    return Err(Error::format(format!(
                        "profile {} holds several values for single-valued property {}",
                        position, property.id
                    )));
                }
                last_property = Some(property.id);
            }

            profiles.push(Profile {
                component,
                index,
                profile_id: record.profile_id.get(),
                values: range,
            });
        }

        for component in components.iter_mut() {
            let start = profiles.partition_point(|p| p.component < component.id) as u32;
            let end = profiles.partition_point(|p| p.component <= component.id) as u32;
            if start == end {
                return Err(Error::format(format!(
                    "component {} has no profiles",
                    component.id
                )));
            }
            if component.default_profile >= end - start {
                return Err(Error::format(format!(
                    "component {} default profile {} out of range",
                    component.id, component.default_profile
                )));
            }
            component.profiles = start..end;
        }
        Ok(profiles)
    }

    fn load_nodes(
        &self,
        strings: &StringPool,
        components: &[Component],
        children: &[NodeId],
        ranked: &[SignatureId],
    ) -> Result<Vec<Node>> {
        let records = self.sections.records::<NodeRecord>(SectionKind::Nodes)?;
        let signature_count = self.sections.raw(SectionKind::Signatures).1;

        let mut nodes = Vec::with_capacity(records.len());
        for (id, record) in records.iter().enumerate() {
            let component = record.component.get();
            if component as usize >= components.len() {
                return Err(Error::format(format!(
                    "node {} refers to missing component {}",
                    id, component
                )));
            }
            let parent = optional(record.parent.get());
            if parent.is_some_and(|p| p as usize >= records.len()) {
                return Err(Error::format(format!("node {} has a missing parent", id)));
            }
            let characters = optional(record.characters.get());
            match (parent, characters) {
                (Some(_), Some(chars)) => {
                    strings.check(chars, "node characters")?;
                    let len = strings.resolve(chars).len();
                    if len == 0 || len as u32 != record.length.get() {
                        return Err(Error::format(format!(
                            "node {} length {} does not match its characters",
                            id,
                            record.length.get()
                        )));
                    }
                }
                (None, None) => {}
                _ => {
                    return Err(Error::format(format!(
                        "node {} must have characters exactly when it has a parent",
                        id
                    )))
                }
            }
            let signature = optional(record.signature.get());
            if signature.is_some_and(|s| s as usize >= signature_count) {
                return Err(Error::format(format!(
                    "node {} refers to a missing signature",
                    id
                )));
            }
            nodes.push(Node {
                component,
                parent,
                offset: record.offset.get(),
                length: record.length.get(),
                characters,
                weight: record.weight.get(),
                signature,
                children: checked_range(
                    record.children_start.get(),
                    record.children_count.get(),
                    children.len(),
                    "node children",
                )?,
                ranked: checked_range(
                    record.ranked_start.get(),
                    record.ranked_count.get(),
                    ranked.len(),
                    "node signatures",
                )?,
            });
        }

        for component in components {
            let root = nodes.get(component.root as usize).ok_or_else(|| {
                Error::format(format!("component {} has a missing root", component.id))
            })?;
            if root.parent.is_some() || root.component != component.id {
                return Err(Error::format(format!(
                    "component {} root is not a root of its trie",
                    component.id
                )));
            }
        }
        Ok(nodes)
    }

    fn load_signatures(
        &self,
        components: &mut [Component],
        nodes: &[Node],
        signature_nodes: &[NodeId],
        signature_profiles: &[ProfileIndex],
    ) -> Result<Vec<Signature>> {
        let records = self.sections.records::<SignatureRecord>(SectionKind::Signatures)?;
        let mut signatures: Vec<Signature> = Vec::with_capacity(records.len());

        for (id, record) in records.iter().enumerate() {
            let component = record.component.get();
            let Some(owner) = components.get(component as usize) else {
                return Err(Error::format(format!(
                    "signature {} refers to missing component {}",
                    id, component
                )));
            };
            let path_range = checked_range(
                record.nodes_start.get(),
                record.nodes_count.get(),
                signature_nodes.len(),
                "signature nodes",
            )?;
            let path = &signature_nodes[path_range.start as usize..path_range.end as usize];
            if path.is_empty() {
                return Err(Error::format(format!("signature {} has an empty path", id)));
            }
            let mut parent = owner.root;
            for node_id in path {
                let node = nodes.get(*node_id as usize).ok_or_else(|| {
                    Error::format(format!("signature {} refers to a missing node", id))
                })?;
                if node.parent != Some(parent) {
                    return Err(Error::format(format!(
                        "signature {} path is not a trie path",
                        id
                    )));
                }
                parent = *node_id;
            }
            if nodes[parent as usize].signature != Some(id as SignatureId) {
                return Err(Error::format(format!(
                    "signature {} does not match the signature of its last node",
                    id
                )));
            }

            let profiles_range = checked_range(
                record.profiles_start.get(),
                components.len() as u32,
                signature_profiles.len(),
                "signature profiles",
            )?;
            for (component, index) in components
                .iter()
                .zip(&signature_profiles[profiles_range.start as usize..])
            {
                if *index >= component.profiles.end - component.profiles.start {
                    return Err(Error::format(format!(
                        "signature {} refers to missing profile {} of component {}",
                        id, index, component.id
                    )));
                }
            }

            if let Some(prev) = signatures.last() {
                let prev_path = &signature_nodes[prev.nodes.start as usize..prev.nodes.end as usize];
                if (prev.component, prev_path) >= (component, path) {
                    return Err(Error::format(format!(
                        "signature table is not sorted and unique at {}",
                        id
                    )));
                }
            }

            signatures.push(Signature {
                component,
                rank: record.rank.get(),
                nodes: path_range,
                profiles_start: record.profiles_start.get(),
            });
        }

        for component in components.iter_mut() {
            let start = signatures.partition_point(|s| s.component < component.id) as u32;
            let end = signatures.partition_point(|s| s.component <= component.id) as u32;
            component.signatures = start..end;
        }
        Ok(signatures)
    }

    fn load_reverse(
        &self,
        values: &[Value],
        reverse_profiles: &[ProfileIndex],
    ) -> Result<Vec<Range<u32>>> {
        let records = self.sections.records::<ReverseRecord>(SectionKind::ReverseIndex)?;
        if records.len() != values.len() {
            return Err(Error::format(format!(
                "reverse index has {} entries for {} values",
                records.len(),
                values.len()
            )));
        }
        records
            .iter()
            .map(|r| {
                checked_range(
                    r.start.get(),
                    r.count.get(),
                    reverse_profiles.len(),
                    "reverse index",
                )
            })
            .collect()
    }
}

impl Dataset {
    /// Check trie shape: parent/child agreement, child ordering, and ranked
    /// signature lists
    fn check_tries(&self) -> Result<()> {
        for (id, node) in self.nodes.iter().enumerate() {
            let id = id as NodeId;
            let children = self.children(node);
            for child_id in children {
                let child = self
                    .nodes
                    .get(*child_id as usize)
                    .ok_or_else(|| Error::format(format!("node {} has a missing child", id)))?;
                if child.parent != Some(id) || child.component != node.component {
                    return Err(Error::format(format!(
                        "node {} lists child {} that does not point back",
                        id, child_id
                    )));
                }
            }
            for pair in children.windows(2) {
                let a = self.node(pair[0]);
                let b = self.node(pair[1]);
                if compare_nodes(self, a, b) != Ordering::Less {
                    return Err(Error::format(format!(
                        "children of node {} are not sorted and unique",
                        id
                    )));
                }
            }

            let ranked = self.ranked_signatures(node);
            for sig_id in ranked {
                let Some(sig) = self.signatures.get(*sig_id as usize) else {
                    return Err(Error::format(format!(
                        "node {} ranks a missing signature",
                        id
                    )));
                };
                if node.parent.is_some() && !self.signature_nodes(sig).contains(&id) {
                    return Err(Error::format(format!(
                        "node {} ranks signature {} outside its subtree",
                        id, sig_id
                    )));
                }
                if sig.component != node.component {
                    return Err(Error::format(format!(
                        "node {} ranks a signature of another component",
                        id
                    )));
                }
            }
            for pair in ranked.windows(2) {
                let a = self.signature(pair[0]);
                let b = self.signature(pair[1]);
                if (std::cmp::Reverse(a.rank), pair[0]) >= (std::cmp::Reverse(b.rank), pair[1]) {
                    return Err(Error::format(format!(
                        "ranked signatures of node {} are out of order",
                        id
                    )));
                }
            }
        }

        // Every node must be reachable from a root through children lists
        let mut listed = vec![false; self.nodes.len()];
        for child in &self.node_children {
            let Some(slot) = listed.get_mut(*child as usize) else {
                return Err(Error::format(format!("missing node {} listed as a child", child)));
            };
            if std::mem::replace(slot, true) {
                return Err(Error::format(format!("node {} has two parents", child)));
            }
        }
        for component in &self.components {
            let root = self.node(component.root);
            let expected = (component.signatures.end - component.signatures.start) as usize;
            if self.ranked_signatures(root).len() != expected {
                return Err(Error::format(format!(
                    "component {} root ranks {} of {} signatures",
                    component.id,
                    self.ranked_signatures(root).len(),
                    expected
                )));
            }
        }
        // Below the root, a node ranks every signature whose path crosses it
        let mut crossing = vec![0usize; self.nodes.len()];
        for sig in &self.signatures {
            for node in self.signature_nodes(sig) {
                if let Some(count) = crossing.get_mut(*node as usize) {
                    *count += 1;
                }
            }
        }
        for (id, node) in self.nodes.iter().enumerate() {
            let ranked = self.ranked_signatures(node).len();
            if node.parent.is_some() && ranked != crossing[id] {
                return Err(Error::format(format!(
                    "node {} ranks {} of {} signatures in its subtree",
                    id, ranked, crossing[id]
                )));
            }
        }

        for (id, node) in self.nodes.iter().enumerate() {
            if node.parent.is_some() != listed[id] {
                return Err(Error::format(format!(
                    "node {} parent link disagrees with children lists",
                    id
                )));
            }
        }
        Ok(())
    }

    /// Check the reverse index is sound (every listed profile holds the
    /// value) and complete (total size equals total assignments)
    fn check_reverse_index(&self) -> Result<()> {
        let mut total = 0usize;
        for value in &self.values {
            let property = &self.properties[value.property as usize];
            let component = &self.components[property.component as usize];
            let holders = self.profiles_with_value(value.id);
            for pair in holders.windows(2) {
                if pair[0] >= pair[1] {
                    return Err(Error::format(format!(
                        "reverse index of value {} is not strictly ascending",
                        value.id
                    )));
                }
            }
            let profiles = self.profiles(component);
            for index in holders {
                let holds = profiles
                    .get(*index as usize)
                    .is_some_and(|p| self.profile_values(p).binary_search(&value.id).is_ok());
                if !holds {
                    return Err(Error::format(format!(
                        "reverse index lists profile {} for value {} it does not hold",
                        index, value.id
                    )));
                }
            }
            total += holders.len();
        }
        if total != self.profile_values.len() {
            return Err(Error::format(format!(
                "reverse index covers {} of {} profile values",
                total,
                self.profile_values.len()
            )));
        }
        Ok(())
    }
}

/// Order nodes by (offset, length, characters)
pub(crate) fn compare_nodes(dataset: &Dataset, a: &Node, b: &Node) -> Ordering {
    (a.offset, a.length)
        .cmp(&(b.offset, b.length))
        .then_with(|| dataset.node_characters(a).cmp(dataset.node_characters(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_bytes, sample_dataset};
    use zerocopy::{FromBytes, IntoBytes, KnownLayout};

    /// Edit record `index` of a section in place and reseal the checksum
    fn patch<T>(bytes: &mut [u8], kind: SectionKind, index: usize, edit: impl FnOnce(&mut T))
    where
        T: FromBytes + IntoBytes + KnownLayout,
    {
        let (_, directory) = format::read_directory(bytes).unwrap();
        let entry = directory
            .iter()
            .find(|e| e.kind.get() == kind as u32)
            .unwrap();
        let size = std::mem::size_of::<T>();
        let at = entry.offset.get() as usize + index * size;
        edit(T::mut_from_bytes(&mut bytes[at..at + size]).unwrap());

        let header = std::mem::size_of::<format::SnapshotHeader>();
        let checksum = xxhash_rust::xxh64::xxh64(&bytes[header..], format::CHECKSUM_SEED);
        bytes[16..24].copy_from_slice(&checksum.to_le_bytes());
    }

    fn format_error(bytes: &[u8]) -> String {
        match Dataset::from_bytes(bytes) {
            Ok(_) => panic!("corrupt snapshot loaded"),
            Err(e) => {
                assert!(e.is_format(), "{}", e);
                e.to_string()
            }
        }
    }

    #[test]
    fn test_load_sample() {
        let ds = sample_dataset();
        let stats = ds.stats();
        assert_eq!(stats.components, 4);
        assert!(stats.properties >= 10);
        assert!(stats.signatures > 0);
        assert_eq!(ds.info().name, "Sample");
        assert_eq!(ds.info().format_version, format::VERSION);
    }

    #[test]
    fn test_property_lookup() {
        let ds = sample_dataset();
        let prop = ds.property_by_name("IsMobile").unwrap();
        assert_eq!(ds.property_name(prop), "IsMobile");
        assert_eq!(prop.value_type, ValueType::Bool);
        assert!(!prop.is_list);
        assert!(ds.property_by_name("ismobile").is_none());
        assert!(matches!(
            ds.require_property("NoSuchProperty"),
            Err(Error::UnknownProperty(_))
        ));
    }

    #[test]
    fn test_profiles_dense_and_sorted() {
        let ds = sample_dataset();
        for component in ds.components() {
            let profiles = ds.profiles(component);
            // Sentinel unknown profile comes first
            assert_eq!(profiles[0].profile_id, 0);
            for (i, p) in profiles.iter().enumerate() {
                assert_eq!(p.index as usize, i);
                assert_eq!(p.component, component.id);
                assert_eq!(
                    ds.profile_by_id(component.id, p.profile_id).unwrap().index,
                    p.index
                );
            }
        }
    }

    #[test]
    fn test_http_headers_distinct() {
        let ds = sample_dataset();
        let headers = ds.http_headers();
        assert_eq!(headers[0], "User-Agent");
        let mut lower: Vec<_> = headers.iter().map(|h| h.to_ascii_lowercase()).collect();
        lower.sort();
        lower.dedup();
        assert_eq!(lower.len(), headers.len());
    }

    #[test]
    fn test_find_signature_matches_node_back_reference() {
        let ds = sample_dataset();
        for (id, sig) in ds.signatures().iter().enumerate() {
            let path = ds.signature_nodes(sig);
            assert_eq!(ds.find_signature(sig.component, path), Some(id as u32));
            assert_eq!(ds.node(*path.last().unwrap()).signature, Some(id as u32));
        }
        assert_eq!(ds.find_signature(0, &[]), None);
    }

    #[test]
    fn test_catalog() {
        let ds = sample_dataset();
        let catalog = ds.property_catalog();
        let bearers = catalog.iter().find(|p| p.name == "Bearers").unwrap();
        assert!(bearers.is_list);
        assert_eq!(bearers.component, "HardwarePlatform");
        let json = serde_json::to_string(&catalog).unwrap();
        assert!(json.contains("\"value_type\":\"bool\""));
    }

    #[test]
    fn test_rejects_every_truncation() {
        let bytes = sample_bytes();
        for len in [0, 8, 31, 32, bytes.len() / 2, bytes.len() - 1] {
            let err = Dataset::from_bytes(&bytes[..len]).unwrap_err();
            assert!(err.is_format(), "len {} gave {}", len, err);
        }
    }

    #[test]
    fn test_resealed_patch_still_loads() {
        let mut bytes = sample_bytes();
        patch::<ComponentRecord>(&mut bytes, SectionKind::Components, 0, |_| {});
        assert!(Dataset::from_bytes(&bytes).is_ok());
    }

    #[test]
    fn test_rejects_missing_unknown_profile() {
        let mut bytes = sample_bytes();
        patch::<ProfileRecord>(&mut bytes, SectionKind::Profiles, 0, |record| {
            record.profile_id.set(5);
        });
        assert!(format_error(&bytes).contains("unknown profile"));
    }

    #[test]
    fn test_rejects_oversized_min_length() {
        let mut bytes = sample_bytes();
        patch::<ComponentRecord>(&mut bytes, SectionKind::Components, 0, |record| {
            record.min_length.set(u32::MAX);
            record.max_length.set(u32::MAX);
        });
        assert!(format_error(&bytes).contains("minimum length"));

        let mut bytes = sample_bytes();
        patch::<ComponentRecord>(&mut bytes, SectionKind::Components, 0, |record| {
            record.min_length.set(MAX_MIN_LENGTH);
            record.max_length.set(MAX_MIN_LENGTH);
        });
        assert!(Dataset::from_bytes(&bytes).is_ok());
    }

    #[test]
    fn test_rejects_incomplete_ranked_list() {
        let ds = sample_dataset();
        let (id, _) = ds
            .nodes
            .iter()
            .enumerate()
            .find(|(_, node)| node.parent.is_some() && ds.ranked_signatures(node).len() >= 2)
            .unwrap();

        let mut bytes = sample_bytes();
        patch::<NodeRecord>(&mut bytes, SectionKind::Nodes, id, |record| {
            record.ranked_count.set(record.ranked_count.get() - 1);
        });
        assert!(format_error(&bytes).contains("signatures in its subtree"));
    }

    #[test]
    fn test_rejects_flipped_bytes() {
        let bytes = sample_bytes();
        for pos in [40, bytes.len() / 3, bytes.len() - 2] {
            let mut corrupt = bytes.clone();
            corrupt[pos] ^= 0x55;
            assert!(Dataset::from_bytes(&corrupt).unwrap_err().is_format());
        }
    }
}
