//! Binary snapshot layout
//!
//! A snapshot is a single little-endian buffer made of a fixed header, a
//! section directory and the sections themselves. Every record is a
//! `repr(C)` struct of unaligned little-endian integers, so records can be
//! viewed straight out of a memory-mapped file with `zerocopy`, regardless
//! of the alignment of the backing buffer.
//!
//! # Layout
//!
//! ```text
//! [SnapshotHeader: 32 bytes]
//!   magic "DMTRIE\0\0", version, section_count,
//!   checksum (XXH64 of every byte after the header), body_len
//! [SectionEntry; section_count]
//!   kind, absolute offset, byte length, record count
//! [Sections...]
//! ```
//!
//! References between records are plain `u32` indices into other sections;
//! [`NONE`] marks an absent reference.

use crate::error::{Error, Result};
use std::mem;
use xxhash_rust::xxh64::xxh64;
use zerocopy::byteorder::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Magic bytes identifying a devicematch snapshot
pub const MAGIC: &[u8; 8] = b"DMTRIE\0\0";

/// Current (and only accepted) format version
pub const VERSION: u32 = 1;

/// Seed for the snapshot checksum
pub const CHECKSUM_SEED: u64 = 0;

/// Absent reference marker
pub const NONE: u32 = u32::MAX;

/// Largest accepted component minimum length; short input is padded up to
/// it on every match
pub const MAX_MIN_LENGTH: u32 = 64 * 1024;

/// Property flag: the property holds a list of values
pub const PROPERTY_FLAG_LIST: u32 = 1;

/// Snapshot header (32 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct SnapshotHeader {
    /// Magic bytes: "DMTRIE\0\0"
    pub magic: [u8; 8],
    /// Format version
    pub version: U32,
    /// Number of entries in the section directory
    pub section_count: U32,
    /// XXH64 over everything after the header
    pub checksum: U64,
    /// Number of bytes after the header
    pub body_len: U32,
    /// Reserved for future use
    pub reserved: U32,
}

/// Section directory entry (16 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct SectionEntry {
    /// [`SectionKind`] discriminant
    pub kind: U32,
    /// Absolute offset of the section
    pub offset: U32,
    /// Section length in bytes
    pub length: U32,
    /// Number of records in the section
    pub count: U32,
}

/// Kinds of sections a snapshot contains
///
/// Every kind must appear exactly once.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    /// String records followed by the UTF-8 blob
    Strings = 1,
    /// Dataset name and publication date
    Info = 2,
    /// [`ComponentRecord`] array
    Components = 3,
    /// Header name string ids, referenced by components
    ComponentHeaders = 4,
    /// [`PropertyRecord`] array
    Properties = 5,
    /// [`ValueRecord`] array
    Values = 6,
    /// [`ProfileRecord`] array, grouped by component
    Profiles = 7,
    /// Value ids, referenced by profiles
    ProfileValues = 8,
    /// [`NodeRecord`] array
    Nodes = 9,
    /// Child node ids, referenced by nodes
    NodeChildren = 10,
    /// Signature ids in rank order, referenced by nodes
    NodeRanked = 11,
    /// [`SignatureRecord`] array
    Signatures = 12,
    /// Node ids, referenced by signatures
    SignatureNodes = 13,
    /// Profile indices, one per component, referenced by signatures
    SignatureProfiles = 14,
    /// [`ReverseRecord`] array, one per value
    ReverseIndex = 15,
    /// Profile indices, referenced by the reverse index
    ReverseProfiles = 16,
}

impl SectionKind {
    /// All section kinds in the order the writer emits them
    pub const ALL: [SectionKind; 16] = [
        SectionKind::Strings,
        SectionKind::Info,
        SectionKind::Components,
        SectionKind::ComponentHeaders,
        SectionKind::Properties,
        SectionKind::Values,
        SectionKind::Profiles,
        SectionKind::ProfileValues,
        SectionKind::Nodes,
        SectionKind::NodeChildren,
        SectionKind::NodeRanked,
        SectionKind::Signatures,
        SectionKind::SignatureNodes,
        SectionKind::SignatureProfiles,
        SectionKind::ReverseIndex,
        SectionKind::ReverseProfiles,
    ];

    /// Convert from the on-disk discriminant
    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| *kind as u32 == value)
    }

    /// Size of one record in this section (strings: one [`StringRecord`])
    pub fn record_size(self) -> usize {
        match self {
            SectionKind::Strings => mem::size_of::<StringRecord>(),
            SectionKind::Info => mem::size_of::<InfoRecord>(),
            SectionKind::Components => mem::size_of::<ComponentRecord>(),
            SectionKind::Properties => mem::size_of::<PropertyRecord>(),
            SectionKind::Values => mem::size_of::<ValueRecord>(),
            SectionKind::Profiles => mem::size_of::<ProfileRecord>(),
            SectionKind::Nodes => mem::size_of::<NodeRecord>(),
            SectionKind::Signatures => mem::size_of::<SignatureRecord>(),
            SectionKind::ReverseIndex => mem::size_of::<ReverseRecord>(),
            SectionKind::ComponentHeaders
            | SectionKind::ProfileValues
            | SectionKind::NodeChildren
            | SectionKind::NodeRanked
            | SectionKind::SignatureNodes
            | SectionKind::SignatureProfiles
            | SectionKind::ReverseProfiles => mem::size_of::<U32>(),
        }
    }
}

/// Location of one interned string inside the string blob
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct StringRecord {
    /// Offset from the start of the blob
    pub offset: U32,
    /// Length in bytes
    pub length: U32,
}

/// Dataset information
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct InfoRecord {
    /// Dataset name (string id)
    pub name: U32,
    /// Publication date (string id)
    pub published: U32,
}

/// Detection component
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ComponentRecord {
    /// Component name (string id)
    pub name: U32,
    /// Index of the default profile within this component
    pub default_profile: U32,
    /// Shorter inputs are padded to this length
    pub min_length: U32,
    /// Longer inputs are truncated to this length
    pub max_length: U32,
    /// Root node id of this component's trie
    pub root_node: U32,
    /// First entry in the component headers section
    pub headers_start: U32,
    /// Number of header names
    pub headers_count: U32,
}

/// Property definition
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct PropertyRecord {
    /// Property name (string id)
    pub name: U32,
    /// Description (string id or [`NONE`])
    pub description: U32,
    /// Owning component id
    pub component: U32,
    /// Value type discriminant
    pub value_type: U32,
    /// `PROPERTY_FLAG_*` bits
    pub flags: U32,
    /// Default value id or [`NONE`]
    pub default_value: U32,
}

/// Interned property value
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ValueRecord {
    /// Owning property id
    pub property: U32,
    /// Value payload (string id)
    pub name: U32,
}

/// Profile definition
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ProfileRecord {
    /// Owning component id
    pub component: U32,
    /// External stable profile id
    pub profile_id: U32,
    /// First entry in the profile values section
    pub values_start: U32,
    /// Number of value ids
    pub values_count: U32,
}

/// Trie node (44 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct NodeRecord {
    /// Component whose trie holds this node
    pub component: U32,
    /// Parent node id or [`NONE`] for a root
    pub parent: U32,
    /// Byte offset in the input of the expected characters
    pub offset: U32,
    /// Number of expected bytes
    pub length: U32,
    /// Expected characters (string id or [`NONE`] for a root)
    pub characters: U32,
    /// Rank weight used for distance scoring
    pub weight: U32,
    /// First entry in the node children section
    pub children_start: U32,
    /// Number of children
    pub children_count: U32,
    /// Signature ending at this node or [`NONE`]
    pub signature: U32,
    /// First entry in the node ranked signatures section
    pub ranked_start: U32,
    /// Number of signatures in this node's subtree
    pub ranked_count: U32,
}

/// Signature definition
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct SignatureRecord {
    /// Component whose trie holds the signature path
    pub component: U32,
    /// Specificity rank
    pub rank: U32,
    /// First entry in the signature nodes section
    pub nodes_start: U32,
    /// Path length
    pub nodes_count: U32,
    /// First entry in the signature profiles section (one per component)
    pub profiles_start: U32,
}

/// Reverse index entry for one value
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ReverseRecord {
    /// First entry in the reverse profiles section
    pub start: U32,
    /// Number of profiles holding the value
    pub count: U32,
}

/// View `count` records of type `T` in `bytes`
pub fn read_records<'a, T>(bytes: &'a [u8], count: usize, what: &str) -> Result<&'a [T]>
where
    T: FromBytes + Immutable + KnownLayout + Unaligned,
{
    let expected = count
        .checked_mul(mem::size_of::<T>())
        .ok_or_else(|| Error::format(format!("{} record count overflows", what)))?;
    if bytes.len() != expected {
        return Err(Error::format(format!(
            "{} section is {} bytes, expected {} for {} records",
            what,
            bytes.len(),
            expected,
            count
        )));
    }
    <[T]>::ref_from_bytes(bytes)
        .map_err(|_| Error::format(format!("{} section has an invalid layout", what)))
}

/// Read the header and directory of a snapshot, verifying magic, version,
/// length and checksum
pub fn read_directory(data: &[u8]) -> Result<(SnapshotHeader, Vec<SectionEntry>)> {
    let (header, _) = SnapshotHeader::read_from_prefix(data).map_err(|_| {
        Error::format(format!(
            "snapshot too small: {} bytes, header needs {}",
            data.len(),
            mem::size_of::<SnapshotHeader>()
        ))
    })?;

    if &header.magic != MAGIC {
        return Err(Error::format(format!(
            "invalid magic: expected {:?}, got {:?}",
            MAGIC, header.magic
        )));
    }
    if header.version.get() != VERSION {
        return Err(Error::format(format!(
            "unsupported format version {} (supported: {})",
            header.version.get(),
            VERSION
        )));
    }

    let body = &data[mem::size_of::<SnapshotHeader>()..];
    if body.len() != header.body_len.get() as usize {
        return Err(Error::format(format!(
            "body length mismatch: header says {}, found {}",
            header.body_len.get(),
            body.len()
        )));
    }
    let checksum = xxh64(body, CHECKSUM_SEED);
    if checksum != header.checksum.get() {
        return Err(Error::format(format!(
            "checksum mismatch: expected {:016x}, computed {:016x}",
            header.checksum.get(),
            checksum
        )));
    }

    let section_count = header.section_count.get() as usize;
    let dir_len = section_count
        .checked_mul(mem::size_of::<SectionEntry>())
        .filter(|len| *len <= body.len())
        .ok_or_else(|| Error::format("section directory extends beyond snapshot"))?;
    let entries = read_records::<SectionEntry>(&body[..dir_len], section_count, "directory")?;
    Ok((header, entries.to_vec()))
}

/// Collects sections and produces a complete snapshot buffer
#[derive(Default)]
pub struct SnapshotWriter {
    sections: Vec<(SectionKind, u32, Vec<u8>)>,
}

impl SnapshotWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section of fixed-size records
    pub fn records<T: IntoBytes + Immutable>(&mut self, kind: SectionKind, records: &[T]) {
        self.sections
            .push((kind, records.len() as u32, records.as_bytes().to_vec()));
    }

    /// Add a section of `u32` values
    pub fn u32s(&mut self, kind: SectionKind, values: &[u32]) {
        let encoded: Vec<U32> = values.iter().map(|v| U32::new(*v)).collect();
        self.records(kind, &encoded);
    }

    /// Add a section with raw content and an explicit record count
    pub fn raw(&mut self, kind: SectionKind, count: u32, bytes: Vec<u8>) {
        self.sections.push((kind, count, bytes));
    }

    /// Lay out the sections, compute the checksum and return the snapshot
    pub fn finish(self) -> Result<Vec<u8>> {
        let header_len = mem::size_of::<SnapshotHeader>();
        let dir_len = self.sections.len() * mem::size_of::<SectionEntry>();

        let mut entries = Vec::with_capacity(self.sections.len());
        let mut offset = header_len + dir_len;
        for (kind, count, bytes) in &self.sections {
            entries.push(SectionEntry {
                kind: U32::new(*kind as u32),
                offset: U32::new(to_u32(offset, "section offset")?),
                length: U32::new(to_u32(bytes.len(), "section length")?),
                count: U32::new(*count),
            });
            offset += bytes.len();
        }

        let mut body = Vec::with_capacity(offset - header_len);
        body.extend_from_slice(entries.as_bytes());
        for (_, _, bytes) in &self.sections {
            body.extend_from_slice(bytes);
        }

        let header = SnapshotHeader {
            magic: *MAGIC,
            version: U32::new(VERSION),
            section_count: U32::new(to_u32(entries.len(), "section count")?),
            checksum: U64::new(xxh64(&body, CHECKSUM_SEED)),
            body_len: U32::new(to_u32(body.len(), "snapshot size")?),
            reserved: U32::new(0),
        };

        let mut buffer = Vec::with_capacity(header_len + body.len());
        buffer.extend_from_slice(header.as_bytes());
        buffer.extend_from_slice(&body);
        Ok(buffer)
    }
}

/// Narrow a size to the on-disk `u32` (4GB limit)
pub fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::build(format!("{} {} exceeds u32 range", what, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sizes() {
        assert_eq!(mem::size_of::<SnapshotHeader>(), 32);
        assert_eq!(mem::size_of::<SectionEntry>(), 16);
        assert_eq!(mem::size_of::<NodeRecord>(), 44);
        assert_eq!(mem::size_of::<SignatureRecord>(), 20);
        assert_eq!(SectionKind::ProfileValues.record_size(), 4);
    }

    #[test]
    fn test_section_kind_roundtrip() {
        for kind in SectionKind::ALL {
            assert_eq!(SectionKind::from_u32(kind as u32), Some(kind));
        }
        assert_eq!(SectionKind::from_u32(0), None);
        assert_eq!(SectionKind::from_u32(99), None);
    }

    #[test]
    fn test_writer_directory() {
        let mut writer = SnapshotWriter::new();
        writer.u32s(SectionKind::NodeChildren, &[1, 2, 3]);
        writer.raw(SectionKind::Strings, 0, Vec::new());
        let bytes = writer.finish().unwrap();

        let (header, entries) = read_directory(&bytes).unwrap();
        assert_eq!(header.section_count.get(), 2);
        assert_eq!(entries[0].kind.get(), SectionKind::NodeChildren as u32);
        assert_eq!(entries[0].count.get(), 3);
        assert_eq!(entries[0].length.get(), 12);

        let start = entries[0].offset.get() as usize;
        let values = read_records::<U32>(&bytes[start..start + 12], 3, "children").unwrap();
        assert_eq!(values[2].get(), 3);
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut writer = SnapshotWriter::new();
        writer.u32s(SectionKind::NodeChildren, &[7, 8, 9]);
        let mut bytes = writer.finish().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;

        let err = read_directory(&bytes).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_rejects_bad_magic_and_version() {
        let bytes = SnapshotWriter::new().finish().unwrap();

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(read_directory(&bad_magic).unwrap_err().is_format());

        let mut bad_version = bytes.clone();
        bad_version[8] = 9;
        let err = read_directory(&bad_version).unwrap_err();
        assert!(err.to_string().contains("version"));

        assert!(read_directory(&bytes[..10]).is_err());
    }

    #[test]
    fn test_read_records_length_check() {
        let bytes = [0u8; 10];
        assert!(read_records::<U32>(&bytes, 3, "values").is_err());
        assert_eq!(read_records::<U32>(&bytes[..8], 2, "values").unwrap().len(), 2);
    }
}
