//! Interned string storage
//!
//! Every piece of text in a snapshot (component, property and header names,
//! value payloads, node characters) is stored once in the strings section
//! and referenced by a dense [`StringId`].
//!
//! # Format
//!
//! ```text
//! [StringRecord; count]   offset/length pairs into the blob
//! [blob]                  concatenated UTF-8 bytes, no terminators
//! ```

use crate::error::{Error, Result};
use crate::format::{read_records, to_u32, StringRecord};
use rustc_hash::FxHashMap;
use std::mem;
use zerocopy::byteorder::little_endian::U32;
use zerocopy::IntoBytes;

/// Handle of an interned string
pub type StringId = u32;

/// Read-only pool of interned strings
#[derive(Debug, Default)]
pub struct StringPool {
    blob: String,
    spans: Vec<(u32, u32)>,
}

impl StringPool {
    /// Parse the strings section, validating bounds and UTF-8
    pub fn from_section(bytes: &[u8], count: usize) -> Result<Self> {
        let records_len = count
            .checked_mul(mem::size_of::<StringRecord>())
            .filter(|len| *len <= bytes.len())
            .ok_or_else(|| Error::format("string records extend beyond section"))?;
        let records = read_records::<StringRecord>(&bytes[..records_len], count, "strings")?;

        let blob = std::str::from_utf8(&bytes[records_len..])
            .map_err(|e| Error::format(format!("string blob is not valid UTF-8: {}", e)))?;

        let mut spans = Vec::with_capacity(count);
        for (id, record) in records.iter().enumerate() {
            let start = record.offset.get();
            let end = start
                .checked_add(record.length.get())
                .filter(|end| *end as usize <= blob.len())
                .ok_or_else(|| Error::format(format!("string {} out of bounds", id)))?;
            if !blob.is_char_boundary(start as usize) || !blob.is_char_boundary(end as usize) {
                return Err(Error::format(format!(
                    "string {} does not fall on UTF-8 boundaries",
                    id
                )));
            }
            spans.push((start, end));
        }

        Ok(Self {
            blob: blob.to_string(),
            spans,
        })
    }

    /// Get a string by id
    #[inline]
    pub fn get(&self, id: StringId) -> Option<&str> {
        let &(start, end) = self.spans.get(id as usize)?;
        Some(&self.blob[start as usize..end as usize])
    }

    /// Get a string that load-time validation has already checked
    #[inline]
    pub(crate) fn resolve(&self, id: StringId) -> &str {
        self.get(id).unwrap_or_default()
    }

    /// Check that `id` refers to a string, naming `what` in the error
    pub(crate) fn check(&self, id: StringId, what: &str) -> Result<()> {
        if (id as usize) < self.spans.len() {
            Ok(())
        } else {
            Err(Error::format(format!(
                "{} refers to missing string {}",
                what, id
            )))
        }
    }

    /// Number of strings
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// True when the pool holds no strings
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Total size of string data in bytes
    pub fn data_size(&self) -> usize {
        self.blob.len()
    }
}

/// Builder-side interner producing the strings section
#[derive(Debug, Default)]
pub struct StringTable {
    index: FxHashMap<String, StringId>,
    strings: Vec<String>,
}

impl StringTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `s`, returning the existing id if it was seen before
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.index.get(s) {
            return id;
        }
        let id = self.strings.len() as StringId;
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), id);
        id
    }

    /// Look up a previously interned string
    pub fn get(&self, id: StringId) -> Option<&str> {
        self.strings.get(id as usize).map(String::as_str)
    }

    /// Number of distinct strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// True when nothing was interned
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Serialize into the strings section; returns (record count, bytes)
    pub fn to_section(&self) -> Result<(u32, Vec<u8>)> {
        let mut records = Vec::with_capacity(self.strings.len());
        let mut blob = Vec::new();
        for s in &self.strings {
            records.push(StringRecord {
                offset: U32::new(to_u32(blob.len(), "string blob offset")?),
                length: U32::new(to_u32(s.len(), "string length")?),
            });
            blob.extend_from_slice(s.as_bytes());
        }

        let mut bytes = records.as_bytes().to_vec();
        bytes.extend_from_slice(&blob);
        Ok((to_u32(records.len(), "string count")?, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_deduplicates() {
        let mut table = StringTable::new();
        let a = table.intern("IsMobile");
        let b = table.intern("BrowserName");
        let c = table.intern("IsMobile");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(b), Some("BrowserName"));
    }

    #[test]
    fn test_section_roundtrip_with_unicode() {
        let mut table = StringTable::new();
        let words = ["", "Firefox", "Überbrowser", "日本語"];
        let ids: Vec<_> = words.iter().map(|w| table.intern(w)).collect();

        let (count, bytes) = table.to_section().unwrap();
        let pool = StringPool::from_section(&bytes, count as usize).unwrap();
        assert_eq!(pool.len(), 4);
        for (word, id) in words.iter().zip(ids) {
            assert_eq!(pool.get(id), Some(*word));
        }
        assert_eq!(pool.get(99), None);
    }

    #[test]
    fn test_rejects_out_of_bounds_record() {
        let mut table = StringTable::new();
        table.intern("abc");
        let (count, mut bytes) = table.to_section().unwrap();
        // Stretch the length past the blob
        bytes[4] = 200;
        assert!(StringPool::from_section(&bytes, count as usize).is_err());
    }

    #[test]
    fn test_rejects_split_code_point() {
        let mut table = StringTable::new();
        table.intern("é");
        let (count, mut bytes) = table.to_section().unwrap();
        // Length 1 cuts the two-byte character in half
        bytes[4] = 1;
        assert!(StringPool::from_section(&bytes, count as usize).is_err());
    }
}
