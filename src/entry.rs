//! Entry record types
//!
//! These types represent filesystem entries produced by the walker. A
//! [`FileSystemEntry`] is created once per visited entry and never mutated
//! afterwards; per-entry failures are carried in the record rather than
//! aborting the walk.

use crate::error::EntryErrorKind;
use crate::win32::rights::rights_names;
use std::collections::HashMap;

/// Directory bit in the Win32 attribute set
pub const ATTR_DIRECTORY: u32 = 0x0000_0010;

/// Attribute value reported for a plain file with no other flags
pub const ATTR_NORMAL: u32 = 0x0000_0080;

/// Mapping from identity string (`DOMAIN\NAME`, well-known name, or string
/// SID) to the raw access mask granted or denied to that identity.
///
/// Keys are unique; when several access rules name the same identity the
/// last one observed wins.
pub type AclMap = HashMap<String, u32>;

/// Kind of filesystem entry, derived from the directory attribute bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

impl EntryKind {
    /// Derive the kind from a Win32 attribute bitset
    pub fn from_attributes(attributes: u32) -> Self {
        if attributes & ATTR_DIRECTORY != 0 {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }

    /// Check if this is a directory
    pub fn is_dir(&self) -> bool {
        *self == EntryKind::Directory
    }

    /// Check if this is a regular file
    pub fn is_file(&self) -> bool {
        *self == EntryKind::File
    }
}

/// A single record produced by the walk
///
/// Invariants: `path` is non-empty; an empty `error` implies
/// `modified == true`; `modified == false` implies `acl` and `owner` are
/// empty.
#[derive(Debug, Clone)]
pub struct FileSystemEntry {
    /// Absolute path of the entry
    pub path: String,

    /// Owner principal display name; empty when owner resolution was
    /// disabled or failed silently
    pub owner: String,

    /// Win32 attribute bitset as reported by enumeration
    pub attributes: u32,

    /// Access-control entries keyed by identity; empty if unobtainable
    pub acl: AclMap,

    /// Whether security data was resolved successfully
    pub modified: bool,

    /// Classified error tag; empty when resolution succeeded
    pub error: String,
}

impl FileSystemEntry {
    /// Build an entry whose security information resolved successfully
    pub fn resolved(path: String, attributes: u32, owner: String, acl: AclMap) -> Self {
        Self {
            path,
            owner,
            attributes,
            acl,
            modified: true,
            error: String::new(),
        }
    }

    /// Build an entry whose security resolution failed with `kind`
    pub fn failed(path: String, attributes: u32, kind: EntryErrorKind) -> Self {
        Self {
            path,
            owner: String::new(),
            attributes,
            acl: AclMap::new(),
            modified: false,
            error: kind.as_str().to_string(),
        }
    }

    /// Build an entry with no security payload (path-only enumeration)
    pub fn bare(path: String, attributes: u32) -> Self {
        Self {
            path,
            owner: String::new(),
            attributes,
            acl: AclMap::new(),
            modified: true,
            error: String::new(),
        }
    }

    /// Kind of the entry, from the attribute bit
    pub fn kind(&self) -> EntryKind {
        EntryKind::from_attributes(self.attributes)
    }

    /// Render the canonical record line: `Path | Owner | ACL-count |
    /// Modified | Error`, with empty fields rendered as empty strings.
    pub fn render_line(&self) -> String {
        format!(
            "{} | {} | {} | {} | {}",
            self.path,
            self.owner,
            self.acl.len(),
            self.modified,
            self.error
        )
    }

    /// Render the ACL map as `identity=rights_name_set` pairs joined by `;`
    ///
    /// Pairs are sorted by identity so the rendering is deterministic.
    pub fn render_acl(&self) -> String {
        let mut pairs: Vec<_> = self.acl.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs
            .iter()
            .map(|(identity, mask)| format!("{}={}", identity, rights_names(**mask)))
            .collect::<Vec<_>>()
            .join(";")
    }
}
