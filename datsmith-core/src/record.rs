use serde::{Deserialize, Serialize};

use crate::hash::{HashKind, Hashes};

/// The closed set of entry kinds a DAT dialect can describe.
///
/// Every operation over records matches this exhaustively — a new kind must
/// be handled everywhere before the crate compiles again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// A ROM image (content-bearing, hashed)
    Rom,
    /// A disc image (content-bearing, hashed)
    Disk,
    /// A BIOS set reference
    BiosSet,
    /// A release entry (region/language variant of a machine)
    Release,
    /// An audio sample
    Sample,
    /// An archive container entry
    Archive,
    /// A machine with no entries at all; keeps the machine in the catalog
    Blank,
}

impl Default for RecordKind {
    fn default() -> Self {
        Self::Rom
    }
}

impl RecordKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rom => "rom",
            Self::Disk => "disk",
            Self::BiosSet => "biosset",
            Self::Release => "release",
            Self::Sample => "sample",
            Self::Archive => "archive",
            Self::Blank => "blank",
        }
    }

    /// Whether this kind describes hashed file content. Only content-bearing
    /// records participate in size/hash aggregates and hash-keyed bucketing.
    pub fn carries_content(&self) -> bool {
        matches!(self, Self::Rom | Self::Disk)
    }
}

/// Dump quality reported by the source catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DumpStatus {
    /// No status recorded
    #[default]
    None,
    /// A known-good dump
    Good,
    /// Hashes recorded but known or suspected incorrect
    BadDump,
    /// Content never dumped; hashes are meaningless if present
    Nodump,
    /// Independently verified good dump
    Verified,
}

impl DumpStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Good => "good",
            Self::BadDump => "baddump",
            Self::Nodump => "nodump",
            Self::Verified => "verified",
        }
    }

    /// Status surviving a duplicate merge: Nodump only when both sides are
    /// Nodump, otherwise the stronger of the two (Good > BadDump >
    /// Verified > None).
    pub fn merged(self, other: DumpStatus) -> DumpStatus {
        match (self, other) {
            (Self::Nodump, Self::Nodump) => Self::Nodump,
            (Self::Nodump, s) | (s, Self::Nodump) => s,
            (a, b) => {
                if Self::merge_rank(a) >= Self::merge_rank(b) {
                    a
                } else {
                    b
                }
            }
        }
    }

    fn merge_rank(status: DumpStatus) -> u8 {
        match status {
            Self::Good => 3,
            Self::BadDump => 2,
            Self::Verified => 1,
            Self::None | Self::Nodump => 0,
        }
    }
}

/// The named group (game/device) that owns one or more records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub name: String,
    pub description: Option<String>,
    /// Parent machine this one is a clone of
    pub clone_of: Option<String>,
    /// Parent machine whose ROMs this one shares
    pub rom_of: Option<String>,
    /// Parent machine whose samples this one shares
    pub sample_of: Option<String>,
}

impl Machine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_clone_of(mut self, parent: impl Into<String>) -> Self {
        self.clone_of = Some(parent.into());
        self
    }
}

/// Where a record came from: which source file in the run, and that file's
/// position in the run. Traceability only — never part of record equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Identifier of the originating catalog file
    pub file: String,
    /// Index of that file within the conversion run
    pub index: u64,
}

impl Source {
    pub fn new(file: impl Into<String>, index: u64) -> Self {
        Self {
            file: file.into(),
            index,
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub kind: RecordKind,
    /// Item name within the owning machine (typically a file name)
    pub name: String,
    /// Size in bytes; `None` means unknown, distinct from zero
    pub size: Option<u64>,
    pub hashes: Hashes,
    pub status: DumpStatus,
    pub machine: Machine,
    pub source: Source,
    /// Staged-deletion flag; set by duplicate removal, honored by the
    /// catalog's compaction pass
    pub marked_for_removal: bool,
}

impl Record {
    pub fn new(kind: RecordKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_hash(mut self, kind: HashKind, digest: impl Into<String>) -> Self {
        self.hashes.set(kind, digest);
        self
    }

    pub fn with_status(mut self, status: DumpStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_machine(mut self, machine: Machine) -> Self {
        self.machine = machine;
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn is_nodump(&self) -> bool {
        self.status == DumpStatus::Nodump
    }

    /// True if this record describes a zero-byte placeholder entry (every
    /// present digest is its algorithm's empty-input digest).
    pub fn is_placeholder_dump(&self) -> bool {
        self.hashes.is_placeholder()
    }

    /// The duplicate rule used by dedup and duplicate lookup.
    ///
    /// Two records are duplicates iff they are the same kind and:
    /// - both are Nodump with the same item name (a Nodump never duplicates
    ///   a dumped record, and its digests are never consulted), or
    /// - every hash kind present on both sides matches, with at least one
    ///   kind shared (absence on one side is not a mismatch), or
    /// - no hash kind is shared and both sizes are known and equal.
    ///
    /// Catalogs routinely list one file with different hash coverage, so a
    /// single shared digest is deliberately enough.
    pub fn is_duplicate_of(&self, other: &Record) -> bool {
        if self.kind != other.kind {
            return false;
        }

        if self.is_nodump() || other.is_nodump() {
            return self.is_nodump() && other.is_nodump() && self.name == other.name;
        }

        let mut shared_any = false;
        for kind in self.hashes.shared_kinds(&other.hashes) {
            shared_any = true;
            if self.hashes.get(kind) != other.hashes.get(kind) {
                return false;
            }
        }
        if shared_any {
            return true;
        }

        // No hash overlap: fall back to sizes, but only when both are known.
        matches!((self.size, other.size), (Some(a), Some(b)) if a == b)
    }

    /// Fold a duplicate into this record: union the digest sets (the
    /// later record's value wins per field), keep the stronger status, and
    /// fill in a missing size. Name, machine, and provenance stay as the
    /// surviving identity.
    pub fn absorb_duplicate(&mut self, other: &Record) {
        self.hashes.absorb(&other.hashes);
        self.status = self.status.merged(other.status);
        if self.size.is_none() {
            self.size = other.size;
        }
    }
}
