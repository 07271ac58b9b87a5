//! Running aggregate over a whole catalog.
//!
//! Counters are cross-cutting sums that cannot be partitioned by bucket
//! without double-counting during concurrent rewrites, so every mutation
//! goes through one internal mutex. Add/remove are O(1) per record and the
//! dedup worker pool calls them freely.

use std::sync::Mutex;

use datsmith_core::{DumpStatus, HashKind, Record, RecordKind};

/// A copy of the aggregator's counters, for report rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Every record currently in the catalog
    pub total_records: u64,

    // Per-kind counts
    pub roms: u64,
    pub disks: u64,
    pub bios_sets: u64,
    pub releases: u64,
    pub samples: u64,
    pub archives: u64,
    pub blanks: u64,

    /// Content-bearing (Rom/Disk) records that are not Nodump; the
    /// denominator for uniform-hash detection
    pub content_records: u64,
    /// Known byte size summed over content-bearing non-Nodump records
    pub total_size: u64,

    // Hash presence, counted over content-bearing non-Nodump records only
    pub with_crc32: u64,
    pub with_md5: u64,
    pub with_sha1: u64,
    pub with_sha256: u64,
    pub with_sha384: u64,
    pub with_sha512: u64,

    // Per-status counts
    pub status_none: u64,
    pub good: u64,
    pub bad_dumps: u64,
    pub nodumps: u64,
    pub verified: u64,
}

impl StatsSnapshot {
    pub fn kind_count(&self, kind: RecordKind) -> u64 {
        match kind {
            RecordKind::Rom => self.roms,
            RecordKind::Disk => self.disks,
            RecordKind::BiosSet => self.bios_sets,
            RecordKind::Release => self.releases,
            RecordKind::Sample => self.samples,
            RecordKind::Archive => self.archives,
            RecordKind::Blank => self.blanks,
        }
    }

    pub fn hash_count(&self, kind: HashKind) -> u64 {
        match kind {
            HashKind::Crc32 => self.with_crc32,
            HashKind::Md5 => self.with_md5,
            HashKind::Sha1 => self.with_sha1,
            HashKind::Sha256 => self.with_sha256,
            HashKind::Sha384 => self.with_sha384,
            HashKind::Sha512 => self.with_sha512,
        }
    }

    pub fn status_count(&self, status: DumpStatus) -> u64 {
        match status {
            DumpStatus::None => self.status_none,
            DumpStatus::Good => self.good,
            DumpStatus::BadDump => self.bad_dumps,
            DumpStatus::Nodump => self.nodumps,
            DumpStatus::Verified => self.verified,
        }
    }

    fn apply(&mut self, record: &Record, sign: i64) {
        self.total_records = self.total_records.wrapping_add_signed(sign);

        let kind_slot = match record.kind {
            RecordKind::Rom => &mut self.roms,
            RecordKind::Disk => &mut self.disks,
            RecordKind::BiosSet => &mut self.bios_sets,
            RecordKind::Release => &mut self.releases,
            RecordKind::Sample => &mut self.samples,
            RecordKind::Archive => &mut self.archives,
            RecordKind::Blank => &mut self.blanks,
        };
        *kind_slot = kind_slot.wrapping_add_signed(sign);

        let status_slot = match record.status {
            DumpStatus::None => &mut self.status_none,
            DumpStatus::Good => &mut self.good,
            DumpStatus::BadDump => &mut self.bad_dumps,
            DumpStatus::Nodump => &mut self.nodumps,
            DumpStatus::Verified => &mut self.verified,
        };
        *status_slot = status_slot.wrapping_add_signed(sign);

        // Nodump hashes are meaningless and its size is not real content,
        // so neither reaches the content accumulators.
        if record.kind.carries_content() && !record.is_nodump() {
            self.content_records = self.content_records.wrapping_add_signed(sign);
            if let Some(size) = record.size {
                self.total_size = self
                    .total_size
                    .wrapping_add_signed(sign.wrapping_mul(size as i64));
            }
            for kind in HashKind::ALL {
                if record.hashes.has(kind) {
                    let slot = match kind {
                        HashKind::Crc32 => &mut self.with_crc32,
                        HashKind::Md5 => &mut self.with_md5,
                        HashKind::Sha1 => &mut self.with_sha1,
                        HashKind::Sha256 => &mut self.with_sha256,
                        HashKind::Sha384 => &mut self.with_sha384,
                        HashKind::Sha512 => &mut self.with_sha512,
                    };
                    *slot = slot.wrapping_add_signed(sign);
                }
            }
        }
    }

    fn add_fields(&mut self, other: &StatsSnapshot) {
        self.total_records += other.total_records;
        self.roms += other.roms;
        self.disks += other.disks;
        self.bios_sets += other.bios_sets;
        self.releases += other.releases;
        self.samples += other.samples;
        self.archives += other.archives;
        self.blanks += other.blanks;
        self.content_records += other.content_records;
        self.total_size += other.total_size;
        self.with_crc32 += other.with_crc32;
        self.with_md5 += other.with_md5;
        self.with_sha1 += other.with_sha1;
        self.with_sha256 += other.with_sha256;
        self.with_sha384 += other.with_sha384;
        self.with_sha512 += other.with_sha512;
        self.status_none += other.status_none;
        self.good += other.good;
        self.bad_dumps += other.bad_dumps;
        self.nodumps += other.nodumps;
        self.verified += other.verified;
    }
}

/// The incrementally-maintained aggregate owned by a catalog.
///
/// Removing a record more times than it was added is a caller error and
/// corrupts the counters; `Catalog::recalculate_stats` is the recovery
/// path, not an internal check here.
#[derive(Debug, Default)]
pub struct Statistics {
    inner: Mutex<StatsSnapshot>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record in. O(1), never fails.
    pub fn add_record(&self, record: &Record) {
        self.inner.lock().unwrap().apply(record, 1);
    }

    /// Exact inverse of [`add_record`](Self::add_record).
    pub fn remove_record(&self, record: &Record) {
        self.inner.lock().unwrap().apply(record, -1);
    }

    /// Field-wise addition of another aggregate, for combining statistics
    /// across source files.
    pub fn merge(&self, other: &Statistics) {
        let other = other.snapshot();
        self.inner.lock().unwrap().add_fields(&other);
    }

    pub fn reset(&self) {
        *self.inner.lock().unwrap() = StatsSnapshot::default();
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        *self.inner.lock().unwrap()
    }

    /// The strongest hash algorithm present on every content-bearing
    /// non-Nodump record, falling back to CRC-32 when nothing stronger is
    /// universal. This is what `BucketScheme::Default` resolves to.
    pub fn strongest_uniform_hash(&self) -> HashKind {
        let snap = self.snapshot();
        if snap.content_records > 0 {
            for kind in HashKind::strongest_first() {
                if kind == HashKind::Crc32 {
                    break;
                }
                if snap.hash_count(kind) == snap.content_records {
                    return kind;
                }
            }
        }
        HashKind::Crc32
    }
}
