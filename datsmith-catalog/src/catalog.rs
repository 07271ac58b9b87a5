//! The catalog dictionary: bucket map, two-phase rebucketing, duplicate
//! detection, and staged removal.
//!
//! One conversion or report run owns one `Catalog`. Readers push records in
//! under whatever scheme was active at parse time; writers ask for a
//! rebucket under their output scheme and then walk `sorted_keys`. Phase 2
//! of the rebucket fans out across buckets with rayon — bucket contents are
//! disjoint after phase 1, so the only shared state is the statistics
//! aggregator, which serializes internally.
//!
//! Interleaving `add`/`remove` calls with an in-flight `rebucket` is a
//! caller error this type does not lock against; doing so can leave the
//! aggregate counters wrong, and `recalculate_stats` is the recovery path.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use rayon::prelude::*;

use datsmith_core::{HashKind, Record};

use crate::error::CatalogError;
use crate::key::{BucketScheme, IdentityScope, derive_key};
use crate::natural::natural_cmp;
use crate::stats::{Statistics, StatsSnapshot};

/// How aggressively a rebucket collapses duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupeMode {
    /// Sort only, keep every record
    None,
    /// Merge duplicate runs in every bucket
    Full,
    /// Merge duplicate runs only while bucketed by machine
    Game,
}

/// The full mapping from bucket key to records, with its derived statistics.
#[derive(Debug)]
pub struct Catalog {
    buckets: HashMap<String, Vec<Record>>,
    /// `None` until the first rebucket; before that, keys are whatever the
    /// ingesting collaborator supplied
    scheme: Option<BucketScheme>,
    dedupe: DedupeMode,
    lowercase: bool,
    scope: IdentityScope,
    stats: Statistics,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
            scheme: None,
            dedupe: DedupeMode::None,
            lowercase: false,
            scope: IdentityScope::NameOnly,
            stats: Statistics::new(),
        }
    }

    /// The scheme the catalog was last rebucketed under, if any.
    pub fn scheme(&self) -> Option<BucketScheme> {
        self.scheme
    }

    pub fn dedupe_mode(&self) -> DedupeMode {
        self.dedupe
    }

    /// Number of buckets currently present.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of records across all buckets.
    pub fn record_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Append one record under `key` and fold it into the statistics.
    pub fn add(&mut self, key: impl Into<String>, record: Record) {
        self.stats.add_record(&record);
        self.buckets.entry(key.into()).or_default().push(record);
    }

    /// Batch form of [`add`](Self::add). An empty batch leaves the catalog
    /// untouched rather than creating an empty bucket.
    pub fn add_range(&mut self, key: impl Into<String>, records: impl IntoIterator<Item = Record>) {
        let mut records = records.into_iter().peekable();
        if records.peek().is_none() {
            return;
        }
        let bucket = self.buckets.entry(key.into()).or_default();
        for record in records {
            self.stats.add_record(&record);
            bucket.push(record);
        }
    }

    /// Delete a bucket wholesale, subtracting every contained record from
    /// the statistics. Returns whether the key existed.
    pub fn remove_bucket(&mut self, key: &str) -> bool {
        match self.buckets.remove(key) {
            Some(records) => {
                for record in &records {
                    self.stats.remove_record(record);
                }
                true
            }
            None => false,
        }
    }

    /// Remove the first value-equal instance of `record` from `key`'s
    /// bucket. Returns whether anything was removed.
    pub fn remove_record(&mut self, key: &str, record: &Record) -> bool {
        let Some(bucket) = self.buckets.get_mut(key) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|r| r == record) else {
            return false;
        };
        let removed = bucket.remove(pos);
        self.stats.remove_record(&removed);
        if bucket.is_empty() {
            self.buckets.remove(key);
        }
        true
    }

    /// Records in `key`'s bucket, if present.
    pub fn bucket(&self, key: &str) -> Option<&[Record]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Iterate over `(key, records)` pairs in map order. Writers wanting a
    /// stable order should walk [`sorted_keys`](Self::sorted_keys) instead.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Record])> {
        self.buckets.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Bucket keys in natural order, for deterministic serialization.
    pub fn sorted_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.buckets.keys().cloned().collect();
        keys.sort_by(|a, b| natural_cmp(a, b));
        keys
    }

    /// Snapshot of the running statistics.
    pub fn statistics(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// The live aggregator, for merging statistics across catalogs.
    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// Resolve `Default` through the aggregator's uniform-hash heuristic.
    fn resolve_scheme(&self, scheme: BucketScheme) -> BucketScheme {
        match scheme {
            BucketScheme::Default => BucketScheme::for_hash(self.stats.strongest_uniform_hash()),
            other => other,
        }
    }

    fn current_key(&self, record: &Record) -> Result<String, CatalogError> {
        let scheme = self.scheme.unwrap_or(BucketScheme::Machine);
        derive_key(record, scheme, self.lowercase, self.scope)
    }

    /// Re-key and re-sort the whole catalog, optionally collapsing
    /// duplicates.
    ///
    /// Phase 1 re-derives every record's key under `scheme` and moves the
    /// records whose key changed; it only runs when the resolved scheme,
    /// case folding, or identity scope differs from the catalog's current
    /// settings, and a malformed record aborts it before any bucket is
    /// touched. Phase 2 sorts every bucket in parallel and, when `dedupe`
    /// asks for it (`Full`, or `Game` while bucketed by machine), merges
    /// consecutive duplicate runs into one representative, keeping the
    /// statistics exact.
    ///
    /// Calling this twice with identical arguments leaves the bucket
    /// contents unchanged the second time.
    pub fn rebucket(
        &mut self,
        scheme: BucketScheme,
        dedupe: DedupeMode,
        lowercase: bool,
        scope: IdentityScope,
    ) -> Result<(), CatalogError> {
        let resolved = self.resolve_scheme(scheme);

        if self.scheme != Some(resolved) || lowercase != self.lowercase || scope != self.scope {
            self.rekey(resolved, lowercase, scope)?;
            self.scheme = Some(resolved);
            self.lowercase = lowercase;
            self.scope = scope;
        }

        let dedupe_active = match dedupe {
            DedupeMode::Full => true,
            DedupeMode::Game => self.scheme == Some(BucketScheme::Machine),
            DedupeMode::None => false,
        };
        self.sort_and_dedupe(dedupe_active);
        self.dedupe = dedupe;

        Ok(())
    }

    /// Phase 1: move every record to its bucket under the new key function.
    fn rekey(
        &mut self,
        scheme: BucketScheme,
        lowercase: bool,
        scope: IdentityScope,
    ) -> Result<(), CatalogError> {
        // Derive all keys up front so a malformed record rejects the whole
        // pass with the catalog untouched.
        let mut staged: Vec<(String, Vec<String>)> = Vec::with_capacity(self.buckets.len());
        for (key, records) in &self.buckets {
            let mut keys = Vec::with_capacity(records.len());
            for record in records {
                keys.push(derive_key(record, scheme, lowercase, scope)?);
            }
            staged.push((key.clone(), keys));
        }

        let mut old = std::mem::take(&mut self.buckets);
        let mut moved = 0usize;
        for (key, new_keys) in staged {
            let records = old.remove(&key).unwrap_or_default();
            for (new_key, record) in new_keys.into_iter().zip(records) {
                if new_key != key {
                    moved += 1;
                }
                self.buckets.entry(new_key).or_default().push(record);
            }
        }

        log::debug!(
            "rekeyed catalog under {}: {} records moved across {} buckets",
            scheme.name(),
            moved,
            self.buckets.len()
        );
        Ok(())
    }

    /// Phase 2: per-bucket sort, and duplicate-run merging when active.
    /// Buckets are disjoint, so each one is an independent rayon task; the
    /// statistics aggregator is the only shared state.
    fn sort_and_dedupe(&mut self, dedupe_active: bool) {
        let mut buckets: Vec<(String, Vec<Record>)> = self.buckets.drain().collect();
        let stats = &self.stats;
        let merged = AtomicUsize::new(0);

        buckets.par_iter_mut().for_each(|(_, records)| {
            records.sort_by(compare_records);
            if !dedupe_active {
                return;
            }

            let drained = std::mem::take(records);
            let mut kept: Vec<Record> = Vec::with_capacity(drained.len());
            for record in drained {
                if let Some(last) = kept.last_mut() {
                    if last.is_duplicate_of(&record) {
                        // The representative changes shape when it absorbs
                        // a run member, so swap its old contribution for
                        // the new one and drop the absorbed record's.
                        stats.remove_record(last);
                        stats.remove_record(&record);
                        last.absorb_duplicate(&record);
                        stats.add_record(last);
                        merged.fetch_add(1, AtomicOrdering::Relaxed);
                        continue;
                    }
                }
                kept.push(record);
            }
            *records = kept;
        });

        self.buckets = buckets
            .into_iter()
            .filter(|(_, records)| !records.is_empty())
            .collect();

        if dedupe_active {
            log::debug!(
                "deduplicated catalog: {} records absorbed, {} buckets remain",
                merged.load(AtomicOrdering::Relaxed),
                self.buckets.len()
            );
        }
    }

    /// All records duplicating `record` under the catalog's duplicate rule.
    ///
    /// With `assume_sorted` false this first forces a rebucket under the
    /// uniform-hash scheme (no dedup) so the key function is deterministic.
    /// With `remove_matches`, every match is flagged for removal and the
    /// bucket is rewritten matches-first; [`clear_marked`](Self::clear_marked)
    /// performs the actual compaction later.
    pub fn get_duplicates(
        &mut self,
        record: &Record,
        remove_matches: bool,
        assume_sorted: bool,
    ) -> Result<Vec<Record>, CatalogError> {
        if !assume_sorted {
            self.rebucket(BucketScheme::Default, DedupeMode::None, self.lowercase, self.scope)?;
        }

        let key = self.current_key(record)?;
        let Some(bucket) = self.buckets.get_mut(&key) else {
            return Ok(Vec::new());
        };

        if !remove_matches {
            return Ok(bucket
                .iter()
                .filter(|r| r.is_duplicate_of(record))
                .cloned()
                .collect());
        }

        let drained = std::mem::take(bucket);
        let mut matches = Vec::new();
        let mut rest = Vec::new();
        for mut r in drained {
            if r.is_duplicate_of(record) {
                r.marked_for_removal = true;
                matches.push(r);
            } else {
                rest.push(r);
            }
        }
        bucket.extend(matches.iter().cloned());
        bucket.extend(rest);
        Ok(matches)
    }

    /// Whether any record in `record`'s bucket duplicates it. Read-only:
    /// the bucket is looked up under the catalog's current key function.
    pub fn has_duplicates(&self, record: &Record) -> Result<bool, CatalogError> {
        let key = self.current_key(record)?;
        Ok(self
            .buckets
            .get(&key)
            .is_some_and(|bucket| bucket.iter().any(|r| r.is_duplicate_of(record))))
    }

    /// Reset and rebuild the statistics by scanning every bucket. The
    /// prescribed repair after aggregate drift from out-of-band edits.
    pub fn recalculate_stats(&self) {
        self.stats.reset();
        for records in self.buckets.values() {
            for record in records {
                self.stats.add_record(record);
            }
        }
    }

    /// Drop every record staged for removal, subtracting each from the
    /// statistics and pruning emptied buckets. Returns how many were
    /// dropped.
    pub fn clear_marked(&mut self) -> usize {
        let stats = &self.stats;
        let mut dropped = 0usize;
        self.buckets.retain(|_, records| {
            records.retain(|record| {
                if record.marked_for_removal {
                    stats.remove_record(record);
                    dropped += 1;
                    false
                } else {
                    true
                }
            });
            !records.is_empty()
        });
        dropped
    }
}

/// Total order within a bucket: natural order on item name, then a fixed
/// field sequence so equal-named records still sort deterministically.
fn compare_records(a: &Record, b: &Record) -> Ordering {
    natural_cmp(&a.name, &b.name)
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| natural_cmp(&a.machine.name, &b.machine.name))
        .then_with(|| a.size.cmp(&b.size))
        .then_with(|| a.hashes.get(HashKind::Crc32).cmp(&b.hashes.get(HashKind::Crc32)))
        .then_with(|| a.hashes.get(HashKind::Sha1).cmp(&b.hashes.get(HashKind::Sha1)))
}
