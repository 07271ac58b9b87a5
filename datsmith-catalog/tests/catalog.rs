//! Integration tests over the public catalog surface: rebucket invariants,
//! dedup behavior, and statistics consistency.

use datsmith_catalog::{BucketScheme, Catalog, DedupeMode, IdentityScope, derive_key};
use datsmith_core::{DumpStatus, HashKind, Machine, Record, RecordKind, Source};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rom(machine: &str, name: &str) -> Record {
    Record::new(RecordKind::Rom, name)
        .with_machine(Machine::new(machine))
        .with_source(Source::new("input.dat", 0))
}

/// Ingest a small multi-machine catalog under the machine scheme, the way
/// a format reader would.
fn seed_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.add(
        "Alpha Quest (USA)",
        rom("Alpha Quest (USA)", "alpha.bin")
            .with_size(1024)
            .with_hash(HashKind::Crc32, "11111111")
            .with_hash(HashKind::Sha1, "aaaa000000000000000000000000000000000000"),
    );
    catalog.add(
        "Alpha Quest (USA)",
        rom("Alpha Quest (USA)", "alpha-manual.bin")
            .with_size(64)
            .with_hash(HashKind::Crc32, "22222222")
            .with_hash(HashKind::Sha1, "bbbb000000000000000000000000000000000000"),
    );
    catalog.add(
        "Beta Racer (Europe)",
        rom("Beta Racer (Europe)", "beta.bin")
            .with_size(2048)
            .with_hash(HashKind::Crc32, "33333333")
            .with_hash(HashKind::Sha1, "cccc000000000000000000000000000000000000"),
    );
    catalog
}

/// Walk every bucket and rebuild a fresh aggregate; it must equal the
/// incrementally-maintained one.
fn assert_stats_consistent(catalog: &Catalog) {
    let reference = Catalog::new();
    for key in catalog.sorted_keys() {
        for record in catalog.bucket(&key).unwrap() {
            reference.stats().add_record(record);
        }
    }
    assert_eq!(catalog.statistics(), reference.statistics());
}

#[test]
fn stats_match_bucket_contents_after_mutation_mix() {
    init_logging();
    let mut catalog = seed_catalog();
    assert_stats_consistent(&catalog);

    catalog
        .rebucket(
            BucketScheme::Sha1,
            DedupeMode::None,
            true,
            IdentityScope::NameOnly,
        )
        .unwrap();
    assert_stats_consistent(&catalog);

    assert!(catalog.remove_bucket("cccc000000000000000000000000000000000000"));
    assert_stats_consistent(&catalog);

    catalog.add(
        "44444444",
        rom("Gamma Saga (Japan)", "gamma.bin")
            .with_size(512)
            .with_hash(HashKind::Crc32, "44444444"),
    );
    assert_stats_consistent(&catalog);

    catalog
        .rebucket(
            BucketScheme::Crc32,
            DedupeMode::Full,
            true,
            IdentityScope::NameOnly,
        )
        .unwrap();
    assert_stats_consistent(&catalog);
}

#[test]
fn rebucket_assigns_every_record_its_derived_key() {
    let mut catalog = seed_catalog();
    catalog
        .rebucket(
            BucketScheme::Crc32,
            DedupeMode::None,
            false,
            IdentityScope::NameOnly,
        )
        .unwrap();

    for key in catalog.sorted_keys() {
        for record in catalog.bucket(&key).unwrap() {
            let derived =
                derive_key(record, BucketScheme::Crc32, false, IdentityScope::NameOnly).unwrap();
            assert_eq!(derived, key);
        }
    }
}

#[test]
fn rebucket_is_idempotent_on_bucket_multisets() {
    let mut catalog = seed_catalog();
    catalog
        .rebucket(
            BucketScheme::Sha1,
            DedupeMode::Full,
            false,
            IdentityScope::NameOnly,
        )
        .unwrap();

    let keys_before = catalog.sorted_keys();
    let contents_before: Vec<Vec<Record>> = keys_before
        .iter()
        .map(|k| catalog.bucket(k).unwrap().to_vec())
        .collect();

    catalog
        .rebucket(
            BucketScheme::Sha1,
            DedupeMode::Full,
            false,
            IdentityScope::NameOnly,
        )
        .unwrap();

    assert_eq!(catalog.sorted_keys(), keys_before);
    let contents_after: Vec<Vec<Record>> = keys_before
        .iter()
        .map(|k| catalog.bucket(k).unwrap().to_vec())
        .collect();
    assert_eq!(contents_after, contents_before);
}

#[test]
fn full_dedupe_collapses_identical_records_under_crc() {
    init_logging();
    let mut catalog = Catalog::new();
    for _ in 0..2 {
        catalog.add(
            "Some Game",
            rom("Some Game", "a.bin")
                .with_size(10)
                .with_hash(HashKind::Crc32, "11111111"),
        );
    }

    catalog
        .rebucket(
            BucketScheme::Crc32,
            DedupeMode::Full,
            false,
            IdentityScope::NameOnly,
        )
        .unwrap();

    assert_eq!(catalog.record_count(), 1);
    assert_eq!(catalog.statistics().total_records, 1);
    let bucket = catalog.bucket("11111111").unwrap();
    assert_eq!(bucket[0].name, "a.bin");
}

#[test]
fn game_dedupe_only_applies_under_machine_scheme() {
    let mut catalog = Catalog::new();
    for _ in 0..2 {
        catalog.add(
            "Some Game",
            rom("Some Game", "a.bin")
                .with_size(10)
                .with_hash(HashKind::Crc32, "11111111"),
        );
    }

    // Game dedupe under a hash scheme keeps both records
    catalog
        .rebucket(
            BucketScheme::Crc32,
            DedupeMode::Game,
            false,
            IdentityScope::NameOnly,
        )
        .unwrap();
    assert_eq!(catalog.record_count(), 2);

    // The same mode under the machine scheme merges them
    catalog
        .rebucket(
            BucketScheme::Machine,
            DedupeMode::Game,
            false,
            IdentityScope::NameOnly,
        )
        .unwrap();
    assert_eq!(catalog.record_count(), 1);
}

#[test]
fn dedupe_run_retains_middle_records_hash() {
    let mut catalog = Catalog::new();
    let base = rom("Some Game", "a.bin")
        .with_size(10)
        .with_hash(HashKind::Crc32, "11111111");
    catalog.add("Some Game", base.clone());
    catalog.add(
        "Some Game",
        base.clone()
            .with_hash(HashKind::Md5, "d41d8cd98f00b204e9800998ecf8427e"),
    );
    catalog.add("Some Game", base);

    catalog
        .rebucket(
            BucketScheme::Crc32,
            DedupeMode::Full,
            false,
            IdentityScope::NameOnly,
        )
        .unwrap();

    assert_eq!(catalog.record_count(), 1);
    let survivor = &catalog.bucket("11111111").unwrap()[0];
    assert_eq!(
        survivor.hashes.get(HashKind::Md5),
        Some("d41d8cd98f00b204e9800998ecf8427e")
    );
    // Hash-presence counters must reflect the merged record, not the run
    assert_eq!(catalog.statistics().with_md5, 1);
    assert_stats_consistent(&catalog);
}

#[test]
fn get_duplicates_honors_cross_hash_coverage() {
    let mut catalog = Catalog::new();
    // Same size, no shared hash kind: duplicates via the size fallback
    catalog.add(
        "Game A",
        rom("Game A", "a.bin")
            .with_size(64)
            .with_hash(HashKind::Crc32, "abc12300"),
    );
    catalog.add(
        "Game B",
        rom("Game B", "b.bin")
            .with_size(64)
            .with_hash(HashKind::Sha1, "def4560000000000000000000000000000000000"),
    );

    let probe = rom("Game A", "a.bin")
        .with_size(64)
        .with_hash(HashKind::Crc32, "abc12300");
    let dupes = catalog.get_duplicates(&probe, false, false).unwrap();
    // Both land in the probe's bucket only if they key the same under the
    // uniform scheme; the SHA1-only record keys by its own digest, so the
    // size fallback never even gets to compare them here.
    assert_eq!(dupes.len(), 1);
    assert_eq!(dupes[0].name, "a.bin");
}

#[test]
fn get_duplicates_matches_on_shared_crc_with_superset_hashes() {
    let mut catalog = Catalog::new();
    catalog.add(
        "Game A",
        rom("Game A", "a.bin").with_hash(HashKind::Crc32, "abc12300"),
    );
    catalog.add(
        "Game B",
        rom("Game B", "b.bin")
            .with_hash(HashKind::Crc32, "abc12300")
            .with_hash(HashKind::Sha1, "def4560000000000000000000000000000000000"),
    );

    let probe = rom("Game A", "a.bin").with_hash(HashKind::Crc32, "abc12300");
    let dupes = catalog.get_duplicates(&probe, false, false).unwrap();
    assert_eq!(dupes.len(), 2);
}

#[test]
fn get_duplicates_remove_matches_stages_removal() {
    let mut catalog = Catalog::new();
    catalog.add(
        "Game A",
        rom("Game A", "a.bin").with_hash(HashKind::Crc32, "abc12300"),
    );
    catalog.add(
        "Game B",
        rom("Game B", "b.bin")
            .with_hash(HashKind::Crc32, "abc12300")
            .with_hash(HashKind::Sha1, "def4560000000000000000000000000000000000"),
    );
    catalog.add(
        "Game C",
        rom("Game C", "c.bin").with_hash(HashKind::Crc32, "ffffffff"),
    );

    let probe = rom("Game A", "a.bin").with_hash(HashKind::Crc32, "abc12300");
    let matches = catalog.get_duplicates(&probe, true, false).unwrap();
    assert_eq!(matches.len(), 2);
    assert!(matches.iter().all(|r| r.marked_for_removal));

    // Matches relocated to the bucket front, still present until compaction
    let bucket = catalog.bucket("abc12300").unwrap();
    assert!(bucket[0].marked_for_removal);
    assert_eq!(catalog.statistics().total_records, 3);

    assert_eq!(catalog.clear_marked(), 2);
    assert_eq!(catalog.statistics().total_records, 1);
    assert_stats_consistent(&catalog);
}

#[test]
fn has_duplicates_is_read_only() {
    let mut catalog = Catalog::new();
    catalog.add(
        "Game A",
        rom("Game A", "a.bin").with_hash(HashKind::Crc32, "abc12300"),
    );
    catalog
        .rebucket(
            BucketScheme::Crc32,
            DedupeMode::None,
            false,
            IdentityScope::NameOnly,
        )
        .unwrap();

    let probe = rom("Game X", "x.bin").with_hash(HashKind::Crc32, "abc12300");
    assert!(catalog.has_duplicates(&probe).unwrap());

    let miss = rom("Game X", "x.bin").with_hash(HashKind::Crc32, "00ff00ff");
    assert!(!catalog.has_duplicates(&miss).unwrap());
    assert_eq!(catalog.statistics().total_records, 1);
}

#[test]
fn default_scheme_resolves_through_uniform_hash() {
    let mut catalog = Catalog::new();
    // Every content record has SHA1; only one has SHA256
    catalog.add(
        "Game A",
        rom("Game A", "a.bin")
            .with_hash(HashKind::Sha1, "aaaa000000000000000000000000000000000000")
            .with_hash(HashKind::Sha256, "11"),
    );
    catalog.add(
        "Game B",
        rom("Game B", "b.bin")
            .with_hash(HashKind::Sha1, "bbbb000000000000000000000000000000000000"),
    );

    assert_eq!(catalog.stats().strongest_uniform_hash(), HashKind::Sha1);

    catalog
        .rebucket(
            BucketScheme::Default,
            DedupeMode::None,
            false,
            IdentityScope::NameOnly,
        )
        .unwrap();
    assert_eq!(catalog.scheme(), Some(BucketScheme::Sha1));
    assert!(catalog
        .bucket("aaaa000000000000000000000000000000000000")
        .is_some());
}

#[test]
fn rebucket_rejects_machineless_record_and_leaves_catalog_intact() {
    let mut catalog = Catalog::new();
    catalog.add(
        "loose",
        Record::new(RecordKind::Rom, "stray.bin").with_hash(HashKind::Crc32, "12345678"),
    );

    let err = catalog
        .rebucket(
            BucketScheme::Machine,
            DedupeMode::None,
            false,
            IdentityScope::NameOnly,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        datsmith_catalog::CatalogError::MissingMachine { .. }
    ));

    // The failed pass must not have torn the catalog down
    assert_eq!(catalog.record_count(), 1);
    assert!(catalog.bucket("loose").is_some());
    assert_stats_consistent(&catalog);
}

#[test]
fn nodump_records_never_merge_with_dumped_ones() {
    let mut catalog = Catalog::new();
    catalog.add(
        "Game A",
        rom("Game A", "a.bin")
            .with_size(10)
            .with_hash(HashKind::Crc32, "11111111"),
    );
    catalog.add(
        "Game A",
        rom("Game A", "a.bin")
            .with_size(10)
            .with_hash(HashKind::Crc32, "11111111")
            .with_status(DumpStatus::Nodump),
    );

    catalog
        .rebucket(
            BucketScheme::Crc32,
            DedupeMode::Full,
            false,
            IdentityScope::NameOnly,
        )
        .unwrap();

    assert_eq!(catalog.record_count(), 2);
    assert_stats_consistent(&catalog);
}

#[test]
fn machine_and_source_scope_separates_source_files() {
    let mut catalog = Catalog::new();
    catalog.add(
        "Same Game",
        rom("Same Game", "a.bin")
            .with_hash(HashKind::Crc32, "11111111")
            .with_source(Source::new("first.dat", 0)),
    );
    catalog.add(
        "Same Game",
        rom("Same Game", "a.bin")
            .with_hash(HashKind::Crc32, "11111111")
            .with_source(Source::new("second.dat", 1)),
    );

    catalog
        .rebucket(
            BucketScheme::Machine,
            DedupeMode::None,
            false,
            IdentityScope::MachineAndSource,
        )
        .unwrap();
    assert_eq!(catalog.bucket_count(), 2);
    assert!(catalog.bucket("0000000000-Same Game").is_some());
    assert!(catalog.bucket("0000000001-Same Game").is_some());

    // Dropping back to name-only identity folds them together again
    catalog
        .rebucket(
            BucketScheme::Machine,
            DedupeMode::None,
            false,
            IdentityScope::NameOnly,
        )
        .unwrap();
    assert_eq!(catalog.bucket_count(), 1);
    assert_eq!(catalog.bucket("Same Game").unwrap().len(), 2);
}

#[test]
fn recalculate_stats_repairs_drift() {
    let mut catalog = seed_catalog();
    // Simulate drift: double-merge someone else's aggregate into ours
    catalog.stats().merge(seed_catalog().stats());
    assert_ne!(
        catalog.statistics().total_records,
        catalog.record_count() as u64
    );

    catalog.recalculate_stats();
    assert_eq!(
        catalog.statistics().total_records,
        catalog.record_count() as u64
    );
    assert_stats_consistent(&catalog);
}

#[test]
fn buckets_stay_sorted_after_rebucket() {
    let mut catalog = Catalog::new();
    catalog.add("Game", rom("Game", "track 10.bin").with_hash(HashKind::Crc32, "0a0a0a0a"));
    catalog.add("Game", rom("Game", "track 2.bin").with_hash(HashKind::Crc32, "0b0b0b0b"));
    catalog.add("Game", rom("Game", "track 1.bin").with_hash(HashKind::Crc32, "0c0c0c0c"));

    catalog
        .rebucket(
            BucketScheme::Machine,
            DedupeMode::None,
            false,
            IdentityScope::NameOnly,
        )
        .unwrap();

    let names: Vec<&str> = catalog
        .bucket("Game")
        .unwrap()
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(names, vec!["track 1.bin", "track 2.bin", "track 10.bin"]);
}
