//! Category snapshot differencing
//!
//! Set reconciliation between two time-separated category listings.
//! Partitions:
//! - `added`: in the new snapshot, no exact (name, url) match in the old
//! - `removed`: in the old snapshot, no exact match in the new
//! - `full`: the symmetric difference by full-tuple equality, deduplicated
//!   first by URL and then by name
//!
//! Dedup always keeps the first record in input order, so output is
//! deterministic as long as callers do not reorder a snapshot between
//! load and diff.
//!
//! Count convention: `added` and `removed` report the raw partition size,
//! `full` reports the post-name-dedup size. The asymmetry is inherited
//! behavior that downstream notification texts quote verbatim; kept
//! as-is pending product confirmation (see DESIGN.md).

use super::{CategoryRecord, CategorySnapshot, EnrichedCategory};
use std::collections::{HashMap, HashSet};

/// The three views produced by one diff run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Added,
    Removed,
    Full,
}

impl Partition {
    /// Filename prefix for this partition's export artifact
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Partition::Added => "added_categories_",
            Partition::Removed => "removed_categories_",
            Partition::Full => "full_categories_",
        }
    }
}

/// One partition's rows: the raw reconciled records plus the deduplicated
/// display table with derived fields
#[derive(Debug, Clone)]
pub struct PartitionTable {
    partition: Partition,
    records: Vec<CategoryRecord>,
    unique: Vec<EnrichedCategory>,
}

impl PartitionTable {
    /// Which partition this table belongs to
    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// Raw reconciled records, in input order
    pub fn records(&self) -> &[CategoryRecord] {
        &self.records
    }

    /// Deduplicated display rows with derived search URL and type tag
    pub fn unique(&self) -> &[EnrichedCategory] {
        &self.unique
    }

    /// Row count quoted in notifications: raw for added/removed,
    /// post-name-dedup for full
    pub fn count(&self) -> usize {
        match self.partition {
            Partition::Added | Partition::Removed => self.records.len(),
            Partition::Full => self.unique.len(),
        }
    }

    /// Unique-by-name row count
    pub fn unique_count(&self) -> usize {
        self.unique.len()
    }
}

/// Result of diffing two snapshots
#[derive(Debug, Clone)]
pub struct SnapshotDiff {
    pub added: PartitionTable,
    pub removed: PartitionTable,
    pub full: PartitionTable,
}

/// Computes snapshot diffs. Stateless; every run is independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotDiffer;

impl SnapshotDiffer {
    pub fn new() -> Self {
        Self
    }

    /// Diff the old snapshot against the new one.
    ///
    /// Empty inputs degrade gracefully to empty or full-copy partitions;
    /// this never fails.
    pub fn diff(&self, old: &CategorySnapshot, new: &CategorySnapshot) -> SnapshotDiff {
        let old_set: HashSet<&CategoryRecord> = old.records.iter().collect();
        let new_set: HashSet<&CategoryRecord> = new.records.iter().collect();

        let added: Vec<CategoryRecord> = new
            .records
            .iter()
            .filter(|r| !old_set.contains(*r))
            .cloned()
            .collect();

        let removed: Vec<CategoryRecord> = old
            .records
            .iter()
            .filter(|r| !new_set.contains(*r))
            .cloned()
            .collect();

        // Symmetric difference over the combined multiset: keep tuples that
        // appear exactly once across both snapshots, old rows first.
        let mut occurrences: HashMap<&CategoryRecord, usize> = HashMap::new();
        for record in old.records.iter().chain(new.records.iter()) {
            *occurrences.entry(record).or_insert(0) += 1;
        }
        let full: Vec<CategoryRecord> = old
            .records
            .iter()
            .chain(new.records.iter())
            .filter(|r| occurrences.get(*r) == Some(&1))
            .cloned()
            .collect();

        SnapshotDiff {
            added: Self::table(Partition::Added, added),
            removed: Self::table(Partition::Removed, removed),
            full: Self::table(Partition::Full, full),
        }
    }

    fn table(partition: Partition, records: Vec<CategoryRecord>) -> PartitionTable {
        let deduped = match partition {
            // Display tables for added/removed collapse to one row per name.
            Partition::Added | Partition::Removed => dedup_by(&records, |r| r.name.clone()),
            // The full view collapses by URL first, then by name.
            Partition::Full => {
                let by_url = dedup_by(&records, |r| r.url.clone());
                dedup_by(&by_url, |r| r.name.clone())
            }
        };

        let unique = deduped.iter().map(EnrichedCategory::from).collect();

        PartitionTable {
            partition,
            records,
            unique,
        }
    }
}

/// Keep the first record per key, preserving input order
fn dedup_by<K: std::hash::Hash + Eq>(
    records: &[CategoryRecord],
    key: impl Fn(&CategoryRecord) -> K,
) -> Vec<CategoryRecord> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(key(r)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SnapshotRank;

    /// Build an (old, new) snapshot pair: `len_new - diff_count` records of
    /// the new listing are shared with the old one, the rest are fresh.
    fn make_snapshots(len_old: usize, len_new: usize, diff_count: usize) -> (CategorySnapshot, CategorySnapshot) {
        let mut counter = 0usize;
        let mut fresh = || {
            counter += 1;
            CategoryRecord::new(
                format!("Категория {}", counter),
                format!("https://www.wildberries.ru/catalog/cat-{}", counter),
            )
        };

        let old: Vec<CategoryRecord> = (0..len_old).map(|_| fresh()).collect();
        let mut new: Vec<CategoryRecord> = old
            .iter()
            .take(len_new.saturating_sub(diff_count))
            .cloned()
            .collect();
        while new.len() < len_new {
            new.push(fresh());
        }

        (
            CategorySnapshot::new(SnapshotRank::Previous, old),
            CategorySnapshot::new(SnapshotRank::Latest, new),
        )
    }

    fn record(name: &str, url: &str) -> CategoryRecord {
        CategoryRecord::new(name, url)
    }

    #[test]
    fn test_added_counts() {
        for (len_old, len_new, diff, expected) in [
            (1, 2, 1, 1),
            (1, 2, 2, 2),
            (10, 10, 0, 0),
            (10, 5, 5, 5),
            (10, 5, 0, 0),
            (10, 15, 8, 8),
        ] {
            let (old, new) = make_snapshots(len_old, len_new, diff);
            let result = SnapshotDiffer::new().diff(&old, &new);
            assert_eq!(result.added.count(), expected, "({}, {}, {})", len_old, len_new, diff);
        }
    }

    #[test]
    fn test_removed_counts() {
        for (len_old, len_new, diff, expected) in [
            (1, 2, 1, 0),
            (1, 2, 2, 1),
            (10, 10, 0, 0),
            (10, 5, 5, 10),
            (10, 5, 0, 5),
            (10, 15, 8, 3),
        ] {
            let (old, new) = make_snapshots(len_old, len_new, diff);
            let result = SnapshotDiffer::new().diff(&old, &new);
            assert_eq!(result.removed.count(), expected, "({}, {}, {})", len_old, len_new, diff);
        }
    }

    #[test]
    fn test_full_counts() {
        for (len_old, len_new, diff, expected) in [
            (1, 2, 1, 1),
            (1, 2, 2, 3),
            (10, 10, 0, 0),
            (10, 5, 5, 15),
            (10, 5, 0, 5),
            (10, 15, 8, 11),
        ] {
            let (old, new) = make_snapshots(len_old, len_new, diff);
            let result = SnapshotDiffer::new().diff(&old, &new);
            assert_eq!(result.full.count(), expected, "({}, {}, {})", len_old, len_new, diff);
        }
    }

    #[test]
    fn test_shared_record_is_excluded_from_every_partition() {
        let old = CategorySnapshot::new(SnapshotRank::Previous, vec![record("A", "u1")]);
        let new = CategorySnapshot::new(
            SnapshotRank::Latest,
            vec![record("A", "u1"), record("B", "u2")],
        );

        let result = SnapshotDiffer::new().diff(&old, &new);
        assert_eq!(result.added.count(), 1);
        assert_eq!(result.added.records()[0].name, "B");
        assert_eq!(result.removed.count(), 0);
        assert_eq!(result.full.count(), 1);
        assert_eq!(result.full.unique()[0].name, "B");
    }

    #[test]
    fn test_identical_snapshots_diff_to_nothing() {
        let (old, new) = make_snapshots(10, 10, 0);
        let result = SnapshotDiffer::new().diff(&old, &new);
        assert_eq!(result.added.count(), 0);
        assert_eq!(result.removed.count(), 0);
        assert_eq!(result.full.count(), 0);
    }

    #[test]
    fn test_empty_snapshots_degrade_gracefully() {
        let empty = CategorySnapshot::new(SnapshotRank::Previous, vec![]);
        let new = CategorySnapshot::new(
            SnapshotRank::Latest,
            vec![record("A", "u1"), record("B", "u2")],
        );

        let result = SnapshotDiffer::new().diff(&empty, &new);
        assert_eq!(result.added.count(), 2);
        assert_eq!(result.removed.count(), 0);
        assert_eq!(result.full.count(), 2);

        let both_empty = SnapshotDiffer::new().diff(
            &CategorySnapshot::new(SnapshotRank::Previous, vec![]),
            &CategorySnapshot::new(SnapshotRank::Latest, vec![]),
        );
        assert_eq!(both_empty.full.count(), 0);
    }

    #[test]
    fn test_added_and_removed_are_subsets_of_full_records() {
        let (old, new) = make_snapshots(10, 15, 8);
        let result = SnapshotDiffer::new().diff(&old, &new);

        let full: std::collections::HashSet<&CategoryRecord> =
            result.full.records().iter().collect();
        for r in result.added.records().iter().chain(result.removed.records()) {
            assert!(full.contains(r));
        }
    }

    #[test]
    fn test_random_snapshots_partition_consistently() {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..50 {
            let len_old = rng.gen_range(0..30);
            let len_new = rng.gen_range(0..30);
            let diff_count = if len_new == 0 { 0 } else { rng.gen_range(0..=len_new) };
            let (old, new) = make_snapshots(len_old, len_new, diff_count);

            let result = SnapshotDiffer::new().diff(&old, &new);
            let old_set: std::collections::HashSet<_> = old.records.iter().collect();
            let new_set: std::collections::HashSet<_> = new.records.iter().collect();

            // Every old record missing from new is removed, and vice versa
            for r in &old.records {
                assert_eq!(
                    result.removed.records().contains(r),
                    !new_set.contains(r)
                );
            }
            for r in &new.records {
                assert_eq!(result.added.records().contains(r), !old_set.contains(r));
            }
        }
    }

    #[test]
    fn test_diff_is_idempotent() {
        let (old, new) = make_snapshots(10, 15, 8);
        let differ = SnapshotDiffer::new();
        let first = differ.diff(&old, &new);
        let second = differ.diff(&old, &new);

        assert_eq!(first.added.records(), second.added.records());
        assert_eq!(first.removed.records(), second.removed.records());
        assert_eq!(first.full.unique(), second.full.unique());
    }

    #[test]
    fn test_name_dedup_keeps_first_occurrence() {
        let old = CategorySnapshot::new(SnapshotRank::Previous, vec![]);
        let new = CategorySnapshot::new(
            SnapshotRank::Latest,
            vec![record("Кигуруми", "u1"), record("Кигуруми", "u2")],
        );

        let result = SnapshotDiffer::new().diff(&old, &new);
        // Raw count keeps both rows; the display table collapses by name.
        assert_eq!(result.added.count(), 2);
        assert_eq!(result.added.unique_count(), 1);
        assert_eq!(result.added.unique()[0].url, "u1");
    }

    #[test]
    fn test_full_dedups_by_url_then_name() {
        let old = CategorySnapshot::new(
            SnapshotRank::Previous,
            vec![record("A", "shared-url"), record("C", "u3")],
        );
        let new = CategorySnapshot::new(
            SnapshotRank::Latest,
            vec![record("B", "shared-url"), record("C", "u4")],
        );

        let result = SnapshotDiffer::new().diff(&old, &new);
        // All four tuples are unique, so the raw symmetric difference keeps
        // them all; URL dedup then keeps "A" over "B", name dedup keeps the
        // first "C".
        assert_eq!(result.full.records().len(), 4);
        let names: Vec<&str> = result.full.unique().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(result.full.count(), 2);
    }
}
