//! End-to-end indexing through [`Indexer`] against an in-memory store.
//!
//! Covers what each codec call observes (cleanup, then put) for single puts
//! and batches, back-in-time coverage with hand-built updates, and the same
//! scenarios through the covered-column codec with time-ranged index reads.

use std::collections::VecDeque;
use std::sync::Arc;

use coveridx_core::{
    CodecRegistry, ColumnGroup, ColumnGroupConfig, ColumnTracker, CoveredColumn,
    CoveredColumnConfig, CoveredColumnIndexCodec, FailurePolicy, IndexBuilder, IndexCodec,
    IndexOperation, IndexUpdate, Indexer, IndexerConfig, LocalTableState,
};
use coveridx_error::Result;
use coveridx_store::MemStore;
use coveridx_types::{Cell, ColumnReference, FixedClock, Mutation, TimeRange, Timestamp};
use parking_lot::Mutex;

const PRIMARY: &str = "primary";
const INDEX: &str = "index_by_value";
const ROW: &str = "row";
const FAMILY: &str = "FAM";
const QUAL: &str = "qual";
const TS: Timestamp = 1_700_000_000_000;

// ─── Helpers ───────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

type Verifier = Box<dyn Fn(&LocalTableState<'_>) + Send>;

/// Checks the row state handed to each codec call and replays queued
/// upserts, each exactly once.
#[derive(Default)]
struct VerifyingCodec {
    verifiers: Mutex<VecDeque<Verifier>>,
    upserts: Mutex<Vec<IndexUpdate>>,
}

impl std::fmt::Debug for VerifyingCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyingCodec")
            .field("pending_verifiers", &self.verifiers.lock().len())
            .finish_non_exhaustive()
    }
}

impl VerifyingCodec {
    fn expect_state(&self, case: &'static str, expected: Vec<Cell>, columns: Vec<ColumnReference>) {
        self.verifiers.lock().push_back(Box::new(move |state: &LocalTableState<'_>| {
            let seen: Vec<Cell> = state
                .non_indexed_columns_state(&columns)
                .unwrap_or_else(|err| panic!("case={case} reading table state: {err}"))
                .collect();
            assert_eq!(seen, expected, "case={case} unexpected table state");
        }));
    }

    fn queue_upserts(&self, updates: impl IntoIterator<Item = IndexUpdate>) {
        self.upserts.lock().extend(updates);
    }

    fn remaining_verifiers(&self) -> usize {
        self.verifiers.lock().len()
    }

    fn verify(&self, state: &LocalTableState<'_>) {
        let verifier = self.verifiers.lock().pop_front();
        if let Some(verifier) = verifier {
            verifier(state);
        }
    }
}

impl IndexCodec for VerifyingCodec {
    fn name(&self) -> &str {
        "verifying"
    }

    fn index_deletes(&self, state: &mut LocalTableState<'_>) -> Result<Vec<IndexUpdate>> {
        self.verify(state);
        Ok(Vec::new())
    }

    fn index_upserts(&self, state: &mut LocalTableState<'_>) -> Result<Vec<IndexUpdate>> {
        self.verify(state);
        Ok(std::mem::take(&mut *self.upserts.lock()))
    }
}

fn verifying_indexer(store_clock: Timestamp) -> (Indexer, Arc<VerifyingCodec>) {
    let codec = Arc::new(VerifyingCodec::default());
    let mut registry = CodecRegistry::with_builtins();
    let handle = Arc::clone(&codec);
    registry
        .register("verifying", move |_: &IndexerConfig| -> Result<Arc<dyn IndexCodec>> {
            Ok(handle.clone() as Arc<dyn IndexCodec>)
        })
        .unwrap();
    let indexer = Indexer::open(
        PRIMARY,
        IndexerConfig::with_codec("verifying"),
        &registry,
        Arc::new(FixedClock(store_clock)),
    )
    .unwrap();
    (indexer, codec)
}

fn covered_indexer(columns: Vec<CoveredColumnConfig>, policy: FailurePolicy) -> Indexer {
    let config = IndexerConfig::default()
        .with_failure_policy(policy)
        .with_group(ColumnGroupConfig::new(INDEX, columns));
    Indexer::open(PRIMARY, config, &CodecRegistry::with_builtins(), Arc::new(FixedClock(TS))).unwrap()
}

fn put(ts: Timestamp, value: &str) -> Mutation {
    Mutation::new(ROW).put(FAMILY, QUAL, ts, value)
}

fn put_cell(ts: Timestamp, value: &str) -> Cell {
    Cell::put(ROW, FAMILY, QUAL, ts, value)
}

fn family_ref() -> ColumnReference {
    ColumnReference::family_wide(FAMILY)
}

/// Covered index key for single-column groups.
fn single_key(value: &str, row: &str) -> Vec<u8> {
    let mut key = value.as_bytes().to_vec();
    key.extend_from_slice(row.as_bytes());
    key.extend_from_slice(&u32::try_from(value.len()).unwrap().to_be_bytes());
    key.extend_from_slice(&1u32.to_be_bytes());
    key
}

fn index_rows_at(store: &MemStore, range: TimeRange) -> Vec<Vec<u8>> {
    store
        .scan(INDEX, range)
        .unwrap()
        .into_iter()
        .map(|(row, _)| row)
        .collect()
}

fn two_column_indexer() -> Indexer {
    covered_indexer(
        vec![CoveredColumnConfig::new("f", "a"), CoveredColumnConfig::new("f", "b")],
        FailurePolicy::AbortBatch,
    )
}

fn write(indexer: &Indexer, store: &MemStore, mutation: Mutation) {
    indexer.write_batch(store, &mut [mutation]).unwrap();
}

/// Decoded column values of every index entry visible at `at`.
fn group_values_at(indexer: &Indexer, store: &MemStore, at: Timestamp) -> Vec<Vec<Vec<u8>>> {
    let config = &indexer.config().groups[0];
    let group = ColumnGroup::new(
        config.table.clone(),
        config
            .columns
            .iter()
            .map(|column| CoveredColumn::new(column.reference(), column.required)),
    );
    index_rows_at(store, TimeRange::as_of(at))
        .iter()
        .map(|key| group.decompose_row_key(key).unwrap().values)
        .collect()
}

fn entry(a: &str, b: &str) -> Vec<Vec<u8>> {
    vec![a.as_bytes().to_vec(), b.as_bytes().to_vec()]
}

// ─── Row state seen by the codec ───────────────────────────────────────

#[test]
fn single_puts_show_accumulating_row_state() {
    init_tracing();
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let (indexer, codec) = verifying_indexer(TS);

    codec.expect_state("cleanup state 1", Vec::new(), vec![family_ref()]);
    codec.expect_state("put state 1", vec![put_cell(TS, "v1")], vec![family_ref()]);
    indexer.write_batch(&store, &mut [put(TS, "v1")]).unwrap();
    assert_eq!(codec.remaining_verifiers(), 0);

    codec.expect_state("cleanup state 2", vec![put_cell(TS, "v1")], vec![family_ref()]);
    codec.expect_state(
        "put state 2",
        vec![put_cell(TS + 1, "v2"), put_cell(TS, "v1")],
        vec![family_ref()],
    );
    indexer.write_batch(&store, &mut [put(TS + 1, "v2")]).unwrap();
    assert_eq!(codec.remaining_verifiers(), 0);
}

#[test]
fn batch_members_see_independent_row_state() {
    init_tracing();
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let (indexer, codec) = verifying_indexer(TS);

    codec.expect_state("cleanup state 1", Vec::new(), vec![family_ref()]);
    codec.expect_state("put state 1", vec![put_cell(TS, "v1")], vec![family_ref()]);
    // The second mutation does not see the first one.
    codec.expect_state("cleanup state 2", Vec::new(), vec![family_ref()]);
    codec.expect_state("put state 2", vec![put_cell(TS + 1, "v2")], vec![family_ref()]);

    let report = indexer
        .write_batch(&store, &mut [put(TS, "v1"), put(TS + 1, "v2")])
        .unwrap();
    assert_eq!(report.applied, 2);
    assert_eq!(codec.remaining_verifiers(), 0);
    assert_eq!(store.raw_cells(PRIMARY, ROW.as_bytes()).unwrap().len(), 2);
}

#[test]
fn latest_timestamp_is_stamped_before_the_codec_runs() {
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let (indexer, codec) = verifying_indexer(TS + 7);

    codec.expect_state("cleanup", Vec::new(), vec![family_ref()]);
    codec.expect_state("put", vec![put_cell(TS + 7, "v")], vec![family_ref()]);
    indexer
        .write_batch(&store, &mut [put(coveridx_types::LATEST_TIMESTAMP, "v")])
        .unwrap();
    assert_eq!(codec.remaining_verifiers(), 0);
}

// ─── Back-in-time coverage with hand-built updates ─────────────────────

#[test]
fn back_in_time_put_is_covered_at_next_newer_timestamp() {
    init_tracing();
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let (indexer, codec) = verifying_indexer(TS);

    // The index row mirrors the primary cell: keyed by value, holding the row.
    let tracker = ColumnTracker::new([family_ref()]);
    let entry_v1 = Mutation::new("v1").put(FAMILY, QUAL, TS, ROW);
    codec.queue_upserts([IndexUpdate::new(INDEX, entry_v1, tracker.clone())]);
    indexer.write_batch(&store, &mut [put(TS, "v1")]).unwrap();

    let current = store.get(INDEX, b"v1", TimeRange::all()).unwrap();
    assert_eq!(current, vec![Cell::put("v1", FAMILY, QUAL, TS, ROW)]);

    // Two ticks back: the new entry has to stop being visible at TS.
    let past = TS - 2;
    let mut covered = tracker;
    covered.set_ts(TS);
    let entry_v0 = Mutation::new("v0").put(FAMILY, QUAL, past, ROW);
    codec.queue_upserts([IndexUpdate::new(INDEX, entry_v0, covered)]);
    let report = indexer.write_batch(&store, &mut [put(past, "v0")]).unwrap();
    assert_eq!(report.index_updates, 2, "case=put plus compensating delete");

    let before_boundary = TimeRange::new(past - 1, TS - 1).unwrap();
    assert_eq!(
        store.get(INDEX, b"v0", before_boundary).unwrap(),
        vec![Cell::put("v0", FAMILY, QUAL, past, ROW)]
    );
    assert!(
        store.get(INDEX, b"v0", TimeRange::as_of(TS)).unwrap().is_empty(),
        "case=entry must be covered from the newer timestamp on"
    );
    assert_eq!(indexer.metrics().snapshot().back_in_time_corrections, 1);
}

// ─── Covered-column codec ──────────────────────────────────────────────

#[test]
fn forward_append_writes_one_entry() {
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let indexer = covered_indexer(vec![CoveredColumnConfig::new(FAMILY, QUAL)], FailurePolicy::AbortBatch);
    let report = indexer.write_batch(&store, &mut [put(100, "v1")]).unwrap();
    assert_eq!(report.index_updates, 1);

    let snapshot = indexer.metrics().snapshot();
    assert_eq!(snapshot.index_puts, 1);
    assert_eq!(snapshot.index_deletes, 0);
    assert_eq!(index_rows_at(&store, TimeRange::all()), vec![single_key("v1", ROW)]);
}

#[test]
fn overwrites_move_the_entry_forward_in_time() {
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let indexer = covered_indexer(vec![CoveredColumnConfig::new(FAMILY, QUAL)], FailurePolicy::AbortBatch);
    indexer.write_batch(&store, &mut [put(100, "v1")]).unwrap();
    indexer.write_batch(&store, &mut [put(101, "v2")]).unwrap();

    assert_eq!(index_rows_at(&store, TimeRange::as_of(100)), vec![single_key("v1", ROW)]);
    assert_eq!(index_rows_at(&store, TimeRange::as_of(101)), vec![single_key("v2", ROW)]);
}

#[test]
fn back_in_time_put_keeps_history_exact() {
    init_tracing();
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let indexer = covered_indexer(vec![CoveredColumnConfig::new(FAMILY, QUAL)], FailurePolicy::AbortBatch);
    indexer.write_batch(&store, &mut [put(100, "v1")]).unwrap();

    let codec = CoveredColumnIndexCodec::from_config(indexer.config()).unwrap();
    let derived = IndexBuilder::new(Arc::new(codec))
        .index_updates(&store, PRIMARY, &put(98, "v0"))
        .unwrap();
    let upsert = derived
        .updates
        .iter()
        .find(|update| update.operation() == IndexOperation::Put && update.timestamp() == Some(98))
        .unwrap();
    assert_eq!(upsert.row(), single_key("v0", ROW).as_slice());
    assert_eq!(upsert.tracker().ts(), 100, "case=boundary is the next newer cell");

    indexer.write_batch(&store, &mut [put(98, "v0")]).unwrap();

    let window = TimeRange::new(97, 100).unwrap();
    assert_eq!(index_rows_at(&store, window), vec![single_key("v0", ROW)]);
    assert_eq!(index_rows_at(&store, TimeRange::as_of(99)), vec![single_key("v0", ROW)]);
    assert_eq!(index_rows_at(&store, TimeRange::as_of(100)), vec![single_key("v1", ROW)]);
    assert!(index_rows_at(&store, TimeRange::as_of(97)).is_empty());

    let snapshot = indexer.metrics().snapshot();
    assert_eq!(snapshot.back_in_time_corrections, 1);
    assert_eq!(snapshot.roll_forward_steps, 1);
}

#[test]
fn back_in_time_put_between_versions() {
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let indexer = covered_indexer(vec![CoveredColumnConfig::new(FAMILY, QUAL)], FailurePolicy::AbortBatch);
    indexer.write_batch(&store, &mut [put(100, "v1")]).unwrap();
    indexer.write_batch(&store, &mut [put(110, "v3")]).unwrap();
    indexer.write_batch(&store, &mut [put(105, "v2")]).unwrap();

    for (at, expected) in [(100, "v1"), (104, "v1"), (105, "v2"), (109, "v2"), (110, "v3"), (200, "v3")] {
        assert_eq!(
            index_rows_at(&store, TimeRange::as_of(at)),
            vec![single_key(expected, ROW)],
            "case=as of {at}"
        );
    }
}

#[test]
fn back_in_time_change_to_second_column_rewrites_later_entries() {
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let indexer = two_column_indexer();
    write(&indexer, &store, Mutation::new(ROW).put("f", "b", 90, "B0"));
    write(&indexer, &store, Mutation::new(ROW).put("f", "a", 100, "A1"));
    write(&indexer, &store, Mutation::new(ROW).put("f", "b", 95, "B1"));

    assert_eq!(group_values_at(&indexer, &store, 92), vec![entry("", "B0")]);
    assert_eq!(group_values_at(&indexer, &store, 96), vec![entry("", "B1")]);
    assert_eq!(
        group_values_at(&indexer, &store, 100),
        vec![entry("A1", "B1")],
        "case=stale A1/B0 entry removed"
    );
}

#[test]
fn back_in_time_column_delete_rewrites_later_entries() {
    init_tracing();
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let indexer = two_column_indexer();
    write(&indexer, &store, Mutation::new(ROW).put("f", "b", 90, "B0"));
    write(&indexer, &store, Mutation::new(ROW).put("f", "a", 100, "A1"));
    indexer.metrics().reset();
    write(&indexer, &store, Mutation::new(ROW).delete_column("f", "b", 95));

    assert_eq!(
        store.get(PRIMARY, ROW.as_bytes(), TimeRange::as_of(100)).unwrap(),
        vec![Cell::put(ROW, "f", "a", 100, "A1")]
    );
    assert_eq!(group_values_at(&indexer, &store, 92), vec![entry("", "B0")]);
    assert!(group_values_at(&indexer, &store, 96).is_empty(), "case=B0 deleted at 95");
    assert_eq!(
        group_values_at(&indexer, &store, 100),
        vec![entry("A1", "")],
        "case=entry at 100 no longer carries B0"
    );

    let snapshot = indexer.metrics().snapshot();
    assert_eq!(snapshot.roll_forward_steps, 1);
    assert_eq!(snapshot.back_in_time_corrections, 0);
}

#[test]
fn back_in_time_family_delete_walks_every_boundary() {
    init_tracing();
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let indexer = two_column_indexer();
    write(&indexer, &store, Mutation::new(ROW).put("f", "b", 90, "B0"));
    write(&indexer, &store, Mutation::new(ROW).put("f", "a", 100, "A1"));
    write(&indexer, &store, Mutation::new(ROW).put("f", "b", 110, "B2"));
    indexer.metrics().reset();
    write(&indexer, &store, Mutation::new(ROW).delete_family("f", 95));

    assert_eq!(group_values_at(&indexer, &store, 92), vec![entry("", "B0")]);
    assert!(group_values_at(&indexer, &store, 96).is_empty());
    assert_eq!(group_values_at(&indexer, &store, 100), vec![entry("A1", "")]);
    assert_eq!(group_values_at(&indexer, &store, 109), vec![entry("A1", "")]);
    assert_eq!(
        group_values_at(&indexer, &store, 110),
        vec![entry("A1", "B2")],
        "case=cells newer than the delete are untouched"
    );

    let snapshot = indexer.metrics().snapshot();
    assert_eq!(snapshot.roll_forward_steps, 2);
    assert_eq!(snapshot.back_in_time_corrections, 1);
}

#[test]
fn family_wide_group_indexes_any_qualifier() {
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let indexer = covered_indexer(vec![CoveredColumnConfig::family_wide(FAMILY)], FailurePolicy::AbortBatch);
    indexer
        .write_batch(&store, &mut [Mutation::new(ROW).put(FAMILY, "anything", 5, "x")])
        .unwrap();
    indexer
        .write_batch(&store, &mut [Mutation::new(ROW).put("OTHER", QUAL, 6, "ignored")])
        .unwrap();
    assert_eq!(index_rows_at(&store, TimeRange::all()), vec![single_key("x", ROW)]);
    assert_eq!(indexer.metrics().snapshot().index_puts, 1, "case=other family not indexed");
}

#[test]
fn deleting_the_column_removes_the_entry() {
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let indexer = covered_indexer(vec![CoveredColumnConfig::new(FAMILY, QUAL)], FailurePolicy::AbortBatch);
    indexer.write_batch(&store, &mut [put(10, "v")]).unwrap();
    indexer
        .write_batch(&store, &mut [Mutation::new(ROW).delete_column(FAMILY, QUAL, 20)])
        .unwrap();
    assert_eq!(index_rows_at(&store, TimeRange::as_of(19)), vec![single_key("v", ROW)]);
    assert!(index_rows_at(&store, TimeRange::as_of(20)).is_empty());
}

#[test]
fn mutation_with_several_timestamps_is_indexed_in_order() {
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let indexer = covered_indexer(vec![CoveredColumnConfig::new(FAMILY, QUAL)], FailurePolicy::AbortBatch);
    let mutation = Mutation::new(ROW)
        .put(FAMILY, QUAL, 30, "late")
        .put(FAMILY, QUAL, 10, "early");
    indexer.write_batch(&store, &mut [mutation]).unwrap();
    assert_eq!(index_rows_at(&store, TimeRange::as_of(15)), vec![single_key("early", ROW)]);
    assert_eq!(index_rows_at(&store, TimeRange::as_of(30)), vec![single_key("late", ROW)]);
}

// ─── Failures ──────────────────────────────────────────────────────────

#[test]
fn read_failure_aborts_batch_and_writes_nothing() {
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let indexer = covered_indexer(vec![CoveredColumnConfig::new(FAMILY, QUAL)], FailurePolicy::AbortBatch);
    store.fail_reads(PRIMARY, true);
    let err = indexer.write_batch(&store, &mut [put(1, "v")]).unwrap_err();
    assert!(err.is_store_read());
    store.fail_reads(PRIMARY, false);
    assert_eq!(store.cell_count(PRIMARY), 0);
    assert_eq!(store.cell_count(INDEX), 0);
}

#[test]
fn encoding_failure_refuses_only_that_mutation() {
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let indexer = covered_indexer(
        vec![CoveredColumnConfig::new("f", "a").required(), CoveredColumnConfig::new("f", "b")],
        FailurePolicy::SkipMutation,
    );
    let mut batch = [
        Mutation::new("r1").put("f", "b", 1, "no a"),
        Mutation::new("r2").put("f", "a", 1, "A").put("f", "b", 1, "B"),
    ];
    let report = indexer.write_batch(&store, &mut batch).unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(report.refused.len(), 1);
    assert!(report.refused[0].error.is_encoding());
    assert!(store.raw_cells(PRIMARY, b"r1").unwrap().is_empty());
    assert_eq!(store.raw_cells(PRIMARY, b"r2").unwrap().len(), 2);
}

#[test]
fn index_write_failure_surfaces_as_store_write() {
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let indexer = covered_indexer(vec![CoveredColumnConfig::new(FAMILY, QUAL)], FailurePolicy::AbortBatch);
    store.fail_writes(INDEX, true);
    let err = indexer.write_batch(&store, &mut [put(1, "v")]).unwrap_err();
    assert!(matches!(err, coveridx_error::IndexError::StoreWrite { .. }));
    assert_eq!(store.cell_count(PRIMARY), 0, "case=primary not written after index failure");
}

// ─── Configuration ─────────────────────────────────────────────────────

#[test]
fn indexer_opens_from_properties() {
    let config = IndexerConfig::from_properties([
        ("index.codec.class", "covered-columns"),
        ("index.group.0.table", INDEX),
        ("index.group.0.columns", "FAM:qual"),
    ])
    .unwrap();
    let indexer =
        Indexer::open(PRIMARY, config, &CodecRegistry::with_builtins(), Arc::new(FixedClock(TS)))
            .unwrap();
    assert_eq!(indexer.codec().name(), "covered-columns");

    let store = MemStore::with_tables([PRIMARY, INDEX]);
    indexer.write_batch(&store, &mut [put(3, "v")]).unwrap();
    assert_eq!(index_rows_at(&store, TimeRange::all()), vec![single_key("v", ROW)]);
}

#[test]
fn noop_codec_leaves_index_untouched() {
    let indexer = Indexer::open(
        PRIMARY,
        IndexerConfig::with_codec("noop"),
        &CodecRegistry::with_builtins(),
        Arc::new(FixedClock(TS)),
    )
    .unwrap();
    let store = MemStore::with_tables([PRIMARY, INDEX]);
    let report = indexer.write_batch(&store, &mut [put(3, "v")]).unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(report.index_updates, 0);
    assert_eq!(store.cell_count(INDEX), 0);
}

#[test]
fn indexer_opens_from_toml_with_two_groups() {
    let config = IndexerConfig::from_toml_str(
        r#"
failure_policy = "skip_mutation"

[[groups]]
table = "by_name"
columns = [{ family = "info", qualifier = "name", required = true }]

[[groups]]
table = "by_age"
columns = [{ family = "info", qualifier = "age" }]
"#,
    )
    .unwrap();
    let indexer =
        Indexer::open(PRIMARY, config, &CodecRegistry::with_builtins(), Arc::new(FixedClock(TS)))
            .unwrap();
    assert_eq!(indexer.failure_policy(), FailurePolicy::SkipMutation);

    let store = MemStore::with_tables([PRIMARY, "by_name", "by_age"]);
    let mut batch = [Mutation::new("u1")
        .put("info", "name", 1, "ada")
        .put("info", "age", 1, "36")];
    let report = indexer.write_batch(&store, &mut batch).unwrap();
    assert_eq!(report.index_updates, 2);
    assert_eq!(store.scan("by_name", TimeRange::all()).unwrap().len(), 1);
    assert_eq!(store.scan("by_age", TimeRange::all()).unwrap().len(), 1);
}
