//! End-to-end tests for the CSV batch importer, run against an in-memory
//! store with an injectable failure pattern.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use hydrolog::import::{self, BatchOutcome, ImportOptions};
use hydrolog::{
    DeviceStats, ImportError, NormalizedReading, ReadingStore, StoreError, StoredReading,
};

// ---

/// In-memory stand-in for the PostgreSQL store. `fail_batches` lists the
/// zero-based `insert_many` call indices that should fail atomically.
#[derive(Default)]
struct MemStore {
    rows: Mutex<Vec<StoredReading>>,
    next_id: AtomicI32,
    insert_calls: AtomicUsize,
    fail_batches: HashSet<usize>,
    fail_delete: bool,
}

impl MemStore {
    // ---
    fn failing_on(batches: impl IntoIterator<Item = usize>) -> Self {
        Self {
            fail_batches: batches.into_iter().collect(),
            ..Self::default()
        }
    }

    fn failing_delete() -> Self {
        Self {
            fail_delete: true,
            ..Self::default()
        }
    }

    fn row_count(&self, device_id: &str) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.device_id == device_id)
            .count()
    }

    fn push(&self, device_id: &str, ldr: i32, water: i16, buzzer: i16, ts: DateTime<Utc>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.rows.lock().unwrap().push(StoredReading {
            id,
            device_id: device_id.to_string(),
            ldr,
            water,
            buzzer,
            ts,
        });
    }
}

impl ReadingStore for MemStore {
    // ---
    async fn insert(
        &self,
        device_id: &str,
        ldr: i32,
        water: i16,
        buzzer: i16,
        ts: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        self.push(device_id, ldr, water, buzzer, ts);
        Ok(1)
    }

    async fn insert_many(&self, readings: &[NormalizedReading]) -> Result<u64, StoreError> {
        let call = self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_batches.contains(&call) {
            return Err(StoreError::Unavailable("injected batch failure".into()));
        }
        for r in readings {
            self.push(
                &r.device_id,
                r.light_proxy,
                r.water_detected,
                r.buzzer,
                r.timestamp,
            );
        }
        Ok(readings.len() as u64)
    }

    async fn delete_by_device(&self, device_id: &str) -> Result<u64, StoreError> {
        if self.fail_delete {
            return Err(StoreError::Unavailable("injected purge failure".into()));
        }
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.device_id != device_id);
        Ok((before - rows.len()) as u64)
    }

    async fn query_latest(
        &self,
        device_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<StoredReading>, StoreError> {
        let mut rows: Vec<StoredReading> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| device_id.map_or(true, |id| r.device_id == id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.ts.cmp(&a.ts));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn aggregate_stats(&self, device_id: &str) -> Result<DeviceStats, StoreError> {
        let rows = self.rows.lock().unwrap();
        let matching: Vec<&StoredReading> = rows
            .iter()
            .filter(|r| r.device_id == device_id)
            .collect();
        Ok(DeviceStats {
            total: matching.len() as i64,
            earliest_ts: matching.iter().map(|r| r.ts).min(),
            latest_ts: matching.iter().map(|r| r.ts).max(),
            buzzer_on: matching.iter().filter(|r| r.buzzer == 1).count() as i64,
        })
    }
}

// ---

fn write_csv(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("sensorWater.csv");
    fs::write(&path, contents).unwrap();
    path
}

fn options(file: PathBuf) -> ImportOptions {
    ImportOptions {
        file,
        device_id: "csv_import".to_string(),
        batch_size: 100,
        clear_existing: false,
    }
}

const HEADER: &str = "Time(s);WaterLevel;LightStatus;Status;LED;Buzzer\n";

fn ascending_log(n: usize) -> String {
    let mut text = HEADER.to_string();
    for i in 0..n {
        text.push_str(&format!("{};{};DAY;NORMAL;0;0\n", i * 10, i % 3));
    }
    text
}

// ---

#[tokio::test]
async fn imports_a_full_file_and_reports_counts() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        &dir,
        "Time(s);WaterLevel;LightStatus;Status;LED;Buzzer\n\
         0;0;NIGHT;NORMAL;0;0\n\
         10;5;DAY;ALERT;1;1\n\
         20;10;GELAP;ALERT;1;0\n",
    );
    let store = MemStore::default();

    let report = import::run(&store, &options(path)).await.unwrap();

    assert_eq!(report.total_rows, 3);
    assert_eq!(report.normalized, 3);
    assert_eq!(report.parse_skipped(), 0);
    assert_eq!(report.inserted, 3);
    assert_eq!(report.insert_failed, 0);
    assert!(report.succeeded());

    // Newest first: the largest Time(s) offset of an ascending log maps
    // closest to "now".
    let rows = store.query_latest(Some("csv_import"), 10).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows.iter().map(|r| r.ldr).collect::<Vec<_>>(),
        [200, 800, 200]
    );
    assert_eq!(
        rows.iter().map(|r| r.water).collect::<Vec<_>>(),
        [1, 1, 0]
    );
    assert!((Utc::now() - rows[0].ts).num_seconds().abs() < 5);
    assert_eq!(rows[1].ts - rows[2].ts, chrono::Duration::seconds(10));

    let stats = store.aggregate_stats("csv_import").await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.buzzer_on, 1);
    assert_eq!(stats.earliest_ts, Some(rows[2].ts));
    assert_eq!(stats.latest_ts, Some(rows[0].ts));
}

#[tokio::test]
async fn comma_delimited_files_are_detected() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        &dir,
        "Time(s),WaterLevel,LightStatus,Status,LED,Buzzer\n0,3,SIANG,NORMAL,0,1\n",
    );
    let store = MemStore::default();

    let report = import::run(&store, &options(path)).await.unwrap();

    assert_eq!(report.inserted, 1);
    let rows = store.query_latest(None, 10).await.unwrap();
    assert_eq!(rows[0].ldr, 800);
    assert_eq!(rows[0].water, 1);
    assert_eq!(rows[0].buzzer, 1);
}

#[tokio::test]
async fn malformed_row_is_dropped_without_aborting() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        &dir,
        "Time(s);WaterLevel;LightStatus;Status;LED;Buzzer\n\
         0;0;DAY;NORMAL;0;0\n\
         abc;0;DAY;NORMAL;0;0\n\
         20;0;DAY;NORMAL;0;0\n",
    );
    let store = MemStore::default();

    let report = import::run(&store, &options(path)).await.unwrap();

    assert_eq!(report.total_rows, 3);
    assert_eq!(report.normalized, 2);
    assert_eq!(report.parse_skipped(), 1);
    assert_eq!(report.parse_failures[0].0, 1);
    assert_eq!(report.parse_failures[0].1.field, "Time(s)");
    assert_eq!(report.inserted, 2);
}

#[tokio::test]
async fn one_failed_batch_does_not_abort_the_rest() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, &ascending_log(25));
    let store = MemStore::failing_on([1]);

    let mut opts = options(path);
    opts.batch_size = 10;
    let report = import::run(&store, &opts).await.unwrap();

    assert_eq!(report.total_rows, 25);
    assert_eq!(report.inserted, 15);
    assert_eq!(report.insert_failed, 10);
    assert!(report.succeeded());

    assert_eq!(report.batches.len(), 3);
    match &report.batches[1] {
        BatchOutcome::Failed { first, last, .. } => {
            assert_eq!(*first, 10);
            assert_eq!(*last, 19);
        }
        other => panic!("expected failed batch, got {other:?}"),
    }
    assert_eq!(store.row_count("csv_import"), 15);
}

#[tokio::test]
async fn zero_insert_run_reports_failure_with_full_counts() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, &ascending_log(5));
    let store = MemStore::failing_on([0]);

    let report = import::run(&store, &options(path)).await.unwrap();

    assert!(!report.succeeded());
    assert_eq!(report.total_rows, 5);
    assert_eq!(report.normalized, 5);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.insert_failed, 5);
}

#[tokio::test]
async fn reimport_with_purge_is_idempotent() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, &ascending_log(8));
    let store = MemStore::default();

    let mut opts = options(path);
    opts.clear_existing = true;

    import::run(&store, &opts).await.unwrap();
    import::run(&store, &opts).await.unwrap();

    assert_eq!(store.row_count("csv_import"), 8);
}

#[tokio::test]
async fn failed_purge_aborts_before_any_insert() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, &ascending_log(5));
    let store = MemStore::failing_delete();

    let mut opts = options(path);
    opts.clear_existing = true;

    let err = import::run(&store, &opts).await.unwrap_err();
    assert!(matches!(err, ImportError::PurgeFailed(_)));
    assert_eq!(store.row_count("csv_import"), 0);
    assert_eq!(store.insert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reimport_without_purge_duplicates_rows() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, &ascending_log(8));
    let store = MemStore::default();

    let opts = options(path);
    import::run(&store, &opts).await.unwrap();
    import::run(&store, &opts).await.unwrap();

    assert_eq!(store.row_count("csv_import"), 16);
}

#[tokio::test]
async fn missing_file_fails_fast() {
    // ---
    let store = MemStore::default();
    let err = import::run(&store, &options(PathBuf::from("/no/such/file.csv")))
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::SourceNotFound(_)));
}

#[tokio::test]
async fn header_only_file_is_an_empty_source() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, HEADER);
    let store = MemStore::default();

    let err = import::run(&store, &options(path)).await.unwrap_err();
    assert!(matches!(err, ImportError::EmptySource));
}

#[tokio::test]
async fn all_rows_invalid_is_no_valid_records() {
    // ---
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        &dir,
        "Time(s);WaterLevel;LightStatus;Status;LED;Buzzer\nx;y;DAY;NORMAL;0;0\nz;0;DAY;NORMAL;0;0\n",
    );
    let store = MemStore::default();

    let err = import::run(&store, &options(path)).await.unwrap_err();
    match err {
        ImportError::NoValidRecords { total, skipped } => {
            assert_eq!(total, 2);
            assert_eq!(skipped, 2);
        }
        other => panic!("expected NoValidRecords, got {other:?}"),
    }
}

#[tokio::test]
async fn verifier_tolerates_an_empty_device() {
    // ---
    let store = MemStore::default();
    import::verify::verify_latest(&store, "missing", 5)
        .await
        .unwrap();
    import::verify::report_stats(&store, "missing").await.unwrap();
}
