//! Ledger Persistence Tests
//!
//! Exercises the result ledger against a real sled database in a temporary
//! directory: survival across restarts, the capacity cap, recovery from a
//! corrupt blob, and the deferred background writer.

use std::sync::Arc;

use motion_gauge::config::defaults::{LEDGER_BLOB_KEY, LEDGER_TREE};
use motion_gauge::storage::{
    to_csv, BlobStore, DeferredBlobStore, ResultLedger, SledBlobStore, CSV_HEADER,
};
use motion_gauge::types::{ResultStatus, Task, TaskResult};
use tempfile::TempDir;

fn result(task: Task, value: f64, status: ResultStatus) -> TaskResult {
    let note = (status != ResultStatus::Pass).then(|| "Borderline balance time".to_string());
    TaskResult::new(task, value, "s", status, note)
}

fn open(dir: &TempDir) -> Arc<dyn BlobStore> {
    Arc::new(SledBlobStore::open(dir.path().join("ledger.db"), LEDGER_TREE).expect("open sled"))
}

#[test]
fn test_results_survive_restart_in_order() {
    let dir = TempDir::new().expect("tempdir");
    let written: Vec<TaskResult> = {
        let mut ledger = ResultLedger::load(open(&dir), 200);
        ledger.append(result(Task::OneLegLeft, 4.0, ResultStatus::Warn));
        ledger.append(result(Task::OneLegRight, 6.2, ResultStatus::Pass));
        ledger.append(result(Task::OneLegLeft, 1.1, ResultStatus::Fail));
        ledger.all().to_vec()
    };

    let reloaded = ResultLedger::load(open(&dir), 200);
    assert_eq!(reloaded.all(), written.as_slice());
    assert_eq!(
        reloaded.latest().map(|r| r.value),
        Some(1.1),
        "newest entry is last"
    );
}

#[test]
fn test_cap_holds_across_restart() {
    let dir = TempDir::new().expect("tempdir");
    let first_kept = {
        let mut ledger = ResultLedger::load(open(&dir), 200);
        for i in 0..205 {
            ledger.append(result(Task::OneLegLeft, f64::from(i), ResultStatus::Pass));
        }
        assert_eq!(ledger.len(), 200);
        ledger.all()[0].id.clone()
    };

    let reloaded = ResultLedger::load(open(&dir), 200);
    assert_eq!(reloaded.len(), 200);
    assert_eq!(reloaded.all()[0].id, first_kept);
    assert_eq!(reloaded.all()[0].value, 5.0);
    assert_eq!(reloaded.latest().map(|r| r.value), Some(204.0));
}

#[test]
fn test_corrupt_blob_starts_empty_and_is_overwritten() {
    let dir = TempDir::new().expect("tempdir");
    {
        let store = open(&dir);
        store
            .save(LEDGER_BLOB_KEY, b"{not a result list")
            .expect("raw save");
    }

    {
        let mut ledger = ResultLedger::load(open(&dir), 200);
        assert!(ledger.is_empty());
        ledger.append(result(Task::ArmRaiseRight, 1.0, ResultStatus::Pass));
    }

    let reloaded = ResultLedger::load(open(&dir), 200);
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.all()[0].task, Task::ArmRaiseRight);
}

#[test]
fn test_clear_persists_empty_list() {
    let dir = TempDir::new().expect("tempdir");
    {
        let mut ledger = ResultLedger::load(open(&dir), 200);
        ledger.append(result(Task::ArmRaiseLeft, 1.0, ResultStatus::Pass));
        ledger.clear();
    }
    let store = open(&dir);
    let blob = store.load(LEDGER_BLOB_KEY).expect("load").expect("blob present");
    let parsed: Vec<TaskResult> = serde_json::from_slice(&blob).expect("valid json");
    assert!(parsed.is_empty());
}

#[tokio::test]
async fn test_deferred_writer_reaches_sled_after_flush() {
    let dir = TempDir::new().expect("tempdir");
    let sled_store = open(&dir);
    let deferred = Arc::new(DeferredBlobStore::spawn(sled_store.clone()));

    let mut ledger = ResultLedger::load(deferred.clone() as Arc<dyn BlobStore>, 200);
    for i in 0..10 {
        ledger.append(result(Task::OneLegRight, f64::from(i), ResultStatus::Warn));
    }
    deferred.flush().await.expect("flush");

    let direct = ResultLedger::load(sled_store, 200);
    assert_eq!(direct.len(), 10);
    assert_eq!(direct.all(), ledger.all());
}

#[test]
fn test_reloaded_ledger_exports_csv() {
    let dir = TempDir::new().expect("tempdir");
    {
        let mut ledger = ResultLedger::load(open(&dir), 200);
        ledger.append(result(Task::OneLegLeft, 4.0, ResultStatus::Warn));
    }
    let ledger = ResultLedger::load(open(&dir), 200);
    let csv = to_csv(ledger.all());
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], CSV_HEADER);
    assert_eq!(lines.len(), 2);
    assert!(lines[1].ends_with(",one_leg_left,4,s,warn,Borderline balance time"));
}
