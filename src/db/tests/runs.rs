use super::*;
use crate::error::{DatabaseError, Error};
use crate::sink::ProgressSink;
use crate::types::{RunId, RunStatus};

#[tokio::test]
async fn test_create_run_starts_at_one_percent() {
    let (db, _temp_file) = create_test_db().await;

    let run = db.create_run().await.unwrap();

    assert!(run.id.get() > 0);
    assert_eq!(run.percent, 1);
    assert_eq!(run.status, RunStatus::Started);
    assert!(!run.is_finished());
    assert!(db.has_unfinished_runs().await.unwrap());
}

#[tokio::test]
async fn test_update_run_sets_percent() {
    let (db, _temp_file) = create_test_db().await;
    let run = db.create_run().await.unwrap();

    let updated = db.update_run(run.id, 42).await.unwrap();
    assert_eq!(updated.percent, 42);
    assert_eq!(updated.status, RunStatus::Started);

    let stored = db.get_run(run.id).await.unwrap().unwrap();
    assert_eq!(stored.percent, 42);
    assert_eq!(stored.created_at, run.created_at);
}

#[tokio::test]
async fn test_update_run_clamps_percent() {
    let (db, _temp_file) = create_test_db().await;
    let run = db.create_run().await.unwrap();

    assert_eq!(db.update_run(run.id, 0).await.unwrap().percent, 1);
    assert_eq!(db.update_run(run.id, 250).await.unwrap().percent, 100);
}

#[tokio::test]
async fn test_finish_run() {
    let (db, _temp_file) = create_test_db().await;
    let run = db.create_run().await.unwrap();
    db.update_run(run.id, 99).await.unwrap();

    let finished = db.finish_run(run.id).await.unwrap();

    assert_eq!(finished.percent, 100);
    assert_eq!(finished.status, RunStatus::Finished);
    assert!(finished.is_finished());
    assert!(!db.has_unfinished_runs().await.unwrap());
}

#[tokio::test]
async fn test_missing_run_is_not_found() {
    let (db, _temp_file) = create_test_db().await;

    assert!(db.get_run(RunId(999)).await.unwrap().is_none());

    let result = db.update_run(RunId(999), 10).await;
    assert!(matches!(
        result,
        Err(Error::Database(DatabaseError::NotFound(_)))
    ));

    let result = db.finish_run(RunId(999)).await;
    assert!(matches!(
        result,
        Err(Error::Database(DatabaseError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_list_runs_oldest_first() {
    let (db, _temp_file) = create_test_db().await;
    assert!(db.list_runs().await.unwrap().is_empty());

    let first = db.create_run().await.unwrap();
    let second = db.create_run().await.unwrap();
    db.finish_run(first.id).await.unwrap();

    let runs = db.list_runs().await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].id, first.id);
    assert_eq!(runs[0].status, RunStatus::Finished);
    assert_eq!(runs[1].id, second.id);
    assert_eq!(runs[1].status, RunStatus::Started);
    assert!(db.has_unfinished_runs().await.unwrap());
}
