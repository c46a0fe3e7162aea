//! End-to-end tests for the watcher against a real directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ingestor::table::read_csv;
use ingestor::{
    EventBroadcaster, FnAnalysis, IngestEvent, IngestWatcher, MergeOptions, Merger, Table,
};
use tempfile::TempDir;
use tokio::sync::broadcast;

const WAIT: Duration = Duration::from_secs(10);

struct Fixture {
    _temp_dir: TempDir,
    incoming: PathBuf,
    master: PathBuf,
}

fn fixture(master_content: Option<&str>) -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let incoming = temp_dir.path().join("incoming_data");
    fs::create_dir(&incoming).unwrap();
    let master = temp_dir.path().join("supply_chain_data_master.csv");
    if let Some(content) = master_content {
        fs::write(&master, content).unwrap();
    }
    Fixture {
        _temp_dir: temp_dir,
        incoming,
        master,
    }
}

fn start(fx: &Fixture, merger: Merger) -> (ingestor::WatcherHandle, broadcast::Receiver<IngestEvent>) {
    let broadcaster = EventBroadcaster::new(64);
    let rx = broadcaster.subscribe();

    let watcher = IngestWatcher::builder()
        .dir(&fx.incoming)
        .debounce_ms(50)
        .tick_ms(20)
        .merger(merger)
        .broadcaster(broadcaster)
        .build()
        .unwrap();

    (watcher.start(), rx)
}

/// Wait for the next Merged or Failed event, skipping Ignored ones.
async fn next_outcome(rx: &mut broadcast::Receiver<IngestEvent>) -> IngestEvent {
    loop {
        let event = tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for ingest event")
            .expect("broadcast closed");
        if !matches!(event, IngestEvent::Ignored { .. }) {
            return event;
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_new_file_is_merged_and_analyzed() {
    let fx = fixture(Some("id,qty\n1,10\n2,20\n"));

    let calls = Arc::new(AtomicUsize::new(0));
    let rows_seen = Arc::new(AtomicUsize::new(0));
    let hook = {
        let calls = calls.clone();
        let rows_seen = rows_seen.clone();
        FnAnalysis::new("counter", move |table: &Table| {
            calls.fetch_add(1, Ordering::SeqCst);
            rows_seen.store(table.row_count(), Ordering::SeqCst);
            Ok(())
        })
    };
    let merger = Merger::new(MergeOptions::new(&fx.master)).with_analysis(Arc::new(hook));
    let (handle, mut rx) = start(&fx, merger);

    fs::write(fx.incoming.join("batch.csv"), "id,qty\n3,5\n").unwrap();

    match next_outcome(&mut rx).await {
        IngestEvent::Merged {
            path,
            rows_added,
            rows_total,
        } => {
            assert_eq!(file_name(&path), "batch.csv");
            assert_eq!(rows_added, 1);
            assert_eq!(rows_total, 3);
        }
        other => panic!("expected Merged, got {other:?}"),
    }

    handle.stop().await.unwrap();

    assert_eq!(
        fs::read_to_string(&fx.master).unwrap(),
        "id,qty\n1,10\n2,20\n3,5\n"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(rows_seen.load(Ordering::SeqCst), 3);
    // The incoming file is left in place
    assert!(fx.incoming.join("batch.csv").exists());
}

#[tokio::test]
async fn test_two_files_in_one_interval_are_both_merged() {
    let fx = fixture(Some("id,qty\n1,10\n"));
    let (handle, mut rx) = start(&fx, Merger::new(MergeOptions::new(&fx.master)));

    fs::write(fx.incoming.join("a.csv"), "id,qty\n2,20\n3,30\n").unwrap();
    fs::write(fx.incoming.join("b.csv"), "id,qty\n4,40\n").unwrap();

    let mut merged = Vec::new();
    for _ in 0..2 {
        match next_outcome(&mut rx).await {
            IngestEvent::Merged { path, .. } => merged.push(file_name(&path)),
            other => panic!("expected Merged, got {other:?}"),
        }
    }
    merged.sort();
    assert_eq!(merged, vec!["a.csv".to_string(), "b.csv".to_string()]);

    handle.stop().await.unwrap();

    let master = read_csv(&fx.master, b',').unwrap();
    assert_eq!(master.row_count(), 4);
    assert_eq!(master.rows()[0], vec!["1".to_string(), "10".to_string()]);

    let mut ids: Vec<&str> = master.column("id").unwrap().collect();
    ids.sort();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
}

#[tokio::test]
async fn test_bad_file_is_skipped_and_watching_continues() {
    let original = "id,qty\n1,10\n";
    let fx = fixture(Some(original));
    let (handle, mut rx) = start(&fx, Merger::new(MergeOptions::new(&fx.master)));

    fs::write(fx.incoming.join("broken.csv"), "id,qty\n2,20,oops\n").unwrap();

    match next_outcome(&mut rx).await {
        IngestEvent::Failed { path, kind, .. } => {
            assert_eq!(file_name(&path), "broken.csv");
            assert_eq!(kind, "parse");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(fs::read_to_string(&fx.master).unwrap(), original);

    fs::write(fx.incoming.join("good.csv"), "id,qty\n3,30\n").unwrap();

    match next_outcome(&mut rx).await {
        IngestEvent::Merged { path, .. } => assert_eq!(file_name(&path), "good.csv"),
        other => panic!("expected Merged, got {other:?}"),
    }

    handle.stop().await.unwrap();
    assert_eq!(
        fs::read_to_string(&fx.master).unwrap(),
        "id,qty\n1,10\n3,30\n"
    );
}

#[tokio::test]
async fn test_panicking_analysis_does_not_stop_watching() {
    let fx = fixture(Some("id\n1\n"));

    let hook = FnAnalysis::new("fragile", |table: &Table| {
        if table.row_count() == 2 {
            panic!("hook bug");
        }
        Ok(())
    });
    let merger = Merger::new(MergeOptions::new(&fx.master)).with_analysis(Arc::new(hook));
    let (handle, mut rx) = start(&fx, merger);

    fs::write(fx.incoming.join("a.csv"), "id\n2\n").unwrap();
    match next_outcome(&mut rx).await {
        IngestEvent::Merged { path, rows_total, .. } => {
            assert_eq!(file_name(&path), "a.csv");
            assert_eq!(rows_total, 2);
        }
        other => panic!("expected Merged, got {other:?}"),
    }
    assert!(!handle.is_finished());

    fs::write(fx.incoming.join("c.csv"), "id\n3\n").unwrap();
    match next_outcome(&mut rx).await {
        IngestEvent::Merged { path, rows_total, .. } => {
            assert_eq!(file_name(&path), "c.csv");
            assert_eq!(rows_total, 3);
        }
        other => panic!("expected Merged, got {other:?}"),
    }

    handle.stop().await.unwrap();
    assert_eq!(fs::read_to_string(&fx.master).unwrap(), "id\n1\n2\n3\n");
}

#[tokio::test]
async fn test_non_matching_files_are_ignored() {
    let fx = fixture(Some("id,qty\n1,10\n"));
    let (handle, mut rx) = start(&fx, Merger::new(MergeOptions::new(&fx.master)));

    fs::write(fx.incoming.join("notes.txt"), "not a table").unwrap();

    let event = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    match event {
        IngestEvent::Ignored { path } => assert_eq!(file_name(&path), "notes.txt"),
        other => panic!("expected Ignored, got {other:?}"),
    }

    handle.stop().await.unwrap();
    assert_eq!(fs::read_to_string(&fx.master).unwrap(), "id,qty\n1,10\n");
}

#[tokio::test]
async fn test_stop_flushes_queued_files() {
    let fx = fixture(None);

    let broadcaster = EventBroadcaster::new(64);
    let mut rx = broadcaster.subscribe();
    let watcher = IngestWatcher::builder()
        .dir(&fx.incoming)
        // Long enough that only the shutdown flush can merge the file
        .debounce_ms(60_000)
        .tick_ms(20)
        .merger(Merger::new(MergeOptions::new(&fx.master)))
        .broadcaster(broadcaster)
        .build()
        .unwrap();
    let handle = watcher.start();

    fs::write(fx.incoming.join("late.csv"), "id,qty\n7,70\n").unwrap();
    // Give the notify backend time to deliver the create event
    tokio::time::sleep(Duration::from_millis(500)).await;

    handle.stop().await.unwrap();

    match next_outcome(&mut rx).await {
        IngestEvent::Merged { rows_total, .. } => assert_eq!(rows_total, 1),
        other => panic!("expected Merged, got {other:?}"),
    }
    // First run without a master creates it from the incoming header
    assert_eq!(fs::read_to_string(&fx.master).unwrap(), "id,qty\n7,70\n");
}

#[tokio::test]
async fn test_master_inside_watched_directory_is_not_reingested() {
    let fx = fixture(None);
    let master = fx.incoming.join("master.csv");
    fs::write(&master, "id,qty\n1,10\n").unwrap();

    let (handle, mut rx) = start(&fx, Merger::new(MergeOptions::new(&master)));

    fs::write(fx.incoming.join("batch.csv"), "id,qty\n2,20\n").unwrap();
    match next_outcome(&mut rx).await {
        IngestEvent::Merged { rows_total, .. } => assert_eq!(rows_total, 2),
        other => panic!("expected Merged, got {other:?}"),
    }

    // Leave time for any event caused by replacing the master itself
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.stop().await.unwrap();

    while let Ok(event) = rx.try_recv() {
        assert!(
            matches!(event, IngestEvent::Ignored { .. }),
            "unexpected event after merge: {event:?}"
        );
    }
    assert_eq!(
        fs::read_to_string(&master).unwrap(),
        "id,qty\n1,10\n2,20\n"
    );
}
