// End-to-end checks against real temp directories

use std::sync::Arc;
use std::time::Duration;

use assert_fs::fixture::ChildPath;
use assert_fs::prelude::*;
use chrono::{Local, TimeDelta};
use filetime::{FileTime, set_file_mtime};
use predicates::prelude::*;

use filerelay::{
    Config, CopyDecision, LocalFileSystem, MemorySink, Rule, Scheduler, SyncEvent, SyncTask,
};

const NONE: [&str; 0] = [];

/// Write a fixture file, creating its parent folders
fn put(file: &ChildPath, contents: &str) {
    if let Some(parent) = file.path().parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    file.write_str(contents).unwrap();
}

#[tokio::test]
async fn degraded_task_is_isolated_throttled_and_recovers() {
    let temp = assert_fs::TempDir::new().unwrap();
    let a_src = temp.child("a_src");
    let b_src = temp.child("b_src");
    put(&a_src.child("a1.pdf"), "a1");
    put(&b_src.child("b1.pdf"), "b1");
    let out = temp.child("out");

    let tasks = vec![
        SyncTask::new("a", a_src.path(), vec![Rule::new(out.child("a").path(), ["pdf"], NONE)]),
        SyncTask::new("b", b_src.path(), vec![Rule::new(out.child("b").path(), ["pdf"], NONE)]),
    ];
    let sink = Arc::new(MemorySink::new());
    let mut scheduler = Scheduler::new(tasks, Duration::from_millis(1)).with_sink(sink.clone());

    let first = scheduler.run_cycle().await;
    assert_eq!(first.succeeded, 2);
    out.child("a/a1.pdf").assert("a1");
    out.child("b/b1.pdf").assert("b1");

    // Task a loses its source; task b keeps receiving work
    std::fs::remove_dir_all(a_src.path()).unwrap();
    put(&b_src.child("b2.pdf"), "b2");

    for _ in 0..5 {
        let summary = scheduler.run_cycle().await;
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 1);
    }
    out.child("b/b2.pdf").assert(predicate::path::exists());

    let errors = sink.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].task(), "a");

    // Source comes back
    put(&a_src.child("a2.pdf"), "a2");
    scheduler.run_cycle().await;
    scheduler.run_cycle().await;

    let recoveries: Vec<_> = sink
        .infos()
        .into_iter()
        .filter(|e| matches!(e, SyncEvent::Recovered { .. }))
        .collect();
    assert_eq!(recoveries.len(), 1);
    assert_eq!(recoveries[0].task(), "a");
    out.child("a/a2.pdf").assert("a2");
    assert!(scheduler.health().iter().all(|(_, h)| h.is_healthy()));
}

#[test]
fn throttle_window_reopens_after_three_hundred_seconds() {
    let temp = assert_fs::TempDir::new().unwrap();
    let mut task = SyncTask::new(
        "vanished",
        temp.child("never-created").path(),
        vec![Rule::new(temp.child("out").path(), NONE, NONE)],
    );
    let sink = MemorySink::new();
    let start = Local::now();

    let mut t = 0;
    while t <= 300 {
        task.run_at(&LocalFileSystem, &sink, start + TimeDelta::seconds(t))
            .unwrap_err();
        t += 2;
    }
    assert_eq!(sink.errors().len(), 1);

    task.run_at(&LocalFileSystem, &sink, start + TimeDelta::seconds(302))
        .unwrap_err();
    assert_eq!(sink.errors().len(), 2);

    // The window restarts from the second report
    task.run_at(&LocalFileSystem, &sink, start + TimeDelta::seconds(304))
        .unwrap_err();
    assert_eq!(sink.errors().len(), 2);
}

#[test]
fn depth_limit_bounds_what_is_copied() {
    let temp = assert_fs::TempDir::new().unwrap();
    let src = temp.child("src");
    put(&src.child("d1/one.txt"), "1");
    put(&src.child("d1/d2/two.txt"), "2");
    put(&src.child("d1/d2/d3/three.txt"), "3");

    let run = |depth: usize, out: &str| {
        let rule = Rule::new(temp.child(out).path(), ["txt"], NONE);
        let mut task = SyncTask::new(out, src.path(), vec![rule]).with_max_depth(depth);
        task.run(&LocalFileSystem, &MemorySink::new()).unwrap()
    };

    let report = run(1, "out1");
    assert_eq!(report.copied, 1);
    temp.child("out1/one.txt").assert(predicate::path::exists());
    temp.child("out1/two.txt").assert(predicate::path::missing());
    temp.child("out1/three.txt").assert(predicate::path::missing());

    let report = run(2, "out2");
    assert_eq!(report.copied, 2);
    temp.child("out2/two.txt").assert(predicate::path::exists());
    temp.child("out2/three.txt").assert(predicate::path::missing());

    let report = run(0, "out0");
    assert_eq!(report.copied, 0);
    temp.child("out0").assert(predicate::path::missing());
}

#[test]
fn overwrite_follows_source_mtime_per_rule() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("src/Invoice_CAD.PDF");
    put(&file, "v1");
    set_file_mtime(file.path(), FileTime::from_unix_time(1_700_000_000, 0)).unwrap();

    let rules = vec![
        Rule::new(temp.child("pdf").path(), ["pdf"], NONE),
        Rule::new(temp.child("cad").path(), NONE, ["cad"]),
    ];
    let mut task = SyncTask::new("invoices", temp.child("src").path(), rules);
    let sink = MemorySink::new();

    assert_eq!(task.run(&LocalFileSystem, &sink).unwrap().copied, 2);

    put(&file, "v2");
    set_file_mtime(file.path(), FileTime::from_unix_time(1_700_000_060, 0)).unwrap();
    sink.clear();

    let report = task.run(&LocalFileSystem, &sink).unwrap();
    assert_eq!(report.overwritten, 2);
    assert!(sink.transfers().iter().all(|e| matches!(
        e,
        SyncEvent::Transferred {
            action: CopyDecision::Overwrite,
            ..
        }
    )));
    temp.child("pdf/Invoice_CAD.PDF").assert("v2");
    temp.child("cad/Invoice_CAD.PDF").assert("v2");

    // A destination edited later than the source is left alone
    let edited = temp.child("pdf/Invoice_CAD.PDF");
    put(&edited, "local edit");
    set_file_mtime(edited.path(), FileTime::from_unix_time(1_700_000_120, 0)).unwrap();
    sink.clear();
    assert_eq!(task.run(&LocalFileSystem, &sink).unwrap().transferred(), 0);
    edited.assert("local edit");
}

#[tokio::test]
async fn config_file_drives_a_cycle() {
    let temp = assert_fs::TempDir::new().unwrap();
    put(&temp.child("inbox/2024/report_usd.csv"), "r");
    put(&temp.child("inbox/notes.md"), "n");

    let config_file = temp.child("config.toml");
    config_file
        .write_str(&format!(
            r#"
[general]
interval_secs = 1

[[task]]
name = "reports"
source = "{inbox}"
max_depth = 1

[[task.rule]]
destination = "{out}"
file_types = ["csv"]
identifiers = ["USD"]
"#,
            inbox = temp.child("inbox").path().display().to_string().replace('\\', "/"),
            out = temp.child("out").path().display().to_string().replace('\\', "/"),
        ))
        .unwrap();

    let config = Config::load(Some(config_file.path())).unwrap();
    let tasks = config.build_tasks().unwrap();
    let sink = Arc::new(MemorySink::new());
    let mut scheduler = Scheduler::new(tasks, config.interval()).with_sink(sink.clone());

    let summary = scheduler.run_cycle().await;

    assert_eq!(summary.transferred, 1);
    temp.child("out/report_usd.csv").assert("r");
    temp.child("out/notes.md").assert(predicate::path::missing());
    match &sink.transfers()[0] {
        SyncEvent::Transferred {
            task,
            action,
            file_name,
            ..
        } => {
            assert_eq!(task, "reports");
            assert_eq!(*action, CopyDecision::Copy);
            assert_eq!(file_name, "report_usd.csv");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn destination_nested_in_source_is_not_rescanned() {
    let temp = assert_fs::TempDir::new().unwrap();
    let src = temp.child("src");
    let archive = src.child("archive");
    put(&archive.child("old.pdf"), "old");
    let other = temp.child("other");

    let rules = vec![
        Rule::new(archive.path(), ["pdf"], NONE),
        Rule::new(other.path(), ["pdf"], NONE),
    ];
    let mut task = SyncTask::new("docs", src.path(), rules).with_max_depth(1);
    let sink = MemorySink::new();

    let report = task.run(&LocalFileSystem, &sink).unwrap();

    assert_eq!(report.transferred(), 0);
    assert!(sink.transfers().is_empty());
    other.child("old.pdf").assert(predicate::path::missing());
    archive.child("old.pdf").assert("old");
}
