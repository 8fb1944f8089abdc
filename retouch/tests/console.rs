//! Drives a watcher through the console command surface.

use std::fs;
use std::io::Cursor;
use std::time::Duration;

use retouch::check::RepoChecker;
use retouch::control::run_console;
use retouch::core::classifier::MarkerClassifier;
use retouch::core::types::{Trigger, WatchedRepo};
use retouch::io::config::WatcherConfig;
use retouch::io::probe::FsProbe;
use retouch::test_support::ScriptedRunner;
use retouch::watch::{WatchEvent, Watcher, WatcherState};

fn next_event(watcher: &Watcher) -> WatchEvent {
    watcher
        .events()
        .recv_timeout(Duration::from_secs(10))
        .expect("watch event")
}

#[test]
fn console_commands_reach_the_worker() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("a.txt"), "a\n").expect("write");
    let runner = ScriptedRunner::new().with_report(
        temp.path(),
        "warning: in the working copy of 'a.txt', LF will be replaced by CRLF the next time Git touches it\n",
    );
    let checker = RepoChecker::new(runner.clone(), FsProbe, MarkerClassifier::default());
    let state = WatcherState {
        repos: vec![WatchedRepo::new("demo", temp.path())],
        interval: Duration::from_secs(3600),
        paused: true,
    };
    let watcher = Watcher::spawn(checker, state, || Ok(WatcherConfig::default())).expect("spawn");
    let handle = watcher.handle();
    let config_path = temp.path().join("config.toml");

    assert!(matches!(next_event(&watcher), WatchEvent::Started { paused: true, .. }));

    let mut output = Vec::new();
    run_console(
        &handle,
        &config_path,
        Cursor::new("status\n\nbogus\ncheck\n"),
        &mut output,
    )
    .expect("console");
    assert!(handle.is_running(), "EOF must not stop the watcher");
    let printed = String::from_utf8(output).expect("utf8");
    assert!(printed.contains("unknown command 'bogus'"));

    assert!(matches!(next_event(&watcher), WatchEvent::Status { paused: true, .. }));
    match next_event(&watcher) {
        WatchEvent::CycleFinished(summary) => {
            assert_eq!(summary.trigger, Trigger::Manual);
            assert_eq!(summary.repos[0].repaired(), ["a.txt"]);
        }
        other => panic!("unexpected event {other:?}"),
    }

    run_console(&handle, &config_path, Cursor::new("quit\n"), Vec::new()).expect("console");
    assert_eq!(next_event(&watcher), WatchEvent::Stopped);
    watcher.join().expect("join");
    assert_eq!(runner.discarded(temp.path()), vec!["a.txt"]);
}
