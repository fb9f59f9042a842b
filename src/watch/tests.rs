use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use super::*;

fn make_dir() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    (temp, root)
}

fn set_mtime(path: &Path, time: SystemTime) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(time).unwrap();
}

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn change(path: &str, previous: u64, current: u64) -> ChangeEvent {
    ChangeEvent {
        path: PathBuf::from(path),
        previous: at(previous),
        current: at(current),
    }
}

// ----------------------------------------------------------------------------
// mtime comparison
// ----------------------------------------------------------------------------

#[test]
fn test_identical_mtime_no_event() {
    assert!(detect_change(Path::new("/a.js"), at(10), at(10)).is_none());
}

#[test]
fn test_differing_mtime_one_event() {
    let event = detect_change(Path::new("/a.js"), at(10), at(11)).unwrap();
    assert_eq!(event, change("/a.js", 10, 11));
}

#[test]
fn test_state_check_records_new_mtime() {
    let (_temp, root) = make_dir();
    let file = root.join("a.js");
    fs::write(&file, "1").unwrap();
    set_mtime(&file, at(1_000));

    let mut state = WatchState::default();
    state.insert(&file, file.clone(), at(1_000));

    // same mtime: nothing, however often the backend fires
    assert!(state.check(&file).is_none());
    assert!(state.check(&file).is_none());

    set_mtime(&file, at(2_000));
    let event = state.check(&file).unwrap();
    assert_eq!(event.previous, at(1_000));
    assert_eq!(event.current, at(2_000));

    // the new mtime is now the baseline
    assert!(state.check(&file).is_none());
}

#[test]
fn test_state_check_swallows_stat_failure() {
    let (_temp, root) = make_dir();
    let file = root.join("gone.js");

    let mut state = WatchState::default();
    state.insert(&file, file.clone(), at(1));
    assert!(state.check(&file).is_none());
    assert!(state.check(&root.join("unwatched.js")).is_none());
}

#[test]
fn test_state_reports_added_path() {
    let (_temp, root) = make_dir();
    let real = root.join("real.js");
    fs::write(&real, "1").unwrap();
    set_mtime(&real, at(1_000));

    let added = PathBuf::from("/var/site/assets/real.js");
    let mut state = WatchState::default();
    state.insert(&added, real.clone(), at(1_000));

    set_mtime(&real, at(2_000));
    assert!(state.check(&added).is_none());
    assert_eq!(state.check(&real).unwrap().path, added);
}

// ----------------------------------------------------------------------------
// Watcher bookkeeping
// ----------------------------------------------------------------------------

#[test]
fn test_watch_ignores_missing_and_dirs() {
    let (_temp, root) = make_dir();
    let (mut watcher, _rx) = Watcher::channel().unwrap();

    assert!(!watcher.watch(&root.join("later.js")));
    assert!(!watcher.watch(&root));
    assert!(watcher.is_empty());

    // no retry when the file appears afterwards
    fs::write(root.join("later.js"), "x").unwrap();
    assert!(!watcher.is_watching(&root.join("later.js")));
}

#[test]
fn test_watch_unwatch_single_path() {
    let (_temp, root) = make_dir();
    let a = root.join("a.js");
    let b = root.join("b.js");
    fs::write(&a, "a").unwrap();
    fs::write(&b, "b").unwrap();

    let (mut watcher, _rx) = Watcher::channel().unwrap();
    assert!(watcher.watch(&a));
    assert!(watcher.watch(&b));
    assert!(!watcher.watch(&a));
    assert_eq!(watcher.watched(), vec![a.clone(), b.clone()]);

    assert!(watcher.unwatch(&a));
    assert!(!watcher.unwatch(&a));
    assert_eq!(watcher.watched(), vec![b.clone()]);
    assert_eq!(watcher.state.lock().dirs.get(&root), Some(&1));

    assert!(watcher.unwatch(&b));
    assert!(watcher.state.lock().dirs.is_empty());
}

#[test]
fn test_watcher_emits_on_mtime_change() {
    let (_temp, root) = make_dir();
    let file = root.join("a.js");
    fs::write(&file, "var a;").unwrap();
    set_mtime(&file, at(1_000));

    let (mut watcher, rx) = Watcher::channel().unwrap();
    assert!(watcher.watch(&file));

    set_mtime(&file, at(5_000));
    let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(event.path, file);
    assert_eq!(event.previous, at(1_000));
    assert_eq!(event.current, at(5_000));

    // backend noise for the same mtime is absorbed
    std::thread::sleep(Duration::from_millis(300));
    assert!(rx.try_recv().is_err());
}

#[cfg(unix)]
#[test]
fn test_watch_through_symlinked_dir() {
    let (_temp, root) = make_dir();
    let real = root.join("real");
    fs::create_dir(&real).unwrap();
    std::os::unix::fs::symlink(&real, root.join("link")).unwrap();

    let file = real.join("a.js");
    fs::write(&file, "var a;").unwrap();
    set_mtime(&file, at(1_000));

    let added = root.join("link/a.js");
    let (mut watcher, rx) = Watcher::channel().unwrap();
    assert!(watcher.watch(&added));
    assert!(watcher.is_watching(&added));
    assert_eq!(watcher.watched(), vec![added.clone()]);
    assert_eq!(watcher.state.lock().dirs.get(&real), Some(&1));

    // the backend reports the resolved path; the event names the added one
    set_mtime(&file, at(5_000));
    let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(event.path, added);

    assert!(watcher.unwatch(&added));
    assert!(watcher.state.lock().dirs.is_empty());
}

#[test]
fn test_unwatched_file_is_silent() {
    let (_temp, root) = make_dir();
    let file = root.join("a.js");
    fs::write(&file, "var a;").unwrap();

    let (mut watcher, rx) = Watcher::channel().unwrap();
    watcher.watch(&file);
    watcher.unwatch(&file);

    set_mtime(&file, at(9_000));
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
}

// ----------------------------------------------------------------------------
// Debouncer
// ----------------------------------------------------------------------------

#[test]
fn test_debouncer_empty() {
    let debouncer = Debouncer::default();
    assert!(!debouncer.is_ready());
    assert_eq!(debouncer.sleep_duration(), Duration::from_secs(86400));
}

#[test]
fn test_debouncer_merges_same_path() {
    let mut debouncer = Debouncer::new(Duration::ZERO);
    debouncer.add_event(change("/a.js", 1, 2));
    debouncer.add_event(change("/a.js", 2, 3));
    debouncer.add_event(change("/b.js", 7, 8));
    assert_eq!(debouncer.pending(), 2);

    let batch = debouncer.take_if_ready().unwrap();
    assert_eq!(batch, vec![change("/a.js", 1, 3), change("/b.js", 7, 8)]);
    assert!(debouncer.take_if_ready().is_none());
}

#[test]
fn test_debouncer_waits_for_quiet_window() {
    let mut debouncer = Debouncer::new(Duration::from_millis(50));
    debouncer.add_event(change("/a.js", 1, 2));
    assert!(debouncer.take_if_ready().is_none());
    assert!(debouncer.sleep_duration() <= Duration::from_millis(50));

    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(debouncer.take_if_ready().map(|b| b.len()), Some(1));
}
