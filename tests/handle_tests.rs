use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::info;
use rand::Rng;
use raii_file_handle::{
    Event, HandleError, HandleState, LifecycleObserver, RecordingObserver, ResourceHandle,
};
use tempfile::{tempdir, TempDir};
// We want to see logs while testing.
use test_log::test;

/// Helper to make a scratch file with the given content
fn scratch_file(content: &str) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("read.txt");
    fs::write(&path, content).unwrap();
    (dir, path)
}

/// Helper to open a handle that records its events
fn open_recorded(path: &Path) -> (Rc<RecordingObserver>, ResourceHandle) {
    let recorder = Rc::new(RecordingObserver::new());
    let observer: Rc<dyn LifecycleObserver> = recorder.clone();
    let handle: ResourceHandle = ResourceHandle::try_open_with(path, observer).unwrap();
    (recorder, handle)
}

#[test]
fn test_read_all_in_order() {
    let (_dir, path) = scratch_file("a\nb\n");
    let (recorder, mut handle) = open_recorded(&path);

    assert_eq!(handle.read_all().unwrap(), vec!["a", "b"]);
    assert_eq!(recorder.lines_for(handle.id()), vec!["a", "b"]);
}

#[test]
fn test_final_line_without_terminator() {
    let (_dir, path) = scratch_file("a\nb");
    let (_, mut handle) = open_recorded(&path);
    assert_eq!(handle.read_all().unwrap(), vec!["a", "b"]);

    let (_dir, path) = scratch_file("");
    let (_, mut handle) = open_recorded(&path);
    assert!(handle.read_all().unwrap().is_empty());
}

#[test]
fn test_read_reports_stream_status() {
    let (_dir, path) = scratch_file("only\n");
    let (recorder, mut handle) = open_recorded(&path);
    handle.read_all().unwrap();

    let status = recorder
        .events()
        .into_iter()
        .find_map(|e| match e {
            Event::StreamStatus { status, .. } => Some(status),
            _ => None,
        })
        .unwrap();
    assert!(status.open);
    assert!(status.eof);
    assert!(!status.failed);
}

#[test]
fn test_read_all_survives_invalid_utf8() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("read.txt");
    fs::write(&path, b"ok\n\xff\xfe\nafter\n").unwrap();
    let (_, mut handle) = open_recorded(&path);

    for _ in 0..2 {
        let lines = handle.read_all().unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ok");
        assert_eq!(lines[2], "after");
    }
    assert_eq!(handle.state(), HandleState::Owning);
}

#[test]
fn test_read_twice_gives_same_lines() {
    let (_dir, path) = scratch_file("a\nb\n");
    let (_, mut handle) = open_recorded(&path);

    let first = handle.read_all().unwrap();
    let second = handle.read_all().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_transfer_then_write() {
    let (_dir, path) = scratch_file("a\nb\n");
    let (recorder, mut a) = open_recorded(&path);
    let mut b = ResourceHandle::transfer_from(&mut a);

    b.write_line("x").unwrap();
    assert_eq!(b.read_all().unwrap(), vec!["a", "b", "x"]);
    assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\nx\n");

    recorder.clear();
    assert!(a.read_all().unwrap().is_empty());
    assert_eq!(a.state(), HandleState::Emptied);
    assert_eq!(recorder.events(), vec![Event::Uninitialized { id: a.id() }]);
}

#[test]
fn test_write_on_emptied_handle_fails() {
    let (_dir, path) = scratch_file("");
    let (_, mut a) = open_recorded(&path);
    let _b = ResourceHandle::transfer_from(&mut a);

    let result = a.write_line("lost");
    assert!(matches!(result, Err(HandleError::Write { .. })));
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn test_open_in_missing_directory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("no_such_dir").join("read.txt");

    let result = ResourceHandle::try_open(&path);
    assert!(matches!(result, Err(HandleError::Open { .. })));

    let mut handle = ResourceHandle::new(&path);
    assert_eq!(handle.state(), HandleState::Uninitialized);
    assert!(!handle.is_valid());
    assert!(handle.read_all().unwrap().is_empty());
    assert!(handle.write_line("x").is_err());
}

#[test]
fn test_open_creates_missing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fresh.txt");

    let mut handle = ResourceHandle::try_open(&path).unwrap();
    handle.write_line("first").unwrap();
    assert_eq!(handle.read_all().unwrap(), vec!["first"]);
}

#[test]
fn test_assign_releases_destination_file() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.txt");
    fs::write(&first, "one\n").unwrap();
    fs::write(&second, "two\n").unwrap();

    let (recorder, mut a) = open_recorded(&first);
    let observer: Rc<dyn LifecycleObserver> = recorder.clone();
    let mut b: ResourceHandle = ResourceHandle::open_with(&second, observer);

    a.assign_from(&mut b);
    assert_eq!(
        recorder.count(|e| *e == Event::Superseded { id: a.id(), path: first.clone() }),
        1
    );
    assert_eq!(recorder.count(|e| matches!(e, Event::Released { .. })), 0);
    assert_eq!(a.path(), second.as_path());
    assert_eq!(a.read_all().unwrap(), vec!["two"]);
    assert_eq!(b.state(), HandleState::Emptied);
    assert!(b.path().as_os_str().is_empty());
}

#[test]
fn test_every_file_closed_once() {
    let (_dir, path) = scratch_file("a\n");
    let (recorder, mut a) = open_recorded(&path);
    {
        let mut b = ResourceHandle::transfer_from(&mut a);
        let mut c = ResourceHandle::transfer_from(&mut b);
        a.assign_from(&mut c);
    }
    a.close().unwrap();
    a.close().unwrap();
    drop(a);

    assert_eq!(
        recorder.count(|e| matches!(e, Event::Released { closed: true, .. })),
        1
    );
    // One release report per handle
    assert_eq!(recorder.count(|e| matches!(e, Event::Released { .. })), 3);
}

#[test]
fn test_random_handoff_keeps_every_line() {
    let (_dir, path) = scratch_file("");
    let (_, mut owner) = open_recorded(&path);
    let mut spare = ResourceHandle::transfer_from(&mut owner);
    std::mem::swap(&mut owner, &mut spare);

    let mut rng = rand::thread_rng();
    let mut expected = Vec::new();

    for _ in 0..20 {
        let line = format!("line {}", rng.gen_range(0..1000));
        owner.write_line(&line).unwrap();
        expected.push(line);

        if rng.gen_bool(0.5) {
            spare.assign_from(&mut owner);
        } else {
            spare = ResourceHandle::transfer_from(&mut owner);
        }
        std::mem::swap(&mut owner, &mut spare);

        assert_eq!(owner.state(), HandleState::Owning);
        assert_eq!(spare.state(), HandleState::Emptied);
    }

    info!("Wrote {} lines through handed-off handles", expected.len());
    assert_eq!(owner.read_all().unwrap(), expected);
}

#[test]
fn test_demo_sequence() {
    let (_dir, path) = scratch_file("start\n");
    let (recorder, mut first) = open_recorded(&path);

    first.read_all().unwrap();
    first.write_line("Hello, my friend!").unwrap();

    let mut second = ResourceHandle::transfer_from(&mut first);
    second.read_all().unwrap();
    second.write_line("second").unwrap();
    assert_eq!(
        second.read_all().unwrap(),
        vec!["start", "Hello, my friend!", "second"]
    );

    first.assign_from(&mut second);
    assert_eq!(first.read_all().unwrap().len(), 3);
    assert!(second.read_all().unwrap().is_empty());

    let first_id = first.id();
    let second_id = second.id();
    drop(first);
    drop(second);

    assert!(recorder
        .events()
        .contains(&Event::Released { id: first_id, closed: true }));
    assert!(recorder
        .events()
        .contains(&Event::Released { id: second_id, closed: false }));
}
