//! Lifecycle diagnostics for file handles
//!
//! Handles report what happens to them through a [`LifecycleObserver`] instead of
//! printing directly, so ownership behaviour can be checked without a console.

use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;

use log::{log, Level};

use crate::stream::StreamStatus;

/// Something that happened to a handle, tagged with the handle's id
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Opened { id: u64, path: PathBuf },
    OpenFailed { id: u64, path: PathBuf, reason: String },
    Constructed { id: u64 },
    /// A new handle took the file of `from`
    Transferred { from: u64, to: u64 },
    /// An existing handle took the file of `from`
    Assigned { from: u64, to: u64 },
    /// One line produced by a read
    Line { id: u64, text: String },
    StreamStatus { id: u64, status: StreamStatus },
    /// A read on a handle that holds no file
    Uninitialized { id: u64 },
    OperationFailed { id: u64, message: String },
    /// The handle closed the file at `path` to take over another one by assignment
    Superseded { id: u64, path: PathBuf },
    /// The handle let go of its file. `closed` is false when there was nothing to close.
    Released { id: u64, closed: bool },
}

impl Event {
    /// Id of the handle the event is about (the receiving side for transfers)
    pub fn handle_id(&self) -> u64 {
        match self {
            Event::Opened { id, .. }
            | Event::OpenFailed { id, .. }
            | Event::Constructed { id }
            | Event::Line { id, .. }
            | Event::StreamStatus { id, .. }
            | Event::Uninitialized { id }
            | Event::OperationFailed { id, .. }
            | Event::Superseded { id, .. }
            | Event::Released { id, .. } => *id,
            Event::Transferred { to, .. } | Event::Assigned { to, .. } => *to,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Opened { id, path } => {
                write!(f, "[{}] file {} has been opened", id, path.display())
            }
            Event::OpenFailed { id, path, reason } => {
                write!(f, "[{}] could not open {}: {}", id, path.display(), reason)
            }
            Event::Constructed { id } => write!(f, "[{}] handle constructed", id),
            Event::Transferred { from, to } => {
                write!(f, "[{}] took ownership from [{}] (transfer)", to, from)
            }
            Event::Assigned { from, to } => {
                write!(f, "[{}] took ownership from [{}] (assignment)", to, from)
            }
            Event::Line { text, .. } => write!(f, "{}", text),
            Event::StreamStatus { id, status } => write!(
                f,
                "[{}] stream status: good: {}, eof: {}, failed: {}",
                id,
                status.is_good(),
                status.eof,
                status.failed
            ),
            Event::Uninitialized { id } => write!(f, "[{}] handle has no open file", id),
            Event::OperationFailed { id, message } => write!(f, "[{}] {}", id, message),
            Event::Superseded { id, path } => {
                write!(f, "[{}] closed {} to take over another file", id, path.display())
            }
            Event::Released { id, closed: true } => {
                write!(f, "[{}] released: file closed", id)
            }
            Event::Released { id, closed: false } => {
                write!(f, "[{}] released: nothing to close", id)
            }
        }
    }
}

/// Receives lifecycle events from handles
pub trait LifecycleObserver {
    fn notify(&self, event: &Event);
}

/// Forwards events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl LogObserver {
    /// Log level an event is written at
    pub fn level(event: &Event) -> Level {
        match event {
            Event::OpenFailed { .. } | Event::OperationFailed { .. } => Level::Error,
            Event::Uninitialized { .. } => Level::Warn,
            Event::StreamStatus { .. } => Level::Debug,
            Event::Opened { .. }
            | Event::Constructed { .. }
            | Event::Line { .. }
            | Event::Transferred { .. }
            | Event::Assigned { .. }
            | Event::Superseded { .. }
            | Event::Released { .. } => Level::Info,
        }
    }
}

impl LifecycleObserver for LogObserver {
    fn notify(&self, event: &Event) {
        log!(Self::level(event), "{}", event);
    }
}

/// Keeps every event in memory, in order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: RefCell<Vec<Event>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Text of every line read through handle `id`
    pub fn lines_for(&self, id: u64) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|event| event.handle_id() == id)
            .filter_map(|event| match event {
                Event::Line { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded events matching `predicate`
    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| predicate(event)).count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl LifecycleObserver for RecordingObserver {
    fn notify(&self, event: &Event) {
        self.events.borrow_mut().push(event.clone());
    }
}
