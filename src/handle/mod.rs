//! Exclusive-ownership file handle
//!
//! A [`ResourceHandle`] opens its file when it is built and closes it when it is
//! dropped. It implements neither `Clone` nor `Copy`, so exactly one handle can own a
//! given open file. Ownership moves with [`ResourceHandle::transfer_from`] and
//! [`ResourceHandle::assign_from`], which leave the source handle empty.

use std::fmt;
use std::io::SeekFrom;
use std::mem;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{HandleError, Result, NOT_OPEN};
use crate::observer::{Event, LifecycleObserver, LogObserver};
use crate::stream::{FileStream, StdFileStream};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Where a handle is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Never acquired a file (opening failed)
    Uninitialized,
    /// Holds an open file
    Owning,
    /// Its file was transferred to another handle
    Emptied,
    /// Released its file through [`ResourceHandle::close`]
    Closed,
}

/// Single owner of an open text file.
///
/// Handles cannot be duplicated:
///
/// ```compile_fail
/// use raii_file_handle::ResourceHandle;
///
/// let a = ResourceHandle::new("read.txt");
/// let b = a.clone();
/// ```
///
/// and a handle cannot take ownership from itself:
///
/// ```compile_fail
/// use raii_file_handle::ResourceHandle;
///
/// let mut a = ResourceHandle::new("read.txt");
/// a.assign_from(&mut a);
/// ```
pub struct ResourceHandle<S: FileStream = StdFileStream> {
    id: u64,
    path: PathBuf,
    stream: Option<S>,
    /// Set once the handle has let go of its file for good
    released: bool,
    /// Set when the file was transferred away
    emptied: bool,
    observer: Rc<dyn LifecycleObserver>,
}

impl ResourceHandle<StdFileStream> {
    /// Open `path`, reporting to the log.
    ///
    /// Never fails: if the file cannot be opened the failure is logged and the handle
    /// is left [`HandleState::Uninitialized`].
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::open_with(path, Rc::new(LogObserver))
    }

    /// Open `path`, reporting to the log, and return the open failure if there is one
    pub fn try_open(path: impl AsRef<Path>) -> Result<Self> {
        Self::try_open_with(path, Rc::new(LogObserver))
    }
}

impl<S: FileStream> ResourceHandle<S> {
    /// Open `path` and report to `observer`. See [`ResourceHandle::new`].
    pub fn open_with(path: impl AsRef<Path>, observer: Rc<dyn LifecycleObserver>) -> Self {
        Self::acquire(path.as_ref(), observer).0
    }

    /// Open `path` and report to `observer`, failing with [`HandleError::Open`]
    pub fn try_open_with(
        path: impl AsRef<Path>,
        observer: Rc<dyn LifecycleObserver>,
    ) -> Result<Self> {
        match Self::acquire(path.as_ref(), observer) {
            (handle, None) => Ok(handle),
            (_, Some(err)) => Err(err),
        }
    }

    fn acquire(path: &Path, observer: Rc<dyn LifecycleObserver>) -> (Self, Option<HandleError>) {
        let id = next_id();
        let (stream, failure) = match S::open(path) {
            Ok(stream) => {
                observer.notify(&Event::Opened {
                    id,
                    path: path.to_path_buf(),
                });
                (Some(stream), None)
            }
            Err(source) => {
                observer.notify(&Event::OpenFailed {
                    id,
                    path: path.to_path_buf(),
                    reason: source.to_string(),
                });
                let err = HandleError::Open {
                    path: path.to_path_buf(),
                    source,
                };
                (None, Some(err))
            }
        };
        observer.notify(&Event::Constructed { id });

        let handle = Self {
            id,
            path: path.to_path_buf(),
            stream,
            released: false,
            emptied: false,
            observer,
        };
        (handle, failure)
    }

    /// Build a new handle that takes over the file owned by `source`.
    ///
    /// `source` keeps existing but holds nothing afterwards: its path is cleared and
    /// it is [`HandleState::Emptied`] unless it was already closed.
    pub fn transfer_from(source: &mut Self) -> Self {
        let handle = Self {
            id: next_id(),
            path: mem::take(&mut source.path),
            stream: source.stream.take(),
            released: false,
            emptied: false,
            observer: Rc::clone(&source.observer),
        };
        source.emptied = true;

        handle.observer.notify(&Event::Transferred {
            from: source.id,
            to: handle.id,
        });
        handle
    }

    /// Take over the file owned by `source`, closing the file this handle held first.
    ///
    /// A failure closing the old file is reported to the observer only; the old file
    /// is gone either way and the new one is adopted.
    pub fn assign_from(&mut self, source: &mut Self) -> &mut Self {
        if self.release_stream() {
            self.observer.notify(&Event::Superseded {
                id: self.id,
                path: self.path.clone(),
            });
        }

        self.path = mem::take(&mut source.path);
        self.stream = source.stream.take();
        self.released = false;
        self.emptied = self.stream.is_none();
        source.emptied = true;

        self.observer.notify(&Event::Assigned {
            from: source.id,
            to: self.id,
        });
        self
    }

    /// Append `text` and a line terminator to the file
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        let result = match self.stream.as_mut() {
            Some(stream) if stream.is_open() => Self::append(stream, text),
            _ => Err(HandleError::Write {
                path: self.path.clone(),
                reason: NOT_OPEN,
            }),
        };
        self.check(result)
    }

    fn append(stream: &mut S, text: &str) -> Result<()> {
        stream.clear();
        stream.flush()?;
        stream.write_line(text)?;
        Ok(())
    }

    /// Read every line of the file from the start, reporting each to the observer.
    ///
    /// A handle holding no file reports [`Event::Uninitialized`] and returns no lines.
    /// The file's final line terminator never produces an extra empty line.
    pub fn read_all(&mut self) -> Result<Vec<String>> {
        let id = self.id;
        let observer = Rc::clone(&self.observer);

        let result = match self.stream.as_mut() {
            None => {
                observer.notify(&Event::Uninitialized { id });
                return Ok(Vec::new());
            }
            Some(stream) if stream.is_open() => Self::read_lines(id, stream, observer.as_ref()),
            Some(_) => Err(HandleError::Read {
                path: self.path.clone(),
                reason: NOT_OPEN,
            }),
        };
        self.check(result)
    }

    fn read_lines(id: u64, stream: &mut S, observer: &dyn LifecycleObserver) -> Result<Vec<String>> {
        stream.clear();
        stream.flush()?;
        stream.seek(SeekFrom::Start(0))?;

        let mut lines = Vec::new();
        while let Some(text) = stream.read_line()? {
            observer.notify(&Event::Line {
                id,
                text: text.clone(),
            });
            lines.push(text);
        }

        observer.notify(&Event::StreamStatus {
            id,
            status: stream.status(),
        });
        Ok(lines)
    }

    /// Close the file now instead of at drop. Closing again does nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let result = match self.stream.take() {
            Some(mut stream) => {
                let closed = stream.close().map_err(|source| HandleError::Close {
                    path: self.path.clone(),
                    source,
                });
                self.observer.notify(&Event::Released {
                    id: self.id,
                    closed: true,
                });
                closed
            }
            None => {
                self.observer.notify(&Event::Released {
                    id: self.id,
                    closed: false,
                });
                Ok(())
            }
        };
        self.check(result)
    }

    /// Drop the owned stream, closing it. Returns whether there was one.
    fn release_stream(&mut self) -> bool {
        let Some(mut stream) = self.stream.take() else {
            return false;
        };
        if let Err(err) = stream.close() {
            self.observer.notify(&Event::OperationFailed {
                id: self.id,
                message: format!("could not close {}: {}", self.path.display(), err),
            });
        }
        true
    }

    /// Report an error to the observer before handing it back
    fn check<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.observer.notify(&Event::OperationFailed {
                id: self.id,
                message: err.to_string(),
            });
        }
        result
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Path of the owned file. Empty once ownership has moved away.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> HandleState {
        if self.released {
            return HandleState::Closed;
        }
        match &self.stream {
            Some(stream) if stream.is_open() => HandleState::Owning,
            _ if self.emptied => HandleState::Emptied,
            _ => HandleState::Uninitialized,
        }
    }

    /// True only while the handle owns an open file
    pub fn is_valid(&self) -> bool {
        self.state() == HandleState::Owning
    }

    /// Whether a stream object is held at all, open or not
    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }
}

impl<S: FileStream> fmt::Debug for ResourceHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("state", &self.state())
            .finish()
    }
}

impl<S: FileStream> Drop for ResourceHandle<S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let closed = self.release_stream();
        self.observer.notify(&Event::Released {
            id: self.id,
            closed,
        });
    }
}
