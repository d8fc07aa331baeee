//! RAII File Handle
//!
//! A single-owner wrapper around an open text file. The file is acquired when the
//! handle is constructed and released when the handle is dropped. Handles cannot be
//! duplicated; ownership of the open file moves between handles only through an
//! explicit transfer, which leaves the source handle empty.

pub mod handle;
pub mod observer;
pub mod stream;

// Re-export core types for convenience
pub use crate::error::{HandleError, Result};
pub use handle::{HandleState, ResourceHandle};
pub use observer::{Event, LifecycleObserver, LogObserver, RecordingObserver};
pub use stream::{FileStream, StdFileStream, StreamStatus};

/// Core error handling types for file handles
pub mod error {
    use std::io;
    use std::path::PathBuf;

    use thiserror::Error;

    /// Result type for handle operations
    pub type Result<T> = std::result::Result<T, HandleError>;

    /// Failures surfaced by [`crate::ResourceHandle`].
    ///
    /// Operating on a handle that holds no file at all is not an error for reads;
    /// check [`crate::ResourceHandle::state`] for that.
    #[derive(Debug, Error)]
    pub enum HandleError {
        /// The backing file could not be opened.
        #[error("could not open {}: {source}", path.display())]
        Open {
            path: PathBuf,
            #[source]
            source: io::Error,
        },

        /// Write attempted without an open file.
        #[error("error writing {}: {reason}", path.display())]
        Write { path: PathBuf, reason: &'static str },

        /// Read attempted on a file that is present but no longer open.
        #[error("error reading {}: {reason}", path.display())]
        Read { path: PathBuf, reason: &'static str },

        /// Closing the backing file failed.
        #[error("could not close {}: {source}", path.display())]
        Close {
            path: PathBuf,
            #[source]
            source: io::Error,
        },

        /// The stream failed part way through an operation.
        #[error("I/O error: {0}")]
        Io(#[from] io::Error),
    }

    /// Reason attached to read and write errors on a closed or missing file.
    pub const NOT_OPEN: &str = "file is not open";
}
