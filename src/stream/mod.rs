//! Host file stream capability
//!
//! The handle only talks to its file through [`FileStream`], so tests can swap in an
//! instrumented stream while the real program uses [`StdFileStream`].

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::Path;

/// Snapshot of a stream's state flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamStatus {
    pub open: bool,
    /// The last read hit end of stream
    pub eof: bool,
    /// The last operation failed at the I/O level
    pub failed: bool,
}

impl StreamStatus {
    /// Open, not at end of stream and no failure recorded
    pub fn is_good(&self) -> bool {
        self.open && !self.eof && !self.failed
    }
}

/// Line-oriented file stream opened in read + append mode
pub trait FileStream: Sized {
    /// Open the file at `path` for reading and appending
    fn open(path: &Path) -> io::Result<Self>;

    fn is_open(&self) -> bool;

    /// Reset the end-of-stream and failure flags
    fn clear(&mut self);

    fn flush(&mut self) -> io::Result<()>;

    /// Move the read position. Writes always go to the end of the file.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// Read one line without its terminator. `None` at end of stream.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Append `text` followed by a line terminator
    fn write_line(&mut self, text: &str) -> io::Result<()>;

    /// Close the underlying file. Closing twice is a no-op.
    fn close(&mut self) -> io::Result<()>;

    fn status(&self) -> StreamStatus;
}

/// [`FileStream`] backed by a [`std::fs::File`]
#[derive(Debug)]
pub struct StdFileStream {
    reader: Option<BufReader<File>>,
    eof: bool,
    failed: bool,
}

impl StdFileStream {
    fn reader(&mut self) -> io::Result<&mut BufReader<File>> {
        self.reader
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stream is closed"))
    }

    /// Record a failure flag for `result` before handing it back
    fn track<T>(&mut self, result: io::Result<T>) -> io::Result<T> {
        if result.is_err() {
            self.failed = true;
        }
        result
    }
}

impl FileStream for StdFileStream {
    fn open(path: &Path) -> io::Result<Self> {
        // Missing files are created, existing content is kept.
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        Ok(Self {
            reader: Some(BufReader::new(file)),
            eof: false,
            failed: false,
        })
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    fn clear(&mut self) {
        self.eof = false;
        self.failed = false;
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = self.reader().and_then(|reader| reader.get_mut().flush());
        self.track(result)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        // BufReader drops its buffer on seek, so stale data never leaks past a rewind.
        let result = self.reader().and_then(|reader| reader.seek(pos));
        self.track(result)
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        // Bytes first: a line that is not valid UTF-8 is decoded lossily, not rejected.
        let mut buf = Vec::new();
        let result = self.reader().and_then(|reader| reader.read_until(b'\n', &mut buf));
        let read = self.track(result)?;

        if read == 0 {
            self.eof = true;
            return Ok(None);
        }

        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn write_line(&mut self, text: &str) -> io::Result<()> {
        let result = self
            .reader()
            .and_then(|reader| writeln!(reader.get_mut(), "{}", text));
        self.track(result)
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(reader) = self.reader.take() {
            let mut file = reader.into_inner();
            file.flush()?;
        }
        Ok(())
    }

    fn status(&self) -> StreamStatus {
        StreamStatus {
            open: self.is_open(),
            eof: self.eof,
            failed: self.failed,
        }
    }
}
