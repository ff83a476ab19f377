//! Sequential, on-demand reader over the line-oriented input file.
//!
//! The reader never buffers more than one line ahead: [`InputReader::next_line`]
//! is pulled by [`crate::tracker::DataTracker::get_work_batch`] exactly as many
//! times as there are slots left in the batch. This keeps the tracker's memory
//! bounded by `|issued| + |pending_write|` content copies, not by the size of
//! the input file.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{StartupError, StartupResult, TrackerError, TrackerResult};

/// One line of the input file, tagged with its zero-based line index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub work_id: u64,
    pub content: Vec<u8>,
}

/// Opens the input file once and yields `(work_id, content)` pairs in file order.
pub struct InputReader {
    path: PathBuf,
    reader: BufReader<File>,
    offset: u64,
    next_work_id: u64,
    /// Set once a true (zero-byte) end-of-file read has been observed. The
    /// input file is owned exclusively by this process for the run (see
    /// design notes on shared-resource policy), so once set it never clears.
    eof: bool,
}

impl InputReader {
    /// Opens `path`, seeking to `start_offset` and resuming work-id numbering
    /// at `start_work_id`. Both are `0` for a fresh run.
    pub fn open(path: &Path, start_offset: u64, start_work_id: u64) -> StartupResult<Self> {
        let mut file = File::open(path).map_err(|source| StartupError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let len = file
            .metadata()
            .map_err(|source| StartupError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if start_offset > len {
            return Err(StartupError::CheckpointInconsistent {
                path: path.to_path_buf(),
                reason: format!(
                    "checkpoint input_offset {start_offset} is past end of file ({len} bytes); \
                     the input file appears to have been truncated since the checkpoint was taken"
                ),
            });
        }
        if start_offset > 0 {
            file.seek(SeekFrom::Start(start_offset))
                .map_err(|source| StartupError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            offset: start_offset,
            next_work_id: start_work_id,
            eof: false,
        })
    }

    /// Byte offset immediately after the last line successfully emitted.
    /// Safe to persist in a checkpoint: re-opening at this offset resumes
    /// exactly at the next unread line.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// True once the input file has been read to its true end. A trailing
    /// line with no terminating `\n` does *not* set this: it is withheld
    /// until a newline arrives, per the input file format contract.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and returns the next complete line, or `None` if no complete
    /// line is currently available (true EOF, or a trailing line still
    /// missing its terminator).
    pub fn next_line(&mut self) -> TrackerResult<Option<WorkItem>> {
        if self.eof {
            return Ok(None);
        }

        let start_offset = self.offset;
        let mut buf = Vec::new();
        let read = self
            .reader
            .read_until(b'\n', &mut buf)
            .map_err(TrackerError::InputIo)?;

        if read == 0 {
            self.eof = true;
            return Ok(None);
        }

        if buf.last() != Some(&b'\n') {
            // Incomplete trailing line: rewind so a later call re-reads it
            // whole once (if ever) the rest of the line is appended.
            self.reader
                .seek(SeekFrom::Start(start_offset))
                .map_err(TrackerError::InputIo)?;
            return Ok(None);
        }

        buf.pop(); // strip the newline
        self.offset += read as u64;
        let work_id = self.next_work_id;
        self.next_work_id += 1;
        Ok(Some(WorkItem {
            work_id,
            content: buf,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn reads_lines_in_order_and_tracks_offset() {
        let f = write_temp(b"A\nB\nC\n");
        let mut reader = InputReader::open(f.path(), 0, 0).unwrap();

        let a = reader.next_line().unwrap().unwrap();
        assert_eq!(a.work_id, 0);
        assert_eq!(a.content, b"A");
        assert_eq!(reader.offset(), 2);

        let b = reader.next_line().unwrap().unwrap();
        assert_eq!(b.work_id, 1);
        assert_eq!(b.content, b"B");

        let c = reader.next_line().unwrap().unwrap();
        assert_eq!(c.work_id, 2);
        assert_eq!(c.content, b"C");

        assert!(reader.next_line().unwrap().is_none());
        assert!(reader.is_eof());
    }

    #[test]
    fn empty_lines_are_valid_records() {
        let f = write_temp(b"\n\nB\n");
        let mut reader = InputReader::open(f.path(), 0, 0).unwrap();
        assert_eq!(reader.next_line().unwrap().unwrap().content, Vec::<u8>::new());
        assert_eq!(reader.next_line().unwrap().unwrap().content, Vec::<u8>::new());
        assert_eq!(reader.next_line().unwrap().unwrap().content, b"B");
    }

    #[test]
    fn trailing_unterminated_line_is_withheld() {
        let f = write_temp(b"A\nB");
        let mut reader = InputReader::open(f.path(), 0, 0).unwrap();
        assert_eq!(reader.next_line().unwrap().unwrap().content, b"A");
        assert!(reader.next_line().unwrap().is_none());
        assert!(!reader.is_eof());
    }

    #[test]
    fn resumes_from_checkpointed_offset_and_work_id() {
        let f = write_temp(b"A\nB\nC\n");
        // Simulate a checkpoint that already processed "A" (work_id 0, 2 bytes).
        let mut reader = InputReader::open(f.path(), 2, 1).unwrap();
        let item = reader.next_line().unwrap().unwrap();
        assert_eq!(item.work_id, 1);
        assert_eq!(item.content, b"B");
    }

    #[test]
    fn empty_input_file_is_immediately_eof() {
        let f = write_temp(b"");
        let mut reader = InputReader::open(f.path(), 0, 0).unwrap();
        assert!(reader.next_line().unwrap().is_none());
        assert!(reader.is_eof());
    }

    #[test]
    fn checkpointed_offset_past_end_of_file_is_fatal() {
        let f = write_temp(b"A\nB\n");
        let err = InputReader::open(f.path(), 100, 5).unwrap_err();
        assert!(matches!(err, StartupError::CheckpointInconsistent { .. }));
    }
}
