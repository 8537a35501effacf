//! Episode record reader.
//!
//! [`RecordReader`] reads frames from any `Read` source. The header is
//! validated on construction.

use std::io::Read;

use crate::codec::{decode_frame, decode_header};
use crate::error::RecordError;
use crate::types::{Frame, RecordHeader};

/// Reads an episode record from a byte stream.
///
/// Generic over `R: Read` so tests can use `&[u8]` and sessions use
/// `BufReader<File>`.
pub struct RecordReader<R: Read> {
    reader: R,
    header: RecordHeader,
    frames_read: u64,
}

impl<R: Read> RecordReader<R> {
    /// Open a record stream, reading and validating the header.
    pub fn open(mut reader: R) -> Result<Self, RecordError> {
        let header = decode_header(&mut reader)?;
        Ok(Self {
            reader,
            header,
            frames_read: 0,
        })
    }

    /// The record header.
    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    /// Read the next frame, or `None` if the stream is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, RecordError> {
        let frame = decode_frame(&mut self.reader)?;
        if frame.is_some() {
            self.frames_read += 1;
        }
        Ok(frame)
    }

    /// Number of frames read so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Convert into a frame iterator.
    pub fn frames(self) -> FrameIter<R> {
        FrameIter {
            reader: self.reader,
            done: false,
        }
    }
}

/// Iterator adapter over record frames.
pub struct FrameIter<R: Read> {
    reader: R,
    done: bool,
}

impl<R: Read> Iterator for FrameIter<R> {
    type Item = Result<Frame, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match decode_frame(&mut self.reader) {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
