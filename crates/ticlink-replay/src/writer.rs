//! Episode record writer.
//!
//! [`RecordWriter`] streams frames to any `Write` sink. The header is
//! written immediately on construction; [`RecordWriter::finish`] appends
//! the END frame and flushes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::codec::{encode_frame, encode_header};
use crate::error::RecordError;
use crate::types::{Frame, RecordHeader};

/// Writes an episode record to a byte stream.
///
/// Generic over `W: Write` so tests can use `Vec<u8>` and sessions use
/// `BufWriter<File>`.
///
/// # Examples
///
/// ```
/// use ticlink_replay::{Frame, RecordHeader, RecordReader, RecordWriter};
///
/// let header = RecordHeader {
///     engine_version: "stub-1".into(),
///     library_version: "0.1.0".into(),
///     episode_seed: 42,
///     config_hash: 0,
///     player_index: 0,
///     button_count: 2,
/// };
///
/// let mut buf = Vec::new();
/// let mut writer = RecordWriter::new(&mut buf, &header).unwrap();
/// writer.record_action(0, 4, &[1.0, 0.0]).unwrap();
/// writer.finish(4).unwrap();
///
/// let mut reader = RecordReader::open(buf.as_slice()).unwrap();
/// assert_eq!(reader.header(), &header);
/// assert!(matches!(reader.next_frame().unwrap(), Some(Frame::Action { tics: 4, .. })));
/// assert_eq!(reader.next_frame().unwrap(), Some(Frame::End { episode_tic: 4 }));
/// assert!(reader.next_frame().unwrap().is_none());
/// ```
pub struct RecordWriter<W: Write> {
    writer: W,
    button_count: usize,
    frames_written: u64,
}

impl RecordWriter<BufWriter<File>> {
    /// Create (or truncate) `path` and write the header to it.
    pub fn create(path: &Path, header: &RecordHeader) -> Result<Self, RecordError> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), header)
    }
}

impl<W: Write> RecordWriter<W> {
    /// Create a new record writer, immediately writing the header.
    pub fn new(mut writer: W, header: &RecordHeader) -> Result<Self, RecordError> {
        encode_header(&mut writer, header)?;
        Ok(Self {
            writer,
            button_count: header.button_count as usize,
            frames_written: 0,
        })
    }

    /// Record that `values` was applied for `tics` tics starting at
    /// `episode_tic`.
    pub fn record_action(
        &mut self,
        episode_tic: u64,
        tics: u32,
        values: &[f64],
    ) -> Result<(), RecordError> {
        if values.len() != self.button_count {
            return Err(RecordError::MalformedFrame {
                detail: format!(
                    "action has {} values, record expects {}",
                    values.len(),
                    self.button_count
                ),
            });
        }
        self.write_raw_frame(&Frame::Action {
            episode_tic,
            tics,
            values: values.to_vec(),
        })
    }

    /// Write the END frame and flush.
    pub fn finish(&mut self, episode_tic: u64) -> Result<(), RecordError> {
        self.write_raw_frame(&Frame::End { episode_tic })?;
        self.flush()
    }

    /// Write a pre-built frame directly.
    pub fn write_raw_frame(&mut self, frame: &Frame) -> Result<(), RecordError> {
        encode_frame(&mut self.writer, frame)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), RecordError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Consume the writer and return the underlying `Write` sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> RecordHeader {
        RecordHeader {
            engine_version: "test".into(),
            library_version: "0.1.0".into(),
            episode_seed: 1,
            config_hash: 2,
            player_index: 0,
            button_count: 2,
        }
    }

    #[test]
    fn wrong_action_length_rejected() {
        let mut writer = RecordWriter::new(Vec::new(), &header()).unwrap();
        let err = writer.record_action(0, 1, &[1.0]).unwrap_err();
        assert!(matches!(err, RecordError::MalformedFrame { .. }));
        assert_eq!(writer.frames_written(), 0);
    }

    #[test]
    fn finish_appends_end_frame() {
        let mut writer = RecordWriter::new(Vec::new(), &header()).unwrap();
        writer.record_action(0, 2, &[0.0, 1.0]).unwrap();
        writer.finish(2).unwrap();
        assert_eq!(writer.frames_written(), 2);
        let bytes = writer.into_inner();
        assert_eq!(bytes[bytes.len() - 9], crate::types::FRAME_END);
    }
}
