//! A fully loaded episode record, indexed by episode tic.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::RecordError;
use crate::reader::RecordReader;
use crate::types::{Frame, RecordHeader};

#[derive(Clone, Debug, PartialEq)]
struct Span {
    start: u64,
    tics: u32,
    values: Vec<f64>,
}

impl Span {
    // Spans are checked on load to end at a representable tic.
    fn end(&self) -> u64 {
        self.start + self.tics as u64
    }
}

/// The recorded input at one episode tic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment<'a> {
    /// Action applied from this tic, or `None` where nothing was recorded
    /// (the player idled).
    pub values: Option<&'a [f64]>,
    /// Tics until the recorded input changes or the episode ends.
    /// `u64::MAX` past the last span of a record without an END frame.
    pub tics: u64,
}

/// A whole episode record, validated and indexed.
#[derive(Clone, Debug, PartialEq)]
pub struct Recording {
    header: RecordHeader,
    spans: Vec<Span>,
    end_tic: Option<u64>,
}

impl Recording {
    /// Load the record at `path`.
    pub fn open(path: &Path) -> Result<Self, RecordError> {
        Self::read_from(BufReader::new(File::open(path)?))
    }

    /// Load a record from any byte stream.
    ///
    /// Rejects action spans that overlap or go backwards, action vectors of
    /// the wrong length, and frames after the END frame. A record without
    /// an END frame (its session died mid-episode) is accepted.
    pub fn read_from<R: Read>(reader: R) -> Result<Self, RecordError> {
        let reader = RecordReader::open(reader)?;
        let header = reader.header().clone();
        let button_count = header.button_count as usize;
        let mut spans: Vec<Span> = Vec::new();
        let mut end_tic = None;

        for frame in reader.frames() {
            let frame = frame?;
            if end_tic.is_some() {
                return Err(RecordError::MalformedFrame {
                    detail: "frame after END".into(),
                });
            }
            let last_end = spans.last().map_or(0, Span::end);
            match frame {
                Frame::Action {
                    episode_tic,
                    tics,
                    values,
                } => {
                    if values.len() != button_count {
                        return Err(RecordError::MalformedFrame {
                            detail: format!(
                                "action at tic {episode_tic} has {} values, header says {button_count}",
                                values.len()
                            ),
                        });
                    }
                    if episode_tic < last_end {
                        return Err(RecordError::MalformedFrame {
                            detail: format!(
                                "action at tic {episode_tic} overlaps span ending at {last_end}"
                            ),
                        });
                    }
                    if episode_tic.checked_add(tics as u64).is_none() {
                        return Err(RecordError::MalformedFrame {
                            detail: format!(
                                "action at tic {episode_tic} held for {tics} tics runs past the last tic"
                            ),
                        });
                    }
                    if tics > 0 {
                        spans.push(Span {
                            start: episode_tic,
                            tics,
                            values,
                        });
                    }
                }
                Frame::End { episode_tic } => {
                    if episode_tic < last_end {
                        return Err(RecordError::MalformedFrame {
                            detail: format!(
                                "END at tic {episode_tic} precedes span ending at {last_end}"
                            ),
                        });
                    }
                    end_tic = Some(episode_tic);
                }
            }
        }

        Ok(Self {
            header,
            spans,
            end_tic,
        })
    }

    /// The record header.
    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    /// Episode tic of the END frame, if the record has one.
    pub fn end_tic(&self) -> Option<u64> {
        self.end_tic
    }

    /// Number of recorded action spans.
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Check that the record can drive a session with configuration
    /// fingerprint `current` as player `player`.
    pub fn verify(&self, current: u64, player: u8) -> Result<(), RecordError> {
        if self.header.config_hash != current {
            return Err(RecordError::ConfigMismatch {
                recorded: self.header.config_hash,
                current,
            });
        }
        if self.header.player_index != player {
            return Err(RecordError::PlayerMismatch {
                recorded: self.header.player_index,
                requested: player,
            });
        }
        Ok(())
    }

    /// The recorded input at `episode_tic`.
    pub fn segment_at(&self, episode_tic: u64) -> Segment<'_> {
        let limit = match self.end_tic {
            Some(end) if episode_tic >= end => {
                return Segment {
                    values: None,
                    tics: 0,
                }
            }
            Some(end) => end - episode_tic,
            None => u64::MAX,
        };
        // Index of the first span starting after `episode_tic`.
        let next = self.spans.partition_point(|s| s.start <= episode_tic);
        if let Some(span) = next.checked_sub(1).map(|i| &self.spans[i]) {
            if episode_tic < span.end() {
                return Segment {
                    values: Some(&span.values),
                    tics: (span.end() - episode_tic).min(limit),
                };
            }
        }
        let tics = match self.spans.get(next) {
            Some(span) => (span.start - episode_tic).min(limit),
            None => limit,
        };
        Segment { values: None, tics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::RecordWriter;

    fn header() -> RecordHeader {
        RecordHeader {
            engine_version: "test".into(),
            library_version: "0.1.0".into(),
            episode_seed: 9,
            config_hash: 77,
            player_index: 0,
            button_count: 1,
        }
    }

    fn load(frames: &[Frame]) -> Result<Recording, RecordError> {
        let mut buf = Vec::new();
        let mut writer = RecordWriter::new(&mut buf, &header()).unwrap();
        for frame in frames {
            writer.write_raw_frame(frame).unwrap();
        }
        Recording::read_from(buf.as_slice())
    }

    fn action(episode_tic: u64, tics: u32, v: f64) -> Frame {
        Frame::Action {
            episode_tic,
            tics,
            values: vec![v],
        }
    }

    #[test]
    fn segments_split_at_span_boundaries() {
        let rec = load(&[
            action(0, 4, 1.0),
            action(6, 2, 2.0),
            Frame::End { episode_tic: 10 },
        ])
        .unwrap();
        assert_eq!(
            rec.segment_at(1),
            Segment {
                values: Some(&[1.0][..]),
                tics: 3
            }
        );
        // Gap between spans: idle until the next span.
        assert_eq!(
            rec.segment_at(4),
            Segment {
                values: None,
                tics: 2
            }
        );
        assert_eq!(rec.segment_at(7).values, Some(&[2.0][..]));
        // After the last span: idle until END.
        assert_eq!(
            rec.segment_at(8),
            Segment {
                values: None,
                tics: 2
            }
        );
        assert_eq!(rec.segment_at(10).tics, 0);
        assert_eq!(rec.end_tic(), Some(10));
    }

    #[test]
    fn missing_end_is_open_ended() {
        let rec = load(&[action(0, 2, 1.0)]).unwrap();
        assert_eq!(rec.end_tic(), None);
        assert_eq!(rec.segment_at(5).tics, u64::MAX);
    }

    #[test]
    fn overlapping_spans_rejected() {
        let err = load(&[action(0, 4, 1.0), action(2, 1, 0.0)]).unwrap_err();
        assert!(matches!(err, RecordError::MalformedFrame { .. }));
    }

    #[test]
    fn frames_after_end_rejected() {
        let err = load(&[Frame::End { episode_tic: 0 }, action(0, 1, 1.0)]).unwrap_err();
        assert!(matches!(err, RecordError::MalformedFrame { .. }));
    }

    #[test]
    fn verify_checks_config_and_player() {
        let rec = load(&[Frame::End { episode_tic: 0 }]).unwrap();
        assert!(rec.verify(77, 0).is_ok());
        assert!(matches!(
            rec.verify(78, 0),
            Err(RecordError::ConfigMismatch {
                recorded: 77,
                current: 78
            })
        ));
        assert!(matches!(
            rec.verify(77, 1),
            Err(RecordError::PlayerMismatch {
                recorded: 0,
                requested: 1
            })
        ));
    }
}
