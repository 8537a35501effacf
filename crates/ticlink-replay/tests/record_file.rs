//! Episode records on disk, and segment coverage properties.

use proptest::prelude::*;
use ticlink_replay::{Frame, RecordError, RecordHeader, RecordWriter, Recording};

fn header(button_count: u32) -> RecordHeader {
    RecordHeader {
        engine_version: "stub-1".into(),
        library_version: env!("CARGO_PKG_VERSION").into(),
        episode_seed: 1234,
        config_hash: 0xABCD,
        player_index: 0,
        button_count,
    }
}

#[test]
fn record_survives_file_roundtrip() {
    let path = std::env::temp_dir().join(format!("ticlink-record-{}.tlep", std::process::id()));
    {
        let mut writer = RecordWriter::create(&path, &header(2)).unwrap();
        writer.record_action(0, 3, &[1.0, 0.0]).unwrap();
        writer.record_action(3, 1, &[0.0, 1.0]).unwrap();
        writer.finish(4).unwrap();
    }
    let rec = Recording::open(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(rec.header().episode_seed, 1234);
    assert_eq!(rec.span_count(), 2);
    assert_eq!(rec.end_tic(), Some(4));
    assert_eq!(rec.segment_at(3).values, Some(&[0.0, 1.0][..]));
}

#[test]
fn missing_file_is_io_error() {
    let err = Recording::open(std::path::Path::new("/nonexistent/ticlink.tlep")).unwrap_err();
    assert!(matches!(err, RecordError::Io(_)));
}

#[test]
fn span_past_the_last_tic_is_malformed() {
    let mut buf = Vec::new();
    let mut writer = RecordWriter::new(&mut buf, &header(1)).unwrap();
    writer
        .write_raw_frame(&Frame::Action {
            episode_tic: u64::MAX - 1,
            tics: 10,
            values: vec![1.0],
        })
        .unwrap();
    writer.finish(u64::MAX).unwrap();

    let err = Recording::read_from(buf.as_slice()).unwrap_err();
    assert!(matches!(err, RecordError::MalformedFrame { .. }));
}

proptest! {
    /// Walking the record segment by segment visits every tic up to END
    /// exactly once and agrees with the recorded spans.
    #[test]
    fn segments_tile_the_episode(spans in proptest::collection::vec((0u64..4, 1u32..5), 0..12)) {
        let mut buf = Vec::new();
        let mut writer = RecordWriter::new(&mut buf, &header(1)).unwrap();
        let mut tic = 0u64;
        let mut expected = Vec::new();
        for (i, (gap, len)) in spans.iter().enumerate() {
            tic += gap;
            writer.write_raw_frame(&Frame::Action {
                episode_tic: tic,
                tics: *len,
                values: vec![i as f64],
            }).unwrap();
            for t in tic..tic + *len as u64 {
                expected.push((t, Some(i as f64)));
            }
            tic += *len as u64;
        }
        writer.finish(tic).unwrap();
        let rec = Recording::read_from(buf.as_slice()).unwrap();

        let mut walked = 0u64;
        while walked < tic {
            let seg = rec.segment_at(walked);
            prop_assert!(seg.tics > 0);
            for t in walked..walked + seg.tics {
                if let Some(&(_, v)) = expected.iter().find(|(et, _)| *et == t) {
                    prop_assert_eq!(seg.values.map(|vals| vals[0]), v);
                } else {
                    prop_assert!(seg.values.is_none());
                }
            }
            walked += seg.tics;
        }
        prop_assert_eq!(walked, tic);
        prop_assert_eq!(rec.segment_at(tic).tics, 0);
    }
}
