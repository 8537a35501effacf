//! Criterion micro-benchmarks for the wire and record codecs.

use std::hint::black_box;
use std::path::PathBuf;

use criterion::{criterion_group, criterion_main, Criterion};
use ticlink_bench::{full_profile, PROFILE_BUTTONS};
use ticlink_core::{StateNumber, Tic};
use ticlink_ipc::codec::{decode_reply, decode_request, encode_reply, encode_request};
use ticlink_ipc::{AdvanceReport, EngineStatus, Envelope, Reply, Request, PROTOCOL_VERSION};
use ticlink_replay::codec::{decode_frame, encode_frame};
use ticlink_replay::Frame;

fn advanced_reply() -> Envelope<Reply> {
    Envelope {
        seq: 7,
        body: Reply::Advanced(AdvanceReport {
            status: EngineStatus {
                tic: Tic(1234),
                episode_tic: 1200,
                state_number: StateNumber(310),
                dead: false,
                episode_finished: false,
            },
            tics_advanced: 4,
            scenario_reward: 1.0,
            died: false,
            applied: Vec::new(),
        }),
    }
}

/// Benchmark: encode and decode the per-step request pair.
fn bench_step_requests(c: &mut Criterion) {
    let set_action = Envelope {
        seq: 5,
        body: Request::SetAction {
            values: vec![1.0; PROFILE_BUTTONS.len()],
        },
    };
    let advance = Envelope {
        seq: 6,
        body: Request::Advance {
            tics: 4,
            update_state: true,
            replaying: false,
        },
    };
    c.bench_function("codec_step_requests", |b| {
        b.iter(|| {
            let a = encode_request(&set_action).unwrap();
            let b2 = encode_request(&advance).unwrap();
            black_box(decode_request(&a).unwrap());
            black_box(decode_request(&b2).unwrap());
        });
    });
}

/// Benchmark: round trip of the advance reply.
fn bench_advance_reply(c: &mut Criterion) {
    let reply = advanced_reply();
    c.bench_function("codec_advance_reply", |b| {
        b.iter(|| {
            let body = encode_reply(&reply).unwrap();
            black_box(decode_reply(&body).unwrap());
        });
    });
}

/// Benchmark: the handshake carrying a full configuration.
fn bench_hello(c: &mut Criterion) {
    let hello = Envelope {
        seq: 1,
        body: Request::Hello {
            protocol_version: PROTOCOL_VERSION,
            region_path: PathBuf::from("/dev/shm/ticlink-bench"),
            episode_seed: 42,
            config: full_profile(42),
        },
    };
    let encoded = encode_request(&hello).unwrap();
    c.bench_function("codec_hello_decode", |b| {
        b.iter(|| black_box(decode_request(&encoded).unwrap()));
    });
}

/// Benchmark: encode then decode 256 action frames of an episode record.
fn bench_record_frames(c: &mut Criterion) {
    let frames: Vec<Frame> = (0..256u64)
        .map(|i| Frame::Action {
            episode_tic: i * 4,
            tics: 4,
            values: vec![(i % 2) as f64; PROFILE_BUTTONS.len()],
        })
        .collect();
    c.bench_function("codec_record_256_frames", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(16 * 1024);
            for frame in &frames {
                encode_frame(&mut buf, frame).unwrap();
            }
            let mut cursor = buf.as_slice();
            while let Some(frame) = decode_frame(&mut cursor).unwrap() {
                black_box(frame);
            }
        });
    });
}

criterion_group!(
    benches,
    bench_step_requests,
    bench_advance_reply,
    bench_hello,
    bench_record_frames
);
criterion_main!(benches);
