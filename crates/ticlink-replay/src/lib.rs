//! Episode recording and playback for ticlink sessions.
//!
//! An episode record captures everything needed to re-drive an episode
//! deterministically: the episode seed, a fingerprint of the
//! simulation-relevant configuration, and the action applied over each
//! span of episode tics.
//!
//! # Architecture
//!
//! - [`RecordWriter`] streams frames to any `Write` sink
//! - [`RecordReader`] reads frames back from any `Read` source
//! - [`Recording`] loads a whole record and answers "which action applies
//!   at episode tic N, and for how long"
//! - All I/O uses a custom binary codec (no serde dependency)
//!
//! # Format
//!
//! ```text
//! [MAGIC "TLEP"] [VERSION u8] [RecordHeader]
//! [Frame 1] [Frame 2] ... [END frame]
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod hash;
pub mod reader;
pub mod recording;
pub mod types;
pub mod writer;

pub use error::RecordError;
pub use hash::config_hash;
pub use reader::{FrameIter, RecordReader};
pub use recording::{Recording, Segment};
pub use types::{Frame, RecordHeader};
pub use writer::RecordWriter;

/// Magic bytes at the start of every episode record.
pub const MAGIC: [u8; 4] = *b"TLEP";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;
