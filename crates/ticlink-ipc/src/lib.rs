//! Command channel and shared state buffer between the controller and the
//! engine process.
//!
//! Two channels connect the sides:
//!
//! - a request/acknowledgment channel ([`transport`]) carrying small
//!   framed messages ([`protocol`], [`codec`]), and
//! - a memory-mapped state buffer ([`region`]) holding the bulk
//!   observation data, laid out by [`layout`].
//!
//! Every mutation the engine makes to the state buffer happens while it
//! handles a request, before it sends the acknowledgment. The controller
//! reads the buffer only after receiving that acknowledgment.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod codec;
pub mod layout;
pub mod protocol;
pub mod region;
pub mod transport;

pub use codec::WireError;
pub use layout::BufferLayout;
pub use protocol::{
    AdvanceReport, EngineStatus, Envelope, InputSpan, Reply, Request, PROTOCOL_VERSION,
};
pub use region::{default_region_dir, unique_region_path, RegionStatus, SharedRegion};
pub use transport::{
    memory_pair, EngineEndpoint, MemoryEndpoint, MemoryTransport, StreamEndpoint,
    StreamTransport, Transport,
};
