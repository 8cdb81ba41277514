//! The tether bridge core: chunk framing, readiness polling, and the
//! per-direction stream forwarder.
//!
//! A [`StreamForwarder`] owns one readable source and one chunk sink for
//! exactly one logical stream direction (e.g. local stdin → worker socket).
//! Its loop polls the source with a short timeout, frames whatever bytes
//! arrive into DATA chunks, and on end-of-stream emits the direction's END
//! chunk and half-closes the socket's write side. A separate controller can
//! request a clean stop at any moment; the short poll timeout bounds how
//! long the request waits.
//!
//! [`BridgeController`] is the owning side: it wraps the shared socket in a
//! [`SharedSink`] (whole-frame serialization), spawns one forwarder per
//! direction, and collects [`ForwardEvent`]s.

mod codec;
mod controller;
mod event;
mod forwarder;
mod poll;
mod socket;
mod source;

// --- codec
pub use codec::{read_chunk, write_chunk, CHUNK_HEADER_LEN};

// --- poller
pub use poll::{poll_read_ready, ReadReadiness};

// --- forwarder
pub use forwarder::{
    // ---
    ForwarderConfig,
    ForwarderHandle,
    Running,
    StopHandle,
    StreamForwarder,
};

// --- controller + events
pub use controller::BridgeController;
pub use event::{event_channel, EventTx, ForwardEvent};

// --- adapters
pub use socket::{FramedSocket, SharedSink};
pub use source::ReaderSource;
