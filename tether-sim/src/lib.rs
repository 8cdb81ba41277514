//! In-process mock source and sink for tether unit and integration testing.
//!
//! [`ScriptedSource`] implements [`tether_domain::ByteSource`] from a fixed
//! script of steps instead of a real descriptor: data bursts, end-of-stream,
//! injected poll and read failures — and indefinite idleness once the script
//! runs dry, so stop-responsiveness can be exercised. [`CaptureSink`]
//! implements [`tether_domain::ChunkSink`] by recording every chunk, flush,
//! and shutdown into a [`CaptureLog`] the test inspects afterwards; it can
//! also inject a write failure.
//!
//! # Quick start
//!
//! ```rust
//! use tether_sim::{CaptureSink, ScriptedSource, SourceStep};
//!
//! let (source, stats) = ScriptedSource::new(vec![
//!     SourceStep::Data(b"hello".to_vec()),
//!     SourceStep::Eof,
//! ]);
//! let (sink, log) = CaptureSink::new();
//! ```

mod sink;
mod source;

// --- public API
pub use sink::{CaptureLog, CaptureSink};
pub use source::{ScriptedSource, SourceStats, SourceStep};
