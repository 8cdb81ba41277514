//! Core traits and types for the tether streaming bridge.
//!
//! This crate defines the vocabulary of the system. All other crates depend
//! on `tether-domain` and speak its types. No implementations live here.
//!
//! # Structure
//!
//! - [`error`]     — [`TetherError`] and [`Result<T>`] alias
//! - [`chunk`]     — [`ChunkKind`] wire tags and the [`Chunk`] value
//! - [`transport`] — [`ByteSource`], [`ChunkSink`] capability traits

mod chunk;
mod error;
mod transport;

// --- error
pub use error::{Result, TetherError};

// --- chunk
pub use chunk::{Chunk, ChunkKind};

// --- transport
pub use transport::{ByteSource, ChunkSink};
