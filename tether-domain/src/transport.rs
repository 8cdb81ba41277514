use async_trait::async_trait;

use super::chunk::ChunkKind;
use super::error::Result;

// ---------------------------------------------------------------------------
// ByteSource
// ---------------------------------------------------------------------------

/// A readable end of one logical stream direction.
///
/// Implemented by adapters over real descriptors, network sockets, and
/// in-memory buffers alike, so the forwarding loop never cares which it is
/// driving. Exclusively owned by one forwarder for the duration of its run.
///
/// `#[async_trait]` keeps the trait dyn-compatible so test doubles and real
/// adapters can stand in for each other behind the same bound.
#[async_trait]
pub trait ByteSource: Send {
    // ---
    /// Wait until at least one byte (or end-of-stream) is observable.
    ///
    /// Unbounded on its own — the readiness poller wraps this in a short
    /// timeout so a stop request is never starved. An `Err` here means the
    /// source is gone (descriptor invalid, channel torn down) and the
    /// forwarding loop must end without touching the source again.
    async fn readable(&mut self) -> Result<()>;

    /// Read up to `buf.len()` bytes. `Ok(0)` signals end-of-stream.
    ///
    /// Must not lose or duplicate bytes relative to an earlier `readable`
    /// probe: anything a probe observed is handed out here first.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

// ---------------------------------------------------------------------------
// ChunkSink
// ---------------------------------------------------------------------------

/// The writable end of the shared socket, framed at chunk granularity.
///
/// A sink write is all-or-nothing at the frame level: implementations must
/// never interleave a partial frame with another writer's bytes. Sharing
/// one socket between directions therefore goes through a serializing
/// wrapper that holds its lock across the whole frame.
#[async_trait]
pub trait ChunkSink: Send {
    // ---
    /// Frame `(kind, payload)` and send every byte of it.
    async fn write_chunk(&mut self, kind: ChunkKind, payload: &[u8]) -> Result<()>;

    /// Push any buffered frames down to the peer.
    async fn flush(&mut self) -> Result<()>;

    /// Half-close the write direction. The read half, if any, stays open.
    ///
    /// Called once, strictly after the terminal chunk has been flushed, so
    /// the peer always sees the EOF marker before the FIN.
    async fn shutdown_write(&mut self) -> Result<()>;
}
