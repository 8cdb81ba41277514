//! Socket-side adapters: [`FramedSocket`] frames chunks onto any async
//! writer; [`SharedSink`] serializes several forwarders onto one socket.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ---

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

// ---

use tether_domain::{ChunkKind, ChunkSink, Result, TetherError};

// ---

use super::codec;

// ---------------------------------------------------------------------------
// FramedSocket
// ---------------------------------------------------------------------------

/// A [`ChunkSink`] over any async writer — a TCP or Unix socket write half,
/// an in-memory duplex, or a plain buffer in tests.
pub struct FramedSocket<W> {
    // ---
    writer: W,

    /// Set once the write half has been shut down. A second shutdown is a
    /// logged no-op rather than an error: the goal state is already reached.
    finished: bool,
}

// ---

impl<W> FramedSocket<W> {
    // ---
    pub fn new(writer: W) -> Self {
        // ---
        Self {
            writer,
            finished: false,
        }
    }
}

// ---

#[async_trait]
impl<W> ChunkSink for FramedSocket<W>
where
    W: AsyncWrite + Unpin + Send,
{
    // ---
    async fn write_chunk(&mut self, kind: ChunkKind, payload: &[u8]) -> Result<()> {
        codec::write_chunk(&mut self.writer, kind, payload).await
    }

    // ---

    async fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .await
            .map_err(|e| TetherError::Write(format!("socket flush: {e}")))
    }

    // ---

    async fn shutdown_write(&mut self) -> Result<()> {
        // ---
        if self.finished {
            tracing::debug!("write half already shut down — skipping");
            return Ok(());
        }
        self.finished = true;
        self.writer
            .shutdown()
            .await
            .map_err(|e| TetherError::Write(format!("socket shutdown: {e}")))
    }
}

// ---------------------------------------------------------------------------
// SharedSink
// ---------------------------------------------------------------------------

/// Cheap-clone handle letting several forwarding directions append chunks
/// to one socket.
///
/// Two guarantees:
///
/// - The lock is held across a whole frame write, so concurrent directions
///   interleave only complete chunks — a reader expecting well-formed
///   frames never observes a torn one.
/// - The underlying write half shuts down only when the *last* registered
///   writer signals end-of-stream. One direction reaching EOF must not pull
///   the socket out from under the others; each forwarder still observes
///   its own shutdown as the final step after its END chunk.
pub struct SharedSink<W> {
    // ---
    inner: Arc<Mutex<FramedSocket<W>>>,

    /// Registered writers that have not yet shut down.
    open_writers: Arc<AtomicUsize>,

    /// Whether this handle counts toward `open_writers`.
    registered: bool,
}

// ---

impl<W> SharedSink<W> {
    // ---
    pub fn new(socket: FramedSocket<W>) -> Self {
        // ---
        Self {
            inner: Arc::new(Mutex::new(socket)),
            open_writers: Arc::new(AtomicUsize::new(0)),
            registered: false,
        }
    }

    // ---

    /// A handle that counts as one writing direction. Hand one of these to
    /// each forwarder sharing the socket; its `shutdown_write` defers the
    /// real half-close until the last registered sibling has also shut
    /// down.
    pub fn register_writer(&self) -> SharedSink<W> {
        // ---
        self.open_writers.fetch_add(1, Ordering::AcqRel);
        SharedSink {
            inner: Arc::clone(&self.inner),
            open_writers: Arc::clone(&self.open_writers),
            registered: true,
        }
    }
}

// ---

impl<W> Clone for SharedSink<W> {
    /// Observer clone — does not count as a writer. Use
    /// [`SharedSink::register_writer`] for handles given to forwarders.
    fn clone(&self) -> Self {
        // ---
        Self {
            inner: Arc::clone(&self.inner),
            open_writers: Arc::clone(&self.open_writers),
            registered: false,
        }
    }
}

// ---

#[async_trait]
impl<W> ChunkSink for SharedSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    // ---
    async fn write_chunk(&mut self, kind: ChunkKind, payload: &[u8]) -> Result<()> {
        self.inner.lock().await.write_chunk(kind, payload).await
    }

    async fn flush(&mut self) -> Result<()> {
        self.inner.lock().await.flush().await
    }

    // ---

    async fn shutdown_write(&mut self) -> Result<()> {
        // ---
        if !self.registered {
            // Unregistered handle: direct pass-through.
            return self.inner.lock().await.shutdown_write().await;
        }

        self.registered = false;
        if self.open_writers.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Last writer out closes the socket.
            self.inner.lock().await.shutdown_write().await
        } else {
            tracing::debug!("write half stays open for remaining directions");
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use std::io::Cursor;

    use tether_domain::{ChunkKind, ChunkSink};

    use super::{FramedSocket, SharedSink};
    use crate::codec::read_chunk;

    // ---

    #[tokio::test]
    async fn frames_land_on_the_writer() {
        // ---
        let mut socket = FramedSocket::new(Vec::new());
        socket.write_chunk(ChunkKind::Stdin, b"abc").await.unwrap();
        socket.write_chunk(ChunkKind::StdinEof, b"").await.unwrap();
        socket.flush().await.unwrap();

        let mut reader = Cursor::new(socket.writer);
        let first = read_chunk(&mut reader).await.unwrap().unwrap();
        assert_eq!(first.kind, ChunkKind::Stdin);
        assert_eq!(first.payload, b"abc");

        let second = read_chunk(&mut reader).await.unwrap().unwrap();
        assert_eq!(second.kind, ChunkKind::StdinEof);
        assert!(second.payload.is_empty());
    }

    // ---

    /// A second shutdown on the same socket is a no-op, not an error —
    /// the goal state is already reached.
    #[tokio::test]
    async fn double_shutdown_is_noop() {
        // ---
        let (near, _far) = tokio::io::duplex(64);
        let mut socket = FramedSocket::new(near);

        socket.shutdown_write().await.unwrap();
        socket.shutdown_write().await.unwrap();
    }

    // ---

    /// Two clones of a shared sink interleave only whole frames.
    #[tokio::test]
    async fn shared_sink_appends_whole_frames() {
        // ---
        let sink = SharedSink::new(FramedSocket::new(Vec::new()));
        let mut a = sink.register_writer();
        let mut b = sink.register_writer();

        let writer_a = tokio::spawn(async move {
            for _ in 0..50 {
                a.write_chunk(ChunkKind::Stdin, b"aaaaaaaa").await.unwrap();
            }
        });
        let writer_b = tokio::spawn(async move {
            for _ in 0..50 {
                b.write_chunk(ChunkKind::Stderr, b"bb").await.unwrap();
            }
        });
        writer_a.await.unwrap();
        writer_b.await.unwrap();

        let buf = {
            let guard = sink.inner.lock().await;
            guard.writer.clone()
        };

        let mut reader = Cursor::new(buf);
        let mut stdin_chunks = 0;
        let mut stderr_chunks = 0;
        while let Some(chunk) = read_chunk(&mut reader).await.unwrap() {
            match chunk.kind {
                ChunkKind::Stdin => {
                    assert_eq!(chunk.payload, b"aaaaaaaa");
                    stdin_chunks += 1;
                }
                ChunkKind::Stderr => {
                    assert_eq!(chunk.payload, b"bb");
                    stderr_chunks += 1;
                }
                other => panic!("unexpected chunk kind {other:?}"),
            }
        }
        assert_eq!(stdin_chunks, 50);
        assert_eq!(stderr_chunks, 50);
    }

    // ---

    /// The socket half-closes only when the last registered writer shuts
    /// down; writes from the surviving direction keep working until then.
    #[tokio::test]
    async fn shutdown_waits_for_last_registered_writer() {
        // ---
        let (near, far) = tokio::io::duplex(4 * 1024);
        let sink = SharedSink::new(FramedSocket::new(near));
        let mut first = sink.register_writer();
        let mut second = sink.register_writer();

        first.write_chunk(ChunkKind::Stdin, b"early").await.unwrap();
        first.shutdown_write().await.unwrap();

        // The other direction is unaffected by its sibling's EOF.
        second.write_chunk(ChunkKind::Stderr, b"late").await.unwrap();
        second.shutdown_write().await.unwrap();

        let (mut far_rx, _far_tx) = tokio::io::split(far);
        let mut kinds = Vec::new();
        while let Some(chunk) = read_chunk(&mut far_rx).await.unwrap() {
            kinds.push(chunk.kind);
        }
        assert_eq!(kinds, [ChunkKind::Stdin, ChunkKind::Stderr]);
    }
}
