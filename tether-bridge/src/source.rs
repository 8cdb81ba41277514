//! [`ReaderSource`] — adapts any async byte reader to [`ByteSource`].
//!
//! Generic async readers (pipes, socket read halves, in-memory cursors)
//! expose no standalone readiness operation, so readiness here is a staging
//! read: `readable` pulls whatever the reader has into an internal buffer,
//! and `read` drains that buffer before touching the reader again. A
//! readiness probe that the poller cancels at its timeout has consumed
//! nothing (the read future either completes with bytes or is dropped while
//! still pending), so no byte is ever lost or duplicated across probes.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

// ---

use tether_domain::{ByteSource, Result, TetherError};

// ---------------------------------------------------------------------------
// ReaderSource
// ---------------------------------------------------------------------------

/// Default staging capacity. Matches the forwarding loop's default read
/// buffer so one probe fills at most one DATA chunk.
const DEFAULT_STAGE_CAPACITY: usize = 8 * 1024;

// ---

pub struct ReaderSource<R> {
    // ---
    inner: R,

    /// Bytes observed by readiness probes, not yet handed to `read`.
    staged: Vec<u8>,

    /// Scratch buffer for probe reads, reused across iterations.
    probe: Box<[u8]>,

    /// Set when a probe observes end-of-stream. Sticky: once EOF, every
    /// later probe is an immediate `Ok` and every later read returns 0.
    eof: bool,
}

// ---

impl<R> ReaderSource<R> {
    // ---
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_STAGE_CAPACITY)
    }

    // ---

    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        // ---
        Self {
            inner,
            staged: Vec::new(),
            probe: vec![0u8; capacity.max(1)].into_boxed_slice(),
            eof: false,
        }
    }
}

// ---

#[async_trait]
impl<R> ByteSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    // ---
    async fn readable(&mut self) -> Result<()> {
        // ---
        if !self.staged.is_empty() || self.eof {
            return Ok(());
        }

        let n = self
            .inner
            .read(&mut self.probe)
            .await
            .map_err(|e| TetherError::Read(e.to_string()))?;

        if n == 0 {
            self.eof = true;
        } else {
            self.staged.extend_from_slice(&self.probe[..n]);
        }
        Ok(())
    }

    // ---

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        // ---
        if !self.staged.is_empty() {
            let n = buf.len().min(self.staged.len());
            buf[..n].copy_from_slice(&self.staged[..n]);
            self.staged.drain(..n);
            return Ok(n);
        }

        if self.eof {
            return Ok(0);
        }

        // Nothing staged (caller skipped the probe) — read directly.
        let n = self
            .inner
            .read(buf)
            .await
            .map_err(|e| TetherError::Read(e.to_string()))?;
        if n == 0 {
            self.eof = true;
        }
        Ok(n)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use std::io::Cursor;
    use std::time::Duration;

    use tether_domain::ByteSource;

    use super::ReaderSource;
    use crate::poll::{poll_read_ready, ReadReadiness};

    // ---

    /// Bytes observed by a probe are handed out by the next read, in order,
    /// with nothing lost or duplicated.
    #[tokio::test]
    async fn probe_then_read_preserves_bytes() {
        // ---
        let mut source = ReaderSource::new(Cursor::new(b"hello world".to_vec()));

        source.readable().await.unwrap();

        let mut buf = [0u8; 64];
        let n = source.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello world");

        // Next probe observes EOF; read reports it.
        source.readable().await.unwrap();
        assert_eq!(source.read(&mut buf).await.unwrap(), 0);
    }

    // ---

    /// A read buffer smaller than the staged bytes drains them across
    /// multiple reads without re-touching the reader.
    #[tokio::test]
    async fn staged_bytes_survive_partial_drains() {
        // ---
        let mut source = ReaderSource::new(Cursor::new(b"abcdef".to_vec()));
        source.readable().await.unwrap();

        let mut buf = [0u8; 4];
        let n = source.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"abcd");

        let n = source.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ef");
    }

    // ---

    /// EOF is sticky: probes and reads after end-of-stream return
    /// immediately instead of touching the reader again.
    #[tokio::test]
    async fn eof_is_sticky() {
        // ---
        let mut source = ReaderSource::new(Cursor::new(Vec::new()));

        assert_eq!(
            poll_read_ready(&mut source, Duration::from_millis(50)).await,
            ReadReadiness::Ready,
        );

        let mut buf = [0u8; 8];
        assert_eq!(source.read(&mut buf).await.unwrap(), 0);
        assert_eq!(source.read(&mut buf).await.unwrap(), 0);
    }

    // ---

    /// A never-ready reader (pending pipe) times out Idle through the
    /// poller rather than blocking the caller.
    #[tokio::test]
    async fn pending_reader_polls_idle() {
        // ---
        let (near, _far) = tokio::io::duplex(64);
        let mut source = ReaderSource::new(near);

        assert_eq!(
            poll_read_ready(&mut source, Duration::from_millis(20)).await,
            ReadReadiness::Idle,
        );
    }
}
