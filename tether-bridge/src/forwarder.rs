//! [`StreamForwarder`] — the per-direction worker pump.
//!
//! # Loop shape
//!
//! One iteration: check the stop flag, poll the source with a short
//! timeout, then either loop again (idle), stop (source gone), or perform
//! one bounded read. A non-empty read becomes one DATA chunk; a zero-length
//! read is end-of-stream and becomes the terminal END chunk, a flush, and a
//! half-close of the sink's write side. Chunks hit the socket in read
//! order; END is always last; the half-close always follows the flushed
//! END, so the peer cannot see the FIN before the EOF marker.
//!
//! # Lifecycle
//!
//! ```text
//! CREATED --start()/run()--> RUNNING --(EOF | stop | source gone | error)--> STOPPED
//! ```
//!
//! The one piece of shared state is the stop flag. `stop()` sets it from
//! any thread and never blocks; the loop observes it between iterations
//! (cooperative, not preemptive — an in-flight read or write completes
//! first). Worst-case stop latency is one poll timeout plus one read/write.
//!
//! `run` and `start` consume the forwarder, so "started twice" is not
//! expressible. [`Running`] bounds a session to a lexical scope: it starts
//! the worker on creation and its `Drop` guarantees `stop()` on every exit
//! path, unwinding included.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ---

use tokio::task::JoinHandle;
use uuid::Uuid;

// ---

use tether_domain::{ByteSource, ChunkKind, ChunkSink, Result, TetherError};

// ---

use super::event::{EventTx, ForwardEvent};
use super::poll::{poll_read_ready, ReadReadiness};

// ---------------------------------------------------------------------------
// ForwarderConfig
// ---------------------------------------------------------------------------

/// Poll timeout default. Short enough that stop requests and EOF are
/// observed promptly, long enough not to spin an idle CPU.
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Read buffer default, the conventional stdio buffer size.
const DEFAULT_READ_BUFFER: usize = 8 * 1024;

// ---

/// Tuning knobs for one forwarder. Loading these from any external
/// configuration source is the caller's business.
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    // ---
    /// Upper bound on one readiness poll.
    pub poll_timeout: Duration,

    /// Size of the bounded per-iteration read.
    pub read_buffer: usize,
}

// ---

impl Default for ForwarderConfig {
    fn default() -> Self {
        // ---
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            read_buffer: DEFAULT_READ_BUFFER,
        }
    }
}

// ---------------------------------------------------------------------------
// StopHandle
// ---------------------------------------------------------------------------

/// Cloneable stop/observe handle onto one forwarder's stop flag.
///
/// Safe from any thread. `stop` is idempotent and may be called before the
/// worker starts — a pre-stopped forwarder's `run` returns promptly without
/// attempting a read.
#[derive(Clone)]
pub struct StopHandle {
    // ---
    flag: Arc<AtomicBool>,
}

// ---

impl StopHandle {
    // ---
    /// Request termination. Sets the flag and returns immediately; it does
    /// not wait for the loop to actually exit.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether the forwarder has stopped (or been asked to).
    /// Monotonic: once true, never false again.
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// StreamForwarder
// ---------------------------------------------------------------------------

/// How the loop ended, before it is translated into events and a result.
enum LoopEnd {
    // ---
    /// Source reached end-of-stream; END chunk sent, write half closed.
    Eof,

    /// External stop request observed between iterations.
    StopRequested,

    /// Poller reported the source errored. No END chunk was emitted.
    SourceGone(String),
}

// ---

pub struct StreamForwarder<S, K> {
    // ---
    uuid: Uuid,
    source: S,
    sink: K,
    data_kind: ChunkKind,
    end_kind: ChunkKind,
    config: ForwarderConfig,
    flag: Arc<AtomicBool>,
    events: Option<EventTx>,

    /// Payload bytes forwarded as DATA chunks so far.
    bytes_forwarded: u64,
}

// ---

impl<S, K> StreamForwarder<S, K>
where
    S: ByteSource,
    K: ChunkSink,
{
    // ---

    /// Bind a forwarder to one source, one sink, and the chunk kinds of its
    /// direction (e.g. `Stdin` / `StdinEof` for the local-input uplink).
    pub fn new(source: S, sink: K, data_kind: ChunkKind, end_kind: ChunkKind) -> Self {
        // ---
        Self {
            uuid: Uuid::new_v4(),
            source,
            sink,
            data_kind,
            end_kind,
            config: ForwarderConfig::default(),
            flag: Arc::new(AtomicBool::new(false)),
            events: None,
            bytes_forwarded: 0,
        }
    }

    // ---

    pub fn with_config(mut self, config: ForwarderConfig) -> Self {
        self.config = config;
        self
    }

    /// Report session end on `events` in addition to the join result.
    pub fn with_events(mut self, events: EventTx) -> Self {
        self.events = Some(events);
        self
    }

    // ---

    /// Stable identity, used in logs and events.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Handle for stopping and observing this forwarder. Usable before and
    /// after `start`; clones freely across threads.
    pub fn stop_handle(&self) -> StopHandle {
        // ---
        StopHandle {
            flag: Arc::clone(&self.flag),
        }
    }

    // ---

    /// Execute the forwarding loop on the calling task until it
    /// self-terminates.
    ///
    /// EOF, an external stop, and a poller-reported source error all end
    /// the session gracefully (`Ok`) — they are the expected ways
    /// forwarding ends. Read and chunk-write failures are `Err`, mirrored
    /// on the event channel, never retried here.
    pub async fn run(mut self) -> Result<()> {
        // ---
        let uuid = self.uuid;
        let outcome = self.run_inner().await;

        // STOPPED is terminal and observable before any event fires.
        self.flag.store(true, Ordering::Release);

        match outcome {
            Ok(LoopEnd::Eof) => {
                tracing::info!(
                    %uuid,
                    bytes = self.bytes_forwarded,
                    "source EOF — END chunk sent, write half closed",
                );
                self.emit(ForwardEvent::Done {
                    uuid,
                    bytes: self.bytes_forwarded,
                })
                .await;
                Ok(())
            }
            Ok(LoopEnd::StopRequested) => {
                tracing::debug!(%uuid, bytes = self.bytes_forwarded, "stop request observed");
                self.emit(ForwardEvent::Done {
                    uuid,
                    bytes: self.bytes_forwarded,
                })
                .await;
                Ok(())
            }
            Ok(LoopEnd::SourceGone(reason)) => {
                tracing::warn!(%uuid, %reason, "source gone — forwarding ended without END chunk");
                self.emit(ForwardEvent::SourceGone { uuid, reason }).await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%uuid, "forwarding failed: {e}");
                self.emit(ForwardEvent::Failed {
                    uuid,
                    reason: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    // ---

    async fn run_inner(&mut self) -> Result<LoopEnd> {
        // ---
        let mut buf = vec![0u8; self.config.read_buffer.max(1)];

        loop {
            // Stop requests win over further reads; an in-flight iteration
            // has already completed by the time we are here.
            if self.flag.load(Ordering::Acquire) {
                return Ok(LoopEnd::StopRequested);
            }

            match poll_read_ready(&mut self.source, self.config.poll_timeout).await {
                ReadReadiness::Idle => continue,
                ReadReadiness::Gone(reason) => return Ok(LoopEnd::SourceGone(reason)),
                ReadReadiness::Ready => {}
            }

            let n = self.source.read(&mut buf).await?;

            if n == 0 {
                // End-of-stream: terminal chunk, flush, then half-close —
                // in that order, so the peer sees the marker before FIN.
                self.sink.write_chunk(self.end_kind, &[]).await?;
                self.sink.flush().await?;
                self.sink.shutdown_write().await?;
                return Ok(LoopEnd::Eof);
            }

            self.sink.write_chunk(self.data_kind, &buf[..n]).await?;
            self.bytes_forwarded += n as u64;
        }
    }

    // ---

    async fn emit(&mut self, event: ForwardEvent) {
        if let Some(events) = &self.events {
            events.send(event).await;
        }
    }
}

// ---

impl<S, K> StreamForwarder<S, K>
where
    S: ByteSource + 'static,
    K: ChunkSink + 'static,
{
    // ---

    /// Launch the loop on a dedicated task and return its handle.
    ///
    /// Consumes the forwarder — a second `start` on the same instance is
    /// unrepresentable.
    pub fn start(self) -> ForwarderHandle {
        // ---
        let uuid = self.uuid;
        let stop = self.stop_handle();
        let join = tokio::spawn(self.run());

        ForwarderHandle { uuid, stop, join }
    }

    // ---

    /// Scoped acquisition: start the worker and bind the session to the
    /// returned guard's lifetime. Dropping the guard — normally or during
    /// unwind — requests a stop.
    pub fn running(self) -> Running {
        // ---
        let handle = self.start();
        Running {
            _guard: StopOnDrop(handle.stop_handle()),
            handle,
        }
    }
}

// ---------------------------------------------------------------------------
// ForwarderHandle
// ---------------------------------------------------------------------------

/// Controller-side handle to a started forwarder.
pub struct ForwarderHandle {
    // ---
    uuid: Uuid,
    stop: StopHandle,
    join: JoinHandle<Result<()>>,
}

// ---

impl ForwarderHandle {
    // ---
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Request termination. Idempotent, non-blocking, any thread.
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    // ---

    /// Wait for the worker to exit and surface its captured result.
    ///
    /// A worker that panicked (or was cancelled by runtime shutdown) comes
    /// back as [`TetherError::Worker`] rather than unwinding the caller.
    pub async fn join(self) -> Result<()> {
        // ---
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(TetherError::Worker(e.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

/// Stops the worker when dropped. Kept as its own field so [`Running`]
/// itself needs no `Drop` impl and can release its handle by move.
struct StopOnDrop(StopHandle);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.stop();
    }
}

// ---

/// Guard for a scoped forwarding session. See
/// [`StreamForwarder::running`].
pub struct Running {
    // ---
    _guard: StopOnDrop,
    handle: ForwarderHandle,
}

// ---

impl Running {
    // ---
    pub fn uuid(&self) -> Uuid {
        self.handle.uuid()
    }

    pub fn is_stopped(&self) -> bool {
        self.handle.is_stopped()
    }

    /// Stop now and take the handle, e.g. to `join` on the captured worker
    /// result.
    pub fn stop_and_release(self) -> ForwarderHandle {
        // ---
        // `guard` drops here, which issues the stop.
        let Running { _guard, handle } = self;
        handle
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
