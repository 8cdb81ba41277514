//! [`BridgeController`] — owns the shared socket and the set of per-stream
//! forwarders riding on it.
//!
//! The controller wraps the socket's write half in a [`SharedSink`] so that
//! every forwarder it spawns appends only whole frames (one mutex held
//! across each frame write — the serialization the protocol requires when
//! several directions share one socket), and so that the socket half-closes
//! only when the last direction has sent its END chunk. Each spawned
//! forwarder reports on the controller's event channel; the receiver is
//! handed out once at construction for the owning layer to drain.

use tokio::io::AsyncWrite;
use tokio::sync::mpsc;

// ---

use tether_domain::{ByteSource, ChunkKind, Result};

// ---

use super::event::{event_channel, EventTx, ForwardEvent};
use super::forwarder::{ForwarderConfig, ForwarderHandle, StopHandle, StreamForwarder};
use super::socket::{FramedSocket, SharedSink};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Event channel depth. Each forwarder sends at most one terminal event,
/// so this only needs to cover a burst of simultaneous endings.
const EVENT_CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// BridgeController
// ---------------------------------------------------------------------------

pub struct BridgeController<W> {
    // ---
    sink: SharedSink<W>,
    events: EventTx,
    handles: Vec<ForwarderHandle>,
}

// ---

impl<W> BridgeController<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    // ---

    /// Take ownership of the socket's write half and return the controller
    /// together with the receiver its forwarders will report on.
    pub fn new(socket_tx: W) -> (Self, mpsc::Receiver<ForwardEvent>) {
        // ---
        let (events, event_rx) = event_channel(EVENT_CHANNEL_CAPACITY);
        let controller = Self {
            sink: SharedSink::new(FramedSocket::new(socket_tx)),
            events,
            handles: Vec::new(),
        };
        (controller, event_rx)
    }

    // ---

    /// Spawn a forwarder for one direction over the shared socket with
    /// default tuning. Returns its stop handle.
    pub fn forward<S>(&mut self, source: S, data_kind: ChunkKind, end_kind: ChunkKind) -> StopHandle
    where
        S: ByteSource + 'static,
    {
        self.forward_with(source, data_kind, end_kind, ForwarderConfig::default())
    }

    // ---

    /// Spawn a forwarder with explicit tuning.
    pub fn forward_with<S>(
        // ---
        &mut self,
        source: S,
        data_kind: ChunkKind,
        end_kind: ChunkKind,
        config: ForwarderConfig,
    ) -> StopHandle
    where
        S: ByteSource + 'static,
    {
        // ---
        let forwarder = StreamForwarder::new(source, self.sink.register_writer(), data_kind, end_kind)
            .with_config(config)
            .with_events(self.events.clone());

        tracing::debug!(uuid = %forwarder.uuid(), ?data_kind, "spawning stream forwarder");

        let handle = forwarder.start();
        let stop = handle.stop_handle();
        self.handles.push(handle);
        stop
    }

    // ---

    /// Request a stop on every live forwarder. Non-blocking.
    pub fn stop_all(&self) {
        // ---
        for handle in &self.handles {
            handle.stop();
        }
    }

    /// Whether every spawned forwarder has stopped (or been asked to).
    pub fn all_stopped(&self) -> bool {
        self.handles.iter().all(|h| h.is_stopped())
    }

    // ---

    /// Wait for every forwarder to exit. The first captured worker error
    /// wins; later ones are logged and dropped.
    pub async fn join_all(&mut self) -> Result<()> {
        // ---
        let mut first_err = None;

        for handle in self.handles.drain(..) {
            let uuid = handle.uuid();
            if let Err(e) = handle.join().await {
                tracing::warn!(%uuid, "forwarder ended with error: {e}");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use std::time::Duration;

    use tether_domain::ChunkKind;
    use tether_sim::{ScriptedSource, SourceStep};

    use super::BridgeController;
    use crate::codec::read_chunk;
    use crate::event::ForwardEvent;
    use crate::forwarder::ForwarderConfig;

    // ---

    fn quick_config() -> ForwarderConfig {
        // ---
        ForwarderConfig {
            poll_timeout: Duration::from_millis(10),
            read_buffer: 8 * 1024,
        }
    }

    // ---

    /// Two directions share one socket: every frame on the wire is whole,
    /// per-direction order is preserved, and each direction ends with its
    /// own END chunk.
    #[tokio::test]
    async fn two_directions_share_one_socket() {
        // ---
        let (near, far) = tokio::io::duplex(64 * 1024);
        let (mut controller, mut event_rx) = BridgeController::new(near);

        let (stdin_src, _stdin_stats) = ScriptedSource::new(vec![
            SourceStep::Data(b"input line one".to_vec()),
            SourceStep::Data(b"input line two".to_vec()),
            SourceStep::Eof,
        ]);
        let (aux_src, _aux_stats) = ScriptedSource::new(vec![
            SourceStep::Data(b"diagnostics".to_vec()),
            SourceStep::Eof,
        ]);

        controller.forward_with(stdin_src, ChunkKind::Stdin, ChunkKind::StdinEof, quick_config());
        controller.forward_with(aux_src, ChunkKind::Stderr, ChunkKind::StdinEof, quick_config());

        controller.join_all().await.unwrap();
        assert!(controller.all_stopped());

        // Both forwarders reported Done.
        let mut done = 0;
        for _ in 0..2 {
            match event_rx.recv().await {
                Some(ForwardEvent::Done { .. }) => done += 1,
                other => panic!("expected Done, got {other:?}"),
            }
        }
        assert_eq!(done, 2);

        // Decode everything the far end received: whole frames only, with
        // per-direction payload order intact.
        let (mut far_rx, _far_tx) = tokio::io::split(far);
        let mut stdin_payloads = Vec::new();
        let mut stderr_payloads = Vec::new();
        let mut end_chunks = 0;
        while let Some(chunk) = read_chunk(&mut far_rx).await.unwrap() {
            match chunk.kind {
                ChunkKind::Stdin => stdin_payloads.push(chunk.payload),
                ChunkKind::Stderr => stderr_payloads.push(chunk.payload),
                ChunkKind::StdinEof => {
                    assert!(chunk.payload.is_empty());
                    end_chunks += 1;
                }
                other => panic!("unexpected chunk kind {other:?}"),
            }
            if end_chunks == 2 {
                break;
            }
        }

        assert_eq!(
            stdin_payloads,
            [b"input line one".to_vec(), b"input line two".to_vec()]
        );
        assert_eq!(stderr_payloads, [b"diagnostics".to_vec()]);
        assert_eq!(end_chunks, 2);
    }

    // ---

    /// stop_all ends an idle session; join_all comes back clean.
    #[tokio::test]
    async fn stop_all_ends_idle_forwarders() {
        // ---
        let (near, _far) = tokio::io::duplex(1024);
        let (mut controller, _event_rx) = BridgeController::new(near);

        let (idle_src, _stats) = ScriptedSource::new(vec![]);
        controller.forward_with(idle_src, ChunkKind::Stdin, ChunkKind::StdinEof, quick_config());

        assert!(!controller.all_stopped());
        controller.stop_all();

        tokio::time::timeout(Duration::from_secs(1), controller.join_all())
            .await
            .expect("join_all did not finish after stop_all")
            .unwrap();
        assert!(controller.all_stopped());
    }
}
