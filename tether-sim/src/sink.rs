//! [`CaptureSink`] — a [`ChunkSink`] that records instead of sending.

use std::sync::Arc;

// ---

use async_trait::async_trait;
use tokio::sync::Mutex;

// ---

use tether_domain::{Chunk, ChunkKind, ChunkSink, Result, TetherError};

// ---------------------------------------------------------------------------
// CaptureState
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CaptureState {
    // ---
    chunks: Vec<Chunk>,
    flushes: usize,
    shutdowns: usize,

    /// When set, the next `write_chunk` fails with this reason.
    write_error: Option<String>,
}

// ---------------------------------------------------------------------------
// CaptureLog
// ---------------------------------------------------------------------------

/// Cheap-clone inspection handle over everything a [`CaptureSink`]
/// recorded. Held by the test while the sink itself moves into the
/// forwarder.
#[derive(Clone)]
pub struct CaptureLog {
    // ---
    state: Arc<Mutex<CaptureState>>,
}

// ---

impl CaptureLog {
    // ---
    /// Every chunk written so far, in write order.
    pub async fn chunks(&self) -> Vec<Chunk> {
        self.state.lock().await.chunks.clone()
    }

    pub async fn flush_count(&self) -> usize {
        self.state.lock().await.flushes
    }

    pub async fn shutdown_count(&self) -> usize {
        self.state.lock().await.shutdowns
    }

    // ---

    /// Make the next `write_chunk` fail with `reason`.
    pub async fn inject_write_error(&self, reason: &str) {
        self.state.lock().await.write_error = Some(reason.to_string());
    }
}

// ---------------------------------------------------------------------------
// CaptureSink
// ---------------------------------------------------------------------------

pub struct CaptureSink {
    // ---
    state: Arc<Mutex<CaptureState>>,
}

// ---

impl CaptureSink {
    // ---
    /// Build a sink plus the log handle tests keep.
    pub fn new() -> (Self, CaptureLog) {
        // ---
        let state = Arc::new(Mutex::new(CaptureState::default()));
        let log = CaptureLog {
            state: Arc::clone(&state),
        };
        (Self { state }, log)
    }
}

// ---

#[async_trait]
impl ChunkSink for CaptureSink {
    // ---
    async fn write_chunk(&mut self, kind: ChunkKind, payload: &[u8]) -> Result<()> {
        // ---
        let mut state = self.state.lock().await;

        if let Some(reason) = state.write_error.take() {
            return Err(TetherError::Write(reason));
        }

        state.chunks.push(Chunk {
            kind,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    // ---

    async fn flush(&mut self) -> Result<()> {
        self.state.lock().await.flushes += 1;
        Ok(())
    }

    // ---

    async fn shutdown_write(&mut self) -> Result<()> {
        self.state.lock().await.shutdowns += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
