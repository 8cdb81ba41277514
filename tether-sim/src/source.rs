//! [`ScriptedSource`] — a [`ByteSource`] driven by a fixed script.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ---

use async_trait::async_trait;

// ---

use tether_domain::{ByteSource, Result, TetherError};

// ---------------------------------------------------------------------------
// SourceStep
// ---------------------------------------------------------------------------

/// One step of a source script, consumed front to back.
#[derive(Debug, Clone)]
pub enum SourceStep {
    // ---
    /// The next read yields these bytes (split across reads if the caller's
    /// buffer is smaller).
    Data(Vec<u8>),

    /// The next read yields zero bytes — end of stream. Sticky: every read
    /// after this one also reports EOF.
    Eof,

    /// Readiness checks fail with this reason, modelling a descriptor the
    /// poller reports as errored. Not consumed: the failure repeats.
    PollError(String),

    /// Readiness succeeds but the read itself fails with this reason.
    ReadError(String),
}

// ---------------------------------------------------------------------------
// SourceStats
// ---------------------------------------------------------------------------

/// Cheap-clone counters recording how the forwarder drove the source.
#[derive(Clone)]
pub struct SourceStats {
    // ---
    polls: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
}

// ---

impl SourceStats {
    // ---
    /// Number of `readable` probes the source has served.
    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::Acquire)
    }

    /// Number of `read` calls the source has served.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// ScriptedSource
// ---------------------------------------------------------------------------

pub struct ScriptedSource {
    // ---
    script: VecDeque<SourceStep>,

    /// Set once an `Eof` step has been consumed.
    eof: bool,

    polls: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
}

// ---

impl ScriptedSource {
    // ---
    /// Build a source from `steps` plus the stats handle tests keep.
    pub fn new(steps: Vec<SourceStep>) -> (Self, SourceStats) {
        // ---
        let polls = Arc::new(AtomicUsize::new(0));
        let reads = Arc::new(AtomicUsize::new(0));

        let stats = SourceStats {
            polls: Arc::clone(&polls),
            reads: Arc::clone(&reads),
        };

        let source = Self {
            script: steps.into(),
            eof: false,
            polls,
            reads,
        };

        (source, stats)
    }
}

// ---

#[async_trait]
impl ByteSource for ScriptedSource {
    // ---
    async fn readable(&mut self) -> Result<()> {
        // ---
        self.polls.fetch_add(1, Ordering::AcqRel);

        match self.script.front() {
            Some(SourceStep::PollError(reason)) => Err(TetherError::Read(reason.clone())),
            Some(_) => Ok(()),
            None if self.eof => Ok(()),
            // Script exhausted with no EOF: never readable. The caller's
            // poll timeout is the only way out, which is exactly what the
            // idle/stop tests need.
            None => std::future::pending().await,
        }
    }

    // ---

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        // ---
        self.reads.fetch_add(1, Ordering::AcqRel);

        match self.script.pop_front() {
            Some(SourceStep::Data(mut bytes)) => {
                // ---
                if bytes.len() > buf.len() {
                    // Caller's buffer is smaller: hand back the remainder.
                    let rest = bytes.split_off(buf.len());
                    self.script.push_front(SourceStep::Data(rest));
                }
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Some(SourceStep::Eof) => {
                self.eof = true;
                Ok(0)
            }
            Some(SourceStep::ReadError(reason)) => Err(TetherError::Read(reason)),
            Some(SourceStep::PollError(reason)) => {
                // A read issued despite a failing poll step: fail the same
                // way, and keep the step in place.
                let err = TetherError::Read(reason.clone());
                self.script.push_front(SourceStep::PollError(reason));
                Err(err)
            }
            None => {
                // Off-script read: report EOF rather than inventing bytes.
                self.eof = true;
                Ok(0)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
