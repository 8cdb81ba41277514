//! Bounded readiness polling for the forwarding loop.
//!
//! A blocking read on the source would make external stop requests
//! unresponsive for an unbounded time. Instead the loop asks "anything to
//! read?" with a short timeout each iteration, trading a small fixed
//! latency for guaranteed responsiveness to cancellation and EOF with no
//! second wake-up channel. The bounded timeout, not the read, is what keeps
//! worst-case stop latency fixed.

use std::time::Duration;

// ---

use tether_domain::ByteSource;

// ---------------------------------------------------------------------------
// ReadReadiness
// ---------------------------------------------------------------------------

/// Outcome of one bounded readiness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadReadiness {
    // ---
    /// At least one byte (or end-of-stream) is observable; a read will not
    /// block indefinitely.
    Ready,

    /// The timeout elapsed with nothing to read. Loop again.
    Idle,

    /// The source reported itself errored. Terminal: the loop stops without
    /// another read or write, and no END chunk is emitted.
    Gone(String),
}

// ---------------------------------------------------------------------------
// poll_read_ready
// ---------------------------------------------------------------------------

/// Wait up to `timeout` for `source` to become readable.
///
/// A failed readiness check is reported as [`ReadReadiness::Gone`], not as
/// an error escaping the caller's loop.
pub async fn poll_read_ready<S>(source: &mut S, timeout: Duration) -> ReadReadiness
where
    S: ByteSource + ?Sized,
{
    match tokio::time::timeout(timeout, source.readable()).await {
        Err(_elapsed) => ReadReadiness::Idle,
        Ok(Ok(())) => ReadReadiness::Ready,
        Ok(Err(e)) => ReadReadiness::Gone(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
