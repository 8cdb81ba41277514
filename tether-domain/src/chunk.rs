//! Chunk vocabulary of the worker wire protocol.
//!
//! Every payload crossing the socket travels inside a chunk: a one-byte
//! kind tag plus raw bytes. The bridge core frames and forwards chunks; it
//! never interprets payload contents. Which tags mean what is owned by the
//! layers above — a forwarder is only ever configured with the two tags
//! relevant to its own direction (one DATA kind, one EOF kind).

// ---------------------------------------------------------------------------
// ChunkKind
// ---------------------------------------------------------------------------

/// One-byte wire tags understood by the persistent worker peer.
///
/// The tag values are fixed by the remote worker's protocol and must not
/// change. Closed set: an unknown tag on the wire is a framing error, not
/// an extension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    // ---
    /// One command-line argument for the remote command.
    Argument,

    /// One `KEY=VALUE` environment entry for the remote command.
    Environment,

    /// Working directory the remote command should run in.
    WorkingDir,

    /// The command to execute. Sent last in the handshake sequence.
    Command,

    /// Bytes of the client's standard input.
    Stdin,

    /// Bytes of the remote command's standard output.
    Stdout,

    /// Bytes of the remote command's standard error.
    Stderr,

    /// Server signal: start forwarding stdin now.
    StartReadingInput,

    /// Client's standard input reached end-of-stream. Empty payload.
    StdinEof,

    /// Remote command exited; payload is the exit status.
    Exit,

    /// Process id of the remote command.
    Pid,
}

// ---

impl ChunkKind {
    // ---
    /// Every kind, in wire-tag order. Used by the decoder and by tests.
    pub const ALL: [ChunkKind; 11] = [
        ChunkKind::Argument,
        ChunkKind::Environment,
        ChunkKind::WorkingDir,
        ChunkKind::Command,
        ChunkKind::Stdin,
        ChunkKind::Stdout,
        ChunkKind::Stderr,
        ChunkKind::StartReadingInput,
        ChunkKind::StdinEof,
        ChunkKind::Exit,
        ChunkKind::Pid,
    ];

    // ---

    /// The one-byte tag this kind is written as on the wire.
    pub fn wire_tag(self) -> u8 {
        // ---
        match self {
            ChunkKind::Argument => b'A',
            ChunkKind::Environment => b'E',
            ChunkKind::WorkingDir => b'D',
            ChunkKind::Command => b'C',
            ChunkKind::Stdin => b'0',
            ChunkKind::Stdout => b'1',
            ChunkKind::Stderr => b'2',
            ChunkKind::StartReadingInput => b'S',
            ChunkKind::StdinEof => b'.',
            ChunkKind::Exit => b'X',
            ChunkKind::Pid => b'P',
        }
    }

    // ---

    /// Map a wire tag back to its kind. `None` for tags outside the
    /// protocol — callers turn that into a framing error.
    pub fn from_wire_tag(tag: u8) -> Option<Self> {
        // ---
        ChunkKind::ALL.iter().copied().find(|k| k.wire_tag() == tag)
    }
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// One decoded unit of the wire protocol: a kind tag plus its payload.
///
/// Payloads may be empty; EOF-kind chunks always are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    // ---
    pub kind: ChunkKind,
    pub payload: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
