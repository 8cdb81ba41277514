use thiserror::Error;

// ---

#[derive(Debug, Error)]
pub enum TetherError {
    // ---
    /// A chunk could not be decoded from the wire (truncated frame,
    /// unknown tag). Never silently dropped — surfaced to the decoder's
    /// caller.
    #[error("framing error: {0}")]
    Framing(String),

    /// Reading from the local source failed.
    #[error("source read error: {0}")]
    Read(String),

    /// Writing a chunk to the socket failed (peer closed, broken pipe).
    #[error("chunk write error: {0}")]
    Write(String),

    /// Worker task ended without producing a result (panic or cancellation).
    #[error("worker task failed: {0}")]
    Worker(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// ---

pub type Result<T> = std::result::Result<T, TetherError>;
