//! Wire framing for worker protocol chunks.
//!
//! Every chunk on the socket is a self-delimiting frame:
//!
//! ```text
//! +-------------------+-------+-----------------------------+
//! | payload_len (u32) | tag   | payload (payload_len bytes) |
//! | big-endian        | 1 B   | may be empty                |
//! +-------------------+-------+-----------------------------+
//! |← CHUNK_HEADER_LEN = 5 B  →|
//! ```
//!
//! The layout is pinned: the peer is a persistent worker process with a
//! fixed reader, so both sides must agree byte-for-byte. Zero-length
//! payloads are legal (EOF-kind chunks always are). The codec never
//! interprets payload contents.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

// ---

use tether_domain::{Chunk, ChunkKind, Result, TetherError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fixed frame header size in bytes: payload_len(4) + tag(1).
pub const CHUNK_HEADER_LEN: usize = 5;

// ---------------------------------------------------------------------------
// write_chunk
// ---------------------------------------------------------------------------

/// Frame `(kind, payload)` and write every byte of it to `writer`.
///
/// Errors if the payload exceeds the 4 GiB the length field can carry, or
/// if the underlying write fails.
pub async fn write_chunk<W>(writer: &mut W, kind: ChunkKind, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| TetherError::Write("chunk payload exceeds 4 GiB".into()))?;

    let mut header = [0u8; CHUNK_HEADER_LEN];
    header[0..4].copy_from_slice(&payload_len.to_be_bytes());
    header[4] = kind.wire_tag();

    writer
        .write_all(&header)
        .await
        .map_err(|e| TetherError::Write(format!("chunk write header: {e}")))?;

    if !payload.is_empty() {
        writer
            .write_all(payload)
            .await
            .map_err(|e| TetherError::Write(format!("chunk write payload: {e}")))?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// read_chunk
// ---------------------------------------------------------------------------

/// Read exactly one chunk from `reader`.
///
/// Returns `None` on clean EOF (zero-length read of the first header byte),
/// which signals that the peer has closed its write half. A source that
/// closes anywhere past that point — mid-header or with fewer payload bytes
/// than the header declared — is a [`TetherError::Framing`] error, never a
/// partial chunk. Unknown tags are also framing errors.
pub async fn read_chunk<R>(reader: &mut R) -> Result<Option<Chunk>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; CHUNK_HEADER_LEN];

    // Peek at the first byte to distinguish clean EOF from a real frame.
    match reader.read(&mut header[..1]).await {
        Ok(0) => return Ok(None), // clean EOF
        Ok(_) => {}
        Err(e) => return Err(TetherError::Framing(format!("chunk read header[0]: {e}"))),
    }

    // Read the remaining 4 header bytes.
    reader
        .read_exact(&mut header[1..])
        .await
        .map_err(|e| TetherError::Framing(format!("chunk header truncated: {e}")))?;

    let payload_len = u32::from_be_bytes(header[0..4].try_into().unwrap()) as usize;

    let kind = ChunkKind::from_wire_tag(header[4])
        .ok_or_else(|| TetherError::Framing(format!("unknown chunk tag 0x{:02X}", header[4])))?;

    let mut payload = vec![0u8; payload_len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| TetherError::Framing(format!("chunk payload truncated: {e}")))?;

    Ok(Some(Chunk { kind, payload }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use std::io::Cursor;

    use super::*;
    use tether_domain::TetherError;

    // ---

    /// Round-trip every kind with payload lengths 0, 1, and N.
    #[tokio::test]
    async fn round_trip_all_kinds() {
        // ---
        let payloads: [&[u8]; 3] = [b"", b"x", b"the quick brown fox jumps over the lazy dog"];

        for kind in ChunkKind::ALL {
            for payload in payloads {
                let mut buf: Vec<u8> = Vec::new();
                write_chunk(&mut buf, kind, payload).await.unwrap();

                let mut reader = Cursor::new(buf);
                let chunk = read_chunk(&mut reader).await.unwrap().unwrap();

                assert_eq!(chunk.kind, kind);
                assert_eq!(chunk.payload, payload);

                // Exactly one frame was consumed.
                let trailing = read_chunk(&mut reader).await.unwrap();
                assert!(trailing.is_none(), "bytes left after one frame");
            }
        }
    }

    // ---

    /// The layout is pinned for the fixed worker peer: big-endian length,
    /// then the tag byte, then the payload with no padding.
    #[tokio::test]
    async fn wire_layout_is_pinned() {
        // ---
        let payload = vec![b'A'; 300];
        let mut buf: Vec<u8> = Vec::new();
        write_chunk(&mut buf, ChunkKind::Stdin, &payload).await.unwrap();

        assert_eq!(buf.len(), CHUNK_HEADER_LEN + 300);
        assert_eq!(&buf[0..4], &300u32.to_be_bytes());
        assert_eq!(buf[4], b'0');
        assert_eq!(&buf[5..], &payload[..]);
    }

    // ---

    /// A source that closes with fewer payload bytes than the header
    /// declared fails with a framing error, never a partial chunk.
    #[tokio::test]
    async fn truncated_payload_is_framing_error() {
        // ---
        let mut buf: Vec<u8> = Vec::new();
        write_chunk(&mut buf, ChunkKind::Stdout, b"0123456789").await.unwrap();
        buf.truncate(CHUNK_HEADER_LEN + 3); // 3 of 10 declared bytes

        let err = read_chunk(&mut Cursor::new(buf)).await.unwrap_err();
        assert!(matches!(err, TetherError::Framing(_)), "got {err}");
    }

    // ---

    #[tokio::test]
    async fn truncated_header_is_framing_error() {
        // ---
        let buf = vec![0u8, 0, 0]; // 3 of 5 header bytes
        let err = read_chunk(&mut Cursor::new(buf)).await.unwrap_err();
        assert!(matches!(err, TetherError::Framing(_)), "got {err}");
    }

    // ---

    #[tokio::test]
    async fn unknown_tag_is_framing_error() {
        // ---
        let mut buf: Vec<u8> = 0u32.to_be_bytes().to_vec();
        buf.push(b'?');

        let err = read_chunk(&mut Cursor::new(buf)).await.unwrap_err();
        assert!(matches!(err, TetherError::Framing(_)), "got {err}");
    }

    // ---

    #[tokio::test]
    async fn clean_eof_yields_none() {
        // ---
        let empty: Vec<u8> = Vec::new();
        assert!(read_chunk(&mut Cursor::new(empty)).await.unwrap().is_none());
    }
}
