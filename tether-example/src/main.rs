//! Tether example — bridge local stdin to a persistent worker over TCP.
//!
//! Connects to a worker at `--peer`, forwards everything typed on stdin as
//! STDIN chunks (terminated by a STDIN_EOF chunk and a write-half close
//! when stdin ends), and renders the worker's chunked replies: STDOUT and
//! STDERR payloads go to the matching local stream, EXIT ends the session.
//!
//! Run with:
//!   cargo run -p tether-example -- --peer 127.0.0.1:2113
//!
//! What the payloads *mean* is entirely between you and your worker — this
//! binary is only the plumbing demo.

use std::net::SocketAddr;

// ---

use clap::Parser;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, warn};

// ---

use tether_bridge::{read_chunk, BridgeController, ForwardEvent, ReaderSource};
use tether_domain::ChunkKind;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "tether-example", about = "Bridge local stdin to a remote worker")]
struct Config {
    // ---
    /// TCP address of the worker's chunk socket.
    #[arg(long)]
    peer: SocketAddr,
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ---

    let cfg = Config::parse();

    tracing_subscriber::fmt().with_target(false).init();

    info!(peer = %cfg.peer, "connecting to worker");
    let socket = TcpStream::connect(cfg.peer).await?;
    socket.set_nodelay(true)?;
    let (socket_rx, socket_tx) = socket.into_split();

    // Uplink: local stdin → STDIN chunks on the socket.
    let (mut controller, mut event_rx) = BridgeController::new(socket_tx);
    let stdin = ReaderSource::new(tokio::io::stdin());
    controller.forward(stdin, ChunkKind::Stdin, ChunkKind::StdinEof);

    // Downlink: render the worker's chunks until EXIT or socket EOF.
    let render = tokio::spawn(render_worker_output(socket_rx));

    // Surface forwarder endings while the downlink runs.
    let events = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                ForwardEvent::Done { uuid, bytes } => {
                    info!(%uuid, bytes, "stdin forwarded");
                }
                ForwardEvent::SourceGone { uuid, reason } => {
                    warn!(%uuid, %reason, "stdin source went away");
                }
                ForwardEvent::Failed { uuid, reason } => {
                    warn!(%uuid, %reason, "stdin forwarding failed");
                }
            }
        }
    });

    let exit_code = render.await??;

    // The worker is done talking; stop the uplink if stdin never ended.
    controller.stop_all();
    if let Err(e) = controller.join_all().await {
        warn!("uplink ended with error: {e}");
    }
    events.abort();

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// render_worker_output
// ---------------------------------------------------------------------------

/// Read chunks off the socket until EXIT or clean EOF; pipe STDOUT/STDERR
/// payloads to the matching local stream. Returns the worker's exit code.
async fn render_worker_output(
    mut socket_rx: tokio::net::tcp::OwnedReadHalf,
) -> anyhow::Result<i32> {
    // ---
    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();

    loop {
        let chunk = match read_chunk(&mut socket_rx).await? {
            Some(chunk) => chunk,
            None => {
                warn!("worker closed the socket without an EXIT chunk");
                return Ok(1);
            }
        };

        match chunk.kind {
            ChunkKind::Stdout => {
                stdout.write_all(&chunk.payload).await?;
                stdout.flush().await?;
            }
            ChunkKind::Stderr => {
                stderr.write_all(&chunk.payload).await?;
                stderr.flush().await?;
            }
            ChunkKind::Exit => {
                let code = String::from_utf8_lossy(&chunk.payload)
                    .trim()
                    .parse::<i32>()
                    .unwrap_or(0);
                info!(code, "worker exited");
                return Ok(code);
            }
            ChunkKind::Pid => {
                info!(pid = %String::from_utf8_lossy(&chunk.payload), "worker process id");
            }
            ChunkKind::StartReadingInput => {
                // Stdin forwarding is already live; nothing to do.
            }
            other => {
                warn!(?other, "ignoring unexpected chunk from worker");
            }
        }
    }
}
