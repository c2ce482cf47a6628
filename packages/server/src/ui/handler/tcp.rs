//! TCP connection handler.
//!
//! Each accepted socket goes through `CONNECTED -> AWAITING_NAME -> ACTIVE ->
//! CLOSED`. Inbound text is newline-delimited; every outbound message is one
//! line. All writes to a socket go through its bounded outbound queue,
//! drained by a single writer task, so the handler and broadcasting tasks
//! never write to the socket concurrently.
//!
//! A connection the registry drops (its queue filled up or its writer died)
//! stops both its writer and its reader at once, without flushing.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc,
    task::JoinHandle,
};
use tokio_util::{
    codec::{FramedRead, FramedWrite, LinesCodec},
    sync::CancellationToken,
};

use crate::{
    domain::{ConnectionId, FAREWELL, NICKNAME_PROMPT, OutboundChannel},
    ui::state::AppState,
    usecase::FrameOutcome,
};

/// Upper bound on flushing queued lines once a connection is closing
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

type LineReader = FramedRead<OwnedReadHalf, LinesCodec>;
type LineWriter = FramedWrite<OwnedWriteHalf, LinesCodec>;

/// Spawns a task that drains the outbound queue into the socket.
///
/// The task ends when every sender of the queue is dropped, on the first
/// write failure, or as soon as `dropped` is cancelled (even mid-write).
/// Dropping the receiver on failure makes later pushes fail, which the
/// registry treats as an implicit disconnect.
fn pusher_loop(
    mut rx: mpsc::Receiver<String>,
    mut sink: LineWriter,
    dropped: CancellationToken,
    id: ConnectionId,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let line = tokio::select! {
                biased;
                _ = dropped.cancelled() => return,
                line = rx.recv() => match line {
                    Some(line) => line,
                    None => break,
                },
            };
            tokio::select! {
                biased;
                _ = dropped.cancelled() => {
                    tracing::debug!("Abandoning pending write to connection {}", id);
                    return;
                }
                sent = sink.send(line) => {
                    if let Err(e) = sent {
                        tracing::warn!("Failed to write to connection {}: {}", id, e);
                        return;
                    }
                }
            }
        }
        if let Err(e) = SinkExt::<String>::close(&mut sink).await {
            tracing::debug!("Failed to close connection {}: {}", id, e);
        }
    })
}

/// Push a line to this connection only
fn push(outbound: &OutboundChannel, line: &str, id: ConnectionId) {
    // A failed push means the writer is gone; the read side ends the session
    if let Err(e) = outbound.push(line) {
        tracing::debug!("Dropped line for connection {}: {}", id, e);
    }
}

/// Read the next inbound line.
///
/// Peer close, read faults (I/O error, invalid UTF-8, over-long line), the
/// registry dropping the connection and server shutdown all end the
/// session, so they all map to `None`.
async fn next_frame(
    lines: &mut LineReader,
    outbound: &OutboundChannel,
    shutdown: &CancellationToken,
    id: ConnectionId,
) -> Option<String> {
    let dropped = outbound.dropped_token();
    tokio::select! {
        frame = lines.next() => match frame {
            Some(Ok(line)) => Some(line),
            Some(Err(e)) => {
                tracing::warn!("Read error on connection {}: {}", id, e);
                None
            }
            None => None,
        },
        _ = dropped.cancelled() => {
            tracing::debug!("Connection {} was dropped by the registry", id);
            None
        }
        _ = shutdown.cancelled() => {
            tracing::debug!("Closing connection {} for shutdown", id);
            None
        }
    }
}

/// Drop this handler's queue sender and let the writer flush and close.
async fn close(outbound: OutboundChannel, mut writer: JoinHandle<()>, id: ConnectionId) {
    drop(outbound);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        tracing::warn!("Writer of connection {} did not drain in time", id);
        writer.abort();
    }
}

/// Serve one accepted connection until it closes.
///
/// Never returns an error: every failure on this connection is recovered by
/// tearing the connection down.
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) {
    let id = ConnectionId::generate();
    tracing::info!("New connection from {} ({})", peer, id);

    let (read_half, write_half) = stream.into_split();
    let mut lines = FramedRead::new(
        read_half,
        LinesCodec::new_with_max_length(state.max_line_length),
    );
    let (outbound, rx) = OutboundChannel::new(state.outbound_queue_capacity);
    let writer = pusher_loop(
        rx,
        FramedWrite::new(write_half, LinesCodec::new()),
        outbound.dropped_token(),
        id,
    );

    // Handshake
    push(&outbound, NICKNAME_PROMPT, id);
    let Some(raw_name) = next_frame(&mut lines, &outbound, &shutdown, id).await else {
        tracing::info!("Connection from {} closed before the handshake", peer);
        close(outbound, writer, id).await;
        return;
    };
    let participant = match state
        .connect_participant_usecase
        .execute(id, &raw_name, outbound.clone())
        .await
    {
        Ok(participant) => participant,
        Err(e) => {
            tracing::warn!("Rejected handshake from {}: {}", peer, e);
            close(outbound, writer, id).await;
            return;
        }
    };
    tracing::info!("Nickname of {} is '{}'", peer, participant.name);

    // Active loop
    while let Some(frame) = next_frame(&mut lines, &outbound, &shutdown, id).await {
        match state
            .send_message_usecase
            .execute(&participant, &frame)
            .await
        {
            FrameOutcome::Relayed(report) => {
                tracing::debug!(
                    "Relayed message from '{}' to {} participant(s)",
                    participant.name,
                    report.delivered
                );
            }
            FrameOutcome::Ignored => {}
            FrameOutcome::Exit => {
                push(&outbound, FAREWELL, id);
                tracing::info!("'{}' asked to leave", participant.name);
                break;
            }
        }
    }

    // Teardown: unregister, close the socket, then announce
    drop(lines);
    match state
        .disconnect_participant_usecase
        .execute(&participant.id, close(outbound, writer, id))
        .await
    {
        Some(_) => tracing::info!("'{}' disconnected ({})", participant.name, peer),
        None => tracing::info!(
            "'{}' was already removed after a failed delivery ({})",
            participant.name,
            peer
        ),
    }
}
