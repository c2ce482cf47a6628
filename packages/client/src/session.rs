//! Client session: relays stdin to the server and server lines to stdout.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

use crate::error::ClientError;

/// How long to wait for the server to close after we stop sending
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Whether a typed line asks the server to end the session
pub fn is_exit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// Read stdin lines on a blocking thread and hand them to the session.
fn read_input(input_tx: mpsc::UnboundedSender<String>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            tracing::error!("Failed to initialize line editor: {}", e);
            return;
        }
    };

    loop {
        match editor.readline("") {
            Ok(line) => {
                let exiting = is_exit(&line);
                if input_tx.send(line).is_err() || exiting {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                tracing::error!("Failed to read input: {}", e);
                break;
            }
        }
    }
}

/// Run one chat session against `host:port`.
///
/// The first line typed is sent as the nickname. The session ends after
/// `exit` is sent, when stdin is closed, or when the server closes the
/// connection.
pub async fn run_client_session(host: &str, port: u16) -> Result<(), ClientError> {
    let addr = format!("{}:{}", host, port);
    let stream = TcpStream::connect(&addr)
        .await
        .map_err(|source| ClientError::Connect {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!("Connected to {}", addr);

    let (read_half, write_half) = stream.into_split();
    let mut lines = FramedRead::new(read_half, LinesCodec::new());
    let mut sink = FramedWrite::new(write_half, LinesCodec::new());

    // Spawn a task to print lines from the server
    let mut read_task = tokio::spawn(async move {
        while let Some(line) = lines.next().await {
            match line {
                Ok(line) => println!("{}", line),
                Err(e) => {
                    tracing::warn!("Read error: {}", e);
                    break;
                }
            }
        }
    });

    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || read_input(input_tx));

    loop {
        tokio::select! {
            _ = &mut read_task => {
                println!("Disconnected from server.");
                return Ok(());
            }
            input = input_rx.recv() => match input {
                Some(line) => {
                    sink.send(line.as_str()).await?;
                    if is_exit(&line) {
                        break;
                    }
                }
                None => break,
            }
        }
    }

    // Half-close so the server tears the session down, then wait for its last lines
    drop(sink);
    if tokio::time::timeout(CLOSE_TIMEOUT, &mut read_task)
        .await
        .is_err()
    {
        read_task.abort();
    }

    Ok(())
}
