//! Console sessions: relaying bytes between a client channel and a VM console.
//!
//! A session runs two pumps. The inbound pump writes each client frame to the
//! console; the outbound pump reads the console in fixed-size chunks and sends each
//! chunk as one frame. When either pump stops, the other is signalled to stop and
//! both are joined before the session returns.

use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

pub const DEFAULT_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client frames written to the console.
    Inbound,
    /// Console chunks sent to the client.
    Outbound,
}

/// Why a pump stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpExit {
    /// The source reached its end.
    Closed,
    ReadFailed(String),
    WriteFailed(String),
    /// Stopped because the sibling pump ended first.
    Cancelled,
    Panicked(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// The pump that ended the session.
    pub ended_by: Direction,
    pub inbound: PumpExit,
    pub outbound: PumpExit,
    pub bytes_to_console: u64,
    pub bytes_to_client: u64,
}

/// Relay between a client channel and a console until either side stops.
///
/// `client_rx` yields frame payloads from the client and `client_tx` accepts
/// payloads for it. Each console read of up to `chunk_size` bytes becomes one frame.
pub async fn run_console_session<In, E, Out, C>(
    client_rx: In,
    client_tx: Out,
    console: C,
    chunk_size: usize,
) -> SessionSummary
where
    In: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Display + Send + 'static,
    Out: Sink<Bytes> + Send + Unpin + 'static,
    Out::Error: Display + Send,
    C: AsyncRead + AsyncWrite + Send + 'static,
{
    let (console_rx, console_tx) = tokio::io::split(console);
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let mut inbound = tokio::spawn(pump_inbound(client_rx, console_tx, cancel_rx.clone()));
    let mut outbound = tokio::spawn(pump_outbound(
        console_rx,
        client_tx,
        chunk_size.max(1),
        cancel_rx,
    ));

    let (ended_by, first) = tokio::select! {
        result = &mut inbound => (Direction::Inbound, result),
        result = &mut outbound => (Direction::Outbound, result),
    };

    // Receivers live inside the pumps; a send error only means both already ended.
    let _ = cancel_tx.send(true);

    let ((inbound, bytes_to_console), (outbound, bytes_to_client)) = match ended_by {
        Direction::Inbound => (settle(first), settle(outbound.await)),
        Direction::Outbound => (settle(inbound.await), settle(first)),
    };

    let summary = SessionSummary {
        ended_by,
        inbound,
        outbound,
        bytes_to_console,
        bytes_to_client,
    };

    info!(
        ended_by = ?summary.ended_by,
        inbound = ?summary.inbound,
        outbound = ?summary.outbound,
        bytes_to_console,
        bytes_to_client,
        "console session ended"
    );
    summary
}

fn settle(result: Result<(PumpExit, u64), JoinError>) -> (PumpExit, u64) {
    match result {
        Ok(outcome) => outcome,
        Err(err) => (PumpExit::Panicked(err.to_string()), 0),
    }
}

async fn pump_inbound<In, E, W>(
    mut client_rx: In,
    mut console_tx: W,
    mut cancel: watch::Receiver<bool>,
) -> (PumpExit, u64)
where
    In: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
    W: AsyncWrite + Unpin,
{
    let mut total = 0u64;

    let exit = loop {
        let frame = tokio::select! {
            _ = cancel.changed() => break PumpExit::Cancelled,
            frame = client_rx.next() => frame,
        };

        let data = match frame {
            None => break PumpExit::Closed,
            Some(Err(err)) => {
                warn!(error = %err, "error reading from client");
                break PumpExit::ReadFailed(err.to_string());
            }
            Some(Ok(data)) => data,
        };

        let written = tokio::select! {
            _ = cancel.changed() => break PumpExit::Cancelled,
            result = write_frame(&mut console_tx, &data) => result,
        };
        if let Err(err) = written {
            warn!(error = %err, "error writing to console");
            break PumpExit::WriteFailed(err.to_string());
        }
        total += data.len() as u64;
    };

    if let Err(err) = console_tx.shutdown().await {
        debug!(error = %err, "console write side already closed");
    }
    (exit, total)
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> std::io::Result<()> {
    writer.write_all(data).await?;
    writer.flush().await
}

async fn pump_outbound<R, Out>(
    mut console_rx: R,
    mut client_tx: Out,
    chunk_size: usize,
    mut cancel: watch::Receiver<bool>,
) -> (PumpExit, u64)
where
    R: AsyncRead + Unpin,
    Out: Sink<Bytes> + Unpin,
    Out::Error: Display,
{
    let mut buf = vec![0u8; chunk_size];
    let mut total = 0u64;

    let exit = loop {
        let read = tokio::select! {
            _ = cancel.changed() => break PumpExit::Cancelled,
            result = console_rx.read(&mut buf) => result,
        };

        let n = match read {
            Ok(0) => break PumpExit::Closed,
            Ok(n) => n,
            Err(err) => {
                warn!(error = %err, "error reading from console");
                break PumpExit::ReadFailed(err.to_string());
            }
        };

        let sent = tokio::select! {
            _ = cancel.changed() => break PumpExit::Cancelled,
            result = client_tx.send(Bytes::copy_from_slice(&buf[..n])) => result,
        };
        if let Err(err) = sent {
            warn!(error = %err, "error writing to client");
            break PumpExit::WriteFailed(err.to_string());
        }
        total += n as u64;
    };

    if let Err(err) = client_tx.close().await {
        debug!(error = %err, "client channel already closed");
    }
    (exit, total)
}
