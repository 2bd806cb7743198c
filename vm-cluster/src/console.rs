//! VM console connections.
//!
//! KubeVirt exposes a running instance's console as a WebSocket subresource. The
//! connector performs the upgrade through the shared kube client (so cluster
//! credentials apply) and hands back a plain duplex byte stream.

use crate::error::{ClusterError, Result};
use crate::scope::RequestScope;
use async_trait::async_trait;
use bytes::{Buf, Bytes};
use futures_util::{Sink, Stream};
use http::{header, Request, StatusCode};
use hyper_util::rt::TokioIo;
use kube::{client::Body, Client};
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_tungstenite::{
    tungstenite::{self, handshake::client::generate_key, protocol::Role, Message},
    WebSocketStream,
};
use tracing::{debug, instrument};

const SUBRESOURCE_API: &str = "/apis/subresources.kubevirt.io/v1";
const CONSOLE_PROTOCOL: &str = "plain.kubevirt.io";

/// Duplex byte stream to a VM console.
pub trait ConsoleIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> ConsoleIo for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

pub type ConsoleStream = Box<dyn ConsoleIo>;

#[async_trait]
pub trait ConsoleConnector: Send + Sync {
    /// Open the console of the named VM instance in the scope's namespace.
    async fn open(&self, scope: &RequestScope, name: &str) -> Result<ConsoleStream>;
}

pub fn vnc_path(namespace: &str, name: &str) -> String {
    format!("{SUBRESOURCE_API}/namespaces/{namespace}/virtualmachineinstances/{name}/vnc")
}

/// [`ConsoleConnector`] for the KubeVirt `vnc` subresource.
#[derive(Clone)]
pub struct KubevirtConsole {
    client: Client,
}

impl KubevirtConsole {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConsoleConnector for KubevirtConsole {
    #[instrument(skip_all, fields(
        request_id = %scope.request_id(),
        namespace = %scope.namespace(),
        name = %name,
    ))]
    async fn open(&self, scope: &RequestScope, name: &str) -> Result<ConsoleStream> {
        let request = Request::get(vnc_path(scope.namespace(), name))
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header(header::SEC_WEBSOCKET_VERSION, "13")
            .header(header::SEC_WEBSOCKET_KEY, generate_key())
            .header(header::SEC_WEBSOCKET_PROTOCOL, CONSOLE_PROTOCOL)
            .body(Body::empty())
            .map_err(|e| ClusterError::Upgrade(e.to_string()))?;

        let response = scope
            .run(async { self.client.send(request).await.map_err(ClusterError::from) })
            .await?;

        let status = response.status();
        if status != StatusCode::SWITCHING_PROTOCOLS {
            return Err(ClusterError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                message: format!("console of {name} is unavailable: {status}"),
            });
        }

        let upgraded = hyper::upgrade::on(response)
            .await
            .map_err(|e| ClusterError::Upgrade(e.to_string()))?;
        let socket =
            WebSocketStream::from_raw_socket(TokioIo::new(upgraded), Role::Client, None).await;

        debug!("console connection established");
        Ok(Box::new(WebSocketIo::new(socket)))
    }
}

/// Byte-stream view of a WebSocket.
///
/// Reads yield the payload of binary and text frames in order; a close frame or the
/// end of the socket reads as EOF. Each write is sent as one binary frame.
pub struct WebSocketIo<S> {
    socket: S,
    pending: Bytes,
}

impl<S> WebSocketIo<S> {
    pub fn new(socket: S) -> Self {
        Self {
            socket,
            pending: Bytes::new(),
        }
    }
}

impl<S> AsyncRead for WebSocketIo<S>
where
    S: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        loop {
            if !this.pending.is_empty() {
                let n = this.pending.len().min(buf.remaining());
                buf.put_slice(&this.pending[..n]);
                this.pending.advance(n);
                return Poll::Ready(Ok(()));
            }

            match ready!(Pin::new(&mut this.socket).poll_next(cx)) {
                Some(Ok(Message::Binary(data))) => this.pending = Bytes::from(data),
                Some(Ok(Message::Text(text))) => {
                    this.pending = Bytes::copy_from_slice(text.as_str().as_bytes())
                }
                Some(Ok(Message::Close(_))) | None => return Poll::Ready(Ok(())),
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Poll::Ready(Err(io::Error::other(err))),
            }
        }
    }
}

impl<S> AsyncWrite for WebSocketIo<S>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(Pin::new(&mut this.socket).poll_ready(cx)).map_err(io::Error::other)?;
        Pin::new(&mut this.socket)
            .start_send(Message::binary(buf.to_vec()))
            .map_err(io::Error::other)?;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().socket)
            .poll_flush(cx)
            .map_err(io::Error::other)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match ready!(Pin::new(&mut self.get_mut().socket).poll_close(cx)) {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed) => Poll::Ready(Ok(())),
            Err(err) => Poll::Ready(Err(io::Error::other(err))),
        }
    }
}
