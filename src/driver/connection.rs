//! Connection abstraction for the session pipeline.
//!
//! A session never touches bytes. It needs an exclusive, ordered pipe that
//! accepts [`BoltRequest`]s and yields [`BoltResponse`]s, which is exactly a
//! `Sink` + `Stream` pair. Framing and socket handling live behind it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Sink, Stream};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::driver::ServerAddress;
use crate::bolt::{BoltError, BoltRequest, BoltResponse, BoltResult};

/// An ordered, bidirectional message pipe to one server.
///
/// Responses must arrive in the order their requests were written. The end
/// of the stream means the connection is gone.
pub trait Connection:
    Sink<BoltRequest, Error = BoltError>
    + Stream<Item = BoltResult<BoltResponse>>
    + Send
    + Unpin
    + 'static
{
}

impl<T> Connection for T where
    T: Sink<BoltRequest, Error = BoltError>
        + Stream<Item = BoltResult<BoltResponse>>
        + Send
        + Unpin
        + 'static
{
}

/// Opens connections for a driver.
pub trait Connector: Send + Sync + 'static {
    /// Connection type produced by this connector.
    type Connection: Connection;

    /// Open a connection ready to accept RUN/BEGIN.
    fn connect(
        &self,
        address: &ServerAddress,
    ) -> impl Future<Output = BoltResult<Self::Connection>> + Send;
}

/// Create an in-memory connection and the server side of it.
pub fn channel() -> (ChannelConnection, ServerEndpoint) {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = mpsc::unbounded_channel();

    let connection = ChannelConnection {
        outbound: Some(request_tx),
        inbound: UnboundedReceiverStream::new(response_rx),
    };
    let endpoint = ServerEndpoint {
        requests: request_rx,
        responses: response_tx,
    };
    (connection, endpoint)
}

/// Client side of an in-memory connection.
#[derive(Debug)]
pub struct ChannelConnection {
    outbound: Option<mpsc::UnboundedSender<BoltRequest>>,
    inbound: UnboundedReceiverStream<BoltResult<BoltResponse>>,
}

impl Sink<BoltRequest> for ChannelConnection {
    type Error = BoltError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<BoltResult<()>> {
        match &self.outbound {
            Some(tx) if !tx.is_closed() => Poll::Ready(Ok(())),
            _ => Poll::Ready(Err(BoltError::ConnectionClosed)),
        }
    }

    fn start_send(self: Pin<&mut Self>, item: BoltRequest) -> BoltResult<()> {
        match &self.outbound {
            Some(tx) => tx.send(item).map_err(|_| BoltError::ConnectionClosed),
            None => Err(BoltError::ConnectionClosed),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<BoltResult<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<BoltResult<()>> {
        self.outbound = None;
        Poll::Ready(Ok(()))
    }
}

impl Stream for ChannelConnection {
    type Item = BoltResult<BoltResponse>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inbound).poll_next(cx)
    }
}

/// Server side of an in-memory connection.
///
/// Dropping the endpoint ends the client's response stream.
#[derive(Debug)]
pub struct ServerEndpoint {
    requests: mpsc::UnboundedReceiver<BoltRequest>,
    responses: mpsc::UnboundedSender<BoltResult<BoltResponse>>,
}

impl ServerEndpoint {
    /// Receive the next request. `None` once the client has closed.
    pub async fn recv(&mut self) -> Option<BoltRequest> {
        self.requests.recv().await
    }

    /// Send a response to the client.
    pub fn send(&self, response: BoltResponse) -> BoltResult<()> {
        self.responses
            .send(Ok(response))
            .map_err(|_| BoltError::ConnectionClosed)
    }

    /// Report a transport failure to the client.
    pub fn fail(&self, error: BoltError) -> BoltResult<()> {
        self.responses
            .send(Err(error))
            .map_err(|_| BoltError::ConnectionClosed)
    }
}
