//! TCP carrier for the binary adapter. Every frame travels as one length-prefixed
//! bincode message.
//!
//! Connections are `!Send`; run [`server::serve_tcp`] and anything driving a
//! [`CallbackConnection`](crate::connection::callback::CallbackConnection) inside a
//! [`tokio::task::LocalSet`].

pub mod client;
pub mod server;

use crate::connection::{CallbackTransport, TransportEvent};
use async_bincode::{tokio::AsyncBincodeStream, AsyncDestination};
use futures::{
    stream::{SplitStream, StreamExt},
    SinkExt,
};
use tokio::{io::BufStream, net::TcpStream, sync::mpsc, task};
use tracing::{trace, warn};

type FrameStream = AsyncBincodeStream<BufStream<TcpStream>, Vec<u8>, Vec<u8>, AsyncDestination>;

/// Queues frames for the socket's writer task.
#[derive(Debug, Clone)]
pub struct FrameSender(mpsc::UnboundedSender<Vec<u8>>);

impl CallbackTransport for FrameSender {
    fn send(&self, data: &[u8]) -> bool {
        self.0.send(data.to_vec()).is_ok()
    }
}

/// Inbound side of a socket: every received frame, then one `Close` or `Error`.
pub struct TcpEvents {
    stream: SplitStream<FrameStream>,
    done: bool,
}

impl TcpEvents {
    pub async fn next_event(&mut self) -> Option<TransportEvent<Vec<u8>>> {
        if self.done {
            return None;
        }
        match self.stream.next().await {
            Some(Ok(frame)) => {
                trace!(len = frame.len(), "frame received");
                Some(TransportEvent::Message(frame))
            }
            Some(Err(err)) => {
                self.done = true;
                Some(TransportEvent::Error(err.to_string()))
            }
            None => {
                self.done = true;
                Some(TransportEvent::Close)
            }
        }
    }
}

/// Splits `sock` into a frame sender, backed by a spawned writer task, and the inbound
/// events.
pub(crate) fn split(sock: TcpStream) -> (FrameSender, TcpEvents) {
    let framed: FrameStream = AsyncBincodeStream::from(BufStream::new(sock)).for_async();
    let (mut sink, stream) = framed.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

    task::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(err) = sink.send(frame).await {
                warn!(%err, "failed to write frame");
                break;
            }
        }
    });

    (
        FrameSender(tx),
        TcpEvents {
            stream,
            done: false,
        },
    )
}
