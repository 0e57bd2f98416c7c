use super::{split, FrameSender, TcpEvents};
use crate::connection::callback::CallbackConnection;
use std::io;
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::warn;

/// Opens a socket. Hand the sender to a
/// [`CallbackConnection`] and feed it the events, e.g. with [`run`].
pub async fn connect(addr: impl ToSocketAddrs) -> io::Result<(FrameSender, TcpEvents)> {
    let sock = TcpStream::connect(addr).await?;
    Ok(split(sock))
}

/// Delivers socket events to `connection` until the socket closes. Pending calls fail
/// with the close reason at the end.
pub async fn run(connection: CallbackConnection<FrameSender>, mut events: TcpEvents) {
    while let Some(event) = events.next_event().await {
        if let Err(err) = connection.handle_event(event) {
            warn!(%err, "dropping reply");
        }
    }
}
