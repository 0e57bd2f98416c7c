use super::split;
use crate::{connection::callback::ClientHandler, mapping::FunctionMapping};
use std::{io, rc::Rc};
use tokio::{
    net::{TcpListener, TcpStream},
    task,
};
use tracing::{debug, warn};

/// Accepts connections forever, serving each on its own local task. Must run inside a
/// [`LocalSet`](tokio::task::LocalSet).
pub async fn serve_tcp(mapping: Rc<FunctionMapping>, listener: TcpListener) -> io::Result<()> {
    loop {
        let (sock, addr) = listener.accept().await?;
        debug!(%addr, "accepted connection");
        task::spawn_local(serve_connection(mapping.clone(), sock));
    }
}

/// Serves calls arriving on `sock` until the peer disconnects.
pub async fn serve_connection(mapping: Rc<FunctionMapping>, sock: TcpStream) {
    let (sender, mut events) = split(sock);
    let handler = ClientHandler::new(sender, mapping);
    while let Some(event) = events.next_event().await {
        if let Err(err) = handler.handle_event(event) {
            warn!(%err, "dropping request");
        }
    }
}
