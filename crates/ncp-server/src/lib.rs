//! `start_server()`: the server-side entry point for NCP (spec §4.4, §6).
//!
//! Binds a `tokio::net::TcpListener` and accepts connections in a loop,
//! grounded directly on `RdpServer::run`'s `tokio::select!` accept loop
//! (`ironrdp-server/src/server.rs`): one task per accepted connection, a
//! `JoinSet` tracking in-flight connection tasks, and an event channel used
//! for graceful shutdown.

mod error;

pub use error::{ServerError, ServerErrorExt, ServerErrorKind, ServerResult};
pub use ncp_connection::{AuthPredicate, ConnectionHandler, ServerOptions};

use std::net::SocketAddr;
use std::time::Duration;

use ncp_connection::Connection;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Grace period `Server::close` waits for in-flight connection tasks to
/// finish before abandoning them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

enum ServerEvent {
    Quit,
}

/// A handle to a running NCP server's accept loop.
pub struct Server {
    local_addr: SocketAddr,
    ev_tx: mpsc::UnboundedSender<ServerEvent>,
    accept_task: tokio::task::JoinHandle<()>,
}

impl Server {
    /// The address the listener is bound to (useful when `port` was `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Requests shutdown and waits for the accept loop (and, within a grace
    /// period, in-flight connection tasks) to finish.
    pub async fn close(self) {
        let _ = self.ev_tx.send(ServerEvent::Quit);
        if let Err(error) = self.accept_task.await {
            warn!(?error, "server accept task panicked");
        }
    }
}

/// Binds `host:port` and accepts NCP connections, handshaking each with
/// `auth` (spec §4.3) and handing the `Ready` connection to `handler`.
pub async fn start_server<H, A>(host: &str, port: u16, auth: A, handler: H, options: ServerOptions) -> ServerResult<Server>
where
    H: ConnectionHandler<TcpStream>,
    A: AuthPredicate + Clone + Send + Sync + 'static,
{
    let listener = TcpListener::bind((host, port))
        .await
        .map_err(|e| ServerError::bind("start_server", e))?;
    let local_addr = listener.local_addr().map_err(|e| ServerError::bind("start_server", e))?;
    debug!(%local_addr, "NCP server listening");

    let (ev_tx, mut ev_rx) = mpsc::unbounded_channel();

    let accept_task = tokio::spawn(async move {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                Some(ServerEvent::Quit) = ev_rx.recv() => {
                    debug!("server received quit event");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "accepted connection");
                            if let Err(error) = stream.set_nodelay(true) {
                                warn!(?error, %peer, "failed to set TCP_NODELAY");
                            }
                            let handler = handler.clone();
                            let auth = auth.clone();
                            let options = options.clone();
                            connections.spawn(async move {
                                match Connection::establish_server(stream, &auth, options).await {
                                    Ok(connection) => handler.handle(connection).await,
                                    Err(error) => warn!(?error, %peer, "handshake failed"),
                                }
                            });
                        }
                        Err(error) => {
                            error!(?error, "accept failed");
                        }
                    }
                }
                Some(result) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(error) = result {
                        warn!(?error, "connection task panicked");
                    }
                }
            }
        }

        if tokio::time::timeout(SHUTDOWN_GRACE, connections.shutdown()).await.is_err() {
            warn!("timed out waiting for in-flight connections to finish");
        }
    });

    Ok(Server {
        local_addr,
        ev_tx,
        accept_task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncp_connection::{ConnectionOptions, FieldData};
    use ncp_pdu::Identifier;
    use std::future::Future;
    use std::pin::Pin;

    fn ident(s: &str) -> Identifier {
        Identifier::try_from(s).unwrap()
    }

    #[derive(Clone)]
    struct EchoHandler;

    impl ConnectionHandler<TcpStream> for EchoHandler {
        type Future = Pin<Box<dyn Future<Output = ()> + Send>>;

        fn handle(&self, connection: Connection<TcpStream>) -> Self::Future {
            Box::pin(async move {
                if let Ok(field) = connection.recv().await {
                    let _ = connection
                        .send_packet(field.packet_type, field.packet_id, vec![FieldData::new(ident("PONG"), vec![])])
                        .await;
                }
            })
        }
    }

    #[tokio::test]
    async fn accepts_and_handshakes_a_client() {
        let server = start_server(
            "127.0.0.1",
            0,
            |_id: &str, _nonce: &[u8], _response: &[u8]| true,
            EchoHandler,
            ServerOptions::default(),
        )
        .await
        .expect("server starts");

        let addr = server.local_addr();
        let client = ncp_client::connect(
            &addr.ip().to_string(),
            addr.port(),
            "node-a",
            |nonce| nonce.to_vec(),
            ConnectionOptions::default(),
        )
        .await
        .expect("client connects");

        client
            .send(ident("NCPT"), vec![FieldData::new(ident("PING"), vec![])])
            .await
            .expect("send succeeds");
        let reply = client.recv().await.expect("reply received");
        assert_eq!(reply.field.name, ident("PONG"));

        client.close().await;
        server.close().await;
    }
}
