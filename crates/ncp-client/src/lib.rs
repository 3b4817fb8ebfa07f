//! `connect()`: the client-side entry point for NCP (spec §4.4, §6).
//!
//! Thin wrapper around [`ncp_connection::Connection::establish_client`] that
//! owns the `tokio::net::TcpStream` dial.

use ncp_connection::{ClientError, ClientErrorKind, Connection, ConnectionErrorKind, ConnectionOptions};
use tokio::net::TcpStream;
use tracing::debug;

/// Default NCP port, used when the caller does not have a more specific one.
pub const DEFAULT_PORT: u16 = 9999;

/// A connection to a remote NCP node, dialed over TCP.
pub type NcpConnection = Connection<TcpStream>;

/// Dials `host:port`, then drives the client handshake (spec §4.3) and
/// returns a `Ready` connection.
///
/// `auth_response` computes the `CIW` response parameter from the server's
/// nonce (e.g. an HMAC over a shared secret); it is only invoked when
/// `options.auto_auth` is set.
pub async fn connect(
    host: &str,
    port: u16,
    identity: &str,
    auth_response: impl FnOnce(&[u8]) -> Vec<u8>,
    options: ConnectionOptions,
) -> Result<NcpConnection, ClientError> {
    debug!(host, port, identity, "dialing NCP node");
    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|e| ClientError::new("connect", ClientErrorKind::Connection(ConnectionErrorKind::Network)).with_source(e))?;
    stream.set_nodelay(true).map_err(|e| {
        ClientError::new("connect", ClientErrorKind::Connection(ConnectionErrorKind::Network)).with_source(e)
    })?;

    Connection::establish_client(stream, identity, auth_response, options).await
}
