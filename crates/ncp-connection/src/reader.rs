use std::sync::{Arc, Weak};

use ncp_tokio::TokioFramed;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::connection::ConnectionInner;
use crate::error::{clone_without_source, ConnectionError, ConnectionErrorExt};
use crate::state::ConnectionState;
use crate::waiter::RawField;

/// Owns the read half of the connection for its whole lifetime, parsing
/// packets and dispatching their fields to registered waiters. Exits
/// (poisoning the connection) on the first decode or transport error,
/// or cleanly on peer close.
pub(crate) async fn run<S>(mut reader: TokioFramed<tokio::io::ReadHalf<S>>, inner: Weak<ConnectionInner<S>>)
where
    S: Send + Sync + Unpin + AsyncRead + AsyncWrite + 'static,
{
    loop {
        let Some(inner) = inner.upgrade() else { return };

        let read = tokio::time::timeout(inner.options.read_timeout, reader.read_packet(false)).await;

        match read {
            Ok(Ok(packet)) => {
                debug!(packet_type = %packet.packet_type, id = packet.id, fields = packet.fields.len(), "packet received");
                for field in packet.fields {
                    inner.waiters.dispatch(RawField {
                        packet_type: packet.packet_type,
                        packet_id: packet.id,
                        timestamp: packet.timestamp,
                        info: packet.info,
                        field,
                        conn: Arc::downgrade(&inner),
                    });
                }
            }
            Ok(Err(io_error)) => {
                let closed = io_error.kind() == std::io::ErrorKind::UnexpectedEof;
                let error = if closed {
                    ConnectionError::closed("reader::run")
                } else {
                    ConnectionError::network("reader::run", io_error)
                };
                inner.state.fail(clone_without_source(&error));
                inner.waiters.poison(error);
                return;
            }
            Err(_elapsed) => {
                let error = ConnectionError::timeout("reader::run");
                inner.state.fail(clone_without_source(&error));
                inner.waiters.poison(error);
                return;
            }
        }

        if matches!(inner.state.get(), ConnectionState::Closed | ConnectionState::Failed) {
            return;
        }
    }
}
