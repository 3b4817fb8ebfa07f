use std::sync::Weak;

use chrono::{DateTime, Utc};
use ncp_pdu::{Field, Identifier};
use tokio::sync::mpsc;

use crate::connection::ConnectionInner;
use crate::error::{ConnectionError, ConnectionErrorExt, ConnectionResult};
use crate::waiter::{FieldEvent, RawField};

/// A received field together with the packet metadata it arrived in.
///
/// A field carrying `ERRC` never reaches here as `Ok` — `WaiterRegistry::dispatch`
/// already turns it into `Err(CommandError)` before it is delivered (spec §7).
pub struct RecvField<S> {
    pub packet_type: Identifier,
    pub packet_id: u32,
    pub timestamp: DateTime<Utc>,
    pub info: [u8; 4],
    pub field: Field,
    conn: Weak<ConnectionInner<S>>,
}

impl<S> RecvField<S> {
    pub(crate) fn from_raw(raw: RawField<S>) -> Self {
        Self {
            packet_type: raw.packet_type,
            packet_id: raw.packet_id,
            timestamp: raw.timestamp,
            info: raw.info,
            field: raw.field,
            conn: raw.conn,
        }
    }
}

impl<S> RecvField<S>
where
    S: Send + Sync + Unpin + tokio::io::AsyncRead + tokio::io::AsyncWrite + 'static,
{
    /// Sends a `LINK ACKN` for this packet (spec §4.3: "servers use it to
    /// acknowledge client work items"). A no-op if the connection has
    /// already been dropped.
    pub async fn ack(&self) -> ConnectionResult<()> {
        let Some(inner) = self.conn.upgrade() else {
            return Ok(());
        };
        inner.send_ackn(self.packet_id).await
    }
}

pub(crate) async fn recv_from<S>(rx: &mut mpsc::Receiver<FieldEvent<S>>) -> ConnectionResult<RecvField<S>>
where
    S: 'static,
{
    match rx.recv().await {
        Some(Ok(raw)) => Ok(RecvField::from_raw(raw)),
        Some(Err(error)) => Err(error),
        None => Err(ConnectionError::closed("recv_from")),
    }
}

/// Yields fields correlated by packet id with the packet `send_and_recv`
/// sent, until the connection closes or the per-call timeout elapses.
pub struct Response<S> {
    pub(crate) rx: mpsc::Receiver<FieldEvent<S>>,
    pub(crate) waiter_id: u64,
    pub(crate) conn: Weak<ConnectionInner<S>>,
}

impl<S> Response<S>
where
    S: 'static,
{
    pub async fn next(&mut self) -> ConnectionResult<RecvField<S>> {
        recv_from(&mut self.rx).await
    }
}

impl<S> Drop for Response<S> {
    fn drop(&mut self) {
        if let Some(inner) = self.conn.upgrade() {
            inner.waiters.remove(self.waiter_id);
        }
    }
}
