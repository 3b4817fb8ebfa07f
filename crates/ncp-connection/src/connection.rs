use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::Utc;
use ncp_acceptor::AuthPredicate;
use ncp_pdu::{Field, Identifier, Packet};
use ncp_tokio::{split_tokio_framed, TokioFramed};
use tokio::io::{AsyncRead, AsyncWrite, WriteHalf};
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::error::{clone_without_source, ClientError, ClientErrorKind, ConnectionError, ConnectionErrorExt, ConnectionResult};
use crate::field_data::FieldData;
use crate::options::ConnectionOptions;
use crate::recv::{recv_from, RecvField, Response};
use crate::state::{ConnectionState, StateCell};
use crate::waiter::{Filter, WaiterRegistry};
use crate::{reader, GENERAL_QUEUE_CAPACITY, WAITER_CAPACITY};

/// General queue bound, plus everything the background reader task and
/// the writer half need that outlives any single `send`/`recv` call.
pub(crate) struct ConnectionInner<S> {
    pub(crate) writer: AsyncMutex<TokioFramed<WriteHalf<S>>>,
    pub(crate) waiters: WaiterRegistry<S>,
    pub(crate) state: StateCell,
    pub(crate) options: ConnectionOptions,
    next_id: AtomicU32,
}

/// A live NCP connection: one background reader task demultiplexing
/// inbound fields, and a mutex-guarded writer half shared by `send` callers
/// (spec §4.3, §5).
pub struct Connection<S> {
    inner: Arc<ConnectionInner<S>>,
    general_rx: AsyncMutex<mpsc::Receiver<crate::waiter::FieldEvent<S>>>,
    reader_task: tokio::task::JoinHandle<()>,
}

impl<S> Connection<S>
where
    S: Send + Sync + Unpin + AsyncRead + AsyncWrite + 'static,
{
    /// Drives the client-side handshake over `stream`, then returns a
    /// `Ready` connection (spec §4.4 `connect`).
    pub async fn establish_client(
        stream: S,
        identity: &str,
        auth_response: impl FnOnce(&[u8]) -> Vec<u8>,
        options: ConnectionOptions,
    ) -> Result<Self, ClientError> {
        let mut framed = TokioFramed::new(stream);
        if options.auto_auth {
            ncp_connector::client_handshake(&mut framed, identity, auth_response)
                .await
                .map_err(client_error_from_connector)?;
        }
        Ok(Self::from_handshaken(framed, options))
    }

    /// Drives the server-side handshake over `stream`, then returns a
    /// `Ready` connection (spec §4.4 `start_server`). Rejected
    /// authentication is surfaced as an error; the caller (the accept
    /// loop) is responsible for dropping the stream.
    pub async fn establish_server(stream: S, auth: &impl AuthPredicate, options: ConnectionOptions) -> ConnectionResult<Self> {
        let mut framed = TokioFramed::new(stream);
        ncp_acceptor::server_handshake(&mut framed, auth)
            .await
            .map_err(|e| ConnectionError::new("establish_server", crate::error::ConnectionErrorKind::Network).with_source(e))?;
        Ok(Self::from_handshaken(framed, options))
    }

    fn from_handshaken(framed: TokioFramed<S>, options: ConnectionOptions) -> Self {
        let (reader_framed, writer_framed) = split_tokio_framed(framed);
        let (general_tx, general_rx) = mpsc::channel(GENERAL_QUEUE_CAPACITY);

        let inner = Arc::new(ConnectionInner {
            writer: AsyncMutex::new(writer_framed),
            waiters: WaiterRegistry::new(general_tx),
            state: StateCell::new(ConnectionState::Ready),
            options,
            next_id: AtomicU32::new(1),
        });

        let reader_task = tokio::spawn(reader::run(reader_framed, Arc::downgrade(&inner)));

        Self {
            inner,
            general_rx: AsyncMutex::new(general_rx),
            reader_task,
        }
    }

    fn check_alive(&self) -> ConnectionResult<()> {
        match self.inner.state.get() {
            ConnectionState::Closed | ConnectionState::Closing => Err(ConnectionError::closed("check_alive")),
            ConnectionState::Failed => Err(self.inner.state.failure().unwrap_or_else(|| ConnectionError::closed("check_alive"))),
            _ => Ok(()),
        }
    }

    /// Allocates a fresh packet id and writes `fields` as one packet.
    pub async fn send(&self, packet_type: Identifier, fields: Vec<FieldData>) -> ConnectionResult<u32> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.send_packet(packet_type, id, fields).await?;
        Ok(id)
    }

    /// As [`Connection::send`] with a caller-chosen packet id, used for replies.
    ///
    /// A write timeout or transport error leaves the stream in an unknown
    /// state (a partial frame may already be on the wire), so it fails the
    /// connection the same way a reader-side transport error does (spec
    /// §7 "Any state -> FAILED on ... a transport error").
    pub async fn send_packet(&self, packet_type: Identifier, packet_id: u32, fields: Vec<FieldData>) -> ConnectionResult<()> {
        self.check_alive()?;
        let fields = fields
            .into_iter()
            .map(|f| Field::new(f.name, 0, f.params))
            .collect::<Vec<_>>();
        let packet = Packet::new(packet_type, packet_id, Utc::now(), [0; 4], fields);

        let mut writer = self.inner.writer.lock().await;
        let write_result = tokio::time::timeout(self.inner.options.send_timeout, writer.write_packet(&packet)).await;
        drop(writer);

        let error = match write_result {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(io_error)) => ConnectionError::network("send_packet", io_error),
            Err(_elapsed) => ConnectionError::timeout("send_packet"),
        };

        self.inner.state.fail(clone_without_source(&error));
        self.inner.waiters.poison(clone_without_source(&error));
        Err(error)
    }

    /// Returns the next field not claimed by a more specific waiter, in
    /// wire order.
    pub async fn recv(&self) -> ConnectionResult<RecvField<S>> {
        let mut rx = self.general_rx.lock().await;
        recv_from(&mut rx).await
    }

    /// Filtered `recv`: consumes fields in wire order, returning only
    /// those matching `(packet_type, field_name)`.
    pub async fn recv_field(&self, packet_type: Identifier, field_name: Identifier) -> ConnectionResult<RecvField<S>> {
        let (id, mut rx) = self.inner.waiters.register(Filter::exact(packet_type, field_name), WAITER_CAPACITY);
        let result = recv_from(&mut rx).await;
        self.inner.waiters.remove(id);
        result
    }

    /// Sends one packet, then returns a [`Response`] yielding subsequent
    /// fields whose packet id matches.
    pub async fn send_and_recv(&self, packet_type: Identifier, fields: Vec<FieldData>) -> ConnectionResult<Response<S>> {
        let packet_id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (waiter_id, rx) = self.inner.waiters.register(Filter::packet_id(packet_id), WAITER_CAPACITY);
        if let Err(error) = self.send_packet(packet_type, packet_id, fields).await {
            self.inner.waiters.remove(waiter_id);
            return Err(error);
        }
        Ok(Response {
            rx,
            waiter_id,
            conn: Arc::downgrade(&self.inner),
        })
    }

    /// Transitions to `Closing`, stops the reader task, and releases the
    /// transport.
    pub async fn close(&self) {
        self.inner.state.set(ConnectionState::Closing);
        self.reader_task.abort();
        self.inner.state.set(ConnectionState::Closed);
    }
}

impl<S> ConnectionInner<S>
where
    S: Send + Sync + Unpin + AsyncRead + AsyncWrite + 'static,
{
    pub(crate) async fn send_ackn(&self, packet_id: u32) -> ConnectionResult<()> {
        let ackn = Identifier::try_from("LINK").expect("LINK is a valid identifier");
        let field_name = Identifier::try_from("ACKN").expect("ACKN is a valid identifier");
        let packet = Packet::new(ackn, packet_id, Utc::now(), [0; 4], vec![Field::new(field_name, 0, vec![])]);
        let mut writer = self.writer.lock().await;
        let write_result = tokio::time::timeout(self.options.send_timeout, writer.write_packet(&packet)).await;
        drop(writer);

        let error = match write_result {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(io_error)) => ConnectionError::network("send_ackn", io_error),
            Err(_elapsed) => ConnectionError::timeout("send_ackn"),
        };

        self.state.fail(clone_without_source(&error));
        self.waiters.poison(clone_without_source(&error));
        Err(error)
    }
}

fn client_error_from_connector(error: ncp_connector::ConnectorError) -> ClientError {
    use ncp_connector::ConnectorErrorKind;
    if let ConnectorErrorKind::Authentication { detail, code } = &error.kind {
        return ClientError::new(
            "establish_client",
            ClientErrorKind::Authentication {
                detail: detail.clone(),
                code: *code,
            },
        );
    }
    ClientError::new("establish_client", ClientErrorKind::Connection(crate::error::ConnectionErrorKind::Network)).with_source(error)
}

/// A caller-supplied connection handler, invoked once per accepted,
/// handshaken connection (spec §4.4 `start_server`).
pub trait ConnectionHandler<S>: Clone + Send + 'static
where
    S: Send + Sync + Unpin + AsyncRead + AsyncWrite + 'static,
{
    type Future: Future<Output = ()> + Send;

    fn handle(&self, connection: Connection<S>) -> Self::Future;
}
