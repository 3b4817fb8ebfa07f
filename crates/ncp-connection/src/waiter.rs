use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use ncp_pdu::{field_error_code, field_error_detail, field_warning_code, field_warning_detail, Field, Identifier};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{clone_without_source, ConnectionError, ConnectionErrorExt};

/// A decoded field tagged with the packet metadata it arrived in, queued
/// to whichever waiter's filter claims it first.
pub(crate) struct RawField<S> {
    pub packet_type: Identifier,
    pub packet_id: u32,
    pub timestamp: DateTime<Utc>,
    pub info: [u8; 4],
    pub field: Field,
    pub conn: std::sync::Weak<crate::connection::ConnectionInner<S>>,
}

pub(crate) type FieldEvent<S> = Result<RawField<S>, ConnectionError>;

/// A predicate over `(packet_type, field_name, packet_id)`. `None` on any
/// side matches anything.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Filter {
    pub packet_type: Option<Identifier>,
    pub field_name: Option<Identifier>,
    pub packet_id: Option<u32>,
}

impl Filter {
    pub fn exact(packet_type: Identifier, field_name: Identifier) -> Self {
        Self {
            packet_type: Some(packet_type),
            field_name: Some(field_name),
            packet_id: None,
        }
    }

    /// Matches every field belonging to one packet id, regardless of type
    /// or name — used by `send_and_recv` to correlate a reply.
    pub fn packet_id(packet_id: u32) -> Self {
        Self {
            packet_type: None,
            field_name: None,
            packet_id: Some(packet_id),
        }
    }

    fn matches(&self, packet_type: Identifier, field_name: Identifier, packet_id: u32) -> bool {
        self.packet_type.is_none_or(|t| t == packet_type)
            && self.field_name.is_none_or(|n| n == field_name)
            && self.packet_id.is_none_or(|id| id == packet_id)
    }
}

struct Waiter<S> {
    id: u64,
    filter: Filter,
    tx: mpsc::Sender<FieldEvent<S>>,
}

/// Ordered set of registered waiters (spec §9: "set of filter predicates
/// in registration order, first match claims the field"), plus the
/// unfiltered general queue every unclaimed field falls through to.
pub(crate) struct WaiterRegistry<S> {
    waiters: Mutex<Vec<Waiter<S>>>,
    next_id: AtomicU64,
    general_tx: mpsc::Sender<FieldEvent<S>>,
}

impl<S> WaiterRegistry<S> {
    pub fn new(general_tx: mpsc::Sender<FieldEvent<S>>) -> Self {
        Self {
            waiters: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            general_tx,
        }
    }

    /// Registers a new waiter with bounded capacity, returning its id
    /// (for later removal) and the receiving half of its mailbox.
    pub fn register(&self, filter: Filter, capacity: usize) -> (u64, mpsc::Receiver<FieldEvent<S>>) {
        let (tx, rx) = mpsc::channel(capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push(Waiter { id, filter, tx });
        (id, rx)
    }

    pub fn remove(&self, id: u64) {
        self.lock().retain(|w| w.id != id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Waiter<S>>> {
        self.waiters.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Routes one decoded field to the first matching waiter, or the
    /// general queue if none matches. Never blocks: a full mailbox drops
    /// the field and is torn down rather than stalling the reader task.
    ///
    /// A field carrying `WARC` logs a command warning but is still
    /// delivered normally; a field carrying `ERRC` is delivered as
    /// `Err(CommandError)` instead of `Ok` (spec §7).
    pub fn dispatch(&self, event: RawField<S>) {
        if let Some(code) = field_warning_code(&event.field) {
            let detail = field_warning_detail(&event.field);
            warn!(packet_type = %event.packet_type, field = %event.field.name, code, ?detail, "command warning (WARC)");
        }

        let target = {
            let waiters = self.lock();
            waiters
                .iter()
                .find(|w| w.filter.matches(event.packet_type, event.field.name, event.packet_id))
                .map(|w| (w.id, w.tx.clone()))
        };

        let field_event: FieldEvent<S> = match field_error_code(&event.field) {
            Some(code) => {
                let detail = field_error_detail(&event.field);
                Err(ConnectionError::command("waiter_registry::dispatch", event.packet_type, event.field.name, detail, code))
            }
            None => Ok(event),
        };

        let Some((id, tx)) = target else {
            if let Err(mpsc::error::TrySendError::Full(_)) = self.general_tx.try_send(field_event) {
                warn!("general recv() queue is full, dropping field");
            }
            return;
        };

        if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(field_event) {
            warn!("waiter mailbox overflowed, dropping waiter");
            self.remove(id);
            let _ = tx.try_send(Err(ConnectionError::overflow("waiter_registry::dispatch")));
        }
    }

    /// Broadcasts a poisoning decode error to every registered waiter and
    /// the general queue exactly once, matching spec §7's propagation
    /// policy, then clears the registry.
    pub fn poison(&self, error: ConnectionError) {
        let waiters = std::mem::take(&mut *self.lock());
        for waiter in waiters {
            let _ = waiter.tx.try_send(Err(clone_without_source(&error)));
        }
        let _ = self.general_tx.try_send(Err(error));
    }
}
