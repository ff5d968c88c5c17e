//! Observable sync state shared between the data layer adapter and the UI.
//!
//! The store owns three independent channels: the booking list, the
//! connectivity flag, and the sync status. Each channel keeps only its latest
//! value; new subscribers see that value first and then every later change.
//!
//! Writers take an [`UpdateTicket`] when an operation is *invoked* and apply
//! their value with it once the operation completes. A ticket is ignored if a
//! later ticket on the same channel has already been applied, so the final
//! state always follows call order even when completions race.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::models::Booking;
use crate::util::unix_millis_now;

/// Unified sync state for the booking list, see [`SyncStatus::can_advance_to`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    Uninitialized,
    LoadingCache,
    /// Cache produced a booking list
    Seeded,
    /// Cache had nothing usable
    Empty,
    /// A republish request reached at least one phone
    Refreshing,
    /// Phone pushed a fresh list
    Updated,
}

impl SyncStatus {
    /// Cache outcomes only land while a cache load is in flight; refresh and
    /// update transitions are always allowed.
    pub const fn can_advance_to(self, next: Self) -> bool {
        match next {
            Self::Uninitialized => false,
            Self::LoadingCache => matches!(self, Self::Uninitialized | Self::Seeded | Self::Empty),
            Self::Seeded | Self::Empty => matches!(self, Self::LoadingCache),
            Self::Refreshing | Self::Updated => true,
        }
    }
}

/// Sync status plus the time of the last applied booking update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub status: SyncStatus,
    /// Unix ms of the most recent applied booking list
    pub last_updated_at: Option<i64>,
}

/// Call-order token for one pending write to a store channel.
#[derive(Debug)]
#[must_use = "an update ticket does nothing until applied"]
pub struct UpdateTicket<T> {
    seq: u64,
    _channel: PhantomData<fn() -> T>,
}

impl<T> UpdateTicket<T> {
    /// Position of this write in call order.
    pub const fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Clone, Debug)]
struct Versioned<T> {
    seq: u64,
    value: T,
}

struct Channel<T> {
    tx: watch::Sender<Versioned<T>>,
    issued: AtomicU64,
}

impl<T: Clone> Channel<T> {
    fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(Versioned {
            seq: 0,
            value: initial,
        });
        Self {
            tx,
            issued: AtomicU64::new(0),
        }
    }

    fn ticket(&self) -> UpdateTicket<T> {
        UpdateTicket {
            seq: self.issued.fetch_add(1, Ordering::SeqCst) + 1,
            _channel: PhantomData,
        }
    }

    /// Swap in `value` under the channel lock unless a newer ticket won.
    fn apply(&self, ticket: UpdateTicket<T>, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if ticket.seq <= current.seq {
                return false;
            }
            *current = Versioned {
                seq: ticket.seq,
                value,
            };
            true
        })
    }

    fn current(&self) -> T {
        self.tx.borrow().value.clone()
    }

    fn applied_seq(&self) -> u64 {
        self.tx.borrow().seq
    }

    fn subscribe(&self) -> Subscription<T> {
        Subscription {
            rx: self.tx.subscribe(),
            primed: false,
        }
    }
}

/// Live view of one store channel.
///
/// Yields the current value first, then each change in order. Returns `None`
/// once the store is gone. Dropping the subscription detaches it.
pub struct Subscription<T> {
    rx: watch::Receiver<Versioned<T>>,
    primed: bool,
}

impl<T: Clone> Subscription<T> {
    /// Wait for the next value.
    pub async fn next(&mut self) -> Option<T> {
        if self.primed {
            self.rx.changed().await.ok()?;
        } else {
            self.primed = true;
        }
        Some(self.rx.borrow_and_update().value.clone())
    }

    /// Latest value without waiting.
    pub fn current(&self) -> T {
        self.rx.borrow().value.clone()
    }
}

impl<T: Clone> Clone for Subscription<T> {
    /// A cloned subscription restarts from the current value.
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            primed: false,
        }
    }
}

/// Single source of truth for what the watch face displays.
pub struct SyncStore {
    bookings: Channel<Vec<Booking>>,
    connected: Channel<bool>,
    status: watch::Sender<StatusSnapshot>,
}

impl SyncStore {
    /// Create an empty, disconnected store.
    pub fn new() -> Self {
        let (status, _rx) = watch::channel(StatusSnapshot {
            status: SyncStatus::Uninitialized,
            last_updated_at: None,
        });
        Self {
            bookings: Channel::new(Vec::new()),
            connected: Channel::new(false),
            status,
        }
    }

    /// Current booking list.
    pub fn bookings(&self) -> Vec<Booking> {
        self.bookings.current()
    }

    /// Result of the most recent connectivity probe.
    pub fn is_connected(&self) -> bool {
        self.connected.current()
    }

    pub fn status(&self) -> StatusSnapshot {
        *self.status.borrow()
    }

    /// Replace the booking list wholesale.
    pub fn publish_bookings(&self, bookings: Vec<Booking>) -> bool {
        let ticket = self.begin_bookings_update();
        self.apply_bookings(ticket, bookings)
    }

    /// Reserve a call-order slot for a booking list that is still being fetched.
    pub fn begin_bookings_update(&self) -> UpdateTicket<Vec<Booking>> {
        self.bookings.ticket()
    }

    /// Apply a booking list reserved with [`Self::begin_bookings_update`].
    ///
    /// Returns `false` when a later call already replaced the list.
    pub fn apply_bookings(&self, ticket: UpdateTicket<Vec<Booking>>, bookings: Vec<Booking>) -> bool {
        let seq = ticket.seq();
        let count = bookings.len();
        let applied = self.bookings.apply(ticket, bookings);
        if applied {
            let now = unix_millis_now();
            self.status.send_modify(|snapshot| snapshot.last_updated_at = Some(now));
            tracing::debug!("Applied booking update #{seq} with {count} bookings");
        } else {
            tracing::debug!("Dropped superseded booking update #{seq}");
        }
        applied
    }

    pub fn publish_connectivity(&self, connected: bool) -> bool {
        let ticket = self.begin_connectivity_update();
        self.apply_connectivity(ticket, connected)
    }

    pub fn begin_connectivity_update(&self) -> UpdateTicket<bool> {
        self.connected.ticket()
    }

    pub fn apply_connectivity(&self, ticket: UpdateTicket<bool>, connected: bool) -> bool {
        self.connected.apply(ticket, connected)
    }

    /// Call-order position of the booking list currently in the store.
    pub fn bookings_revision(&self) -> u64 {
        self.bookings.applied_seq()
    }

    /// Move the sync status forward if the transition is allowed.
    pub fn advance_status(&self, next: SyncStatus) -> bool {
        self.status.send_if_modified(|snapshot| {
            if snapshot.status == next || !snapshot.status.can_advance_to(next) {
                return false;
            }
            snapshot.status = next;
            true
        })
    }

    /// Like [`Self::advance_status`], but only while the booking list is still
    /// at `revision`.
    ///
    /// The revision is checked under the status lock, so a list applied before
    /// this call wins and one applied after it advances the status again.
    pub fn advance_status_at(&self, revision: u64, next: SyncStatus) -> bool {
        self.status.send_if_modified(|snapshot| {
            if self.bookings.applied_seq() != revision
                || snapshot.status == next
                || !snapshot.status.can_advance_to(next)
            {
                return false;
            }
            snapshot.status = next;
            true
        })
    }

    /// Put back a status captured earlier, bypassing the transition rules.
    ///
    /// Only applies while the status is still `from`, so a transition made by
    /// another writer in the meantime is kept.
    pub fn revert_status(&self, from: SyncStatus, previous: SyncStatus) -> bool {
        self.status.send_if_modified(|snapshot| {
            if snapshot.status != from || from == previous {
                return false;
            }
            snapshot.status = previous;
            true
        })
    }

    pub fn subscribe_bookings(&self) -> Subscription<Vec<Booking>> {
        self.bookings.subscribe()
    }

    pub fn subscribe_connectivity(&self) -> Subscription<bool> {
        self.connected.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.subscribe()
    }
}

impl Default for SyncStore {
    fn default() -> Self {
        Self::new()
    }
}
