//! Fan-out of incoming chat events to filtered subscriptions.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::event::GuessEvent;

/// What a subscription predicate wants done with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Decision {
    /// Deliver the event to this subscription.
    pub interested: bool,
    /// Stop offering the event to later subscribers and to the default
    /// command handling.
    pub stop_delivery: bool,
}

impl Decision {
    pub const IGNORE: Self = Self {
        interested: false,
        stop_delivery: false,
    };
    pub const OBSERVE: Self = Self {
        interested: true,
        stop_delivery: false,
    };
    pub const CONSUME: Self = Self {
        interested: true,
        stop_delivery: true,
    };
}

/// Result of publishing one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delivery {
    /// Number of subscriptions the event was handed to.
    pub delivered: usize,
    /// Some subscription asked to stop delivery.
    pub consumed: bool,
}

type Filter = Box<dyn Fn(&GuessEvent) -> Decision + Send>;

struct Subscriber {
    id: u64,
    filter: Filter,
    tx: Sender<GuessEvent>,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    subscribers: Vec<Subscriber>,
    closed: bool,
}

#[derive(Default)]
pub struct EventBus {
    state: Mutex<BusState>,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Open a live, filtered view of every event published from now on.
    ///
    /// On a closed bus the subscription is born disconnected.
    pub fn subscribe<F>(self: &Arc<Self>, filter: F) -> Subscription
    where
        F: Fn(&GuessEvent) -> Decision + Send + 'static,
    {
        let (tx, rx) = channel();
        let mut state = self.state();
        let id = state.next_id;
        state.next_id += 1;
        if !state.closed {
            state.subscribers.push(Subscriber {
                id,
                filter: Box::new(filter),
                tx,
            });
        }
        Subscription {
            id,
            bus: Arc::clone(self),
            rx,
            cancelled: false,
        }
    }

    /// Offer `event` to subscribers in subscription order.
    pub fn publish(&self, event: &GuessEvent) -> Delivery {
        let mut state = self.state();
        let mut delivery = Delivery::default();
        let mut gone = Vec::new();
        for sub in &state.subscribers {
            let decision = (sub.filter)(event);
            if decision.interested {
                if sub.tx.send(event.clone()).is_ok() {
                    delivery.delivered += 1;
                } else {
                    gone.push(sub.id);
                }
            }
            if decision.stop_delivery {
                delivery.consumed = true;
                break;
            }
        }
        if !gone.is_empty() {
            state.subscribers.retain(|s| !gone.contains(&s.id));
        }
        delivery
    }

    /// Disconnect every subscription and refuse new ones.
    pub fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        state.subscribers.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.state().subscribers.len()
    }

    fn remove(&self, id: u64) {
        self.state().subscribers.retain(|s| s.id != id);
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Why [`Subscription::recv_until`] returned without an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    Elapsed,
    Closed,
}

/// A cancellable stream of the events its filter accepted, in arrival order.
pub struct Subscription {
    id: u64,
    bus: Arc<EventBus>,
    rx: Receiver<GuessEvent>,
    cancelled: bool,
}

impl Subscription {
    /// Block until the next event or `deadline`, whichever comes first.
    pub fn recv_until(&self, deadline: Instant) -> Result<GuessEvent, WaitError> {
        if self.cancelled {
            return Err(WaitError::Closed);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.rx.recv_timeout(remaining).map_err(|e| match e {
            RecvTimeoutError::Timeout => WaitError::Elapsed,
            RecvTimeoutError::Disconnected => WaitError::Closed,
        })
    }

    /// Detach from the bus. Nothing published after this returns is delivered.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            self.bus.remove(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
