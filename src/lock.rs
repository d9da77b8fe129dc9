//! Per-channel mutual exclusion for group sessions.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::event::ChannelId;

/// The set of group channels currently held.
///
/// At most one holder per channel; a free channel has no entry. Direct conversations (channel 0) never go
/// through the table; the engine skips locking for them.
#[derive(Debug, Default)]
pub struct ChannelLockTable {
    held: Mutex<HashSet<ChannelId>>,
}

impl ChannelLockTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark `channel` as held. Returns false without blocking if it already is.
    pub fn try_acquire(&self, channel: ChannelId) -> bool {
        self.table().insert(channel)
    }

    /// Undo a successful [`try_acquire`](Self::try_acquire).
    pub fn release(&self, channel: ChannelId) {
        self.table().remove(&channel);
    }

    pub fn is_held(&self, channel: ChannelId) -> bool {
        self.table().contains(&channel)
    }

    /// Scoped acquire: the returned guard releases the channel when dropped.
    pub fn try_lock(self: &Arc<Self>, channel: ChannelId) -> Option<ChannelGuard> {
        self.try_acquire(channel).then(|| ChannelGuard {
            table: Arc::clone(self),
            channel,
        })
    }

    // A panic while holding the set can't leave it half-written, so a
    // poisoned mutex is still safe to use. Recovering keeps release total.
    fn table(&self) -> MutexGuard<'_, HashSet<ChannelId>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases its channel on drop, including during unwinding.
#[derive(Debug)]
pub struct ChannelGuard {
    table: Arc<ChannelLockTable>,
    channel: ChannelId,
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.table.release(self.channel);
        tracing::debug!(channel = %self.channel, "channel lock released");
    }
}
