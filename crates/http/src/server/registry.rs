//! Connection registry and idle-connection sweeping.
//!
//! Every accepted connection is tracked in two places at once: a map from
//! connection id to its cancellation handle, and a min-ordered sweep queue
//! holding the same [`ConnectionEntry`] sorted by registration time, oldest
//! first. The two structures are guarded by separate locks so that accepting
//! a connection never waits on the sweeper walking the queue, and vice versa.
//!
//! Closing a connection does not remove its queue entry. The entry is only
//! flagged dead and stays in the heap until it surfaces at the head, where
//! the sweeper discards it without further work. This trades a little queue
//! memory for never having to delete from the middle of the heap on every
//! disconnect.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Extra slack added to the computed sleep so the sweeper wakes slightly
/// after the head entry's expiry rather than slightly before it.
const REAP_MARGIN: Duration = Duration::from_secs(1);

/// Registry record shared between the connection map and the sweep queue.
///
/// `last_seen` is refreshed whenever the connection receives bytes; the
/// sweeper reads it through the queue to decide whether the connection has
/// been idle for too long. `live` is the lazy-deletion flag described in the
/// module docs.
#[derive(Debug)]
pub(crate) struct ConnectionEntry {
    id: u64,
    epoch: Instant,
    last_seen_millis: AtomicU64,
    live: AtomicBool,
}

impl ConnectionEntry {
    fn new(id: u64, epoch: Instant) -> Self {
        let entry = Self { id, epoch, last_seen_millis: AtomicU64::new(0), live: AtomicBool::new(true) };
        entry.touch();
        entry
    }

    /// Records activity now, pushing the connection's expiry out.
    pub(crate) fn touch(&self) {
        self.last_seen_millis.store(self.epoch.elapsed().as_millis() as u64, Ordering::Relaxed);
    }

    fn idle_for(&self, now: Instant) -> Duration {
        let last_seen = self.epoch + Duration::from_millis(self.last_seen_millis.load(Ordering::Relaxed));
        now.duration_since(last_seen)
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn set_dead(&self) {
        self.live.store(false, Ordering::Release);
    }
}

/// Cancellation side of a tracked connection.
#[derive(Debug)]
pub(crate) struct ConnectionHandle {
    token: CancellationToken,
}

impl ConnectionHandle {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    fn cancel(&self) {
        self.token.cancel();
    }
}

/// Sweep queue item: the registration time freezes the heap position, while
/// the entry's `last_seen` keeps moving underneath it.
#[derive(Debug)]
struct ReapEntry {
    queued_at_millis: u64,
    entry: Arc<ConnectionEntry>,
}

impl PartialEq for ReapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.queued_at_millis == other.queued_at_millis && self.entry.id == other.entry.id
    }
}

impl Eq for ReapEntry {}

impl PartialOrd for ReapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReapEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.queued_at_millis.cmp(&other.queued_at_millis).then(self.entry.id.cmp(&other.entry.id))
    }
}

/// Tracks all live connections and drives idle eviction.
#[derive(Debug)]
pub(crate) struct ConnectionRegistry {
    epoch: Instant,
    next_id: AtomicU64,
    idle_timeout_millis: AtomicU64,
    connections: Mutex<HashMap<u64, ConnectionHandle>>,
    reap_queue: Mutex<BinaryHeap<Reverse<ReapEntry>>>,
    sweeper_wakeup: Notify,
}

impl ConnectionRegistry {
    pub(crate) fn new(idle_timeout: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            next_id: AtomicU64::new(0),
            idle_timeout_millis: AtomicU64::new(idle_timeout.as_millis() as u64),
            connections: Mutex::new(HashMap::new()),
            reap_queue: Mutex::new(BinaryHeap::new()),
            sweeper_wakeup: Notify::new(),
        }
    }

    /// Adds a freshly accepted connection to the map and the sweep queue.
    pub(crate) fn register(&self, token: CancellationToken) -> Arc<ConnectionEntry> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(ConnectionEntry::new(id, self.epoch));

        self.connections.lock().unwrap().insert(id, ConnectionHandle::new(token));
        self.reap_queue.lock().unwrap().push(Reverse(ReapEntry {
            queued_at_millis: entry.last_seen_millis.load(Ordering::Relaxed),
            entry: Arc::clone(&entry),
        }));

        debug!(connection = id, "connection registered");
        entry
    }

    /// Takes a closed connection out of the live map.
    ///
    /// Safe to call from any closing path, including concurrently with a
    /// sweep pass; the queue entry is left behind for lazy discard.
    pub(crate) fn disconnected(&self, entry: &ConnectionEntry) {
        entry.set_dead();
        self.connections.lock().unwrap().remove(&entry.id);
        debug!(connection = entry.id, "connection deregistered");
    }

    /// Closes every connection currently in the map.
    ///
    /// The map is drained under its lock in one step, then the cancellations
    /// happen outside of it, so connection tasks re-entering
    /// [`Self::disconnected`] cannot deadlock against this call.
    pub(crate) fn drop_all(&self) {
        let handles: Vec<ConnectionHandle> = {
            let mut connections = self.connections.lock().unwrap();
            connections.drain().map(|(_, handle)| handle).collect()
        };

        info!(count = handles.len(), "dropping all clients");
        for handle in &handles {
            handle.cancel();
        }
    }

    pub(crate) fn connection_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    pub(crate) fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_millis.load(Ordering::Relaxed))
    }

    /// Changes the idle threshold and wakes the sweeper so the new value
    /// takes effect without waiting out the previous sleep.
    pub(crate) fn set_idle_timeout(&self, timeout: Duration) {
        self.idle_timeout_millis.store(timeout.as_millis() as u64, Ordering::Relaxed);
        self.sweeper_wakeup.notify_one();
    }

    /// Runs the idle sweep until `shutdown` is cancelled.
    ///
    /// One sweeper serves the whole registry on its own task, so eviction
    /// keeps working even when every connection-serving task is busy.
    pub(crate) async fn sweep(&self, shutdown: CancellationToken) {
        loop {
            let sleep_for = self.next_cleanup_delay();
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("idle sweeper stopping");
                    return;
                }
                _ = self.sweeper_wakeup.notified() => {}
                _ = tokio::time::sleep(sleep_for) => {}
            }
        }
    }

    /// Evicts everything that is overdue and returns how long the sweeper
    /// may sleep before the next entry could possibly expire.
    fn next_cleanup_delay(&self) -> Duration {
        let idle_timeout = self.idle_timeout();

        loop {
            let now = Instant::now();
            let popped = {
                let mut queue = self.reap_queue.lock().unwrap();

                let head_idle = match queue.peek() {
                    None => return idle_timeout,
                    Some(Reverse(head)) => {
                        if head.entry.is_live() { Some(head.entry.idle_for(now)) } else { None }
                    }
                };

                if let Some(idle) = head_idle {
                    if idle <= idle_timeout {
                        // The queue is ordered by age, so no other entry can
                        // expire before this one does.
                        return idle_timeout - idle + REAP_MARGIN;
                    }
                }

                queue.pop()
            };

            let Some(Reverse(reap)) = popped else { continue };
            if reap.entry.is_live() {
                self.drop_connection(&reap.entry);
            } else {
                debug!(connection = reap.entry.id, "discarding stale sweep entry");
            }
        }
    }

    fn drop_connection(&self, entry: &ConnectionEntry) {
        entry.set_dead();
        let handle = self.connections.lock().unwrap().remove(&entry.id);
        if let Some(handle) = handle {
            info!(connection = entry.id, "dropping idle connection");
            handle.cancel();
        }
    }

    #[cfg(test)]
    fn queued_sweep_entries(&self) -> usize {
        self.reap_queue.lock().unwrap().len()
    }
}

/// Reader wrapper that refreshes a connection's activity stamp whenever the
/// peer actually delivers bytes.
#[derive(Debug)]
pub(crate) struct TrackedReader<R> {
    inner: R,
    entry: Arc<ConnectionEntry>,
}

impl<R> TrackedReader<R> {
    pub(crate) fn new(inner: R, entry: Arc<ConnectionEntry>) -> Self {
        Self { inner, entry }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for TrackedReader<R> {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let filled_before = buf.filled().len();
        let me = self.as_mut().get_mut();
        let result = Pin::new(&mut me.inner).poll_read(cx, buf);

        if let Poll::Ready(Ok(())) = result {
            if buf.filled().len() > filled_before {
                me.entry.touch();
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    fn spawn_sweeper(registry: &Arc<ConnectionRegistry>) -> (CancellationToken, tokio::task::JoinHandle<()>) {
        let stop = CancellationToken::new();
        let task = tokio::spawn({
            let registry = Arc::clone(registry);
            let stop = stop.clone();
            async move { registry.sweep(stop).await }
        });
        (stop, task)
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_in_last_activity_order() {
        let registry = Arc::new(ConnectionRegistry::new(Duration::from_secs(30)));

        let first = CancellationToken::new();
        registry.register(first.clone());
        time::advance(Duration::from_secs(5)).await;

        let second = CancellationToken::new();
        registry.register(second.clone());
        time::advance(Duration::from_secs(5)).await;

        let third = CancellationToken::new();
        registry.register(third.clone());

        let (stop, sweeper) = spawn_sweeper(&registry);

        first.cancelled().await;
        assert!(!second.is_cancelled());
        assert!(!third.is_cancelled());

        second.cancelled().await;
        assert!(!third.is_cancelled());

        third.cancelled().await;
        assert_eq!(registry.connection_count(), 0);

        stop.cancel();
        sweeper.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn activity_postpones_eviction() {
        let registry = Arc::new(ConnectionRegistry::new(Duration::from_secs(30)));
        let started = Instant::now();

        let token = CancellationToken::new();
        let entry = registry.register(token.clone());
        let (stop, sweeper) = spawn_sweeper(&registry);

        time::advance(Duration::from_secs(20)).await;
        entry.touch();

        time::advance(Duration::from_secs(15)).await;
        assert!(!token.is_cancelled(), "evicted although active 15s ago");

        token.cancelled().await;
        assert!(started.elapsed() >= Duration::from_secs(50));

        stop.cancel();
        sweeper.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn closed_connections_are_discarded_lazily() {
        let registry = ConnectionRegistry::new(Duration::from_secs(30));

        let token = CancellationToken::new();
        let entry = registry.register(token.clone());
        assert_eq!(registry.queued_sweep_entries(), 1);

        registry.disconnected(&entry);
        // The sweep queue keeps the dead entry around...
        assert_eq!(registry.queued_sweep_entries(), 1);
        assert_eq!(registry.connection_count(), 0);

        // ...until a sweep pass finds it at the head and drops it silently.
        let delay = registry.next_cleanup_delay();
        assert_eq!(registry.queued_sweep_entries(), 0);
        assert!(!token.is_cancelled());
        assert_eq!(delay, registry.idle_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_delay_targets_the_oldest_entry() {
        let registry = ConnectionRegistry::new(Duration::from_secs(30));
        registry.register(CancellationToken::new());

        time::advance(Duration::from_secs(10)).await;

        // 20s left until expiry, plus the margin.
        assert_eq!(registry.next_cleanup_delay(), Duration::from_secs(21));
    }

    #[tokio::test(start_paused = true)]
    async fn shortening_the_timeout_takes_effect_immediately() {
        let registry = Arc::new(ConnectionRegistry::new(Duration::from_secs(300)));
        let started = Instant::now();

        let token = CancellationToken::new();
        registry.register(token.clone());
        let (stop, sweeper) = spawn_sweeper(&registry);

        time::advance(Duration::from_secs(10)).await;
        registry.set_idle_timeout(Duration::from_secs(5));

        token.cancelled().await;
        assert!(started.elapsed() < Duration::from_secs(300), "old timeout was still in effect");

        stop.cancel();
        sweeper.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn drop_all_closes_every_connection() {
        let registry = ConnectionRegistry::new(Duration::from_secs(30));

        let tokens: Vec<CancellationToken> = (0..3)
            .map(|_| {
                let token = CancellationToken::new();
                registry.register(token.clone());
                token
            })
            .collect();

        registry.drop_all();

        assert!(tokens.iter().all(|token| token.is_cancelled()));
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn never_evicts_before_the_threshold() {
        let registry = Arc::new(ConnectionRegistry::new(Duration::from_secs(30)));

        let token = CancellationToken::new();
        registry.register(token.clone());
        let (stop, sweeper) = spawn_sweeper(&registry);

        time::advance(Duration::from_secs(29)).await;
        assert!(!token.is_cancelled());

        stop.cancel();
        sweeper.await.unwrap();
    }
}
