use std::{
    collections::VecDeque,
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, OnceLock, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::BusError;

type Seq = u64;

/// Create the channel used to wake the UI loop.
///
/// The channel holds at most one nudge, so any number of publishes between two drains
/// collapse into a single wake-up. The receiver is meant to be used inside
/// `crossbeam_channel::select!` next to the keyboard input channel.
pub fn wake_channel() -> (Sender<()>, Receiver<()>) {
    crossbeam_channel::bounded(1)
}

/// Delivery target for [`EventBus::drain_and_dispatch`]
///
/// The bus only stores listener keys; the owner of the listeners resolves each key and
/// invokes the listener. An error is reported back to the bus, which logs it and carries on.
pub trait Listeners<K, E> {
    fn deliver(&mut self, key: &K, event: &E) -> eyre::Result<()>;
}

impl<K, E, F> Listeners<K, E> for F
where
    F: FnMut(&K, &E) -> eyre::Result<()>,
{
    fn deliver(&mut self, key: &K, event: &E) -> eyre::Result<()> {
        self(key, event)
    }
}

/// Summary of one [`EventBus::drain_and_dispatch`] call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Events taken from the queue
    pub events: usize,
    /// Listener invocations that succeeded
    pub delivered: usize,
    /// Listener invocations that returned an error
    pub failed: usize,
}

#[derive(Clone)]
struct Registration<K> {
    key: K,
    // first sequence number this registration is eligible for
    since: Seq,
}

struct State<E, K> {
    queue: VecDeque<(Seq, E)>,
    next_seq: Seq,
    listeners: Vec<Registration<K>>,
}

struct Shared<E, K> {
    state: Mutex<State<E, K>>,
    wake: OnceLock<Sender<()>>,
    draining: AtomicBool,
}

impl<E, K> Shared<E, K> {
    fn lock(&self) -> MutexGuard<'_, State<E, K>> {
        tracing::trace!("taking bus lock");
        // listeners never run under this lock, so a poisoned state is still consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, event: E) {
        let seq = {
            let mut state = self.lock();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.queue.push_back((seq, event));
            seq
        };
        tracing::trace!(seq, "event published");
        self.nudge();
    }

    fn nudge(&self) {
        let Some(wake) = self.wake.get() else {
            return;
        };
        match wake.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                tracing::debug!("wake receiver dropped, event stays queued");
            }
        }
    }
}

trait Sink<E>: Send + Sync {
    fn publish(&self, event: E);
}

impl<E, K> Sink<E> for Shared<E, K>
where
    E: Send,
    K: Send,
{
    fn publish(&self, event: E) {
        self.push(event);
    }
}

/// Publishing half of an [`EventBus`]
///
/// Handed to the thread that produces events. It can only enqueue, it can neither
/// register listeners nor drain.
pub struct Publisher<E> {
    sink: Arc<dyn Sink<E>>,
}

impl<E> Clone for Publisher<E> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<E> Publisher<E> {
    pub fn publish(&self, event: E) {
        self.sink.publish(event);
    }
}

impl<E> fmt::Debug for Publisher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher").finish_non_exhaustive()
    }
}

/// Multi-listener event queue shared between producer threads and the UI thread
///
/// `E` is the event type, `K` the key the UI uses to find a listener. Cloning the bus
/// produces another handle to the same queue.
pub struct EventBus<E, K> {
    shared: Arc<Shared<E, K>>,
}

impl<E, K> Clone for EventBus<E, K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E, K> Default for EventBus<E, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, K> EventBus<E, K> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    next_seq: 0,
                    listeners: Vec::new(),
                }),
                wake: OnceLock::new(),
                draining: AtomicBool::new(false),
            }),
        }
    }

    /// Register a listener key
    ///
    /// The listener receives every event published from now on. Events already waiting in
    /// the queue are not replayed to it. Registering the same key twice delivers each
    /// event to it twice.
    pub fn register(&self, key: K) {
        let mut state = self.shared.lock();
        let since = state.next_seq;
        state.listeners.push(Registration { key, since });
    }

    /// Enqueue an event and wake the UI loop if the wake channel is armed
    pub fn publish(&self, event: E) {
        self.shared.push(event);
    }

    /// Arm the wake channel
    ///
    /// May only be called once. Events that were published before arming are still in
    /// the queue, so the loop is nudged straight away when there are any.
    pub fn arm_wake(&self, wake: Sender<()>) -> Result<(), BusError> {
        self.shared
            .wake
            .set(wake)
            .map_err(|_| BusError::WakeAlreadyArmed)?;

        let pending = self.shared.lock().queue.len();
        if pending > 0 {
            tracing::debug!(pending, "events were queued before the wake channel was armed");
            self.shared.nudge();
        }
        Ok(())
    }

    /// Number of events waiting to be drained
    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Snapshot of the registered listener keys, in delivery order
    pub fn listeners(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.shared
            .lock()
            .listeners
            .iter()
            .map(|r| r.key.clone())
            .collect()
    }

    /// Drain the queue and deliver every event
    ///
    /// Events are handled in publish order. Each event goes to every eligible listener,
    /// in registration order, before the next event is looked at. A listener error is
    /// logged and counted but delivery continues.
    pub fn drain_and_dispatch<L>(&self, listeners: &mut L) -> Result<DrainReport, BusError>
    where
        L: Listeners<K, E> + ?Sized,
        K: Clone + fmt::Debug,
    {
        if self.shared.draining.swap(true, Ordering::AcqRel) {
            return Err(BusError::ReentrantDrain);
        }
        let _draining = DrainingGuard(&self.shared.draining);

        let (batch, registrations) = {
            let mut state = self.shared.lock();
            if state.queue.is_empty() {
                return Ok(DrainReport::default());
            }
            let batch: Vec<_> = state.queue.drain(..).collect();
            (batch, state.listeners.clone())
        };

        let mut report = DrainReport::default();
        for (seq, event) in batch {
            report.events += 1;
            for registration in registrations.iter().filter(|r| r.since <= seq) {
                match listeners.deliver(&registration.key, &event) {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(
                            seq,
                            listener = ?registration.key,
                            error = %e,
                            "listener failed to handle event"
                        );
                    }
                }
            }
        }

        tracing::trace!(?report, "event queue drained");
        Ok(report)
    }
}

impl<E, K> EventBus<E, K>
where
    E: Send + 'static,
    K: Send + 'static,
{
    /// Create a publishing handle for a producer thread
    pub fn publisher(&self) -> Publisher<E> {
        Publisher {
            sink: Arc::clone(&self.shared) as Arc<dyn Sink<E>>,
        }
    }
}

struct DrainingGuard<'a>(&'a AtomicBool);

impl Drop for DrainingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
