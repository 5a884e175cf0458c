use std::collections::VecDeque;
use std::num::NonZeroUsize;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// A counting admission gate.
///
/// Up to `capacity` callers pass straight through [`acquire`](Self::acquire). Everyone
/// after that queues, in arrival order, until a [`reset`](Self::reset) releases them.
/// Holders never give their slot back individually; the gate is only ever reopened
/// in bulk.
#[derive(Debug)]
pub struct CountingGate {
    capacity: NonZeroUsize,
    state: Mutex<GateState>,
}

#[derive(Debug, Default)]
struct GateState {
    admitted: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
}

/// The result of trying to pass the gate without waiting.
#[derive(Debug)]
pub(crate) enum Entry {
    Admitted,
    Queued(oneshot::Receiver<()>),
}

impl CountingGate {
    /// Creates a new, open `CountingGate`.
    ///
    /// # Arguments
    ///
    /// * `capacity` - The number of holders admitted before callers start to queue.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            state: Mutex::new(GateState::default()),
        }
    }

    /// Waits until the gate admits the caller.
    ///
    /// Returns immediately while there is spare capacity. Otherwise the caller is
    /// queued behind any earlier waiters and suspended until a `reset` releases it.
    /// Dropping the returned future gives up the place in the queue.
    pub async fn acquire(&self) {
        if let Entry::Queued(waiter) = self.enter() {
            // The sender is only dropped unsent if the gate itself goes away.
            let _ = waiter.await;
        }
    }

    /// Takes a slot if one is free, otherwise joins the tail of the queue.
    pub(crate) fn enter(&self) -> Entry {
        let mut state = self.state.lock();
        if state.admitted < self.capacity.get() {
            state.admitted += 1;
            return Entry::Admitted;
        }
        let (tx, rx) = oneshot::channel();
        state.waiters.push_back(tx);
        Entry::Queued(rx)
    }

    /// Reopens the gate, handing the fresh capacity to queued waiters first.
    ///
    /// Releases at most `capacity` waiters from the head of the queue and returns
    /// how many were released. Afterwards `admitted` equals that count. Waiters that
    /// have stopped listening are discarded without taking a slot.
    pub fn reset(&self) -> usize {
        let mut state = self.state.lock();
        state.admitted = 0;
        while state.admitted < self.capacity.get() {
            let Some(waiter) = state.waiters.pop_front() else {
                break;
            };
            if waiter.send(()).is_ok() {
                state.admitted += 1;
            }
        }
        state.admitted
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    /// Number of holders admitted since the last reset.
    pub fn admitted(&self) -> usize {
        self.state.lock().admitted
    }

    /// Number of callers currently queued.
    pub fn waiting(&self) -> usize {
        self.state.lock().waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use futures::FutureExt;

    use super::*;

    fn gate(capacity: usize) -> CountingGate {
        CountingGate::new(NonZeroUsize::new(capacity).unwrap())
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn it_admits_up_to_capacity_without_blocking() {
        let gate = gate(3);

        for _ in 0..3 {
            assert!(gate.acquire().now_or_never().is_some());
        }
        assert_eq!(gate.admitted(), 3);

        // The next one has to wait for a reset
        let mut blocked = Box::pin(gate.acquire());
        assert!((&mut blocked).now_or_never().is_none());
        assert_eq!(gate.waiting(), 1);

        assert_eq!(gate.reset(), 1);
        assert!(blocked.now_or_never().is_some());
        assert_eq!(gate.admitted(), 1);
        assert_eq!(gate.waiting(), 0);
    }

    #[test]
    fn reset_on_idle_gate_releases_nothing() {
        let gate = gate(2);
        assert!(gate.acquire().now_or_never().is_some());

        assert_eq!(gate.reset(), 0);
        assert_eq!(gate.admitted(), 0);
    }

    #[test]
    fn reset_releases_at_most_capacity() {
        let gate = gate(2);
        assert_eq!(gate.reset(), 0);
        for _ in 0..2 {
            assert!(matches!(gate.enter(), Entry::Admitted));
        }

        let mut waiters: Vec<_> = (0..5)
            .map(|_| match gate.enter() {
                Entry::Queued(rx) => rx,
                Entry::Admitted => panic!("gate should be full"),
            })
            .collect();

        assert_eq!(gate.reset(), 2);
        assert_eq!(gate.admitted(), 2);
        assert_eq!(gate.waiting(), 3);

        // FIFO: only the first two were signalled
        assert!(waiters[0].try_recv().is_ok());
        assert!(waiters[1].try_recv().is_ok());
        assert!(waiters[2].try_recv().is_err());

        assert_eq!(gate.reset(), 2);
        assert_eq!(gate.reset(), 1);
        assert_eq!(gate.reset(), 0);
        for waiter in &mut waiters[2..] {
            assert!(waiter.try_recv().is_ok());
        }
    }

    #[test]
    fn reset_skips_abandoned_waiters() {
        let gate = gate(1);
        assert!(matches!(gate.enter(), Entry::Admitted));

        let abandoned = gate.enter();
        let Entry::Queued(mut kept) = gate.enter() else {
            panic!("gate should be full");
        };
        drop(abandoned);

        assert_eq!(gate.reset(), 1);
        assert!(kept.try_recv().is_ok());
        assert_eq!(gate.waiting(), 0);
    }

    #[tokio::test]
    async fn test_fifo_release_order() {
        let gate = Arc::new(gate(1));
        gate.acquire().await;

        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut handles = vec![];
        for id in 0..4 {
            let gate = Arc::clone(&gate);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                gate.acquire().await;
                order.lock().push(id);
            }));
            // Make sure each task is queued before the next is spawned
            settle().await;
        }
        assert_eq!(gate.waiting(), 4);

        for expected in 1..=4 {
            assert_eq!(gate.reset(), 1);
            settle().await;
            assert_eq!(order.lock().len(), expected);
        }

        futures::future::join_all(handles).await;
        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_actual_concurrency() {
        let capacity = 50;
        let gate = Arc::new(gate(capacity));
        let passed = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for _ in 0..capacity + 10 {
            let gate = Arc::clone(&gate);
            let passed = Arc::clone(&passed);
            handles.push(tokio::spawn(async move {
                gate.acquire().await;
                passed.fetch_add(1, Ordering::SeqCst);
            }));
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(passed.load(Ordering::SeqCst), capacity);
        assert_eq!(gate.waiting(), 10);

        assert_eq!(gate.reset(), 10);
        futures::future::join_all(handles).await;
        assert_eq!(passed.load(Ordering::SeqCst), capacity + 10);
    }
}
