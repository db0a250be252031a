use std::sync::{Condvar, Mutex};

/// Bounded FIFO handing accepted sockets from the acceptor to the workers.
///
/// A fixed ring with one mutex and two condition variables. `close` is a
/// one-shot: after it, `push` refuses new work and `pop` drains whatever
/// is left before returning `None`.
pub struct TaskQueue<T> {
    state: Mutex<RingState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

struct RingState<T> {
    slots: Vec<Option<T>>,
    head: usize,
    tail: usize,
    count: usize,
    shutdown: bool,
}

impl<T> TaskQueue<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        Self {
            state: Mutex::new(RingState {
                slots: (0..capacity).map(|_| None).collect(),
                head: 0,
                tail: 0,
                count: 0,
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Blocks while the ring is full. Returns `false` and drops `task` if
    /// shutdown was signalled before a slot opened up.
    pub fn push(&self, task: T) -> bool {
        let mut state = self.state.lock().expect("lock poisoned");
        while state.count == state.slots.len() && !state.shutdown {
            state = self.not_full.wait(state).expect("lock poisoned");
        }
        if state.shutdown {
            return false;
        }
        let tail = state.tail;
        state.slots[tail] = Some(task);
        state.tail = (tail + 1) % state.slots.len();
        state.count += 1;
        self.not_empty.notify_one();
        true
    }

    /// Blocks while the ring is empty. Returns `None` only after shutdown
    /// with nothing left to drain.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock().expect("lock poisoned");
        while state.count == 0 && !state.shutdown {
            state = self.not_empty.wait(state).expect("lock poisoned");
        }
        if state.count == 0 {
            return None;
        }
        let head = state.head;
        let task = state.slots[head].take().expect("occupied slot");
        state.head = (head + 1) % state.slots.len();
        state.count -= 1;
        self.not_full.notify_one();
        Some(task)
    }

    /// Signals shutdown and wakes every waiter. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.shutdown = true;
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("lock poisoned").count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
