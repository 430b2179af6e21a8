use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct EventState {
    signaled: bool,
    closed: bool,
}

/// A binary, auto-reset event shared by exactly one signaler and one waiter.
///
/// A call to `wait` blocks until the event is signaled and then consumes the signal,
/// so every `signal` releases at most one `wait`. Signaling an already signaled event
/// is a no-op.
#[derive(Debug, Default)]
pub struct Event {
    state: Mutex<EventState>,
    cvar: Condvar,
}

impl Event {
    /// Creates a new unsignaled `Event`.
    ///
    /// # Returns
    /// A new `Event` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the event, waking the waiter if there is one.
    pub fn signal(&self) {
        let mut state = self.state.lock();
        state.signaled = true;
        self.cvar.notify_one();
    }

    /// Blocks the calling thread until the event is signaled, then clears it.
    ///
    /// # Returns
    /// `true` if a signal was consumed, `false` if the event was closed with no
    /// pending signal.
    pub fn wait(&self) -> bool {
        let mut state = self.state.lock();

        while !state.signaled && !state.closed {
            self.cvar.wait(&mut state);
        }

        let woken = state.signaled;
        state.signaled = false;
        woken
    }

    /// Clears a pending signal without blocking.
    pub fn reset(&self) {
        self.state.lock().signaled = false;
    }

    /// Abandons the event. The current and every future `wait` returns `false` once
    /// the pending signal, if any, has been consumed.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.cvar.notify_all();
    }

    /// Whether there is a pending signal.
    pub fn is_set(&self) -> bool {
        self.state.lock().signaled
    }

    /// Whether the event has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use super::*;

    #[test]
    fn wait_consumes_the_signal() {
        let event = Event::new();
        event.signal();
        event.signal();

        assert!(event.is_set());
        assert!(event.wait());
        assert!(!event.is_set());
    }

    #[test]
    fn reset_clears_without_blocking() {
        let event = Event::new();
        event.reset();
        event.signal();
        event.reset();

        assert!(!event.is_set());
    }

    #[test]
    fn wait_blocks_until_signaled() {
        let event = Arc::new(Event::new());
        let waiter = {
            let event = Arc::clone(&event);
            thread::spawn(move || event.wait())
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());

        event.signal();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn close_releases_a_blocked_waiter() {
        let event = Arc::new(Event::new());
        let waiter = {
            let event = Arc::clone(&event);
            thread::spawn(move || event.wait())
        };

        thread::sleep(Duration::from_millis(20));
        event.close();

        assert!(!waiter.join().unwrap());
        assert!(event.is_closed());
    }

    #[test]
    fn pending_signal_survives_close() {
        let event = Event::new();
        event.signal();
        event.close();

        assert!(event.wait());
        assert!(!event.wait());
    }

    #[test]
    fn ping_pong_between_two_threads() {
        const ROUNDS: usize = 200;

        let ping = Arc::new(Event::new());
        let pong = Arc::new(Event::new());

        let responder = {
            let (ping, pong) = (Arc::clone(&ping), Arc::clone(&pong));
            thread::spawn(move || {
                let mut rounds = 0;
                while ping.wait() {
                    rounds += 1;
                    pong.signal();
                }
                rounds
            })
        };

        for _ in 0..ROUNDS {
            ping.signal();
            assert!(pong.wait());
        }

        ping.close();
        assert_eq!(responder.join().unwrap(), ROUNDS);
    }
}
