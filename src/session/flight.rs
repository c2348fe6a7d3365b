//! Single-flight pass coordination.
//!
//! Refresh and commit each run at most one pass at a time. A request that
//! arrives while a pass is running marks the flight pending instead of
//! starting a second pass; the owner loops until no pending work remains.
//! Waiters parked on [`SingleFlight::wait_idle`] wake when the flight
//! returns to idle.

use std::sync::Mutex;

use futures::channel::oneshot;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum FlightState {
    #[default]
    Idle,
    Running,
    /// A request arrived mid-pass; the owner must run another pass.
    RunningWithPending,
}

#[derive(Debug, Default)]
struct Slot {
    state: FlightState,
    idle_waiters: Vec<oneshot::Sender<()>>,
}

/// Coalesces concurrent pass requests down to one running pass plus at most
/// one queued rerun.
#[derive(Debug, Default)]
pub(crate) struct SingleFlight {
    slot: Mutex<Slot>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().expect("flight lock poisoned")
    }

    /// True when the caller becomes the pass owner. False coalesces the
    /// request into the running flight, queuing a rerun.
    pub fn try_begin(&self) -> bool {
        let mut slot = self.lock();
        match slot.state {
            FlightState::Idle => {
                slot.state = FlightState::Running;
                true
            }
            FlightState::Running | FlightState::RunningWithPending => {
                slot.state = FlightState::RunningWithPending;
                false
            }
        }
    }

    /// Called by the owner after a successful pass. True when a rerun was
    /// queued (the owner keeps the flight and runs again); false when the
    /// flight went idle and waiters were woken.
    pub fn finish_pass(&self) -> bool {
        let mut slot = self.lock();
        match slot.state {
            FlightState::RunningWithPending => {
                slot.state = FlightState::Running;
                true
            }
            FlightState::Running | FlightState::Idle => {
                slot.state = FlightState::Idle;
                for waiter in slot.idle_waiters.drain(..) {
                    let _ = waiter.send(());
                }
                false
            }
        }
    }

    /// Called by the owner when a pass failed: drops any queued rerun and
    /// goes idle so the next request starts fresh.
    pub fn abort(&self) {
        let mut slot = self.lock();
        slot.state = FlightState::Idle;
        for waiter in slot.idle_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    pub fn is_idle(&self) -> bool {
        self.lock().state == FlightState::Idle
    }

    /// Resolves once the flight is idle (immediately if it already is).
    pub async fn wait_idle(&self) {
        let receiver = {
            let mut slot = self.lock();
            if slot.state == FlightState::Idle {
                return;
            }
            let (sender, receiver) = oneshot::channel();
            slot.idle_waiters.push(sender);
            receiver
        };
        // A dropped sender also means the flight was torn down; either way
        // there is nothing left to wait for.
        let _ = receiver.await;
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    #[test]
    fn test_only_first_caller_owns_the_pass() {
        let flight = SingleFlight::new();
        assert!(flight.try_begin());
        assert!(!flight.try_begin());
        assert!(!flight.try_begin());
    }

    #[test]
    fn test_coalesced_request_queues_exactly_one_rerun() {
        let flight = SingleFlight::new();
        assert!(flight.try_begin());
        assert!(!flight.try_begin());
        assert!(!flight.try_begin());

        // One rerun despite two coalesced requests.
        assert!(flight.finish_pass());
        assert!(!flight.finish_pass());
        assert!(flight.is_idle());
    }

    #[test]
    fn test_abort_drops_queued_rerun() {
        let flight = SingleFlight::new();
        assert!(flight.try_begin());
        assert!(!flight.try_begin());
        flight.abort();
        assert!(flight.is_idle());
        assert!(flight.try_begin());
    }

    #[test]
    fn test_wait_idle_resolves_immediately_when_idle() {
        let flight = SingleFlight::new();
        block_on(flight.wait_idle());
    }

    #[test]
    fn test_wait_idle_wakes_on_finish() {
        let flight = std::sync::Arc::new(SingleFlight::new());
        assert!(flight.try_begin());

        let waiter = {
            let flight = std::sync::Arc::clone(&flight);
            std::thread::spawn(move || block_on(flight.wait_idle()))
        };
        // Give the waiter a moment to park.
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(!flight.finish_pass());
        waiter.join().unwrap();
    }
}
