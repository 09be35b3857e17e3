//! Shared emulation state: one mutex, one condition variable.
//!
//! A single lock guards the whole record: both queues, the token bucket,
//! the termination flags, every counter and running sum, and the event sink.
//! Fine-grained locking is rejected because the ordering guarantees of the
//! event log depend on sequential observation of state transitions. The
//! condition variable is broadcast on every transition that could unblock a
//! server or a pacing wait.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::clock::Clock;
use crate::event::EventLog;
use crate::packet::Packet;

/// Outcome of a token-source pacing wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenPace {
    /// The scheduled token time was reached.
    Due,
    /// Shutdown was requested mid-wait.
    Quit,
    /// All packets have arrived and Q1 is empty; no more tokens are needed.
    Drained,
}

/// Everything the four activities mutate. Touched only through [`Shared`].
pub(crate) struct State {
    pub q1: VecDeque<Packet>,
    pub q2: VecDeque<Packet>,
    pub token_bucket: u64,
    pub all_packets_arrived: bool,
    pub time_to_quit: bool,

    /// Packets logged as arriving, admitted or not.
    pub arrived: u64,
    pub completed: u64,
    pub dropped: u64,
    pub removed: u64,
    pub accepted_tokens: u64,
    pub dropped_tokens: u64,

    /// Incremental mean of measured inter-arrival gaps, microseconds.
    pub avg_inter_arrival: f64,
    /// Incremental mean of measured service times, microseconds.
    pub avg_service_time: f64,
    pub total_q1_time: u64,
    pub total_q2_time: u64,
    pub total_s1_time: u64,
    pub total_s2_time: u64,
    /// Incremental mean of sojourn times, milliseconds.
    pub avg_x: f64,
    /// Incremental mean of squared sojourn times, milliseconds squared.
    pub avg_x_sqr: f64,

    pub log: EventLog,
}

pub(crate) struct Shared {
    pub clock: Clock,
    /// Token bucket capacity B. Immutable, readable without the lock.
    pub bucket_capacity: u64,
    state: Mutex<State>,
    cond: Condvar,
}

impl Shared {
    pub fn new(clock: Clock, bucket_capacity: u64, log: EventLog) -> Self {
        Self {
            clock,
            bucket_capacity,
            state: Mutex::new(State {
                q1: VecDeque::new(),
                q2: VecDeque::new(),
                token_bucket: 0,
                all_packets_arrived: false,
                time_to_quit: false,
                arrived: 0,
                completed: 0,
                dropped: 0,
                removed: 0,
                accepted_tokens: 0,
                dropped_tokens: 0,
                avg_inter_arrival: 0.0,
                avg_service_time: 0.0,
                total_q1_time: 0,
                total_q2_time: 0,
                total_s1_time: 0,
                total_s2_time: 0,
                avg_x: 0.0,
                avg_x_sqr: 0.0,
                log,
            }),
            cond: Condvar::new(),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn notify_all(&self) {
        self.cond.notify_all();
    }

    /// Block until the condition variable is signalled. Spurious wakes are
    /// expected; callers re-check their predicate.
    pub fn wait<'a>(&self, guard: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.cond.wait(guard).unwrap()
    }

    /// Pace the packet source to `deadline_us` on the emulation clock.
    ///
    /// The wait is a timed wait on the shared condition variable, so the
    /// mutex is released while suspended and a shutdown broadcast ends the
    /// wait immediately, without killing the thread mid-sleep. Returns
    /// `false` if shutdown was requested.
    pub fn pace_until(&self, deadline_us: u64) -> bool {
        let mut state = self.lock();
        loop {
            if state.time_to_quit {
                return false;
            }
            let now = self.clock.now();
            if now >= deadline_us {
                return true;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(state, Duration::from_micros(deadline_us - now))
                .unwrap();
            state = guard;
        }
    }

    /// Pace the token source to `deadline_us`, additionally ending the wait
    /// as soon as tokens become pointless: every packet has arrived and Q1
    /// is empty.
    pub fn pace_token_until(&self, deadline_us: u64) -> TokenPace {
        let mut state = self.lock();
        loop {
            if state.time_to_quit {
                return TokenPace::Quit;
            }
            if state.all_packets_arrived && state.q1.is_empty() {
                return TokenPace::Drained;
            }
            let now = self.clock.now();
            if now >= deadline_us {
                return TokenPace::Due;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(state, Duration::from_micros(deadline_us - now))
                .unwrap();
            state = guard;
        }
    }

    /// Move the head of Q1 into Q2 if the bucket can pay its requirement.
    ///
    /// Strict FIFO: only the head is considered. An unaffordable head blocks
    /// every packet behind it, whatever those packets would cost. At most
    /// one packet moves per call.
    pub fn promote_head(&self, state: &mut State) {
        let affordable = state
            .q1
            .front()
            .is_some_and(|p| state.token_bucket >= p.tokens_required);
        if !affordable {
            return;
        }
        if let Some(mut p) = state.q1.pop_front() {
            state.token_bucket -= p.tokens_required;

            let now = self.clock.now();
            p.leave_time = now;
            let waited = now.saturating_sub(p.enter_time);
            state.total_q1_time += waited;
            let bucket = state.token_bucket;
            state.log.packet_leaves_q1(now, p.num, waited, bucket);

            let now = self.clock.now();
            p.enter_time = now;
            state.log.packet_enters_q2(now, p.num);
            state.q2.push_back(p);

            self.notify_all();
        }
    }

    /// Flush both queues without service, counting each resident as removed.
    ///
    /// Both servers run this on shutdown; the second invocation finds the
    /// queues already empty and does nothing.
    pub fn drain(&self, state: &mut State) {
        while let Some(p) = state.q1.pop_front() {
            let now = self.clock.now();
            state.log.packet_removed(now, p.num, "Q1");
            state.removed += 1;
        }
        while let Some(p) = state.q2.pop_front() {
            let now = self.clock.now();
            state.log.packet_removed(now, p.num, "Q2");
            state.removed += 1;
        }
    }

    /// Flip `time_to_quit` exactly once, announce it, and wake every waiter.
    /// Repeat calls are no-ops.
    pub fn initiate_shutdown(&self) {
        let mut state = self.lock();
        if state.time_to_quit {
            return;
        }
        state.time_to_quit = true;
        let now = self.clock.now();
        state.log.sigint_caught(now);
        self.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::PacketSpec;
    use std::sync::{Arc, Mutex as StdMutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<StdMutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn shared(capacity: u64) -> (Shared, SharedBuf) {
        let buf = SharedBuf::default();
        let log = EventLog::new(Box::new(buf.clone()));
        (Shared::new(Clock::start(), capacity, log), buf)
    }

    fn packet(num: u32, tokens: u64) -> Packet {
        Packet::new(
            num,
            PacketSpec {
                inter_arrival_ms: 0,
                tokens_required: tokens,
                service_ms: 0,
            },
        )
    }

    fn log_text(buf: &SharedBuf) -> String {
        String::from_utf8(buf.0.lock().unwrap().clone()).unwrap()
    }

    #[test]
    fn test_promotion_pays_tokens_and_moves_head() {
        let (sh, buf) = shared(10);
        let mut state = sh.lock();
        state.q1.push_back(packet(1, 3));
        state.token_bucket = 5;
        sh.promote_head(&mut state);
        assert_eq!(state.token_bucket, 2);
        assert!(state.q1.is_empty());
        assert_eq!(state.q2.len(), 1);
        assert_eq!(state.q2[0].num, 1);
        drop(state);
        let text = log_text(&buf);
        assert!(text.contains("p1 leaves Q1"));
        assert!(text.contains("token bucket now has 2 tokens"));
        assert!(text.contains("p1 enters Q2"));
    }

    #[test]
    fn test_promotion_requires_full_payment() {
        let (sh, buf) = shared(10);
        let mut state = sh.lock();
        state.q1.push_back(packet(1, 5));
        state.token_bucket = 4;
        sh.promote_head(&mut state);
        assert_eq!(state.token_bucket, 4);
        assert_eq!(state.q1.len(), 1);
        assert!(state.q2.is_empty());
        drop(state);
        assert!(log_text(&buf).is_empty());
    }

    #[test]
    fn test_unaffordable_head_blocks_cheaper_followers() {
        let (sh, _buf) = shared(10);
        let mut state = sh.lock();
        state.q1.push_back(packet(1, 8));
        state.q1.push_back(packet(2, 1));
        state.token_bucket = 3;
        sh.promote_head(&mut state);
        // p2 could afford promotion but p1 is the head; nothing moves.
        assert_eq!(state.q1.len(), 2);
        assert!(state.q2.is_empty());
        assert_eq!(state.token_bucket, 3);
    }

    #[test]
    fn test_promotion_moves_one_packet_per_call() {
        let (sh, _buf) = shared(10);
        let mut state = sh.lock();
        state.q1.push_back(packet(1, 1));
        state.q1.push_back(packet(2, 1));
        state.token_bucket = 5;
        sh.promote_head(&mut state);
        assert_eq!(state.q1.len(), 1);
        assert_eq!(state.q2.len(), 1);
    }

    #[test]
    fn test_drain_flushes_both_queues_and_counts() {
        let (sh, buf) = shared(10);
        let mut state = sh.lock();
        state.q1.push_back(packet(3, 1));
        state.q1.push_back(packet(4, 1));
        state.q2.push_back(packet(2, 1));
        sh.drain(&mut state);
        assert!(state.q1.is_empty());
        assert!(state.q2.is_empty());
        assert_eq!(state.removed, 3);
        drop(state);
        let text = log_text(&buf);
        assert!(text.contains("p3 removed from Q1"));
        assert!(text.contains("p4 removed from Q1"));
        assert!(text.contains("p2 removed from Q2"));
    }

    #[test]
    fn test_drain_is_idempotent() {
        let (sh, _buf) = shared(10);
        let mut state = sh.lock();
        state.q1.push_back(packet(1, 1));
        sh.drain(&mut state);
        sh.drain(&mut state);
        assert_eq!(state.removed, 1);
    }

    #[test]
    fn test_shutdown_happens_once() {
        let (sh, buf) = shared(10);
        sh.initiate_shutdown();
        sh.initiate_shutdown();
        assert!(sh.lock().time_to_quit);
        let text = log_text(&buf);
        assert_eq!(text.matches("SIGINT caught").count(), 1);
    }

    #[test]
    fn test_pace_until_reaches_deadline() {
        let (sh, _buf) = shared(10);
        let deadline = sh.clock.now() + 5_000;
        assert!(sh.pace_until(deadline));
        assert!(sh.clock.now() >= deadline);
    }

    #[test]
    fn test_pace_until_past_deadline_returns_immediately() {
        let (sh, _buf) = shared(10);
        std::thread::sleep(Duration::from_millis(2));
        assert!(sh.pace_until(0));
    }

    #[test]
    fn test_pace_until_aborts_on_shutdown() {
        let (sh, _buf) = shared(10);
        let sh = Arc::new(sh);
        let pacer = {
            let sh = Arc::clone(&sh);
            std::thread::spawn(move || sh.pace_until(sh.clock.now() + 60_000_000))
        };
        std::thread::sleep(Duration::from_millis(10));
        sh.initiate_shutdown();
        assert!(!pacer.join().unwrap(), "shutdown must abort the pacing wait");
    }

    #[test]
    fn test_pace_token_reports_drained() {
        let (sh, _buf) = shared(10);
        {
            let mut state = sh.lock();
            state.all_packets_arrived = true;
        }
        let outcome = sh.pace_token_until(sh.clock.now() + 60_000_000);
        assert_eq!(outcome, TokenPace::Drained);
    }

    #[test]
    fn test_pace_token_due_when_q1_waiting() {
        let (sh, _buf) = shared(10);
        {
            let mut state = sh.lock();
            state.q1.push_back(packet(1, 1));
        }
        let outcome = sh.pace_token_until(sh.clock.now() + 2_000);
        assert_eq!(outcome, TokenPace::Due);
    }
}
