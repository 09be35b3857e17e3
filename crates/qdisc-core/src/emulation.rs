//! Emulation orchestration: spawn the four activities, join them, report.

use std::io::Write;
use std::sync::Arc;
use std::thread;

use log::debug;

use crate::clock::Clock;
use crate::event::EventLog;
use crate::server::server;
use crate::source::{packet_source, token_source};
use crate::state::Shared;
use crate::stats::Report;
use crate::workload::Workload;

/// A configured emulation: clock, bucket, queues, and event sink.
pub struct Emulation {
    shared: Arc<Shared>,
}

/// Cheap clonable handle for requesting graceful shutdown from outside the
/// emulation: the SIGINT handler thread in the CLI, or a test driver.
#[derive(Clone)]
pub struct ShutdownHandle {
    shared: Arc<Shared>,
}

impl ShutdownHandle {
    /// Stop admitting packets and tokens and drain the queues. Idempotent;
    /// the first call logs the `SIGINT caught` event and wakes every waiter.
    pub fn initiate_shutdown(&self) {
        self.shared.initiate_shutdown();
    }
}

impl Emulation {
    /// Create an emulation with bucket capacity `bucket_capacity`, writing
    /// the event log to `sink`. The emulation clock starts now.
    pub fn new(bucket_capacity: u64, sink: Box<dyn Write + Send>) -> Self {
        let clock = Clock::start();
        let log = EventLog::new(sink);
        Self {
            shared: Arc::new(Shared::new(clock, bucket_capacity, log)),
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Run the emulation to completion: packet source, token source, and the
    /// two servers, all joined before the final `emulation ends` event.
    ///
    /// Returns the aggregate report; rendering it is the caller's business.
    pub fn run(&self, workload: &Workload, token_period_ms: u64) -> Report {
        let begin = self.shared.clock.now();
        self.shared.lock().log.emulation_begins(begin);
        debug!(
            "emulation begins: {} packets, token period {token_period_ms}ms, B={}",
            workload.packet_count(),
            self.shared.bucket_capacity
        );

        let shared = &*self.shared;
        thread::scope(|s| {
            s.spawn(move || packet_source(shared, workload));
            s.spawn(move || token_source(shared, token_period_ms));
            s.spawn(move || server(shared, 1));
            s.spawn(move || server(shared, 2));
        });

        let end = self.shared.clock.now();
        let mut state = self.shared.lock();
        state.log.emulation_ends(end);
        debug!(
            "emulation ends after {}us: completed={} dropped={} removed={}",
            end.saturating_sub(begin),
            state.completed,
            state.dropped,
            state.removed
        );

        Report {
            emulation_us: end.saturating_sub(begin),
            arrived: state.arrived,
            completed: state.completed,
            dropped: state.dropped,
            removed: state.removed,
            accepted_tokens: state.accepted_tokens,
            dropped_tokens: state.dropped_tokens,
            avg_inter_arrival_us: state.avg_inter_arrival,
            avg_service_time_us: state.avg_service_time,
            total_q1_us: state.total_q1_time,
            total_q2_us: state.total_q2_time,
            total_s1_us: state.total_s1_time,
            total_s2_us: state.total_s2_time,
            avg_x_ms: state.avg_x,
            avg_x_sqr_ms: state.avg_x_sqr,
        }
    }
}
