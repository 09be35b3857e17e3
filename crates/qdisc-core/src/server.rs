//! Service units S1 and S2.
//!
//! Each server blocks on the condition variable while idle, claims the head
//! of Q2 when one appears, and holds it for its requested service time with
//! the mutex released. Servers are never cancelled; they leave through the
//! shutdown branch or natural termination.

use std::thread;
use std::time::Duration;

use log::debug;

use crate::state::Shared;

pub(crate) fn server(shared: &Shared, index: u32) {
    loop {
        let mut state = shared.lock();

        // Idle predicate; tolerant of spurious wakes.
        while !state.time_to_quit
            && state.q2.is_empty()
            && (!state.q1.is_empty() || !state.all_packets_arrived)
        {
            state = shared.wait(state);
        }

        if state.time_to_quit {
            // Wake the peer before draining.
            shared.notify_all();
            shared.drain(&mut state);
            debug!("S{index} exiting on shutdown");
            return;
        }
        if state.all_packets_arrived && state.q1.is_empty() && state.q2.is_empty() {
            shared.notify_all();
            debug!("S{index} exiting, all packets settled");
            return;
        }

        let Some(mut p) = state.q2.pop_front() else {
            continue;
        };

        let now = shared.clock.now();
        p.leave_time = now;
        let waited = now.saturating_sub(p.enter_time);
        state.total_q2_time += waited;
        state.log.packet_leaves_q2(now, p.num, waited);

        let now = shared.clock.now();
        p.enter_time = now;
        state.log.begins_service(now, p.num, index, p.service_ms);
        drop(state);

        // Hold the packet for its requested service time, lock released.
        let deadline = p.enter_time.saturating_add(p.service_ms.saturating_mul(1000));
        let now = shared.clock.now();
        if now < deadline {
            thread::sleep(Duration::from_micros(deadline - now));
        }

        let mut state = shared.lock();
        let now = shared.clock.now();
        p.leave_time = now;
        let served = now.saturating_sub(p.enter_time);
        if index == 1 {
            state.total_s1_time += served;
        } else {
            state.total_s2_time += served;
        }

        // The incremental means weight by the pre-departure completed count.
        let done = state.completed as f64;
        state.avg_service_time = (state.avg_service_time * done + served as f64) / (done + 1.0);

        let in_system = now.saturating_sub(p.arrival_time);
        let in_system_ms = in_system as f64 / 1000.0;
        state.avg_x = (state.avg_x * done + in_system_ms) / (done + 1.0);
        state.avg_x_sqr = (state.avg_x_sqr * done + in_system_ms * in_system_ms) / (done + 1.0);
        state.completed += 1;

        state.log.departs_service(now, p.num, index, served, in_system);
    }
}
