//! The two producer activities: packet arrivals and token arrivals.
//!
//! Both pace themselves against nominal schedules anchored to the previous
//! event's measured time, so transient scheduler delay does not push later
//! events further and further out. Both suspend only through the shared
//! condition variable, which is how shutdown reaches them mid-wait.

use log::debug;

use crate::packet::Packet;
use crate::state::{Shared, TokenPace};
use crate::workload::Workload;

/// Produce up to `packet_count` arrivals, admitting or dropping each one.
pub(crate) fn packet_source(shared: &Shared, workload: &Workload) {
    let count = workload.packet_count();
    let mut last_arrival: u64 = 0;

    for idx in 0..count {
        let spec = workload.spec_for(idx);
        let num = (idx + 1) as u32;

        let deadline = last_arrival.saturating_add(spec.inter_arrival_ms.saturating_mul(1000));
        if !shared.pace_until(deadline) {
            debug!("packet source cancelled before p{num}");
            return;
        }

        let mut state = shared.lock();
        if state.time_to_quit {
            debug!("packet source observed shutdown at p{num}");
            return;
        }

        let now = shared.clock.now();
        let measured = now.saturating_sub(last_arrival);
        last_arrival = now;

        state.arrived += 1;
        let arrived = state.arrived;
        state.avg_inter_arrival =
            (state.avg_inter_arrival * (arrived - 1) as f64 + measured as f64) / arrived as f64;

        if spec.tokens_required > shared.bucket_capacity {
            // Unserviceable by construction: the bucket can never hold enough.
            state.dropped += 1;
            state
                .log
                .packet_arrives(now, num, spec.tokens_required, measured, true);
        } else {
            state
                .log
                .packet_arrives(now, num, spec.tokens_required, measured, false);
            let mut p = Packet::new(num, spec);
            p.arrival_time = now;

            let now = shared.clock.now();
            p.enter_time = now;
            state.log.packet_enters_q1(now, p.num);
            state.q1.push_back(p);

            // A head that just appeared may already be affordable.
            if state.q1.len() == 1 {
                shared.promote_head(&mut state);
            }
        }
    }

    let mut state = shared.lock();
    state.all_packets_arrived = true;
    shared.notify_all();
    debug!("packet source done, {} arrivals", state.arrived);
}

/// Produce tokens until every packet has arrived and Q1 has emptied, or
/// shutdown is requested.
pub(crate) fn token_source(shared: &Shared, token_period_ms: u64) {
    let mut t_num: u64 = 0;
    let mut last_token: u64 = 0;

    loop {
        t_num += 1;

        let deadline = last_token.saturating_add(token_period_ms.saturating_mul(1000));
        match shared.pace_token_until(deadline) {
            TokenPace::Quit => {
                debug!("token source cancelled before t{t_num}");
                break;
            }
            TokenPace::Drained => {
                debug!("token source finished after {} tokens", t_num - 1);
                break;
            }
            TokenPace::Due => {}
        }

        let mut state = shared.lock();
        if state.time_to_quit {
            break;
        }
        if state.all_packets_arrived && state.q1.is_empty() {
            break;
        }

        let now = shared.clock.now();
        last_token = now;

        if state.token_bucket < shared.bucket_capacity {
            state.token_bucket += 1;
            state.accepted_tokens += 1;
            let bucket = state.token_bucket;
            state.log.token_arrives(now, t_num, Some(bucket));
        } else {
            state.dropped_tokens += 1;
            state.log.token_arrives(now, t_num, None);
        }

        if !state.q1.is_empty() {
            shared.promote_head(&mut state);
        }
    }

    shared.notify_all();
}
