//! The unit of work flowing through the emulation.

use crate::workload::PacketSpec;

/// A packet moving through Q1, Q2, and a server.
///
/// Owned by value by exactly one component at a time; ownership moves through
/// the queues under the emulation mutex. `enter_time` is re-stamped at each
/// stage boundary (Q1 entry, Q2 entry, service begin) so stage residency is
/// always `now - enter_time`.
#[derive(Debug)]
pub struct Packet {
    /// 1-based arrival sequence number.
    pub num: u32,
    /// Requested inter-arrival gap in milliseconds.
    pub inter_arrival_ms: u64,
    /// Tokens this packet must pay to leave Q1.
    pub tokens_required: u64,
    /// Requested service hold time in milliseconds.
    pub service_ms: u64,
    /// Arrival timestamp, microseconds of emulation clock.
    pub arrival_time: u64,
    /// Entry timestamp of the current stage, microseconds.
    pub enter_time: u64,
    /// Exit timestamp of the last stage left, microseconds.
    pub leave_time: u64,
}

impl Packet {
    pub fn new(num: u32, spec: PacketSpec) -> Self {
        Self {
            num,
            inter_arrival_ms: spec.inter_arrival_ms,
            tokens_required: spec.tokens_required,
            service_ms: spec.service_ms,
            arrival_time: 0,
            enter_time: 0,
            leave_time: 0,
        }
    }
}
