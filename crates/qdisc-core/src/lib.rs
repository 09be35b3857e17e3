//! # qdisc-core
//!
//! Two-stage token-bucket traffic-shaping emulation engine.
//!
//! Packets flow from a workload (synthetic or trace-driven) into a waiting
//! queue Q1, pay their token requirement to a bucket filled at a fixed rate,
//! move to a transmission queue Q2, and are held by one of two servers for
//! their requested service time. Every transition is stamped and written to
//! an event log; the run ends with aggregate statistics.
//!
//! ## Quick Start
//!
//! ```no_run
//! use qdisc_core::{Emulation, PacketSpec, Workload};
//!
//! // Three packets, 50ms apart, each costing one token and 30ms of service.
//! let workload = Workload::deterministic(
//!     3,
//!     PacketSpec {
//!         inter_arrival_ms: 50,
//!         tokens_required: 1,
//!         service_ms: 30,
//!     },
//! );
//!
//! // Bucket capacity 10, tokens every 20ms, events to stdout.
//! let emulation = Emulation::new(10, Box::new(std::io::stdout()));
//! let report = emulation.run(&workload, 20);
//! assert_eq!(report.completed, 3);
//! ```
//!
//! ## Architecture
//!
//! Workload → PacketSource → Q1 → (token bucket) → Q2 → Server ×2 → Report
//!
//! Four OS threads cooperate under a single mutex and condition variable:
//! the packet source, the token source, and two servers. Pacing waits are
//! timed waits on the shared condition variable, so a shutdown request
//! (Ctrl-C in the CLI, [`ShutdownHandle`] anywhere else) cancels them
//! cooperatively and the servers drain whatever is left in the queues.

pub mod clock;
pub mod emulation;
mod event;
pub mod packet;
pub mod params;
mod server;
mod source;
mod state;
pub mod stats;
pub mod workload;

pub use emulation::{Emulation, ShutdownHandle};
pub use params::{MAX_PERIOD_MS, Params, Periods, rate_to_period_ms, write_banner};
pub use stats::{Report, fmt_g6};
pub use workload::{MAX_LINE_LEN, PacketSpec, TraceError, Workload};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
