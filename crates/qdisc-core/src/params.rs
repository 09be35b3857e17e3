//! Emulation parameters and rate-to-period conversion.
//!
//! λ, µ, and r arrive from the command line as events per second; the engine
//! paces in millisecond periods. Conversion is `round(1000 / rate)`, clamped
//! to ten seconds, so a degenerate rate cannot stall the run indefinitely.

use std::io::{self, Write};

use crate::stats::fmt_g6;

/// Ceiling for every derived period, in milliseconds.
pub const MAX_PERIOD_MS: u64 = 10_000;

/// Immutable run configuration, fixed after startup.
#[derive(Debug, Clone)]
pub struct Params {
    /// Number of packets to arrive.
    pub n: u64,
    /// Packet arrival rate, packets per second. Unused in trace mode.
    pub lambda: f64,
    /// Service rate, packets per second. Unused in trace mode.
    pub mu: f64,
    /// Token arrival rate, tokens per second.
    pub r: f64,
    /// Token bucket capacity.
    pub b: u64,
    /// Tokens required per packet. Unused in trace mode.
    pub p: u64,
    /// Trace file path; `None` selects deterministic mode.
    pub tsfile: Option<String>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            n: 20,
            lambda: 1.0,
            mu: 0.35,
            r: 1.5,
            b: 10,
            p: 3,
            tsfile: None,
        }
    }
}

/// Millisecond periods derived from the per-second rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Periods {
    /// Packet inter-arrival period (from λ).
    pub inter_arrival_ms: u64,
    /// Service hold period (from µ).
    pub service_ms: u64,
    /// Token inter-arrival period (from r).
    pub token_ms: u64,
}

impl Params {
    /// Derive the millisecond pacing periods from the configured rates.
    pub fn periods(&self) -> Periods {
        Periods {
            inter_arrival_ms: rate_to_period_ms(self.lambda),
            service_ms: rate_to_period_ms(self.mu),
            token_ms: rate_to_period_ms(self.r),
        }
    }
}

/// Convert an events-per-second rate to a millisecond period.
///
/// `round(1000 / rate)`, clamped to [`MAX_PERIOD_MS`]. Zero, negative, and
/// non-finite rates saturate to the clamp.
pub fn rate_to_period_ms(rate: f64) -> u64 {
    let period = (1000.0 / rate).round();
    if period.is_finite() && period >= 0.0 && period <= MAX_PERIOD_MS as f64 {
        period as u64
    } else {
        MAX_PERIOD_MS
    }
}

/// Write the parameter banner shown before `emulation begins`.
///
/// λ, µ, and P describe the synthetic workload, so they print only in
/// deterministic mode; the trace path prints only in trace mode.
pub fn write_banner<W: Write>(out: &mut W, params: &Params) -> io::Result<()> {
    writeln!(out, "Emulation Parameters:")?;
    writeln!(out, "\tnumber to arrive = {}", params.n)?;
    if params.tsfile.is_none() {
        writeln!(out, "\tlambda = {}", fmt_g6(params.lambda))?;
        writeln!(out, "\tmu = {}", fmt_g6(params.mu))?;
    }
    writeln!(out, "\tr = {}", fmt_g6(params.r))?;
    writeln!(out, "\tB = {}", params.b)?;
    if params.tsfile.is_none() {
        writeln!(out, "\tP = {}", params.p)?;
    }
    if let Some(path) = &params.tsfile {
        writeln!(out, "\ttsfile = {path}")?;
    }
    writeln!(out)
}
