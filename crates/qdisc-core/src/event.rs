//! Timestamped, serialized event emission.
//!
//! Every line carries a `MMMMMMMM.uuums: ` prefix: zero-padded milliseconds
//! and a three-digit microsecond fraction, relative to emulation start. Lines
//! are written only while the caller holds the emulation mutex, so the log is
//! a single global order consistent with lock acquisition order.

use std::io::Write;

pub(crate) struct EventLog {
    out: Box<dyn Write + Send>,
}

/// Grammatical number for a bucket size: `1 token`, `5 tokens`, `0 token`.
fn token_word(count: u64) -> &'static str {
    if count > 1 { "tokens" } else { "token" }
}

/// Split microseconds into whole milliseconds and the microsecond remainder.
fn ms_parts(us: u64) -> (u64, u64) {
    (us / 1000, us % 1000)
}

impl EventLog {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    fn line(&mut self, now: u64, body: std::fmt::Arguments<'_>) {
        let (ms, frac) = ms_parts(now);
        // The log shares fate with stdout; a broken pipe is not recoverable
        // mid-emulation and the final counters stay correct regardless.
        let _ = write!(self.out, "{ms:08}.{frac:03}ms: ");
        let _ = self.out.write_fmt(body);
        let _ = writeln!(self.out);
        let _ = self.out.flush();
    }

    pub fn emulation_begins(&mut self, now: u64) {
        self.line(now, format_args!("emulation begins"));
    }

    pub fn packet_arrives(
        &mut self,
        now: u64,
        num: u32,
        tokens_required: u64,
        measured_us: u64,
        dropped: bool,
    ) {
        let (ms, frac) = ms_parts(measured_us);
        let suffix = if dropped { ", dropped" } else { "" };
        self.line(
            now,
            format_args!(
                "p{num} arrives, needs {tokens_required} tokens, inter-arrival time = {ms}.{frac:03}ms{suffix}"
            ),
        );
    }

    pub fn packet_enters_q1(&mut self, now: u64, num: u32) {
        self.line(now, format_args!("p{num} enters Q1"));
    }

    pub fn packet_leaves_q1(&mut self, now: u64, num: u32, waited_us: u64, bucket: u64) {
        let (ms, frac) = ms_parts(waited_us);
        self.line(
            now,
            format_args!(
                "p{num} leaves Q1, time in Q1 = {ms}.{frac:03}ms, token bucket now has {bucket} {}",
                token_word(bucket)
            ),
        );
    }

    pub fn packet_enters_q2(&mut self, now: u64, num: u32) {
        self.line(now, format_args!("p{num} enters Q2"));
    }

    pub fn token_arrives(&mut self, now: u64, t_num: u64, bucket: Option<u64>) {
        match bucket {
            Some(count) => self.line(
                now,
                format_args!(
                    "token t{t_num} arrives, token bucket now has {count} {}",
                    token_word(count)
                ),
            ),
            None => self.line(now, format_args!("token t{t_num} arrives, dropped")),
        }
    }

    pub fn packet_leaves_q2(&mut self, now: u64, num: u32, waited_us: u64) {
        let (ms, frac) = ms_parts(waited_us);
        self.line(
            now,
            format_args!("p{num} leaves Q2, time in Q2 = {ms}.{frac:03}ms"),
        );
    }

    pub fn begins_service(&mut self, now: u64, num: u32, server: u32, service_ms: u64) {
        self.line(
            now,
            format_args!("p{num} begins service at S{server}, requesting {service_ms}ms of service"),
        );
    }

    pub fn departs_service(
        &mut self,
        now: u64,
        num: u32,
        server: u32,
        served_us: u64,
        in_system_us: u64,
    ) {
        let (sms, sfrac) = ms_parts(served_us);
        let (xms, xfrac) = ms_parts(in_system_us);
        self.line(
            now,
            format_args!(
                "p{num} departs from S{server}, service time = {sms}.{sfrac:03}ms, time in system = {xms}.{xfrac:03}ms"
            ),
        );
    }

    pub fn packet_removed(&mut self, now: u64, num: u32, queue: &str) {
        self.line(now, format_args!("p{num} removed from {queue}"));
    }

    pub fn sigint_caught(&mut self, now: u64) {
        self.line(
            now,
            format_args!("SIGINT caught, no new packets or tokens will be allowed"),
        );
    }

    pub fn emulation_ends(&mut self, now: u64) {
        self.line(now, format_args!("emulation ends"));
        let _ = writeln!(self.out);
        let _ = self.out.flush();
    }
}
