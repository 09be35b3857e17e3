//! Final aggregate statistics.
//!
//! The report is derived once, after the activity threads have joined, from
//! the sums and incremental means accumulated under the emulation mutex.
//! Occupancy figures divide residency sums by the wall-clock emulation
//! duration; the sojourn standard deviation comes from the mean and
//! mean-of-squares pair.

use std::io::{self, Write};

/// Snapshot of the finished emulation.
#[derive(Debug, Clone, Copy)]
pub struct Report {
    /// Emulation duration, microseconds.
    pub emulation_us: u64,
    /// Packets that arrived, admitted or not.
    pub arrived: u64,
    /// Packets that departed a server.
    pub completed: u64,
    /// Packets rejected on arrival (`tokens_required > B`).
    pub dropped: u64,
    /// Packets flushed by the shutdown drain.
    pub removed: u64,
    pub accepted_tokens: u64,
    pub dropped_tokens: u64,
    /// Mean measured inter-arrival gap, microseconds.
    pub avg_inter_arrival_us: f64,
    /// Mean measured service time, microseconds.
    pub avg_service_time_us: f64,
    pub total_q1_us: u64,
    pub total_q2_us: u64,
    pub total_s1_us: u64,
    pub total_s2_us: u64,
    /// Mean sojourn time, milliseconds.
    pub avg_x_ms: f64,
    /// Mean squared sojourn time, milliseconds squared.
    pub avg_x_sqr_ms: f64,
}

impl Report {
    /// Time-averaged occupancy of a stage: residency sum over duration.
    fn occupancy(&self, total_us: u64) -> f64 {
        total_us as f64 / self.emulation_us as f64
    }

    /// Sojourn standard deviation, milliseconds.
    pub fn sojourn_std_dev_ms(&self) -> f64 {
        (self.avg_x_sqr_ms - self.avg_x_ms * self.avg_x_ms).max(0.0).sqrt()
    }

    /// Fraction of tokens dropped, if any token arrived.
    pub fn token_drop_probability(&self) -> Option<f64> {
        let total = self.accepted_tokens + self.dropped_tokens;
        (total > 0).then(|| self.dropped_tokens as f64 / total as f64)
    }

    /// Fraction of packets dropped on arrival, if any packet was accounted.
    pub fn packet_drop_probability(&self) -> Option<f64> {
        let total = self.dropped + self.completed + self.removed;
        (total > 0).then(|| self.dropped as f64 / total as f64)
    }

    /// Write the statistics block that follows `emulation ends`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Statistics:")?;
        writeln!(out)?;

        if self.arrived == 0 {
            writeln!(
                out,
                "\taverage packet inter-arrival time = \"N/A\" no packet arrived"
            )?;
        } else {
            writeln!(
                out,
                "\taverage packet inter-arrival time = {}",
                fmt_g6(self.avg_inter_arrival_us / 1_000_000.0)
            )?;
        }
        if self.completed == 0 {
            writeln!(
                out,
                "\taverage packet service time = \"N/A\" no packet served"
            )?;
        } else {
            writeln!(
                out,
                "\taverage packet service time = {}",
                fmt_g6(self.avg_service_time_us / 1_000_000.0)
            )?;
        }
        writeln!(out)?;

        writeln!(
            out,
            "\taverage number of packets in Q1 = {}",
            fmt_g6(self.occupancy(self.total_q1_us))
        )?;
        writeln!(
            out,
            "\taverage number of packets in Q2 = {}",
            fmt_g6(self.occupancy(self.total_q2_us))
        )?;
        writeln!(
            out,
            "\taverage number of packets in S1 = {}",
            fmt_g6(self.occupancy(self.total_s1_us))
        )?;
        writeln!(
            out,
            "\taverage number of packets in S2 = {}",
            fmt_g6(self.occupancy(self.total_s2_us))
        )?;
        writeln!(out)?;

        if self.completed == 0 {
            writeln!(
                out,
                "\taverage time a packet spent in system = \"N/A\" no packet served"
            )?;
            writeln!(
                out,
                "\tstandard deviation for time spent in system = \"N/A\" no packet served"
            )?;
        } else {
            writeln!(
                out,
                "\taverage time a packet spent in system = {}",
                fmt_g6(self.avg_x_ms / 1000.0)
            )?;
            writeln!(
                out,
                "\tstandard deviation for time spent in system = {}",
                fmt_g6(self.sojourn_std_dev_ms() / 1000.0)
            )?;
        }
        writeln!(out)?;

        match self.token_drop_probability() {
            Some(p) => writeln!(out, "\ttoken drop probability = {}", fmt_g6(p))?,
            None => writeln!(
                out,
                "\ttoken drop probability = \"N/A\" no token arrived"
            )?,
        }
        match self.packet_drop_probability() {
            Some(p) => writeln!(out, "\tpacket drop probability = {}", fmt_g6(p))?,
            None => writeln!(
                out,
                "\tpacket drop probability = \"N/A\" no packet arrived"
            )?,
        }
        Ok(())
    }
}

/// Format a float the way C's `%.6g` does: six significant digits, trailing
/// zeros trimmed, scientific notation outside `[1e-4, 1e6)`.
pub fn fmt_g6(x: f64) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x < 0.0 { "-inf" } else { "inf" }.to_string();
    }

    // Round to six significant digits first; the exponent in the scientific
    // rendering is already post-rounding (999999.5 lands in the 1e6 branch).
    let sci = format!("{x:.5e}");
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };

    if exp < -4 || exp >= 6 {
        let mantissa = trim_trailing_zeros(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        let decimals = (5 - exp).max(0) as usize;
        let fixed = format!("{x:.decimals$}");
        trim_trailing_zeros(&fixed).to_string()
    }
}

fn trim_trailing_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_report() -> Report {
        Report {
            emulation_us: 1_000_000,
            arrived: 0,
            completed: 0,
            dropped: 0,
            removed: 0,
            accepted_tokens: 0,
            dropped_tokens: 0,
            avg_inter_arrival_us: 0.0,
            avg_service_time_us: 0.0,
            total_q1_us: 0,
            total_q2_us: 0,
            total_s1_us: 0,
            total_s2_us: 0,
            avg_x_ms: 0.0,
            avg_x_sqr_ms: 0.0,
        }
    }

    fn render(report: &Report) -> String {
        let mut out = Vec::new();
        report.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    // -----------------------------------------------------------------------
    // %.6g formatting
    // -----------------------------------------------------------------------

    #[test]
    fn test_g6_integers_and_trimming() {
        assert_eq!(fmt_g6(0.0), "0");
        assert_eq!(fmt_g6(1.0), "1");
        assert_eq!(fmt_g6(20.0), "20");
        assert_eq!(fmt_g6(0.35), "0.35");
        assert_eq!(fmt_g6(1.5), "1.5");
        assert_eq!(fmt_g6(-2.5), "-2.5");
    }

    #[test]
    fn test_g6_six_significant_digits() {
        assert_eq!(fmt_g6(2857.14159), "2857.14");
        assert_eq!(fmt_g6(0.123456789), "0.123457");
        assert_eq!(fmt_g6(123456.7), "123457");
    }

    #[test]
    fn test_g6_scientific_for_extremes() {
        assert_eq!(fmt_g6(1.0e7), "1e+07");
        assert_eq!(fmt_g6(0.0000123), "1.23e-05");
        assert_eq!(fmt_g6(999999.5), "1e+06");
        assert_eq!(fmt_g6(-4.2e-9), "-4.2e-09");
    }

    #[test]
    fn test_g6_boundary_stays_decimal() {
        assert_eq!(fmt_g6(0.0001), "0.0001");
        assert_eq!(fmt_g6(999999.0), "999999");
    }

    // -----------------------------------------------------------------------
    // Derived metrics
    // -----------------------------------------------------------------------

    #[test]
    fn test_probabilities_unavailable_without_events() {
        let report = empty_report();
        assert!(report.token_drop_probability().is_none());
        assert!(report.packet_drop_probability().is_none());
    }

    #[test]
    fn test_probability_math() {
        let report = Report {
            accepted_tokens: 6,
            dropped_tokens: 2,
            dropped: 1,
            completed: 2,
            removed: 1,
            ..empty_report()
        };
        assert_eq!(report.token_drop_probability(), Some(0.25));
        assert_eq!(report.packet_drop_probability(), Some(0.25));
    }

    #[test]
    fn test_sojourn_std_dev() {
        // Two sojourns of 100ms and 300ms: mean 200, E[x^2] 50000, sigma 100.
        let report = Report {
            completed: 2,
            avg_x_ms: 200.0,
            avg_x_sqr_ms: 50_000.0,
            ..empty_report()
        };
        assert!((report.sojourn_std_dev_ms() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_std_dev_never_nan_on_rounding() {
        let report = Report {
            completed: 1,
            avg_x_ms: 100.0,
            avg_x_sqr_ms: 100.0 * 100.0 - 1e-9,
            ..empty_report()
        };
        assert_eq!(report.sojourn_std_dev_ms(), 0.0);
    }

    // -----------------------------------------------------------------------
    // Report rendering
    // -----------------------------------------------------------------------

    #[test]
    fn test_report_all_not_available() {
        let text = render(&empty_report());
        assert_eq!(
            text,
            "Statistics:\n\
             \n\
             \taverage packet inter-arrival time = \"N/A\" no packet arrived\n\
             \taverage packet service time = \"N/A\" no packet served\n\
             \n\
             \taverage number of packets in Q1 = 0\n\
             \taverage number of packets in Q2 = 0\n\
             \taverage number of packets in S1 = 0\n\
             \taverage number of packets in S2 = 0\n\
             \n\
             \taverage time a packet spent in system = \"N/A\" no packet served\n\
             \tstandard deviation for time spent in system = \"N/A\" no packet served\n\
             \n\
             \ttoken drop probability = \"N/A\" no token arrived\n\
             \tpacket drop probability = \"N/A\" no packet arrived\n"
        );
    }

    #[test]
    fn test_report_with_traffic() {
        let report = Report {
            emulation_us: 2_000_000,
            arrived: 4,
            completed: 3,
            dropped: 1,
            removed: 0,
            accepted_tokens: 5,
            dropped_tokens: 0,
            avg_inter_arrival_us: 500_000.0,
            avg_service_time_us: 250_000.0,
            total_q1_us: 1_000_000,
            total_q2_us: 500_000,
            total_s1_us: 400_000,
            total_s2_us: 350_000,
            avg_x_ms: 800.0,
            avg_x_sqr_ms: 650_000.0,
        };
        let text = render(&report);
        assert!(text.contains("\taverage packet inter-arrival time = 0.5\n"));
        assert!(text.contains("\taverage packet service time = 0.25\n"));
        assert!(text.contains("\taverage number of packets in Q1 = 0.5\n"));
        assert!(text.contains("\taverage number of packets in Q2 = 0.25\n"));
        assert!(text.contains("\taverage number of packets in S1 = 0.2\n"));
        assert!(text.contains("\taverage number of packets in S2 = 0.175\n"));
        assert!(text.contains("\taverage time a packet spent in system = 0.8\n"));
        assert!(text.contains("\ttoken drop probability = 0\n"));
        assert!(text.contains("\tpacket drop probability = 0.25\n"));
    }
}
