//! Packet descriptors: synthetic parameters or a trace file.
//!
//! Deterministic mode stamps every packet with the configured period, token
//! requirement, and service time. Trace mode reads one descriptor per line
//! from a tsfile. The trace is read and validated eagerly, before any
//! emulation output, so every input error surfaces at the boundary with an
//! exit diagnostic instead of killing the run halfway through.

use std::error::Error;
use std::fmt;
use std::io::BufRead;

/// Longest accepted tsfile line, in characters (line terminator excluded).
pub const MAX_LINE_LEN: usize = 1024;

/// One packet's requested behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketSpec {
    /// Gap after the previous arrival, milliseconds.
    pub inter_arrival_ms: u64,
    /// Tokens required to leave Q1.
    pub tokens_required: u64,
    /// Requested service hold, milliseconds.
    pub service_ms: u64,
}

/// A malformed or truncated tsfile.
///
/// `Display` yields the exact diagnostic the CLI prints before exiting 1.
#[derive(Debug)]
pub enum TraceError {
    /// Read failure after the file was opened.
    Io(std::io::Error),
    /// The file has no lines at all.
    EmptyFile,
    /// Line 1 does not start with an integer packet count.
    BadHeader,
    /// A line exceeds [`MAX_LINE_LEN`] characters.
    LineTooLong(usize),
    /// A data line is not three non-negative integers.
    BadLine(usize),
    /// Fewer data lines than the declared packet count.
    PrematureEof,
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceError::Io(e) => write!(f, "error in the input - {e}"),
            TraceError::EmptyFile => write!(f, "error in the input - empty file"),
            TraceError::BadHeader => {
                write!(f, "error in the input - line 1 not just a number")
            }
            TraceError::LineTooLong(line) => {
                write!(f, "error in the input - line {line} is too long")
            }
            TraceError::BadLine(line) => {
                write!(f, "error in the input - line {line} not in tsfile format")
            }
            TraceError::PrematureEof => {
                write!(f, "error in the input - reached EOF earlier than expected")
            }
        }
    }
}

impl Error for TraceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TraceError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TraceError {
    fn from(e: std::io::Error) -> Self {
        TraceError::Io(e)
    }
}

/// Where packet descriptors come from.
#[derive(Debug, Clone)]
pub enum Workload {
    /// Every packet uses the same configured spec.
    Deterministic { n: u64, spec: PacketSpec },
    /// Per-packet specs read from a tsfile.
    Trace { specs: Vec<PacketSpec> },
}

impl Workload {
    /// Synthetic workload: `n` identical packets.
    pub fn deterministic(n: u64, spec: PacketSpec) -> Self {
        Workload::Deterministic { n, spec }
    }

    /// Parse a tsfile: line 1 is the packet count, then one
    /// `inter-arrival tokens service` triple per line.
    ///
    /// Trailing text after the count on line 1 is discarded. Data lines must
    /// hold exactly three fields; extra lines past the declared count are
    /// ignored.
    pub fn from_trace<R: BufRead>(input: R) -> Result<Self, TraceError> {
        let mut lines = input.lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(TraceError::EmptyFile),
        };
        check_length(&header, 1)?;
        let n: u64 = header
            .split_whitespace()
            .next()
            .and_then(|tok| tok.parse().ok())
            .ok_or(TraceError::BadHeader)?;

        // Sized by the lines actually present, not the declared count; a
        // bogus huge header must fail at the first missing line, not here.
        let mut specs = Vec::new();
        for i in 0..n {
            let line_num = i as usize + 2;
            let line = match lines.next() {
                Some(line) => line?,
                None => return Err(TraceError::PrematureEof),
            };
            check_length(&line, line_num)?;
            specs.push(parse_spec(&line, line_num)?);
        }

        Ok(Workload::Trace { specs })
    }

    /// Number of packets this workload will produce.
    pub fn packet_count(&self) -> u64 {
        match self {
            Workload::Deterministic { n, .. } => *n,
            Workload::Trace { specs } => specs.len() as u64,
        }
    }

    /// Spec for the packet at 0-based index `idx`.
    pub fn spec_for(&self, idx: u64) -> PacketSpec {
        match self {
            Workload::Deterministic { spec, .. } => *spec,
            Workload::Trace { specs } => specs[idx as usize],
        }
    }
}

fn check_length(line: &str, line_num: usize) -> Result<(), TraceError> {
    if line.trim_end_matches(['\r', '\n']).chars().count() > MAX_LINE_LEN {
        Err(TraceError::LineTooLong(line_num))
    } else {
        Ok(())
    }
}

fn parse_spec(line: &str, line_num: usize) -> Result<PacketSpec, TraceError> {
    let mut fields = line.split_whitespace();
    let mut next = || -> Result<u64, TraceError> {
        fields
            .next()
            .and_then(|tok| tok.parse().ok())
            .ok_or(TraceError::BadLine(line_num))
    };
    let spec = PacketSpec {
        inter_arrival_ms: next()?,
        tokens_required: next()?,
        service_ms: next()?,
    };
    if line.split_whitespace().count() != 3 {
        return Err(TraceError::BadLine(line_num));
    }
    Ok(spec)
}
