//! Lexical pass over argv.
//!
//! The grammar uses single-dash long options (`-lambda 2.0`), so this is a
//! small hand-rolled scanner rather than a derive-style parser. A flag's
//! value must follow it and must not itself begin with `-`; anything else is
//! a malformed command line. Non-positive or oversized numeric values draw a
//! diagnostic on stderr but do not stop the run.

use std::fmt;

use qdisc_core::Params;

pub const USAGE: &str =
    "usage: qdisc [-lambda lambda] [-mu mu] [-r r] [-B B] [-P P] [-n num] [-t tsfile]";

/// A fatally malformed command line.
#[derive(Debug, PartialEq, Eq)]
pub enum ArgError {
    /// A flag's value was absent or began with `-`.
    MissingValue(&'static str),
    /// An unrecognized flag or a bare positional argument.
    UnknownFlag,
}

impl fmt::Display for ArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgError::MissingValue(name) => {
                write!(f, "malformed commandline - argument missing for {name}")
            }
            ArgError::UnknownFlag => write!(f, "malformed commandline - unknown flag used"),
        }
    }
}

/// Parse the arguments following the program name.
///
/// Later occurrences of a flag overwrite earlier ones. Values that fail to
/// parse behave like C's `strtod`/`strtol` on garbage: they read as zero and
/// draw the not-positive diagnostic.
pub fn parse(args: impl Iterator<Item = String>) -> Result<Params, ArgError> {
    let mut params = Params::default();
    let mut args = args;

    while let Some(arg) = args.next() {
        if !arg.starts_with('-') {
            return Err(ArgError::UnknownFlag);
        }
        match arg.as_str() {
            "-lambda" => params.lambda = rate_value(&mut args, "lambda", "lambda")?,
            "-mu" => params.mu = rate_value(&mut args, "mu", "mu")?,
            "-r" => params.r = rate_value(&mut args, "r", "rate")?,
            "-B" => params.b = count_value(&mut args, "B")?,
            "-P" => params.p = count_value(&mut args, "P")?,
            "-n" => params.n = count_value(&mut args, "n")?,
            "-t" => params.tsfile = Some(flag_value(&mut args, "t")?),
            _ => return Err(ArgError::UnknownFlag),
        }
    }

    Ok(params)
}

fn flag_value(
    args: &mut impl Iterator<Item = String>,
    name: &'static str,
) -> Result<String, ArgError> {
    match args.next() {
        Some(value) if !value.starts_with('-') => Ok(value),
        _ => Err(ArgError::MissingValue(name)),
    }
}

// The value diagnostic names `-r` as "rate", unlike the missing-argument one.
fn rate_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
    diag: &'static str,
) -> Result<f64, ArgError> {
    let raw = flag_value(args, flag)?;
    let value: f64 = raw.parse().unwrap_or(0.0);
    if value <= 0.0 {
        eprintln!("error in the input - {diag} is not positive");
    }
    Ok(value)
}

fn count_value(
    args: &mut impl Iterator<Item = String>,
    name: &'static str,
) -> Result<u64, ArgError> {
    let raw = flag_value(args, name)?;
    let value: i64 = raw.parse().unwrap_or(0);
    if value > i32::MAX as i64 {
        eprintln!("error in the input - {name} is too large");
    } else if value <= 0 {
        eprintln!("error in the input - {name} is not positive");
    }
    Ok(value.max(0) as u64)
}
