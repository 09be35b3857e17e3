//! qdisc — two-stage token-bucket traffic-shaping emulator.
//!
//! Parses the command line, loads and validates the trace file (if any)
//! before a single emulation event is printed, hooks SIGINT to the graceful
//! drain, runs the emulation, and renders the statistics block. Exit code 1
//! is reserved for malformed input; a signalled run still exits 0.

mod args;

use std::fs::File;
use std::io::{self, BufReader};
use std::process;

use qdisc_core::{Emulation, PacketSpec, Workload, write_banner};

fn main() {
    env_logger::init();

    let mut params = match args::parse(std::env::args().skip(1)) {
        Ok(params) => params,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("{}", args::USAGE);
            process::exit(1);
        }
    };

    let workload = match params.tsfile.clone() {
        Some(path) => {
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(e) => {
                    eprintln!("{path}: {e}");
                    process::exit(1);
                }
            };
            match Workload::from_trace(BufReader::new(file)) {
                Ok(workload) => workload,
                Err(e) => {
                    eprintln!("{e}");
                    process::exit(1);
                }
            }
        }
        None => {
            let periods = params.periods();
            Workload::deterministic(
                params.n,
                PacketSpec {
                    inter_arrival_ms: periods.inter_arrival_ms,
                    tokens_required: params.p,
                    service_ms: periods.service_ms,
                },
            )
        }
    };
    // In trace mode the file's own count is the one that prints and runs.
    params.n = workload.packet_count();
    log::debug!("parsed parameters: {params:?}");

    if let Err(e) = write_banner(&mut io::stdout().lock(), &params) {
        eprintln!("{e}");
        process::exit(1);
    }

    let emulation = Emulation::new(params.b, Box::new(io::stdout()));
    let handle = emulation.shutdown_handle();
    ctrlc::set_handler(move || handle.initiate_shutdown())
        .expect("Error setting Ctrl+C handler");

    let report = emulation.run(&workload, params.periods().token_ms);
    let _ = report.write_to(&mut io::stdout().lock());
}
