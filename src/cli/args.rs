//! CLI argument definitions

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "ctf2perfetto",
    about = "Converts a decoded Phoenix-RTOS CTF trace into a Perfetto protobuf trace",
    after_help = "\
EXAMPLES:
    ctf2perfetto ./trace-dir trace.perfetto-trace
    ctf2perfetto ./trace-dir trace.perfetto-trace --merge-priorities false
    RUST_LOG=debug ctf2perfetto ./trace-dir trace.perfetto-trace"
)]
pub struct Args {
    /// Directory containing the decoded CTF trace (an `events.jsonl` file)
    pub ctf_input_path: PathBuf,

    /// Path to write the Perfetto protobuf trace to
    pub output_path: PathBuf,

    /// Parent each thread's `prio` counter track under its own thread
    /// rather than a shared per-process priority group
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub merge_priorities: bool,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all but warning and error logs
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
