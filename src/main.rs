use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};

use ctf2perfetto::cli::Args;
use ctf2perfetto::event_source::{CtfDirEventSource, EventSource};
use ctf2perfetto::perfetto::PacketEmitter;
use ctf2perfetto::ConverterCore;

fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            use clap::error::ErrorKind;
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                print!("{err}");
                std::process::exit(0);
            }
            eprint!("{err}");
            std::process::exit(1);
        }
    };
    init_logger(&args);

    let mut source = CtfDirEventSource::open(&args.ctf_input_path)
        .with_context(|| format!("opening CTF trace at {}", args.ctf_input_path.display()))?;

    let output = File::create(&args.output_path)
        .with_context(|| format!("creating output file {}", args.output_path.display()))?;
    let mut emitter = PacketEmitter::new(BufWriter::new(output));

    let mut core = ConverterCore::new(args.merge_priorities);

    let mut events_seen = 0u64;
    while let Some(event) = source.next_event()? {
        core.process_event(event, &mut emitter)?;
        events_seen += 1;
    }
    emitter.flush()?;

    info!("converted {events_seen} events");
    if core.any_unknown_threads() {
        warn!("there were threads missing metadata - they were marked as UNKNOWN");
    }

    Ok(())
}

fn init_logger(args: &Args) {
    let level = if args.quiet {
        LevelFilter::Warn
    } else {
        match args.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();
}
