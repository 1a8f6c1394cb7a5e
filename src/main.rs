use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Env, Target};
use mesi_cache_sim::{
    CacheConfig, TraceFile,
    experiments::{
        ScenarioResult, block_sizes, cache_sizes, run_scenarios, run_trace, set_associative,
    },
};

#[derive(Parser, Debug)]
#[command(name = "mesi-sim", version, about = "Multi-core MESI cache simulator")]
struct Args {
    /// Trace files of `core type address` records.
    #[arg(required = true)]
    traces: Vec<PathBuf>,

    /// Number of cores; defaults to the highest core id in the traces plus one.
    #[arg(short = 'n', long)]
    cores: Option<usize>,

    /// Block size in bytes.
    #[arg(short, long, default_value_t = 16)]
    block_size: usize,

    /// Cache size per core in bytes.
    #[arg(short = 's', long, default_value_t = 8 * 1024)]
    cache_size: usize,

    /// Set associativity.
    #[arg(short, long, default_value_t = 1)]
    assoc: usize,

    /// Log every transition and dump the touched set after each access.
    #[arg(short, long)]
    debug: bool,

    /// Write log output to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Run associativity, block size and cache size sweeps around the config.
    #[arg(long)]
    sweep: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let traces = args
        .traces
        .iter()
        .map(TraceFile::load)
        .collect::<Result<Vec<_>>>()?;

    let cores = match args.cores {
        Some(cores) => cores,
        None => traces.iter().map(TraceFile::cores_used).max().unwrap_or(1).max(1),
    };
    let config = CacheConfig {
        cores,
        block_size: args.block_size,
        cache_size: args.cache_size,
        associativity: args.assoc,
        debug: args.debug,
    };
    config.validate().context("Invalid cache configuration")?;
    println!("{config}");

    if args.sweep {
        return run_sweeps(&config, &traces);
    }

    for trace in &traces {
        let report = run_trace(&config, trace)
            .with_context(|| format!("Simulation of {} failed", trace.name))?;
        println!("\n== {} ==", trace.name);
        println!("{report}");
    }
    Ok(())
}

fn run_sweeps(config: &CacheConfig, traces: &[TraceFile]) -> Result<()> {
    let sections = [
        ("Set-Associative Sweep", set_associative(config, &[1, 2, 4, 8])),
        ("Block Size Sweep", block_sizes(config, &[8, 16, 32, 64, 128])),
        (
            "Cache Size Sweep",
            cache_sizes(config, &[4 * 1024, 8 * 1024, 16 * 1024, 32 * 1024]),
        ),
    ];
    for (title, scenarios) in sections {
        let results = run_scenarios(traces, &scenarios)
            .with_context(|| format!("{title} failed"))?;
        print_section(title, &results);
    }
    Ok(())
}

fn print_section(title: &str, results: &[ScenarioResult]) {
    println!("\n== {title} ==");
    for scenario in results {
        print!("{scenario}");
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let default_level = if args.debug { "mesi_cache_sim=trace" } else { "warn" };
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level));
    if let Some(path) = &args.log_file {
        let file = File::create(path)
            .with_context(|| format!("Unable to create log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}
