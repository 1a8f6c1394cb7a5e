use std::fmt;

use crate::{
    cache::CacheConfig,
    error::SimError,
    simulator::Simulator,
    stats::Report,
    trace::TraceFile,
};

#[derive(Clone)]
pub struct ScenarioConfig {
    pub label: String, // Label to be printed for the Result
    pub config: CacheConfig,
}

pub struct ScenarioResult {
    pub label: String,
    pub trace_results: Vec<TraceResult>,
}

pub struct TraceResult {
    pub trace_name: String,
    pub report: Report,
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.label)?;
        for result in &self.trace_results {
            let total = &result.report.total;
            writeln!(
                f,
                "  {:<16} miss-rate: {:>6.2}% broadcasts: {:>8} copies-back: {:>8}",
                result.trace_name,
                total.miss_rate() * 100.0,
                total.broadcasts,
                total.copies_back
            )?;
        }
        Ok(())
    }
}

/// Feeds every record of `trace` through a fresh simulator, then flushes.
pub fn run_trace(config: &CacheConfig, trace: &TraceFile) -> Result<Report, SimError> {
    let mut sim = Simulator::new(config.clone())?;
    for access in &trace.entries {
        sim.perform_access(access.address, access.kind, access.core)?;
    }
    sim.flush()?;
    Ok(sim.report())
}

pub fn run_scenarios(
    traces: &[TraceFile],
    scenarios: &[ScenarioConfig],
) -> Result<Vec<ScenarioResult>, SimError> {
    let mut results = Vec::new();
    for scenario in scenarios {
        let mut per_trace = Vec::new();
        for trace in traces {
            let report = run_trace(&scenario.config, trace)?;
            per_trace.push(TraceResult {
                trace_name: trace.name.clone(),
                report,
            });
        }
        results.push(ScenarioResult {
            label: scenario.label.clone(),
            trace_results: per_trace,
        });
    }
    Ok(results)
}

pub fn set_associative(base: &CacheConfig, ways: &[usize]) -> Vec<ScenarioConfig> {
    ways.iter()
        .map(|&assoc| {
            let mut cfg = base.clone();
            cfg.associativity = assoc;
            ScenarioConfig {
                label: if assoc == 1 {
                    "Direct-Mapped".to_string()
                } else {
                    format!("{assoc}-way SA")
                },
                config: cfg,
            }
        })
        .collect()
}

pub fn block_sizes(base: &CacheConfig, block_sizes: &[usize]) -> Vec<ScenarioConfig> {
    block_sizes
        .iter()
        .map(|&block| {
            let mut cfg = base.clone();
            cfg.block_size = block;
            ScenarioConfig {
                label: format!("Block {block}B"),
                config: cfg,
            }
        })
        .collect()
}

pub fn cache_sizes(base: &CacheConfig, sizes: &[usize]) -> Vec<ScenarioConfig> {
    sizes
        .iter()
        .map(|&size| {
            let mut cfg = base.clone();
            cfg.cache_size = size;
            ScenarioConfig {
                label: format!("{}KiB per core", size / 1024),
                config: cfg,
            }
        })
        .collect()
}
