use std::fmt;

/// Per-core counters. Traffic counters are in words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub accesses: u64,
    pub misses: u64,
    pub replacements: u64,
    pub demand_fetches: u64,
    pub fetches_into_cache: u64,
    pub copies_back: u64,
    pub broadcasts: u64,
    pub read_requests: u64,
    pub write_requests: u64,
}

impl CacheStats {
    pub fn miss_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            self.misses as f64 / self.accesses as f64
        }
    }

    pub fn hit_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            1.0 - self.miss_rate()
        }
    }

    fn absorb(&mut self, other: &CacheStats) {
        self.accesses += other.accesses;
        self.misses += other.misses;
        self.replacements += other.replacements;
        self.demand_fetches += other.demand_fetches;
        self.fetches_into_cache += other.fetches_into_cache;
        self.copies_back += other.copies_back;
        self.broadcasts += other.broadcasts;
        self.read_requests += other.read_requests;
        self.write_requests += other.write_requests;
    }
}

/// End-of-run summary over every core.
#[derive(Debug, Clone)]
pub struct Report {
    pub per_core: Vec<CacheStats>,
    pub total: CacheStats,
}

impl Report {
    pub fn new(per_core: &[CacheStats]) -> Self {
        let mut total = CacheStats::default();
        for stats in per_core {
            total.absorb(stats);
        }
        Self {
            per_core: per_core.to_vec(),
            total,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "*** CACHE STATISTICS ***")?;
        for (core, stats) in self.per_core.iter().enumerate() {
            writeln!(f, "  CORE {core}")?;
            writeln!(f, "  accesses:  {}", stats.accesses)?;
            writeln!(f, "  misses:    {}", stats.misses)?;
            writeln!(
                f,
                "  miss rate: {:.6} ({:.6})",
                stats.miss_rate(),
                stats.hit_rate()
            )?;
            writeln!(f, "  replace:   {}", stats.replacements)?;
            writeln!(
                f,
                "  requests:  {} read, {} write",
                stats.read_requests, stats.write_requests
            )?;
        }
        writeln!(f)?;
        writeln!(f, "  TRAFFIC")?;
        writeln!(f, "  demand fetch (words): {}", self.total.demand_fetches)?;
        writeln!(f, "  fetch into cache (words): {}", self.total.fetches_into_cache)?;
        writeln!(f, "  broadcasts:           {}", self.total.broadcasts)?;
        write!(f, "  copies back (words):  {}", self.total.copies_back)
    }
}
