use std::collections::VecDeque;
use std::fmt;

use crate::error::ConfigError;
use crate::mesi::MesiState;

/// Bytes per word; traffic counters are kept in words.
pub const WORD_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheParam {
    Cores,
    BlockSize,
    CacheSize,
    Associativity,
    Debug,
}

impl CacheParam {
    /// Numeric parameter codes used by the classic simulator drivers.
    pub fn from_code(code: u32) -> Result<Self, ConfigError> {
        match code {
            0 => Ok(CacheParam::Cores),
            1 => Ok(CacheParam::BlockSize),
            2 => Ok(CacheParam::CacheSize),
            3 => Ok(CacheParam::Associativity),
            4 => Ok(CacheParam::Debug),
            other => Err(ConfigError::UnknownParameter(other)),
        }
    }
}

impl fmt::Display for CacheParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheParam::Cores => "core count",
            CacheParam::BlockSize => "block size",
            CacheParam::CacheSize => "cache size",
            CacheParam::Associativity => "associativity",
            CacheParam::Debug => "debug",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub cores: usize,
    pub block_size: usize,    // in Bytes
    pub cache_size: usize,    // in Bytes, per core
    pub associativity: usize, // set to 1 for Direct-Mapped
    pub debug: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cores: 1,
            block_size: 16,
            cache_size: 8 * 1024,
            associativity: 1,
            debug: false,
        }
    }
}

impl CacheConfig {
    pub fn set(&mut self, param: CacheParam, value: usize) {
        match param {
            CacheParam::Cores => self.cores = value,
            CacheParam::BlockSize => self.block_size = value,
            CacheParam::CacheSize => self.cache_size = value,
            CacheParam::Associativity => self.associativity = value,
            CacheParam::Debug => self.debug = value != 0,
        }
    }

    /// Sets a parameter by its numeric code.
    pub fn set_code(&mut self, code: u32, value: usize) -> Result<(), ConfigError> {
        self.set(CacheParam::from_code(code)?, value);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Geometry::new(self).map(|_| ())
    }
}

impl fmt::Display for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cache Settings:")?;
        writeln!(f, "\tCores: \t{}", self.cores)?;
        writeln!(f, "\tSize: \t{}", self.cache_size)?;
        writeln!(f, "\tAssociativity: \t{}", self.associativity)?;
        write!(f, "\tBlock size: \t{}", self.block_size)
    }
}

/// Decoded position of an address in a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetTag {
    pub index: usize,
    pub tag: u64,
}

/// Geometry shared by every core's cache, derived once from the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    pub block_size: usize,
    pub associativity: usize,
    pub num_sets: usize,
    pub index_mask: u64,
    /// Number of block offset bits below the index.
    pub index_mask_offset: u32,
    index_bits: u32,
}

impl Geometry {
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigError> {
        for (param, value) in [
            (CacheParam::Cores, config.cores),
            (CacheParam::BlockSize, config.block_size),
            (CacheParam::CacheSize, config.cache_size),
            (CacheParam::Associativity, config.associativity),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { param });
            }
        }
        if !config.block_size.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                param: CacheParam::BlockSize,
                value: config.block_size,
            });
        }
        if config.block_size % WORD_SIZE != 0 {
            return Err(ConfigError::PartialWord {
                block_size: config.block_size,
                word_size: WORD_SIZE,
            });
        }
        let indivisible = ConfigError::Indivisible {
            cache_size: config.cache_size,
            block_size: config.block_size,
            associativity: config.associativity,
        };
        let set_bytes = match config.block_size.checked_mul(config.associativity) {
            Some(bytes) if config.cache_size % bytes == 0 => bytes,
            _ => return Err(indivisible),
        };
        let num_sets = config.cache_size / set_bytes;
        if !num_sets.is_power_of_two() {
            return Err(ConfigError::SetCount { sets: num_sets });
        }

        let index_mask_offset = config.block_size.trailing_zeros();
        let index_bits = num_sets.trailing_zeros();
        let mask_width = index_mask_offset + index_bits;
        let index_mask = if mask_width == 0 {
            0
        } else {
            u64::MAX >> (u64::BITS - mask_width)
        };
        Ok(Self {
            block_size: config.block_size,
            associativity: config.associativity,
            num_sets,
            index_mask,
            index_mask_offset,
            index_bits,
        })
    }

    pub fn decode(&self, address: u64) -> SetTag {
        let index = ((address & self.index_mask) >> self.index_mask_offset) as usize;
        let tag = address
            .checked_shr(self.index_mask_offset + self.index_bits)
            .unwrap_or(0);
        SetTag { index, tag }
    }

    pub fn words_per_block(&self) -> u64 {
        (self.block_size / WORD_SIZE) as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLine {
    pub tag: u64,
    pub state: MesiState,
}

impl CacheLine {
    /// A freshly allocated line whose state is set by the coherence step.
    pub fn allocate(tag: u64) -> Self {
        Self {
            tag,
            state: MesiState::Invalid,
        }
    }
}

/// Result of searching a set. Hits carry the slot position in recency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Miss,
    HitValid(usize),
    HitInvalid(usize),
}

/// One set's lines, most recently used first.
///
/// Invalidated lines keep their slot until they age out of the tail.
#[derive(Debug, Clone)]
pub struct CacheSet {
    lines: VecDeque<CacheLine>,
    ways: usize,
}

impl CacheSet {
    pub fn new(ways: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(ways),
            ways,
        }
    }

    pub fn lookup(&self, tag: u64) -> Lookup {
        match self.lines.iter().position(|line| line.tag == tag) {
            None => Lookup::Miss,
            Some(pos) if self.lines[pos].state.is_valid() => Lookup::HitValid(pos),
            Some(pos) => Lookup::HitInvalid(pos),
        }
    }

    /// Moves the line at `pos` to the MRU slot.
    pub fn touch(&mut self, pos: usize) {
        if pos == 0 {
            return;
        }
        if let Some(line) = self.lines.remove(pos) {
            self.lines.push_front(line);
        }
    }

    /// Installs `line` as MRU, evicting the LRU tail when the set is full.
    ///
    /// The tail goes regardless of its state.
    pub fn insert_or_evict(&mut self, line: CacheLine) -> Option<CacheLine> {
        let evicted = if self.lines.len() >= self.ways {
            self.lines.pop_back()
        } else {
            None
        };
        self.lines.push_front(line);
        evicted
    }

    pub fn get(&self, pos: usize) -> Option<&CacheLine> {
        self.lines.get(pos)
    }

    pub fn get_mut(&mut self, pos: usize) -> Option<&mut CacheLine> {
        self.lines.get_mut(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CacheLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for CacheSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (idx, line) in self.lines.iter().enumerate() {
            if idx > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:#x}:{}", line.tag, line.state.symbol())?;
        }
        write!(f, "]")
    }
}

/// Private cache of one core.
#[derive(Debug, Clone)]
pub struct CoreCache {
    pub id: usize,
    pub sets: Vec<CacheSet>,
}

impl CoreCache {
    pub fn new(id: usize, geometry: &Geometry) -> Self {
        let sets = (0..geometry.num_sets)
            .map(|_| CacheSet::new(geometry.associativity))
            .collect();
        Self { id, sets }
    }

    pub fn lines(&self) -> impl Iterator<Item = &CacheLine> {
        self.sets.iter().flat_map(CacheSet::iter)
    }
}
