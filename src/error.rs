use thiserror::Error;

use crate::cache::CacheParam;
use crate::mesi::{Event, MesiState};

/// Rejected configuration. Raised before any simulation state exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown cache parameter code {0}")]
    UnknownParameter(u32),
    #[error("{param} must be positive")]
    Zero { param: CacheParam },
    #[error("{param} must be a power of two, got {value}")]
    NotPowerOfTwo { param: CacheParam, value: usize },
    #[error("set count {sets} must be a power of two")]
    SetCount { sets: usize },
    #[error("block size {block_size} must be a multiple of the {word_size}-byte word")]
    PartialWord { block_size: usize, word_size: usize },
    #[error(
        "cache size {cache_size} is not divisible by block size {block_size} x associativity {associativity}"
    )]
    Indivisible {
        cache_size: usize,
        block_size: usize,
        associativity: usize,
    },
}

/// A coherence transition was requested that the protocol does not define.
///
/// This always points at a defect in the engine, never at bad input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("protocol violation on core {core}, tag {tag:#x}: {event} in state {state}")]
pub struct ProtocolViolation {
    pub core: usize,
    pub tag: u64,
    pub state: MesiState,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),
    #[error("core {core} out of range, simulator has {cores} cores")]
    CoreOutOfRange { core: usize, cores: usize },
    /// The run was flushed or stopped by a protocol violation.
    #[error("simulation has halted")]
    Halted,
}

impl SimError {
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, SimError::Protocol(_))
    }
}
