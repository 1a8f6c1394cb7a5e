//! Trace-driven simulator of private per-core caches kept coherent with the
//! MESI snooping protocol.
//!
//! ```
//! use mesi_cache_sim::{AccessKind, CacheConfig, MesiState, Simulator};
//!
//! let mut sim = Simulator::new(CacheConfig { cores: 2, ..CacheConfig::default() })?;
//! sim.perform_access(0x10, AccessKind::DataLoad, 0)?;
//! sim.perform_access(0x10, AccessKind::DataLoad, 1)?;
//! assert_eq!(sim.line_state(0, 0x10), Some(MesiState::Shared));
//! sim.flush()?;
//! # Ok::<(), mesi_cache_sim::SimError>(())
//! ```

pub mod cache;
pub mod error;
pub mod experiments;
pub mod mesi;
pub mod simulator;
pub mod stats;
pub mod trace;

pub use cache::{CacheConfig, CacheParam, Geometry, WORD_SIZE};
pub use error::{ConfigError, ProtocolViolation, SimError};
pub use mesi::MesiState;
pub use simulator::{Outcome, Simulator};
pub use stats::{CacheStats, Report};
pub use trace::{AccessKind, TraceAccess, TraceFile};
