//! MESI transition tables.
//!
//! Both tables are total over the pairs they define and return `None` for
//! every other `(state, event)` pair. The engine turns `None` into a
//! [`ProtocolViolation`](crate::error::ProtocolViolation).

use std::fmt;

/// Coherence state of one cache line.
///
/// Which states two caches may hold for the same block at once:
///
/// <pre>
///   M E S I
/// M ✗ ✗ ✗ ✓
/// E ✗ ✗ ✗ ✓
/// S ✗ ✗ ✓ ✓
/// I ✓ ✓ ✓ ✓
/// </pre>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MesiState {
    #[default]
    Invalid,
    Exclusive,
    Shared,
    Modified,
}

impl MesiState {
    pub fn is_valid(self) -> bool {
        self != MesiState::Invalid
    }

    pub fn symbol(self) -> char {
        match self {
            MesiState::Invalid => 'I',
            MesiState::Exclusive => 'E',
            MesiState::Shared => 'S',
            MesiState::Modified => 'M',
        }
    }

    /// Transition caused by the owning core's own access.
    ///
    /// Miss events apply to a freshly allocated or resurrected line, so they
    /// are accepted from any state.
    pub fn on_local(self, event: LocalEvent) -> Option<MesiState> {
        use LocalEvent::*;
        use MesiState::*;
        match (self, event) {
            (Invalid, ReadHit | WriteHit) => None,
            (state, ReadHit) => Some(state),
            (_, ReadMissFromBus) => Some(Shared),
            (_, ReadMissFromMemory) => Some(Exclusive),
            (Exclusive | Shared | Modified, WriteHit) => Some(Modified),
            (_, WriteMissFromBus | WriteMissFromMemory) => Some(Modified),
        }
    }

    /// Transition caused by another core's broadcast matching this line.
    pub fn on_remote(self, event: RemoteEvent) -> Option<RemoteOutcome> {
        use MesiState::*;
        use RemoteEvent::*;
        let (next, copy_back) = match (self, event) {
            (Invalid, _) => return None,
            (Exclusive | Shared, RemoteReadMiss) => (Shared, false),
            // dirty data goes to the reader and to memory
            (Modified, RemoteReadMiss) => (Shared, true),
            (Shared, RemoteWriteHit) => (Invalid, false),
            (Exclusive | Modified, RemoteWriteHit) => return None,
            (Exclusive | Shared | Modified, RemoteWriteMiss) => (Invalid, false),
        };
        Some(RemoteOutcome { next, copy_back })
    }
}

impl fmt::Display for MesiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MesiState::Invalid => "Invalid",
            MesiState::Exclusive => "Exclusive",
            MesiState::Shared => "Shared",
            MesiState::Modified => "Modified",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalEvent {
    ReadHit,
    ReadMissFromBus,
    ReadMissFromMemory,
    WriteHit,
    WriteMissFromBus,
    WriteMissFromMemory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteEvent {
    RemoteReadMiss,
    RemoteWriteHit,
    RemoteWriteMiss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteOutcome {
    pub next: MesiState,
    /// The holder was Modified and had to supply its block.
    pub copy_back: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Local(LocalEvent),
    Remote(RemoteEvent),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Local(event) => write!(f, "{event:?}"),
            Event::Remote(event) => write!(f, "{event:?}"),
        }
    }
}

impl From<LocalEvent> for Event {
    fn from(event: LocalEvent) -> Self {
        Event::Local(event)
    }
}

impl From<RemoteEvent> for Event {
    fn from(event: RemoteEvent) -> Self {
        Event::Remote(event)
    }
}
