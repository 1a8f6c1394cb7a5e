//! Per-access coherence engine.
//!
//! Every core owns a private [`CoreCache`]. An access on one core looks up
//! its own set, and on a miss (or a write to a Shared line) broadcasts the
//! request to every other core's copy of the same set before settling its
//! own line's MESI state. Accesses run to completion one at a time, so the
//! snoop side effects of one access are always visible to the next.

use log::{debug, info, trace};

use crate::cache::{CacheConfig, CacheLine, CacheSet, CoreCache, Geometry, Lookup, SetTag};
use crate::error::{ProtocolViolation, SimError};
use crate::mesi::{LocalEvent, MesiState, RemoteEvent};
use crate::stats::{CacheStats, Report};
use crate::trace::{AccessKind, Request};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Miss,
    /// The tag was still resident but had been invalidated by a peer.
    HitInvalid,
}

#[derive(Debug)]
pub struct Simulator {
    config: CacheConfig,
    geometry: Geometry,
    caches: Vec<CoreCache>,
    stats: Vec<CacheStats>,
    halted: bool,
}

impl Simulator {
    pub fn new(config: CacheConfig) -> Result<Self, SimError> {
        let geometry = Geometry::new(&config)?;
        let caches = (0..config.cores)
            .map(|id| CoreCache::new(id, &geometry))
            .collect();
        let stats = vec![CacheStats::default(); config.cores];
        info!(
            "{} cores, {} sets x {} ways of {}-byte blocks",
            config.cores, geometry.num_sets, geometry.associativity, geometry.block_size
        );
        Ok(Self {
            config,
            geometry,
            caches,
            stats,
            halted: false,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn cores(&self) -> usize {
        self.caches.len()
    }

    pub fn perform_access(
        &mut self,
        address: u64,
        kind: AccessKind,
        core: usize,
    ) -> Result<Outcome, SimError> {
        if self.halted {
            return Err(SimError::Halted);
        }
        if core >= self.caches.len() {
            return Err(SimError::CoreOutOfRange {
                core,
                cores: self.caches.len(),
            });
        }
        let SetTag { index, tag } = self.geometry.decode(address);
        let request = kind.request();
        let outcome = match self.access(request, index, tag, core) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.halted = true;
                return Err(err.into());
            }
        };
        debug!("core {core} {request} {address:#x} (set {index}, tag {tag:#x}): {outcome:?}");
        if self.config.debug {
            debug!("core {core} set {index}: {}", self.caches[core].sets[index]);
            debug!("core {core} stats: {:?}", self.stats[core]);
        }
        Ok(outcome)
    }

    fn access(
        &mut self,
        request: Request,
        index: usize,
        tag: u64,
        core: usize,
    ) -> Result<Outcome, ProtocolViolation> {
        let stats = &mut self.stats[core];
        match request {
            Request::Read => stats.read_requests += 1,
            Request::Write => stats.write_requests += 1,
        }
        stats.accesses += 1;

        match self.caches[core].sets[index].lookup(tag) {
            Lookup::Miss => {
                self.stats[core].misses += 1;
                let mut line = CacheLine::allocate(tag);
                line.state =
                    self.broadcast_and_set_state(request, index, tag, core, line.state, false)?;
                if let Some(victim) = self.caches[core].sets[index].insert_or_evict(line) {
                    let stats = &mut self.stats[core];
                    stats.replacements += 1;
                    if victim.state == MesiState::Modified {
                        stats.copies_back += self.geometry.words_per_block();
                    }
                    trace!("core {core} set {index}: evicted {victim:?}");
                }
                Ok(Outcome::Miss)
            }
            Lookup::HitInvalid(pos) => {
                self.stats[core].misses += 1;
                let next = self.broadcast_and_set_state(
                    request,
                    index,
                    tag,
                    core,
                    MesiState::Invalid,
                    false,
                )?;
                let set = &mut self.caches[core].sets[index];
                if let Some(line) = set.get_mut(pos) {
                    line.state = next;
                }
                set.touch(pos);
                Ok(Outcome::HitInvalid)
            }
            Lookup::HitValid(pos) => {
                let set = &mut self.caches[core].sets[index];
                let current = set.get(pos).map_or(MesiState::Invalid, |line| line.state);
                set.touch(pos);
                let next = match (request, current) {
                    (Request::Write, MesiState::Shared) => {
                        self.broadcast_and_set_state(request, index, tag, core, current, true)?
                    }
                    (Request::Write, _) => {
                        local_transition(core, tag, current, LocalEvent::WriteHit)?
                    }
                    (Request::Read, _) => {
                        local_transition(core, tag, current, LocalEvent::ReadHit)?
                    }
                };
                if let Some(line) = self.caches[core].sets[index].get_mut(0) {
                    line.state = next;
                }
                Ok(Outcome::Hit)
            }
        }
    }

    /// Snoops the other cores for the request and returns the state the
    /// initiator's line takes, charging fetch traffic to `core`.
    fn broadcast_and_set_state(
        &mut self,
        request: Request,
        index: usize,
        tag: u64,
        core: usize,
        state: MesiState,
        is_hit: bool,
    ) -> Result<MesiState, ProtocolViolation> {
        let words = self.geometry.words_per_block();
        match (request, is_hit) {
            // read hits never reach the bus
            (Request::Read, true) => Err(ProtocolViolation {
                core,
                tag,
                state,
                event: LocalEvent::ReadHit.into(),
            }),
            (Request::Read, false) => {
                let event = if self.broadcast(index, tag, RemoteEvent::RemoteReadMiss, core)? {
                    self.stats[core].fetches_into_cache += words;
                    LocalEvent::ReadMissFromBus
                } else {
                    self.stats[core].demand_fetches += words;
                    self.stats[core].fetches_into_cache += words;
                    LocalEvent::ReadMissFromMemory
                };
                local_transition(core, tag, state, event)
            }
            (Request::Write, true) => {
                self.broadcast(index, tag, RemoteEvent::RemoteWriteHit, core)?;
                local_transition(core, tag, state, LocalEvent::WriteHit)
            }
            (Request::Write, false) => {
                let event = if self.broadcast(index, tag, RemoteEvent::RemoteWriteMiss, core)? {
                    self.stats[core].fetches_into_cache += words;
                    LocalEvent::WriteMissFromBus
                } else {
                    self.stats[core].demand_fetches += words;
                    self.stats[core].fetches_into_cache += words;
                    LocalEvent::WriteMissFromMemory
                };
                local_transition(core, tag, state, event)
            }
        }
    }

    /// Applies `event` to every other core holding a valid copy of `tag` in
    /// set `index`. Returns whether any such holder exists.
    fn broadcast(
        &mut self,
        index: usize,
        tag: u64,
        event: RemoteEvent,
        initiator: usize,
    ) -> Result<bool, ProtocolViolation> {
        self.stats[initiator].broadcasts += 1;
        let words = self.geometry.words_per_block();
        let mut found = false;
        for cache in self.caches.iter_mut().filter(|cache| cache.id != initiator) {
            let set = &mut cache.sets[index];
            let Lookup::HitValid(pos) = set.lookup(tag) else {
                continue;
            };
            let Some(line) = set.get_mut(pos) else {
                continue;
            };
            let outcome = line.state.on_remote(event).ok_or(ProtocolViolation {
                core: cache.id,
                tag,
                state: line.state,
                event: event.into(),
            })?;
            trace!(
                "core {} tag {tag:#x}: {} -> {} on {event:?} from core {initiator}",
                cache.id, line.state, outcome.next
            );
            line.state = outcome.next;
            if outcome.copy_back {
                self.stats[cache.id].copies_back += words;
            }
            found = true;
        }
        Ok(found)
    }

    /// Charges a write-back for every line still Modified. Ends the run.
    pub fn flush(&mut self) -> Result<(), SimError> {
        if self.halted {
            return Err(SimError::Halted);
        }
        let words = self.geometry.words_per_block();
        for (cache, stats) in self.caches.iter().zip(self.stats.iter_mut()) {
            let dirty = cache
                .lines()
                .filter(|line| line.state == MesiState::Modified)
                .count() as u64;
            stats.copies_back += dirty * words;
            debug!("core {}: flushed {dirty} modified lines", cache.id);
        }
        self.halted = true;
        Ok(())
    }

    pub fn snapshot_statistics(&self) -> &[CacheStats] {
        &self.stats
    }

    pub fn report(&self) -> Report {
        Report::new(&self.stats)
    }

    /// State of the line holding `address` in `core`'s cache, if resident.
    pub fn line_state(&self, core: usize, address: u64) -> Option<MesiState> {
        let SetTag { index, tag } = self.geometry.decode(address);
        let set = self.set(core, index)?;
        match set.lookup(tag) {
            Lookup::Miss => None,
            Lookup::HitValid(pos) | Lookup::HitInvalid(pos) => set.get(pos).map(|line| line.state),
        }
    }

    pub fn set(&self, core: usize, index: usize) -> Option<&CacheSet> {
        self.caches.get(core)?.sets.get(index)
    }
}

fn local_transition(
    core: usize,
    tag: u64,
    state: MesiState,
    event: LocalEvent,
) -> Result<MesiState, ProtocolViolation> {
    let next = state.on_local(event).ok_or(ProtocolViolation {
        core,
        tag,
        state,
        event: event.into(),
    })?;
    trace!("core {core} tag {tag:#x}: {state} -> {next} on {event:?}");
    Ok(next)
}
