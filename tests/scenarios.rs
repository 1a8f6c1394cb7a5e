//! End-to-end coherence scenarios on a one-set, direct-mapped cache with
//! 16-byte (4-word) blocks.

use mesi_cache_sim::{AccessKind, CacheConfig, MesiState, Outcome, Simulator};

fn tiny(cores: usize) -> Simulator {
    Simulator::new(CacheConfig {
        cores,
        block_size: 16,
        cache_size: 16,
        associativity: 1,
        debug: false,
    })
    .unwrap()
}

/// Core 0 loads, core 1 loads, core 1 stores the same block.
fn shared_then_upgraded() -> Simulator {
    let mut sim = tiny(2);
    sim.perform_access(0x10, AccessKind::DataLoad, 0).unwrap();
    sim.perform_access(0x10, AccessKind::DataLoad, 1).unwrap();
    sim.perform_access(0x10, AccessKind::DataStore, 1).unwrap();
    sim
}

#[test]
fn cold_load_fetches_from_memory() {
    let mut sim = tiny(1);
    assert_eq!(
        sim.perform_access(0x10, AccessKind::DataLoad, 0),
        Ok(Outcome::Miss)
    );
    assert_eq!(sim.line_state(0, 0x10), Some(MesiState::Exclusive));
    let stats = &sim.snapshot_statistics()[0];
    assert_eq!(stats.accesses, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.demand_fetches, 4);
    assert_eq!(stats.fetches_into_cache, 4);
    assert_eq!(stats.broadcasts, 1);
    assert_eq!(stats.read_requests, 1);
}

#[test]
fn store_to_exclusive_line_is_silent() {
    let mut sim = tiny(1);
    sim.perform_access(0x10, AccessKind::DataLoad, 0).unwrap();
    assert_eq!(
        sim.perform_access(0x10, AccessKind::DataStore, 0),
        Ok(Outcome::Hit)
    );
    assert_eq!(sim.line_state(0, 0x10), Some(MesiState::Modified));
    let stats = &sim.snapshot_statistics()[0];
    assert_eq!(stats.accesses, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.broadcasts, 1);
    assert_eq!(stats.write_requests, 1);
}

#[test]
fn second_reader_shares_with_exclusive_owner() {
    let mut sim = tiny(2);
    sim.perform_access(0x10, AccessKind::DataLoad, 0).unwrap();
    assert_eq!(
        sim.perform_access(0x10, AccessKind::DataLoad, 1),
        Ok(Outcome::Miss)
    );
    assert_eq!(sim.line_state(0, 0x10), Some(MesiState::Shared));
    assert_eq!(sim.line_state(1, 0x10), Some(MesiState::Shared));
    let stats = &sim.snapshot_statistics()[1];
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.fetches_into_cache, 4);
    assert_eq!(stats.demand_fetches, 0);
    assert_eq!(stats.broadcasts, 1);
    assert_eq!(sim.snapshot_statistics()[0].copies_back, 0);
}

#[test]
fn store_to_shared_line_invalidates_peers() {
    let sim = shared_then_upgraded();
    assert_eq!(sim.line_state(0, 0x10), Some(MesiState::Invalid));
    assert_eq!(sim.line_state(1, 0x10), Some(MesiState::Modified));
    let stats = &sim.snapshot_statistics()[1];
    assert_eq!(stats.accesses, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.broadcasts, 2);
    assert_eq!(stats.fetches_into_cache, 4);
    assert_eq!(stats.demand_fetches, 0);
}

#[test]
fn evicting_modified_line_copies_back() {
    let mut sim = tiny(1);
    sim.perform_access(0x10, AccessKind::DataLoad, 0).unwrap();
    sim.perform_access(0x10, AccessKind::DataStore, 0).unwrap();
    assert_eq!(
        sim.perform_access(0x20, AccessKind::DataLoad, 0),
        Ok(Outcome::Miss)
    );
    assert_eq!(sim.line_state(0, 0x10), None);
    assert_eq!(sim.line_state(0, 0x20), Some(MesiState::Exclusive));
    let stats = &sim.snapshot_statistics()[0];
    assert_eq!(stats.replacements, 1);
    assert_eq!(stats.copies_back, 4);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.demand_fetches, 8);
}

#[test]
fn invalidated_line_is_reclaimed_in_place() {
    let mut sim = shared_then_upgraded();
    assert_eq!(
        sim.perform_access(0x10, AccessKind::DataLoad, 0),
        Ok(Outcome::HitInvalid)
    );
    assert_eq!(sim.set(0, 0).map(|set| set.len()), Some(1));
    assert_eq!(sim.line_state(0, 0x10), Some(MesiState::Shared));
    assert_eq!(sim.line_state(1, 0x10), Some(MesiState::Shared));

    let core0 = &sim.snapshot_statistics()[0];
    assert_eq!(core0.accesses, 2);
    assert_eq!(core0.misses, 2);
    assert_eq!(core0.replacements, 0);
    assert_eq!(core0.broadcasts, 2);
    assert_eq!(core0.fetches_into_cache, 8);
    assert_eq!(core0.demand_fetches, 4);
    // core 1 supplied its dirty block
    assert_eq!(sim.snapshot_statistics()[1].copies_back, 4);
}

#[test]
fn reclaimed_line_becomes_exclusive_without_holders() {
    let mut sim = shared_then_upgraded();
    // push core 1's modified copy out of its only slot
    sim.perform_access(0x20, AccessKind::DataLoad, 1).unwrap();
    assert_eq!(sim.snapshot_statistics()[1].copies_back, 4);

    assert_eq!(
        sim.perform_access(0x10, AccessKind::DataLoad, 0),
        Ok(Outcome::HitInvalid)
    );
    assert_eq!(sim.line_state(0, 0x10), Some(MesiState::Exclusive));
    assert_eq!(sim.snapshot_statistics()[0].demand_fetches, 8);
}

#[test]
fn write_to_invalidated_line_takes_ownership() {
    let mut sim = shared_then_upgraded();
    assert_eq!(
        sim.perform_access(0x10, AccessKind::DataStore, 0),
        Ok(Outcome::HitInvalid)
    );
    assert_eq!(sim.line_state(0, 0x10), Some(MesiState::Modified));
    assert_eq!(sim.line_state(1, 0x10), Some(MesiState::Invalid));
}

#[test]
fn write_miss_on_modified_peer_fetches_from_bus() {
    let mut sim = tiny(2);
    sim.perform_access(0x10, AccessKind::DataStore, 0).unwrap();
    assert_eq!(
        sim.perform_access(0x10, AccessKind::DataStore, 1),
        Ok(Outcome::Miss)
    );
    assert_eq!(sim.line_state(0, 0x10), Some(MesiState::Invalid));
    assert_eq!(sim.line_state(1, 0x10), Some(MesiState::Modified));
    let core1 = &sim.snapshot_statistics()[1];
    assert_eq!(core1.demand_fetches, 0);
    assert_eq!(core1.fetches_into_cache, 4);
    assert_eq!(core1.broadcasts, 1);
    assert_eq!(sim.snapshot_statistics()[0].copies_back, 0);
}

#[test]
fn instruction_fetches_count_as_reads() {
    let mut sim = tiny(1);
    sim.perform_access(0x10, AccessKind::InstructionLoad, 0).unwrap();
    sim.perform_access(0x10, AccessKind::InstructionLoad, 0).unwrap();
    let stats = &sim.snapshot_statistics()[0];
    assert_eq!(stats.read_requests, 2);
    assert_eq!(stats.write_requests, 0);
    assert_eq!(stats.misses, 1);
}

#[test]
fn flush_writes_back_remaining_dirty_lines() {
    let mut sim = shared_then_upgraded();
    sim.flush().unwrap();
    assert_eq!(sim.snapshot_statistics()[1].copies_back, 4);
    assert_eq!(sim.snapshot_statistics()[0].copies_back, 0);
    // the run is over but the state is left as it was
    assert_eq!(sim.line_state(1, 0x10), Some(MesiState::Modified));
}

#[test]
fn supports_more_than_eight_cores() {
    let mut sim = tiny(12);
    for core in 0..12 {
        sim.perform_access(0x10, AccessKind::DataLoad, core).unwrap();
    }
    let broadcasts = sim.snapshot_statistics()[11].broadcasts;
    sim.perform_access(0x10, AccessKind::DataStore, 11).unwrap();
    // one bus transaction no matter how many peers it invalidates
    assert_eq!(sim.snapshot_statistics()[11].broadcasts, broadcasts + 1);
    for core in 0..11 {
        assert_eq!(sim.line_state(core, 0x10), Some(MesiState::Invalid));
    }
    assert_eq!(sim.line_state(11, 0x10), Some(MesiState::Modified));
}
