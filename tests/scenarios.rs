//! End-to-end dispatch scenarios exercised against the public crate API
//! rather than against any single module's internals.

use std::collections::HashMap;

use lsu_sim::{
    InstructionInfo, Lsu, LsuConfig, MemAccess, MetadataRegistry, MetadataToken, ProcessorModel,
};

struct FixedSizeModel;

impl ProcessorModel for FixedSizeModel {
    fn default_lq_size(&self) -> u32 {
        4
    }
    fn default_sq_size(&self) -> u32 {
        4
    }
}

#[derive(Default)]
struct Registry(HashMap<u32, MemAccess>);

impl Registry {
    fn with(mut self, token: u32, access: MemAccess) -> Self {
        self.0.insert(token, access);
        self
    }
}

impl MetadataRegistry for Registry {
    fn memory_access(&self, token: MetadataToken) -> Option<MemAccess> {
        self.0.get(&token.index()).cloned()
    }
}

/// A memory instruction, built incrementally using `L@addr/size`,
/// `S@addr/size`, and barrier shorthand in the scenario doc comments below.
struct Instr {
    may_load: bool,
    may_store: bool,
    is_load_barrier: bool,
    is_store_barrier: bool,
    token: Option<MetadataToken>,
}

impl Instr {
    fn load(token: MetadataToken) -> Self {
        Instr { may_load: true, may_store: false, is_load_barrier: false, is_store_barrier: false, token: Some(token) }
    }
    fn store(token: MetadataToken) -> Self {
        Instr { may_load: false, may_store: true, is_load_barrier: false, is_store_barrier: false, token: Some(token) }
    }
    fn store_barrier() -> Self {
        Instr { may_load: false, may_store: true, is_load_barrier: false, is_store_barrier: true, token: None }
    }
}

impl InstructionInfo for Instr {
    fn may_load(&self) -> bool {
        self.may_load
    }
    fn may_store(&self) -> bool {
        self.may_store
    }
    fn is_load_barrier(&self) -> bool {
        self.is_load_barrier
    }
    fn is_store_barrier(&self) -> bool {
        self.is_store_barrier
    }
    fn metadata_token(&self) -> Option<MetadataToken> {
        self.token
    }
}

fn lsu_with(registry: Registry) -> Lsu {
    Lsu::new(
        LsuConfig { lq_size: 4, sq_size: 4, assume_no_alias: false },
        &FixedSizeModel,
        Some(Box::new(registry)),
    )
}

fn token(n: u32) -> MetadataToken {
    MetadataToken::new(n)
}

/// Scenario 1: `L@0/8, L@16/8` — both loads join the same group, since
/// neither a barrier nor a store intervenes and the group hasn't started
/// issuing yet.
#[test]
fn scenario_1_consecutive_loads_share_a_group() {
    let registry = Registry::default()
        .with(1, MemAccess::new(false, 0, 8))
        .with(2, MemAccess::new(false, 16, 8));
    let mut lsu = lsu_with(registry);

    let g1 = lsu.dispatch(&Instr::load(token(1)));
    let g2 = lsu.dispatch(&Instr::load(token(2)));

    assert_eq!(g1, g2);
    assert_eq!(lsu.base().lq_occupancy(), (2, 4));
    assert_eq!(lsu.base().sq_occupancy(), (0, 4));
}

/// Scenario 2: `L@0/8, S@64/4` — the store gets a new group with the load's
/// group as a predecessor; since the ranges are disjoint the edge is
/// ordering-only.
#[test]
fn scenario_2_disjoint_store_after_load() {
    let registry = Registry::default()
        .with(1, MemAccess::new(false, 0, 8))
        .with(2, MemAccess::new(true, 64, 4));
    let mut lsu = lsu_with(registry);

    let g1 = lsu.dispatch(&Instr::load(token(1)));
    let g2 = lsu.dispatch(&Instr::store(token(2)));

    assert_ne!(g1, g2);
    let edge = lsu
        .base()
        .get_group(g1)
        .successors()
        .iter()
        .find(|e| e.id == g2)
        .expect("store depends on the load structurally");
    assert!(!edge.is_data_dependency);
    assert_eq!(lsu.base().lq_occupancy(), (1, 4));
    assert_eq!(lsu.base().sq_occupancy(), (1, 4));
}

/// Scenario 3: `S@0/8, L@0/8` (overlapping) — the load gets a new group with
/// the store's group as a predecessor, and the edge is a true data
/// dependency because the ranges overlap.
#[test]
fn scenario_3_overlapping_load_after_store() {
    let registry = Registry::default()
        .with(1, MemAccess::new(true, 0, 8))
        .with(2, MemAccess::new(false, 0, 8));
    let mut lsu = lsu_with(registry);

    let g1 = lsu.dispatch(&Instr::store(token(1)));
    let g2 = lsu.dispatch(&Instr::load(token(2)));

    assert_ne!(g1, g2);
    let edge = lsu
        .base()
        .get_group(g1)
        .successors()
        .iter()
        .find(|e| e.id == g2)
        .expect("load depends on the overlapping store");
    assert!(edge.is_data_dependency);
}

/// Scenario 4: `L@0/8, SB, L@8/8` — the second load starts a new group
/// because a store barrier intervened (it is now the current store, and
/// `dom <= current_store`); the edge from the barrier's group is structural.
#[test]
fn scenario_4_store_barrier_splits_loads() {
    let mut lsu = lsu_with(Registry::default());
    let plain_load = || Instr { may_load: true, may_store: false, is_load_barrier: false, is_store_barrier: false, token: None };

    let g1 = lsu.dispatch(&plain_load());
    let barrier = lsu.dispatch(&Instr::store_barrier());
    let g2 = lsu.dispatch(&plain_load());

    assert_ne!(g1, g2);
    let edge = lsu
        .base()
        .get_group(barrier)
        .successors()
        .iter()
        .find(|e| e.id == g2);
    // The barrier dominates via `current_store`, not `current_load`, so the
    // edge here comes from Case B's `current_store` clause, which only
    // fires when aliasing can't be ruled out; with no MA on either side the
    // policy assumes aliasing is possible (no `assume_no_alias`), so the
    // edge exists and is a true data dependency.
    let edge = edge.expect("store barrier dominates the next load");
    assert!(edge.is_data_dependency);
}

/// Scenario 5 + 6: `L@0/8, L@8/8, S@32/4, L@64/8`, then retire all four in
/// dispatch order. The first two loads share a group; the store is its own
/// group with the loads' group as predecessor; the final load starts a
/// fresh group because a store is younger than every live load. After all
/// four retire, both queues are empty and every group has been removed.
#[test]
fn scenario_5_and_6_mixed_sequence_then_full_retirement() {
    let registry = Registry::default()
        .with(1, MemAccess::new(false, 0, 8))
        .with(2, MemAccess::new(false, 8, 8))
        .with(3, MemAccess::new(true, 32, 4))
        .with(4, MemAccess::new(false, 64, 8));
    let mut lsu = lsu_with(registry);

    let i1 = Instr::load(token(1));
    let i2 = Instr::load(token(2));
    let i3 = Instr::store(token(3));
    let i4 = Instr::load(token(4));

    let g1 = lsu.dispatch(&i1);
    let g2 = lsu.dispatch(&i2);
    assert_eq!(g1, g2, "first two loads share a group");

    let g3 = lsu.dispatch(&i3);
    assert_ne!(g3, g1);
    assert_eq!(lsu.base().get_group(g3).num_predecessors(), 1);

    let g4 = lsu.dispatch(&i4);
    assert_ne!(g4, g1);
    assert_ne!(g4, g3, "loads and stores never share a group");

    assert_eq!(lsu.base().lq_occupancy(), (3, 4));
    assert_eq!(lsu.base().sq_occupancy(), (1, 4));

    // Execute every group fully (two instructions in g1, one in g3, one in
    // g4) before retiring.
    lsu.on_instruction_executed(g1);
    lsu.on_instruction_executed(g1);
    lsu.on_instruction_executed(g3);
    lsu.on_instruction_executed(g4);

    for instr in [&i1, &i2, &i3, &i4] {
        lsu.on_instruction_retired(instr);
    }

    let (used_lq, _) = lsu.base().lq_occupancy();
    let (used_sq, _) = lsu.base().sq_occupancy();
    assert_eq!(used_lq, 0);
    assert_eq!(used_sq, 0);
    assert!(!lsu.base().is_live(g1));
    assert!(!lsu.base().is_live(g3));
    assert!(!lsu.base().is_live(g4));
}

/// Availability reports queue-full conditions before dispatch is attempted.
#[test]
fn availability_reports_full_queues_before_dispatch() {
    let mut lsu = Lsu::new(
        LsuConfig { lq_size: 1, sq_size: 1, assume_no_alias: true },
        &FixedSizeModel,
        None,
    );
    let one_load = Instr { may_load: true, may_store: false, is_load_barrier: false, is_store_barrier: false, token: None };
    assert!(lsu.is_available(&one_load).is_available());
    let _g = lsu.dispatch(&one_load);

    let second_load = Instr { may_load: true, may_store: false, is_load_barrier: false, is_store_barrier: false, token: None };
    assert!(!lsu.is_available(&second_load).is_available());
}
