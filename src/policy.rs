//! The dispatch decision procedure: given a memory instruction, decide
//! whether to start a new memory group or extend the current load group, and
//! wire the correct dependency edges to older groups.
//!
//! `Lsu` is `LsuBase` plus the four "current" pointers the policy needs to
//! remember between calls. The split matches `cranelift-codegen`'s own
//! separation of `regalloc::Context` (persistent bookkeeping) from the pass
//! logic that drives it: `base::LsuBase` never refers to "current load" or
//! "current store" at all, those concepts belong entirely to the policy that
//! drives the base.

use crate::base::{LsuBase, LsuDump};
use crate::config::LsuConfig;
use crate::error::{fault, LsuFault};
use crate::group::GroupId;
use crate::mem_access::MemAccess;
use crate::metadata::{InstructionInfo, MetadataRegistry, ProcessorModel};
use crate::queue::Availability;

/// The load/store unit: queue accounting plus the memory-group dependency
/// DAG, and the policy that builds it one dispatch at a time.
pub struct Lsu {
    base: LsuBase,
    current_load: Option<GroupId>,
    current_store: Option<GroupId>,
    current_load_barrier: Option<GroupId>,
    current_store_barrier: Option<GroupId>,
}

/// Whichever of `a`/`b` is live and has the larger (i.e. more recently
/// allocated) group id: the load-side dominator that a new store or load
/// must respect. Group ids are allocated in dispatch order, so "max id" and
/// "most recently dispatched" coincide.
fn youngest(a: Option<GroupId>, b: Option<GroupId>) -> Option<GroupId> {
    match (a, b) {
        (None, None) => None,
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (Some(x), Some(y)) => Some(if x.index() >= y.index() { x } else { y }),
    }
}

/// `a`'s group is no younger than `b`'s — i.e. `b` was dispatched at the same
/// time as or before `a`. Used for the "a store is younger than every live
/// load" check in Case B.
fn is_at_most(a: GroupId, b: Option<GroupId>) -> bool {
    match b {
        Some(b) => a.index() <= b.index(),
        None => false,
    }
}

impl Lsu {
    /// Constructs an LSU. `metadata` is consulted read-only on every dispatch
    /// that carries a token; `model`'s queue-size defaults are consulted only
    /// for zero-valued overrides in `config`.
    pub fn new(
        config: LsuConfig,
        model: &dyn ProcessorModel,
        metadata: Option<Box<dyn MetadataRegistry>>,
    ) -> Self {
        Lsu {
            base: LsuBase::new(config, model, metadata),
            current_load: None,
            current_store: None,
            current_load_barrier: None,
            current_store_barrier: None,
        }
    }

    /// Direct access to the bookkeeping base, for callers that only need
    /// queue occupancy or a group lookup and not the dispatch policy.
    pub fn base(&self) -> &LsuBase {
        &self.base
    }

    /// The scheduler must call this (or otherwise know it would return
    /// `Available`) before calling `dispatch`.
    pub fn is_available<I: InstructionInfo>(&self, instr: &I) -> Availability {
        self.base.is_available(instr)
    }

    /// Advances every live group's internal counters by one simulated cycle.
    pub fn cycle_event(&mut self) {
        self.base.cycle_event();
    }

    /// Dispatches one memory instruction: allocates queue slots, creates or
    /// extends a memory group, wires dependency edges to older groups, and
    /// advances the four current pointers. Returns the group id the
    /// scheduler should stamp back onto the instruction.
    ///
    /// Fatal if `instr` may neither load nor store.
    pub fn dispatch<I: InstructionInfo>(&mut self, instr: &I) -> GroupId {
        let ma = self.base.memory_access_md(instr);
        let is_store = self.base.is_store_instruction(instr);

        if !instr.may_load() && !is_store {
            fault(LsuFault::NotAMemoryInstruction);
        }

        if instr.may_load() {
            self.base.acquire_lq_slot();
        }
        if is_store {
            self.base.acquire_sq_slot();
        }

        if is_store {
            self.dispatch_store(instr, ma)
        } else {
            self.dispatch_load(instr, ma)
        }
    }

    /// Case A: the instruction is a store. Always creates a new group.
    fn dispatch_store<I: InstructionInfo>(&mut self, instr: &I, ma: Option<MemAccess>) -> GroupId {
        let n = self.base.create_memory_group();
        self.base.get_group_mut(n).add_instruction();
        self.base.get_group_mut(n).add_mem_access(ma.clone());

        // A store cannot pass a prior load or load barrier.
        let dom = youngest(self.current_load, self.current_load_barrier);
        if let Some(dom) = dom {
            let is_data_dep = !self.base.no_alias(dom, ma.as_ref());
            self.base.add_edge(dom, n, is_data_dep);
        }

        if let Some(store_barrier) = self.current_store_barrier {
            self.base.add_edge(store_barrier, n, true);
        }

        if let Some(store) = self.current_store {
            if Some(store) != self.current_store_barrier {
                let is_data_dep = !self.base.no_alias(store, ma.as_ref());
                self.base.add_edge(store, n, is_data_dep);
            }
        }

        self.current_store = Some(n);
        if instr.is_store_barrier() {
            self.current_store_barrier = Some(n);
        }
        if instr.may_load() {
            self.current_load = Some(n);
            if instr.is_load_barrier() {
                self.current_load_barrier = Some(n);
            }
        }

        #[cfg(feature = "debug-trace")]
        log::trace!("dispatch: store -> new group {n}");
        n
    }

    /// Case B: the instruction is a pure load.
    fn dispatch_load<I: InstructionInfo>(&mut self, instr: &I, ma: Option<MemAccess>) -> GroupId {
        let dom = youngest(self.current_load, self.current_load_barrier);

        let needs_new_group = instr.is_load_barrier()
            || dom.is_none()
            || (self.current_load_barrier.is_some() && self.current_load_barrier == dom)
            || dom.is_some_and(|d| is_at_most(d, self.current_store))
            || dom.is_some_and(|d| self.base.get_group(d).is_executing());

        if needs_new_group {
            let n = self.base.create_memory_group();
            self.base.get_group_mut(n).add_instruction();
            self.base.get_group_mut(n).add_mem_access(ma.clone());

            if let Some(store) = self.current_store {
                if !self.base.no_alias(store, ma.as_ref()) {
                    self.base.add_edge(store, n, true);
                }
            }

            if instr.is_load_barrier() {
                if let Some(dom) = dom {
                    self.base.add_edge(dom, n, true);
                }
            } else if let Some(load_barrier) = self.current_load_barrier {
                // Younger loads cannot pass an older load barrier.
                self.base.add_edge(load_barrier, n, true);
            }

            self.current_load = Some(n);
            if instr.is_load_barrier() {
                self.current_load_barrier = Some(n);
            }

            #[cfg(feature = "debug-trace")]
            log::trace!("dispatch: load -> new group {n}");
            n
        } else {
            let current = self.current_load.expect("needs_new_group is false only when dom (and thus current_load) is live");
            self.base.get_group_mut(current).add_instruction();
            self.base.get_group_mut(current).add_mem_access(ma);
            #[cfg(feature = "debug-trace")]
            log::trace!("dispatch: load -> extended group {current}");
            current
        }
    }

    /// Forwards to the base's bookkeeping, then, if the group was removed as
    /// a result, clears any current pointer that still referenced it — this
    /// is what keeps the next dispatch from wiring an edge to a group that no
    /// longer exists.
    pub fn on_instruction_executed(&mut self, group_id: GroupId) {
        self.base.on_instruction_executed(group_id);
        if !self.base.is_live(group_id) {
            for ptr in [
                &mut self.current_load,
                &mut self.current_store,
                &mut self.current_load_barrier,
                &mut self.current_store_barrier,
            ] {
                if *ptr == Some(group_id) {
                    *ptr = None;
                }
            }
        }
    }

    /// Releases LQ and/or SQ slots according to the instruction's descriptor
    /// and MA-resolved store-ness.
    pub fn on_instruction_retired<I: InstructionInfo>(&mut self, instr: &I) {
        self.base.on_instruction_retired(instr);
    }

    /// Snapshot of queue occupancy, the four current pointers, and every
    /// live group's counters.
    pub fn dump(&self) -> LsuDump {
        let mut dump = self.base.dump();
        dump.current_load = self.current_load;
        dump.current_store = self.current_store;
        dump.current_load_barrier = self.current_load_barrier;
        dump.current_store_barrier = self.current_store_barrier;
        dump
    }
}
