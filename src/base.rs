//! `LsuBase`: queue accounting, the live-group table, and the operations
//! every memory instruction's lifecycle passes through, independent of the
//! dispatch policy itself (see `policy` for that).
//!
//! This mirrors the split `cranelift-codegen` draws between `regalloc::Context`
//! (persistent bookkeeping, reused across calls) and the pass-specific logic
//! it drives: `LsuBase` is the bookkeeping, `policy::Lsu` drives it.

use std::collections::HashMap;

use crate::config::{LsuConfig, ResolvedLsuConfig};
use crate::error::{fault, LsuFault, QueueKind};
use crate::group::{GroupId, MemoryGroup};
use crate::mem_access::MemAccess;
use crate::metadata::{InstructionInfo, MetadataRegistry, ProcessorModel};
use crate::queue::{Availability, QueueCounter};

/// Snapshot of LSU state for debugging: queue occupancy, the four current
/// pointers, and every live group's bookkeeping. Produced by
/// [`crate::policy::Lsu::dump`] (the four current pointers live in the
/// policy layer, not here; see [`LsuBase::dump`]'s doc comment); never
/// affects LSU state and is not gated by the `debug-trace` feature, unlike
/// the per-event trace logging emitted during normal operation.
#[derive(Debug)]
pub struct LsuDump {
    /// `(used, size)` for the load queue.
    pub lq: (u32, u32),
    /// `(used, size)` for the store queue.
    pub sq: (u32, u32),
    /// The current load group, if any.
    pub current_load: Option<GroupId>,
    /// The current store group, if any.
    pub current_store: Option<GroupId>,
    /// The current load-barrier group, if any.
    pub current_load_barrier: Option<GroupId>,
    /// The current store-barrier group, if any.
    pub current_store_barrier: Option<GroupId>,
    /// `(group id, num_predecessors, executed_predecessors, num_instructions, num_issued, num_executed)`
    /// for every live group, in ascending group-id order.
    pub groups: Vec<(GroupId, u32, u32, u32, u32, u32)>,
}

fn fmt_current(ptr: Option<GroupId>) -> String {
    match ptr {
        Some(id) => id.to_string(),
        None => "-".to_string(),
    }
}

impl core::fmt::Display for LsuDump {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        writeln!(f, "lq: {}/{}  sq: {}/{}", self.lq.0, self.lq.1, self.sq.0, self.sq.1)?;
        writeln!(
            f,
            "current: load={} store={} load_barrier={} store_barrier={}",
            fmt_current(self.current_load),
            fmt_current(self.current_store),
            fmt_current(self.current_load_barrier),
            fmt_current(self.current_store_barrier),
        )?;
        for (id, preds, exec_preds, insts, issued, executed) in &self.groups {
            writeln!(
                f,
                "  {id}: preds={exec_preds}/{preds} insts={insts} issued={issued} executed={executed}"
            )?;
        }
        Ok(())
    }
}

/// Owns every live memory group, the LQ/SQ counters, and the optional
/// alias-metadata lookup.
pub struct LsuBase {
    groups: HashMap<GroupId, MemoryGroup>,
    next_group_id: u32,
    lq: QueueCounter,
    sq: QueueCounter,
    config: ResolvedLsuConfig,
    metadata: Option<Box<dyn MetadataRegistry>>,
}

impl LsuBase {
    /// Constructs a base LSU. `config`'s queue-size overrides are resolved
    /// against `model` once, here; `metadata` is consulted read-only on
    /// every dispatch that carries a token.
    pub fn new(
        config: LsuConfig,
        model: &dyn ProcessorModel,
        metadata: Option<Box<dyn MetadataRegistry>>,
    ) -> Self {
        let resolved = config.resolve(model);
        LsuBase {
            groups: HashMap::new(),
            next_group_id: 1,
            lq: QueueCounter::new(resolved.lq_size),
            sq: QueueCounter::new(resolved.sq_size),
            config: resolved,
            metadata,
        }
    }

    /// Allocates the next group id and inserts an empty group for it.
    pub fn create_memory_group(&mut self) -> GroupId {
        let id = GroupId::from_u32(self.next_group_id);
        self.next_group_id += 1;
        self.groups.insert(id, MemoryGroup::new());
        #[cfg(feature = "debug-trace")]
        log::trace!("created memory group {id}");
        id
    }

    /// Looks up a live group. Fatal if `id` isn't live.
    pub fn get_group(&self, id: GroupId) -> &MemoryGroup {
        self.groups
            .get(&id)
            .unwrap_or_else(|| fault(LsuFault::UnknownGroup(id)))
    }

    /// Mutable lookup of a live group. Fatal if `id` isn't live.
    pub fn get_group_mut(&mut self, id: GroupId) -> &mut MemoryGroup {
        self.groups
            .get_mut(&id)
            .unwrap_or_else(move || fault(LsuFault::UnknownGroup(id)))
    }

    /// Wires `pred`'s successor edge to `succ`, incrementing `succ`'s
    /// predecessor count. Both ids must be live.
    pub fn add_edge(&mut self, pred: GroupId, succ: GroupId, is_data_dep: bool) {
        // HashMap doesn't hand out two live mutable borrows at once, so take
        // the successor out, mutate both, then reinsert.
        let mut succ_group = self
            .groups
            .remove(&succ)
            .unwrap_or_else(|| fault(LsuFault::UnknownGroup(succ)));
        let pred_group = self.get_group_mut(pred);
        pred_group.add_successor(succ, &mut succ_group, is_data_dep);
        self.groups.insert(succ, succ_group);
    }

    /// Acquires one load-queue slot.
    pub fn acquire_lq_slot(&mut self) {
        self.lq.acquire();
    }

    /// Acquires one store-queue slot.
    pub fn acquire_sq_slot(&mut self) {
        self.sq.acquire();
    }

    /// Releases one load-queue slot. Fatal if the counter is already zero.
    pub fn release_lq_slot(&mut self) {
        self.lq.release(QueueKind::Load);
    }

    /// Releases one store-queue slot. Fatal if the counter is already zero.
    pub fn release_sq_slot(&mut self) {
        self.sq.release(QueueKind::Store);
    }

    /// `true` iff the load queue is bounded and full.
    pub fn is_lq_full(&self) -> bool {
        self.lq.is_full()
    }

    /// `true` iff the store queue is bounded and full.
    pub fn is_sq_full(&self) -> bool {
        self.sq.is_full()
    }

    /// Load-queue `(used, size)`, for debug dumps and tests.
    pub fn lq_occupancy(&self) -> (u32, u32) {
        (self.lq.used(), self.lq.size())
    }

    /// Store-queue `(used, size)`, for debug dumps and tests.
    pub fn sq_occupancy(&self) -> (u32, u32) {
        (self.sq.used(), self.sq.size())
    }

    /// Returns `Available` unless the instruction needs a slot from a full
    /// queue. The scheduler must call this (or otherwise know it would
    /// succeed) before calling `dispatch`.
    pub fn is_available<I: InstructionInfo>(&self, instr: &I) -> Availability {
        if instr.may_load() && self.is_lq_full() {
            Availability::LoadQueueFull
        } else if self.is_store_instruction(instr) && self.is_sq_full() {
            Availability::StoreQueueFull
        } else {
            Availability::Available
        }
    }

    /// An instruction is a store iff its descriptor says so, or the metadata
    /// registry has reclassified it as one. Consulted by `is_available`,
    /// `dispatch`, and `on_instruction_retired`.
    pub fn is_store_instruction<I: InstructionInfo>(&self, instr: &I) -> bool {
        instr.may_store() || self.memory_access_md(instr).is_some_and(|ma| ma.is_store())
    }

    /// Looks up `instr`'s memory access in the metadata registry, if both a
    /// registry is attached and the instruction carries a token.
    pub fn memory_access_md<I: InstructionInfo>(&self, instr: &I) -> Option<MemAccess> {
        let token = instr.metadata_token()?;
        self.metadata.as_ref()?.memory_access(token)
    }

    /// Whether `gid`'s bundled accesses are provably disjoint from `access`.
    /// Falls back to the `assume_no_alias` config flag only when `access` is
    /// absent; with an access present the interval test is authoritative.
    pub fn no_alias(&self, gid: GroupId, access: Option<&MemAccess>) -> bool {
        match access {
            Some(access) => !self.get_group(gid).aliases(access),
            None => self.config.assume_no_alias,
        }
    }

    /// Advances every live group's internal counters by one simulated cycle.
    pub fn cycle_event(&mut self) {
        for group in self.groups.values_mut() {
            group.cycle_event();
        }
    }

    /// Forwards instruction-executed notice to `group_id`'s group, then, if
    /// that was the group's last outstanding instruction, bumps every
    /// successor's `executed_predecessors` and removes the group from the
    /// table. Safe without any back-traversal, since the successors have
    /// already been notified by the time the group is gone.
    ///
    /// Returns `true` when the group was removed, so `policy::Lsu` can clear
    /// any current-pointer that still referenced it.
    pub fn on_instruction_executed(&mut self, group_id: GroupId) -> bool {
        let just_finished = self.get_group_mut(group_id).on_instruction_executed();
        if !just_finished {
            return false;
        }
        let successors: Vec<_> = self.get_group(group_id).successors().to_vec();
        for succ in successors {
            self.get_group_mut(succ.id).executed_predecessor();
        }
        self.groups.remove(&group_id);
        #[cfg(feature = "debug-trace")]
        log::trace!("memory group {group_id} fully executed, removed from table");
        true
    }

    /// Releases LQ and/or SQ slots according to the instruction's descriptor
    /// and MA-resolved store-ness.
    pub fn on_instruction_retired<I: InstructionInfo>(&mut self, instr: &I) {
        if instr.may_load() {
            self.release_lq_slot();
        }
        if self.is_store_instruction(instr) {
            self.release_sq_slot();
        }
    }

    /// `true` iff `id` is still live in the group table.
    pub fn is_live(&self, id: GroupId) -> bool {
        self.groups.contains_key(&id)
    }

    /// Snapshot of queue occupancy and every live group's counters, for a
    /// debug-dump observability hook external tooling can poll. The four
    /// current pointers aren't filled in here: they're policy-layer state
    /// `LsuBase` has no visibility into. `policy::Lsu::dump` calls this and
    /// then fills them in.
    pub fn dump(&self) -> LsuDump {
        let mut groups: Vec<_> = self
            .groups
            .iter()
            .map(|(id, g)| {
                (
                    *id,
                    g.num_predecessors(),
                    g.executed_predecessors(),
                    g.num_instructions(),
                    g.num_issued(),
                    g.num_executed(),
                )
            })
            .collect();
        groups.sort_by_key(|(id, ..)| id.index());
        LsuDump {
            lq: self.lq_occupancy(),
            sq: self.sq_occupancy(),
            current_load: None,
            current_store: None,
            current_load_barrier: None,
            current_store_barrier: None,
            groups,
        }
    }
}
