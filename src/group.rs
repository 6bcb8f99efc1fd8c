//! Memory groups: nodes in the dependency DAG between in-flight memory
//! instructions.
//!
//! A group represents one or more concurrently-dispatched memory
//! instructions that share ordering constraints. It tracks its predecessors
//! (by count only, see the note on [`MemoryGroup::on_instruction_executed`]),
//! its successors (by id, with a per-edge data-dependency flag), the number
//! of instructions it holds, and counters over issued/executed instructions.
//! Its lifecycle state is never stored directly; it is always derived from
//! those counters by [`MemoryGroup::state`], the same way
//! `cranelift-codegen`'s `regalloc::affinity::Affinity` derives a value's
//! storage class from its defining instruction rather than caching it.

use core::fmt;
use core::num::NonZeroU32;

use smallvec::SmallVec;

use crate::mem_access::MemAccess;

/// A densely allocated, never-reused identifier for a live or formerly-live
/// [`MemoryGroup`].
///
/// "No group" is expressed as `Option<GroupId>` rather than a reserved `0`
/// value. `GroupId` wraps `NonZeroU32` so `Option<GroupId>` stays a single
/// machine word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(NonZeroU32);

impl GroupId {
    pub(crate) fn from_u32(n: u32) -> Self {
        GroupId(NonZeroU32::new(n).expect("group ids start at 1"))
    }

    /// The raw numeric value, for logging and debug dumps only.
    pub fn index(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// An edge from this group to a successor, distinguishing true
/// data-dependency edges (aliasing is possible, or the edge is structural
/// because of a barrier) from edges that exist purely to preserve dispatch
/// order bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Successor {
    /// The younger group.
    pub id: GroupId,
    /// `true` when the edge reflects a real data dependency (may-alias or
    /// structural via a barrier); `false` when it's ordering-only and the
    /// younger group is free to issue as soon as it's otherwise ready.
    pub is_data_dependency: bool,
}

/// Where a group sits in its dispatch → ready → executing → executed
/// lifecycle. Never stored; always computed by [`MemoryGroup::state`] from
/// the group's counters, so it can't drift out of sync with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    /// Either the group holds no instructions yet, or not all of its
    /// predecessors have executed yet.
    Pending,
    /// The group holds at least one instruction, all of its predecessors
    /// have executed, but no instruction in the group has issued yet.
    Ready,
    /// At least one instruction has issued and at least one instruction in
    /// the group has not yet executed.
    Executing,
    /// Every instruction in the group has executed.
    Executed,
}

/// A node in the LSU's dependency DAG.
#[derive(Debug, Clone)]
pub struct MemoryGroup {
    num_predecessors: u32,
    executed_predecessors: u32,
    successors: SmallVec<[Successor; 4]>,
    num_instructions: u32,
    num_issued: u32,
    num_executed: u32,
    accesses: SmallVec<[MemAccess; 2]>,
}

impl MemoryGroup {
    pub(crate) fn new() -> Self {
        MemoryGroup {
            num_predecessors: 0,
            executed_predecessors: 0,
            successors: SmallVec::new(),
            num_instructions: 0,
            num_issued: 0,
            num_executed: 0,
            accesses: SmallVec::new(),
        }
    }

    /// Increments this group's instruction count. The LSU only ever calls
    /// this while the group is still `Pending`/`Ready` and is the current
    /// load group (see `policy::dispatch`, Case B); it never extends a group
    /// that has already started executing.
    pub fn add_instruction(&mut self) {
        debug_assert!(
            !self.is_executing() && !self.is_executed(),
            "a group may only accumulate instructions before it starts issuing"
        );
        self.num_instructions += 1;
    }

    /// Appends a memory access to this group's bundle, if present.
    pub fn add_mem_access(&mut self, access: Option<MemAccess>) {
        if let Some(access) = access {
            self.accesses.push(access);
        }
    }

    /// Number of instructions dispatched into this group.
    pub fn num_instructions(&self) -> u32 {
        self.num_instructions
    }

    /// Number of predecessor edges pointing at this group.
    pub fn num_predecessors(&self) -> u32 {
        self.num_predecessors
    }

    /// Number of predecessors that have fully executed.
    pub fn executed_predecessors(&self) -> u32 {
        self.executed_predecessors
    }

    /// Number of instructions in this group that have issued.
    pub fn num_issued(&self) -> u32 {
        self.num_issued
    }

    /// Number of instructions in this group that have executed.
    pub fn num_executed(&self) -> u32 {
        self.num_executed
    }

    /// Wires `self` as a predecessor of `target`. `self` becomes a
    /// predecessor; `target`'s `num_predecessors` is incremented. `is_data_dep`
    /// should be `true` when aliasing is possible or the edge is structural
    /// (barriers), `false` when it exists purely to order dispatch.
    pub fn add_successor(&mut self, target_id: GroupId, target: &mut MemoryGroup, is_data_dep: bool) {
        self.successors.push(Successor {
            id: target_id,
            is_data_dependency: is_data_dep,
        });
        target.num_predecessors += 1;
    }

    /// Every successor edge out of this group.
    pub fn successors(&self) -> &[Successor] {
        &self.successors
    }

    /// Marks one instruction in this group as issued.
    pub fn on_instruction_issued(&mut self) {
        debug_assert!(self.num_issued < self.num_instructions);
        self.num_issued += 1;
    }

    /// Marks one instruction in this group as executed. Returns `true` when
    /// this was the group's last outstanding instruction, i.e. the group as a
    /// whole just became `Executed` and every successor's
    /// `executed_predecessors` has now been bumped by the caller (via
    /// [`MemoryGroup::executed_predecessor`] on each successor).
    pub fn on_instruction_executed(&mut self) -> bool {
        debug_assert!(self.num_executed < self.num_instructions);
        self.num_executed += 1;
        self.num_executed == self.num_instructions
    }

    /// Called on a successor when one of its predecessors has fully executed.
    pub fn executed_predecessor(&mut self) {
        debug_assert!(self.executed_predecessors < self.num_predecessors);
        self.executed_predecessors += 1;
    }

    /// Deferred-action tick, called once per simulated cycle. Stateless with
    /// respect to the dependency DAG: it exists so a richer simulator can
    /// advance internal issue/ready delays without the dispatch policy having
    /// to know about them.
    pub fn cycle_event(&mut self) {
        #[cfg(feature = "debug-trace")]
        log::trace!("memory group cycle tick (instructions={})", self.num_instructions);
    }

    /// `true` iff every predecessor has executed.
    pub fn is_ready(&self) -> bool {
        self.executed_predecessors == self.num_predecessors
    }

    /// `true` iff at least one instruction has issued and at least one has
    /// not yet executed.
    pub fn is_executing(&self) -> bool {
        self.num_issued > 0 && self.num_executed < self.num_instructions
    }

    /// `true` iff every instruction in the group has executed.
    pub fn is_executed(&self) -> bool {
        self.num_instructions > 0 && self.num_executed == self.num_instructions
    }

    /// The group's current lifecycle state, derived from its counters.
    pub fn state(&self) -> GroupState {
        if self.is_executed() {
            GroupState::Executed
        } else if self.is_executing() {
            GroupState::Executing
        } else if self.num_instructions > 0 && self.is_ready() {
            // A group with no instructions yet hasn't entered the
            // dispatch/ready/executing/executed lifecycle at all; `is_ready`
            // is vacuously true for zero predecessors, but that alone
            // shouldn't promote an empty group to `Ready`.
            GroupState::Ready
        } else {
            GroupState::Pending
        }
    }

    /// Whether this group's bundled accesses alias `access`. `false` when
    /// this group has no bundled accesses at all (the caller must fall back
    /// to the `assume_no_alias` policy flag in that case; see
    /// `base::LsuBase::no_alias`).
    pub fn aliases(&self, access: &MemAccess) -> bool {
        self.accesses.iter().any(|a| a.overlaps(access))
    }
}

impl Default for MemoryGroup {
    fn default() -> Self {
        Self::new()
    }
}
