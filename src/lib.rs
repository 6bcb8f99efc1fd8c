//! Load/store unit for a cycle-accurate out-of-order microarchitectural
//! simulator.
//!
//! The load/store unit (LSU) tracks in-flight memory operations in two
//! bounded hardware structures, the load queue and the store queue, and
//! builds a dependency DAG of *memory groups* that governs when a newly
//! dispatched memory instruction may issue relative to older in-flight
//! memory instructions. Loads that share no ordering constraint with each
//! other are free to batch into a single group; stores never are. An
//! optional alias-metadata lookup relaxes the DAG's edges from structural
//! ("ordering only") to "true data dependency" or vice versa when two
//! accesses are provably disjoint.
//!
//! The crate is organized leaves-first, the way `cranelift-codegen` lays out
//! `regalloc`: value objects first ([`mem_access`]), then the DAG node type
//! they're bundled into ([`group`]), then the bookkeeping that owns every
//! live node ([`base`]), then the policy that decides how to grow the DAG on
//! every dispatch ([`policy`]).
//!
//! Out of scope, by contract only: the instruction scheduler that calls this
//! crate, the metadata registry that supplies optional per-instruction
//! address/size information, and the processor-model descriptor that
//! supplies default queue sizes. See [`metadata`] for the traits that stand
//! in for all three.

#![deny(missing_docs)]

pub mod base;
pub mod config;
pub mod error;
pub mod group;
pub mod mem_access;
pub mod metadata;
pub mod policy;
pub mod queue;

pub use crate::base::{LsuBase, LsuDump};
pub use crate::config::LsuConfig;
pub use crate::error::LsuFault;
pub use crate::group::{GroupId, GroupState, MemoryGroup, Successor};
pub use crate::mem_access::MemAccess;
pub use crate::metadata::{InstructionInfo, MetadataRegistry, MetadataToken, ProcessorModel};
pub use crate::policy::Lsu;
pub use crate::queue::Availability;
