//! Diagnostics for fatal LSU contract violations.
//!
//! These are never recovered locally: a caller that trips one of these has a
//! bug (dispatching a non-memory instruction, double-releasing a queue slot,
//! naming a group id that isn't live). The scheduler is expected to abort the
//! simulation with the diagnostic, not to catch and retry.

use core::fmt;

use crate::group::GroupId;

/// A fatal, unrecoverable LSU contract violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LsuFault {
    /// A group id was looked up that is not present in the live group table.
    UnknownGroup(GroupId),
    /// A queue slot was released while its counter was already zero.
    QueueUnderflow(QueueKind),
    /// `dispatch` was called with an instruction that may neither load nor
    /// store.
    NotAMemoryInstruction,
}

/// Which queue a [`LsuFault::QueueUnderflow`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    /// The load queue.
    Load,
    /// The store queue.
    Store,
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueueKind::Load => write!(f, "load queue"),
            QueueKind::Store => write!(f, "store queue"),
        }
    }
}

impl fmt::Display for LsuFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LsuFault::UnknownGroup(gid) => {
                write!(f, "memory group {gid} is not live in the group table")
            }
            LsuFault::QueueUnderflow(kind) => {
                write!(f, "released a {kind} slot while its counter was already zero")
            }
            LsuFault::NotAMemoryInstruction => {
                write!(f, "dispatch called with an instruction that may neither load nor store")
            }
        }
    }
}

/// Panics with the formatted fault, mirroring the way the rest of the crate
/// treats internal-consistency violations (`panic!`/`debug_assert!`) rather
/// than threading a `Result` through every caller for conditions that are
/// never recovered.
#[cold]
#[track_caller]
pub(crate) fn fault(f: LsuFault) -> ! {
    panic!("{f}")
}
