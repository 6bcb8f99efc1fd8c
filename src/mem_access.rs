//! Memory-access descriptors.
//!
//! An `MemAccess` is a value object describing the byte range touched by a
//! memory instruction and whether that instruction is a store. A single
//! instruction can bundle more than one sub-access (a compound load/store, or
//! an instruction the metadata registry has annotated with several distinct
//! ranges); in that case the descriptor also tracks the smallest interval
//! covering every sub-access, for cheap coarse pruning, while retaining each
//! individual sub-access for precise aliasing (see [`MemAccess::overlaps`]).
//!
//! Collapsing a bundle down to its covering interval loses precision and is
//! therefore never done implicitly: callers that need the union use
//! [`MemAccess::extended_start`]/[`MemAccess::extended_end`] explicitly, and
//! anything that needs to know whether two accesses could actually alias
//! must go through [`MemAccess::overlaps`], which always consults the
//! individual sub-accesses.

use smallvec::SmallVec;

/// A single byte-range sub-access: `(addr, size)`.
type SubAccess = (u64, u32);

/// Describes the byte range(s) touched by one memory instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemAccess {
    is_store: bool,
    addr: u64,
    size: u32,
    /// Populated lazily: `None` until `append` is first called. The original
    /// `(addr, size)` access is not duplicated into this list; it is always
    /// sub-access zero, conceptually.
    bundle: Option<Bundle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bundle {
    /// Sub-accesses appended after the original one, in append order.
    extra: SmallVec<[SubAccess; 2]>,
    extended_addr: u64,
    extended_size: u32,
}

impl MemAccess {
    /// Creates a descriptor for a single, unbundled access.
    pub fn new(is_store: bool, addr: u64, size: u32) -> Self {
        MemAccess {
            is_store,
            addr,
            size,
            bundle: None,
        }
    }

    /// Whether the originating instruction is a store.
    pub fn is_store(&self) -> bool {
        self.is_store
    }

    /// The address of the original (first) sub-access.
    pub fn addr(&self) -> u64 {
        self.addr
    }

    /// The size in bytes of the original (first) sub-access.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Appends a sub-access to this descriptor, lazily materializing the
    /// bundle (seeded with the original access) on first call, and widening
    /// the extended interval by min-left/max-right.
    pub fn append(&mut self, is_store: bool, addr: u64, size: u32) {
        debug_assert_eq!(
            is_store, self.is_store,
            "a bundle's sub-accesses must agree on store-ness"
        );
        let bundle = self.bundle.get_or_insert_with(|| Bundle {
            extra: SmallVec::new(),
            extended_addr: self.addr,
            extended_size: self.size,
        });
        let prev_end = bundle.extended_addr + u64::from(bundle.extended_size);
        let new_end = addr + u64::from(size);
        let new_start = bundle.extended_addr.min(addr);
        let end = prev_end.max(new_end);
        bundle.extended_addr = new_start;
        bundle.extended_size = (end - new_start) as u32;
        bundle.extra.push((addr, size));
    }

    /// Start of the smallest interval covering every sub-access, or the
    /// original access's start if this descriptor isn't bundled.
    pub fn extended_start(&self) -> u64 {
        match &self.bundle {
            Some(b) => b.extended_addr,
            None => self.addr,
        }
    }

    /// End (exclusive) of the smallest interval covering every sub-access, or
    /// the original access's end if this descriptor isn't bundled.
    pub fn extended_end(&self) -> u64 {
        match &self.bundle {
            Some(b) => b.extended_addr + u64::from(b.extended_size),
            None => self.addr + u64::from(self.size),
        }
    }

    /// Iterates over every sub-access `(addr, size)`, the original one
    /// first, in the order they were appended.
    pub fn sub_accesses(&self) -> impl Iterator<Item = SubAccess> + '_ {
        let original = core::iter::once((self.addr, self.size));
        let extra = self
            .bundle
            .as_ref()
            .map(|b| b.extra.iter().copied())
            .into_iter()
            .flatten();
        original.chain(extra)
    }

    /// Whether any sub-access of `self` overlaps any sub-access of `other`.
    /// This is the alias test between two accesses; [`crate::group::MemoryGroup::aliases`]
    /// applies it to every bundled access of a group.
    pub fn overlaps(&self, other: &MemAccess) -> bool {
        for (a1, s1) in self.sub_accesses() {
            let e1 = a1 + u64::from(s1);
            for (a2, s2) in other.sub_accesses() {
                let e2 = a2 + u64::from(s2);
                if a1 < e2 && a2 < e1 {
                    return true;
                }
            }
        }
        false
    }
}
