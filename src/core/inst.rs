// This module defines the closed set of instruction kinds that memory access
// classification understands. An IrAdaptor translates each of its instructions into an
// InstKind view: plain loads and stores, bulk memory transfers (memcpy/memmove), bulk
// memory fills (memset), atomic compare-exchange and atomic read-modify-write, or Other
// for everything else. The views are plain data generic over the adaptor's value and
// type handles, so the read and write classifiers can each perform a single exhaustive
// match and adding a new kind is a compile error until both classifiers handle it.

//! Instruction kind views consumed by the classifiers.

/// A plain (possibly atomic or volatile) load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadInst<V, T> {
    pub pointer: V,
    pub loaded_type: T,
    /// Explicit alignment, 0 when the instruction carries none.
    pub align: u32,
    pub atomic: bool,
    pub volatile: bool,
}

/// A plain (possibly atomic or volatile) store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreInst<V, T> {
    pub pointer: V,
    pub value: V,
    pub value_type: T,
    /// Explicit alignment, 0 when the instruction carries none.
    pub align: u32,
    pub atomic: bool,
    pub volatile: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemTransferKind {
    Copy,
    Move,
}

impl MemTransferKind {
    pub fn name(self) -> &'static str {
        match self {
            MemTransferKind::Copy => "memcpy",
            MemTransferKind::Move => "memmove",
        }
    }
}

/// Bulk copy or move of `length` bytes from `source` to `dest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemTransferInst<V> {
    pub kind: MemTransferKind,
    pub dest: V,
    pub source: V,
    pub length: V,
    pub dest_align: u32,
    pub source_align: u32,
}

/// Bulk fill of `length` bytes at `dest` with `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemSetInst<V> {
    pub dest: V,
    pub value: V,
    pub length: V,
    pub align: u32,
}

/// Any bulk memory intrinsic; all of them write their destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemIntrinsic<V> {
    Transfer(MemTransferInst<V>),
    Set(MemSetInst<V>),
}

impl<V: Copy> MemIntrinsic<V> {
    pub fn dest(&self) -> V {
        match self {
            MemIntrinsic::Transfer(mt) => mt.dest,
            MemIntrinsic::Set(ms) => ms.dest,
        }
    }

    pub fn length(&self) -> V {
        match self {
            MemIntrinsic::Transfer(mt) => mt.length,
            MemIntrinsic::Set(ms) => ms.length,
        }
    }

    pub fn dest_align(&self) -> u32 {
        match self {
            MemIntrinsic::Transfer(mt) => mt.dest_align,
            MemIntrinsic::Set(ms) => ms.align,
        }
    }
}

/// Atomic compare-exchange of `pointer` from `compare` to `new_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomicCmpXchgInst<V, T> {
    pub pointer: V,
    pub compare: V,
    pub new_value: V,
    pub compare_type: T,
    pub volatile: bool,
}

/// Atomic read-modify-write of `pointer` with operand `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomicRmwInst<V, T> {
    pub pointer: V,
    pub value: V,
    pub value_type: T,
    pub volatile: bool,
}

/// Closed set of instruction kinds relevant to memory access classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstKind<V, T> {
    Load(LoadInst<V, T>),
    Store(StoreInst<V, T>),
    MemTransfer(MemTransferInst<V>),
    MemSet(MemSetInst<V>),
    AtomicCmpXchg(AtomicCmpXchgInst<V, T>),
    AtomicRmw(AtomicRmwInst<V, T>),
    /// Anything that does not touch memory through one of the kinds above.
    Other,
}

impl<V, T> InstKind<V, T> {
    /// Whether this kind is recognized by at least one classifier.
    pub fn touches_memory(&self) -> bool {
        !matches!(self, InstKind::Other)
    }
}
