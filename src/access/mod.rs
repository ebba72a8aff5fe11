// This module defines the memory access descriptor and the logic shared by the read and
// write classifiers. A MemAccess records which instruction touched memory, the pointer
// operand, the byte length (a constant materialized in the target's largest legal
// integer width, or the run-time length operand of a bulk intrinsic), the alignment
// (0 meaning unspecified), the read/write role and whether the access is atomic.
// Absence is expressed as Option: an instruction that is not a memory access simply has
// no descriptor. Atomic compare-exchange and read-modify-write instructions go through
// one role-parameterised helper so their read and write descriptors can only differ in
// role. The module also provides classify/accesses/collect conveniences over both roles.

//! Memory access descriptors and classifiers.
//!
//! ```ignore
//! use memaccess::access::{MemRead, MemWrite};
//!
//! for inst in ir.func_insts(func) {
//!     if let Some(read) = MemRead::try_create(&ir, inst) {
//!         // instrument read.pointer() / read.length()
//!     }
//!     if let Some(write) = MemWrite::try_create(&ir, inst) {
//!         // ...
//!     }
//! }
//! ```

pub mod read;
pub mod write;

pub use read::MemRead;
pub use write::MemWrite;

use crate::core::{IrAdaptor, TargetLayout};

/// Direction of a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessRole {
    Read,
    Write,
}

impl AccessRole {
    pub fn name(self) -> &'static str {
        match self {
            AccessRole::Read => "read",
            AccessRole::Write => "write",
        }
    }
}

/// Integer constant in the IR's own representation: a value of a given bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstInt {
    value: u64,
    bits: u32,
}

impl ConstInt {
    /// Create a constant, truncating `value` to `bits` like an IR integer would.
    pub fn new(value: u64, bits: u32) -> Self {
        let value = if bits >= 64 {
            value
        } else {
            value & ((1u64 << bits) - 1)
        };
        Self { value, bits }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }
}

/// Number of bytes touched by an access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLength<V> {
    /// Statically known size.
    Const(ConstInt),
    /// Length operand evaluated at run time (bulk intrinsics).
    Operand(V),
}

impl<V: Copy> AccessLength<V> {
    pub fn as_const(&self) -> Option<u64> {
        match self {
            AccessLength::Const(c) => Some(c.value()),
            AccessLength::Operand(_) => None,
        }
    }

    pub fn as_operand(&self) -> Option<V> {
        match self {
            AccessLength::Const(_) => None,
            AccessLength::Operand(v) => Some(*v),
        }
    }
}

/// Normalized description of a single memory read or write.
///
/// Immutable once built. Dual-role instructions produce two descriptors, one
/// per classifier, instead of a combined one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemAccess<I, V> {
    inst: I,
    pointer: V,
    length: AccessLength<V>,
    align: u32,
    role: AccessRole,
    atomic: bool,
}

/// Descriptor type produced for a given adaptor.
pub type AccessOf<A> = MemAccess<<A as IrAdaptor>::InstRef, <A as IrAdaptor>::ValueRef>;

impl<I: Copy, V: Copy> MemAccess<I, V> {
    pub(crate) fn new(
        inst: I,
        pointer: V,
        length: AccessLength<V>,
        align: u32,
        role: AccessRole,
        atomic: bool,
    ) -> Self {
        Self {
            inst,
            pointer,
            length,
            align,
            role,
            atomic,
        }
    }

    /// Instruction this access was derived from.
    pub fn instruction(&self) -> I {
        self.inst
    }

    /// Address operand.
    pub fn pointer(&self) -> V {
        self.pointer
    }

    pub fn length(&self) -> AccessLength<V> {
        self.length
    }

    /// Alignment in bytes; 0 means no explicit alignment is known.
    pub fn alignment(&self) -> u32 {
        self.align
    }

    pub fn role(&self) -> AccessRole {
        self.role
    }

    pub fn is_read(&self) -> bool {
        self.role == AccessRole::Read
    }

    pub fn is_write(&self) -> bool {
        self.role == AccessRole::Write
    }

    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    pub fn has_const_length(&self) -> bool {
        self.length.as_const().is_some()
    }

    pub fn const_length(&self) -> Option<u64> {
        self.length.as_const()
    }
}

/// Store size of `ty`, encoded with the target's largest legal integer width.
///
/// This is the only place the classifiers consult the target layout for sizes.
pub fn store_size_const<L: TargetLayout>(layout: &L, ty: L::TypeRef) -> ConstInt {
    ConstInt::new(layout.type_store_size(ty), layout.largest_legal_int_width())
}

/// Descriptor for an atomic instruction touching `pointer` with a value of type `ty`.
///
/// Compare-exchange and read-modify-write instructions are both a read and a
/// write; each classifier calls this with its own role.
pub(crate) fn atomic_access<A: IrAdaptor>(
    ir: &A,
    inst: A::InstRef,
    pointer: A::ValueRef,
    ty: A::TypeRef,
    role: AccessRole,
) -> AccessOf<A> {
    let layout = ir.layout();
    MemAccess::new(
        inst,
        pointer,
        AccessLength::Const(store_size_const(layout, ty)),
        layout.pointer_alignment(pointer),
        role,
        true,
    )
}

/// Classify `inst` for a single role.
pub fn classify<A: IrAdaptor>(ir: &A, inst: A::InstRef, role: AccessRole) -> Option<AccessOf<A>> {
    match role {
        AccessRole::Read => MemRead::try_create(ir, inst),
        AccessRole::Write => MemWrite::try_create(ir, inst),
    }
}

/// All accesses performed by `inst`: the read first, then the write.
pub fn accesses<A: IrAdaptor>(ir: &A, inst: A::InstRef) -> impl Iterator<Item = AccessOf<A>> {
    MemRead::try_create(ir, inst)
        .into_iter()
        .chain(MemWrite::try_create(ir, inst))
}

/// All accesses of a function in instruction order.
pub fn collect<A: IrAdaptor>(ir: &A, func: A::FuncRef) -> Vec<AccessOf<A>> {
    ir.func_insts(func)
        .filter(|&inst| ir.inst_kind(inst).touches_memory())
        .flat_map(|inst| accesses(ir, inst))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_utils::test::MockIr;
    use crate::core::{AtomicRmwInst, InstKind, LoadInst};

    #[test]
    fn test_const_int_truncates_to_width() {
        assert_eq!(ConstInt::new(0x1_0000_0004, 32).value(), 4);
        assert_eq!(ConstInt::new(300, 8).value(), 44);
        assert_eq!(ConstInt::new(u64::MAX, 64).value(), u64::MAX);
    }

    #[test]
    fn test_store_size_uses_legal_width() {
        let ir = MockIr::new(32, vec![]);
        let size = store_size_const(ir.layout(), 8);
        assert_eq!(size.value(), 8);
        assert_eq!(size.bits(), 32);
    }

    #[test]
    fn test_collect_orders_read_before_write() {
        let ir = MockIr::new(
            64,
            vec![
                InstKind::Load(LoadInst {
                    pointer: 1,
                    loaded_type: 4,
                    align: 4,
                    atomic: false,
                    volatile: false,
                }),
                InstKind::Other,
                InstKind::AtomicRmw(AtomicRmwInst {
                    pointer: 2,
                    value: 3,
                    value_type: 8,
                    volatile: false,
                }),
            ],
        )
        .with_pointer_alignment(2, 16);

        let all = collect(&ir, 0);
        assert_eq!(all.len(), 3);
        assert!(all[0].is_read());
        assert_eq!(all[0].instruction(), 0);
        assert!(all[1].is_read() && all[1].is_atomic());
        assert!(all[2].is_write() && all[2].is_atomic());
        assert_eq!(all[1].alignment(), 16);
        assert_eq!(all[1].pointer(), all[2].pointer());
        assert_eq!(all[1].const_length(), Some(8));
    }

    #[test]
    fn test_only_memory_kinds_produce_accesses() {
        let ir = MockIr::new(
            64,
            vec![
                InstKind::Other,
                InstKind::Load(LoadInst {
                    pointer: 1,
                    loaded_type: 2,
                    align: 2,
                    atomic: false,
                    volatile: false,
                }),
                InstKind::AtomicRmw(AtomicRmwInst {
                    pointer: 1,
                    value: 3,
                    value_type: 4,
                    volatile: true,
                }),
            ],
        );
        for inst in ir.func_insts(0) {
            let touches = ir.inst_kind(inst).touches_memory();
            assert_eq!(touches, accesses(&ir, inst).count() > 0, "inst {}", inst);
        }
        assert!(!ir.inst_kind(0).touches_memory());
        assert_eq!(collect(&ir, 0).len(), 3);
    }

    #[test]
    fn test_classify_by_role() {
        let ir = MockIr::new(
            64,
            vec![InstKind::Load(LoadInst {
                pointer: 7,
                loaded_type: 2,
                align: 0,
                atomic: false,
                volatile: true,
            })],
        );
        assert!(classify(&ir, 0, AccessRole::Read).is_some());
        assert!(classify(&ir, 0, AccessRole::Write).is_none());
    }
}
