//! Memory read classifier.
//!
//! Recognized kinds and their descriptors:
//!
//! | kind | pointer | length | alignment |
//! |---|---|---|---|
//! | load | pointer operand | store size of the loaded type | explicit |
//! | memcpy / memmove | source | length operand | explicit source alignment |
//! | cmpxchg | pointer operand | store size of the compared type | natural pointer alignment |
//! | atomicrmw | pointer operand | store size of the value type | natural pointer alignment |

use super::{atomic_access, store_size_const, AccessLength, AccessOf, AccessRole, MemAccess};
use crate::core::{
    AtomicCmpXchgInst, AtomicRmwInst, InstKind, IrAdaptor, LoadInst, MemTransferInst,
};

/// Builds read descriptors.
pub struct MemRead;

impl MemRead {
    pub fn from_load<A: IrAdaptor>(
        ir: &A,
        inst: A::InstRef,
        load: &LoadInst<A::ValueRef, A::TypeRef>,
    ) -> AccessOf<A> {
        MemAccess::new(
            inst,
            load.pointer,
            AccessLength::Const(store_size_const(ir.layout(), load.loaded_type)),
            load.align,
            AccessRole::Read,
            load.atomic,
        )
    }

    pub fn from_mem_transfer<A: IrAdaptor>(
        _ir: &A,
        inst: A::InstRef,
        transfer: &MemTransferInst<A::ValueRef>,
    ) -> AccessOf<A> {
        MemAccess::new(
            inst,
            transfer.source,
            AccessLength::Operand(transfer.length),
            transfer.source_align,
            AccessRole::Read,
            false,
        )
    }

    pub fn from_cmpxchg<A: IrAdaptor>(
        ir: &A,
        inst: A::InstRef,
        cmpxchg: &AtomicCmpXchgInst<A::ValueRef, A::TypeRef>,
    ) -> AccessOf<A> {
        atomic_access(ir, inst, cmpxchg.pointer, cmpxchg.compare_type, AccessRole::Read)
    }

    pub fn from_atomic_rmw<A: IrAdaptor>(
        ir: &A,
        inst: A::InstRef,
        rmw: &AtomicRmwInst<A::ValueRef, A::TypeRef>,
    ) -> AccessOf<A> {
        atomic_access(ir, inst, rmw.pointer, rmw.value_type, AccessRole::Read)
    }

    /// Interpret any instruction as a read; `None` if it does not read memory.
    pub fn try_create<A: IrAdaptor>(ir: &A, inst: A::InstRef) -> Option<AccessOf<A>> {
        let access = match ir.inst_kind(inst) {
            InstKind::Load(load) => Self::from_load(ir, inst, &load),
            InstKind::MemTransfer(transfer) => Self::from_mem_transfer(ir, inst, &transfer),
            InstKind::AtomicCmpXchg(cmpxchg) => Self::from_cmpxchg(ir, inst, &cmpxchg),
            InstKind::AtomicRmw(rmw) => Self::from_atomic_rmw(ir, inst, &rmw),
            InstKind::Store(_) | InstKind::MemSet(_) | InstKind::Other => return None,
        };
        log::trace!(
            "read of {:?} by {:?}: length {:?}, align {}",
            access.pointer(),
            inst,
            access.length(),
            access.alignment()
        );
        Some(access)
    }
}
