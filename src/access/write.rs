//! Memory write classifier.
//!
//! Mirrors [`MemRead`](super::MemRead) for stores, the destination of every
//! bulk memory intrinsic (memcpy, memmove, memset) and the two atomic kinds.

use super::{atomic_access, store_size_const, AccessLength, AccessOf, AccessRole, MemAccess};
use crate::core::{
    AtomicCmpXchgInst, AtomicRmwInst, InstKind, IrAdaptor, MemIntrinsic, StoreInst,
};

/// Builds write descriptors.
pub struct MemWrite;

impl MemWrite {
    pub fn from_store<A: IrAdaptor>(
        ir: &A,
        inst: A::InstRef,
        store: &StoreInst<A::ValueRef, A::TypeRef>,
    ) -> AccessOf<A> {
        MemAccess::new(
            inst,
            store.pointer,
            AccessLength::Const(store_size_const(ir.layout(), store.value_type)),
            store.align,
            AccessRole::Write,
            store.atomic,
        )
    }

    pub fn from_mem_intrinsic<A: IrAdaptor>(
        _ir: &A,
        inst: A::InstRef,
        intrinsic: &MemIntrinsic<A::ValueRef>,
    ) -> AccessOf<A> {
        MemAccess::new(
            inst,
            intrinsic.dest(),
            AccessLength::Operand(intrinsic.length()),
            intrinsic.dest_align(),
            AccessRole::Write,
            false,
        )
    }

    pub fn from_cmpxchg<A: IrAdaptor>(
        ir: &A,
        inst: A::InstRef,
        cmpxchg: &AtomicCmpXchgInst<A::ValueRef, A::TypeRef>,
    ) -> AccessOf<A> {
        atomic_access(ir, inst, cmpxchg.pointer, cmpxchg.compare_type, AccessRole::Write)
    }

    pub fn from_atomic_rmw<A: IrAdaptor>(
        ir: &A,
        inst: A::InstRef,
        rmw: &AtomicRmwInst<A::ValueRef, A::TypeRef>,
    ) -> AccessOf<A> {
        atomic_access(ir, inst, rmw.pointer, rmw.value_type, AccessRole::Write)
    }

    /// Interpret any instruction as a write; `None` if it does not write memory.
    pub fn try_create<A: IrAdaptor>(ir: &A, inst: A::InstRef) -> Option<AccessOf<A>> {
        let access = match ir.inst_kind(inst) {
            InstKind::Store(store) => Self::from_store(ir, inst, &store),
            InstKind::MemTransfer(transfer) => {
                Self::from_mem_intrinsic(ir, inst, &MemIntrinsic::Transfer(transfer))
            }
            InstKind::MemSet(set) => Self::from_mem_intrinsic(ir, inst, &MemIntrinsic::Set(set)),
            InstKind::AtomicCmpXchg(cmpxchg) => Self::from_cmpxchg(ir, inst, &cmpxchg),
            InstKind::AtomicRmw(rmw) => Self::from_atomic_rmw(ir, inst, &rmw),
            InstKind::Load(_) | InstKind::Other => return None,
        };
        log::trace!(
            "write of {:?} by {:?}: length {:?}, align {}",
            access.pointer(),
            inst,
            access.length(),
            access.alignment()
        );
        Some(access)
    }
}
